//! forcegraph - force-directed graph layout and SVG rendering.
//!
//! A graph document (nodes and links) is resolved into a [`model::GraphModel`],
//! laid out by a [`simulation::Simulation`] (link springs, Barnes-Hut charge,
//! centering) and drawn by a [`render::Scene`]. [`graph::ForceGraph`] wires the
//! three together with pointer dragging.

pub mod config;
pub mod drag;
pub mod forces;
pub mod graph;
pub mod html_writer;
pub mod io;
pub mod json_reader;
pub mod layout_writer;
pub mod model;
pub mod palette;
pub mod quadtree;
pub mod render;
pub mod simulation;
pub mod svg_writer;
pub mod yaml_reader;

pub use config::{GraphOptions, Preset};
pub use graph::ForceGraph;
pub use model::{GraphData, LinkData, NodeData};
