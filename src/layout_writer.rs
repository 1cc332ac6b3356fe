//! Layout JSON Writer
//!
//! Writes node positions and link endpoints as JSON, so a settled layout can
//! be consumed by other tools without re-running the simulation.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::io::{IoError, IoResult, Writer, write_file};
use crate::model::Group;
use crate::render::Scene;

/// Serialized layout of a scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutDocument {
    pub width: f64,
    pub height: f64,
    pub alpha: f64,
    pub ticks: usize,
    pub nodes: Vec<LayoutNode>,
    pub links: Vec<LayoutLink>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutNode {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<Group>,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutLink {
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

impl LayoutDocument {
    pub fn from_scene(scene: &Scene) -> Self {
        let id_of = |node: crate::model::NodeId| {
            scene
                .glyph(node)
                .map(|g| g.id.clone())
                .unwrap_or_default()
        };

        Self {
            width: scene.options().width,
            height: scene.options().height,
            alpha: scene.alpha(),
            ticks: scene.tick(),
            nodes: scene
                .nodes()
                .iter()
                .map(|g| LayoutNode {
                    id: g.id.clone(),
                    group: g.group.clone(),
                    x: g.x,
                    y: g.y,
                })
                .collect(),
            links: scene
                .links()
                .iter()
                .map(|l| LayoutLink {
                    source: id_of(l.source),
                    target: id_of(l.target),
                    value: l.value,
                })
                .collect(),
        }
    }
}

/// Writer for layout JSON output
pub struct LayoutWriter;

impl LayoutWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LayoutWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Writer for LayoutWriter {
    fn write(&self, scene: &Scene, output: &Path) -> IoResult<()> {
        let document = LayoutDocument::from_scene(scene);
        let json = serde_json::to_string_pretty(&document)
            .map_err(|e| IoError::Write(format!("JSON serialization failed: {}", e)))?;
        write_file(output, &json)?;
        debug!(path = %output.display(), nodes = document.nodes.len(), "wrote layout JSON");
        Ok(())
    }

    fn format_id(&self) -> &str {
        "layout-json"
    }

    fn supported_extensions(&self) -> &[&str] {
        &["json"]
    }
}
