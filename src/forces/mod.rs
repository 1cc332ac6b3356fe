//! Forces applied by the layout engine
//!
//! Each force mutates node velocities (or, for centering, positions) once per
//! tick, scaled by the current alpha:
//!
//! - **Link**: springs pulling connected nodes toward a rest distance
//! - **Many-body**: pairwise charge, approximated with a Barnes-Hut quadtree
//! - **Center**: translates the node set so its centroid moves to a point

mod center;
mod link;
mod many_body;

pub use center::CenterForce;
pub use link::LinkForce;
pub use many_body::ManyBodyForce;

use rand::Rng;
use rand::rngs::StdRng;

use crate::config::ConfigError;
use crate::model::{Link, NodeStore};

/// A force registered with a [`Simulation`](crate::simulation::Simulation)
pub trait Force {
    /// Precompute per-node or per-link parameters.
    ///
    /// Called when the force is registered; invalid parameters are reported
    /// here rather than on the first tick.
    fn initialize(&mut self, nodes: &NodeStore, links: &[Link]) -> Result<(), ConfigError>;

    /// Apply the force for one tick
    fn apply(&mut self, nodes: &mut NodeStore, links: &[Link], alpha: f64, rng: &mut StdRng);
}

/// A tiny random offset used to separate coincident points
pub(crate) fn jiggle(rng: &mut StdRng) -> f64 {
    (rng.random::<f64>() - 0.5) * 1e-6
}
