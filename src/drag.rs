//! Pointer-driven node dragging
//!
//! Each pointer runs its own `idle -> dragging -> idle` gesture. While any
//! gesture is active the simulation is kept warm (alpha target 0.3); the
//! target drops back to 0 only when the last gesture ends.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;
use tracing::debug;

use crate::model::NodeId;
use crate::simulation::Simulation;

/// Alpha target held while at least one node is being dragged
pub const DRAG_ALPHA_TARGET: f64 = 0.3;

/// Identifies one pointer (mouse, touch point, pen)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PointerId(pub u32);

impl fmt::Display for PointerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pointer {}", self.0)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DragError {
    #[error("no node with handle {0}")]
    UnknownNode(NodeId),

    #[error("{0} is already dragging a node")]
    AlreadyDragging(PointerId),

    #[error("{0} has no active drag")]
    UnknownPointer(PointerId),
}

/// Active drag gestures, keyed by pointer
#[derive(Debug, Clone, Default)]
pub struct DragController {
    gestures: BTreeMap<PointerId, NodeId>,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin dragging `node` with `pointer`, pinning it where it stands.
    ///
    /// The first concurrent gesture reheats the simulation.
    pub fn start(
        &mut self,
        simulation: &mut Simulation,
        pointer: PointerId,
        node: NodeId,
    ) -> Result<(), DragError> {
        if self.is_dragging(pointer) {
            return Err(DragError::AlreadyDragging(pointer));
        }
        let (x, y) = simulation
            .node(node)
            .map(|n| n.position())
            .ok_or(DragError::UnknownNode(node))?;

        if self.active_count() == 0 {
            simulation.set_alpha_target(DRAG_ALPHA_TARGET);
            simulation.restart();
        }
        simulation.pin(node, x, y);
        self.gestures.insert(pointer, node);

        debug!(%pointer, %node, x, y, "drag started");
        Ok(())
    }

    /// Move the dragged node to `(x, y)` in graph coordinates
    pub fn drag(
        &mut self,
        simulation: &mut Simulation,
        pointer: PointerId,
        x: f64,
        y: f64,
    ) -> Result<(), DragError> {
        let node = self.node(pointer).ok_or(DragError::UnknownPointer(pointer))?;
        simulation.pin(node, x, y);
        Ok(())
    }

    /// Release the node held by `pointer`.
    ///
    /// The pin is always cleared; the alpha target returns to 0 once no other
    /// gesture remains.
    pub fn end(&mut self, simulation: &mut Simulation, pointer: PointerId) -> Result<NodeId, DragError> {
        let node = self
            .gestures
            .remove(&pointer)
            .ok_or(DragError::UnknownPointer(pointer))?;

        if self.active_count() == 0 {
            simulation.set_alpha_target(0.0);
        }
        simulation.unpin(node);

        debug!(%pointer, %node, remaining = self.active_count(), "drag ended");
        Ok(node)
    }

    pub fn is_dragging(&self, pointer: PointerId) -> bool {
        self.gestures.contains_key(&pointer)
    }

    /// Node held by `pointer`, if any
    pub fn node(&self, pointer: PointerId) -> Option<NodeId> {
        self.gestures.get(&pointer).copied()
    }

    pub fn active_count(&self) -> usize {
        self.gestures.len()
    }
}

/// Maps screen pixels to the origin-centered graph space and back.
///
/// The rendered root spans `[-w/2, -h/2, w, h]`, so the pixel at the top-left
/// corner is graph point `(-w/2, -h/2)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn to_graph(&self, px: f64, py: f64) -> (f64, f64) {
        (px - self.width / 2.0, py - self.height / 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::model::{GraphData, GraphModel, LinkData, NodeData};

    fn simulation() -> Simulation {
        let data = GraphData::new(
            vec![NodeData::new("A"), NodeData::new("B"), NodeData::new("C")],
            vec![LinkData::new("A", "B"), LinkData::new("B", "C")],
        );
        let model = GraphModel::from_data(&data).unwrap();
        Simulation::new(model, &SimulationConfig::default()).unwrap()
    }

    #[test]
    fn drag_pins_node_and_next_tick_holds_it() {
        let mut sim = simulation();
        let mut drag = DragController::new();
        let b = sim.find("B").unwrap();

        drag.start(&mut sim, PointerId(1), b).unwrap();
        drag.drag(&mut sim, PointerId(1), 50.0, 50.0).unwrap();
        sim.step();
        assert_eq!(sim.node(b).unwrap().position(), (50.0, 50.0));

        drag.end(&mut sim, PointerId(1)).unwrap();
        assert!(!sim.node(b).unwrap().is_pinned());
        sim.step();
        assert_ne!(sim.node(b).unwrap().position(), (50.0, 50.0));
    }

    #[test]
    fn start_reheats_settled_simulation() {
        let mut sim = simulation();
        sim.run(1000);
        assert!(!sim.is_running());

        let c = sim.find("C").unwrap();
        let mut drag = DragController::new();
        drag.start(&mut sim, PointerId(0), c).unwrap();
        assert!(sim.is_running());
        assert_eq!(sim.alpha(), 1.0);
        assert_eq!(sim.alpha_target(), DRAG_ALPHA_TARGET);
    }

    #[test]
    fn start_pins_at_current_position() {
        let mut sim = simulation();
        sim.run(5);
        let c = sim.find("C").unwrap();
        let before = sim.node(c).unwrap().position();

        let mut drag = DragController::new();
        drag.start(&mut sim, PointerId(0), c).unwrap();
        let node = sim.node(c).unwrap();
        assert_eq!((node.fx, node.fy), (Some(before.0), Some(before.1)));
    }

    #[test]
    fn alpha_target_resets_only_after_last_gesture() {
        let mut sim = simulation();
        let mut drag = DragController::new();
        let (b, c) = (sim.find("B").unwrap(), sim.find("C").unwrap());

        drag.start(&mut sim, PointerId(1), b).unwrap();
        drag.start(&mut sim, PointerId(2), c).unwrap();
        assert_eq!(drag.active_count(), 2);

        assert_eq!(drag.end(&mut sim, PointerId(1)), Ok(b));
        assert_eq!(sim.alpha_target(), DRAG_ALPHA_TARGET);
        assert!(!sim.node(b).unwrap().is_pinned());
        assert!(sim.node(c).unwrap().is_pinned());

        drag.end(&mut sim, PointerId(2)).unwrap();
        assert_eq!(sim.alpha_target(), 0.0);
    }

    #[test]
    fn gesture_errors() {
        let mut sim = simulation();
        let mut drag = DragController::new();
        let a = sim.find("A").unwrap();

        assert_eq!(
            drag.drag(&mut sim, PointerId(9), 0.0, 0.0),
            Err(DragError::UnknownPointer(PointerId(9)))
        );
        assert_eq!(drag.end(&mut sim, PointerId(9)), Err(DragError::UnknownPointer(PointerId(9))));

        drag.start(&mut sim, PointerId(1), a).unwrap();
        assert_eq!(
            drag.start(&mut sim, PointerId(1), a),
            Err(DragError::AlreadyDragging(PointerId(1)))
        );

        let missing = NodeId::new(99);
        assert_eq!(
            drag.start(&mut sim, PointerId(2), missing),
            Err(DragError::UnknownNode(missing))
        );
        assert!(!drag.is_dragging(PointerId(2)));
    }

    #[test]
    fn viewport_centers_origin() {
        let viewport = Viewport::new(1000.0, 800.0);
        assert_eq!(viewport.to_graph(0.0, 0.0), (-500.0, -400.0));
        assert_eq!(viewport.to_graph(500.0, 400.0), (0.0, 0.0));
    }
}
