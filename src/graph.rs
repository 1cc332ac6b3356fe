//! The assembled graph view
//!
//! [`ForceGraph`] wires the pieces together: it builds the model from an input
//! document, creates the simulation, and subscribes a [`Scene`] to its ticks so
//! the rendered state always reflects the latest step. The host drives it by
//! calling [`ForceGraph::frame`] once per animation frame and forwarding
//! pointer events.

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use tracing::{debug, info};

use crate::config::GraphOptions;
use crate::drag::{DragController, DragError, PointerId, Viewport};
use crate::model::{GraphData, GraphError, GraphModel, NodeId};
use crate::render::Scene;
use crate::simulation::Simulation;

pub struct ForceGraph {
    simulation: Simulation,
    scene: Rc<RefCell<Scene>>,
    drag: DragController,
    viewport: Viewport,
}

impl ForceGraph {
    /// Validate the options, resolve the document and start the simulation.
    ///
    /// The input document is copied; it is never modified.
    pub fn new(data: &GraphData, options: &GraphOptions) -> Result<Self, GraphError> {
        options.validate()?;

        let model = GraphModel::from_data(data)?;
        let scene = Rc::new(RefCell::new(Scene::new(
            &model.nodes,
            &model.links,
            &options.render,
        )));
        let mut simulation = Simulation::new(model, &options.simulation)?;

        let sink = Rc::clone(&scene);
        simulation.on_tick(move |event| {
            let mut scene = sink.borrow_mut();
            scene.update(event.nodes, event.links);
            scene.stamp(event.tick, event.alpha);
        });

        debug!(
            width = options.render.width,
            height = options.render.height,
            "created force graph"
        );

        Ok(Self {
            simulation,
            scene,
            drag: DragController::new(),
            viewport: Viewport::new(options.render.width, options.render.height),
        })
    }

    /// One animation frame: at most one step, with the scene refreshed before
    /// returning. Returns whether a step ran.
    pub fn frame(&mut self) -> bool {
        self.simulation.frame()
    }

    /// Run frames until the layout settles or `max_frames` have run
    pub fn settle(&mut self, max_frames: usize) -> usize {
        let frames = self.simulation.run(max_frames);
        info!(
            frames,
            settled = !self.simulation.is_running(),
            alpha = self.simulation.alpha(),
            "layout finished"
        );
        frames
    }

    pub fn scene(&self) -> Ref<'_, Scene> {
        self.scene.borrow()
    }

    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    pub fn simulation_mut(&mut self) -> &mut Simulation {
        &mut self.simulation
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Node under the screen pixel `(px, py)`
    pub fn hit_test(&self, px: f64, py: f64) -> Option<NodeId> {
        let (x, y) = self.viewport.to_graph(px, py);
        self.scene.borrow().node_at(x, y)
    }

    /// Start dragging whatever node is under the pointer, if any
    pub fn pointer_down(&mut self, pointer: PointerId, px: f64, py: f64) -> Result<Option<NodeId>, DragError> {
        match self.hit_test(px, py) {
            Some(node) => {
                self.drag_start(pointer, node)?;
                Ok(Some(node))
            }
            None => Ok(None),
        }
    }

    pub fn drag_start(&mut self, pointer: PointerId, node: NodeId) -> Result<(), DragError> {
        self.drag.start(&mut self.simulation, pointer, node)
    }

    /// Move the dragged node to the screen pixel `(px, py)`
    pub fn drag_move(&mut self, pointer: PointerId, px: f64, py: f64) -> Result<(), DragError> {
        let (x, y) = self.viewport.to_graph(px, py);
        self.drag.drag(&mut self.simulation, pointer, x, y)
    }

    pub fn drag_end(&mut self, pointer: PointerId) -> Result<NodeId, DragError> {
        self.drag.end(&mut self.simulation, pointer)
    }

    pub fn to_svg(&self) -> askama::Result<String> {
        self.scene.borrow().to_svg()
    }

    pub fn to_html(&self) -> askama::Result<String> {
        self.scene.borrow().to_html()
    }

    /// Stop the simulation and drop the renderer subscription
    pub fn dispose(&mut self) {
        self.simulation.dispose();
    }
}

impl Drop for ForceGraph {
    fn drop(&mut self) {
        self.dispose();
    }
}
