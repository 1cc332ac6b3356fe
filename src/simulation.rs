//! Force simulation driving the layout
//!
//! A [`Simulation`] owns the node store and the resolved links. Each
//! [`step`](Simulation::step) decays alpha, applies the registered forces in
//! registration order, integrates velocities, and then notifies tick
//! subscribers. Once alpha falls below `alpha_min` the simulation settles and
//! the end subscribers are notified exactly once.

use std::fmt;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, SimulationConfig};
use crate::forces::{CenterForce, Force, LinkForce, ManyBodyForce};
use crate::model::{GraphModel, Link, Node, NodeId, NodeStore};

/// Handle returned by [`Simulation::on_tick`] and [`Simulation::on_end`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Snapshot passed to subscribers after a step
#[derive(Debug, Clone, Copy)]
pub struct TickEvent<'a> {
    /// Number of steps taken so far, including this one
    pub tick: usize,
    pub alpha: f64,
    pub nodes: &'a NodeStore,
    pub links: &'a [Link],
}

type Listener = Box<dyn FnMut(&TickEvent<'_>)>;

/// Lifecycle of a simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    /// Alpha dropped below `alpha_min`; `restart` resumes
    Settled,
    /// Stopped by the host; `restart` resumes
    Stopped,
    /// Torn down; nothing runs again
    Disposed,
}

pub struct Simulation {
    nodes: NodeStore,
    links: Vec<Link>,
    forces: Vec<(String, Box<dyn Force>)>,
    alpha: f64,
    alpha_min: f64,
    alpha_decay: f64,
    alpha_target: f64,
    velocity_decay: f64,
    anchor_first_node: bool,
    rng: StdRng,
    state: RunState,
    ticks: usize,
    next_subscription: u64,
    tick_listeners: Vec<(SubscriptionId, Listener)>,
    end_listeners: Vec<(SubscriptionId, Listener)>,
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("nodes", &self.nodes.len())
            .field("links", &self.links.len())
            .field("forces", &self.force_names())
            .field("alpha", &self.alpha)
            .field("state", &self.state)
            .field("ticks", &self.ticks)
            .finish_non_exhaustive()
    }
}

impl Simulation {
    /// Create a running simulation with the forces named in `config`.
    ///
    /// The link force is registered as `"link"`, the optional many-body and
    /// centering forces as `"charge"` and `"center"`.
    pub fn new(model: GraphModel, config: &SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let GraphModel { nodes, links } = model;
        let mut simulation = Self {
            nodes,
            links,
            forces: Vec::new(),
            alpha: 1.0,
            alpha_min: config.alpha_min,
            alpha_decay: config.alpha_decay,
            alpha_target: config.alpha_target,
            velocity_decay: config.velocity_decay,
            anchor_first_node: config.anchor_first_node,
            rng: StdRng::seed_from_u64(config.seed),
            state: RunState::Running,
            ticks: 0,
            next_subscription: 0,
            tick_listeners: Vec::new(),
            end_listeners: Vec::new(),
        };

        simulation.set_force("link", Box::new(LinkForce::new(&config.link)))?;
        if let Some(charge) = &config.charge {
            simulation.set_force("charge", Box::new(ManyBodyForce::new(charge)))?;
        }
        if let Some(center) = &config.center {
            simulation.set_force("center", Box::new(CenterForce::new(center)))?;
        }

        debug!(
            nodes = simulation.nodes.len(),
            links = simulation.links.len(),
            forces = ?simulation.force_names(),
            seed = config.seed,
            "created simulation"
        );
        Ok(simulation)
    }

    // =========================================================================
    // Stepping
    // =========================================================================

    /// Advance the layout by one step.
    ///
    /// Returns `false` without touching any state when the simulation is not
    /// running.
    pub fn step(&mut self) -> bool {
        if self.state != RunState::Running {
            return false;
        }

        self.alpha += (self.alpha_target - self.alpha) * self.alpha_decay;
        let previous: Vec<(f64, f64)> = self.nodes.iter().map(Node::position).collect();

        for (_, force) in &mut self.forces {
            force.apply(&mut self.nodes, &self.links, self.alpha, &mut self.rng);
        }

        for node in self.nodes.as_mut_slice() {
            match node.fx {
                Some(fx) => {
                    node.x = fx;
                    node.vx = 0.0;
                }
                None => {
                    node.vx *= self.velocity_decay;
                    node.x += node.vx;
                }
            }
            match node.fy {
                Some(fy) => {
                    node.y = fy;
                    node.vy = 0.0;
                }
                None => {
                    node.vy *= self.velocity_decay;
                    node.y += node.vy;
                }
            }
        }

        for (node, &(px, py)) in self.nodes.as_mut_slice().iter_mut().zip(&previous) {
            let finite = node.x.is_finite()
                && node.y.is_finite()
                && node.vx.is_finite()
                && node.vy.is_finite();
            if !finite {
                warn!(node = %node.id, tick = self.ticks + 1, "non-finite position, restoring previous");
                node.x = px;
                node.y = py;
                node.vx = 0.0;
                node.vy = 0.0;
            }
        }

        if self.anchor_first_node {
            if let Some(first) = self.nodes.as_mut_slice().first_mut() {
                first.x = 0.0;
                first.y = 0.0;
            }
        }

        self.ticks += 1;
        let event = TickEvent {
            tick: self.ticks,
            alpha: self.alpha,
            nodes: &self.nodes,
            links: &self.links,
        };
        emit(&mut self.tick_listeners, &event);

        if self.alpha < self.alpha_min {
            self.state = RunState::Settled;
            info!(ticks = self.ticks, alpha = self.alpha, "simulation settled");
            emit(&mut self.end_listeners, &event);
        }
        true
    }

    /// Animation-frame entry point: one step if running
    pub fn frame(&mut self) -> bool {
        self.step()
    }

    /// Step until settled or `max_frames` steps have run; returns the number
    /// of steps taken.
    pub fn run(&mut self, max_frames: usize) -> usize {
        let mut taken = 0;
        while taken < max_frames && self.step() {
            taken += 1;
        }
        taken
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Reset alpha to 1 and resume stepping. Ignored after `dispose`.
    pub fn restart(&mut self) {
        if self.state == RunState::Disposed {
            warn!("restart ignored on a disposed simulation");
            return;
        }
        self.alpha = 1.0;
        self.state = RunState::Running;
        debug!(alpha_target = self.alpha_target, "simulation restarted");
    }

    /// Halt stepping until `restart`. Calling it again has no effect.
    pub fn stop(&mut self) {
        match self.state {
            RunState::Running | RunState::Settled => {
                self.state = RunState::Stopped;
                debug!(ticks = self.ticks, "simulation stopped");
            }
            RunState::Stopped | RunState::Disposed => {}
        }
    }

    /// Stop for good and drop every subscriber
    pub fn dispose(&mut self) {
        if self.state == RunState::Disposed {
            return;
        }
        self.state = RunState::Disposed;
        self.tick_listeners.clear();
        self.end_listeners.clear();
        debug!(ticks = self.ticks, "simulation disposed");
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == RunState::Running
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Set the current alpha directly; values are clamped to `0..=1`
    pub fn set_alpha(&mut self, alpha: f64) {
        if alpha.is_nan() {
            warn!("ignoring NaN alpha");
            return;
        }
        self.alpha = alpha.clamp(0.0, 1.0);
    }

    pub fn alpha_target(&self) -> f64 {
        self.alpha_target
    }

    /// Set the value alpha decays toward; values are clamped to `0..=1`
    pub fn set_alpha_target(&mut self, target: f64) {
        if target.is_nan() {
            warn!("ignoring NaN alpha target");
            return;
        }
        self.alpha_target = target.clamp(0.0, 1.0);
    }

    /// Steps taken since creation
    pub fn ticks(&self) -> usize {
        self.ticks
    }

    // =========================================================================
    // Subscribers
    // =========================================================================

    /// Call `listener` after every step, in subscription order
    pub fn on_tick(&mut self, listener: impl FnMut(&TickEvent<'_>) + 'static) -> SubscriptionId {
        let id = self.next_id();
        self.tick_listeners.push((id, Box::new(listener)));
        id
    }

    /// Call `listener` once each time the simulation settles
    pub fn on_end(&mut self, listener: impl FnMut(&TickEvent<'_>) + 'static) -> SubscriptionId {
        let id = self.next_id();
        self.end_listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a subscriber; returns whether it was registered
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.tick_listeners.len() + self.end_listeners.len();
        self.tick_listeners.retain(|(i, _)| *i != id);
        self.end_listeners.retain(|(i, _)| *i != id);
        before != self.tick_listeners.len() + self.end_listeners.len()
    }

    fn next_id(&mut self) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        id
    }

    // =========================================================================
    // Forces
    // =========================================================================

    pub fn force(&self, name: &str) -> Option<&dyn Force> {
        self.forces
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, force)| force.as_ref())
    }

    /// Register a force under `name`, replacing any force already there.
    ///
    /// A replaced force keeps its position in the application order.
    pub fn set_force(&mut self, name: &str, mut force: Box<dyn Force>) -> Result<(), ConfigError> {
        force.initialize(&self.nodes, &self.links)?;
        match self.forces.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => *slot = force,
            None => self.forces.push((name.to_string(), force)),
        }
        Ok(())
    }

    pub fn remove_force(&mut self, name: &str) -> Option<Box<dyn Force>> {
        let position = self.forces.iter().position(|(n, _)| n == name)?;
        Some(self.forces.remove(position).1)
    }

    /// Registered force names in application order
    pub fn force_names(&self) -> Vec<&str> {
        self.forces.iter().map(|(name, _)| name.as_str()).collect()
    }

    // =========================================================================
    // Nodes
    // =========================================================================

    pub fn nodes(&self) -> &NodeStore {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn find(&self, id: &str) -> Option<NodeId> {
        self.nodes.find(id)
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Fix a node at `(x, y)`; returns `false` for an unknown handle
    pub fn pin(&mut self, id: NodeId, x: f64, y: f64) -> bool {
        match self.nodes.get_mut(id) {
            Some(node) => {
                node.fx = Some(x);
                node.fy = Some(y);
                true
            }
            None => false,
        }
    }

    /// Release a pinned node; returns `false` for an unknown handle
    pub fn unpin(&mut self, id: NodeId) -> bool {
        match self.nodes.get_mut(id) {
            Some(node) => {
                node.fx = None;
                node.fy = None;
                true
            }
            None => false,
        }
    }
}

fn emit(listeners: &mut [(SubscriptionId, Listener)], event: &TickEvent<'_>) {
    for (_, listener) in listeners.iter_mut() {
        listener(event);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::model::{GraphData, LinkData, NodeData};

    fn triangle() -> GraphData {
        GraphData::new(
            vec![NodeData::new("a"), NodeData::new("b"), NodeData::new("c")],
            vec![
                LinkData::new("a", "b"),
                LinkData::new("b", "c"),
                LinkData::new("c", "a").with_value(4.0),
            ],
        )
    }

    fn simulation(data: &GraphData) -> Simulation {
        let model = GraphModel::from_data(data).unwrap();
        Simulation::new(model, &SimulationConfig::default()).unwrap()
    }

    /// Sets one node's velocity to NaN every tick
    struct Poison(usize);

    impl Force for Poison {
        fn initialize(&mut self, _: &NodeStore, _: &[Link]) -> Result<(), ConfigError> {
            Ok(())
        }

        fn apply(&mut self, nodes: &mut NodeStore, _: &[Link], _: f64, _: &mut StdRng) {
            nodes.as_mut_slice()[self.0].vx = f64::NAN;
        }
    }

    #[test]
    fn first_node_is_anchored_at_origin() {
        let mut sim = simulation(&triangle());
        assert!(sim.step());
        assert_eq!(sim.nodes().as_slice()[0].position(), (0.0, 0.0));
    }

    #[test]
    fn anchor_can_be_disabled() {
        let model = GraphModel::from_data(&triangle()).unwrap();
        let config = SimulationConfig {
            anchor_first_node: false,
            ..SimulationConfig::default()
        };
        let mut sim = Simulation::new(model, &config).unwrap();
        sim.step();
        assert_ne!(sim.nodes().as_slice()[0].position(), (0.0, 0.0));
    }

    #[test]
    fn pinned_nodes_hold_their_position() {
        let mut data = triangle();
        data.nodes[1].fx = Some(42.0);
        data.nodes[1].fy = Some(-7.0);
        let mut sim = simulation(&data);

        sim.run(10);
        let b = &sim.nodes().as_slice()[1];
        assert_eq!(b.position(), (42.0, -7.0));
        assert_eq!((b.vx, b.vy), (0.0, 0.0));
    }

    #[test]
    fn pin_and_unpin_by_handle() {
        let mut sim = simulation(&triangle());
        let c = sim.find("c").unwrap();

        assert!(sim.pin(c, 5.0, 6.0));
        sim.step();
        assert_eq!(sim.node(c).unwrap().position(), (5.0, 6.0));

        assert!(sim.unpin(c));
        sim.step();
        assert!(!sim.node(c).unwrap().is_pinned());
        assert_ne!(sim.node(c).unwrap().position(), (5.0, 6.0));
    }

    #[test]
    fn stop_is_idempotent_and_freezes_state() {
        let mut sim = simulation(&triangle());
        sim.step();
        sim.stop();
        sim.stop();
        assert_eq!(sim.state(), RunState::Stopped);

        let before = sim.nodes().as_slice().to_vec();
        let alpha = sim.alpha();
        assert!(!sim.step());
        assert_eq!(sim.nodes().as_slice(), before.as_slice());
        assert_eq!(sim.alpha(), alpha);
        assert_eq!(sim.ticks(), 1);
    }

    #[test]
    fn same_seed_gives_bit_identical_runs() {
        let data = triangle();
        let mut one = simulation(&data);
        let mut two = simulation(&data);
        one.run(50);
        two.run(50);

        for (a, b) in one.nodes().iter().zip(two.nodes().iter()) {
            assert_eq!(a.x.to_bits(), b.x.to_bits());
            assert_eq!(a.y.to_bits(), b.y.to_bits());
        }
    }

    #[test]
    fn alpha_decays_toward_target() {
        let mut sim = simulation(&triangle());
        sim.step();
        let expected = 1.0 - crate::config::default_alpha_decay();
        assert!((sim.alpha() - expected).abs() < 1e-12);
    }

    #[test]
    fn settles_after_about_three_hundred_ticks_and_ends_once() {
        let mut sim = simulation(&triangle());
        let ended = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&ended);
        sim.on_end(move |_| *counter.borrow_mut() += 1);

        let taken = sim.run(1000);
        assert!((299..=302).contains(&taken), "settled after {taken} ticks");
        assert_eq!(sim.state(), RunState::Settled);
        assert!(!sim.step());
        assert_eq!(*ended.borrow(), 1);
    }

    #[test]
    fn restart_resets_alpha_and_resumes() {
        let mut sim = simulation(&triangle());
        sim.run(1000);
        sim.set_alpha_target(0.3);
        sim.restart();
        assert_eq!(sim.alpha(), 1.0);
        assert!(sim.is_running());

        // Alpha now decays toward the target and never settles
        sim.run(2000);
        assert!(sim.is_running());
        assert!((sim.alpha() - 0.3).abs() < 1e-3);
    }

    #[test]
    fn tick_listeners_run_in_subscription_order() {
        let mut sim = simulation(&triangle());
        let log = Rc::new(RefCell::new(Vec::new()));

        let first = Rc::clone(&log);
        sim.on_tick(move |e| first.borrow_mut().push(("first", e.tick)));
        let second = Rc::clone(&log);
        sim.on_tick(move |e| second.borrow_mut().push(("second", e.tick)));

        sim.step();
        sim.step();
        assert_eq!(
            *log.borrow(),
            vec![("first", 1), ("second", 1), ("first", 2), ("second", 2)]
        );
    }

    #[test]
    fn tick_event_sees_updated_positions() {
        let mut sim = simulation(&triangle());
        let seen = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&seen);
        sim.on_tick(move |e| *sink.borrow_mut() = Some(e.nodes.as_slice()[2].position()));

        sim.step();
        let c = sim.nodes().as_slice()[2].position();
        assert_eq!(*seen.borrow(), Some(c));
    }

    #[test]
    fn unsubscribed_listener_is_not_called() {
        let mut sim = simulation(&triangle());
        let calls = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&calls);
        let id = sim.on_tick(move |_| *counter.borrow_mut() += 1);

        sim.step();
        assert!(sim.unsubscribe(id));
        assert!(!sim.unsubscribe(id));
        sim.step();
        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn dispose_drops_listeners_and_ignores_restart() {
        let mut sim = simulation(&triangle());
        let calls = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&calls);
        sim.on_tick(move |_| *counter.borrow_mut() += 1);

        sim.dispose();
        sim.restart();
        assert_eq!(sim.state(), RunState::Disposed);
        assert!(!sim.step());
        assert_eq!(*calls.borrow(), 0);
        assert_eq!(Rc::strong_count(&calls), 1);
    }

    #[test]
    fn non_finite_velocity_restores_previous_position() {
        let mut sim = simulation(&triangle());
        let before = sim.nodes().as_slice()[1].position();
        sim.set_force("poison", Box::new(Poison(1))).unwrap();

        sim.step();
        let b = &sim.nodes().as_slice()[1];
        assert_eq!(b.position(), before);
        assert_eq!((b.vx, b.vy), (0.0, 0.0));
        assert!(sim.nodes().iter().all(|n| n.x.is_finite() && n.y.is_finite()));
    }

    #[test]
    fn anchor_holds_when_first_node_goes_non_finite() {
        let mut sim = simulation(&triangle());
        sim.set_force("poison", Box::new(Poison(0))).unwrap();

        sim.step();
        let first = &sim.nodes().as_slice()[0];
        assert_eq!(first.position(), (0.0, 0.0));
        assert_eq!((first.vx, first.vy), (0.0, 0.0));
    }

    #[test]
    fn force_registry_replaces_in_place() {
        let mut sim = simulation(&triangle());
        assert_eq!(sim.force_names(), vec!["link", "charge", "center"]);

        sim.set_force("link", Box::new(Poison(0))).unwrap();
        assert_eq!(sim.force_names(), vec!["link", "charge", "center"]);

        assert!(sim.remove_force("charge").is_some());
        assert!(sim.remove_force("charge").is_none());
        assert!(sim.force("charge").is_none());
        assert_eq!(sim.force_names(), vec!["link", "center"]);
    }

    #[test]
    fn spread_preset_has_no_center_force() {
        let model = GraphModel::from_data(&triangle()).unwrap();
        let sim = Simulation::new(model, &SimulationConfig::spread()).unwrap();
        assert_eq!(sim.force_names(), vec!["link", "charge"]);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let model = GraphModel::from_data(&triangle()).unwrap();
        let config = SimulationConfig {
            velocity_decay: 2.0,
            ..SimulationConfig::default()
        };
        assert!(matches!(
            Simulation::new(model, &config),
            Err(ConfigError::OutOfRange {
                field: "velocity_decay",
                ..
            })
        ));
    }

    #[test]
    fn empty_graph_steps_without_panicking() {
        let mut sim = simulation(&GraphData::new(vec![], vec![]));
        assert!(sim.step());
    }
}
