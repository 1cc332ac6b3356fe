//! Graph data model
//!
//! The input document ([`GraphData`]) is deserialized as-is and never mutated.
//! Building a [`GraphModel`] clones it into a [`NodeStore`] owned by the
//! simulation, where nodes are addressed by stable [`NodeId`] handles and links
//! refer to their endpoints by handle rather than by reference.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::ConfigError;

/// Radius scale of the initial phyllotaxis placement (matches d3-force)
pub const INITIAL_RADIUS: f64 = 10.0;

/// Errors raised while building the simulation graph
#[derive(Error, Debug)]
pub enum GraphError {
    /// A link names a node identifier that is not in the node set
    #[error("link {link} references unknown {endpoint} node '{id}'")]
    UnresolvedEndpoint {
        link: usize,
        endpoint: Endpoint,
        id: String,
    },

    /// Two nodes share the same identifier
    #[error("duplicate node id '{0}'")]
    DuplicateNode(String),

    /// An input coordinate is NaN or infinite
    #[error("node '{id}' has a non-finite {field} coordinate")]
    NonFiniteCoordinate { id: String, field: &'static str },

    /// The supplied options failed validation
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Which end of a link failed to resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Source,
    Target,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Source => f.write_str("source"),
            Endpoint::Target => f.write_str("target"),
        }
    }
}

/// A comparable group label attached to a node.
///
/// Groups are compared by variant first (bool < integer < float < text) and
/// then by value; floats use their IEEE total order so the ordering is total.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Group {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Group {
    fn rank(&self) -> u8 {
        match self {
            Group::Bool(_) => 0,
            Group::Integer(_) => 1,
            Group::Float(_) => 2,
            Group::Text(_) => 3,
        }
    }
}

impl Ord for Group {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Group::Bool(a), Group::Bool(b)) => a.cmp(b),
            (Group::Integer(a), Group::Integer(b)) => a.cmp(b),
            (Group::Float(a), Group::Float(b)) => a.total_cmp(b),
            (Group::Text(a), Group::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Group {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Group {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Group {}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Group::Bool(b) => write!(f, "{b}"),
            Group::Integer(i) => write!(f, "{i}"),
            Group::Float(x) => write!(f, "{x}"),
            Group::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Group {
    fn from(value: i64) -> Self {
        Group::Integer(value)
    }
}

impl From<&str> for Group {
    fn from(value: &str) -> Self {
        Group::Text(value.to_string())
    }
}

/// A node as it appears in the input document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    /// Unique identifier, used to resolve link endpoints
    pub id: String,

    /// Optional group label used for coloring
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<Group>,

    /// Optional initial position
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,

    /// Optional fixed position
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fx: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fy: Option<f64>,

    /// Any other fields are carried along untouched
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl NodeData {
    /// Create a node with only an identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            group: None,
            x: None,
            y: None,
            fx: None,
            fy: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Set the group label
    pub fn with_group(mut self, group: impl Into<Group>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Set the initial position
    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }
}

/// A link as it appears in the input document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkData {
    /// Source node identifier
    pub source: String,

    /// Target node identifier
    pub target: String,

    /// Optional link weight
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl LinkData {
    /// Create a link between two node identifiers
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            value: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Set the link weight
    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }
}

/// The static input document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
    /// All nodes, in construction order
    pub nodes: Vec<NodeData>,

    /// All links
    #[serde(default)]
    pub links: Vec<LinkData>,
}

impl GraphData {
    /// Create a document from nodes and links
    pub fn new(nodes: Vec<NodeData>, links: Vec<LinkData>) -> Self {
        Self { nodes, links }
    }
}

/// Stable handle to a node in a [`NodeStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Position of the node in construction order
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Simulation-local node state
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: String,
    pub group: Option<Group>,
    /// Index in construction order
    pub index: usize,
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    /// Fixed x coordinate, overrides the simulation while set
    pub fx: Option<f64>,
    /// Fixed y coordinate, overrides the simulation while set
    pub fy: Option<f64>,
}

impl Node {
    /// Whether either coordinate is pinned
    pub fn is_pinned(&self) -> bool {
        self.fx.is_some() || self.fy.is_some()
    }

    /// Current position
    pub fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }
}

/// A link with both endpoints resolved to node handles
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    /// Index in the input document
    pub index: usize,
    pub source: NodeId,
    pub target: NodeId,
    pub value: Option<f64>,
}

/// Owned node storage addressed by [`NodeId`]
#[derive(Debug, Clone, Default)]
pub struct NodeStore {
    nodes: Vec<Node>,
    by_id: HashMap<String, NodeId>,
}

impl NodeStore {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    /// Look up a node handle by identifier
    pub fn find(&self, id: &str) -> Option<NodeId> {
        self.by_id.get(id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Handles of all nodes, in construction order
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + use<> {
        (0..self.nodes.len()).map(NodeId)
    }

    pub fn as_slice(&self) -> &[Node] {
        &self.nodes
    }

    pub fn as_mut_slice(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    fn push(&mut self, node: Node) -> Result<NodeId, GraphError> {
        let handle = NodeId(self.nodes.len());
        match self.by_id.entry(node.id.clone()) {
            Entry::Occupied(_) => return Err(GraphError::DuplicateNode(node.id)),
            Entry::Vacant(slot) => {
                slot.insert(handle);
            }
        }
        self.nodes.push(node);
        Ok(handle)
    }
}

impl Index<NodeId> for NodeStore {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }
}

impl IndexMut<NodeId> for NodeStore {
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }
}

/// Initial placement on a phyllotaxis spiral, as d3-force does for nodes
/// without a position.
pub fn initial_position(index: usize) -> (f64, f64) {
    let initial_angle = std::f64::consts::PI * (3.0 - 5.0_f64.sqrt());
    let radius = INITIAL_RADIUS * (0.5 + index as f64).sqrt();
    let angle = index as f64 * initial_angle;
    (radius * angle.cos(), radius * angle.sin())
}

/// Resolved graph: the private node copy plus links by handle
#[derive(Debug, Clone, Default)]
pub struct GraphModel {
    pub nodes: NodeStore,
    pub links: Vec<Link>,
}

impl GraphModel {
    /// Clone the input document into an owned store and resolve every link.
    ///
    /// Fails on the first non-finite coordinate, duplicate node id or
    /// unresolved link endpoint.
    pub fn from_data(data: &GraphData) -> Result<Self, GraphError> {
        let mut nodes = NodeStore::default();

        for (index, node) in data.nodes.iter().enumerate() {
            for (field, value) in [("x", node.x), ("y", node.y), ("fx", node.fx), ("fy", node.fy)] {
                if value.is_some_and(|v| !v.is_finite()) {
                    return Err(GraphError::NonFiniteCoordinate {
                        id: node.id.clone(),
                        field,
                    });
                }
            }
            // a half-given position goes on the spiral; pins still win
            let (x, y) = match (node.fx.or(node.x), node.fy.or(node.y)) {
                (Some(x), Some(y)) => (x, y),
                _ => {
                    let (px, py) = initial_position(index);
                    (node.fx.unwrap_or(px), node.fy.unwrap_or(py))
                }
            };
            nodes.push(Node {
                id: node.id.clone(),
                group: node.group.clone(),
                index,
                x,
                y,
                vx: 0.0,
                vy: 0.0,
                fx: node.fx,
                fy: node.fy,
            })?;
        }

        let links = data
            .links
            .iter()
            .enumerate()
            .map(|(index, link)| {
                let resolve = |id: &str, endpoint| {
                    nodes
                        .find(id)
                        .ok_or_else(|| GraphError::UnresolvedEndpoint {
                            link: index,
                            endpoint,
                            id: id.to_string(),
                        })
                };
                Ok(Link {
                    index,
                    source: resolve(&link.source, Endpoint::Source)?,
                    target: resolve(&link.target, Endpoint::Target)?,
                    value: link.value,
                })
            })
            .collect::<Result<Vec<_>, GraphError>>()?;

        debug!(nodes = nodes.len(), links = links.len(), "built graph model");

        Ok(Self { nodes, links })
    }

    /// Number of links touching each node (self-loops count twice)
    pub fn degrees(&self) -> Vec<usize> {
        degrees(self.nodes.len(), &self.links)
    }
}

pub(crate) fn degrees(node_count: usize, links: &[Link]) -> Vec<usize> {
    let mut count = vec![0; node_count];
    for link in links {
        count[link.source.index()] += 1;
        count[link.target.index()] += 1;
    }
    count
}
