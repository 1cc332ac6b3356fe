//! Scene graph and SVG output
//!
//! A [`Scene`] mirrors the simulation: one [`LinkLine`] per link and one
//! [`NodeGlyph`] per node, in the same order. Colors and label geometry are
//! fixed when the scene is built; [`Scene::update`] only moves things.

use askama::Template;
use tracing::debug;

use crate::config::{RenderOptions, StrokeWidth};
use crate::model::{Group, Link, NodeId, NodeStore};
use crate::palette::OrdinalScale;

/// Page title of the HTML shell
pub const PAGE_TITLE: &str = "D3 Force Directed Graph";

/// Line drawn for one link
#[derive(Debug, Clone, PartialEq)]
pub struct LinkLine {
    pub source: NodeId,
    pub target: NodeId,
    pub value: Option<f64>,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub stroke_width: f64,
}

/// Label box and text placement, relative to the node center
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub text_x: f64,
    pub text_y: f64,
}

impl LabelBox {
    fn new(id: &str, options: &RenderOptions) -> Self {
        let width = label_width(id, options.character_width);
        let x = -width / 2.0;
        Self {
            x,
            y: options.label_y_offset,
            width,
            height: options.label_height,
            text_x: x + options.text_x_offset,
            text_y: options.label_y_offset + options.text_height,
        }
    }
}

/// Circle plus label drawn for one node
#[derive(Debug, Clone, PartialEq)]
pub struct NodeGlyph {
    pub node: NodeId,
    pub id: String,
    pub group: Option<Group>,
    pub x: f64,
    pub y: f64,
    pub fill: String,
    pub label: LabelBox,
}

impl NodeGlyph {
    pub fn transform(&self) -> String {
        format!("translate({}, {})", self.x, self.y)
    }
}

/// Axis-aligned box around every node center
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

#[derive(Template)]
#[template(path = "graph.svg", escape = "html")]
struct GraphTemplate<'a> {
    width: f64,
    height: f64,
    view_box: String,
    options: &'a RenderOptions,
    links: &'a [LinkLine],
    nodes: &'a [NodeGlyph],
}

#[derive(Template)]
#[template(path = "index.html")]
struct PageTemplate<'a> {
    title: &'a str,
    svg: &'a str,
}

/// Rendered state of the graph
#[derive(Debug, Clone)]
pub struct Scene {
    options: RenderOptions,
    links: Vec<LinkLine>,
    nodes: Vec<NodeGlyph>,
    tick: usize,
    alpha: f64,
}

impl Scene {
    pub fn new(nodes: &NodeStore, links: &[Link], options: &RenderOptions) -> Self {
        let mut scale = OrdinalScale::from_groups(
            options.palette.clone(),
            nodes.iter().map(|n| n.group.as_ref()),
            options.palette_order,
        );

        let glyphs = nodes
            .iter()
            .zip(nodes.ids())
            .map(|(node, handle)| NodeGlyph {
                node: handle,
                id: node.id.clone(),
                group: node.group.clone(),
                x: node.x,
                y: node.y,
                fill: if options.color_by_group {
                    scale.color(node.group.as_ref()).to_string()
                } else {
                    options.node_fill.clone()
                },
                label: LabelBox::new(&node.id, options),
            })
            .collect();

        let lines = links
            .iter()
            .map(|link| {
                let (x1, y1) = nodes[link.source].position();
                let (x2, y2) = nodes[link.target].position();
                LinkLine {
                    source: link.source,
                    target: link.target,
                    value: link.value,
                    x1,
                    y1,
                    x2,
                    y2,
                    stroke_width: stroke_width(link.value, options.link_stroke_width),
                }
            })
            .collect();

        debug!(
            nodes = nodes.len(),
            links = links.len(),
            groups = scale.domain().len(),
            "built scene"
        );

        Self {
            options: options.clone(),
            links: lines,
            nodes: glyphs,
            tick: 0,
            alpha: 1.0,
        }
    }

    /// Move every line endpoint and node glyph to the current positions
    pub fn update(&mut self, nodes: &NodeStore, links: &[Link]) {
        for (line, link) in self.links.iter_mut().zip(links) {
            (line.x1, line.y1) = nodes[link.source].position();
            (line.x2, line.y2) = nodes[link.target].position();
        }
        for (glyph, node) in self.nodes.iter_mut().zip(nodes.iter()) {
            glyph.x = node.x;
            glyph.y = node.y;
        }
    }

    /// Record which simulation step the scene reflects
    pub fn stamp(&mut self, tick: usize, alpha: f64) {
        self.tick = tick;
        self.alpha = alpha;
    }

    pub fn tick(&self) -> usize {
        self.tick
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn links(&self) -> &[LinkLine] {
        &self.links
    }

    pub fn nodes(&self) -> &[NodeGlyph] {
        &self.nodes
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn glyph(&self, node: NodeId) -> Option<&NodeGlyph> {
        self.nodes.get(node.index())
    }

    /// `[min_x, min_y, width, height]` of the origin-centered root
    pub fn view_box(&self) -> [f64; 4] {
        let (w, h) = (self.options.width, self.options.height);
        [-w / 2.0, -h / 2.0, w, h]
    }

    /// Extent of the node centers, `None` for an empty graph
    pub fn bounds(&self) -> Option<Bounds> {
        let first = self.nodes.first()?;
        let init = Bounds {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        };
        Some(self.nodes.iter().fold(init, |b, n| Bounds {
            min_x: b.min_x.min(n.x),
            min_y: b.min_y.min(n.y),
            max_x: b.max_x.max(n.x),
            max_y: b.max_y.max(n.y),
        }))
    }

    /// Top-most node whose circle contains the graph point `(x, y)`
    pub fn node_at(&self, x: f64, y: f64) -> Option<NodeId> {
        let r2 = self.options.node_radius * self.options.node_radius;
        // later glyphs are drawn on top
        self.nodes
            .iter()
            .rev()
            .find(|g| {
                let (dx, dy) = (g.x - x, g.y - y);
                dx * dx + dy * dy <= r2
            })
            .map(|g| g.node)
    }

    pub fn to_svg(&self) -> askama::Result<String> {
        let [x, y, w, h] = self.view_box();
        GraphTemplate {
            width: self.options.width,
            height: self.options.height,
            view_box: format!("{x} {y} {w} {h}"),
            options: &self.options,
            links: &self.links,
            nodes: &self.nodes,
        }
        .render()
    }

    /// Standalone page with the SVG mounted in `#app`
    pub fn to_html(&self) -> askama::Result<String> {
        let svg = self.to_svg()?;
        PageTemplate {
            title: PAGE_TITLE,
            svg: &svg,
        }
        .render()
    }
}

/// Label width from a fixed per-character advance, counted in UTF-16 units
pub fn label_width(id: &str, character_width: f64) -> f64 {
    character_width * id.encode_utf16().count() as f64
}

/// Link stroke width. A missing, negative or non-finite value counts as 1.
pub fn stroke_width(value: Option<f64>, mode: StrokeWidth) -> f64 {
    match mode {
        StrokeWidth::Sqrt => value
            .filter(|v| v.is_finite() && *v >= 0.0)
            .unwrap_or(1.0)
            .sqrt(),
        StrokeWidth::Constant { value } => value,
    }
}
