//! Simulation and rendering options
//!
//! Every knob is a named field with a documented default. Options are
//! validated once, when a graph is constructed, and can be loaded from JSON or
//! YAML files. Fields missing from a file keep their defaults.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::Link;
use crate::palette::{ACCENT, PaletteOrder};

// =============================================================================
// Default Constants
// =============================================================================

/// Alpha below which the simulation stops (matches d3-force)
pub const DEFAULT_ALPHA_MIN: f64 = 0.001;

/// Number of ticks for alpha to decay from 1 to `DEFAULT_ALPHA_MIN`
pub const DEFAULT_ALPHA_DECAY_TICKS: f64 = 300.0;

/// Velocity multiplier applied every tick (d3 default friction of 0.4)
pub const DEFAULT_VELOCITY_DECAY: f64 = 0.6;

/// Default many-body strength in d3-force
pub const DEFAULT_CHARGE: f64 = -30.0;

/// Barnes-Hut approximation threshold
pub const DEFAULT_THETA: f64 = 0.9;

/// Minimum distance for many-body calculations (avoids the singularity)
pub const DEFAULT_DISTANCE_MIN: f64 = 1.0;

/// Default link rest length in d3-force
pub const DEFAULT_LINK_DISTANCE: f64 = 30.0;

/// Fixed per-character width used to size labels
pub const DEFAULT_CHARACTER_WIDTH: f64 = 9.0;

/// Canvas size of the rendered scene
pub const DEFAULT_SIZE: f64 = 1000.0;

/// Per-tick alpha decay rate that reaches `DEFAULT_ALPHA_MIN` after
/// `DEFAULT_ALPHA_DECAY_TICKS` ticks (about 0.0228)
pub fn default_alpha_decay() -> f64 {
    1.0 - DEFAULT_ALPHA_MIN.powf(1.0 / DEFAULT_ALPHA_DECAY_TICKS)
}

/// Errors raised by option validation or loading
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("dimensions must be positive and finite, got {width}x{height}")]
    InvalidDimensions { width: f64, height: f64 },

    #[error("{field} must be within {min}..={max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{field} must be finite")]
    NonFinite { field: &'static str },

    #[error("color palette must not be empty")]
    EmptyPalette,

    #[error("distance_max ({max}) must exceed distance_min ({min})")]
    InvalidDistanceRange { min: f64, max: f64 },

    #[error("per-link {field} returned a non-finite value for link {link}")]
    NonFiniteAccessor { field: &'static str, link: usize },

    #[error("failed to load configuration: {0}")]
    Load(String),
}

fn finite(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonFinite { field })
    }
}

fn in_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

/// A per-link accessor, evaluated once when the link force is initialized
#[derive(Clone)]
pub struct LinkAccessor(Arc<dyn Fn(&Link) -> f64 + Send + Sync>);

impl LinkAccessor {
    pub fn new(f: impl Fn(&Link) -> f64 + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn call(&self, link: &Link) -> f64 {
        (self.0)(link)
    }
}

impl fmt::Debug for LinkAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LinkAccessor(..)")
    }
}

/// Rest length of the link spring
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum LinkDistance {
    /// Same distance for every link
    Constant { value: f64 },
    /// Computed per link
    #[serde(skip)]
    PerLink(LinkAccessor),
}

/// Stiffness of the link spring
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum LinkStrength {
    /// `1 / min(degree(source), degree(target))`, the d3-force default
    Degree,
    /// Same strength for every link
    Constant { value: f64 },
    /// Computed per link
    #[serde(skip)]
    PerLink(LinkAccessor),
}

/// Link (spring) force options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkForceConfig {
    pub distance: LinkDistance,
    pub strength: LinkStrength,
    /// Passes per tick (more passes give a stiffer constraint)
    pub iterations: usize,
}

impl Default for LinkForceConfig {
    fn default() -> Self {
        Self {
            distance: LinkDistance::Constant { value: 100.0 },
            strength: LinkStrength::Constant { value: 0.1 },
            iterations: 1,
        }
    }
}

impl LinkForceConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if let LinkDistance::Constant { value } = self.distance {
            in_range("link.distance", value, 0.0, f64::MAX)?;
        }
        if let LinkStrength::Constant { value } = self.strength {
            finite("link.strength", value)?;
        }
        if self.iterations == 0 {
            return Err(ConfigError::OutOfRange {
                field: "link.iterations",
                value: 0.0,
                min: 1.0,
                max: f64::MAX,
            });
        }
        Ok(())
    }
}

/// Many-body (charge) force options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChargeForceConfig {
    /// Negative values repel, positive values attract
    pub strength: f64,
    /// Barnes-Hut threshold; 0 computes every pair exactly
    pub theta: f64,
    pub distance_min: f64,
    /// Interactions beyond this distance are ignored (unbounded when absent)
    pub distance_max: Option<f64>,
}

impl Default for ChargeForceConfig {
    fn default() -> Self {
        Self {
            strength: DEFAULT_CHARGE,
            theta: DEFAULT_THETA,
            distance_min: DEFAULT_DISTANCE_MIN,
            distance_max: None,
        }
    }
}

impl ChargeForceConfig {
    /// Default options with the given strength
    pub fn with_strength(strength: f64) -> Self {
        Self {
            strength,
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        finite("charge.strength", self.strength)?;
        in_range("charge.theta", self.theta, 0.0, f64::MAX)?;
        in_range("charge.distance_min", self.distance_min, 0.0, f64::MAX)?;
        if let Some(max) = self.distance_max {
            if max.is_nan() || max <= self.distance_min {
                return Err(ConfigError::InvalidDistanceRange {
                    min: self.distance_min,
                    max,
                });
            }
        }
        Ok(())
    }
}

/// Centering force options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CenterForceConfig {
    pub x: f64,
    pub y: f64,
    pub strength: f64,
}

impl Default for CenterForceConfig {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            strength: 1.0,
        }
    }
}

impl CenterForceConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        finite("center.x", self.x)?;
        finite("center.y", self.y)?;
        in_range("center.strength", self.strength, 0.0, 1.0)
    }
}

/// Layout engine options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub alpha_min: f64,
    pub alpha_decay: f64,
    pub alpha_target: f64,
    pub velocity_decay: f64,
    /// Seed for the jitter that separates coincident nodes
    pub seed: u64,
    /// Force the first node (by construction order) to the origin after every tick
    pub anchor_first_node: bool,
    pub link: LinkForceConfig,
    /// Many-body force, disabled when absent
    pub charge: Option<ChargeForceConfig>,
    /// Centering force, disabled when absent
    pub center: Option<CenterForceConfig>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::compact()
    }
}

impl SimulationConfig {
    /// Short links, strong repulsion and centering (the default)
    pub fn compact() -> Self {
        Self {
            alpha_min: DEFAULT_ALPHA_MIN,
            alpha_decay: default_alpha_decay(),
            alpha_target: 0.0,
            velocity_decay: DEFAULT_VELOCITY_DECAY,
            seed: 1,
            anchor_first_node: true,
            link: LinkForceConfig::default(),
            charge: Some(ChargeForceConfig::with_strength(-100.0)),
            center: Some(CenterForceConfig::default()),
        }
    }

    /// Long degree-weighted links without centering
    pub fn spread() -> Self {
        Self {
            link: LinkForceConfig {
                distance: LinkDistance::Constant { value: 280.0 },
                strength: LinkStrength::Degree,
                iterations: 1,
            },
            charge: Some(ChargeForceConfig::default()),
            center: None,
            ..Self::compact()
        }
    }

    /// Stock d3-force parameters
    pub fn d3() -> Self {
        Self {
            link: LinkForceConfig {
                distance: LinkDistance::Constant {
                    value: DEFAULT_LINK_DISTANCE,
                },
                strength: LinkStrength::Degree,
                iterations: 1,
            },
            charge: Some(ChargeForceConfig::default()),
            center: Some(CenterForceConfig::default()),
            ..Self::compact()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        in_range("alpha_min", self.alpha_min, 0.0, 1.0)?;
        in_range("alpha_decay", self.alpha_decay, 0.0, 1.0)?;
        in_range("alpha_target", self.alpha_target, 0.0, 1.0)?;
        in_range("velocity_decay", self.velocity_decay, 0.0, 1.0)?;
        self.link.validate()?;
        if let Some(charge) = &self.charge {
            charge.validate()?;
        }
        if let Some(center) = &self.center {
            center.validate()?;
        }
        Ok(())
    }
}

/// Visual weight of a link line
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum StrokeWidth {
    /// `sqrt(value)`, with a missing value treated as 1
    Sqrt,
    Constant { value: f64 },
}

/// Renderer options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    pub width: f64,
    pub height: f64,
    pub node_radius: f64,
    pub character_width: f64,
    /// Vertical offset of the label box below the node center
    pub label_y_offset: f64,
    pub label_height: f64,
    /// Approximate text height, used to place the baseline inside the label box
    pub text_height: f64,
    /// Horizontal inset of the text within the label box
    pub text_x_offset: f64,
    pub font_size: String,
    pub label_fill: String,
    pub label_fill_opacity: f64,
    pub link_stroke: String,
    pub link_stroke_opacity: f64,
    pub link_stroke_width: StrokeWidth,
    pub color_by_group: bool,
    pub palette: Vec<String>,
    pub palette_order: PaletteOrder,
    /// Fill used when coloring by group is disabled
    pub node_fill: String,
    /// CSS border of the root element
    pub border: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: DEFAULT_SIZE,
            height: DEFAULT_SIZE,
            node_radius: 10.0,
            character_width: DEFAULT_CHARACTER_WIDTH,
            label_y_offset: 10.0,
            label_height: 20.0,
            text_height: 15.0,
            text_x_offset: 10.0,
            font_size: "0.8em".to_string(),
            label_fill: "#eee".to_string(),
            label_fill_opacity: 0.8,
            link_stroke: "#999".to_string(),
            link_stroke_opacity: 0.6,
            link_stroke_width: StrokeWidth::Sqrt,
            color_by_group: true,
            palette: ACCENT.iter().map(|c| c.to_string()).collect(),
            palette_order: PaletteOrder::FirstSeen,
            node_fill: "#aaa".to_string(),
            border: "1px solid #888888".to_string(),
        }
    }
}

impl RenderOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !valid(self.width) || !valid(self.height) {
            return Err(ConfigError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        in_range("node_radius", self.node_radius, 0.0, f64::MAX)?;
        in_range("character_width", self.character_width, 0.0, f64::MAX)?;
        finite("label_y_offset", self.label_y_offset)?;
        in_range("label_height", self.label_height, 0.0, f64::MAX)?;
        finite("text_height", self.text_height)?;
        finite("text_x_offset", self.text_x_offset)?;
        in_range("label_fill_opacity", self.label_fill_opacity, 0.0, 1.0)?;
        in_range("link_stroke_opacity", self.link_stroke_opacity, 0.0, 1.0)?;
        if let StrokeWidth::Constant { value } = self.link_stroke_width {
            in_range("link_stroke_width", value, 0.0, f64::MAX)?;
        }
        if self.color_by_group && self.palette.is_empty() {
            return Err(ConfigError::EmptyPalette);
        }
        Ok(())
    }
}

/// Named option sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Preset {
    #[default]
    Compact,
    Spread,
    D3,
}

/// Everything needed to build a graph view
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphOptions {
    pub simulation: SimulationConfig,
    pub render: RenderOptions,
}

impl GraphOptions {
    /// Options for a preset with default rendering
    pub fn preset(preset: Preset) -> Self {
        let simulation = match preset {
            Preset::Compact => SimulationConfig::compact(),
            Preset::Spread => SimulationConfig::spread(),
            Preset::D3 => SimulationConfig::d3(),
        };
        Self {
            simulation,
            render: RenderOptions::default(),
        }
    }

    /// Set the canvas size
    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.render.width = width;
        self.render.height = height;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.simulation.validate()?;
        self.render.validate()
    }

    /// Load options from a `.json`, `.yaml` or `.yml` file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Load(format!("{}: {e}", path.display())))?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let options: Self = match ext.as_str() {
            "json" => serde_json::from_str(&text).map_err(|e| ConfigError::Load(e.to_string()))?,
            "yaml" | "yml" => {
                serde_yaml::from_str(&text).map_err(|e| ConfigError::Load(e.to_string()))?
            }
            other => {
                return Err(ConfigError::Load(format!(
                    "unsupported configuration format: {other}"
                )));
            }
        };
        options.validate()?;
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_alpha_decay_matches_d3() {
        let decay = default_alpha_decay();
        assert!((decay - 0.0228).abs() < 1e-4);
        let after = (1.0 - decay).powf(DEFAULT_ALPHA_DECAY_TICKS);
        assert!((after - DEFAULT_ALPHA_MIN).abs() < 1e-9);
    }

    #[test]
    fn presets_validate() {
        for preset in [Preset::Compact, Preset::Spread, Preset::D3] {
            GraphOptions::preset(preset).validate().unwrap();
        }
    }

    #[test]
    fn spread_preset_has_no_center_force() {
        let config = SimulationConfig::spread();
        assert!(config.center.is_none());
        assert!(matches!(config.link.strength, LinkStrength::Degree));
        assert!(matches!(
            config.link.distance,
            LinkDistance::Constant { value } if value == 280.0
        ));
    }

    #[test]
    fn negative_dimensions_are_rejected() {
        let options = GraphOptions::default().with_size(-10.0, 100.0);
        assert!(matches!(
            options.validate(),
            Err(ConfigError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn out_of_range_velocity_decay_is_rejected() {
        let mut config = SimulationConfig::default();
        config.velocity_decay = 1.5;
        let err = config.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "velocity_decay must be within 0..=1, got 1.5"
        );
    }

    #[test]
    fn distance_max_must_exceed_min() {
        let mut config = SimulationConfig::default();
        config.charge = Some(ChargeForceConfig {
            distance_max: Some(0.5),
            ..ChargeForceConfig::default()
        });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDistanceRange { .. })
        ));
    }

    #[test]
    fn empty_palette_is_rejected_only_when_coloring() {
        let mut render = RenderOptions {
            palette: vec![],
            ..RenderOptions::default()
        };
        assert_eq!(render.validate(), Err(ConfigError::EmptyPalette));

        render.color_by_group = false;
        assert!(render.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let options: GraphOptions = serde_json::from_str(
            r#"{"simulation":{"seed":7,"center":null,"link":{"strength":{"mode":"degree"}}},"render":{"width":640}}"#,
        )
        .unwrap();

        assert_eq!(options.simulation.seed, 7);
        assert!(options.simulation.center.is_none());
        assert!(options.simulation.charge.is_some());
        assert!(matches!(options.simulation.link.strength, LinkStrength::Degree));
        assert!(matches!(
            options.simulation.link.distance,
            LinkDistance::Constant { value } if value == 100.0
        ));
        assert_eq!(options.render.width, 640.0);
        assert_eq!(options.render.height, DEFAULT_SIZE);
    }

    #[test]
    fn loads_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.yaml");
        std::fs::write(
            &path,
            "simulation:\n  velocity_decay: 0.5\n  link:\n    distance:\n      mode: constant\n      value: 42\nrender:\n  link_stroke_width:\n    mode: constant\n    value: 1.5\n",
        )
        .unwrap();

        let options = GraphOptions::load(&path).unwrap();
        assert_eq!(options.simulation.velocity_decay, 0.5);
        assert!(matches!(
            options.simulation.link.distance,
            LinkDistance::Constant { value } if value == 42.0
        ));
        assert_eq!(
            options.render.link_stroke_width,
            StrokeWidth::Constant { value: 1.5 }
        );
    }

    #[test]
    fn load_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.json");
        std::fs::write(&path, r#"{"render":{"height":0}}"#).unwrap();

        assert!(matches!(
            GraphOptions::load(&path),
            Err(ConfigError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn load_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.toml");
        std::fs::write(&path, "").unwrap();

        assert!(matches!(GraphOptions::load(&path), Err(ConfigError::Load(_))));
    }
}
