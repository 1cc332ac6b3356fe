use rand::rngs::StdRng;

use super::{Force, jiggle};
use crate::config::{ConfigError, LinkDistance, LinkForceConfig, LinkStrength};
use crate::model::{self, Link, NodeStore};

/// Spring force between linked nodes.
///
/// Each link pulls (or pushes) its endpoints toward the rest distance. The
/// correction is split between the endpoints by degree, so a hub moves less
/// than a leaf attached to it.
#[derive(Debug, Clone)]
pub struct LinkForce {
    distance: LinkDistance,
    strength: LinkStrength,
    iterations: usize,
    distances: Vec<f64>,
    strengths: Vec<f64>,
    bias: Vec<f64>,
}

impl LinkForce {
    pub fn new(config: &LinkForceConfig) -> Self {
        Self {
            distance: config.distance.clone(),
            strength: config.strength.clone(),
            iterations: config.iterations.max(1),
            distances: Vec::new(),
            strengths: Vec::new(),
            bias: Vec::new(),
        }
    }

    /// Resolved rest distance per link
    pub fn distances(&self) -> &[f64] {
        &self.distances
    }

    /// Resolved strength per link
    pub fn strengths(&self) -> &[f64] {
        &self.strengths
    }
}

impl Force for LinkForce {
    fn initialize(&mut self, nodes: &NodeStore, links: &[Link]) -> Result<(), ConfigError> {
        let count = model::degrees(nodes.len(), links);

        self.bias = links
            .iter()
            .map(|l| {
                let s = count[l.source.index()] as f64;
                let t = count[l.target.index()] as f64;
                s / (s + t)
            })
            .collect();

        self.strengths = links
            .iter()
            .map(|l| {
                let value = match &self.strength {
                    LinkStrength::Degree => {
                        let min = count[l.source.index()].min(count[l.target.index()]);
                        1.0 / min as f64
                    }
                    LinkStrength::Constant { value } => *value,
                    LinkStrength::PerLink(f) => f.call(l),
                };
                if value.is_finite() {
                    Ok(value)
                } else {
                    Err(ConfigError::NonFiniteAccessor {
                        field: "link strength",
                        link: l.index,
                    })
                }
            })
            .collect::<Result<_, _>>()?;

        self.distances = links
            .iter()
            .map(|l| {
                let value = match &self.distance {
                    LinkDistance::Constant { value } => *value,
                    LinkDistance::PerLink(f) => f.call(l),
                };
                if value.is_finite() {
                    Ok(value)
                } else {
                    Err(ConfigError::NonFiniteAccessor {
                        field: "link distance",
                        link: l.index,
                    })
                }
            })
            .collect::<Result<_, _>>()?;

        Ok(())
    }

    fn apply(&mut self, nodes: &mut NodeStore, links: &[Link], alpha: f64, rng: &mut StdRng) {
        for _ in 0..self.iterations {
            for (i, link) in links.iter().enumerate() {
                let source = &nodes[link.source];
                let target = &nodes[link.target];

                let mut x = target.x + target.vx - source.x - source.vx;
                if x == 0.0 {
                    x = jiggle(rng);
                }
                let mut y = target.y + target.vy - source.y - source.vy;
                if y == 0.0 {
                    y = jiggle(rng);
                }

                let l = (x * x + y * y).sqrt();
                let k = (l - self.distances[i]) / l * alpha * self.strengths[i];
                x *= k;
                y *= k;

                let b = self.bias[i];
                let target = &mut nodes[link.target];
                target.vx -= x * b;
                target.vy -= y * b;
                let source = &mut nodes[link.source];
                source.vx += x * (1.0 - b);
                source.vy += y * (1.0 - b);
            }
        }
    }
}
