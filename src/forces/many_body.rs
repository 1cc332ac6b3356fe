use rand::rngs::StdRng;

use super::{Force, jiggle};
use crate::config::{ChargeForceConfig, ConfigError};
use crate::model::{Link, NodeStore};
use crate::quadtree::QuadTree;

/// Pairwise charge between all nodes using the Barnes-Hut approximation.
///
/// A cell whose width is small relative to its distance from the node
/// (`width / distance < theta`) acts as a single body at its charge-weighted
/// centroid, giving O(n log n) work per tick.
#[derive(Debug, Clone)]
pub struct ManyBodyForce {
    strength: f64,
    theta2: f64,
    distance_min2: f64,
    distance_max2: f64,
    charges: Vec<f64>,
}

impl ManyBodyForce {
    pub fn new(config: &ChargeForceConfig) -> Self {
        Self {
            strength: config.strength,
            theta2: config.theta * config.theta,
            distance_min2: config.distance_min * config.distance_min,
            distance_max2: config.distance_max.map_or(f64::INFINITY, |d| d * d),
            charges: Vec::new(),
        }
    }
}

impl Force for ManyBodyForce {
    fn initialize(&mut self, nodes: &NodeStore, _links: &[Link]) -> Result<(), ConfigError> {
        self.charges = vec![self.strength; nodes.len()];
        Ok(())
    }

    fn apply(&mut self, nodes: &mut NodeStore, _links: &[Link], alpha: f64, rng: &mut StdRng) {
        let points: Vec<(f64, f64)> = nodes.iter().map(|n| (n.x, n.y)).collect();
        let mut tree = QuadTree::build(&points);
        tree.accumulate(&self.charges);

        for (index, node) in nodes.as_mut_slice().iter_mut().enumerate() {
            let (nx, ny) = (node.x, node.y);
            let (mut dvx, mut dvy) = (0.0, 0.0);

            tree.visit(|cell| {
                if cell.charge == 0.0 {
                    return true;
                }

                let mut x = cell.cx - nx;
                let mut y = cell.cy - ny;
                let w = cell.width();
                let mut l = x * x + y * y;

                // Far enough away: treat the whole cell as one body
                if w * w / self.theta2 < l {
                    if l < self.distance_max2 {
                        if x == 0.0 {
                            x = jiggle(rng);
                            l += x * x;
                        }
                        if y == 0.0 {
                            y = jiggle(rng);
                            l += y * y;
                        }
                        if l < self.distance_min2 {
                            l = (self.distance_min2 * l).sqrt();
                        }
                        dvx += x * cell.charge * alpha / l;
                        dvy += y * cell.charge * alpha / l;
                    }
                    return true;
                }

                let Some(points) = cell.points() else {
                    return false;
                };
                if l >= self.distance_max2 {
                    return true;
                }

                if points.len() > 1 || points.first() != Some(&index) {
                    if x == 0.0 {
                        x = jiggle(rng);
                        l += x * x;
                    }
                    if y == 0.0 {
                        y = jiggle(rng);
                        l += y * y;
                    }
                    if l < self.distance_min2 {
                        l = (self.distance_min2 * l).sqrt();
                    }
                }

                for &other in points {
                    if other != index {
                        let w = self.charges[other] * alpha / l;
                        dvx += x * w;
                        dvy += y * w;
                    }
                }
                true
            });

            node.vx += dvx;
            node.vy += dvy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GraphData, GraphModel, NodeData};
    use rand::SeedableRng;

    fn model(positions: &[(f64, f64)]) -> GraphModel {
        let nodes = positions
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| NodeData::new(format!("n{i}")).with_position(x, y))
            .collect();
        GraphModel::from_data(&GraphData::new(nodes, vec![])).unwrap()
    }

    fn apply(model: &mut GraphModel, config: &ChargeForceConfig) {
        let mut force = ManyBodyForce::new(config);
        force.initialize(&model.nodes, &model.links).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        force.apply(&mut model.nodes, &model.links, 1.0, &mut rng);
    }

    #[test]
    fn negative_charge_pushes_nodes_apart() {
        let mut m = model(&[(-5.0, 0.0), (5.0, 0.0)]);
        apply(&mut m, &ChargeForceConfig::default());

        let nodes = m.nodes.as_slice();
        assert!(nodes[0].vx < 0.0);
        assert!(nodes[1].vx > 0.0);
        assert!((nodes[0].vx + nodes[1].vx).abs() < 1e-12);
    }

    #[test]
    fn positive_charge_attracts() {
        let mut m = model(&[(-5.0, 0.0), (5.0, 0.0)]);
        apply(&mut m, &ChargeForceConfig::with_strength(30.0));

        let nodes = m.nodes.as_slice();
        assert!(nodes[0].vx > 0.0);
        assert!(nodes[1].vx < 0.0);
    }

    #[test]
    fn approximation_is_close_to_exact() {
        let positions: Vec<(f64, f64)> = (0..40)
            .map(|i| {
                let t = i as f64 * 0.7;
                (t.cos() * (10.0 + 3.0 * t), t.sin() * (10.0 + 3.0 * t))
            })
            .collect();

        let mut exact = model(&positions);
        apply(
            &mut exact,
            &ChargeForceConfig {
                theta: 0.0,
                ..ChargeForceConfig::default()
            },
        );
        let mut approx = model(&positions);
        apply(&mut approx, &ChargeForceConfig::default());

        let (mut error, mut total) = (0.0, 0.0);
        for (e, a) in exact.nodes.iter().zip(approx.nodes.iter()) {
            error += (e.vx - a.vx).hypot(e.vy - a.vy);
            total += e.vx.hypot(e.vy);
        }
        assert!(total > 0.0);
        assert!(error / total < 0.2, "relative error {}", error / total);
    }

    #[test]
    fn coincident_nodes_are_separated_without_nan() {
        let mut m = model(&[(2.0, 2.0), (2.0, 2.0), (2.0, 2.0)]);
        apply(&mut m, &ChargeForceConfig::default());

        for node in m.nodes.iter() {
            assert!(node.vx.is_finite() && node.vy.is_finite());
            assert!(node.vx != 0.0 || node.vy != 0.0);
        }
    }

    #[test]
    fn distance_max_cuts_off_far_nodes() {
        let mut m = model(&[(0.0, 0.0), (500.0, 0.0)]);
        apply(
            &mut m,
            &ChargeForceConfig {
                distance_max: Some(100.0),
                ..ChargeForceConfig::default()
            },
        );
        for node in m.nodes.iter() {
            assert_eq!((node.vx, node.vy), (0.0, 0.0));
        }
    }
}
