use rand::rngs::StdRng;

use super::Force;
use crate::config::{CenterForceConfig, ConfigError};
use crate::model::{Link, NodeStore};

/// Translate all nodes so their mean position moves toward a target point.
///
/// Positions are shifted directly; velocities and relative layout are
/// untouched, so this force never changes the shape of the graph.
#[derive(Debug, Clone)]
pub struct CenterForce {
    x: f64,
    y: f64,
    strength: f64,
}

impl CenterForce {
    pub fn new(config: &CenterForceConfig) -> Self {
        Self {
            x: config.x,
            y: config.y,
            strength: config.strength,
        }
    }
}

impl Force for CenterForce {
    fn initialize(&mut self, _nodes: &NodeStore, _links: &[Link]) -> Result<(), ConfigError> {
        Ok(())
    }

    fn apply(&mut self, nodes: &mut NodeStore, _links: &[Link], _alpha: f64, _rng: &mut StdRng) {
        if nodes.is_empty() {
            return;
        }

        let n = nodes.len() as f64;
        let (sx, sy) = nodes
            .iter()
            .fold((0.0, 0.0), |(sx, sy), node| (sx + node.x, sy + node.y));
        let dx = (sx / n - self.x) * self.strength;
        let dy = (sy / n - self.y) * self.strength;

        for node in nodes.as_mut_slice() {
            node.x -= dx;
            node.y -= dy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GraphData, GraphModel, NodeData};
    use rand::SeedableRng;

    fn model() -> GraphModel {
        let data = GraphData::new(
            vec![
                NodeData::new("a").with_position(10.0, 20.0),
                NodeData::new("b").with_position(30.0, 40.0),
            ],
            vec![],
        );
        GraphModel::from_data(&data).unwrap()
    }

    #[test]
    fn full_strength_moves_centroid_to_target() {
        let mut m = model();
        let mut force = CenterForce::new(&CenterForceConfig {
            x: 5.0,
            y: -5.0,
            strength: 1.0,
        });
        let mut rng = StdRng::seed_from_u64(1);
        force.apply(&mut m.nodes, &m.links, 0.5, &mut rng);

        let nodes = m.nodes.as_slice();
        assert_eq!((nodes[0].x + nodes[1].x) / 2.0, 5.0);
        assert_eq!((nodes[0].y + nodes[1].y) / 2.0, -5.0);
        // relative layout preserved
        assert_eq!(nodes[1].x - nodes[0].x, 20.0);
    }

    #[test]
    fn partial_strength_moves_part_way() {
        let mut m = model();
        let mut force = CenterForce::new(&CenterForceConfig {
            strength: 0.5,
            ..CenterForceConfig::default()
        });
        let mut rng = StdRng::seed_from_u64(1);
        force.apply(&mut m.nodes, &m.links, 1.0, &mut rng);

        let nodes = m.nodes.as_slice();
        assert_eq!((nodes[0].x + nodes[1].x) / 2.0, 10.0);
        assert_eq!((nodes[0].vx, nodes[0].vy), (0.0, 0.0));
    }
}
