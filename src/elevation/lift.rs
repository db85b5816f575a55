use std::collections::{BTreeMap, BTreeSet, VecDeque};

use tracing::debug;

use crate::config::RoadsConfig;
use crate::domain::{NodeId, WayId};
use crate::topology::RoadNetwork;

/// Neighbour reached over one segment of a way
#[derive(Debug, Clone, Copy)]
struct Edge {
    to: NodeId,
    length: f64,
    max_slope: f64,
}

impl RoadNetwork {
    fn adjacency(&self, cfg: &RoadsConfig) -> BTreeMap<NodeId, Vec<Edge>> {
        let mut adjacency: BTreeMap<NodeId, Vec<Edge>> = BTreeMap::new();
        for way in self.ways.values() {
            let max_slope = cfg.max_slope(way.class.slope_class());
            for pair in way.refs.windows(2) {
                let (Some(a), Some(b)) = (self.nodes.get(&pair[0]), self.nodes.get(&pair[1])) else {
                    continue;
                };
                let length = a.local.distance(b.local);
                adjacency.entry(a.id).or_default().push(Edge {
                    to: b.id,
                    length,
                    max_slope,
                });
                adjacency.entry(b.id).or_default().push(Edge {
                    to: a.id,
                    length,
                    max_slope,
                });
            }
        }
        adjacency
    }

    /// Spread the lift of bridge ends into the surrounding network
    ///
    /// Starting at both ends of every bridge, walks outward breadth first.
    /// A neighbour gets `max(0, upstream height - length * max_slope - ground)`
    /// unless it already has at least that much. A walk stops where it would
    /// add nothing. Nodes are never revisited within one bridge, so cycles
    /// terminate. Returns the number of lift updates.
    pub fn propagate_lift(&mut self, bridges: &[WayId], cfg: &RoadsConfig) -> usize {
        let adjacency = self.adjacency(cfg);
        let mut updates = 0;

        for bridge_id in bridges {
            let Some(bridge) = self.ways.get(bridge_id) else {
                continue;
            };
            let mut visited: BTreeSet<NodeId> = bridge.refs.iter().copied().collect();
            let mut queue: VecDeque<NodeId> = [bridge.first(), bridge.last()].into_iter().flatten().collect();

            while let Some(current) = queue.pop_front() {
                let Some(upstream) = self.nodes.get(&current).and_then(|n| n.height()) else {
                    continue;
                };
                let Some(edges) = adjacency.get(&current) else {
                    continue;
                };
                for edge in edges {
                    if visited.contains(&edge.to) {
                        continue;
                    }
                    let Some(neighbour) = self.nodes.get_mut(&edge.to) else {
                        continue;
                    };
                    let Some(ground) = neighbour.msl else {
                        continue;
                    };
                    let candidate = (upstream - edge.length * edge.max_slope - ground).max(0.0);
                    if candidate <= 0.0 || neighbour.v_add >= candidate {
                        continue;
                    }
                    neighbour.v_add = candidate;
                    visited.insert(edge.to);
                    queue.push_back(edge.to);
                    updates += 1;
                }
            }
        }
        debug!("lift propagation made {updates} updates from {} bridges", bridges.len());
        updates
    }
}

/// Lift of an interior vertex at arc length `s` of a span of length `total`
///
/// `h0` and `h1` are the end target heights. The linear blend between them is
/// capped by the slope line falling from the higher end, but the cap never
/// reaches below the lower end. Never drops below the node's own lift.
pub fn blended_lift(h0: f64, h1: f64, s: f64, total: f64, max_slope: f64, ground: f64, node_lift: f64) -> f64 {
    let t = if total > 0.0 { (s / total).clamp(0.0, 1.0) } else { 0.0 };
    let linear = h0 + (h1 - h0) * t;
    let from_high = if h0 >= h1 {
        h0 - s * max_slope
    } else {
        h1 - (total - s) * max_slope
    };
    let slope_cap = from_high.max(h0.min(h1));
    node_lift.max((linear.min(slope_cap) - ground).max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elevation::FlatTerrain;
    use crate::topology::test_support::*;

    fn cfg() -> RoadsConfig {
        RoadsConfig::default()
    }

    #[test]
    fn test_lift_decays_away_from_bridge() {
        // bridge 1 spans nodes 0-1, road 2 continues from node 1
        let mut net = network(
            &[(0.0, 0.0), (50.0, 0.0), (60.0, 0.0), (70.0, 0.0), (80.0, 0.0), (200.0, 0.0)],
            &[(1, vec![0, 1], BRIDGE), (2, vec![1, 2, 3, 4, 5], RESIDENTIAL)],
        );
        net.probe_ground(&FlatTerrain { elevation: 100.0 }).unwrap();
        net.nodes.get_mut(&1).unwrap().v_add = 2.0;

        net.propagate_lift(&[1], &cfg());

        let lifts: Vec<f64> = (1..6).map(|i| net.nodes[&i].v_add).collect();
        for w in lifts.windows(2) {
            assert!(w[1] <= w[0] + 1e-9, "lift increased: {lifts:?}");
        }
        // 10 m at 8% takes 0.8 m off
        assert!((lifts[1] - 1.2).abs() < 0.01);
        assert!((lifts[2] - 0.4).abs() < 0.01);
        assert_eq!(lifts[3], 0.0);
        assert_eq!(lifts[4], 0.0);
    }

    #[test]
    fn test_existing_higher_lift_untouched() {
        let mut net = network(
            &[(0.0, 0.0), (50.0, 0.0), (60.0, 0.0)],
            &[(1, vec![0, 1], BRIDGE), (2, vec![1, 2], RESIDENTIAL)],
        );
        net.probe_ground(&FlatTerrain { elevation: 0.0 }).unwrap();
        net.nodes.get_mut(&1).unwrap().v_add = 2.0;
        net.nodes.get_mut(&2).unwrap().v_add = 5.0;
        assert_eq!(net.propagate_lift(&[1], &cfg()), 0);
        assert_eq!(net.nodes[&2].v_add, 5.0);
    }

    #[test]
    fn test_cycle_terminates() {
        let mut net = network(
            &[(0.0, 0.0), (30.0, 0.0), (40.0, 0.0), (40.0, 10.0), (30.0, 10.0)],
            &[
                (1, vec![0, 1], BRIDGE),
                (2, vec![1, 2, 3, 4, 1], RESIDENTIAL),
            ],
        );
        net.probe_ground(&FlatTerrain { elevation: 0.0 }).unwrap();
        net.nodes.get_mut(&1).unwrap().v_add = 10.0;
        let updates = net.propagate_lift(&[1], &cfg());
        assert!(updates <= 3);
        assert!(net.nodes[&2].v_add > 0.0);
        assert!(net.nodes[&4].v_add > 0.0);
    }

    #[test]
    fn test_blended_lift() {
        // flat ground at 0, both ends at 10 m: the middle stays at 10
        assert!((blended_lift(10.0, 10.0, 50.0, 100.0, 0.08, 0.0, 0.0) - 10.0).abs() < 1e-9);
        // one end at 10, other at 0: slope cap from the high end
        let lift = blended_lift(10.0, 0.0, 100.0, 200.0, 0.08, 0.0, 0.0);
        assert!((lift - 2.0).abs() < 1e-9);
        // never below the node's own lift
        assert_eq!(blended_lift(0.0, 0.0, 10.0, 20.0, 0.08, 0.0, 3.0), 3.0);
    }

    #[test]
    fn test_blended_lift_level_span_does_not_sag() {
        for s in [10.0, 25.0, 50.0, 75.0, 90.0] {
            let lift = blended_lift(10.0, 10.0, s, 100.0, 0.08, 0.0, 0.0);
            assert!((lift - 10.0).abs() < 1e-9, "sagged to {lift} at {s}");
        }
        // unequal ends: the cap stops at the lower end
        let lift = blended_lift(4.0, 10.0, 20.0, 200.0, 0.08, 0.0, 0.0);
        assert!((lift - 4.0).abs() < 1e-9);
    }
}
