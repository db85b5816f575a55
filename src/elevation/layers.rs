//! Vertical ordering of features that share a node.
//!
//! Layer 0 is drawn on top. Crossing features get distinct layers at the
//! shared node, every other node inherits a layer from the nearest shared
//! node along its way.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::domain::{NodeId, Way, WayId};
use crate::topology::RoadNetwork;

/// How one way touches a shared node
#[derive(Debug, Clone, Copy)]
struct Attachment {
    way: WayId,
    interior: bool,
    railway: bool,
    rank: u8,
}

impl Attachment {
    fn new(way: &Way, node: NodeId) -> Self {
        let n = way.refs.len();
        let interior = way.refs[1..n.saturating_sub(1).max(1)].contains(&node);
        Self {
            way: way.id,
            interior,
            railway: way.class.is_railway(),
            rank: way.class.type_rank(),
        }
    }

    /// Highest priority sorts first
    fn priority(&self, other: &Self) -> Ordering {
        other
            .interior
            .cmp(&self.interior)
            .then(other.railway.cmp(&self.railway))
            .then(other.rank.cmp(&self.rank))
            .then(self.way.cmp(&other.way))
    }
}

impl RoadNetwork {
    /// Ways referencing each node, each way listed once
    fn node_owners(&self) -> BTreeMap<NodeId, BTreeSet<WayId>> {
        let mut owners: BTreeMap<NodeId, BTreeSet<WayId>> = BTreeMap::new();
        for way in self.ways.values() {
            for &r in &way.refs {
                owners.entry(r).or_default().insert(way.id);
            }
        }
        owners
    }

    /// Give each way a distinct layer at every node it shares with other ways
    ///
    /// Interior points outrank endpoints, railways outrank highways, then
    /// type rank, then the lower way id. Returns the number of shared nodes.
    pub fn assign_layers(&mut self) -> usize {
        let owners = self.node_owners();
        let mut shared = 0;
        for (node_id, way_ids) in owners {
            let Some(node) = self.nodes.get_mut(&node_id) else {
                continue;
            };
            node.layers.clear();
            if way_ids.len() < 2 {
                continue;
            }
            let mut attachments: Vec<Attachment> = way_ids
                .iter()
                .filter_map(|id| self.ways.get(id))
                .map(|w| Attachment::new(w, node_id))
                .collect();
            attachments.sort_by(|a, b| a.priority(b));
            for (layer, a) in attachments.iter().enumerate() {
                node.layers.insert(a.way, layer.min(u8::MAX as usize) as u8);
            }
            shared += 1;
        }
        debug!("assigned layers at {shared} shared nodes");
        shared
    }

    /// Fill layers of the remaining nodes from the bounding shared nodes
    ///
    /// Between two nodes with a known layer, the first half of the interior
    /// nodes take the start layer and the rest take the end layer. Way ends
    /// without a known layer count as layer 0.
    pub fn interpolate_layers(&mut self) {
        for way in self.ways.values() {
            let refs = &way.refs;
            let n = refs.len();
            if n < 2 {
                continue;
            }
            let known: Vec<Option<u8>> = refs
                .iter()
                .map(|r| self.nodes.get(r).and_then(|node| node.layers.get(&way.id).copied()))
                .collect();

            let marks: Vec<usize> = (0..n)
                .filter(|&i| i == 0 || i == n - 1 || known[i].is_some())
                .collect();

            let mut assigned: Vec<(NodeId, u8)> = Vec::with_capacity(n);
            for &i in &marks {
                assigned.push((refs[i], known[i].unwrap_or(0)));
            }
            for pair in marks.windows(2) {
                let (start, end) = (pair[0], pair[1]);
                let start_layer = known[start].unwrap_or(0);
                let end_layer = known[end].unwrap_or(0);
                let interior = end - start - 1;
                for k in 0..interior {
                    let layer = if k < interior.div_ceil(2) { start_layer } else { end_layer };
                    assigned.push((refs[start + 1 + k], layer));
                }
            }

            for (node_id, layer) in assigned {
                if let Some(node) = self.nodes.get_mut(&node_id) {
                    node.layers.entry(way.id).or_insert(layer);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::topology::test_support::*;

    #[test]
    fn test_railway_interior_beats_highway_endpoint() {
        let mut net = network(
            &[(0.0, 0.0), (50.0, 0.0), (100.0, 0.0), (50.0, -80.0)],
            &[(7, vec![0, 1, 2], RAIL), (3, vec![3, 1], RESIDENTIAL)],
        );
        assert_eq!(net.assign_layers(), 1);
        let n = &net.nodes[&1];
        assert!(n.layer_for(7) < n.layer_for(3));
    }

    #[test]
    fn test_interior_outranks_class() {
        // a highway passing through outranks a railway ending at the node
        let mut net = network(
            &[(0.0, 0.0), (50.0, 0.0), (100.0, 0.0), (50.0, -80.0)],
            &[(1, vec![0, 1, 2], PRIMARY), (2, vec![3, 1], RAIL)],
        );
        net.assign_layers();
        assert_eq!(net.nodes[&1].layer_for(1), 0);
        assert_eq!(net.nodes[&1].layer_for(2), 1);
    }

    #[test]
    fn test_rank_then_id() {
        let mut net = network(
            &[(0.0, 0.0), (50.0, 0.0), (100.0, 0.0), (50.0, 50.0), (50.0, -50.0)],
            &[
                (9, vec![0, 1], RESIDENTIAL),
                (4, vec![1, 2], RESIDENTIAL),
                (6, vec![3, 1], PRIMARY),
            ],
        );
        net.assign_layers();
        let n = &net.nodes[&1];
        assert_eq!(n.layer_for(6), 0);
        assert_eq!(n.layer_for(4), 1);
        assert_eq!(n.layer_for(9), 2);
    }

    #[test]
    fn test_interpolation_switches_at_midpoint() {
        // way 1 is layer 1 at node 0 (under the rail) and layer 0 at its far end
        let mut net = network(
            &[
                (0.0, 0.0),
                (10.0, 0.0),
                (20.0, 0.0),
                (30.0, 0.0),
                (40.0, 0.0),
                (0.0, -50.0),
                (0.0, 50.0),
            ],
            &[(1, vec![0, 1, 2, 3, 4], RESIDENTIAL), (2, vec![5, 0, 6], RAIL)],
        );
        net.assign_layers();
        net.interpolate_layers();
        let layers: Vec<u8> = (0..5).map(|i| net.nodes[&i].layer_for(1)).collect();
        assert_eq!(layers, vec![1, 1, 1, 0, 0]);
        assert_eq!(net.nodes[&5].layer_for(2), 0);
    }
}
