use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::RoadNetwork;
use crate::domain::{FeatureClass, NodeId, Way, WayId};
use crate::geometry::line::{bearing_deg, bearing_difference};

/// Way ends attached at each node, excluding closed rings and self-touching ends
type EndpointIndex = BTreeMap<NodeId, BTreeSet<WayId>>;

/// Whether two ways may be drawn as one continuous ribbon
pub fn compatible(a: &Way, b: &Way) -> bool {
    if a.flags.bridge != b.flags.bridge {
        return false;
    }
    match (a.class, b.class) {
        (FeatureClass::Highway(x), FeatureClass::Highway(y)) => x == y && a.flags.lit == b.flags.lit,
        (FeatureClass::Railway(x), FeatureClass::Railway(y)) => {
            x == y && a.flags.electrified == b.flags.electrified
        }
        _ => false,
    }
}

/// Ends of `way` that can take part in a junction: not a closed ring and the
/// end node is not referenced anywhere else in the way
fn junction_ends(way: &Way) -> Vec<NodeId> {
    if way.is_closed() {
        return Vec::new();
    }
    let mut ends = Vec::with_capacity(2);
    for end in [way.first(), way.last()].into_iter().flatten() {
        if way.count_of(end) == 1 && !ends.contains(&end) {
            ends.push(end);
        }
    }
    ends
}

impl RoadNetwork {
    fn endpoint_index(&self) -> EndpointIndex {
        let mut index = EndpointIndex::new();
        for way in self.ways.values() {
            for end in junction_ends(way) {
                index.entry(end).or_default().insert(way.id);
            }
        }
        index
    }

    /// Change of travel direction when going from `a` through `node` into `b`, in degrees
    ///
    /// 0 means `b` continues `a` straight on, 180 means it doubles back.
    pub fn junction_deviation(&self, a: &Way, b: &Way, node: NodeId) -> Option<f64> {
        let pa = self.way_points(a);
        let pb = self.way_points(b);
        if pa.len() < 2 || pb.len() < 2 {
            return None;
        }
        let incoming = if a.last() == Some(node) {
            bearing_deg(pa[pa.len() - 2], pa[pa.len() - 1])
        } else if a.first() == Some(node) {
            bearing_deg(pa[1], pa[0])
        } else {
            return None;
        };
        let outgoing = if b.first() == Some(node) {
            bearing_deg(pb[0], pb[1])
        } else if b.last() == Some(node) {
            bearing_deg(pb[pb.len() - 1], pb[pb.len() - 2])
        } else {
            return None;
        };
        Some(bearing_difference(incoming, outgoing))
    }

    /// Merge compatible ways meeting end to end
    ///
    /// At every junction the pair that continues most nearly straight is merged
    /// first, as long as its direction change is below `max_angle`; merging is
    /// repeated until no qualifying pair is left at that node. Returns the
    /// number of merges.
    pub fn rejoin(&mut self, max_angle: f64) -> usize {
        let mut index = self.endpoint_index();
        let junctions: Vec<NodeId> = index
            .iter()
            .filter(|(_, ways)| ways.len() >= 2)
            .map(|(&node, _)| node)
            .collect();

        let mut merged = 0;
        for node in junctions {
            while let Some((a, b)) = self.best_pair_at(node, &index, max_angle) {
                self.merge_at(node, a, b, &mut index);
                merged += 1;
            }
        }
        debug!("rejoined {merged} way pairs, {} ways remain", self.ways.len());
        merged
    }

    fn best_pair_at(&self, node: NodeId, index: &EndpointIndex, max_angle: f64) -> Option<(WayId, WayId)> {
        let candidates: Vec<WayId> = index.get(&node)?.iter().copied().collect();
        let mut best: Option<(f64, WayId, WayId)> = None;
        for (i, &a) in candidates.iter().enumerate() {
            for &b in &candidates[i + 1..] {
                let (Some(wa), Some(wb)) = (self.ways.get(&a), self.ways.get(&b)) else {
                    continue;
                };
                if !compatible(wa, wb) {
                    continue;
                }
                let Some(deviation) = self.junction_deviation(wa, wb, node) else {
                    continue;
                };
                if deviation >= max_angle {
                    continue;
                }
                if best.is_none_or(|(d, _, _)| deviation < d) {
                    best = Some((deviation, a, b));
                }
            }
        }
        best.map(|(_, a, b)| (a, b))
    }

    /// Append `b` to `a` through `node`; `a` keeps its id, `b` is removed
    fn merge_at(&mut self, node: NodeId, a: WayId, b: WayId, index: &mut EndpointIndex) {
        let (Some(mut wa), Some(wb)) = (self.ways.remove(&a), self.ways.remove(&b)) else {
            return;
        };
        for way in [&wa, &wb] {
            for end in junction_ends(way) {
                if let Some(set) = index.get_mut(&end) {
                    set.remove(&way.id);
                }
            }
        }

        if wa.last() != Some(node) {
            wa.refs.reverse();
        }
        let mut tail = wb.refs;
        if tail.first() != Some(&node) {
            tail.reverse();
        }
        wa.refs.extend_from_slice(&tail[1..]);

        for end in junction_ends(&wa) {
            index.entry(end).or_default().insert(a);
        }
        debug!("merged way {b} into {a} at node {node}");
        self.ways.insert(a, wa);
    }
}
