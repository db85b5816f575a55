use tracing::debug;

use super::RoadNetwork;
use crate::domain::{NodeId, WayId};
use crate::geometry::line::{interpolate_between, points_to_insert};

impl RoadNetwork {
    /// Insert interpolated nodes so no segment is longer than `max_distance`
    ///
    /// Running it again on its own output changes nothing.
    pub fn densify(&mut self, max_distance: f64) -> usize {
        let way_ids: Vec<WayId> = self.ways.keys().copied().collect();
        let mut inserted = 0;

        for way_id in way_ids {
            let Some(refs) = self.ways.get(&way_id).map(|w| w.refs.clone()) else {
                continue;
            };
            let mut new_refs: Vec<NodeId> = Vec::with_capacity(refs.len());
            for (i, &r) in refs.iter().enumerate() {
                if i > 0 {
                    let prev = refs[i - 1];
                    if let (Some(a), Some(b)) = (self.nodes.get(&prev), self.nodes.get(&r)) {
                        let (a, b) = (a.local, b.local);
                        let count = points_to_insert(a.distance(b), max_distance);
                        for p in interpolate_between(a, b, count) {
                            new_refs.push(self.add_node(p));
                            inserted += 1;
                        }
                    }
                }
                new_refs.push(r);
            }
            if let Some(way) = self.ways.get_mut(&way_id) {
                way.refs = new_refs;
            }
        }

        debug!("densify inserted {inserted} nodes");
        inserted
    }
}
