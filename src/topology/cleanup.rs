use tracing::{debug, info, warn};

use super::RoadNetwork;
use crate::domain::WayId;

impl RoadNetwork {
    /// Drop ways tagged as tunnels; they are never rendered
    pub fn remove_tunnels(&mut self) -> usize {
        let before = self.ways.len();
        self.ways.retain(|_, w| !w.flags.tunnel);
        let removed = before - self.ways.len();
        debug!("removed {removed} tunnels");
        removed
    }

    /// Turn bridges shorter than `min_length` into ordinary ways
    pub fn demote_short_bridges(&mut self, min_length: f64) -> usize {
        let short: Vec<WayId> = self
            .ways
            .values()
            .filter(|w| w.is_bridge() && self.way_length(w) < min_length)
            .map(|w| w.id)
            .collect();
        for id in &short {
            if let Some(way) = self.ways.get_mut(id) {
                way.demote_bridge();
            }
        }
        debug!("demoted {} short bridges", short.len());
        short.len()
    }

    /// Remove repeated refs and points closer than `min_distance` to the previous kept point
    ///
    /// Endpoints are always kept so junctions survive; a way never drops below 2 points.
    pub fn remove_near_duplicates(&mut self, min_distance: f64) -> usize {
        let mut removed = 0;
        let nodes = &self.nodes;
        for way in self.ways.values_mut() {
            let before = way.refs.len();
            way.refs.dedup();

            if way.refs.len() > 2 {
                let pos = |id| nodes.get(&id).map(|n| n.local);
                let last = way.refs[way.refs.len() - 1];
                let mut kept = vec![way.refs[0]];
                for &r in &way.refs[1..way.refs.len() - 1] {
                    let prev = kept[kept.len() - 1];
                    match (pos(prev), pos(r)) {
                        (Some(a), Some(b)) if a.distance(b) < min_distance => continue,
                        _ => kept.push(r),
                    }
                }
                // the last point wins over a close interior point before it
                while kept.len() > 1 {
                    let prev = kept[kept.len() - 1];
                    match (pos(prev), pos(last)) {
                        (Some(a), Some(b)) if a.distance(b) < min_distance => {
                            kept.pop();
                        }
                        _ => break,
                    }
                }
                kept.push(last);
                kept.dedup();
                // a ring shrunk onto its start point keeps its refs
                if kept.len() >= 2 {
                    way.refs = kept;
                }
            }
            removed += before - way.refs.len();
        }
        debug!("removed {removed} near-duplicate points");
        removed
    }

    /// Drop ways left with fewer than two refs, logging each
    pub fn sanity_check(&mut self, step: &str) -> usize {
        let bad: Vec<WayId> = self
            .ways
            .values()
            .filter(|w| w.refs.len() < 2)
            .map(|w| w.id)
            .collect();
        for id in &bad {
            warn!("way {id} has fewer than 2 nodes after {step}, removing");
            self.ways.remove(id);
        }
        bad.len()
    }

    /// Forget nodes no way references any more
    pub fn prune_unused_nodes(&mut self) -> usize {
        let used = self.used_nodes();
        let before = self.nodes.len();
        self.nodes.retain(|id, _| used.contains(id));
        let pruned = before - self.nodes.len();
        info!("pruned {pruned} unused nodes, {} remain", self.nodes.len());
        pruned
    }
}
