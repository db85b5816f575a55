//! Ground elevation, vertical layering and lift propagation.

pub mod layers;
pub mod leveling;
pub mod lift;
pub mod probe;
pub mod spline;

pub use leveling::{CrossSection, level_cross_section};
pub use probe::{CachedProbe, ElevationProbe, FlatTerrain, GridTerrain, NO_ELEVATION, Probe, ProbeError, TerrainFn};
pub use spline::CubicSpline;

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::domain::{NodeId, WayId};
use crate::topology::RoadNetwork;

impl RoadNetwork {
    /// Probe ground elevation for every node still in use
    ///
    /// Ways touching a node outside the known terrain are removed. A failing
    /// probe aborts the whole tile. Returns the number of ways removed.
    pub fn probe_ground<P: ElevationProbe + ?Sized>(&mut self, probe: &P) -> Result<usize, ProbeError> {
        let mut outside: BTreeSet<NodeId> = BTreeSet::new();
        for id in self.used_nodes() {
            let Some(node) = self.nodes.get_mut(&id) else {
                continue;
            };
            let probed = probe.probe(node.local)?;
            if probed.is_outside() {
                outside.insert(id);
                node.msl = None;
            } else {
                node.msl = Some(probed.elev);
            }
        }

        let doomed: Vec<WayId> = self
            .ways
            .values()
            .filter(|w| w.refs.iter().any(|r| outside.contains(r)))
            .map(|w| w.id)
            .collect();
        for id in &doomed {
            warn!("way {id} leaves the known terrain, skipping");
            self.ways.remove(id);
        }
        debug!("probed ground, {} nodes outside terrain", outside.len());
        Ok(doomed.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Vec2;
    use crate::topology::test_support::*;

    #[test]
    fn test_probe_ground_fills_msl() {
        let mut net = network(&[(0.0, 0.0), (100.0, 0.0)], &[(1, vec![0, 1], RESIDENTIAL)]);
        let removed = net.probe_ground(&FlatTerrain { elevation: 350.0 }).unwrap();
        assert_eq!(removed, 0);
        assert!(net.nodes.values().all(|n| n.msl == Some(350.0)));
    }

    #[test]
    fn test_probe_ground_drops_ways_outside() {
        let mut net = network(
            &[(0.0, 0.0), (100.0, 0.0), (200.0, 0.0)],
            &[(1, vec![0, 1], RESIDENTIAL), (2, vec![1, 2], RESIDENTIAL)],
        );
        let terrain = TerrainFn(|p: Vec2| if p.x > 150.0 { NO_ELEVATION } else { 10.0 });
        assert_eq!(net.probe_ground(&terrain).unwrap(), 1);
        assert!(net.ways.contains_key(&1));
        assert!(!net.ways.contains_key(&2));
    }

    struct Broken;

    impl ElevationProbe for Broken {
        fn probe(&self, _point: Vec2) -> Result<Probe, ProbeError> {
            Err(ProbeError::Unavailable("pipe closed".to_string()))
        }
    }

    #[test]
    fn test_probe_failure_is_fatal() {
        let mut net = network(&[(0.0, 0.0), (100.0, 0.0)], &[(1, vec![0, 1], RESIDENTIAL)]);
        assert!(matches!(net.probe_ground(&Broken), Err(ProbeError::Unavailable(_))));
    }
}
