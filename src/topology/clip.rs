use std::collections::VecDeque;

use geo::{BooleanOps, Contains, Intersects, LineString, MultiLineString, Polygon};
use tracing::debug;

use super::RoadNetwork;
use crate::domain::{AreaKind, AreaPolygon, NodeId, Way, WayId};
use crate::geometry::{Vec2, line};

/// What area clipping did to the network
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ClipStats {
    pub removed: usize,
    pub shortened: usize,
    pub split: usize,
}

/// An area that roads must not run across
struct BlockedArea {
    kind: AreaKind,
    polygon: Polygon<f64>,
}

fn applies_to(kind: AreaKind, way: &Way) -> bool {
    match kind {
        AreaKind::Airport => true,
        // bridges, and bridges demoted for being short, pass over water
        AreaKind::Water => !(way.flags.bridge || way.flags.replaced_bridge),
        AreaKind::Lit => false,
    }
}

fn to_line_string(points: &[Vec2]) -> LineString<f64> {
    points.iter().map(|&p| geo::Coord::from(p)).collect()
}

fn same_line(a: &[Vec2], b: &[Vec2], tolerance: f64) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(p, q)| p.distance(*q) <= tolerance)
}

impl RoadNetwork {
    /// Cut ways out of water and airport polygons
    ///
    /// Ways fully inside an area are dropped. Ways crossing an area keep the
    /// parts outside it: one part rewrites the way, several parts split it into
    /// new ways. Parts shorter than `min_remaining` are discarded. Each
    /// produced part is tested again against the areas not yet applied to it.
    pub fn clip_blocked_areas(
        &mut self,
        areas: &[AreaPolygon],
        min_remaining: f64,
        tolerance: f64,
    ) -> ClipStats {
        let blocked: Vec<BlockedArea> = areas
            .iter()
            .filter(|a| a.is_valid() && a.kind != AreaKind::Lit)
            .map(|a| BlockedArea {
                kind: a.kind,
                polygon: a.to_local(&self.transform),
            })
            .collect();

        let mut stats = ClipStats::default();
        if blocked.is_empty() {
            return stats;
        }

        let mut queue: VecDeque<(WayId, usize)> = self.ways.keys().map(|&id| (id, 0)).collect();

        while let Some((way_id, start)) = queue.pop_front() {
            let Some(way) = self.ways.get(&way_id) else {
                continue;
            };
            let points = self.way_points(way);
            let line_string = to_line_string(&points);

            for (index, area) in blocked.iter().enumerate().skip(start) {
                if !applies_to(area.kind, way) {
                    continue;
                }
                if area.polygon.contains(&line_string) {
                    debug!("way {way_id} lies inside a {:?} area, removing", area.kind);
                    self.ways.remove(&way_id);
                    stats.removed += 1;
                    break;
                }
                if !area.polygon.intersects(&line_string) {
                    continue;
                }

                let outside = area
                    .polygon
                    .clip(&MultiLineString::new(vec![line_string.clone()]), true);
                let parts: Vec<Vec<Vec2>> = outside
                    .0
                    .iter()
                    .map(|ls| ls.coords().map(|&c| Vec2::from(c)).collect::<Vec<Vec2>>())
                    .filter(|pts| line::polyline_length(pts) >= min_remaining)
                    .collect();

                if parts.len() == 1 && same_line(&parts[0], &points, tolerance) {
                    // only touches the boundary
                    continue;
                }

                let original = way.clone();
                self.ways.remove(&way_id);
                if parts.is_empty() {
                    debug!("way {way_id} has nothing left outside a {:?} area", area.kind);
                    stats.removed += 1;
                    break;
                }

                if parts.len() == 1 {
                    stats.shortened += 1;
                } else {
                    stats.split += 1;
                }
                for (n, part) in parts.iter().enumerate() {
                    let refs = self.rematch_nodes(&original.refs, part, tolerance);
                    if refs.len() < 2 {
                        continue;
                    }
                    let id = if n == 0 { way_id } else { self.next_way_id() };
                    self.ways.insert(id, original.derive(id, refs));
                    queue.push_back((id, index + 1));
                }
                break;
            }
        }

        debug!(
            "area clipping: {} removed, {} shortened, {} split",
            stats.removed, stats.shortened, stats.split
        );
        stats
    }

    /// Map coordinates back to node ids, reusing `candidates` within `tolerance`
    fn rematch_nodes(&mut self, candidates: &[NodeId], points: &[Vec2], tolerance: f64) -> Vec<NodeId> {
        let mut refs: Vec<NodeId> = Vec::with_capacity(points.len());
        for &p in points {
            let existing = candidates.iter().copied().find(|id| {
                self.nodes
                    .get(id)
                    .is_some_and(|n| n.local.distance(p) <= tolerance)
            });
            let id = match existing {
                Some(id) => id,
                None => self.add_node(p),
            };
            if refs.last() != Some(&id) {
                refs.push(id);
            }
        }
        refs
    }
}
