//! Offset geometry of one linear feature.
//!
//! A [`Ribbon`] holds the centre line of a repaired way together with its
//! left and right offset lines, per-vertex tangents, normals, turn angles and
//! arc lengths. Heights are filled in a second pass once lift is known.

use std::collections::BTreeMap;

use geo::{Contains, Point, Polygon};

use crate::config::RoadsConfig;
use crate::domain::{FeatureClass, Node, NodeId, Way, WayId};
use crate::elevation::lift::blended_lift;
use crate::elevation::{ElevationProbe, NO_ELEVATION, ProbeError, level_cross_section};
use crate::geometry::{Bounds, Vec2, line};
use crate::topology::RoadNetwork;

/// Clearance added to each side of the feature's half width
pub const SIDE_CLEARANCE: f64 = 1.0;

/// Turns within this many degrees of a full reversal cannot be offset
const REVERSAL_TOLERANCE: f64 = 1.0;

#[derive(Debug, thiserror::Error)]
pub enum RibbonError {
    #[error("way {way} has fewer than 2 points")]
    TooFewPoints { way: WayId },
    #[error("way {way} has a zero-length segment after vertex {index}")]
    ZeroLengthSegment { way: WayId, index: usize },
    #[error("way {way} doubles back at vertex {index} (turn of {angle:.1} degrees)")]
    DegenerateTurn { way: WayId, index: usize, angle: f64 },
    #[error("way {way} leaves the known terrain at vertex {index}")]
    OutOfBounds { way: WayId, index: usize },
    #[error(transparent)]
    Probe(#[from] ProbeError),
}

impl RibbonError {
    /// Whether the error only concerns this feature and the tile can go on
    pub fn is_skippable(&self) -> bool {
        !matches!(self, RibbonError::Probe(_))
    }
}

/// Heights at one vertex, all above sea level
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexHeights {
    pub centre: f64,
    pub left: f64,
    pub right: f64,
    pub ground_centre: f64,
    pub ground_left: f64,
    pub ground_right: f64,
    /// Lift of the centre line above ground before leveling
    pub lift: f64,
}

#[derive(Debug, Clone)]
pub struct Ribbon {
    pub way_id: WayId,
    pub refs: Vec<NodeId>,
    pub class: FeatureClass,
    pub bridge: bool,
    pub half_width: f64,
    pub center: Vec<Vec2>,
    pub left: Vec<Vec2>,
    pub right: Vec<Vec2>,
    /// Unit direction of each segment, one fewer than the points
    pub tangents: Vec<Vec2>,
    /// Left-pointing unit normal per vertex, mean of the adjacent segments
    pub normals: Vec<Vec2>,
    /// Direction change at each vertex in [0, 360), 0 at the ends
    pub turn_angles: Vec<f64>,
    pub dist: Vec<f64>,
    pub lit: Vec<bool>,
    /// Empty until [`Ribbon::compute_heights`] or a bridge deck fills it
    pub heights: Vec<VertexHeights>,
}

impl Ribbon {
    pub fn new(
        way_id: WayId,
        refs: Vec<NodeId>,
        center: Vec<Vec2>,
        half_width: f64,
        class: FeatureClass,
    ) -> Result<Self, RibbonError> {
        let n = center.len();
        if n < 2 || refs.len() != n {
            return Err(RibbonError::TooFewPoints { way: way_id });
        }

        let mut tangents = Vec::with_capacity(n - 1);
        for (index, pair) in center.windows(2).enumerate() {
            let t = (pair[1] - pair[0])
                .normalized()
                .ok_or(RibbonError::ZeroLengthSegment { way: way_id, index })?;
            tangents.push(t);
        }

        let mut turn_angles = vec![0.0; n];
        for i in 1..n - 1 {
            let turn = (tangents[i].angle() - tangents[i - 1].angle())
                .to_degrees()
                .rem_euclid(360.0);
            if (turn - 180.0).abs() < REVERSAL_TOLERANCE {
                return Err(RibbonError::DegenerateTurn {
                    way: way_id,
                    index: i,
                    angle: turn,
                });
            }
            turn_angles[i] = turn;
        }

        let offset = half_width + SIDE_CLEARANCE;
        let mut normals = Vec::with_capacity(n);
        let mut left = Vec::with_capacity(n);
        let mut right = Vec::with_capacity(n);
        for i in 0..n {
            let (normal, scale) = if i == 0 {
                (tangents[0].perp(), 1.0)
            } else if i == n - 1 {
                (tangents[n - 2].perp(), 1.0)
            } else {
                let mean = (tangents[i - 1].perp() + tangents[i].perp()).normalized().ok_or(
                    RibbonError::DegenerateTurn {
                        way: way_id,
                        index: i,
                        angle: turn_angles[i],
                    },
                )?;
                // miter: interior angle is 180 minus the deviation from straight
                let deviation = if turn_angles[i] > 180.0 { 360.0 - turn_angles[i] } else { turn_angles[i] };
                let interior = 180.0 - deviation;
                (mean, 1.0 / (interior.to_radians() / 2.0).sin())
            };
            normals.push(normal);
            left.push(center[i] + normal * (offset * scale));
            right.push(center[i] - normal * (offset * scale));
        }

        let dist = line::cumulative_lengths(&center);
        Ok(Self {
            way_id,
            refs,
            class,
            bridge: false,
            half_width,
            lit: vec![false; n],
            center,
            left,
            right,
            tangents,
            normals,
            turn_angles,
            dist,
            heights: Vec::new(),
        })
    }

    /// Build the ribbon of a way in a repaired network
    pub fn from_way(way: &Way, network: &RoadNetwork) -> Result<Self, RibbonError> {
        let center = network.way_points(way);
        let mut ribbon = Self::new(way.id, way.refs.clone(), center, way.class.half_width(), way.class)?;
        ribbon.bridge = way.is_bridge();
        if way.flags.lit {
            ribbon.lit.fill(true);
        }
        Ok(ribbon)
    }

    pub fn len(&self) -> usize {
        self.center.len()
    }

    pub fn is_empty(&self) -> bool {
        self.center.is_empty()
    }

    pub fn length(&self) -> f64 {
        self.dist.last().copied().unwrap_or(0.0)
    }

    /// Full width between the offset lines
    pub fn offset_width(&self) -> f64 {
        2.0 * (self.half_width + SIDE_CLEARANCE)
    }

    pub fn first(&self) -> Option<NodeId> {
        self.refs.first().copied()
    }

    pub fn last(&self) -> Option<NodeId> {
        self.refs.last().copied()
    }

    pub fn is_closed(&self) -> bool {
        self.refs.len() > 2 && self.first() == self.last()
    }

    pub fn centroid(&self) -> Vec2 {
        Bounds::from_points(&self.center).map_or(Vec2::ZERO, |b| b.center())
    }

    /// Mark vertices lying inside any of the lit areas
    pub fn mark_lit(&mut self, lit_areas: &[Polygon<f64>]) {
        for (flag, p) in self.lit.iter_mut().zip(&self.center) {
            if !*flag {
                let point = Point::new(p.x, p.y);
                *flag = lit_areas.iter().any(|area| area.contains(&point));
            }
        }
    }

    /// Vertical offset keeping crossing features apart, layer 0 on top
    ///
    /// Deep layers shrink the step so the offset stays above the ground:
    /// layer `n` never sits lower than `min_above_ground / (n + 1)`.
    pub fn layer_offset(&self, node: Option<&Node>, cfg: &RoadsConfig) -> f64 {
        let layer = node.map_or(0, |n| n.layer_for(self.way_id)) as f64;
        let step = cfg.layer_step.min(cfg.min_above_ground / (layer + 1.0));
        cfg.min_above_ground - layer * step
    }

    /// Probe the ground under both offset lines and settle every vertex height
    ///
    /// End vertices take their node's lift. Interior vertices blend the two
    /// end heights along the arc length, capped by the slope line from the
    /// higher end. A vertex over unknown terrain fails the whole ribbon.
    pub fn compute_heights<P: ElevationProbe + ?Sized>(
        &mut self,
        nodes: &BTreeMap<NodeId, Node>,
        probe: &P,
        cfg: &RoadsConfig,
    ) -> Result<(), RibbonError> {
        let n = self.len();
        let max_slope = cfg.max_slope(self.class.slope_class());
        let total = self.length();
        let end_height = |id: Option<NodeId>| id.and_then(|id| nodes.get(&id)).and_then(Node::height);

        let mut heights = Vec::with_capacity(n);
        for i in 0..n {
            let node = nodes.get(&self.refs[i]);
            let ground_centre = match node.and_then(|n| n.msl) {
                Some(msl) => msl,
                None => probe.probe_elev(self.center[i])?,
            };
            let ground_left = probe.probe_elev(self.left[i])?;
            let ground_right = probe.probe_elev(self.right[i])?;
            if [ground_centre, ground_left, ground_right]
                .iter()
                .any(|&h| h <= NO_ELEVATION)
            {
                return Err(RibbonError::OutOfBounds {
                    way: self.way_id,
                    index: i,
                });
            }

            let node_lift = node.map_or(0.0, |n| n.v_add);
            let lift = if i == 0 || i == n - 1 {
                node_lift
            } else {
                let h0 = end_height(self.first()).unwrap_or(ground_centre);
                let h1 = end_height(self.last()).unwrap_or(ground_centre);
                blended_lift(h0, h1, self.dist[i], total, max_slope, ground_centre, node_lift)
            };

            let section = level_cross_section(
                ground_centre,
                ground_left,
                ground_right,
                lift,
                self.offset_width(),
                cfg.max_transverse_gradient,
            );
            let z = self.layer_offset(node, cfg);
            heights.push(VertexHeights {
                centre: section.centre + z,
                left: section.left + z,
                right: section.right + z,
                ground_centre,
                ground_left,
                ground_right,
                lift,
            });
        }
        self.heights = heights;
        Ok(())
    }

    /// Lowest and highest point of the computed heights
    pub fn elevation_range(&self) -> Option<(f64, f64)> {
        self.heights.iter().fold(None, |acc, h| {
            let lo = h.left.min(h.right).min(h.ground_left).min(h.ground_right);
            let hi = h.left.max(h.right).max(h.centre);
            Some(match acc {
                None => (lo, hi),
                Some((a, b)) => (a.min(lo), b.max(hi)),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::HighwayType;
    use crate::elevation::{FlatTerrain, TerrainFn};

    fn residential() -> FeatureClass {
        FeatureClass::Highway(HighwayType::Residential)
    }

    fn ribbon(points: &[(f64, f64)]) -> Result<Ribbon, RibbonError> {
        let center: Vec<Vec2> = points.iter().map(|&(x, y)| Vec2::new(x, y)).collect();
        let refs = (0..center.len() as NodeId).collect();
        Ribbon::new(1, refs, center, 2.5, residential())
    }

    #[test]
    fn test_width_on_straight_segment() {
        let r = ribbon(&[(0.0, 0.0), (50.0, 0.0), (100.0, 0.0)]).unwrap();
        for i in 0..r.len() {
            let across = r.left[i] - r.right[i];
            assert!((across.dot(r.normals[i]) - 2.0 * (2.5 + 1.0)).abs() < 1e-9);
        }
        assert!(r.left[0].y > 0.0, "left side is on the left of travel");
    }

    #[test]
    fn test_miter_keeps_width_through_corner() {
        let r = ribbon(&[(0.0, 0.0), (100.0, 0.0), (100.0, 100.0)]).unwrap();
        assert!((r.turn_angles[1] - 90.0).abs() < 1e-9);
        // the miter corner lies on both offset lines
        assert!((r.left[1].y - 3.5).abs() < 1e-9);
        assert!((r.left[1].x - 96.5).abs() < 1e-9);
        assert!((r.right[1].x - 103.5).abs() < 1e-9);
        assert!((r.right[1].y + 3.5).abs() < 1e-9);
    }

    #[test]
    fn test_reversal_is_degenerate() {
        let err = ribbon(&[(0.0, 0.0), (100.0, 0.0), (50.0, 0.0)]).unwrap_err();
        assert!(matches!(err, RibbonError::DegenerateTurn { index: 1, .. }));
        assert!(err.is_skippable());

        // half a degree off a reversal is still degenerate
        let a = (179.5f64).to_radians();
        let err = ribbon(&[(0.0, 0.0), (100.0, 0.0), (100.0 + 50.0 * a.cos(), 50.0 * a.sin())]).unwrap_err();
        assert!(matches!(err, RibbonError::DegenerateTurn { .. }));
    }

    #[test]
    fn test_too_few_and_zero_length() {
        assert!(matches!(ribbon(&[(0.0, 0.0)]), Err(RibbonError::TooFewPoints { .. })));
        assert!(matches!(
            ribbon(&[(0.0, 0.0), (0.0, 0.0), (10.0, 0.0)]),
            Err(RibbonError::ZeroLengthSegment { index: 0, .. })
        ));
    }

    #[test]
    fn test_heights_on_flat_ground() {
        let mut r = ribbon(&[(0.0, 0.0), (100.0, 0.0)]).unwrap();
        let cfg = RoadsConfig::default();
        r.compute_heights(&BTreeMap::new(), &FlatTerrain { elevation: 20.0 }, &cfg)
            .unwrap();
        for h in &r.heights {
            assert!((h.left - 20.0 - cfg.min_above_ground).abs() < 1e-9);
            assert!((h.right - 20.0 - cfg.min_above_ground).abs() < 1e-9);
            assert_eq!(h.lift, 0.0);
        }
    }

    #[test]
    fn test_out_of_bounds() {
        let mut r = ribbon(&[(0.0, 0.0), (100.0, 0.0)]).unwrap();
        let edge = TerrainFn(|p: Vec2| if p.x > 50.0 { NO_ELEVATION } else { 0.0 });
        let err = r
            .compute_heights(&BTreeMap::new(), &edge, &RoadsConfig::default())
            .unwrap_err();
        assert!(matches!(err, RibbonError::OutOfBounds { index: 1, .. }));
    }

    #[test]
    fn test_layer_offset_stays_above_ground() {
        let cfg = RoadsConfig::default();
        let r = ribbon(&[(0.0, 0.0), (100.0, 0.0)]).unwrap();
        let offsets: Vec<f64> = (0..12u8)
            .map(|layer| {
                let mut node = Node::new(0, 0.0, 0.0);
                node.layers.insert(r.way_id, layer);
                r.layer_offset(Some(&node), &cfg)
            })
            .collect();
        assert_eq!(offsets[0], cfg.min_above_ground);
        assert!((offsets[2] - (cfg.min_above_ground - 2.0 * cfg.layer_step)).abs() < 1e-12);
        for w in offsets.windows(2) {
            assert!(w[1] < w[0], "offsets not decreasing: {offsets:?}");
        }
        assert!(offsets.iter().all(|&z| z > 0.0), "offset at or below ground: {offsets:?}");
    }

    #[test]
    fn test_mark_lit() {
        let mut r = ribbon(&[(0.0, 0.0), (100.0, 0.0)]).unwrap();
        let area = Polygon::new(
            vec![(-10.0, -10.0), (10.0, -10.0), (10.0, 10.0), (-10.0, 10.0), (-10.0, -10.0)].into(),
            vec![],
        );
        r.mark_lit(&[area]);
        assert_eq!(r.lit, vec![true, false]);
    }
}
