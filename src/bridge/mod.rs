//! Bridge decks: a straight deck between the two end heights, raised until
//! it clears the terrain at mid span.

use std::collections::BTreeMap;

use tracing::debug;

use crate::config::{RaiseMode, RoadsConfig};
use crate::domain::{Node, NodeId};
use crate::elevation::{CubicSpline, ElevationProbe, NO_ELEVATION};
use crate::geometry::line;
use crate::mesh::{Ribbon, RibbonError, VertexHeights};

/// Terrain samples along a span never drop below this count
const MIN_SAMPLES: usize = 5;

#[derive(Debug, Clone)]
pub struct BridgeDeck {
    /// Deck height above sea level at the start node
    pub start_height: f64,
    pub end_height: f64,
    pub length: f64,
    /// Ground profile along the centre line, by arc length
    pub terrain: CubicSpline,
}

impl BridgeDeck {
    /// Fit the deck of a bridge ribbon and store the needed lift on its end nodes
    ///
    /// Terrain is sampled every `bridge_probe_spacing` metres and splined. The
    /// deck starts as a straight line between the end heights and is raised
    /// in `bridge_raise_step` increments until mid span clears the terrain by
    /// `bridge_layer_height`. The end lift is kept if it is already higher.
    pub fn prepare<P: ElevationProbe + ?Sized>(
        ribbon: &Ribbon,
        nodes: &mut BTreeMap<NodeId, Node>,
        probe: &P,
        cfg: &RoadsConfig,
    ) -> Result<Self, RibbonError> {
        let way = ribbon.way_id;
        let length = ribbon.length();
        let (Some(first), Some(last)) = (ribbon.first(), ribbon.last()) else {
            return Err(RibbonError::TooFewPoints { way });
        };

        let spacing = cfg.bridge_probe_spacing.max(0.1);
        let samples = ((length / spacing).ceil() as usize + 1).max(MIN_SAMPLES);
        let mut xs = Vec::with_capacity(samples);
        let mut ys = Vec::with_capacity(samples);
        for k in 0..samples {
            let s = length * k as f64 / (samples - 1) as f64;
            let Some(p) = line::point_at_distance(&ribbon.center, s) else {
                return Err(RibbonError::TooFewPoints { way });
            };
            let elev = probe.probe_elev(p)?;
            if elev <= NO_ELEVATION {
                return Err(RibbonError::OutOfBounds { way, index: k });
            }
            xs.push(s);
            ys.push(elev);
        }
        let terrain = CubicSpline::new(xs, ys).ok_or(RibbonError::ZeroLengthSegment { way, index: 0 })?;

        let ground_start = end_ground(nodes, first, terrain.evaluate(0.0));
        let ground_end = end_ground(nodes, last, terrain.evaluate(length));
        let lift_start = nodes.get(&first).map_or(0.0, |n| n.v_add);
        let lift_end = nodes.get(&last).map_or(0.0, |n| n.v_add);

        let mut deck = Self {
            start_height: ground_start + lift_start,
            end_height: ground_end + lift_end,
            length,
            terrain,
        };
        deck.raise(cfg);

        for (id, ground, height) in [
            (first, ground_start, deck.start_height),
            (last, ground_end, deck.end_height),
        ] {
            if let Some(node) = nodes.get_mut(&id) {
                node.v_add = node.v_add.max(height - ground);
            }
        }
        debug!(
            "bridge {way}: deck {:.1} m to {:.1} m, clearance {:.1} m",
            deck.start_height,
            deck.end_height,
            deck.mid_clearance()
        );
        Ok(deck)
    }

    fn raise(&mut self, cfg: &RoadsConfig) {
        let step = cfg.bridge_raise_step.max(0.01);
        while self.mid_clearance() < cfg.bridge_layer_height {
            let lower_first = cfg.bridge_raise_mode == RaiseMode::LowerEnd;
            if lower_first && self.start_height < self.end_height {
                self.start_height = (self.start_height + step).min(self.end_height);
            } else if lower_first && self.end_height < self.start_height {
                self.end_height = (self.end_height + step).min(self.start_height);
            } else {
                self.start_height += step;
                self.end_height += step;
            }
        }
    }

    /// Deck height above sea level at arc length `s`
    pub fn deck_height(&self, s: f64) -> f64 {
        if self.length <= 0.0 {
            return self.start_height;
        }
        let t = (s / self.length).clamp(0.0, 1.0);
        self.start_height + (self.end_height - self.start_height) * t
    }

    pub fn mid_clearance(&self) -> f64 {
        let mid = self.length / 2.0;
        self.deck_height(mid) - self.terrain.evaluate(mid)
    }

    /// Give every vertex of the ribbon the level deck height
    pub fn apply<P: ElevationProbe + ?Sized>(
        &self,
        ribbon: &mut Ribbon,
        nodes: &BTreeMap<NodeId, Node>,
        probe: &P,
        cfg: &RoadsConfig,
    ) -> Result<(), RibbonError> {
        let mut heights = Vec::with_capacity(ribbon.len());
        for i in 0..ribbon.len() {
            let ground_centre = self.terrain.evaluate(ribbon.dist[i]);
            let ground_left = probe.probe_elev(ribbon.left[i])?;
            let ground_right = probe.probe_elev(ribbon.right[i])?;
            if ground_left <= NO_ELEVATION || ground_right <= NO_ELEVATION {
                return Err(RibbonError::OutOfBounds {
                    way: ribbon.way_id,
                    index: i,
                });
            }
            let deck = self.deck_height(ribbon.dist[i]) + ribbon.layer_offset(nodes.get(&ribbon.refs[i]), cfg);
            heights.push(VertexHeights {
                centre: deck,
                left: deck,
                right: deck,
                ground_centre,
                ground_left,
                ground_right,
                lift: deck - ground_centre,
            });
        }
        ribbon.heights = heights;
        Ok(())
    }
}

fn end_ground(nodes: &BTreeMap<NodeId, Node>, id: NodeId, fallback: f64) -> f64 {
    nodes.get(&id).and_then(|n| n.msl).unwrap_or(fallback)
}
