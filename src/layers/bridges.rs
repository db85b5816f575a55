use std::f64::consts::TAU;

use tracing::warn;

use super::roads::{EdgeNodes, emit_top};
use super::{JunctionRegistry, Origin};
use crate::config::RoadsConfig;
use crate::geometry::Vec2;
use crate::mesh::{AcObject, MAT_UNLIT, Ribbon};
use crate::textures::{AtlasRow, Surface, TextureCatalog};

/// Nodes on the underside of the deck, below each edge node
fn emit_underside(obj: &mut AcObject, ribbon: &Ribbon, origin: Origin, body: f64) -> EdgeNodes {
    let mut under = EdgeNodes::default();
    for (i, h) in ribbon.heights.iter().enumerate() {
        let (x, y, z) = origin.relative(ribbon.left[i], h.left - body);
        under.left.push(obj.node(x, y, z));
        let (x, y, z) = origin.relative(ribbon.right[i], h.right - body);
        under.right.push(obj.node(x, y, z));
    }
    under
}

/// Side walls, bottom face and both end caps of the deck body
fn emit_body(
    obj: &mut AcObject,
    ribbon: &Ribbon,
    top: &EdgeNodes,
    under: &EdgeNodes,
    side: AtlasRow,
    bottom: AtlasRow,
    cfg: &RoadsConfig,
) {
    let repeat = cfg.texture_repeat_length.max(f64::EPSILON);
    let n = ribbon.len();
    for i in 0..n - 1 {
        let u0 = ribbon.dist[i] / repeat;
        let u1 = ribbon.dist[i + 1] / repeat;
        obj.quad(
            [
                (under.left[i], u0, side.y0),
                (under.left[i + 1], u1, side.y0),
                (top.left[i + 1], u1, side.y1),
                (top.left[i], u0, side.y1),
            ],
            MAT_UNLIT,
        );
        obj.quad(
            [
                (top.right[i], u0, side.y1),
                (top.right[i + 1], u1, side.y1),
                (under.right[i + 1], u1, side.y0),
                (under.right[i], u0, side.y0),
            ],
            MAT_UNLIT,
        );
        obj.quad(
            [
                (under.right[i], u0, bottom.y0),
                (under.right[i + 1], u1, bottom.y0),
                (under.left[i + 1], u1, bottom.y1),
                (under.left[i], u0, bottom.y1),
            ],
            MAT_UNLIT,
        );
    }

    let width_u = ribbon.offset_width() / repeat;
    let last = n - 1;
    obj.quad(
        [
            (under.right[0], 0.0, side.y0),
            (under.left[0], width_u, side.y0),
            (top.left[0], width_u, side.y1),
            (top.right[0], 0.0, side.y1),
        ],
        MAT_UNLIT,
    );
    obj.quad(
        [
            (under.left[last], 0.0, side.y0),
            (under.right[last], width_u, side.y0),
            (top.right[last], width_u, side.y1),
            (top.left[last], 0.0, side.y1),
        ],
        MAT_UNLIT,
    );
}

/// A prism standing at `center` from `bottom` up to `top`
fn emit_pillar(obj: &mut AcObject, center: Vec2, top: f64, bottom: f64, origin: Origin, row: AtlasRow, cfg: &RoadsConfig) {
    let sides = cfg.pillar_sides.max(3);
    let mut ring = Vec::with_capacity(sides + 1);
    for k in 0..=sides {
        // the seam repeats the first corner so u can reach 1
        let angle = TAU * (k % sides) as f64 / sides as f64;
        let p = center + Vec2::new(angle.cos(), angle.sin()) * cfg.pillar_radius;
        let (x, y, z_top) = origin.relative(p, top);
        let (_, _, z_bottom) = origin.relative(p, bottom);
        ring.push((obj.node(x, y, z_bottom), obj.node(x, y, z_top)));
    }
    for k in 0..sides {
        let u0 = k as f64 / sides as f64;
        let u1 = (k + 1) as f64 / sides as f64;
        let (b0, t0) = ring[k];
        let (b1, t1) = ring[k + 1];
        obj.quad([(b0, u0, row.y0), (b1, u1, row.y0), (t1, u1, row.y1), (t0, u0, row.y1)], MAT_UNLIT);
    }
}

/// Emit a bridge: deck top, side walls, bottom, end caps and a pillar under
/// every interior vertex; returns the number of faces written
pub fn emit_bridge(
    obj: &mut AcObject,
    registry: &mut JunctionRegistry,
    ribbon: &Ribbon,
    origin: Origin,
    textures: &TextureCatalog,
    cfg: &RoadsConfig,
) -> usize {
    if ribbon.heights.len() != ribbon.len() || ribbon.len() < 2 {
        warn!("bridge {} has no deck heights, not emitted", ribbon.way_id);
        return 0;
    }
    let before = obj.face_count();
    let body = cfg.bridge_body_height;

    let top = emit_top(obj, registry, ribbon, origin, textures.for_class(ribbon.class), cfg);
    let under = emit_underside(obj, ribbon, origin, body);
    emit_body(
        obj,
        ribbon,
        &top,
        &under,
        textures.row(Surface::BridgeSide),
        textures.row(Surface::BridgeBottom),
        cfg,
    );

    let pillar_row = textures.row(Surface::Pillar);
    for i in 1..ribbon.len() - 1 {
        let h = &ribbon.heights[i];
        let pillar_top = h.centre - body;
        let pillar_bottom = h.ground_centre - cfg.pillar_embed;
        if pillar_top > pillar_bottom {
            emit_pillar(obj, ribbon.center[i], pillar_top, pillar_bottom, origin, pillar_row, cfg);
        }
    }
    obj.face_count() - before
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FeatureClass, HighwayType};
    use crate::mesh::VertexHeights;

    fn bridge(points: &[(f64, f64)], deck: f64) -> Ribbon {
        let center = points.iter().map(|&(x, y)| Vec2::new(x, y)).collect();
        let refs = (0..points.len() as i64).collect();
        let mut r = Ribbon::new(5, refs, center, 3.0, FeatureClass::Highway(HighwayType::Primary)).unwrap();
        r.bridge = true;
        r.heights = vec![
            VertexHeights {
                centre: deck,
                left: deck,
                right: deck,
                ground_centre: 0.0,
                ground_left: 0.0,
                ground_right: 0.0,
                lift: deck,
            };
            points.len()
        ];
        r
    }

    fn origin() -> Origin {
        Origin {
            center: Vec2::ZERO,
            elev: 0.0,
        }
    }

    #[test]
    fn test_bridge_faces() {
        let cfg = RoadsConfig::default();
        let r = bridge(&[(0.0, 0.0), (20.0, 0.0), (40.0, 0.0)], 6.0);
        let mut registry = JunctionRegistry::new([&r]);
        let mut obj = AcObject::new("bridges", None);
        let faces = emit_bridge(&mut obj, &mut registry, &r, origin(), &TextureCatalog::default(), &cfg);

        // 2 top + 2 * 3 body + 2 caps + one pillar
        assert_eq!(faces, 2 + 6 + 2 + cfg.pillar_sides);
    }

    #[test]
    fn test_pillar_reaches_below_ground() {
        let cfg = RoadsConfig::default();
        let r = bridge(&[(0.0, 0.0), (20.0, 0.0), (40.0, 0.0)], 6.0);
        let mut registry = JunctionRegistry::new([&r]);
        let mut obj = AcObject::new("bridges", None);
        emit_bridge(&mut obj, &mut registry, &r, origin(), &TextureCatalog::default(), &cfg);
        let lowest = obj.nodes().iter().map(|n| n[2]).fold(f64::INFINITY, f64::min);
        assert!((lowest + cfg.pillar_embed).abs() < 1e-9);
    }

    #[test]
    fn test_two_point_bridge_has_no_pillars() {
        let cfg = RoadsConfig::default();
        let r = bridge(&[(0.0, 0.0), (40.0, 0.0)], 6.0);
        let mut registry = JunctionRegistry::new([&r]);
        let mut obj = AcObject::new("bridges", None);
        let faces = emit_bridge(&mut obj, &mut registry, &r, origin(), &TextureCatalog::default(), &cfg);
        assert_eq!(faces, 1 + 3 + 2);
    }
}
