use tracing::warn;

use super::{JunctionRegistry, Origin, Side};
use crate::config::RoadsConfig;
use crate::mesh::{AcObject, MAT_LIT, MAT_UNLIT, Ribbon};
use crate::textures::{AtlasRow, Surface, TextureCatalog};

/// Node indices of a ribbon's two edges, one pair per vertex
#[derive(Debug, Clone, Default)]
pub struct EdgeNodes {
    pub left: Vec<usize>,
    pub right: Vec<usize>,
}

/// Side, seen walking into the junction, of a vertex's edge point
fn junction_side(ribbon: &Ribbon, index: usize, travel: Side) -> Option<Side> {
    if index + 1 == ribbon.len() {
        Some(travel)
    } else if index == 0 {
        Some(travel.opposite())
    } else {
        None
    }
}

/// Left and right edge nodes of one vertex, reusing junction nodes
///
/// Both sides are looked up before either is registered so a ribbon never
/// matches its own opposite edge.
fn vertex_nodes(
    obj: &mut AcObject,
    registry: &mut JunctionRegistry,
    ribbon: &Ribbon,
    index: usize,
    origin: Origin,
) -> (usize, usize) {
    let node = ribbon.refs[index];
    let h = &ribbon.heights[index];
    let travel = [Side::Left, Side::Right];
    let sides = travel.map(|t| junction_side(ribbon, index, t));
    let found = sides.map(|s| s.and_then(|s| registry.lookup(node, s)));

    let mut out = [0; 2];
    for k in 0..2 {
        out[k] = match found[k] {
            Some(existing) => existing,
            None => {
                let (p, height) = match travel[k] {
                    Side::Left => (ribbon.left[index], h.left),
                    Side::Right => (ribbon.right[index], h.right),
                };
                let (x, y, z) = origin.relative(p, height);
                obj.node(x, y, z)
            }
        };
    }
    for k in 0..2 {
        if found[k].is_none()
            && let Some(side) = sides[k]
        {
            registry.register(node, side, out[k]);
        }
    }
    (out[0], out[1])
}

/// Emit the top surface: edge nodes and one quad per segment
///
/// `u` runs along the ribbon in units of `texture_repeat_length`, `v` spans
/// the atlas row from the left edge to the right edge.
pub(crate) fn emit_top(
    obj: &mut AcObject,
    registry: &mut JunctionRegistry,
    ribbon: &Ribbon,
    origin: Origin,
    row: AtlasRow,
    cfg: &RoadsConfig,
) -> EdgeNodes {
    let mut edges = EdgeNodes::default();
    for i in 0..ribbon.len() {
        let (left, right) = vertex_nodes(obj, registry, ribbon, i, origin);
        edges.left.push(left);
        edges.right.push(right);
    }

    let repeat = cfg.texture_repeat_length.max(f64::EPSILON);
    for i in 0..ribbon.len() - 1 {
        let u0 = ribbon.dist[i] / repeat;
        let u1 = ribbon.dist[i + 1] / repeat;
        let material = if ribbon.lit[i] && ribbon.lit[i + 1] { MAT_LIT } else { MAT_UNLIT };
        obj.quad(
            [
                (edges.left[i], u0, row.y0),
                (edges.left[i + 1], u1, row.y0),
                (edges.right[i + 1], u1, row.y1),
                (edges.right[i], u0, row.y1),
            ],
            material,
        );
    }
    edges
}

/// Side walls from a raised ribbon down to the probed ground on each side
fn emit_embankment(
    obj: &mut AcObject,
    ribbon: &Ribbon,
    edges: &EdgeNodes,
    origin: Origin,
    row: AtlasRow,
    cfg: &RoadsConfig,
) -> usize {
    let n = ribbon.len();
    let raised = |i: usize| ribbon.heights[i].lift > cfg.min_embankment_height;
    let mut ground: Vec<Option<(usize, usize)>> = vec![None; n];
    let repeat = cfg.texture_repeat_length.max(f64::EPSILON);
    let mut faces = 0;

    for i in 0..n - 1 {
        if !raised(i) && !raised(i + 1) {
            continue;
        }
        for k in [i, i + 1] {
            if ground[k].is_none() {
                let h = &ribbon.heights[k];
                let (lx, ly, lz) = origin.relative(ribbon.left[k], h.ground_left);
                let (rx, ry, rz) = origin.relative(ribbon.right[k], h.ground_right);
                ground[k] = Some((obj.node(lx, ly, lz), obj.node(rx, ry, rz)));
            }
        }
        let (Some((gl0, gr0)), Some((gl1, gr1))) = (ground[i], ground[i + 1]) else {
            continue;
        };
        let u0 = ribbon.dist[i] / repeat;
        let u1 = ribbon.dist[i + 1] / repeat;
        obj.quad(
            [
                (gl0, u0, row.y0),
                (gl1, u1, row.y0),
                (edges.left[i + 1], u1, row.y1),
                (edges.left[i], u0, row.y1),
            ],
            MAT_UNLIT,
        );
        obj.quad(
            [
                (edges.right[i], u0, row.y1),
                (edges.right[i + 1], u1, row.y1),
                (gr1, u1, row.y0),
                (gr0, u0, row.y0),
            ],
            MAT_UNLIT,
        );
        faces += 2;
    }
    faces
}

/// Emit a road or railway ribbon; returns the number of faces written
pub fn emit_ribbon(
    obj: &mut AcObject,
    registry: &mut JunctionRegistry,
    ribbon: &Ribbon,
    origin: Origin,
    textures: &TextureCatalog,
    cfg: &RoadsConfig,
) -> usize {
    if ribbon.heights.len() != ribbon.len() || ribbon.len() < 2 {
        warn!("way {} has no heights, not emitted", ribbon.way_id);
        return 0;
    }
    let before = obj.face_count();
    let edges = emit_top(obj, registry, ribbon, origin, textures.for_class(ribbon.class), cfg);
    emit_embankment(obj, ribbon, &edges, origin, textures.row(Surface::Embankment), cfg);
    obj.face_count() - before
}
