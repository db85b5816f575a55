use super::overpass::{Element, OverpassResponse};
use crate::domain::{AreaKind, AreaPolygon, Node, NodeId, Way, WayId};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Tag keys that make a way a candidate linear feature
pub const LINEAR_KEYS: &[&str] = &["highway", "railway"];

/// Linear features and area polygons read from one OSM extract
#[derive(Debug, Default)]
pub struct OsmData {
    pub nodes: BTreeMap<NodeId, Node>,
    pub ways: BTreeMap<WayId, Way>,
    pub areas: Vec<AreaPolygon>,
}

impl OsmData {
    /// Parse an Overpass response into typed records
    ///
    /// # Algorithm
    /// 1. Build node_id → (lon, lat) lookup from all node elements
    /// 2. Keep ways carrying one of `keys` whose tags classify to a supported feature
    /// 3. Keep only nodes referenced by a kept way
    /// 4. Collect water, airport and lit-area polygons from closed ways and multipolygons
    pub fn from_response(response: &OverpassResponse, keys: &[&str]) -> Self {
        let coords = build_node_lookup(response);

        let mut ways = BTreeMap::new();
        for element in response.elements.iter().filter(|e| e.type_ == "way") {
            let Some(tags) = &element.tags else {
                continue;
            };
            if !keys.iter().any(|k| tags.contains_key(*k)) {
                continue;
            }
            let Some(refs) = &element.nodes else {
                continue;
            };

            // refs pointing at nodes missing from the extract are dropped
            let refs: Vec<NodeId> = refs
                .iter()
                .copied()
                .filter(|id| coords.contains_key(id))
                .collect();
            if refs.len() < 2 {
                continue;
            }

            match Way::from_tags(element.id, refs, tags.clone()) {
                Some(way) => {
                    ways.insert(element.id, way);
                }
                None => debug!("skipping way {} with unsupported tags", element.id),
            }
        }

        let mut nodes = BTreeMap::new();
        for way in ways.values() {
            for &id in &way.refs {
                if let Some(&(lon, lat)) = coords.get(&id) {
                    nodes.entry(id).or_insert_with(|| Node::new(id, lon, lat));
                }
            }
        }

        let areas = parse_areas(response, &coords);

        Self { nodes, ways, areas }
    }
}

fn build_node_lookup(response: &OverpassResponse) -> HashMap<i64, (f64, f64)> {
    response
        .elements
        .iter()
        .filter(|e| e.type_ == "node")
        .filter_map(|e| {
            let lat = e.lat?;
            let lon = e.lon?;
            Some((e.id, (lon, lat)))
        })
        .collect()
}

fn resolve_way_to_points(node_refs: &[i64], nodes: &HashMap<i64, (f64, f64)>) -> Vec<(f64, f64)> {
    node_refs
        .iter()
        .filter_map(|id| nodes.get(id).copied())
        .collect()
}

fn is_closed_ring(points: &[(f64, f64)]) -> bool {
    match (points.first(), points.last()) {
        (Some(first), Some(last)) if points.len() >= 4 => {
            (first.0 - last.0).abs() < 1e-9 && (first.1 - last.1).abs() < 1e-9
        }
        _ => false,
    }
}

/// Decide what an area's tags mean for roads
pub fn area_kind(tags: &BTreeMap<String, String>) -> Option<AreaKind> {
    let tag = |k: &str| tags.get(k).map(String::as_str);
    if tag("natural") == Some("water")
        || tag("waterway") == Some("riverbank")
        || matches!(tag("landuse"), Some("reservoir" | "basin"))
    {
        return Some(AreaKind::Water);
    }
    if matches!(
        tag("aeroway"),
        Some("apron" | "runway" | "taxiway" | "helipad" | "aerodrome")
    ) {
        return Some(AreaKind::Airport);
    }
    if matches!(
        tag("landuse"),
        Some("residential" | "commercial" | "industrial" | "retail")
    ) {
        return Some(AreaKind::Lit);
    }
    None
}

fn parse_areas(response: &OverpassResponse, coords: &HashMap<i64, (f64, f64)>) -> Vec<AreaPolygon> {
    let ways_by_id: HashMap<i64, &Element> = response
        .elements
        .iter()
        .filter(|e| e.type_ == "way")
        .map(|e| (e.id, e))
        .collect();

    let mut areas = Vec::new();

    for element in &response.elements {
        let Some(kind) = element.tags.as_ref().and_then(area_kind) else {
            continue;
        };

        match element.type_.as_str() {
            "way" => {
                let Some(refs) = &element.nodes else {
                    continue;
                };
                let points = resolve_way_to_points(refs, coords);
                if is_closed_ring(&points) {
                    areas.push(AreaPolygon::new(kind, points));
                }
            }
            "relation" => {
                let Some(members) = &element.members else {
                    continue;
                };
                // only rings drawn as single closed ways are assembled
                let ring_of = |role: &str| -> Vec<Vec<(f64, f64)>> {
                    members
                        .iter()
                        .filter(|m| m.type_ == "way" && m.role == role)
                        .filter_map(|m| ways_by_id.get(&m.ref_))
                        .filter_map(|w| w.nodes.as_ref())
                        .map(|refs| resolve_way_to_points(refs, coords))
                        .filter(|pts| is_closed_ring(pts))
                        .collect()
                };
                let holes = ring_of("inner");
                for outer in ring_of("outer") {
                    areas.push(AreaPolygon::with_holes(kind, outer, holes.clone()));
                }
            }
            _ => {}
        }
    }

    areas
}
