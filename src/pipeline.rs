//! One tile from parsed OSM records to placed AC3D files.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use geo::Polygon;
use tracing::{debug, info, warn};

use crate::bridge::BridgeDeck;
use crate::cluster::{Cluster, ClusterGrid};
use crate::config::RoadsConfig;
use crate::domain::{AreaKind, WayId};
use crate::elevation::{CachedProbe, ElevationProbe};
use crate::geometry::{Bounds, Transform, Vec2};
use crate::layers::{JunctionRegistry, Origin, emit_bridge, emit_ribbon};
use crate::mesh::{AcFile, Ribbon, RibbonError, remove_bad_faces, write_ac};
use crate::osm::{LINEAR_KEYS, OsmData, OverpassResponse};
use crate::scenery::{SceneryKind, StgManager, StgRecord};
use crate::textures::TextureCatalog;
use crate::topology::RoadNetwork;

/// What one tile produced
#[derive(Debug, Default)]
pub struct TileOutput {
    /// Ways left after topology repair and ground probing
    pub ways: usize,
    pub ribbons: usize,
    /// Features dropped with a per-feature error
    pub skipped: usize,
    pub files: usize,
    pub faces: usize,
    /// Placements for the `.stg` writer
    pub records: Vec<StgRecord>,
}

/// Read an Overpass JSON extract into road and railway records
pub fn load_tile(path: &Path) -> Result<OsmData> {
    let response = OverpassResponse::from_file(path)?;
    Ok(OsmData::from_response(&response, LINEAR_KEYS))
}

/// Local frame centred on the extract's node bounds
fn tile_transform(data: &OsmData) -> Option<Transform> {
    let (mut min_lon, mut min_lat) = (f64::INFINITY, f64::INFINITY);
    let (mut max_lon, mut max_lat) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for node in data.nodes.values() {
        min_lon = min_lon.min(node.lon);
        max_lon = max_lon.max(node.lon);
        min_lat = min_lat.min(node.lat);
        max_lat = max_lat.max(node.lat);
    }
    if data.nodes.is_empty() {
        return None;
    }
    Some(Transform::new((min_lon + max_lon) / 2.0, (min_lat + max_lat) / 2.0))
}

/// Log a per-feature error and carry on, or hand a fatal one back
fn skip_or_fail(err: RibbonError, skipped: &mut usize) -> Result<()> {
    if err.is_skippable() {
        warn!("{err}, skipping");
        *skipped += 1;
        Ok(())
    } else {
        Err(err).context("Elevation probe failed")
    }
}

/// Mesh of one cluster around its own origin
///
/// `junctions` carries the degrees of the whole tile, so a junction whose
/// other ribbons landed in another cluster is still seen as busy.
fn emit_cluster(
    cluster: &Cluster<Ribbon>,
    junctions: &JunctionRegistry,
    textures: &TextureCatalog,
    cfg: &RoadsConfig,
) -> (Origin, AcFile) {
    let origin = Origin {
        center: cluster.center(),
        elev: cluster.min_elev,
    };
    let mut file = AcFile::new();
    let obj = file.new_object("roads", Some(textures.file().to_string()));
    let mut registry = junctions.fresh();
    for ribbon in &cluster.items {
        if ribbon.bridge {
            emit_bridge(obj, &mut registry, ribbon, origin, textures, cfg);
        } else {
            emit_ribbon(obj, &mut registry, ribbon, origin, textures, cfg);
        }
    }
    remove_bad_faces(obj);
    (origin, file)
}

/// Run the full road pipeline over one tile and write its objects below `out`
///
/// # Steps
/// 1. Topology repair, with a sanity check after every step
/// 2. Ground probe; ways over unknown terrain are dropped
/// 3. Vertical layers at shared nodes
/// 4. Bridge decks, then lift propagated from bridge ends
/// 5. Ribbon heights and lit spans
/// 6. Clustering and one `.ac` file per cluster
///
/// `name` keeps file names of different tiles apart. A failing probe aborts
/// the tile; geometry problems only drop the affected feature.
pub fn process_tile<P: ElevationProbe + ?Sized>(
    name: &str,
    data: OsmData,
    probe: &P,
    textures: &TextureCatalog,
    cfg: &RoadsConfig,
    out: &Path,
) -> Result<TileOutput> {
    let start = Instant::now();
    let mut output = TileOutput::default();
    let Some(transform) = tile_transform(&data) else {
        info!("tile {name}: no roads or railways");
        return Ok(output);
    };
    let probe = CachedProbe::new(probe);
    let OsmData { nodes, ways, areas } = data;
    let mut net = RoadNetwork::new(nodes, ways, transform);
    info!("tile {name}: {} ways, {} nodes, {} areas", net.ways.len(), net.nodes.len(), areas.len());

    net.remove_tunnels();
    net.sanity_check("tunnel removal");
    net.demote_short_bridges(cfg.min_bridge_length);
    net.sanity_check("bridge demotion");
    let clip = net.clip_blocked_areas(&areas, cfg.min_remaining_length, cfg.node_match_tolerance);
    debug!("clipping: {clip:?}");
    net.sanity_check("area clipping");
    net.remove_near_duplicates(cfg.min_point_distance);
    net.sanity_check("near-duplicate removal");
    net.rejoin(cfg.max_merge_angle);
    net.sanity_check("rejoin");
    net.densify(cfg.max_segment_length);
    net.sanity_check("densify");
    net.prune_unused_nodes();

    net.probe_ground(&probe)
        .with_context(|| format!("Failed to probe ground for tile {name}"))?;
    net.assign_layers();
    net.interpolate_layers();
    output.ways = net.ways.len();

    let mut ribbons = Vec::with_capacity(net.ways.len());
    for way in net.ways.values() {
        match Ribbon::from_way(way, &net) {
            Ok(ribbon) => ribbons.push(ribbon),
            Err(e) => skip_or_fail(e, &mut output.skipped)?,
        }
    }

    let mut decks: BTreeMap<WayId, BridgeDeck> = BTreeMap::new();
    let mut prepared = Vec::with_capacity(ribbons.len());
    for ribbon in ribbons {
        if ribbon.bridge {
            match BridgeDeck::prepare(&ribbon, &mut net.nodes, &probe, cfg) {
                Ok(deck) => {
                    decks.insert(ribbon.way_id, deck);
                }
                Err(e) => {
                    skip_or_fail(e, &mut output.skipped)?;
                    continue;
                }
            }
        }
        prepared.push(ribbon);
    }
    let bridge_ids: Vec<WayId> = decks.keys().copied().collect();
    net.propagate_lift(&bridge_ids, cfg);

    if cfg.only_bridges_and_embankments {
        let before = prepared.len();
        prepared.retain(|r| {
            r.bridge
                || r.refs
                    .iter()
                    .any(|id| net.nodes.get(id).is_some_and(|n| n.v_add > 0.0))
        });
        debug!("kept {} of {before} ribbons lifted off the ground", prepared.len());
    }

    let lit_areas: Vec<Polygon<f64>> = areas
        .iter()
        .filter(|a| a.kind == AreaKind::Lit && a.is_valid())
        .map(|a| a.to_local(&net.transform))
        .collect();

    let mut finished = Vec::with_capacity(prepared.len());
    for mut ribbon in prepared {
        let result = match decks.get(&ribbon.way_id) {
            Some(deck) => deck.apply(&mut ribbon, &net.nodes, &probe, cfg),
            None => ribbon.compute_heights(&net.nodes, &probe, cfg),
        };
        match result {
            Ok(()) => {
                ribbon.mark_lit(&lit_areas);
                finished.push(ribbon);
            }
            Err(e) => skip_or_fail(e, &mut output.skipped)?,
        }
    }
    output.ribbons = finished.len();

    let points: Vec<Vec2> = finished.iter().flat_map(|r| r.center.iter().copied()).collect();
    let Some(bounds) = Bounds::from_points(&points) else {
        info!("tile {name}: nothing left to emit");
        return Ok(output);
    };
    let junctions = JunctionRegistry::new(finished.iter());
    let mut grid = ClusterGrid::new(bounds, cfg.cluster_size);
    for ribbon in finished {
        let range = ribbon.elevation_range().unwrap_or((0.0, 0.0));
        grid.append(ribbon.centroid(), range, ribbon);
    }

    let mut stg = StgManager::new(out, cfg.file_prefix.clone());
    for cluster in grid.into_clusters() {
        if cluster.len() < cfg.cluster_min_objects {
            debug!("cluster {:?} has {} objects, skipping", cluster.index, cluster.len());
            continue;
        }
        let (origin, file) = emit_cluster(&cluster, &junctions, textures, cfg);
        if file.is_empty() {
            continue;
        }

        let (col, row) = cluster.index;
        let file_name = format!("{}{name}_{col}_{row}.ac", cfg.file_prefix);
        let position = net.transform.to_global(origin.center);
        let dir = stg.add_object_static(&file_name, position, origin.elev, 0.0, SceneryKind::Roads)?;
        write_ac(&dir.join(&file_name), &file)?;
        output.files += 1;
        output.faces += file.face_count();
    }
    output.records = stg.take_records();

    info!(
        "tile {name}: {} ribbons in {} files, {} faces, {} skipped [{:.1}s]",
        output.ribbons,
        output.files,
        output.faces,
        output.skipped,
        start.elapsed().as_secs_f32()
    );
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elevation::{FlatTerrain, Probe, ProbeError};
    use std::fs;
    use tempfile::tempdir;

    /// A road of three ways along a parallel, the middle one optionally a bridge
    const TILE: &str = r#"{
        "elements": [
            {"type": "node", "id": 1, "lat": 47.55, "lon": 7.600},
            {"type": "node", "id": 2, "lat": 47.55, "lon": 7.601},
            {"type": "node", "id": 3, "lat": 47.55, "lon": 7.602},
            {"type": "node", "id": 4, "lat": 47.55, "lon": 7.603},
            {"type": "way", "id": 10, "nodes": [1, 2], "tags": {"highway": "residential"}},
            {"type": "way", "id": 11, "nodes": [2, 3], "tags": {"highway": "residential", "bridge": "BRIDGE"}},
            {"type": "way", "id": 12, "nodes": [3, 4], "tags": {"highway": "residential"}}
        ]
    }"#;

    fn load(bridge: bool) -> OsmData {
        let json = TILE.replace("BRIDGE", if bridge { "yes" } else { "no" });
        let response: OverpassResponse = serde_json::from_str(&json).unwrap();
        OsmData::from_response(&response, LINEAR_KEYS)
    }

    #[test]
    fn test_plain_road_one_file() {
        let dir = tempdir().unwrap();
        let cfg = RoadsConfig::default();
        let ground = FlatTerrain { elevation: 400.0 };
        let out = process_tile("t0", load(false), &ground, &TextureCatalog::default(), &cfg, dir.path()).unwrap();

        assert_eq!(out.ribbons, 1);
        assert_eq!(out.files, 1);
        assert_eq!(out.records.len(), 1);
        assert!(out.faces > 0);
        assert!(out.records[0].line.starts_with("OBJECT_STATIC roadnet3d_t0_0_0.ac"));

        let ac = out.records[0].stg_path.with_file_name("roadnet3d_t0_0_0.ac");
        let text = fs::read_to_string(ac).unwrap();
        assert!(text.starts_with("AC3Db"));
        assert!(text.contains("texture \"roads.png\""));
    }

    #[test]
    fn test_bridge_tile() {
        let dir = tempdir().unwrap();
        let cfg = RoadsConfig::default();
        let ground = FlatTerrain { elevation: 400.0 };
        let out = process_tile("t1", load(true), &ground, &TextureCatalog::default(), &cfg, dir.path()).unwrap();

        // the bridge keeps its approaches from merging into it
        assert_eq!(out.ribbons, 3);
        assert_eq!(out.skipped, 0);
        assert_eq!(out.files, 1);
    }

    #[test]
    fn test_only_bridges_drops_flat_roads() {
        let dir = tempdir().unwrap();
        let cfg = RoadsConfig {
            only_bridges_and_embankments: true,
            ..RoadsConfig::default()
        };
        let ground = FlatTerrain { elevation: 400.0 };
        let out = process_tile("t2", load(false), &ground, &TextureCatalog::default(), &cfg, dir.path()).unwrap();
        assert_eq!(out.ribbons, 0);
        assert_eq!(out.files, 0);
        assert!(out.records.is_empty());
    }

    #[test]
    fn test_empty_tile() {
        let dir = tempdir().unwrap();
        let out = process_tile(
            "empty",
            OsmData::default(),
            &FlatTerrain { elevation: 0.0 },
            &TextureCatalog::default(),
            &RoadsConfig::default(),
            dir.path(),
        )
        .unwrap();
        assert_eq!(out.files, 0);
    }

    fn flat_ribbon(id: WayId, refs: Vec<i64>, points: &[(f64, f64)]) -> Ribbon {
        let center = points.iter().map(|&(x, y)| Vec2::new(x, y)).collect();
        let class = crate::domain::FeatureClass::Highway(crate::domain::HighwayType::Residential);
        let mut r = Ribbon::new(id, refs, center, 2.5, class).unwrap();
        r.compute_heights(&BTreeMap::new(), &FlatTerrain { elevation: 0.0 }, &RoadsConfig::default())
            .unwrap();
        r
    }

    #[test]
    fn test_t_junction_split_across_clusters_not_shared() {
        let cfg = RoadsConfig::default();
        // three ends meet at node 1; the long branch lands in another cell
        let ribbons = vec![
            flat_ribbon(1, vec![0, 1], &[(0.0, 0.0), (100.0, 0.0)]),
            flat_ribbon(2, vec![1, 2], &[(100.0, 0.0), (200.0, 0.0)]),
            flat_ribbon(3, vec![1, 3], &[(100.0, 0.0), (100.0, 1800.0)]),
        ];
        let junctions = JunctionRegistry::new(ribbons.iter());
        let points: Vec<Vec2> = ribbons.iter().flat_map(|r| r.center.iter().copied()).collect();
        let mut grid = ClusterGrid::new(Bounds::from_points(&points).unwrap(), 500.0);
        for r in ribbons {
            grid.append(r.centroid(), (0.0, 0.0), r);
        }

        let clusters: Vec<Cluster<Ribbon>> = grid.into_clusters().collect();
        assert_eq!(clusters.len(), 2);
        let first = &clusters[0];
        assert_eq!(first.items.iter().map(|r| r.way_id).collect::<Vec<_>>(), vec![1, 2]);

        let (_, file) = emit_cluster(first, &junctions, &TextureCatalog::default(), &cfg);
        // two ribbons with two vertices each, no edge nodes reused at node 1
        assert_eq!(file.objects()[0].node_count(), 8);
    }

    struct Broken;

    impl ElevationProbe for Broken {
        fn probe(&self, _p: Vec2) -> Result<Probe, ProbeError> {
            Err(ProbeError::Unavailable("no terrain server".into()))
        }
    }

    #[test]
    fn test_probe_failure_aborts_tile() {
        let dir = tempdir().unwrap();
        let result = process_tile(
            "t3",
            load(false),
            &Broken,
            &TextureCatalog::default(),
            &RoadsConfig::default(),
            dir.path(),
        );
        assert!(result.is_err());
    }
}
