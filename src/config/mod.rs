use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Built-in tuning constants. All lengths and heights in meters.
///
/// Slopes are rise over run. The layer step is the vertical gap between two
/// features stacked at the same node, small enough to be invisible but large
/// enough to avoid z-fighting.
pub mod defaults {
    pub const MIN_ABOVE_GROUND: f64 = 0.1;
    pub const LAYER_STEP: f64 = 0.02;

    pub const MIN_BRIDGE_LENGTH: f64 = 20.0;
    pub const MIN_REMAINING_LENGTH: f64 = 5.0;
    pub const NODE_MATCH_TOLERANCE: f64 = 0.05;
    pub const MIN_POINT_DISTANCE: f64 = 0.5;
    pub const MAX_SEGMENT_LENGTH: f64 = 100.0;
    pub const MAX_MERGE_ANGLE: f64 = 90.0;

    pub const MAX_SLOPE_MOTORWAY: f64 = 0.03;
    pub const MAX_SLOPE_ROAD: f64 = 0.08;
    pub const MAX_SLOPE_RAILWAY: f64 = 0.02;
    pub const MAX_TRANSVERSE_GRADIENT: f64 = 0.1;
    pub const MIN_EMBANKMENT_HEIGHT: f64 = 1.0;

    pub const BRIDGE_LAYER_HEIGHT: f64 = 4.0;
    pub const BRIDGE_BODY_HEIGHT: f64 = 0.9;
    pub const BRIDGE_PROBE_SPACING: f64 = 5.0;
    pub const BRIDGE_RAISE_STEP: f64 = 0.5;
    pub const PILLAR_RADIUS: f64 = 0.8;
    pub const PILLAR_SIDES: usize = 8;
    pub const PILLAR_EMBED: f64 = 0.5;

    pub const TEXTURE_REPEAT_LENGTH: f64 = 16.0;
    pub const CLUSTER_SIZE: f64 = 2000.0;
    pub const CLUSTER_MIN_OBJECTS: usize = 1;
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// How a bridge deck is raised when mid-span clearance is insufficient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RaiseMode {
    /// Raise both ends by the same amount
    #[default]
    Both,
    /// Raise the lower end first until both ends are level
    LowerEnd,
}

fn default_min_above_ground() -> f64 {
    defaults::MIN_ABOVE_GROUND
}
fn default_layer_step() -> f64 {
    defaults::LAYER_STEP
}
fn default_min_bridge_length() -> f64 {
    defaults::MIN_BRIDGE_LENGTH
}
fn default_min_remaining_length() -> f64 {
    defaults::MIN_REMAINING_LENGTH
}
fn default_node_match_tolerance() -> f64 {
    defaults::NODE_MATCH_TOLERANCE
}
fn default_min_point_distance() -> f64 {
    defaults::MIN_POINT_DISTANCE
}
fn default_max_segment_length() -> f64 {
    defaults::MAX_SEGMENT_LENGTH
}
fn default_max_merge_angle() -> f64 {
    defaults::MAX_MERGE_ANGLE
}
fn default_max_slope_motorway() -> f64 {
    defaults::MAX_SLOPE_MOTORWAY
}
fn default_max_slope_road() -> f64 {
    defaults::MAX_SLOPE_ROAD
}
fn default_max_slope_railway() -> f64 {
    defaults::MAX_SLOPE_RAILWAY
}
fn default_max_transverse_gradient() -> f64 {
    defaults::MAX_TRANSVERSE_GRADIENT
}
fn default_min_embankment_height() -> f64 {
    defaults::MIN_EMBANKMENT_HEIGHT
}
fn default_bridge_layer_height() -> f64 {
    defaults::BRIDGE_LAYER_HEIGHT
}
fn default_bridge_body_height() -> f64 {
    defaults::BRIDGE_BODY_HEIGHT
}
fn default_bridge_probe_spacing() -> f64 {
    defaults::BRIDGE_PROBE_SPACING
}
fn default_bridge_raise_step() -> f64 {
    defaults::BRIDGE_RAISE_STEP
}
fn default_pillar_radius() -> f64 {
    defaults::PILLAR_RADIUS
}
fn default_pillar_sides() -> usize {
    defaults::PILLAR_SIDES
}
fn default_pillar_embed() -> f64 {
    defaults::PILLAR_EMBED
}
fn default_texture_repeat_length() -> f64 {
    defaults::TEXTURE_REPEAT_LENGTH
}
fn default_cluster_size() -> f64 {
    defaults::CLUSTER_SIZE
}
fn default_cluster_min_objects() -> usize {
    defaults::CLUSTER_MIN_OBJECTS
}
fn default_file_prefix() -> String {
    "roadnet3d_".to_string()
}

/// Every tunable of the road pipeline
#[derive(Debug, Clone, Deserialize)]
pub struct RoadsConfig {
    #[serde(default = "default_min_above_ground")]
    pub min_above_ground: f64,
    #[serde(default = "default_layer_step")]
    pub layer_step: f64,

    #[serde(default = "default_min_bridge_length")]
    pub min_bridge_length: f64,
    #[serde(default = "default_min_remaining_length")]
    pub min_remaining_length: f64,
    #[serde(default = "default_node_match_tolerance")]
    pub node_match_tolerance: f64,
    #[serde(default = "default_min_point_distance")]
    pub min_point_distance: f64,
    #[serde(default = "default_max_segment_length")]
    pub max_segment_length: f64,
    #[serde(default = "default_max_merge_angle")]
    pub max_merge_angle: f64,

    #[serde(default = "default_max_slope_motorway")]
    pub max_slope_motorway: f64,
    #[serde(default = "default_max_slope_road")]
    pub max_slope_road: f64,
    #[serde(default = "default_max_slope_railway")]
    pub max_slope_railway: f64,
    #[serde(default = "default_max_transverse_gradient")]
    pub max_transverse_gradient: f64,
    #[serde(default = "default_min_embankment_height")]
    pub min_embankment_height: f64,

    #[serde(default = "default_bridge_layer_height")]
    pub bridge_layer_height: f64,
    #[serde(default = "default_bridge_body_height")]
    pub bridge_body_height: f64,
    #[serde(default = "default_bridge_probe_spacing")]
    pub bridge_probe_spacing: f64,
    #[serde(default = "default_bridge_raise_step")]
    pub bridge_raise_step: f64,
    #[serde(default)]
    pub bridge_raise_mode: RaiseMode,
    #[serde(default = "default_pillar_radius")]
    pub pillar_radius: f64,
    #[serde(default = "default_pillar_sides")]
    pub pillar_sides: usize,
    #[serde(default = "default_pillar_embed")]
    pub pillar_embed: f64,

    #[serde(default = "default_texture_repeat_length")]
    pub texture_repeat_length: f64,
    #[serde(default = "default_cluster_size")]
    pub cluster_size: f64,
    #[serde(default = "default_cluster_min_objects")]
    pub cluster_min_objects: usize,
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
    /// Keep only bridges and ways that ended up lifted off the ground
    #[serde(default)]
    pub only_bridges_and_embankments: bool,
}

impl Default for RoadsConfig {
    fn default() -> Self {
        Self {
            min_above_ground: default_min_above_ground(),
            layer_step: default_layer_step(),
            min_bridge_length: default_min_bridge_length(),
            min_remaining_length: default_min_remaining_length(),
            node_match_tolerance: default_node_match_tolerance(),
            min_point_distance: default_min_point_distance(),
            max_segment_length: default_max_segment_length(),
            max_merge_angle: default_max_merge_angle(),
            max_slope_motorway: default_max_slope_motorway(),
            max_slope_road: default_max_slope_road(),
            max_slope_railway: default_max_slope_railway(),
            max_transverse_gradient: default_max_transverse_gradient(),
            min_embankment_height: default_min_embankment_height(),
            bridge_layer_height: default_bridge_layer_height(),
            bridge_body_height: default_bridge_body_height(),
            bridge_probe_spacing: default_bridge_probe_spacing(),
            bridge_raise_step: default_bridge_raise_step(),
            bridge_raise_mode: RaiseMode::default(),
            pillar_radius: default_pillar_radius(),
            pillar_sides: default_pillar_sides(),
            pillar_embed: default_pillar_embed(),
            texture_repeat_length: default_texture_repeat_length(),
            cluster_size: default_cluster_size(),
            cluster_min_objects: default_cluster_min_objects(),
            file_prefix: default_file_prefix(),
            only_bridges_and_embankments: false,
        }
    }
}

impl RoadsConfig {
    /// Read a config file from an explicit path
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Search the usual locations, returning the first config that parses
    pub fn load() -> Option<Self> {
        for path in get_config_paths() {
            if !path.exists() {
                continue;
            }
            match Self::from_path(&path) {
                Ok(config) => return Some(config),
                Err(e) => tracing::warn!("{e}"),
            }
        }
        None
    }

    /// Maximum longitudinal slope for a feature class
    pub fn max_slope(&self, class: crate::domain::SlopeClass) -> f64 {
        use crate::domain::SlopeClass;
        match class {
            SlopeClass::Motorway => self.max_slope_motorway,
            SlopeClass::Road => self.max_slope_road,
            SlopeClass::Railway => self.max_slope_railway,
        }
    }
}

fn get_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![
        PathBuf::from("roadnet3d.toml"),
        PathBuf::from(".roadnet3d.toml"),
    ];

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("roadnet3d").join("config.toml"));
        paths.push(config_dir.join("roadnet3d.toml"));
    }

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".roadnet3d.toml"));
    }

    paths
}
