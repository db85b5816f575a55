//! roadnet3d - Turn OpenStreetMap roads and railways into flight simulator scenery

pub mod bridge;
pub mod cluster;
pub mod config;
pub mod domain;
pub mod elevation;
pub mod geometry;
pub mod layers;
pub mod mesh;
pub mod osm;
pub mod pipeline;
pub mod scenery;
pub mod textures;
pub mod topology;
