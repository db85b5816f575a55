pub mod area;
pub mod classify;
pub mod node;
pub mod way;

pub use area::{AreaKind, AreaPolygon};
pub use classify::{FeatureClass, HighwayType, RailwayType, SlopeClass, WayFlags};
pub use node::{IdAllocator, Node, NodeId, WayId};
pub use way::{REPLACED_BRIDGE_KEY, Way};
