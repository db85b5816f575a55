use std::collections::BTreeMap;

use crate::geometry::{Transform, Vec2};

pub type NodeId = i64;
pub type WayId = i64;

/// A point of the linear network
///
/// `msl`, `v_add` and `layers` start empty and are filled by the elevation
/// stage only.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub lon: f64,
    pub lat: f64,
    /// Local planar position, set when the node enters a network
    pub local: Vec2,
    /// Ground elevation above sea level
    pub msl: Option<f64>,
    /// Lift above terrain required by bridges and embankments
    pub v_add: f64,
    /// Vertical layer of this node per owning way, 0 is the topmost
    pub layers: BTreeMap<WayId, u8>,
}

impl Node {
    pub fn new(id: NodeId, lon: f64, lat: f64) -> Self {
        Self {
            id,
            lon,
            lat,
            local: Vec2::ZERO,
            msl: None,
            v_add: 0.0,
            layers: BTreeMap::new(),
        }
    }

    /// Build a node from a local position, deriving its global coordinates
    pub fn from_local(id: NodeId, local: Vec2, transform: &Transform) -> Self {
        let (lon, lat) = transform.to_global(local);
        Self {
            local,
            ..Self::new(id, lon, lat)
        }
    }

    pub fn update_local(&mut self, transform: &Transform) {
        self.local = transform.to_local(self.lon, self.lat);
    }

    pub fn layer_for(&self, way: WayId) -> u8 {
        self.layers.get(&way).copied().unwrap_or(0)
    }

    /// Ground elevation plus lift, `None` before probing
    pub fn height(&self) -> Option<f64> {
        self.msl.map(|msl| msl + self.v_add)
    }
}

/// Hands out ids for nodes and ways synthesized during repair
///
/// Pseudo ids are negative so they can never collide with OSM ids.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next: i64,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self { next: -1 }
    }
}

impl IdAllocator {
    pub fn next_id(&mut self) -> i64 {
        let id = self.next;
        self.next -= 1;
        id
    }

    pub fn is_pseudo(id: i64) -> bool {
        id < 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_local_round_trip() {
        let transform = Transform::new(8.0, 47.0);
        let node = Node::from_local(1, Vec2::new(100.0, 200.0), &transform);
        let mut copy = Node::new(2, node.lon, node.lat);
        copy.update_local(&transform);
        assert!((copy.local.x - 100.0).abs() < 1e-6);
        assert!((copy.local.y - 200.0).abs() < 1e-6);
    }

    #[test]
    fn test_id_allocator() {
        let mut ids = IdAllocator::default();
        let a = ids.next_id();
        let b = ids.next_id();
        assert_ne!(a, b);
        assert!(IdAllocator::is_pseudo(a));
        assert!(IdAllocator::is_pseudo(b));
    }

    #[test]
    fn test_height() {
        let mut node = Node::new(1, 0.0, 0.0);
        assert_eq!(node.height(), None);
        node.msl = Some(100.0);
        node.v_add = 2.5;
        assert_eq!(node.height(), Some(102.5));
    }
}
