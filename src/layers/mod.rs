//! Emission of finished ribbons into AC3D objects.

pub mod bridges;
pub mod roads;

pub use bridges::emit_bridge;
pub use roads::emit_ribbon;

use std::collections::BTreeMap;

use crate::domain::NodeId;
use crate::geometry::Vec2;
use crate::mesh::Ribbon;

/// Local origin of one output object
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Origin {
    pub center: Vec2,
    pub elev: f64,
}

impl Origin {
    /// Object coordinates of a local point at a height above sea level
    pub fn relative(&self, p: Vec2, height: f64) -> (f64, f64, f64) {
        (p.x - self.center.x, p.y - self.center.y, height - self.elev)
    }
}

/// Side of a ribbon end, seen by someone walking into the junction
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// Edge nodes already emitted at junctions where exactly two ribbon ends meet
///
/// Two ribbons meeting at such a node share their edge vertices: one
/// ribbon's left edge is the other's right edge when both are seen walking
/// into the junction. Junctions with more ends are not shared. Degrees are
/// counted over the whole network; emitted nodes belong to one output object,
/// so each object starts from [`JunctionRegistry::fresh`].
#[derive(Debug, Default)]
pub struct JunctionRegistry {
    degree: BTreeMap<NodeId, usize>,
    emitted: BTreeMap<(NodeId, Side), usize>,
}

impl JunctionRegistry {
    /// Count ribbon ends per node; a closed ring counts twice at its start node
    pub fn new<'a>(ribbons: impl IntoIterator<Item = &'a Ribbon>) -> Self {
        let mut degree: BTreeMap<NodeId, usize> = BTreeMap::new();
        for ribbon in ribbons {
            for end in [ribbon.first(), ribbon.last()].into_iter().flatten() {
                *degree.entry(end).or_default() += 1;
            }
        }
        Self {
            degree,
            emitted: BTreeMap::new(),
        }
    }

    /// Same junction degrees, nothing emitted yet; one per output object
    pub fn fresh(&self) -> Self {
        Self {
            degree: self.degree.clone(),
            emitted: BTreeMap::new(),
        }
    }

    pub fn degree(&self, node: NodeId) -> usize {
        self.degree.get(&node).copied().unwrap_or(0)
    }

    pub fn is_shared(&self, node: NodeId) -> bool {
        self.degree(node) == 2
    }

    /// Index emitted by the other ribbon for the edge meeting `side`
    pub fn lookup(&self, node: NodeId, side: Side) -> Option<usize> {
        if !self.is_shared(node) {
            return None;
        }
        self.emitted.get(&(node, side.opposite())).copied()
    }

    pub fn register(&mut self, node: NodeId, side: Side, index: usize) {
        if self.is_shared(node) {
            self.emitted.entry((node, side)).or_insert(index);
        }
    }
}
