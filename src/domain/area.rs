use geo::{LineString, Polygon};

use crate::geometry::Transform;

/// What an area polygon means for linear features
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AreaKind {
    /// Water body; roads are cut out unless they are bridges
    Water,
    /// Airport pavement; roads are always cut out
    Airport,
    /// Built-up area whose roads get the lit material
    Lit,
}

/// An area polygon in global (lon, lat) coordinates
#[derive(Debug, Clone)]
pub struct AreaPolygon {
    pub kind: AreaKind,
    pub outer: Vec<(f64, f64)>,
    pub holes: Vec<Vec<(f64, f64)>>,
}

impl AreaPolygon {
    pub fn new(kind: AreaKind, outer: Vec<(f64, f64)>) -> Self {
        Self {
            kind,
            outer,
            holes: Vec::new(),
        }
    }

    pub fn with_holes(kind: AreaKind, outer: Vec<(f64, f64)>, holes: Vec<Vec<(f64, f64)>>) -> Self {
        Self { kind, outer, holes }
    }

    pub fn is_valid(&self) -> bool {
        self.outer.len() >= 3
    }

    /// Project into a `geo` polygon in local coordinates
    pub fn to_local(&self, transform: &Transform) -> Polygon<f64> {
        let ring = |points: &[(f64, f64)]| -> LineString<f64> {
            points
                .iter()
                .map(|&(lon, lat)| geo::Coord::from(transform.to_local(lon, lat)))
                .collect()
        };
        Polygon::new(
            ring(&self.outer),
            self.holes.iter().map(|h| ring(h)).collect(),
        )
    }
}
