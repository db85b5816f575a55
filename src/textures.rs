//! Read-only lookup of texture atlas rows.
//!
//! All linear features share one atlas image; each kind of surface uses a
//! horizontal strip `[y0, y1]` of it. The catalog is built once and only read
//! afterwards.

use std::collections::BTreeMap;

use crate::domain::{FeatureClass, HighwayType, RailwayType};

pub const DEFAULT_ATLAS: &str = "roads.png";

/// A horizontal strip of the atlas in normalized texture coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtlasRow {
    pub y0: f64,
    pub y1: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Surface {
    Motorway,
    MajorRoad,
    MinorRoad,
    Path,
    Rail,
    Tram,
    BridgeSide,
    BridgeBottom,
    Pillar,
    Embankment,
}

impl Surface {
    pub fn for_class(class: FeatureClass) -> Surface {
        match class {
            FeatureClass::Highway(h) => match h {
                HighwayType::Motorway | HighwayType::Trunk => Surface::Motorway,
                HighwayType::Primary | HighwayType::Secondary | HighwayType::Tertiary => Surface::MajorRoad,
                HighwayType::Unclassified
                | HighwayType::Road
                | HighwayType::Residential
                | HighwayType::LivingStreet
                | HighwayType::Service => Surface::MinorRoad,
                HighwayType::Pedestrian | HighwayType::SlowPath => Surface::Path,
            },
            FeatureClass::Railway(r) => match r {
                RailwayType::Rail | RailwayType::NarrowGauge | RailwayType::Subway => Surface::Rail,
                RailwayType::LightRail | RailwayType::Tram | RailwayType::Monorail | RailwayType::Funicular => {
                    Surface::Tram
                }
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct TextureCatalog {
    file: String,
    rows: BTreeMap<Surface, AtlasRow>,
}

impl Default for TextureCatalog {
    /// Ten equal strips, motorway at the top of the image
    fn default() -> Self {
        let order = [
            Surface::Motorway,
            Surface::MajorRoad,
            Surface::MinorRoad,
            Surface::Path,
            Surface::Rail,
            Surface::Tram,
            Surface::BridgeSide,
            Surface::BridgeBottom,
            Surface::Pillar,
            Surface::Embankment,
        ];
        let strip = 1.0 / order.len() as f64;
        let rows = order
            .iter()
            .enumerate()
            .map(|(i, &surface)| {
                let y1 = 1.0 - i as f64 * strip;
                (surface, AtlasRow { y0: y1 - strip, y1 })
            })
            .collect();
        Self::new(DEFAULT_ATLAS, rows)
    }
}

impl TextureCatalog {
    pub fn new(file: impl Into<String>, rows: BTreeMap<Surface, AtlasRow>) -> Self {
        Self {
            file: file.into(),
            rows,
        }
    }

    /// Atlas image shared by every object
    pub fn file(&self) -> &str {
        &self.file
    }

    /// Strip for a surface; unknown surfaces use the whole image
    pub fn row(&self, surface: Surface) -> AtlasRow {
        self.rows
            .get(&surface)
            .copied()
            .unwrap_or(AtlasRow { y0: 0.0, y1: 1.0 })
    }

    pub fn for_class(&self, class: FeatureClass) -> AtlasRow {
        self.row(Surface::for_class(class))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rows_disjoint() {
        let catalog = TextureCatalog::default();
        let a = catalog.row(Surface::Motorway);
        let b = catalog.row(Surface::MajorRoad);
        assert!((a.y1 - 1.0).abs() < 1e-12);
        assert!((a.y0 - b.y1).abs() < 1e-12);
        assert!(b.y0 < b.y1);
        assert_eq!(catalog.file(), "roads.png");
    }

    #[test]
    fn test_class_lookup() {
        let catalog = TextureCatalog::default();
        let residential = FeatureClass::Highway(HighwayType::Residential);
        let service = FeatureClass::Highway(HighwayType::Service);
        let rail = FeatureClass::Railway(RailwayType::Rail);
        assert_eq!(catalog.for_class(residential), catalog.for_class(service));
        assert_ne!(catalog.for_class(residential), catalog.for_class(rail));
    }

    #[test]
    fn test_missing_row_uses_whole_image() {
        let catalog = TextureCatalog::new("x.png", BTreeMap::new());
        assert_eq!(catalog.row(Surface::Pillar), AtlasRow { y0: 0.0, y1: 1.0 });
    }
}
