use std::collections::BTreeMap;

/// Highway classification based on OSM `highway` tags
///
/// Variant order is the priority order used to stack features at a shared node:
/// later variants rank higher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HighwayType {
    SlowPath,
    Pedestrian,
    Service,
    LivingStreet,
    Residential,
    Road,
    Unclassified,
    Tertiary,
    Secondary,
    Primary,
    Trunk,
    Motorway,
}

impl HighwayType {
    /// Classify a highway tag value, `None` for kinds that are never rendered
    pub fn from_tag(tag: &str) -> Option<HighwayType> {
        match tag {
            "motorway" | "motorway_link" => Some(HighwayType::Motorway),
            "trunk" | "trunk_link" => Some(HighwayType::Trunk),
            "primary" | "primary_link" => Some(HighwayType::Primary),
            "secondary" | "secondary_link" => Some(HighwayType::Secondary),
            "tertiary" | "tertiary_link" => Some(HighwayType::Tertiary),
            "unclassified" => Some(HighwayType::Unclassified),
            "road" => Some(HighwayType::Road),
            "residential" => Some(HighwayType::Residential),
            "living_street" => Some(HighwayType::LivingStreet),
            "service" => Some(HighwayType::Service),
            "pedestrian" => Some(HighwayType::Pedestrian),
            "track" | "footway" | "cycleway" | "path" | "bridleway" | "steps" => {
                Some(HighwayType::SlowPath)
            }
            _ => None,
        }
    }

    /// Carriageway width in meters
    pub fn width(self) -> f64 {
        match self {
            HighwayType::Motorway => 14.0,
            HighwayType::Trunk => 12.0,
            HighwayType::Primary => 10.0,
            HighwayType::Secondary => 8.0,
            HighwayType::Tertiary => 7.0,
            HighwayType::Unclassified => 6.0,
            HighwayType::Road | HighwayType::Residential => 5.0,
            HighwayType::LivingStreet | HighwayType::Service => 4.0,
            HighwayType::Pedestrian => 3.0,
            HighwayType::SlowPath => 2.0,
        }
    }

    pub fn rank(self) -> u8 {
        self as u8
    }
}

/// Railway classification based on OSM `railway` tags, same ordering rule as [`HighwayType`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RailwayType {
    Funicular,
    Monorail,
    Subway,
    Tram,
    LightRail,
    NarrowGauge,
    Rail,
}

impl RailwayType {
    pub fn from_tag(tag: &str) -> Option<RailwayType> {
        match tag {
            "rail" | "preserved" => Some(RailwayType::Rail),
            "narrow_gauge" => Some(RailwayType::NarrowGauge),
            "light_rail" => Some(RailwayType::LightRail),
            "tram" => Some(RailwayType::Tram),
            "subway" => Some(RailwayType::Subway),
            "monorail" => Some(RailwayType::Monorail),
            "funicular" => Some(RailwayType::Funicular),
            _ => None,
        }
    }

    pub fn width(self) -> f64 {
        match self {
            RailwayType::Rail => 4.2,
            RailwayType::NarrowGauge => 3.2,
            RailwayType::LightRail | RailwayType::Subway => 3.6,
            RailwayType::Tram => 3.0,
            RailwayType::Monorail | RailwayType::Funicular => 2.4,
        }
    }

    pub fn rank(self) -> u8 {
        self as u8
    }
}

/// Which slope limit applies when lift is propagated along a feature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlopeClass {
    Motorway,
    Road,
    Railway,
}

/// Strongly typed feature kind, parsed once at ingestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureClass {
    Highway(HighwayType),
    Railway(RailwayType),
}

impl FeatureClass {
    /// Classify from a tag map; `railway` wins when both keys are present
    pub fn from_tags(tags: &BTreeMap<String, String>) -> Option<FeatureClass> {
        if let Some(kind) = tags.get("railway").and_then(|v| RailwayType::from_tag(v)) {
            return Some(FeatureClass::Railway(kind));
        }
        tags.get("highway")
            .and_then(|v| HighwayType::from_tag(v))
            .map(FeatureClass::Highway)
    }

    pub fn is_railway(self) -> bool {
        matches!(self, FeatureClass::Railway(_))
    }

    pub fn width(self) -> f64 {
        match self {
            FeatureClass::Highway(h) => h.width(),
            FeatureClass::Railway(r) => r.width(),
        }
    }

    pub fn half_width(self) -> f64 {
        self.width() / 2.0
    }

    /// Rank within the feature's own broad class
    pub fn type_rank(self) -> u8 {
        match self {
            FeatureClass::Highway(h) => h.rank(),
            FeatureClass::Railway(r) => r.rank(),
        }
    }

    pub fn slope_class(self) -> SlopeClass {
        match self {
            FeatureClass::Highway(HighwayType::Motorway | HighwayType::Trunk) => {
                SlopeClass::Motorway
            }
            FeatureClass::Highway(_) => SlopeClass::Road,
            FeatureClass::Railway(_) => SlopeClass::Railway,
        }
    }
}

/// Boolean tag-derived attributes of a way
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WayFlags {
    pub bridge: bool,
    pub tunnel: bool,
    pub lit: bool,
    pub electrified: bool,
    pub replaced_bridge: bool,
}

impl WayFlags {
    pub fn from_tags(tags: &BTreeMap<String, String>) -> Self {
        let yes = |key: &str| tags.get(key).is_some_and(|v| v != "no");
        Self {
            bridge: yes("bridge"),
            tunnel: yes("tunnel"),
            lit: tags.get("lit").is_some_and(|v| v == "yes"),
            electrified: yes("electrified"),
            replaced_bridge: yes("replaced_bridge"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_highway_from_tag() {
        assert_eq!(
            HighwayType::from_tag("motorway_link"),
            Some(HighwayType::Motorway)
        );
        assert_eq!(
            HighwayType::from_tag("residential"),
            Some(HighwayType::Residential)
        );
        assert_eq!(HighwayType::from_tag("footway"), Some(HighwayType::SlowPath));
        assert_eq!(HighwayType::from_tag("proposed"), None);
    }

    #[test]
    fn test_ranks() {
        assert!(HighwayType::Motorway.rank() > HighwayType::Trunk.rank());
        assert!(HighwayType::Residential.rank() > HighwayType::SlowPath.rank());
        assert!(RailwayType::Rail.rank() > RailwayType::NarrowGauge.rank());
        assert!(RailwayType::NarrowGauge.rank() > RailwayType::LightRail.rank());
    }

    #[test]
    fn test_feature_class_from_tags() {
        let class = FeatureClass::from_tags(&tags(&[("highway", "residential")])).unwrap();
        assert_eq!(class, FeatureClass::Highway(HighwayType::Residential));
        assert_eq!(class.width(), 5.0);

        let class = FeatureClass::from_tags(&tags(&[("railway", "rail")])).unwrap();
        assert!(class.is_railway());
        assert_eq!(class.slope_class(), SlopeClass::Railway);

        assert!(FeatureClass::from_tags(&tags(&[("building", "yes")])).is_none());
    }

    #[test]
    fn test_flags() {
        let flags = WayFlags::from_tags(&tags(&[
            ("bridge", "viaduct"),
            ("tunnel", "no"),
            ("lit", "yes"),
        ]));
        assert!(flags.bridge);
        assert!(!flags.tunnel);
        assert!(flags.lit);
        assert!(!flags.electrified);
    }
}
