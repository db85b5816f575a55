use super::Vec2;

/// Meters per degree of latitude (and of longitude at the equator)
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Flat-earth transform between WGS84 and a local tangent plane
///
/// - x = (lon - center_lon) * cos(center_lat) * 111320
/// - y = (lat - center_lat) * 111320
///
/// Accurate enough for tiles up to a few tens of km across, which is all a
/// single scenery tile ever covers.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    center_lon: f64,
    center_lat: f64,
    cos_lat: f64,
}

impl Transform {
    /// Create a transform whose local origin is at (`lon`, `lat`)
    pub fn new(lon: f64, lat: f64) -> Self {
        Self {
            center_lon: lon,
            center_lat: lat,
            cos_lat: lat.to_radians().cos(),
        }
    }

    pub fn center(&self) -> (f64, f64) {
        (self.center_lon, self.center_lat)
    }

    pub fn to_local(&self, lon: f64, lat: f64) -> Vec2 {
        Vec2::new(
            (lon - self.center_lon) * self.cos_lat * METERS_PER_DEGREE,
            (lat - self.center_lat) * METERS_PER_DEGREE,
        )
    }

    /// Inverse of [`Transform::to_local`], returns (lon, lat)
    pub fn to_global(&self, p: Vec2) -> (f64, f64) {
        let lon = self.center_lon + p.x / (self.cos_lat * METERS_PER_DEGREE);
        let lat = self.center_lat + p.y / METERS_PER_DEGREE;
        (lon, lat)
    }
}
