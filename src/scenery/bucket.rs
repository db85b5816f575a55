//! Scenery tile buckets: the simulator's tiling of the globe.
//!
//! Each 1x1 degree cell is split into 8 rows of 1/8 degree; the number of
//! columns shrinks toward the poles. A bucket is addressed by a packed index
//! and lives in a `e007n47`-style directory under a 10 degree group.

use std::fmt;
use std::path::{Path, PathBuf};

/// Width in degrees of a bucket at latitude `lat`
pub fn bucket_span(lat: f64) -> f64 {
    let a = lat.abs();
    if a >= 89.0 {
        360.0
    } else if a >= 88.0 {
        8.0
    } else if a >= 86.0 {
        4.0
    } else if a >= 83.0 {
        2.0
    } else if a >= 76.0 {
        1.0
    } else if a >= 62.0 {
        0.5
    } else if a >= 22.0 {
        0.25
    } else {
        0.125
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Bucket {
    /// Floor of the longitude, snapped to the span for wide buckets
    pub lon: i32,
    pub lat: i32,
    pub x: i32,
    pub y: i32,
}

impl Bucket {
    pub fn for_point(lon: f64, lat: f64) -> Self {
        let span = bucket_span(lat);
        let lat_floor = lat.floor();
        let y = ((lat - lat_floor) * 8.0) as i32;

        let lon_floor = lon.floor();
        let (lon_base, x) = if span <= 1.0 {
            (lon_floor, ((lon - lon_floor) / span) as i32)
        } else {
            // several degrees share one bucket
            ((lon / span).floor() * span, 0)
        };

        Self {
            lon: lon_base as i32,
            lat: lat_floor as i32,
            x: x.clamp(0, 7),
            y: y.clamp(0, 7),
        }
    }

    /// Packed bucket number, also the `.stg` file stem
    pub fn index(&self) -> i64 {
        (((self.lon + 180) as i64) << 14) + (((self.lat + 90) as i64) << 6) + ((self.y as i64) << 3) + self.x as i64
    }

    /// `e000n40/e007n47` relative path
    pub fn base_path(&self) -> PathBuf {
        let group_lon = self.lon.div_euclid(10) * 10;
        let group_lat = self.lat.div_euclid(10) * 10;
        PathBuf::from(cell_name(group_lon, group_lat)).join(cell_name(self.lon, self.lat))
    }

    /// Directory holding this bucket's files below `root/<folder>`
    pub fn directory(&self, root: &Path, folder: &str) -> PathBuf {
        root.join(folder).join(self.base_path())
    }

    pub fn stg_path(&self, root: &Path, folder: &str) -> PathBuf {
        self.directory(root, folder).join(format!("{}.stg", self.index()))
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.index(), self.base_path().display())
    }
}

fn cell_name(lon: i32, lat: i32) -> String {
    format!(
        "{}{:03}{}{:02}",
        if lon < 0 { 'w' } else { 'e' },
        lon.abs(),
        if lat < 0 { 's' } else { 'n' },
        lat.abs()
    )
}
