use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;

use crate::geometry::Vec2;

/// Elevation reported for points outside the known terrain
pub const NO_ELEVATION: f64 = -9999.0;

/// Result of probing the terrain at one point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Probe {
    pub elev: f64,
    /// False over water and other surfaces nothing can stand on
    pub solid: bool,
}

impl Probe {
    pub fn is_outside(&self) -> bool {
        self.elev <= NO_ELEVATION
    }
}

/// The probe channel itself failed; nothing probed afterwards can be trusted
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("elevation source unavailable: {0}")]
    Unavailable(String),
    #[error("failed to load elevation grid: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid elevation grid: {0}")]
    Grid(String),
}

/// Ground elevation lookup in local coordinates
///
/// Same point must give the same answer. Implementations may be slow, wrap
/// them in [`CachedProbe`].
pub trait ElevationProbe {
    fn probe(&self, point: Vec2) -> Result<Probe, ProbeError>;

    fn probe_elev(&self, point: Vec2) -> Result<f64, ProbeError> {
        self.probe(point).map(|p| p.elev)
    }
}

impl<P: ElevationProbe + ?Sized> ElevationProbe for &P {
    fn probe(&self, point: Vec2) -> Result<Probe, ProbeError> {
        (**self).probe(point)
    }
}

/// Solid ground described by a height function
pub struct TerrainFn<F>(pub F);

impl<F: Fn(Vec2) -> f64> ElevationProbe for TerrainFn<F> {
    fn probe(&self, point: Vec2) -> Result<Probe, ProbeError> {
        Ok(Probe {
            elev: (self.0)(point),
            solid: true,
        })
    }
}

/// Terrain at constant height everywhere
#[derive(Debug, Clone, Copy)]
pub struct FlatTerrain {
    pub elevation: f64,
}

impl ElevationProbe for FlatTerrain {
    fn probe(&self, _point: Vec2) -> Result<Probe, ProbeError> {
        Ok(Probe {
            elev: self.elevation,
            solid: true,
        })
    }
}

/// Regular elevation raster in local coordinates, bilinearly interpolated
///
/// `heights[row][col]` is the elevation at
/// `(origin_x + col * cell_size, origin_y + row * cell_size)`.
#[derive(Debug, Clone, Deserialize)]
pub struct GridTerrain {
    pub origin_x: f64,
    pub origin_y: f64,
    pub cell_size: f64,
    pub heights: Vec<Vec<f64>>,
}

impl GridTerrain {
    pub fn from_file(path: &Path) -> Result<Self, ProbeError> {
        let file = File::open(path)?;
        let grid: GridTerrain = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| ProbeError::Grid(e.to_string()))?;
        grid.validate()?;
        Ok(grid)
    }

    fn validate(&self) -> Result<(), ProbeError> {
        if self.cell_size <= 0.0 {
            return Err(ProbeError::Grid("cell_size must be positive".to_string()));
        }
        let cols = self.heights.first().map_or(0, Vec::len);
        if self.heights.len() < 2 || cols < 2 {
            return Err(ProbeError::Grid("grid needs at least 2x2 samples".to_string()));
        }
        if self.heights.iter().any(|row| row.len() != cols) {
            return Err(ProbeError::Grid("rows differ in length".to_string()));
        }
        Ok(())
    }
}

impl ElevationProbe for GridTerrain {
    fn probe(&self, point: Vec2) -> Result<Probe, ProbeError> {
        let outside = Probe {
            elev: NO_ELEVATION,
            solid: false,
        };
        let rows = self.heights.len();
        let cols = self.heights.first().map_or(0, Vec::len);
        if rows < 2 || cols < 2 {
            return Ok(outside);
        }

        let fx = (point.x - self.origin_x) / self.cell_size;
        let fy = (point.y - self.origin_y) / self.cell_size;
        if fx < 0.0 || fy < 0.0 || fx > (cols - 1) as f64 || fy > (rows - 1) as f64 {
            return Ok(outside);
        }

        let col = (fx.floor() as usize).min(cols - 2);
        let row = (fy.floor() as usize).min(rows - 2);
        let tx = fx - col as f64;
        let ty = fy - row as f64;
        let h = &self.heights;
        let bottom = h[row][col] * (1.0 - tx) + h[row][col + 1] * tx;
        let top = h[row + 1][col] * (1.0 - tx) + h[row + 1][col + 1] * tx;

        Ok(Probe {
            elev: bottom * (1.0 - ty) + top * ty,
            solid: true,
        })
    }
}

/// Memoizes another probe, keyed by millimetre-rounded coordinates
pub struct CachedProbe<P> {
    inner: P,
    cache: RefCell<HashMap<(i64, i64), Probe>>,
}

impl<P: ElevationProbe> CachedProbe<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.cache.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.borrow().is_empty()
    }
}

impl<P: ElevationProbe> ElevationProbe for CachedProbe<P> {
    fn probe(&self, point: Vec2) -> Result<Probe, ProbeError> {
        let key = (
            (point.x * 1000.0).round() as i64,
            (point.y * 1000.0).round() as i64,
        );
        if let Some(hit) = self.cache.borrow().get(&key) {
            return Ok(*hit);
        }
        let probe = self.inner.probe(point)?;
        self.cache.borrow_mut().insert(key, probe);
        Ok(probe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::fs;
    use tempfile::tempdir;

    fn grid() -> GridTerrain {
        GridTerrain {
            origin_x: 0.0,
            origin_y: 0.0,
            cell_size: 10.0,
            heights: vec![vec![0.0, 10.0], vec![20.0, 30.0]],
        }
    }

    #[test]
    fn test_grid_bilinear() {
        let g = grid();
        assert_eq!(g.probe_elev(Vec2::new(0.0, 0.0)).unwrap(), 0.0);
        assert_eq!(g.probe_elev(Vec2::new(10.0, 10.0)).unwrap(), 30.0);
        assert!((g.probe_elev(Vec2::new(5.0, 5.0)).unwrap() - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_grid_outside() {
        let probe = grid().probe(Vec2::new(-1.0, 5.0)).unwrap();
        assert!(probe.is_outside());
        assert!(!probe.solid);
    }

    #[test]
    fn test_grid_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("grid.json");
        fs::write(
            &path,
            r#"{"origin_x": 0, "origin_y": 0, "cell_size": 5, "heights": [[1, 1], [1, 1]]}"#,
        )
        .unwrap();
        let g = GridTerrain::from_file(&path).unwrap();
        assert_eq!(g.probe_elev(Vec2::new(2.0, 2.0)).unwrap(), 1.0);

        fs::write(&path, r#"{"origin_x": 0, "origin_y": 0, "cell_size": 5, "heights": [[1]]}"#)
            .unwrap();
        assert!(matches!(GridTerrain::from_file(&path), Err(ProbeError::Grid(_))));
    }

    #[test]
    fn test_cache_hits() {
        let calls = Cell::new(0);
        let counting = TerrainFn(|p: Vec2| {
            calls.set(calls.get() + 1);
            p.x
        });
        let cached = CachedProbe::new(&counting);
        assert_eq!(cached.probe_elev(Vec2::new(1.0, 2.0)).unwrap(), 1.0);
        assert_eq!(cached.probe_elev(Vec2::new(1.0, 2.0)).unwrap(), 1.0);
        assert_eq!(calls.get(), 1);
        assert_eq!(cached.len(), 1);
    }

    #[test]
    fn test_closure_probe() {
        let slope = TerrainFn(|p: Vec2| p.x * 0.1);
        assert!((slope.probe_elev(Vec2::new(50.0, 0.0)).unwrap() - 5.0).abs() < 1e-12);
    }
}
