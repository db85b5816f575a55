//! Uniform grid that batches finished features into output files.

use crate::geometry::{Bounds, Vec2};

/// One grid cell and everything assigned to it
#[derive(Debug, Clone)]
pub struct Cluster<T> {
    /// (column, row) in the grid
    pub index: (usize, usize),
    pub items: Vec<T>,
    /// Bounds of the member centroids
    pub bounds: Option<Bounds>,
    pub min_elev: f64,
    pub max_elev: f64,
}

impl<T> Cluster<T> {
    fn new(index: (usize, usize)) -> Self {
        Self {
            index,
            items: Vec::new(),
            bounds: None,
            min_elev: f64::INFINITY,
            max_elev: f64::NEG_INFINITY,
        }
    }

    /// Local origin for the cluster's geometry
    pub fn center(&self) -> Vec2 {
        self.bounds.map_or(Vec2::ZERO, |b| b.center())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Fixed grid over a bounding box; items go to the cell under their centroid
///
/// Cells are never merged or split. Centroids outside the box land in the
/// nearest edge cell.
#[derive(Debug)]
pub struct ClusterGrid<T> {
    bounds: Bounds,
    cell_size: f64,
    columns: usize,
    rows: usize,
    cells: Vec<Cluster<T>>,
}

impl<T> ClusterGrid<T> {
    pub fn new(bounds: Bounds, cell_size: f64) -> Self {
        let cell_size = if cell_size > 0.0 { cell_size } else { 1.0 };
        let columns = ((bounds.width() / cell_size).ceil() as usize).max(1);
        let rows = ((bounds.height() / cell_size).ceil() as usize).max(1);
        let cells = (0..rows)
            .flat_map(|r| (0..columns).map(move |c| Cluster::new((c, r))))
            .collect();
        Self {
            bounds,
            cell_size,
            columns,
            rows,
            cells,
        }
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.columns, self.rows)
    }

    pub fn cell_of(&self, p: Vec2) -> (usize, usize) {
        let clamp = |v: f64, n: usize| (v.max(0.0) as usize).min(n - 1);
        (
            clamp((p.x - self.bounds.min_x) / self.cell_size, self.columns),
            clamp((p.y - self.bounds.min_y) / self.cell_size, self.rows),
        )
    }

    pub fn append(&mut self, centroid: Vec2, elev: (f64, f64), item: T) {
        let (c, r) = self.cell_of(centroid);
        let cell = &mut self.cells[r * self.columns + c];
        cell.items.push(item);
        match &mut cell.bounds {
            Some(b) => b.expand(&[centroid]),
            None => cell.bounds = Bounds::from_points(&[centroid]),
        }
        cell.min_elev = cell.min_elev.min(elev.0);
        cell.max_elev = cell.max_elev.max(elev.1);
    }

    /// Non-empty clusters in row-major order
    pub fn clusters(&self) -> impl Iterator<Item = &Cluster<T>> {
        self.cells.iter().filter(|c| !c.is_empty())
    }

    pub fn into_clusters(self) -> impl Iterator<Item = Cluster<T>> {
        self.cells.into_iter().filter(|c| !c.is_empty())
    }
}
