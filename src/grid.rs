//! Dense row-major 2D grids addressed by integer coordinates.
//!
//! Every raster in the engine (terrain classes, corridor masks, occurrence
//! grids, suitability and influence fields) is a [`Grid`] with immutable
//! dimensions for a given world instance.
use serde::{Deserialize, Serialize};

/// A fixed-size 2D array of cells, `rows x cols`, addressed as `(x, y)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Grid<T> {
    cols: usize,
    rows: usize,
    data: Vec<T>,
}

impl<T: Clone> Grid<T> {
    /// Create a grid with every cell set to `fill`.
    pub fn new(cols: usize, rows: usize, fill: T) -> Self {
        Self {
            cols,
            rows,
            data: vec![fill; cols * rows],
        }
    }

    /// Rebuild a grid from raw row-major data.
    ///
    /// Returns `None` when `data` does not cover `cols * rows` cells.
    pub fn from_data(cols: usize, rows: usize, data: Vec<T>) -> Option<Self> {
        if data.len() != cols * rows {
            return None;
        }
        Some(Self { cols, rows, data })
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.cols && (y as usize) < self.rows
    }

    /// Value at `(x, y)`, or `None` out of bounds.
    pub fn get(&self, x: i32, y: i32) -> Option<&T> {
        if !self.in_bounds(x, y) {
            return None;
        }
        Some(&self.data[y as usize * self.cols + x as usize])
    }

    /// Set `(x, y)` if in bounds; out-of-bounds writes are ignored.
    pub fn set(&mut self, x: i32, y: i32, value: T) {
        if self.in_bounds(x, y) {
            self.data[y as usize * self.cols + x as usize] = value;
        }
    }

    /// Row-major view of the raw cell data.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Iterate all coordinates in row-major order.
    ///
    /// The iterator owns its counters, so the grid may be mutated while
    /// walking its coordinates.
    pub fn coords(&self) -> impl Iterator<Item = (i32, i32)> {
        let cols = self.cols;
        (0..self.rows * self.cols).map(move |i| ((i % cols) as i32, (i / cols) as i32))
    }
}

impl<T: Copy> Grid<T> {
    /// Value at `(x, y)`, or `fallback` out of bounds.
    pub fn get_or(&self, x: i32, y: i32, fallback: T) -> T {
        self.get(x, y).copied().unwrap_or(fallback)
    }
}

impl Grid<bool> {
    /// Number of set cells.
    pub fn count_set(&self) -> usize {
        self.data.iter().filter(|v| **v).count()
    }

    /// Coordinates of set cells in row-major order.
    pub fn set_coords(&self) -> Vec<(i32, i32)> {
        self.coords().filter(|&(x, y)| self.get_or(x, y, false)).collect()
    }
}
