use geo_types::{coord, Line};
use tracing::{debug, info};

use super::polygonize;
use crate::error::{GridError, Result};
use crate::models::{Cell, CellId, Shape};

/// Builds square cells of a fixed size over a boundary.
#[derive(Debug, Clone, Copy)]
pub struct GridGenerator {
    cell_size: f64,
}

impl GridGenerator {
    /// `cell_size` is in the boundary's coordinate unit.
    pub fn new(cell_size: f64) -> Result<Self> {
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(GridError::InvalidGeometry(format!(
                "cell size must be positive, got {}",
                cell_size
            )));
        }
        Ok(Self { cell_size })
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Tile the boundary's bounding box, inflated by one cell on every side.
    ///
    /// Cells are numbered densely from 0 and exactly tile the inflated box.
    pub fn generate(&self, boundary: &Shape) -> Result<Vec<Cell>> {
        if !boundary.is_valid() {
            return Err(GridError::InvalidGeometry(
                "grid boundary is degenerate or self-intersecting".to_string(),
            ));
        }
        let rect = boundary
            .bounding_rect()
            .ok_or_else(|| GridError::EmptyInput("grid boundary has no coordinates".to_string()))?;
        if rect.width() <= 0.0 || rect.height() <= 0.0 {
            return Err(GridError::InvalidGeometry(format!(
                "grid boundary has zero extent ({} x {})",
                rect.width(),
                rect.height()
            )));
        }

        let xs = axis_steps(rect.min().x, rect.max().x, self.cell_size);
        let ys = axis_steps(rect.min().y, rect.max().y, self.cell_size);
        debug!(
            "Lattice of {} x {} lines at step {}",
            xs.len(),
            ys.len(),
            self.cell_size
        );

        let faces = polygonize(&lattice_segments(&xs, &ys))?;
        info!(
            "Generated {} cells of size {} over ({}, {}) - ({}, {})",
            faces.len(),
            self.cell_size,
            rect.min().x,
            rect.min().y,
            rect.max().x,
            rect.max().y
        );

        Ok(faces
            .into_iter()
            .enumerate()
            .map(|(i, geometry)| Cell::new(i as CellId, geometry))
            .collect())
    }
}

/// Coordinates from `min - step` through at least `max + step`.
///
/// Each value is computed from the start rather than accumulated, so both
/// segment families share bit-identical coordinates.
fn axis_steps(min: f64, max: f64, step: f64) -> Vec<f64> {
    let start = min - step;
    let steps = ((max - min) / step).ceil() as usize + 2;
    (0..=steps).map(|i| start + step * i as f64).collect()
}

/// Horizontal segments along every y, vertical along every x, each split
/// at every crossing.
fn lattice_segments(xs: &[f64], ys: &[f64]) -> Vec<Line<f64>> {
    let horizontal = ys.iter().flat_map(|&y| {
        xs.windows(2)
            .map(move |w| Line::new(coord! { x: w[0], y: y }, coord! { x: w[1], y: y }))
    });
    let vertical = xs.iter().flat_map(|&x| {
        ys.windows(2)
            .map(move |w| Line::new(coord! { x: x, y: w[0] }, coord! { x: x, y: w[1] }))
    });
    horizontal.chain(vertical).collect()
}
