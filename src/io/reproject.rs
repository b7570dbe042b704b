//! Coordinate transforms applied between grid construction and clipping.
//!
//! The grid is laid out in the study area's own units (metres, say) and
//! then carried into the frame the boundary and reference layers use.
//! `CrsTransform` maps between EPSG codes through PROJ and needs the
//! `proj-transforms` feature; [`Affine`] covers fixed linear maps without it.

use geo::AffineTransform;

use crate::error::{GridError, Result};
use crate::models::{Cell, Shape};

pub trait Reproject {
    fn reproject(&self, shape: &Shape) -> Result<Shape>;
}

/// Inputs already share one frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Reproject for Identity {
    fn reproject(&self, shape: &Shape) -> Result<Shape> {
        Ok(shape.clone())
    }
}

/// A fixed affine map, `[a, b, xoff, d, e, yoff]`:
/// `x' = a*x + b*y + xoff`, `y' = d*x + e*y + yoff`.
#[derive(Debug, Clone, Copy)]
pub struct Affine(AffineTransform<f64>);

impl Affine {
    pub fn new(coefficients: [f64; 6]) -> Result<Self> {
        let [a, b, xoff, d, e, yoff] = coefficients;
        if coefficients.iter().any(|c| !c.is_finite()) || a * e - b * d == 0.0 {
            return Err(GridError::InvalidParameter(format!(
                "affine transform {:?} is not invertible",
                coefficients
            )));
        }
        Ok(Self(AffineTransform::new(a, b, xoff, d, e, yoff)))
    }
}

impl Reproject for Affine {
    fn reproject(&self, shape: &Shape) -> Result<Shape> {
        Ok(shape.affine_transform(&self.0))
    }
}

/// Transform between two coordinate reference systems, e.g.
/// `EPSG:32735` (UTM 35S) to `EPSG:4326`. Coordinates are in
/// longitude/latitude order on the geographic side.
#[cfg(feature = "proj-transforms")]
pub struct CrsTransform {
    proj: proj::Proj,
}

#[cfg(feature = "proj-transforms")]
impl CrsTransform {
    pub fn new(source_crs: &str, target_crs: &str) -> Result<Self> {
        let proj = proj::Proj::new_known_crs(source_crs, target_crs, None).map_err(|e| {
            GridError::Projection(format!("{} -> {}: {}", source_crs, target_crs, e))
        })?;
        Ok(Self { proj })
    }
}

#[cfg(feature = "proj-transforms")]
impl Reproject for CrsTransform {
    fn reproject(&self, shape: &Shape) -> Result<Shape> {
        shape
            .try_map_coords(|c| {
                self.proj
                    .convert((c.x, c.y))
                    .map(|(x, y)| geo_types::coord! { x: x, y: y })
            })
            .map_err(|e| GridError::Projection(e.to_string()))
    }
}

/// Carry a cell generation into another frame, keeping ids and lineage.
pub fn reproject_cells(projection: &dyn Reproject, cells: Vec<Cell>) -> Result<Vec<Cell>> {
    cells
        .into_iter()
        .map(|cell| match projection.reproject(&Shape::Polygon(cell.geometry.clone()))? {
            Shape::Polygon(geometry) => Ok(Cell { geometry, ..cell }),
            other => Err(GridError::InvalidGeometry(format!(
                "cell {} reprojected to a {}",
                cell.id,
                other.kind()
            ))),
        })
        .collect()
}
