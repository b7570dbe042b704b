//! Grid cells and the records each pipeline stage emits for them.

use geo::{Area, InteriorPoint};
use geo_types::{Point, Polygon};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::FeatureId;

pub type CellId = u64;

/// One tile of the grid, possibly clipped by boundaries or obstacles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub id: CellId,
    pub geometry: Polygon<f64>,
    /// Id of the grid cell this one was cut from. Stays fixed through
    /// every later clip and trim generation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CellId>,
    /// Containment boundary the cell was clipped against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boundary_id: Option<FeatureId>,
    /// Most recent obstacle that split the cell
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cut_by: Option<FeatureId>,
}

impl Cell {
    pub fn new(id: CellId, geometry: Polygon<f64>) -> Self {
        Self {
            id,
            geometry,
            parent_id: None,
            boundary_id: None,
            cut_by: None,
        }
    }

    pub fn area(&self) -> f64 {
        self.geometry.unsigned_area()
    }

    pub fn representative_point(&self) -> Option<Point<f64>> {
        self.geometry.interior_point()
    }
}

/// One piece of a cell after clipping against a boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClipResult {
    pub cell_id: CellId,
    pub geometry: Polygon<f64>,
    pub boundary_id: FeatureId,
}

/// Presence estimate for one cell against one reference layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountRecord {
    pub cell_id: CellId,
    pub intersect: bool,
    pub intersect_count: usize,
    pub intersect_no_count: usize,
    /// Sum of each auxiliary attribute over intersecting shapes
    pub aggregated: BTreeMap<String, f64>,
}

impl CountRecord {
    pub fn visited(&self) -> usize {
        self.intersect_count + self.intersect_no_count
    }
}
