//! Boundary clipping: containment gating and obstacle trimming.
//!
//! The containment clip must run first. Trimming cells that later fall
//! outside the study area only wastes splits.

mod containment;
mod merge;
mod obstacle;

pub use containment::clip_to_containment;
pub use merge::{merge_trimmed, reindex};
pub use obstacle::{ObstacleTrimmer, DEFAULT_OBSTACLE_EPSILON};

use tracing::info;

use crate::error::{GridError, Result};
use crate::models::{Cell, Feature};

/// A named set of linear obstacles trimmed in one pass (roads, rivers).
#[derive(Debug, Clone, Copy)]
pub struct ObstacleLayer<'a> {
    pub name: &'a str,
    pub features: &'a [Feature],
}

/// Containment clip followed by one trim-and-merge pass per obstacle layer,
/// in the order given.
///
/// Every returned cell names the grid cell it was cut from (`parent_id`)
/// and its containment boundary (`boundary_id`), whatever the number of
/// layers.
pub fn trim_pipeline(
    cells: &[Cell],
    containment: &[Feature],
    layers: &[ObstacleLayer<'_>],
    trimmer: &ObstacleTrimmer,
) -> Result<Vec<Cell>> {
    let clipped = clip_to_containment(cells, containment)?;
    if clipped.is_empty() {
        return Err(GridError::EmptyInput(
            "no cell overlaps the containment boundaries".to_string(),
        ));
    }

    let mut current = reindex(clipped);
    for layer in layers {
        let pieces = trimmer.trim(&current, layer.features)?;
        current = merge_trimmed(&current, pieces);
        info!("After {} trim: {} cells", layer.name, current.len());
    }
    Ok(current)
}
