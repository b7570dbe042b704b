use geo::{Area, BooleanOps, Intersects};
use geo_types::MultiPolygon;
use tracing::{debug, info};

use crate::error::{GridError, Result};
use crate::models::{Cell, ClipResult, Feature, FeatureId};

/// Pieces smaller than this fraction of their source cell are clipping
/// noise, not geometry.
pub(crate) const MIN_PIECE_FRACTION: f64 = 1e-12;

/// Keep the part of every cell that lies inside each containment boundary.
///
/// A cell overlapping a boundary in several disjoint places emits one
/// result per piece, all sharing the cell's id. Cells that touch no
/// boundary, or only share an edge with one, are dropped.
pub fn clip_to_containment(cells: &[Cell], boundaries: &[Feature]) -> Result<Vec<ClipResult>> {
    if boundaries.is_empty() {
        return Err(GridError::EmptyInput(
            "no containment boundaries given".to_string(),
        ));
    }

    let areas = boundaries
        .iter()
        .map(containment_area)
        .collect::<Result<Vec<(FeatureId, MultiPolygon<f64>)>>>()?;

    let mut results = Vec::new();
    for cell in cells {
        let min_area = cell.area() * MIN_PIECE_FRACTION;
        for (boundary_id, area) in &areas {
            if !cell.geometry.intersects(area) {
                continue;
            }
            for piece in cell.geometry.intersection(area) {
                if piece.unsigned_area() <= min_area {
                    debug!(
                        "Dropping degenerate piece of cell {} against boundary {}",
                        cell.id, boundary_id
                    );
                    continue;
                }
                results.push(ClipResult {
                    cell_id: cell.id,
                    geometry: piece,
                    boundary_id: *boundary_id,
                });
            }
        }
    }

    info!(
        "Containment clip kept {} pieces from {} cells",
        results.len(),
        cells.len()
    );
    Ok(results)
}

fn containment_area(boundary: &Feature) -> Result<(FeatureId, MultiPolygon<f64>)> {
    let area = boundary.geometry.as_area().ok_or_else(|| {
        GridError::InvalidGeometry(format!(
            "containment boundary {} is a {}, not a polygon",
            boundary.id,
            boundary.geometry.kind()
        ))
    })?;
    if !boundary.geometry.is_valid() {
        return Err(GridError::InvalidGeometry(format!(
            "containment boundary {} is degenerate or self-intersecting",
            boundary.id
        )));
    }
    Ok((boundary.id, area))
}
