use hashbrown::HashMap;
use tracing::{info, warn};

use crate::models::{Cell, CellId, ClipResult, FeatureId};
use geo_types::Polygon;

/// Turn containment clip pieces into the first clipped generation.
///
/// Ids are dense from 0 in input order. Each cell's parent is the grid
/// cell its piece was cut from, and `boundary_id` the boundary it was
/// clipped against.
pub fn reindex(pieces: Vec<ClipResult>) -> Vec<Cell> {
    pieces
        .into_iter()
        .enumerate()
        .map(|(i, piece)| Cell {
            id: i as CellId,
            geometry: piece.geometry,
            parent_id: Some(piece.cell_id),
            boundary_id: Some(piece.boundary_id),
            cut_by: None,
        })
        .collect()
}

/// Fold trim pieces back into the cell set they were cut from.
///
/// Every cell whose id parents at least one piece is replaced by its
/// pieces; every other cell carries through with its geometry unchanged.
/// The result keeps the input's cell order and is re-indexed densely.
/// Lineage points at the root: `parent_id` and `boundary_id` are inherited,
/// so they still name the grid cell and containment boundary after any
/// number of passes. A cell with no parent yet is its own root.
pub fn merge_trimmed(cells: &[Cell], pieces: Vec<ClipResult>) -> Vec<Cell> {
    let mut by_parent: HashMap<CellId, Vec<(Polygon<f64>, FeatureId)>> = HashMap::new();
    for piece in pieces {
        by_parent
            .entry(piece.cell_id)
            .or_default()
            .push((piece.geometry, piece.boundary_id));
    }
    let replaced = by_parent.len();

    let merged: Vec<Cell> = cells
        .iter()
        .flat_map(|cell| {
            let generation: Vec<(Polygon<f64>, Option<FeatureId>)> =
                match by_parent.remove(&cell.id) {
                    Some(pieces) => pieces
                        .into_iter()
                        .map(|(geometry, obstacle)| (geometry, Some(obstacle)))
                        .collect(),
                    None => vec![(cell.geometry.clone(), cell.cut_by)],
                };
            generation
                .into_iter()
                .map(move |(geometry, cut_by)| (cell, geometry, cut_by))
        })
        .enumerate()
        .map(|(i, (cell, geometry, cut_by))| Cell {
            id: i as CellId,
            geometry,
            parent_id: cell.parent_id.or(Some(cell.id)),
            boundary_id: cell.boundary_id,
            cut_by,
        })
        .collect();

    if !by_parent.is_empty() {
        warn!(
            "Dropped pieces of {} cells missing from the merge input",
            by_parent.len()
        );
    }
    info!(
        "Merged {} split cells back into {} cells (from {})",
        replaced,
        merged.len(),
        cells.len()
    );
    merged
}
