//! Per-cell presence counting against reference layers.
//!
//! [`ProximityCounter`] is the approximate, early-terminating scan used in
//! production runs; [`count_exhaustive`] is the exact pairwise reference.

mod attributes;
mod exhaustive;
mod proximity;

pub use attributes::AuxTable;
pub use exhaustive::count_exhaustive;
pub use proximity::{PreparedShapes, ProximityCounter};

use crate::error::{GridError, Result};
use crate::models::{Feature, ShapeKind};

/// A reference layer holds points or polygons, never both, and no lines.
pub(crate) fn check_reference_kinds(shapes: &[Feature]) -> Result<()> {
    let mut kinds = shapes.iter().map(|s| (s.id, s.geometry.kind()));
    let Some((first_id, first)) = kinds.next() else {
        return Ok(());
    };
    if first == ShapeKind::Line {
        return Err(GridError::InvalidGeometry(format!(
            "reference shape {} is a line",
            first_id
        )));
    }
    match kinds.find(|(_, kind)| *kind != first) {
        Some((id, kind)) => Err(GridError::InvalidGeometry(format!(
            "reference shape {} is a {} in a {} layer",
            id, kind, first
        ))),
        None => Ok(()),
    }
}
