use tracing::info;

use super::{check_reference_kinds, AuxTable};
use crate::error::Result;
use crate::models::{Cell, CountRecord, Feature};

/// Brute-force pairwise count: every shape is tested against every cell.
///
/// Quadratic, but exact. Serves as the reference the proximity scan is
/// validated against.
pub fn count_exhaustive(
    cells: &[Cell],
    shapes: &[Feature],
    aux: Option<&AuxTable>,
) -> Result<Vec<CountRecord>> {
    check_reference_kinds(shapes)?;
    let names = aux.map(AuxTable::names).unwrap_or(&[]);

    let mut records = Vec::with_capacity(cells.len());
    for cell in cells {
        let mut hits = 0;
        let mut misses = 0;
        let mut sums = vec![0.0; names.len()];
        for shape in shapes {
            if shape.geometry.falls_in(&cell.geometry) {
                hits += 1;
                if let Some(table) = aux {
                    for (sum, value) in sums.iter_mut().zip(table.row(shape.id)?) {
                        *sum += value;
                    }
                }
            } else {
                misses += 1;
            }
        }
        records.push(CountRecord {
            cell_id: cell.id,
            intersect: hits > 0,
            intersect_count: hits,
            intersect_no_count: misses,
            aggregated: names.iter().cloned().zip(sums).collect(),
        });
    }

    info!(
        "Exhaustive count of {} cells against {} shapes",
        cells.len(),
        shapes.len()
    );
    Ok(records)
}
