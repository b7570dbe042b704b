use geo_types::Point;
use tracing::{debug, info};

use super::{check_reference_kinds, AuxTable};
use crate::error::{GridError, Result};
use crate::models::{Cell, CountRecord, Feature};

/// Approximate presence counter.
///
/// For each cell, reference shapes are visited in ascending Manhattan
/// distance between representative points and tested for true
/// intersection. The scan stops once the cumulative number of misses
/// reaches the budget. Representative points are arbitrary interior points,
/// so the ordering is only a heuristic: a hit ranked late can be missed.
/// An unbounded counter visits every shape and matches
/// [`super::count_exhaustive`] exactly.
#[derive(Debug, Clone, Copy)]
pub struct ProximityCounter {
    budget: Option<usize>,
}

/// Reference shapes with their ranking anchors and auxiliary rows resolved
/// once, shared by every cell of a run.
pub struct PreparedShapes<'a> {
    shapes: &'a [Feature],
    anchors: Vec<Point<f64>>,
    values: Vec<&'a [f64]>,
    names: &'a [String],
}

/// Running totals of one cell's scan.
struct ScanTally {
    hits: usize,
    misses: usize,
    sums: Vec<f64>,
}

impl ScanTally {
    fn new(width: usize) -> Self {
        Self {
            hits: 0,
            misses: 0,
            sums: vec![0.0; width],
        }
    }

    fn visit(mut self, hit: bool, values: &[f64]) -> Self {
        if hit {
            self.hits += 1;
            for (sum, value) in self.sums.iter_mut().zip(values) {
                *sum += value;
            }
        } else {
            self.misses += 1;
        }
        self
    }

    fn into_record(self, cell: &Cell, names: &[String]) -> CountRecord {
        CountRecord {
            cell_id: cell.id,
            intersect: self.hits > 0,
            intersect_count: self.hits,
            intersect_no_count: self.misses,
            aggregated: names.iter().cloned().zip(self.sums).collect(),
        }
    }
}

impl ProximityCounter {
    /// `budget` is the cumulative number of non-intersecting visits after
    /// which a cell's scan ends. It is not reset by a hit.
    pub fn new(budget: usize) -> Result<Self> {
        if budget == 0 {
            return Err(GridError::InvalidParameter(
                "scan budget must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            budget: Some(budget),
        })
    }

    /// A counter that never stops early.
    pub fn unbounded() -> Self {
        Self { budget: None }
    }

    pub fn budget(&self) -> Option<usize> {
        self.budget
    }

    /// Resolve anchors and auxiliary rows for a reference layer.
    ///
    /// Fails if the layer mixes points and polygons, holds lines, or lacks
    /// auxiliary values for one of its shapes.
    pub fn prepare<'a>(
        &self,
        shapes: &'a [Feature],
        aux: Option<&'a AuxTable>,
    ) -> Result<PreparedShapes<'a>> {
        check_reference_kinds(shapes)?;

        let anchors = shapes
            .iter()
            .map(|shape| {
                shape.geometry.representative_point().ok_or_else(|| {
                    GridError::InvalidGeometry(format!(
                        "reference shape {} has no representative point",
                        shape.id
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let (values, names) = match aux {
            Some(table) => (
                shapes
                    .iter()
                    .map(|shape| table.row(shape.id))
                    .collect::<Result<Vec<_>>>()?,
                table.names(),
            ),
            None => (vec![&[][..]; shapes.len()], &[][..]),
        };

        Ok(PreparedShapes {
            shapes,
            anchors,
            values,
            names,
        })
    }

    /// Scan one cell. Pure: the record depends only on the cell and the
    /// prepared layer.
    pub fn count_cell(&self, cell: &Cell, prepared: &PreparedShapes<'_>) -> Result<CountRecord> {
        let anchor = cell.representative_point().ok_or_else(|| {
            GridError::InvalidGeometry(format!("cell {} has no interior point", cell.id))
        })?;

        let mut order: Vec<(f64, usize)> = prepared
            .anchors
            .iter()
            .enumerate()
            .map(|(i, p)| ((p.x() - anchor.x()).abs() + (p.y() - anchor.y()).abs(), i))
            .collect();
        order.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let budget = self.budget.unwrap_or(usize::MAX);
        let tally = order
            .into_iter()
            .scan(0usize, |misses, (_, i)| {
                if *misses >= budget {
                    return None;
                }
                let hit = prepared.shapes[i].geometry.falls_in(&cell.geometry);
                if !hit {
                    *misses += 1;
                }
                Some((hit, prepared.values[i]))
            })
            .fold(ScanTally::new(prepared.names.len()), |tally, (hit, values)| {
                tally.visit(hit, values)
            });

        debug!(
            "Cell {}: {} hits, {} misses of {} shapes",
            cell.id,
            tally.hits,
            tally.misses,
            prepared.shapes.len()
        );
        Ok(tally.into_record(cell, prepared.names))
    }

    /// Count every cell against one reference layer.
    ///
    /// An empty layer is a valid, all-negative result.
    pub fn count(
        &self,
        cells: &[Cell],
        shapes: &[Feature],
        aux: Option<&AuxTable>,
    ) -> Result<Vec<CountRecord>> {
        let prepared = self.prepare(shapes, aux)?;
        let records = cells
            .iter()
            .map(|cell| self.count_cell(cell, &prepared))
            .collect::<Result<Vec<_>>>()?;

        let present = records.iter().filter(|r| r.intersect).count();
        let visits: usize = records.iter().map(CountRecord::visited).sum();
        info!(
            "Counted {} cells against {} shapes: {} with presence, {} visits",
            cells.len(),
            shapes.len(),
            present,
            visits
        );
        Ok(records)
    }
}
