//! Stratification of final cells into enumeration areas by presence signals.
//!
//! Count layers are joined onto cells by cell id, every cell receives a
//! 1-based enumeration area id, and the combination of presence flags
//! names its stratum ("FB and Roofs", "Only FB", "Neither FB or Roofs").

use geo_types::{Point, Polygon};
use hashbrown::HashMap;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{GridError, Result};
use crate::models::{Cell, CellId, CountRecord, FeatureId};

/// Count records of one reference layer, labelled for output.
#[derive(Debug, Clone, Copy)]
pub struct PresenceLayer<'a> {
    pub name: &'a str,
    pub records: &'a [CountRecord],
}

#[derive(Debug, Clone, Serialize)]
pub struct StratifiedCell {
    pub ea_id: u64,
    pub cell_id: CellId,
    /// Grid cell this area was cut from
    pub parent_id: Option<CellId>,
    pub boundary_id: Option<FeatureId>,
    pub cut_by: Option<FeatureId>,
    pub geometry: Polygon<f64>,
    pub anchor: Option<Point<f64>>,
    /// One record per layer, in layer order
    pub presence: Vec<CountRecord>,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StratumSummary {
    pub category: String,
    pub count: usize,
    pub proportion: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Stratification {
    pub layer_names: Vec<String>,
    pub cells: Vec<StratifiedCell>,
}

impl Stratification {
    /// Cells per category, largest first.
    pub fn summary(&self) -> Vec<StratumSummary> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for cell in &self.cells {
            *counts.entry(cell.category.as_str()).or_default() += 1;
        }
        let total = self.cells.len().max(1) as f64;
        let mut summary: Vec<StratumSummary> = counts
            .into_iter()
            .map(|(category, count)| StratumSummary {
                category: category.to_string(),
                count,
                proportion: count as f64 / total,
            })
            .collect();
        summary.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.category.cmp(&b.category)));
        summary
    }
}

/// Join presence layers onto cells by id and assign strata.
///
/// Every cell must have a record in every layer.
pub fn stratify(cells: &[Cell], layers: &[PresenceLayer<'_>]) -> Result<Stratification> {
    if layers.is_empty() {
        return Err(GridError::EmptyInput("no presence layers to stratify by".to_string()));
    }

    let indexed: Vec<HashMap<CellId, &CountRecord>> = layers
        .iter()
        .map(|layer| layer.records.iter().map(|r| (r.cell_id, r)).collect())
        .collect();
    for (layer, index) in layers.iter().zip(&indexed) {
        if index.len() != cells.len() {
            warn!(
                "Layer {} has records for {} cells, grid has {}",
                layer.name,
                index.len(),
                cells.len()
            );
        }
    }

    let names: Vec<&str> = layers.iter().map(|l| l.name).collect();
    let stratified = cells
        .iter()
        .enumerate()
        .map(|(i, cell)| -> Result<StratifiedCell> {
            let presence = layers
                .iter()
                .zip(&indexed)
                .map(|(layer, index)| {
                    index.get(&cell.id).map(|r| (*r).clone()).ok_or_else(|| {
                        GridError::SchemaMismatch(format!(
                            "layer {} has no count for cell {}",
                            layer.name, cell.id
                        ))
                    })
                })
                .collect::<Result<Vec<CountRecord>>>()?;
            let flags: Vec<bool> = presence.iter().map(|r| r.intersect).collect();
            Ok(StratifiedCell {
                ea_id: i as u64 + 1,
                cell_id: cell.id,
                parent_id: cell.parent_id,
                boundary_id: cell.boundary_id,
                cut_by: cell.cut_by,
                geometry: cell.geometry.clone(),
                anchor: cell.representative_point(),
                category: category_label(&names, &flags),
                presence,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    info!(
        "Stratified {} cells by {}",
        stratified.len(),
        names.join(", ")
    );
    Ok(Stratification {
        layer_names: names.iter().map(|n| n.to_string()).collect(),
        cells: stratified,
    })
}

/// Name the combination of presence flags.
pub fn category_label(names: &[&str], flags: &[bool]) -> String {
    let present: Vec<&str> = names
        .iter()
        .zip(flags)
        .filter(|(_, flag)| **flag)
        .map(|(name, _)| *name)
        .collect();

    match (present.len(), names.len()) {
        (0, 1) => format!("No {}", names[0]),
        (0, _) => format!("Neither {}", names.join(" or ")),
        (n, total) if n == total => names.join(" and "),
        _ => format!("Only {}", present.join(" and ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{coord, Rect};
    use std::collections::BTreeMap;

    fn cell(id: CellId) -> Cell {
        let x = id as f64;
        Cell::new(id, Rect::new(coord! { x: x, y: 0.0 }, coord! { x: x + 1.0, y: 1.0 }).to_polygon())
    }

    fn record(cell_id: CellId, hits: usize) -> CountRecord {
        CountRecord {
            cell_id,
            intersect: hits > 0,
            intersect_count: hits,
            intersect_no_count: 3,
            aggregated: BTreeMap::new(),
        }
    }

    #[test]
    fn test_two_layer_labels() {
        let names = ["FB", "Roofs"];
        assert_eq!(category_label(&names, &[true, true]), "FB and Roofs");
        assert_eq!(category_label(&names, &[true, false]), "Only FB");
        assert_eq!(category_label(&names, &[false, true]), "Only Roofs");
        assert_eq!(category_label(&names, &[false, false]), "Neither FB or Roofs");
    }

    #[test]
    fn test_single_layer_labels() {
        assert_eq!(category_label(&["FB"], &[true]), "FB");
        assert_eq!(category_label(&["FB"], &[false]), "No FB");
    }

    #[test]
    fn test_join_by_id_not_position() {
        let cells = vec![cell(0), cell(1), cell(2)];
        let fb = vec![record(2, 0), record(0, 1), record(1, 0)];
        let roofs = vec![record(1, 4), record(2, 0), record(0, 2)];

        let result = stratify(
            &cells,
            &[
                PresenceLayer { name: "FB", records: &fb },
                PresenceLayer { name: "Roofs", records: &roofs },
            ],
        )
        .unwrap();

        let categories: Vec<&str> = result.cells.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(categories, vec!["FB and Roofs", "Only Roofs", "Neither FB or Roofs"]);
        let ea_ids: Vec<u64> = result.cells.iter().map(|c| c.ea_id).collect();
        assert_eq!(ea_ids, vec![1, 2, 3]);
        assert_eq!(result.cells[1].presence[1].intersect_count, 4);
    }

    #[test]
    fn test_missing_record_is_schema_mismatch() {
        let cells = vec![cell(0), cell(1)];
        let fb = vec![record(0, 1)];
        let result = stratify(&cells, &[PresenceLayer { name: "FB", records: &fb }]);
        assert!(matches!(result, Err(GridError::SchemaMismatch(_))));
    }

    #[test]
    fn test_summary_counts_and_proportions() {
        let cells = vec![cell(0), cell(1), cell(2), cell(3)];
        let fb = vec![record(0, 1), record(1, 0), record(2, 0), record(3, 2)];
        let result = stratify(&cells, &[PresenceLayer { name: "FB", records: &fb }]).unwrap();

        let summary = result.summary();
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].count, 2);
        assert_eq!(summary[0].category, "FB");
        assert!((summary[1].proportion - 0.5).abs() < 1e-12);
    }
}
