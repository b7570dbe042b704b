//! Export of the enumeration area table and the enumeration area polygons.

use std::io::Write;
use tracing::info;

use crate::error::Result;
use crate::models::{AttrValue, Feature, Shape};
use crate::stratify::Stratification;

/// Write one row per enumeration area.
///
/// Columns: `ea_id`, `cell_id`, `parent_id`, `x`, `y`, then for each
/// layer `intersect_<layer>`, `intersect_count_<layer>`,
/// `intersect_no_count_<layer>` and `<attribute>_<layer>` for every
/// aggregated attribute, and finally `category`.
pub fn write_ea_table<W: Write>(writer: W, strata: &Stratification) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    // Attribute columns per layer, taken from the first row; every record of
    // a layer shares the same names.
    let attribute_names: Vec<Vec<String>> = (0..strata.layer_names.len())
        .map(|layer| {
            strata
                .cells
                .first()
                .and_then(|cell| cell.presence.get(layer))
                .map(|r| r.aggregated.keys().cloned().collect())
                .unwrap_or_default()
        })
        .collect();

    let mut header: Vec<String> = ["ea_id", "cell_id", "parent_id", "x", "y"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    for (layer, attributes) in strata.layer_names.iter().zip(&attribute_names) {
        header.push(format!("intersect_{}", layer));
        header.push(format!("intersect_count_{}", layer));
        header.push(format!("intersect_no_count_{}", layer));
        header.extend(attributes.iter().map(|a| format!("{}_{}", a, layer)));
    }
    header.push("category".to_string());
    csv_writer.write_record(&header)?;

    for cell in &strata.cells {
        let mut row = vec![
            cell.ea_id.to_string(),
            cell.cell_id.to_string(),
            cell.parent_id.map(|p| p.to_string()).unwrap_or_default(),
            cell.anchor.map(|p| p.x().to_string()).unwrap_or_default(),
            cell.anchor.map(|p| p.y().to_string()).unwrap_or_default(),
        ];
        for (record, attributes) in cell.presence.iter().zip(&attribute_names) {
            row.push(record.intersect.to_string());
            row.push(record.intersect_count.to_string());
            row.push(record.intersect_no_count.to_string());
            row.extend(attributes.iter().map(|a| {
                record
                    .aggregated
                    .get(a)
                    .map(|v| v.to_string())
                    .unwrap_or_default()
            }));
        }
        row.push(cell.category.clone());
        csv_writer.write_record(&row)?;
    }

    csv_writer.flush()?;
    info!("Wrote {} enumeration areas", strata.cells.len());
    Ok(())
}

/// Enumeration areas as polygon features, one per stratified cell.
///
/// The feature id is the `ea_id`. Properties carry the cell lineage
/// (`cell_id`, `parent_id`, `boundary_id`, `cut_by`), `intersect_<layer>`,
/// `intersect_count_<layer>` and aggregated `<attribute>_<layer>` values per
/// layer, and the `category`. Missing lineage is written as null.
pub fn ea_features(strata: &Stratification) -> Vec<Feature> {
    strata
        .cells
        .iter()
        .map(|cell| {
            let optional = |id: Option<u64>| id.map_or(AttrValue::Null, |v| AttrValue::Number(v as f64));
            let mut feature = Feature::new(cell.ea_id, Shape::Polygon(cell.geometry.clone()))
                .with_attribute("ea_id", cell.ea_id as f64)
                .with_attribute("cell_id", cell.cell_id as f64)
                .with_attribute("parent_id", optional(cell.parent_id))
                .with_attribute("boundary_id", optional(cell.boundary_id))
                .with_attribute("cut_by", optional(cell.cut_by))
                .with_attribute("category", cell.category.as_str());
            for (layer, record) in strata.layer_names.iter().zip(&cell.presence) {
                feature = feature
                    .with_attribute(&format!("intersect_{}", layer), record.intersect)
                    .with_attribute(
                        &format!("intersect_count_{}", layer),
                        record.intersect_count as f64,
                    );
                for (attribute, value) in &record.aggregated {
                    feature = feature.with_attribute(&format!("{}_{}", attribute, layer), *value);
                }
            }
            feature
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Cell, CountRecord};
    use crate::stratify::{stratify, PresenceLayer};
    use geo_types::{coord, Rect};
    use std::collections::BTreeMap;

    #[test]
    fn test_table_layout() {
        let cells = vec![
            Cell::new(0, Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 2.0, y: 2.0 }).to_polygon()),
            Cell::new(1, Rect::new(coord! { x: 2.0, y: 0.0 }, coord! { x: 4.0, y: 2.0 }).to_polygon()),
        ];
        let fb: Vec<CountRecord> = cells
            .iter()
            .map(|c| CountRecord {
                cell_id: c.id,
                intersect: c.id == 0,
                intersect_count: if c.id == 0 { 2 } else { 0 },
                intersect_no_count: 1,
                aggregated: BTreeMap::from([("pop".to_string(), if c.id == 0 { 7.5 } else { 0.0 })]),
            })
            .collect();
        let strata = stratify(&cells, &[PresenceLayer { name: "fb", records: &fb }]).unwrap();

        let mut out = Vec::new();
        write_ea_table(&mut out, &strata).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "ea_id,cell_id,parent_id,x,y,intersect_fb,intersect_count_fb,intersect_no_count_fb,pop_fb,category"
        );
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("1,0,,"));
        assert!(lines[1].ends_with(",true,2,1,7.5,fb"));
        assert!(lines[2].ends_with(",false,0,1,0,No fb"));
    }

    #[test]
    fn test_ea_features_carry_strata() {
        let square = |x0: f64| Rect::new(coord! { x: x0, y: 0.0 }, coord! { x: x0 + 2.0, y: 2.0 }).to_polygon();
        let cells = vec![
            Cell {
                parent_id: Some(4),
                boundary_id: Some(0),
                cut_by: Some(9),
                ..Cell::new(0, square(0.0))
            },
            Cell::new(1, square(2.0)),
        ];
        let record = |cell_id: u64, hits: usize| CountRecord {
            cell_id,
            intersect: hits > 0,
            intersect_count: hits,
            intersect_no_count: 0,
            aggregated: BTreeMap::from([("pop".to_string(), hits as f64 * 1.5)]),
        };
        let fb = vec![record(0, 2), record(1, 0)];
        let roofs = vec![record(0, 0), record(1, 0)];
        let strata = stratify(
            &cells,
            &[
                PresenceLayer { name: "fb", records: &fb },
                PresenceLayer { name: "roofs", records: &roofs },
            ],
        )
        .unwrap();

        let features = ea_features(&strata);
        assert_eq!(features.len(), 2);

        let first = &features[0];
        assert_eq!(first.id, 1);
        assert_eq!(first.geometry, Shape::Polygon(square(0.0)));
        assert_eq!(first.attribute("category").and_then(|v| v.as_str()), Some("Only fb"));
        assert_eq!(first.attribute("intersect_fb"), Some(&AttrValue::Bool(true)));
        assert_eq!(first.attribute("intersect_roofs"), Some(&AttrValue::Bool(false)));
        assert_eq!(first.attribute("intersect_count_fb").and_then(|v| v.as_f64()), Some(2.0));
        assert_eq!(first.attribute("pop_fb").and_then(|v| v.as_f64()), Some(3.0));
        assert_eq!(first.attribute("parent_id").and_then(|v| v.as_f64()), Some(4.0));
        assert_eq!(first.attribute("cut_by").and_then(|v| v.as_f64()), Some(9.0));

        let second = &features[1];
        assert_eq!(second.attribute("ea_id").and_then(|v| v.as_f64()), Some(2.0));
        assert_eq!(second.attribute("parent_id"), Some(&AttrValue::Null));
        assert_eq!(second.attribute("category").and_then(|v| v.as_str()), Some("Neither fb or roofs"));
    }
}
