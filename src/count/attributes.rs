use hashbrown::HashMap;

use crate::error::{GridError, Result};
use crate::models::{Feature, FeatureId};

/// Numeric attribute vectors keyed by reference shape id, summed over the
/// shapes found inside each cell.
#[derive(Debug, Clone, Default)]
pub struct AuxTable {
    names: Vec<String>,
    rows: HashMap<FeatureId, Vec<f64>>,
}

impl AuxTable {
    /// Build from explicit rows. Every row must carry one value per name,
    /// and every shape id may appear only once.
    pub fn new<I>(names: Vec<String>, rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = (FeatureId, Vec<f64>)>,
    {
        let mut table = HashMap::new();
        for (id, values) in rows {
            if values.len() != names.len() {
                return Err(GridError::SchemaMismatch(format!(
                    "shape {} has {} values for {} attributes",
                    id,
                    values.len(),
                    names.len()
                )));
            }
            if table.insert(id, values).is_some() {
                return Err(GridError::SchemaMismatch(format!(
                    "shape {} has more than one row of auxiliary values",
                    id
                )));
            }
        }
        Ok(Self { names, rows: table })
    }

    /// Pull the named numeric attributes out of each shape's record.
    pub fn from_attributes(shapes: &[Feature], names: &[String]) -> Result<Self> {
        let rows = shapes
            .iter()
            .map(|shape| -> Result<(FeatureId, Vec<f64>)> {
                let values = names
                    .iter()
                    .map(|name| {
                        shape.attribute(name).and_then(|v| v.as_f64()).ok_or_else(|| {
                            GridError::SchemaMismatch(format!(
                                "shape {} has no numeric attribute '{}'",
                                shape.id, name
                            ))
                        })
                    })
                    .collect::<Result<Vec<f64>>>()?;
                Ok((shape.id, values))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(names.to_vec(), rows)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn row(&self, id: FeatureId) -> Result<&[f64]> {
        self.rows.get(&id).map(Vec::as_slice).ok_or_else(|| {
            GridError::SchemaMismatch(format!("no auxiliary values for shape {}", id))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Shape;
    use geo_types::point;

    #[test]
    fn test_row_length_checked() {
        let result = AuxTable::new(vec!["pop".into(), "hh".into()], vec![(0, vec![1.0])]);
        assert!(matches!(result, Err(GridError::SchemaMismatch(_))));
    }

    #[test]
    fn test_duplicate_shape_id_rejected() {
        let result = AuxTable::new(
            vec!["pop".into()],
            vec![(3, vec![1.0]), (4, vec![2.0]), (3, vec![5.0])],
        );
        assert!(matches!(result, Err(GridError::SchemaMismatch(_))));
    }

    #[test]
    fn test_unsplit_multipart_ids_rejected() {
        // Two records sharing a source id, as before multi-part splitting
        let shapes = vec![
            Feature::new(2, Shape::Point(point!(x: 0.0, y: 0.0))).with_attribute("pop", 1.0),
            Feature::new(2, Shape::Point(point!(x: 1.0, y: 0.0))).with_attribute("pop", 4.0),
        ];
        assert!(matches!(
            AuxTable::from_attributes(&shapes, &["pop".to_string()]),
            Err(GridError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_from_attributes() {
        let shapes = vec![
            Feature::new(4, Shape::Point(point!(x: 0.0, y: 0.0))).with_attribute("pop", 3.5),
            Feature::new(8, Shape::Point(point!(x: 1.0, y: 0.0))).with_attribute("pop", 1.0),
        ];
        let table = AuxTable::from_attributes(&shapes, &["pop".to_string()]).unwrap();
        assert_eq!(table.row(4).unwrap(), &[3.5]);
        assert!(table.row(5).is_err());
    }

    #[test]
    fn test_missing_attribute() {
        let shapes = vec![Feature::new(0, Shape::Point(point!(x: 0.0, y: 0.0))).with_attribute("pop", "many")];
        assert!(matches!(
            AuxTable::from_attributes(&shapes, &["pop".to_string()]),
            Err(GridError::SchemaMismatch(_))
        ));
    }
}
