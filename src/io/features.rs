//! GeoJSON feature files.
//!
//! Study areas, obstacles and reference layers are read from GeoJSON: a
//! FeatureCollection, a single Feature or a bare Geometry, or one Feature
//! per line (`.geojsonl`, `.geojsons`, `.jsonl`, `.ndjson`). Any of these
//! may be gzip-compressed with a trailing `.gz`. Outputs are written back
//! as FeatureCollections.

use flate2::read::GzDecoder;
use geojson::feature::Id;
use geojson::{FeatureCollection, GeoJson, JsonObject, JsonValue};
use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;
use tracing::info;

use crate::error::{GridError, Result};
use crate::models::{AttrValue, Feature, FeatureId, Shape};

/// Yields in-memory features from some external store.
pub trait FeatureSource {
    fn read_features(&self) -> Result<Vec<Feature>>;
}

/// A GeoJSON or GeoJSON-lines file on disk.
#[derive(Debug, Clone)]
pub struct GeoJsonFile {
    path: PathBuf,
}

impl GeoJsonFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn is_gzip(&self) -> bool {
        self.path.extension().is_some_and(|e| e == "gz")
    }

    fn is_line_delimited(&self) -> bool {
        let name = self
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let name = name.strip_suffix(".gz").unwrap_or(name);
        [".geojsonl", ".geojsons", ".jsonl", ".ndjson"]
            .iter()
            .any(|ext| name.ends_with(ext))
    }

    fn read_text(&self) -> Result<String> {
        let file = File::open(&self.path)?;
        let mut reader: Box<dyn Read> = if self.is_gzip() {
            Box::new(GzDecoder::new(file))
        } else {
            Box::new(file)
        };
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Ok(text)
    }
}

impl FeatureSource for GeoJsonFile {
    fn read_features(&self) -> Result<Vec<Feature>> {
        let text = self.read_text()?;
        let documents = if self.is_line_delimited() {
            text.lines()
                // RFC 8142 sequences prefix each record with a record separator
                .map(|line| line.trim_start_matches('\u{1e}').trim())
                .filter(|line| !line.is_empty())
                .map(|line| line.parse::<GeoJson>())
                .collect::<std::result::Result<Vec<_>, _>>()?
        } else {
            vec![text.parse::<GeoJson>()?]
        };

        let features = documents
            .into_iter()
            .flat_map(into_features)
            .enumerate()
            .map(|(i, feature)| from_geojson(i, feature))
            .collect::<Result<Vec<_>>>()?;

        info!(
            "Loaded {} features from {}",
            features.len(),
            self.path.display()
        );
        Ok(features)
    }
}

/// Write features as one FeatureCollection. Attributes become properties
/// and the feature id becomes the GeoJSON id.
pub fn write_geojson<W: Write>(mut writer: W, features: &[Feature]) -> Result<()> {
    let collection = FeatureCollection {
        bbox: None,
        features: features.iter().map(to_geojson).collect(),
        foreign_members: None,
    };
    serde_json::to_writer(&mut writer, &collection)?;
    writer.flush()?;
    Ok(())
}

fn into_features(document: GeoJson) -> Vec<geojson::Feature> {
    match document {
        GeoJson::FeatureCollection(fc) => fc.features,
        GeoJson::Feature(f) => vec![f],
        GeoJson::Geometry(g) => vec![geojson::Feature {
            bbox: None,
            geometry: Some(g),
            id: None,
            properties: None,
            foreign_members: None,
        }],
    }
}

/// Features without a numeric id are numbered by position.
fn from_geojson(index: usize, feature: geojson::Feature) -> Result<Feature> {
    let id = match &feature.id {
        Some(Id::Number(n)) => n.as_u64().unwrap_or(index as FeatureId),
        _ => index as FeatureId,
    };
    let geometry = feature.geometry.ok_or_else(|| {
        GridError::InvalidGeometry(format!("feature {} has no geometry", id))
    })?;
    let geometry = Shape::try_from(geo_types::Geometry::<f64>::try_from(geometry)?)?;
    let attributes = feature
        .properties
        .unwrap_or_default()
        .into_iter()
        .map(|(key, value)| (key, attr_from_json(value)))
        .collect();

    Ok(Feature {
        id,
        geometry,
        attributes,
        source_id: None,
    })
}

fn to_geojson(feature: &Feature) -> geojson::Feature {
    let geometry = geo_types::Geometry::from(feature.geometry.clone());
    let properties: JsonObject = feature
        .attributes
        .iter()
        .map(|(key, value)| (key.clone(), attr_to_json(value)))
        .collect();

    geojson::Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(geojson::Value::from(&geometry))),
        id: Some(Id::Number(feature.id.into())),
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Nested arrays and objects are kept as their JSON text.
fn attr_from_json(value: JsonValue) -> AttrValue {
    match value {
        JsonValue::Null => AttrValue::Null,
        JsonValue::Bool(b) => AttrValue::Bool(b),
        JsonValue::Number(n) => n.as_f64().map_or(AttrValue::Null, AttrValue::Number),
        JsonValue::String(s) => AttrValue::Text(s),
        other => AttrValue::Text(other.to_string()),
    }
}

/// Whole numbers are written as JSON integers so ids stay ids.
fn attr_to_json(value: &AttrValue) -> JsonValue {
    match value {
        AttrValue::Null => JsonValue::Null,
        AttrValue::Bool(b) => JsonValue::Bool(*b),
        AttrValue::Number(n) if n.fract() == 0.0 && n.abs() < 9.0e15 => {
            JsonValue::from(*n as i64)
        }
        AttrValue::Number(n) => serde_json::Number::from_f64(*n)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        AttrValue::Text(s) => JsonValue::String(s.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use geo_types::{line_string, point, polygon};
    use std::fs;

    const ROADS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "id": 7,
                "properties": {"highway": "primary", "lanes": 2, "tags": ["a", "b"]},
                "geometry": {"type": "LineString", "coordinates": [[0.0, 0.0], [1.0, 1.0]]}
            },
            {
                "type": "Feature",
                "id": "way/12",
                "properties": null,
                "geometry": {
                    "type": "MultiLineString",
                    "coordinates": [[[0.0, 0.0], [1.0, 0.0]], [[2.0, 0.0], [2.0, 1.0]]]
                }
            }
        ]
    }"#;

    #[test]
    fn test_reads_feature_collection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roads.geojson");
        fs::write(&path, ROADS).unwrap();

        let features = GeoJsonFile::new(&path).read_features().unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].id, 7);
        assert_eq!(
            features[0].geometry,
            Shape::Line(line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)])
        );
        assert_eq!(features[0].attribute("highway").and_then(|v| v.as_str()), Some("primary"));
        assert_eq!(features[0].attribute("lanes").and_then(|v| v.as_f64()), Some(2.0));
        assert_eq!(features[0].attribute("tags").and_then(|v| v.as_str()), Some(r#"["a","b"]"#));

        // Non-numeric id falls back to position
        assert_eq!(features[1].id, 1);
        assert!(matches!(features[1].geometry, Shape::MultiLine(_)));
        assert!(features[1].attributes.is_empty());
    }

    #[test]
    fn test_reads_gzipped_collection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roads.geojson.gz");
        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        encoder.write_all(ROADS.as_bytes()).unwrap();
        encoder.finish().unwrap();

        let features = GeoJsonFile::new(&path).read_features().unwrap();
        assert_eq!(features.len(), 2);
    }

    #[test]
    fn test_reads_feature_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("buildings.geojsonl");
        let lines = [
            r#"{"type": "Feature", "properties": {"pop": 4}, "geometry": {"type": "Point", "coordinates": [3.0, 4.0]}}"#,
            "",
            "\u{1e}{\"type\": \"Feature\", \"properties\": {}, \"geometry\": {\"type\": \"Point\", \"coordinates\": [5.0, 6.0]}}",
        ];
        fs::write(&path, lines.join("\n")).unwrap();

        let features = GeoJsonFile::new(&path).read_features().unwrap();
        let ids: Vec<FeatureId> = features.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![0, 1]);
        assert_eq!(features[1].geometry, Shape::Point(point!(x: 5.0, y: 6.0)));
    }

    #[test]
    fn test_feature_without_geometry_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.geojson");
        fs::write(&path, r#"{"type": "Feature", "properties": {}, "geometry": null}"#).unwrap();
        assert!(matches!(
            GeoJsonFile::new(&path).read_features(),
            Err(GridError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_written_collection_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("area.geojson");
        let area = Feature::new(
            12,
            Shape::Polygon(polygon![(x: 0.0, y: 0.0), (x: 4.0, y: 0.0), (x: 4.0, y: 3.0)]),
        )
        .with_attribute("ea_id", 3.0)
        .with_attribute("share", 0.25)
        .with_attribute("category", "Only fb");
        write_geojson(File::create(&path).unwrap(), &[area.clone()]).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains(r#""ea_id":3"#));
        assert!(text.contains(r#""share":0.25"#));

        let back = GeoJsonFile::new(&path).read_features().unwrap();
        assert_eq!(back, vec![area]);
    }

    #[test]
    fn test_missing_file() {
        let result = GeoJsonFile::new("/nonexistent/area.geojson").read_features();
        assert!(matches!(result, Err(GridError::Io(_))));
    }
}
