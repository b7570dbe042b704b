//! Multi-part decomposition and attribute filtering of input features.
//!
//! Clipping and counting both want one contiguous geometry per record, so
//! roads, rivers and reference layers are flattened here first.

use tracing::{debug, info};

use crate::models::{Feature, FeatureId};

/// One record per atomic part, renumbered densely from 0.
///
/// Attributes are copied unchanged and `source_id` points back at the
/// record each part came from. Coordinates are never touched, so running
/// this on already single-part features only rewrites the lineage.
pub fn split_multipart(features: &[Feature]) -> Vec<Feature> {
    let parts: Vec<Feature> = features
        .iter()
        .flat_map(|source| {
            source
                .geometry
                .parts()
                .into_iter()
                .map(move |part| (source, part))
        })
        .enumerate()
        .map(|(i, (source, geometry))| Feature {
            id: i as FeatureId,
            geometry,
            attributes: source.attributes.clone(),
            source_id: Some(source.id),
        })
        .collect();

    info!(
        "Split {} features into {} single-part features",
        features.len(),
        parts.len()
    );
    parts
}

/// Keep features whose text attribute `key` is one of `allowed`.
///
/// Features lacking the attribute, or carrying a non-text value, are
/// dropped.
pub fn retain_by_attribute<S: AsRef<str>>(
    features: Vec<Feature>,
    key: &str,
    allowed: &[S],
) -> Vec<Feature> {
    let before = features.len();
    let kept: Vec<Feature> = features
        .into_iter()
        .filter(|f| {
            f.attribute(key)
                .and_then(|v| v.as_str())
                .map(|v| allowed.iter().any(|a| a.as_ref() == v))
                .unwrap_or(false)
        })
        .collect();

    debug!(
        "Kept {} of {} features by {} filter",
        kept.len(),
        before,
        key
    );
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Shape;
    use geo_types::{line_string, point, MultiLineString};

    fn river() -> Feature {
        Feature::new(
            7,
            Shape::MultiLine(MultiLineString::new(vec![
                line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)],
                line_string![(x: 1.0, y: 1.0), (x: 2.0, y: 1.5)],
            ])),
        )
        .with_attribute("waterway", "river")
    }

    #[test]
    fn test_multiline_split_keeps_lineage() {
        let parts = split_multipart(&[river()]);
        assert_eq!(parts.len(), 2);
        for (i, part) in parts.iter().enumerate() {
            assert_eq!(part.id, i as FeatureId);
            assert_eq!(part.source_id, Some(7));
            assert_eq!(part.attribute("waterway").and_then(|v| v.as_str()), Some("river"));
            assert!(part.geometry.is_single_part());
        }
        assert_eq!(
            parts[1].geometry,
            Shape::Line(line_string![(x: 1.0, y: 1.0), (x: 2.0, y: 1.5)])
        );
    }

    #[test]
    fn test_rerun_is_idempotent() {
        let once = split_multipart(&[river(), Feature::new(9, Shape::Point(point!(x: 3.0, y: 3.0)))]);
        let twice = split_multipart(&once);
        assert_eq!(once.len(), twice.len());
        for (a, b) in once.iter().zip(&twice) {
            assert_eq!(a.geometry, b.geometry);
            assert_eq!(a.attributes, b.attributes);
            assert_eq!(b.source_id, Some(a.id));
        }
    }

    #[test]
    fn test_retain_by_attribute() {
        let road = |id, kind: &str| {
            Feature::new(id, Shape::Line(line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)]))
                .with_attribute("highway", kind)
        };
        let features = vec![
            road(0, "primary"),
            road(1, "track"),
            road(2, "secondary"),
            Feature::new(3, Shape::Point(point!(x: 0.0, y: 0.0))),
        ];
        let kept = retain_by_attribute(features, "highway", &["primary", "secondary"]);
        let ids: Vec<FeatureId> = kept.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![0, 2]);
    }
}
