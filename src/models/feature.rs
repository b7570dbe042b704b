//! Input features: boundaries, obstacles and reference shapes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Shape;

pub type FeatureId = u64;

/// Attribute value carried through from the source record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl AttrValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Number(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

pub type Attributes = BTreeMap<String, AttrValue>;

/// A geometry with its attribute record.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: FeatureId,
    pub geometry: Shape,
    pub attributes: Attributes,
    /// Id of the record this one was split from, if any
    pub source_id: Option<FeatureId>,
}

/// Containment polygon or linear obstacle used to clip cells.
pub type BoundaryFeature = Feature;

/// Point or polygon whose presence inside a cell is tested.
pub type ReferenceShape = Feature;

impl Feature {
    pub fn new(id: FeatureId, geometry: Shape) -> Self {
        Self {
            id,
            geometry,
            attributes: Attributes::new(),
            source_id: None,
        }
    }

    pub fn with_attribute(mut self, key: &str, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&AttrValue> {
        self.attributes.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attr_value_from_json() {
        let attrs: Attributes =
            serde_json::from_str(r#"{"highway": "primary", "pop": 12, "flag": true, "x": null}"#)
                .unwrap();
        assert_eq!(attrs["highway"].as_str(), Some("primary"));
        assert_eq!(attrs["pop"].as_f64(), Some(12.0));
        assert_eq!(attrs["flag"], AttrValue::Bool(true));
        assert_eq!(attrs["x"], AttrValue::Null);
    }
}
