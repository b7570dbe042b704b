//! Core data models for the segmentation pipeline.

pub mod cell;
pub mod feature;
pub mod shape;

pub use cell::{Cell, CellId, ClipResult, CountRecord};
pub use feature::{AttrValue, Attributes, BoundaryFeature, Feature, FeatureId, ReferenceShape};
pub use shape::{Shape, ShapeKind};
