//! eagrid - enumeration area construction for household survey sampling.
//!
//! This library builds a regular cell grid over a study area, trims the cells
//! against containment boundaries and linear obstacles, and estimates which
//! cells contain population-presence signals. The `segment` binary wires
//! these stages to feature files on disk.

pub mod clip;
pub mod count;
pub mod error;
pub mod grid;
pub mod io;
pub mod models;
pub mod partition;
pub mod stratify;

pub use error::{GridError, Result};
pub use models::{Cell, CellId, ClipResult, CountRecord, Feature, FeatureId, Shape};
