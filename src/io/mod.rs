//! External collaborators: feature readers and writers, table export and
//! reprojection.

mod export;
mod features;
mod reproject;

pub use export::{ea_features, write_ea_table};
pub use features::{write_geojson, FeatureSource, GeoJsonFile};
#[cfg(feature = "proj-transforms")]
pub use reproject::CrsTransform;
pub use reproject::{reproject_cells, Affine, Identity, Reproject};
