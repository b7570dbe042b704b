//! Regular grid generation.
//!
//! Lays two families of axis-aligned segments over a boundary's inflated
//! bounding box and turns the faces of their planar subdivision into cells.

mod lattice;
mod polygonize;

pub use lattice::GridGenerator;
pub use polygonize::polygonize;
