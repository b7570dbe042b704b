//! Closed shape variant over the geometry kinds the pipeline consumes.
//!
//! Every geometric question the stages ask of an input (bounding box,
//! representative point, intersection with a cell, buffering) is answered
//! here by exhaustive matching, so the rest of the crate never branches on
//! a geometry kind by name.

use geo::{
    AffineOps, AffineTransform, BoundingRect, InteriorPoint, Intersects, MapCoords, Validation,
    Within,
};
use geo_types::{
    Coord, Geometry, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon, Rect,
};

use crate::error::{GridError, Result};

/// A single geometry value. Multi-part variants are decomposed by
/// [`Shape::parts`].
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Point(Point<f64>),
    MultiPoint(MultiPoint<f64>),
    Line(LineString<f64>),
    MultiLine(MultiLineString<f64>),
    Polygon(Polygon<f64>),
    MultiPolygon(MultiPolygon<f64>),
}

/// Dimension of a shape, ignoring whether it is single- or multi-part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShapeKind {
    Point,
    Line,
    Area,
}

impl std::fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShapeKind::Point => write!(f, "point"),
            ShapeKind::Line => write!(f, "line"),
            ShapeKind::Area => write!(f, "polygon"),
        }
    }
}

impl Shape {
    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Point(_) | Shape::MultiPoint(_) => ShapeKind::Point,
            Shape::Line(_) | Shape::MultiLine(_) => ShapeKind::Line,
            Shape::Polygon(_) | Shape::MultiPolygon(_) => ShapeKind::Area,
        }
    }

    pub fn is_single_part(&self) -> bool {
        matches!(self, Shape::Point(_) | Shape::Line(_) | Shape::Polygon(_))
    }

    /// Split into atomic parts. Single-part shapes yield themselves.
    /// Coordinates are never altered.
    pub fn parts(&self) -> Vec<Shape> {
        match self {
            Shape::MultiPoint(mp) => mp.iter().copied().map(Shape::Point).collect(),
            Shape::MultiLine(ml) => ml.iter().cloned().map(Shape::Line).collect(),
            Shape::MultiPolygon(mp) => mp.iter().cloned().map(Shape::Polygon).collect(),
            single => vec![single.clone()],
        }
    }

    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        match self {
            Shape::Point(p) => Some(p.bounding_rect()),
            Shape::MultiPoint(mp) => mp.bounding_rect(),
            Shape::Line(ls) => ls.bounding_rect(),
            Shape::MultiLine(ml) => ml.bounding_rect(),
            Shape::Polygon(p) => p.bounding_rect(),
            Shape::MultiPolygon(mp) => mp.bounding_rect(),
        }
    }

    /// An arbitrary point guaranteed to lie on the shape (interior for
    /// polygons). Used as a cheap location proxy, not a centroid.
    pub fn representative_point(&self) -> Option<Point<f64>> {
        match self {
            Shape::Point(p) => Some(*p),
            Shape::MultiPoint(mp) => mp.interior_point(),
            Shape::Line(ls) => ls.interior_point(),
            Shape::MultiLine(ml) => ml.interior_point(),
            Shape::Polygon(p) => p.interior_point(),
            Shape::MultiPolygon(mp) => mp.interior_point(),
        }
    }

    pub fn is_valid(&self) -> bool {
        match self {
            Shape::Point(p) => p.is_valid(),
            Shape::MultiPoint(mp) => mp.is_valid(),
            Shape::Line(ls) => ls.is_valid(),
            Shape::MultiLine(ml) => ml.is_valid(),
            Shape::Polygon(p) => p.is_valid(),
            Shape::MultiPolygon(mp) => mp.is_valid(),
        }
    }

    pub fn intersects_polygon(&self, polygon: &Polygon<f64>) -> bool {
        match self {
            Shape::Point(p) => polygon.intersects(p),
            Shape::MultiPoint(mp) => polygon.intersects(mp),
            Shape::Line(ls) => polygon.intersects(ls),
            Shape::MultiLine(ml) => polygon.intersects(ml),
            Shape::Polygon(p) => polygon.intersects(p),
            Shape::MultiPolygon(mp) => polygon.intersects(mp),
        }
    }

    /// Presence test used by the counters: points must lie strictly inside
    /// the cell, lines and polygons only need to intersect it.
    pub fn falls_in(&self, cell: &Polygon<f64>) -> bool {
        match self {
            Shape::Point(p) => p.is_within(cell),
            Shape::MultiPoint(mp) => mp.is_within(cell),
            other => other.intersects_polygon(cell),
        }
    }

    /// The area covered by a polygonal shape.
    pub fn as_area(&self) -> Option<MultiPolygon<f64>> {
        match self {
            Shape::Polygon(p) => Some(MultiPolygon::new(vec![p.clone()])),
            Shape::MultiPolygon(mp) => Some(mp.clone()),
            _ => None,
        }
    }

    /// The lines of a linear shape.
    pub fn as_lines(&self) -> Option<MultiLineString<f64>> {
        match self {
            Shape::Line(ls) => Some(MultiLineString::new(vec![ls.clone()])),
            Shape::MultiLine(ml) => Some(ml.clone()),
            _ => None,
        }
    }

    pub fn affine_transform(&self, transform: &AffineTransform<f64>) -> Shape {
        match self {
            Shape::Point(p) => Shape::Point(p.affine_transform(transform)),
            Shape::MultiPoint(mp) => Shape::MultiPoint(mp.affine_transform(transform)),
            Shape::Line(ls) => Shape::Line(ls.affine_transform(transform)),
            Shape::MultiLine(ml) => Shape::MultiLine(ml.affine_transform(transform)),
            Shape::Polygon(p) => Shape::Polygon(p.affine_transform(transform)),
            Shape::MultiPolygon(mp) => Shape::MultiPolygon(mp.affine_transform(transform)),
        }
    }

    /// Rebuild the shape with every coordinate passed through a fallible
    /// map, stopping at the first failure.
    pub fn try_map_coords<E>(
        &self,
        func: impl Fn(Coord<f64>) -> std::result::Result<Coord<f64>, E> + Copy,
    ) -> std::result::Result<Shape, E> {
        Ok(match self {
            Shape::Point(p) => Shape::Point(p.try_map_coords(func)?),
            Shape::MultiPoint(mp) => Shape::MultiPoint(mp.try_map_coords(func)?),
            Shape::Line(ls) => Shape::Line(ls.try_map_coords(func)?),
            Shape::MultiLine(ml) => Shape::MultiLine(ml.try_map_coords(func)?),
            Shape::Polygon(p) => Shape::Polygon(p.try_map_coords(func)?),
            Shape::MultiPolygon(mp) => Shape::MultiPolygon(mp.try_map_coords(func)?),
        })
    }
}

impl TryFrom<Geometry<f64>> for Shape {
    type Error = GridError;

    fn try_from(geometry: Geometry<f64>) -> Result<Self> {
        match geometry {
            Geometry::Point(p) => Ok(Shape::Point(p)),
            Geometry::MultiPoint(mp) => Ok(Shape::MultiPoint(mp)),
            Geometry::Line(l) => Ok(Shape::Line(LineString::from(vec![l.start, l.end]))),
            Geometry::LineString(ls) => Ok(Shape::Line(ls)),
            Geometry::MultiLineString(ml) => Ok(Shape::MultiLine(ml)),
            Geometry::Polygon(p) => Ok(Shape::Polygon(p)),
            Geometry::MultiPolygon(mp) => Ok(Shape::MultiPolygon(mp)),
            Geometry::Rect(r) => Ok(Shape::Polygon(r.to_polygon())),
            Geometry::Triangle(t) => Ok(Shape::Polygon(t.to_polygon())),
            other => Err(GridError::InvalidGeometry(format!(
                "unsupported geometry: {:?}",
                other
            ))),
        }
    }
}

impl From<Shape> for Geometry<f64> {
    fn from(shape: Shape) -> Self {
        match shape {
            Shape::Point(p) => Geometry::Point(p),
            Shape::MultiPoint(mp) => Geometry::MultiPoint(mp),
            Shape::Line(ls) => Geometry::LineString(ls),
            Shape::MultiLine(ml) => Geometry::MultiLineString(ml),
            Shape::Polygon(p) => Geometry::Polygon(p),
            Shape::MultiPolygon(mp) => Geometry::MultiPolygon(mp),
        }
    }
}
