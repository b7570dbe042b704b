use geo_types::{coord, Line, Polygon, Rect};
use hashbrown::HashSet;

use crate::error::{GridError, Result};

/// Edge identity by exact coordinate bits: (low end, high end, fixed axis).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct EdgeKey([u64; 3]);

impl EdgeKey {
    fn new(lo: f64, hi: f64, at: f64) -> Self {
        Self([lo.to_bits(), hi.to_bits(), at.to_bits()])
    }
}

/// Faces of the planar subdivision induced by axis-aligned segments.
///
/// Segments must already be split at every crossing, which is how the
/// lattice builder emits them. A face is the rectangle between two
/// consecutive distinct x and y coordinates, produced only when all four
/// of its sides are present. Faces come out row by row, bottom to top and
/// left to right.
pub fn polygonize(segments: &[Line<f64>]) -> Result<Vec<Polygon<f64>>> {
    let mut horizontal = HashSet::new();
    let mut vertical = HashSet::new();
    let mut xs = Vec::new();
    let mut ys = Vec::new();

    for segment in segments {
        let (a, b) = (segment.start, segment.end);
        if a.y == b.y && a.x != b.x {
            let (lo, hi) = if a.x < b.x { (a.x, b.x) } else { (b.x, a.x) };
            horizontal.insert(EdgeKey::new(lo, hi, a.y));
            xs.extend([lo, hi]);
            ys.push(a.y);
        } else if a.x == b.x && a.y != b.y {
            let (lo, hi) = if a.y < b.y { (a.y, b.y) } else { (b.y, a.y) };
            vertical.insert(EdgeKey::new(lo, hi, a.x));
            ys.extend([lo, hi]);
            xs.push(a.x);
        } else {
            return Err(GridError::InvalidGeometry(format!(
                "segment ({}, {}) -> ({}, {}) is not axis-aligned",
                a.x, a.y, b.x, b.y
            )));
        }
    }

    sort_dedup(&mut xs);
    sort_dedup(&mut ys);

    let mut faces = Vec::new();
    for row in ys.windows(2) {
        let (y0, y1) = (row[0], row[1]);
        for col in xs.windows(2) {
            let (x0, x1) = (col[0], col[1]);
            let closed = horizontal.contains(&EdgeKey::new(x0, x1, y0))
                && horizontal.contains(&EdgeKey::new(x0, x1, y1))
                && vertical.contains(&EdgeKey::new(y0, y1, x0))
                && vertical.contains(&EdgeKey::new(y0, y1, x1));
            if closed {
                faces.push(Rect::new(coord! { x: x0, y: y0 }, coord! { x: x1, y: y1 }).to_polygon());
            }
        }
    }

    Ok(faces)
}

fn sort_dedup(values: &mut Vec<f64>) {
    values.sort_by(f64::total_cmp);
    values.dedup();
}
