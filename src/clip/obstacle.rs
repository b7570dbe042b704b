use geo::{Area, BooleanOps, BoundingRect, Buffer};
use geo_types::{coord, MultiLineString, Polygon, Rect};
use tracing::{debug, info};

use super::containment::MIN_PIECE_FRACTION;
use crate::error::{GridError, Result};
use crate::models::{Cell, ClipResult, Feature, FeatureId, Shape};

/// Half-width of the band cut out along an obstacle line.
pub const DEFAULT_OBSTACLE_EPSILON: f64 = 1e-6;

/// Floor on the band half-width, relative to the diagonal of the region
/// being cut. The buffer snaps its output to a grid scaled to its input,
/// and bands much thinner than this collapse to nothing.
const MIN_BAND_FRACTION: f64 = 1e-7;

/// Splits cells along roads, rivers and other linear obstacles.
#[derive(Debug, Clone, Copy)]
pub struct ObstacleTrimmer {
    epsilon: f64,
}

impl Default for ObstacleTrimmer {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_OBSTACLE_EPSILON,
        }
    }
}

/// An obstacle ready for cutting.
struct Band<'a> {
    id: FeatureId,
    shape: &'a Shape,
    lines: MultiLineString<f64>,
}

/// A piece of a cell mid-split; `cut_by` is the obstacle whose split
/// produced it.
struct Piece {
    geometry: Polygon<f64>,
    cut_by: Option<FeatureId>,
}

impl ObstacleTrimmer {
    pub fn new(epsilon: f64) -> Result<Self> {
        if !epsilon.is_finite() || epsilon <= 0.0 {
            return Err(GridError::InvalidParameter(format!(
                "obstacle buffer must be positive, got {}",
                epsilon
            )));
        }
        Ok(Self { epsilon })
    }

    /// Cut every cell along the given obstacles and return only the pieces
    /// of cells that actually fell apart.
    ///
    /// An obstacle that crosses a cell without disconnecting it leaves the
    /// cell untouched; so does one that never meets it. Callers fold the
    /// pieces back into the full set with [`super::merge_trimmed`]. Pieces
    /// of one cell are pairwise disjoint: each obstacle cuts the pieces the
    /// previous ones left behind.
    ///
    /// Each obstacle is windowed to the piece it cuts before buffering, so
    /// the band keeps its width at projected-metre coordinates. Fails with
    /// `InvalidParameter` if a band still vanishes.
    pub fn trim(&self, cells: &[Cell], obstacles: &[Feature]) -> Result<Vec<ClipResult>> {
        let bands = obstacles
            .iter()
            .map(band)
            .collect::<Result<Vec<Band<'_>>>>()?;

        let mut results = Vec::new();
        let mut split_cells = 0;
        for cell in cells {
            let pieces = self.split_cell(cell, &bands)?;
            if pieces.len() < 2 {
                continue;
            }
            split_cells += 1;
            results.extend(pieces.into_iter().filter_map(|piece| {
                piece.cut_by.map(|boundary_id| ClipResult {
                    cell_id: cell.id,
                    geometry: piece.geometry,
                    boundary_id,
                })
            }));
        }

        info!(
            "Obstacle trim split {} of {} cells into {} pieces",
            split_cells,
            cells.len(),
            results.len()
        );
        Ok(results)
    }

    fn split_cell(&self, cell: &Cell, bands: &[Band<'_>]) -> Result<Vec<Piece>> {
        let min_area = cell.area() * MIN_PIECE_FRACTION;
        let mut pieces = vec![Piece {
            geometry: cell.geometry.clone(),
            cut_by: None,
        }];

        for band in bands {
            let mut next = Vec::with_capacity(pieces.len());
            for piece in pieces {
                match self.cut(&piece.geometry, band, min_area)? {
                    Some(rest) => {
                        debug!(
                            "Obstacle {} splits cell {} into {} pieces",
                            band.id,
                            cell.id,
                            rest.len()
                        );
                        next.extend(rest.into_iter().map(|geometry| Piece {
                            geometry,
                            cut_by: Some(band.id),
                        }));
                    }
                    None => next.push(piece),
                }
            }
            pieces = next;
        }
        Ok(pieces)
    }

    /// What is left of `polygon` once the band is removed, or `None` when the
    /// band does not disconnect it.
    fn cut(
        &self,
        polygon: &Polygon<f64>,
        band: &Band<'_>,
        min_area: f64,
    ) -> Result<Option<Vec<Polygon<f64>>>> {
        if !band.shape.intersects_polygon(polygon) {
            return Ok(None);
        }
        let Some(frame) = polygon.bounding_rect() else {
            return Ok(None);
        };

        let width = self
            .epsilon
            .max(frame.width().hypot(frame.height()) * MIN_BAND_FRACTION);
        let margin = 2.0 * width;
        let window = Rect::new(
            coord! { x: frame.min().x - margin, y: frame.min().y - margin },
            coord! { x: frame.max().x + margin, y: frame.max().y + margin },
        )
        .to_polygon();

        let local = window.clip(&band.lines, false);
        let length = line_length(&local);
        if length == 0.0 {
            return Ok(None);
        }
        let area = local.buffer(width);
        if area.0.is_empty() {
            if length <= width {
                return Ok(None);
            }
            return Err(GridError::InvalidParameter(format!(
                "band of half-width {} around obstacle {} vanished; raise the obstacle epsilon",
                width, band.id
            )));
        }

        let rest: Vec<Polygon<f64>> = polygon
            .difference(&area)
            .into_iter()
            .filter(|p| p.unsigned_area() > min_area)
            .collect();
        Ok((rest.len() >= 2).then_some(rest))
    }
}

fn band(obstacle: &Feature) -> Result<Band<'_>> {
    let lines = obstacle.geometry.as_lines().ok_or_else(|| {
        GridError::InvalidGeometry(format!(
            "obstacle {} is a {} and cannot split cells",
            obstacle.id,
            obstacle.geometry.kind()
        ))
    })?;
    if !obstacle.geometry.is_valid() {
        return Err(GridError::InvalidGeometry(format!(
            "obstacle {} is degenerate or self-intersecting",
            obstacle.id
        )));
    }
    Ok(Band {
        id: obstacle.id,
        shape: &obstacle.geometry,
        lines,
    })
}

fn line_length(lines: &MultiLineString<f64>) -> f64 {
    lines
        .iter()
        .flat_map(|ls| ls.lines())
        .map(|l| l.dx().hypot(l.dy()))
        .sum()
}
