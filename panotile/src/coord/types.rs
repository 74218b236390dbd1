//! Coordinate type definitions

use std::fmt;

use thiserror::Error;

/// Stable tile identifier.
///
/// Tiles are numbered column-major: `id = row + col * rows`. Metrics, state
/// tables and the manifest's tile URL list are all indexed by this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TileId(pub usize);

impl TileId {
    /// Position of this tile in id-indexed arrays.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tile {}", self.0)
    }
}

/// A point on the equirectangular projection, both axes in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NormalizedPoint {
    pub x: f64,
    pub y: f64,
}

impl NormalizedPoint {
    /// Create a point, clamping both axes into `[0, 1]`.
    ///
    /// NaN components collapse to 0 so noisy sensor input never propagates.
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: clamp_unit(x),
            y: clamp_unit(y),
        }
    }

    /// Squared Euclidean distance to another point.
    #[inline]
    pub fn distance_squared(&self, other: &NormalizedPoint) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

impl fmt::Display for NormalizedPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3})", self.x, self.y)
    }
}

/// Rectangle of one grid cell in normalized space.
///
/// `x`/`width` follow the column axis and `y`/`height` the row axis, matching
/// the orientation of tile centers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CellRect {
    /// Whether a point lies strictly inside the rectangle.
    pub fn contains_strictly(&self, point: &NormalizedPoint) -> bool {
        point.x > self.x
            && point.x < self.x + self.width
            && point.y > self.y
            && point.y < self.y + self.height
    }
}

/// Grid construction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("grid must have at least one row and one column (got {rows}x{cols})")]
    EmptyGrid { rows: usize, cols: usize },
}

#[inline]
pub(crate) fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
