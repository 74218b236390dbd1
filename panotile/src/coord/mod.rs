//! Coordinate conversion module
//!
//! Provides the static tile grid geometry and the conversion from viewer
//! orientation (latitude/longitude) into the normalized equirectangular space
//! shared by tile centers and viewport points.

mod types;

pub use types::{CellRect, GridError, NormalizedPoint, TileId};

/// Converts an orientation sample to a normalized viewport point.
///
/// `x = (180 - latitude) / 180`, `y = (longitude + 180) / 360`. Out-of-range
/// input is clamped into `[0, 1]` rather than rejected.
///
/// # Arguments
///
/// * `latitude` - Latitude in degrees (-90.0 to 90.0)
/// * `longitude` - Longitude in degrees (-180.0 to 180.0)
#[inline]
pub fn to_viewport_point(latitude: f64, longitude: f64) -> NormalizedPoint {
    NormalizedPoint::new((180.0 - latitude) / 180.0, (longitude + 180.0) / 360.0)
}

/// Center of cell `(row, col)` in a `rows` x `cols` grid.
///
/// With unit width `w = 0.5 / cols` and unit height `h = 0.5 / rows`, the
/// center is `x = 2w·col + w`, `y = 2h·row + h`.
#[inline]
pub fn center_of(rows: usize, cols: usize, row: usize, col: usize) -> NormalizedPoint {
    let w = 0.5 / cols as f64;
    let h = 0.5 / rows as f64;
    NormalizedPoint {
        x: 2.0 * w * col as f64 + w,
        y: 2.0 * h * row as f64 + h,
    }
}

/// Immutable tile grid for one playback session.
///
/// Holds the precomputed center of every tile in id order.
#[derive(Debug, Clone, PartialEq)]
pub struct TileGrid {
    rows: usize,
    cols: usize,
    centers: Vec<NormalizedPoint>,
}

impl TileGrid {
    /// Create a grid with the given dimensions.
    pub fn new(rows: usize, cols: usize) -> Result<Self, GridError> {
        if rows == 0 || cols == 0 {
            return Err(GridError::EmptyGrid { rows, cols });
        }

        let centers = (0..rows * cols)
            .map(|id| center_of(rows, cols, id % rows, id / rows))
            .collect();

        Ok(Self {
            rows,
            cols,
            centers,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of tiles (`rows * cols`).
    pub fn len(&self) -> usize {
        self.centers.len()
    }

    /// Always false for a constructed grid; provided for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }

    /// Id of the tile at `(row, col)`, if inside the grid.
    pub fn tile_id(&self, row: usize, col: usize) -> Option<TileId> {
        (row < self.rows && col < self.cols).then_some(TileId(row + col * self.rows))
    }

    /// `(row, col)` of a tile id, if inside the grid.
    pub fn position(&self, id: TileId) -> Option<(usize, usize)> {
        (id.0 < self.len()).then_some((id.0 % self.rows, id.0 / self.rows))
    }

    /// Center of a tile.
    pub fn center(&self, id: TileId) -> Option<NormalizedPoint> {
        self.centers.get(id.0).copied()
    }

    /// Normalized rectangle covered by a tile, in the axes of its center.
    pub fn cell_rect(&self, id: TileId) -> Option<CellRect> {
        let (row, col) = self.position(id)?;
        let width = 1.0 / self.cols as f64;
        let height = 1.0 / self.rows as f64;
        Some(CellRect {
            x: col as f64 * width,
            y: row as f64 * height,
            width,
            height,
        })
    }

    /// Rectangle a tile occupies on the equirectangular texture.
    ///
    /// Longitude runs horizontally, so rows span the texture width and
    /// columns its height. This is [`cell_rect`](Self::cell_rect) transposed.
    pub fn texture_rect(&self, id: TileId) -> Option<CellRect> {
        let (row, col) = self.position(id)?;
        let width = 1.0 / self.rows as f64;
        let height = 1.0 / self.cols as f64;
        Some(CellRect {
            x: row as f64 * width,
            y: col as f64 * height,
            width,
            height,
        })
    }

    /// Iterate tiles in id order with their centers.
    pub fn iter(&self) -> impl Iterator<Item = (TileId, NormalizedPoint)> + '_ {
        self.centers
            .iter()
            .enumerate()
            .map(|(id, center)| (TileId(id), *center))
    }
}
