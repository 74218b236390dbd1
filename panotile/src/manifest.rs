//! Resource manifest for one playback session.
//!
//! JSON document naming the base stream and one stream per tile:
//!
//! ```json
//! {
//!   "baseStreamURL": "https://cdn.example/base.mpd",
//!   "tileURLs": ["https://cdn.example/t0.mpd", "..."],
//!   "rows": 4,
//!   "cols": 3
//! }
//! ```
//!
//! `tileURLs` is indexed by tile id (column-major, `row + col * rows`).

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::coord::{GridError, TileGrid};

/// Manifest loading and validation errors.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Failed to read manifest {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid manifest JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid manifest grid: {0}")]
    Grid(#[from] GridError),

    #[error("Manifest lists {actual} tile URLs but a {rows}x{cols} grid needs {expected}")]
    TileCountMismatch {
        rows: usize,
        cols: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Manifest {field} is empty")]
    EmptyUrl { field: String },
}

/// Validated resource manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(rename = "baseStreamURL", alias = "base_stream_url")]
    pub base_stream_url: String,
    #[serde(rename = "tileURLs", alias = "tile_urls")]
    pub tile_urls: Vec<String>,
    pub rows: usize,
    pub cols: usize,
}

impl Manifest {
    /// Build and validate a manifest.
    pub fn new(
        base_stream_url: impl Into<String>,
        tile_urls: Vec<String>,
        rows: usize,
        cols: usize,
    ) -> Result<Self, ManifestError> {
        let manifest = Self {
            base_stream_url: base_stream_url.into(),
            tile_urls,
            rows,
            cols,
        };
        manifest.validate()?;
        Ok(manifest)
    }

    /// Load and validate a manifest file.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let text = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Parse and validate manifest JSON.
    pub fn from_json_str(text: &str) -> Result<Self, ManifestError> {
        let manifest: Manifest = serde_json::from_str(text)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Check grid dimensions and URLs.
    pub fn validate(&self) -> Result<(), ManifestError> {
        let grid = self.grid()?;
        if self.tile_urls.len() != grid.len() {
            return Err(ManifestError::TileCountMismatch {
                rows: self.rows,
                cols: self.cols,
                expected: grid.len(),
                actual: self.tile_urls.len(),
            });
        }
        if self.base_stream_url.trim().is_empty() {
            return Err(ManifestError::EmptyUrl {
                field: "baseStreamURL".to_string(),
            });
        }
        if let Some(index) = self.tile_urls.iter().position(|u| u.trim().is_empty()) {
            return Err(ManifestError::EmptyUrl {
                field: format!("tileURLs[{index}]"),
            });
        }
        Ok(())
    }

    /// Tile grid described by this manifest.
    pub fn grid(&self) -> Result<TileGrid, GridError> {
        TileGrid::new(self.rows, self.cols)
    }
}
