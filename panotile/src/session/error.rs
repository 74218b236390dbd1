//! Session construction errors.

use thiserror::Error;

use crate::coord::GridError;
use crate::manifest::ManifestError;

/// Errors that prevent a playback session from starting.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("Invalid tile grid: {0}")]
    Grid(#[from] GridError),
}
