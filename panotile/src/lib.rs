//! Panotile - Viewport-adaptive tiled panoramic video
//!
//! A 360° video is split into a grid of independently streamed tiles layered
//! over a low-quality base stream. Panotile decides which tiles to fetch and
//! play as the viewer turns their head, keeps every playing tile on the base
//! stream's timeline, and reports per-tile streaming metrics.
//!
//! # High-Level API
//!
//! For most use cases, the [`session`] module provides the entry point:
//!
//! ```ignore
//! use panotile::manifest::Manifest;
//! use panotile::session::{Collaborators, PlaybackSession, SessionConfig};
//!
//! let manifest = Manifest::load(path)?;
//! let session = PlaybackSession::start(manifest, SessionConfig::default(), collaborators, &handle)?;
//!
//! session.push_viewport(latitude, longitude);
//! let statuses = session.tile_statuses();
//! session.shutdown().await;
//! ```
//!
//! Media playback itself is delegated to a [`media::MediaBackend`]; the
//! crate ships a simulated backend for replays and tests.

pub mod config;
pub mod coord;
pub mod error;
pub mod logging;
pub mod manifest;
pub mod media;
pub mod metrics;
pub mod pipeline;
pub mod scheduler;
pub mod session;
pub mod sync;
pub mod viewport;

/// Version of the Panotile library and CLI.
///
/// This is synchronized across all components in the workspace.
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
