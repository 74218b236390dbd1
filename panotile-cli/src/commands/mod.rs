//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`config`] - Configuration management (path, show, init)
//! - [`grid`] - Tile layout of a grid
//! - [`replay`] - Replay a viewport trace against simulated media

pub mod config;
pub mod grid;
pub mod replay;
