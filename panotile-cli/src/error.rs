//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;

use panotile::config::ConfigFileError;
use panotile::coord::GridError;
use panotile::manifest::ManifestError;
use panotile::session::SessionError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Invalid grid dimensions
    Grid(GridError),
    /// Failed to load the manifest
    Manifest(ManifestError),
    /// Failed to read or parse a viewport trace
    Trace { path: String, reason: String },
    /// Failed to start the playback session
    Session(SessionError),
    /// Failed to build the async runtime
    Runtime(std::io::Error),
    /// Failed to encode the replay report
    Report(serde_json::Error),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Trace { .. } => {
                eprintln!();
                eprintln!("A trace is a JSON array of samples, for example:");
                eprintln!("  [{{\"latitude\": 90.0, \"longitude\": 0.0}}, ...]");
            }
            CliError::Manifest(ManifestError::TileCountMismatch { .. }) => {
                eprintln!();
                eprintln!("tileURLs must list one URL per tile, indexed row + col * rows.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Grid(e) => write!(f, "Invalid grid: {}", e),
            CliError::Manifest(e) => write!(f, "{}", e),
            CliError::Trace { path, reason } => {
                write!(f, "Failed to read trace '{}': {}", path, reason)
            }
            CliError::Session(e) => write!(f, "Failed to start session: {}", e),
            CliError::Runtime(e) => write!(f, "Failed to start async runtime: {}", e),
            CliError::Report(e) => write!(f, "Failed to write report: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Grid(e) => Some(e),
            CliError::Manifest(e) => Some(e),
            CliError::Session(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            CliError::Report(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<ManifestError> for CliError {
    fn from(e: ManifestError) -> Self {
        CliError::Manifest(e)
    }
}

impl From<SessionError> for CliError {
    fn from(e: SessionError) -> Self {
        CliError::Session(e)
    }
}

impl From<GridError> for CliError {
    fn from(e: GridError) -> Self {
        CliError::Grid(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::error::Error;

    #[test]
    fn test_report_error_is_not_a_config_error() {
        // JSON object keys must be strings
        let map: BTreeMap<(u8, u8), u8> = BTreeMap::from([((0, 1), 2)]);
        let err = CliError::Report(serde_json::to_string(&map).unwrap_err());

        let message = err.to_string();
        assert!(message.starts_with("Failed to write report: "));
        assert!(!message.contains("Configuration"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_config_error_message() {
        let err = CliError::Config("bad value".to_string());
        assert_eq!(err.to_string(), "Configuration error: bad value");
        assert!(err.source().is_none());
    }
}
