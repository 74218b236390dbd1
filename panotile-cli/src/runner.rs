//! CLI runner for common setup.
//!
//! Encapsulates config loading and logging initialization so command
//! handlers that drive the engine start the same way.

use tracing::info;

use crate::error::CliError;
use panotile::config::ConfigFile;
use panotile::logging::{init_logging, LoggingGuard};

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    #[allow(dead_code)]
    logging_guard: LoggingGuard,
    /// Loaded configuration file
    config: ConfigFile,
}

impl CliRunner {
    /// Load config and initialize logging.
    ///
    /// Logs always go to the configured log file; `verbose` mirrors them to
    /// stdout.
    pub fn new(verbose: bool) -> Result<Self, CliError> {
        let config = ConfigFile::load()?;

        let logging_guard = init_logging(&config.logging.file, verbose)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            logging_guard,
            config,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("Panotile v{}", panotile::VERSION);
        info!("Panotile CLI: {} command", command);
    }
}
