//! Configuration management CLI commands.
//!
//! Provides `config path`, `config show` and `config init`.

use clap::Subcommand;
use panotile::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the configuration file path
    Path,

    /// Print the effective configuration (file values over defaults)
    Show,

    /// Write the default configuration file if none exists
    Init,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Path => run_path(),
        ConfigCommands::Show => run_show(),
        ConfigCommands::Init => run_init(),
    }
}

/// Show the configuration file path.
fn run_path() -> Result<(), CliError> {
    println!("{}", config_file_path().display());
    Ok(())
}

fn run_show() -> Result<(), CliError> {
    let path = config_file_path();
    let config = ConfigFile::load()?;

    if path.exists() {
        println!("; Loaded from {}", path.display());
    } else {
        println!("; No configuration file at {}, showing defaults", path.display());
    }
    print!("{}", config.to_ini_string());

    Ok(())
}

fn run_init() -> Result<(), CliError> {
    let existed = config_file_path().exists();
    let path = ConfigFile::ensure_exists()?;

    if existed {
        println!("Configuration already exists: {}", path.display());
    } else {
        println!("Created default configuration: {}", path.display());
    }

    Ok(())
}
