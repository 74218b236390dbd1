//! Panotile CLI - Command-line interface
//!
//! This binary drives the panotile engine: grid inspection, configuration
//! management and offline replays of recorded head-movement traces.

mod commands;
mod error;
mod runner;

use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::replay::ReplayArgs;

#[derive(Parser)]
#[command(name = "panotile")]
#[command(version = panotile::VERSION)]
#[command(about = "Viewport-adaptive tile scheduling for panoramic video", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the tile layout of a grid
    Grid {
        /// Number of tile rows
        #[arg(long)]
        rows: usize,

        /// Number of tile columns
        #[arg(long)]
        cols: usize,
    },

    /// Manage the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Replay a recorded viewport trace against simulated media
    Replay(ReplayArgs),
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Grid { rows, cols } => commands::grid::run(rows, cols),
        Commands::Config(command) => commands::config::run(command),
        Commands::Replay(args) => commands::replay::run(args),
    };

    if let Err(e) = result {
        e.exit();
    }
}
