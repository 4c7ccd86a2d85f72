//! Command line interface.

pub mod command;

use std::time::Duration;

use clap::{Parser, Subcommand};
use indicatif::ProgressBar;

#[derive(Parser)]
#[command(name = "meteostat", version, about = "Meteostat import tool", long_about = None)]
/// Contains the commands
pub struct Cli {
    /// Hide download progress bars
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the database tables
    Setup {},
    /// Import stations or hourly data
    #[command(alias = "i")]
    Import {
        #[command(subcommand)]
        target: ImportTarget,
    },
}

#[derive(Subcommand)]
pub enum ImportTarget {
    /// Import station details
    Stations {},
    /// Import hourly data for one station
    Data {
        /// Station identifier, e.g. 10637
        station: String,
    },
}

/// Creates a spinner.
pub fn create_spinner(message: String) -> ProgressBar {
    let bar = ProgressBar::new_spinner().with_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));

    bar
}

// -- Tests -------------------------------------------------------------------
