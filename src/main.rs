mod cli;
mod config;
mod db;
mod download;
mod error;
mod import;
mod reading;

use std::process;

use anyhow::{Error, Result};
use clap::Parser;
use cli::{command, Cli, Commands, ImportTarget};
use config::Config;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Error> {
    let config = Config::from_env()?;

    match &cli.command {
        Commands::Setup {} => {
            let path = command::setup(&config)?;
            println!("Tables created in `{}`", path);
        }
        Commands::Import {
            target: ImportTarget::Stations {},
        } => {
            let count = command::stations(&config, cli.quiet).await?;
            println!("Imported {} stations", count);
        }
        Commands::Import {
            target: ImportTarget::Data { station },
        } => {
            let summary = command::data(&config, station, cli.quiet).await?;
            println!(
                "Imported {} records for station {} in {} batches",
                summary.rows,
                station.trim(),
                summary.batches
            );
        }
    }

    Ok(())
}
