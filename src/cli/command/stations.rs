//! Downloads the station metadata archive and loads it into the stations table.

use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use tracing::info;

use super::{close_after, open_store};
use crate::{
    cli::create_spinner,
    config::Config,
    db::SqliteStore,
    download::{cache_path, ensure_cached, HttpFetcher},
};

pub async fn stations(config: &Config, quiet: bool) -> Result<u64> {
    let mut store = open_store(config)?;

    let archive = cache_path(&config.data_dir, &config.stations_url);
    let fetcher = HttpFetcher::new(!quiet);
    let result = match ensure_cached(&fetcher, &config.stations_url, &archive).await {
        Ok(_) => load(&mut store, &archive, quiet),
        Err(e) => Err(e.into()),
    };

    close_after(store, result)
}

fn load(store: &mut SqliteStore, archive: &Path, quiet: bool) -> Result<u64> {
    let file =
        File::open(archive).with_context(|| format!("Failed to open {}", archive.display()))?;

    let bar = (!quiet).then(|| create_spinner("Importing stations...".to_string()));
    let count = store.import_stations(BufReader::new(file))?;
    if let Some(bar) = bar {
        bar.finish_with_message(format!("{} stations imported", count));
    }
    info!(count, "Stations imported");

    Ok(count)
}
