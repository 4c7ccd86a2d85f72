//! Imports the hourly archive of a single station.

use anyhow::Result;

use super::{close_after, open_store};
use crate::{
    config::Config,
    download::HttpFetcher,
    import::{ImportSummary, Importer},
};

pub async fn data(config: &Config, station: &str, quiet: bool) -> Result<ImportSummary> {
    let store = open_store(config)?;
    let fetcher = HttpFetcher::new(!quiet);

    let result = Importer::new(&store, &fetcher, &config.import)
        .import_station(station)
        .await
        .map_err(Into::into);

    close_after(store, result)
}
