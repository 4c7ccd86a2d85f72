//! Per-station hourly import: cache the archive, then decode, parse and write
//! it through a [`BatchWriter`] in one sequential pass.

use std::{fs::File, io::BufReader};

use tracing::info;

use crate::{
    config::ImportConfig,
    db::{BatchWriter, Observation, ObservationStore},
    download::{cache_path, ensure_cached, Fetch},
    error::{ImportError, Result},
    reading::{
        timestamp::{parse_timezone, reconstruct},
        HourlyReader, Measurements,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub downloaded: bool,
    pub rows: u64,
    pub batches: u64,
}

/// Operator-facing row counter. Has no effect on what gets written.
pub struct ImportProgress {
    count: u64,
    interval: u64,
}

impl ImportProgress {
    pub fn new(interval: u64) -> Self {
        ImportProgress {
            count: 0,
            interval: interval.max(1),
        }
    }

    pub fn record(&mut self, station: &str) {
        self.count += 1;
        if self.count % self.interval == 0 {
            info!(station, records = self.count, "Inserted {} records...", self.count);
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

pub struct Importer<'a, S, F> {
    store: &'a S,
    fetcher: &'a F,
    config: &'a ImportConfig,
}

impl<'a, S: ObservationStore, F: Fetch> Importer<'a, S, F> {
    pub fn new(store: &'a S, fetcher: &'a F, config: &'a ImportConfig) -> Self {
        Importer {
            store,
            fetcher,
            config,
        }
    }

    pub async fn import_station(&self, station: &str) -> Result<ImportSummary> {
        let station = station.trim();
        info!(station, "Importing data for station {}...", station);

        let url = self.config.hourly_url(station);
        let path = cache_path(&self.config.data_dir, &url);
        let downloaded = ensure_cached(self.fetcher, &url, &path).await?;

        let timezone = self
            .store
            .station_timezone(station)?
            .ok_or_else(|| ImportError::StationNotFound {
                station_id: station.to_string(),
            })?;
        let tz = parse_timezone(&timezone)?;

        let file = File::open(&path).map_err(|source| ImportError::Io {
            path: path.clone(),
            source,
        })?;
        let rows = HourlyReader::new(BufReader::new(file));
        let mut writer = BatchWriter::new(self.store, self.config.batch_size)?;
        let mut progress = ImportProgress::new(self.config.log_interval);

        for row in rows {
            let row = row?;
            let observation = Observation {
                station,
                measured_at: reconstruct(row.date(), row.hour(), tz)?,
                measurements: Measurements::from_row(&row),
            };
            writer.append(&observation)?;
            progress.record(station);
        }

        let committed = writer.finish()?;
        info!(
            station,
            rows = committed.rows,
            batches = committed.batches,
            "Import complete"
        );

        Ok(ImportSummary {
            downloaded,
            rows: committed.rows,
            batches: committed.batches,
        })
    }
}

// -- Tests -------------------------------------------------------------------
