//! Runtime configuration read from the environment (and `.env`, if present).

use std::{env, num::NonZeroUsize, path::PathBuf, str::FromStr};

use anyhow::{anyhow, Result};

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_DATABASE_PATH: &str = "meteostat.sqlite";
pub const DEFAULT_BATCH_SIZE: usize = 250;
pub const DEFAULT_LOG_INTERVAL: u64 = 100_000;
pub const DEFAULT_STATIONS_URL: &str = "https://bulk.meteostat.net/v2/stations/full.json.gz";
pub const DEFAULT_HOURLY_URL: &str = "https://bulk.meteostat.net/v2/hourly/{station}.csv.gz";

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub database_path: PathBuf,
    pub import: ImportConfig,
    pub stations_url: String,
}

/// Settings consumed by the hourly import pipeline.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    pub data_dir: PathBuf,
    pub batch_size: NonZeroUsize,
    pub log_interval: u64,
    /// URL template; `{station}` is replaced by the station identifier.
    pub hourly_url: String,
}

impl ImportConfig {
    pub fn hourly_url(&self, station: &str) -> String {
        self.hourly_url.replace("{station}", station)
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // A missing .env file is normal.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let data_dir = PathBuf::from(get("DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.into()));
        let database_path =
            PathBuf::from(get("DATABASE_PATH").unwrap_or_else(|| DEFAULT_DATABASE_PATH.into()));
        let batch_size = parse_or("IMPORT_BATCH_SIZE", get("IMPORT_BATCH_SIZE"), DEFAULT_BATCH_SIZE)?;
        let log_interval =
            parse_or("IMPORT_LOG_INTERVAL", get("IMPORT_LOG_INTERVAL"), DEFAULT_LOG_INTERVAL)?;
        if log_interval == 0 {
            return Err(anyhow!("IMPORT_LOG_INTERVAL must be greater than zero"));
        }

        Ok(Config {
            import: ImportConfig {
                data_dir: data_dir.clone(),
                batch_size: NonZeroUsize::new(batch_size)
                    .ok_or_else(|| anyhow!("IMPORT_BATCH_SIZE must be greater than zero"))?,
                log_interval,
                hourly_url: get("HOURLY_URL").unwrap_or_else(|| DEFAULT_HOURLY_URL.into()),
            },
            stations_url: get("STATIONS_URL").unwrap_or_else(|| DEFAULT_STATIONS_URL.into()),
            data_dir,
            database_path,
        })
    }
}

fn parse_or<T: FromStr>(key: &str, value: Option<String>, default: T) -> Result<T> {
    match value {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| anyhow!("{} must be a number, got `{}`", key, v)),
    }
}

// -- Tests -------------------------------------------------------------------
