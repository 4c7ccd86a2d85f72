pub mod data;
pub mod setup;
pub mod stations;

use std::fs;

use anyhow::{Context, Result};

pub use data::data;
pub use setup::setup;
pub use stations::stations;

use crate::{config::Config, db::SqliteStore};

/// Opens the database, creating the data directory on the way.
fn open_store(config: &Config) -> Result<SqliteStore> {
    fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("Failed to create {}", config.data_dir.display()))?;
    let store = SqliteStore::open(&config.database_path)
        .with_context(|| format!("Failed to open {}", config.database_path.display()))?;

    Ok(store)
}

/// Closes the store after a command, reporting the command's error first.
fn close_after<T>(store: SqliteStore, result: Result<T>) -> Result<T> {
    let closed = store.close();
    let value = result?;
    closed.context("Failed to close database")?;

    Ok(value)
}
