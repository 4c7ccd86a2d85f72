//! Creates the database tables.

use anyhow::Result;
use tracing::info;

use super::{close_after, open_store};
use crate::config::Config;

pub fn setup(config: &Config) -> Result<String> {
    let store = open_store(config)?;
    let result = store.setup().map_err(Into::into);
    close_after(store, result)?;
    info!(path = %config.database_path.display(), "Tables ready");

    Ok(config.database_path.to_string_lossy().to_string())
}
