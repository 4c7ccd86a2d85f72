//! Store seam used by the import pipeline.
//!
//! The pipeline only talks to these traits; `sqlite` is the production
//! backend and the tests plug in recording fakes.

pub mod batch;
pub mod sqlite;

use chrono::{DateTime, Utc};

use crate::{error::StoreError, reading::Measurements};

pub use batch::BatchWriter;
pub use sqlite::SqliteStore;

/// One hourly observation, ready to be written.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation<'a> {
    pub station: &'a str,
    pub measured_at: DateTime<Utc>,
    pub measurements: Measurements,
}

pub trait ObservationStore {
    type Batch<'a>: ObservationBatch
    where
        Self: 'a;

    /// Timezone name of a known station, `None` if the station is unknown.
    fn station_timezone(&self, station: &str) -> Result<Option<String>, StoreError>;

    /// Begins a transaction with a prepared insert statement.
    fn begin_batch(&self) -> Result<Self::Batch<'_>, StoreError>;
}

/// An open transaction plus its prepared insert statement.
///
/// Dropping a batch without committing discards its rows.
pub trait ObservationBatch {
    fn insert(&mut self, observation: &Observation<'_>) -> Result<(), StoreError>;

    /// Commits the transaction, then closes the statement.
    fn commit(self) -> Result<(), StoreError>;
}
