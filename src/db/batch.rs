//! Windowed transactional writer for observations.
//!
//! Rows go straight into the open transaction's prepared statement. Once the
//! window is full the transaction is committed and a fresh one begun, so a
//! failure only ever loses the window in flight.

use std::{mem, num::NonZeroUsize};

use tracing::debug;

use super::{Observation, ObservationBatch, ObservationStore};
use crate::error::StoreError;

enum WriterState<B> {
    Open { batch: B, size: usize },
    Sealed { batch: B, size: usize },
    Closed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub rows: u64,
    pub batches: u64,
}

pub struct BatchWriter<'s, S: ObservationStore + 's> {
    store: &'s S,
    threshold: NonZeroUsize,
    state: WriterState<S::Batch<'s>>,
    committed: BatchSummary,
}

impl<'s, S: ObservationStore + 's> BatchWriter<'s, S> {
    pub fn new(store: &'s S, threshold: NonZeroUsize) -> Result<Self, StoreError> {
        let batch = store.begin_batch()?;

        Ok(BatchWriter {
            store,
            threshold,
            state: WriterState::Open { batch, size: 0 },
            committed: BatchSummary::default(),
        })
    }

    pub fn append(&mut self, observation: &Observation<'_>) -> Result<(), StoreError> {
        let inserted = match &mut self.state {
            WriterState::Open { batch, size } => batch.insert(observation).map(|()| {
                *size += 1;
                *size
            }),
            _ => return Err(StoreError::WriterClosed),
        };

        let size = match inserted {
            Ok(size) => size,
            Err(e) => {
                self.state = WriterState::Closed;
                return Err(e);
            }
        };

        if size >= self.threshold.get() {
            self.seal();
            self.commit_sealed()?;
            let batch = self.store.begin_batch()?;
            self.state = WriterState::Open { batch, size: 0 };
        }

        Ok(())
    }

    /// Commits the final partial window and closes the writer.
    ///
    /// An empty final window is discarded instead of committed.
    pub fn finish(mut self) -> Result<BatchSummary, StoreError> {
        self.seal();
        match mem::replace(&mut self.state, WriterState::Closed) {
            WriterState::Sealed { size: 0, .. } => {}
            sealed @ WriterState::Sealed { .. } => {
                self.state = sealed;
                self.commit_sealed()?;
            }
            _ => return Err(StoreError::WriterClosed),
        }

        Ok(self.committed)
    }

    /// Rows appended to the window that is currently open.
    pub fn pending(&self) -> usize {
        match &self.state {
            WriterState::Open { size, .. } | WriterState::Sealed { size, .. } => *size,
            WriterState::Closed => 0,
        }
    }

    /// Rows and batches committed so far.
    pub fn committed(&self) -> BatchSummary {
        self.committed
    }

    fn seal(&mut self) {
        self.state = match mem::replace(&mut self.state, WriterState::Closed) {
            WriterState::Open { batch, size } => WriterState::Sealed { batch, size },
            other => other,
        };
    }

    // Leaves the writer Closed; the caller reopens it on success.
    fn commit_sealed(&mut self) -> Result<(), StoreError> {
        let WriterState::Sealed { batch, size } = mem::replace(&mut self.state, WriterState::Closed)
        else {
            return Err(StoreError::WriterClosed);
        };

        batch.commit()?;
        self.committed.rows += size as u64;
        self.committed.batches += 1;
        debug!(rows = size, batch = self.committed.batches, "Committed batch");

        Ok(())
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use std::cell::{Cell, RefCell};

    use chrono::{DateTime, Duration, TimeZone, Utc};
    use rusqlite::ffi;

    use super::*;
    use crate::{
        db::sqlite::test::{count, store_with_station},
        reading::Measurements,
    };

    /// Keeps committed windows in memory and can refuse the nth commit.
    #[derive(Default)]
    struct RecordingStore {
        committed: RefCell<Vec<Vec<DateTime<Utc>>>>,
        commit_attempts: Cell<usize>,
        fail_commit: Option<usize>,
    }

    struct RecordingBatch<'a> {
        store: &'a RecordingStore,
        rows: Vec<DateTime<Utc>>,
    }

    impl ObservationStore for RecordingStore {
        type Batch<'a> = RecordingBatch<'a>;

        fn station_timezone(&self, _station: &str) -> Result<Option<String>, StoreError> {
            Ok(Some("UTC".to_string()))
        }

        fn begin_batch(&self) -> Result<RecordingBatch<'_>, StoreError> {
            Ok(RecordingBatch {
                store: self,
                rows: Vec::new(),
            })
        }
    }

    impl ObservationBatch for RecordingBatch<'_> {
        fn insert(&mut self, observation: &Observation<'_>) -> Result<(), StoreError> {
            self.rows.push(observation.measured_at);
            Ok(())
        }

        fn commit(self) -> Result<(), StoreError> {
            let attempt = self.store.commit_attempts.get() + 1;
            self.store.commit_attempts.set(attempt);
            if self.store.fail_commit == Some(attempt) {
                return Err(StoreError::Sqlite(rusqlite::Error::SqliteFailure(
                    ffi::Error::new(ffi::SQLITE_BUSY),
                    Some("database is locked".to_string()),
                )));
            }
            self.store.committed.borrow_mut().push(self.rows);
            Ok(())
        }
    }

    fn observation(i: i64) -> Observation<'static> {
        Observation {
            station: "10637",
            measured_at: Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap() + Duration::hours(i),
            measurements: Measurements::default(),
        }
    }

    fn write(store: &RecordingStore, rows: i64, threshold: usize) -> Result<BatchSummary, StoreError> {
        let mut writer = BatchWriter::new(store, NonZeroUsize::new(threshold).unwrap())?;
        for i in 0..rows {
            writer.append(&observation(i))?;
        }
        writer.finish()
    }

    fn window_sizes(store: &RecordingStore) -> Vec<usize> {
        store.committed.borrow().iter().map(Vec::len).collect()
    }

    #[test]
    fn should_commit_ceil_n_over_b_windows() {
        let store = RecordingStore::default();
        let summary = write(&store, 10, 4).unwrap();

        assert_eq!(window_sizes(&store), vec![4, 4, 2]);
        assert_eq!(summary, BatchSummary { rows: 10, batches: 3 });
    }

    #[test]
    fn should_not_commit_empty_final_window() {
        let store = RecordingStore::default();
        let summary = write(&store, 8, 4).unwrap();

        assert_eq!(window_sizes(&store), vec![4, 4]);
        assert_eq!(store.commit_attempts.get(), 2);
        assert_eq!(summary.rows, 8);
    }

    #[test]
    fn should_commit_nothing_for_empty_stream() {
        let store = RecordingStore::default();
        let summary = write(&store, 0, 4).unwrap();

        assert!(window_sizes(&store).is_empty());
        assert_eq!(summary, BatchSummary::default());
    }

    #[test]
    fn should_keep_row_order_across_windows() {
        let store = RecordingStore::default();
        write(&store, 5, 2).unwrap();

        let flat: Vec<_> = store.committed.borrow().iter().flatten().copied().collect();
        let expected: Vec<_> = (0..5).map(|i| observation(i).measured_at).collect();
        assert_eq!(flat, expected);
    }

    #[test]
    fn should_keep_earlier_windows_when_commit_fails() {
        let store = RecordingStore {
            fail_commit: Some(3),
            ..RecordingStore::default()
        };
        let err = write(&store, 20, 3).unwrap_err();

        assert!(matches!(err, StoreError::Sqlite(_)));
        assert_eq!(window_sizes(&store), vec![3, 3]);
    }

    #[test]
    fn should_track_pending_window() {
        let store = RecordingStore::default();
        let mut writer = BatchWriter::new(&store, NonZeroUsize::new(3).unwrap()).unwrap();

        assert_eq!(writer.pending(), 0);
        writer.append(&observation(0)).unwrap();
        writer.append(&observation(1)).unwrap();
        assert_eq!(writer.pending(), 2);
        writer.append(&observation(2)).unwrap();
        assert_eq!(writer.pending(), 0);
        assert_eq!(writer.committed(), BatchSummary { rows: 3, batches: 1 });
    }

    #[test]
    fn should_refuse_appends_after_failure() {
        let store = RecordingStore {
            fail_commit: Some(1),
            ..RecordingStore::default()
        };
        let mut writer = BatchWriter::new(&store, NonZeroUsize::new(1).unwrap()).unwrap();

        assert!(writer.append(&observation(0)).is_err());
        assert!(matches!(
            writer.append(&observation(1)),
            Err(StoreError::WriterClosed)
        ));
        assert_eq!(writer.committed(), BatchSummary::default());
        assert_eq!(writer.pending(), 0);
    }

    #[test]
    fn should_roll_back_window_when_insert_fails() {
        let store = store_with_station("10637", "UTC");
        store
            .connection()
            .execute_batch(
                "CREATE TRIGGER reject_sentinel BEFORE INSERT ON station_data
                 WHEN NEW.temp = -999 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )
            .unwrap();

        let mut writer = BatchWriter::new(&store, NonZeroUsize::new(2).unwrap()).unwrap();
        let mut result = Ok(());
        for i in 0..5 {
            let mut o = observation(i);
            if i == 3 {
                o.measurements.temp = Some(-999.0);
            }
            result = writer.append(&o);
            if result.is_err() {
                break;
            }
        }
        assert!(result.is_err());
        drop(writer);

        assert_eq!(count(&store), 2);
    }
}
