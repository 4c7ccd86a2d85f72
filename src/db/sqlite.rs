use std::{io::Read, path::Path};

use rusqlite::{params, Connection, OptionalExtension, Statement, Transaction};
use tracing::debug;

use super::{Observation, ObservationBatch, ObservationStore};
use crate::{
    error::{ImportError, StoreError},
    reading::for_each_station,
};

const CREATE_STATIONS: &str = "
    CREATE TABLE IF NOT EXISTS stations (
        id           TEXT PRIMARY KEY,
        display_name TEXT NOT NULL,
        country      TEXT NOT NULL,
        latitude     REAL NOT NULL,
        longitude    REAL NOT NULL,
        timezone     TEXT NOT NULL
    );";

const CREATE_STATION_DATA: &str = "
    CREATE TABLE IF NOT EXISTS station_data (
        station     TEXT NOT NULL,
        measured_at TEXT NOT NULL,
        temp        REAL,
        dwpt        REAL,
        rhum        INTEGER,
        prcp        REAL,
        snow        INTEGER,
        wdir        INTEGER,
        wspd        REAL,
        wpgt        REAL,
        pres        REAL,
        tsun        INTEGER,
        coco        INTEGER
    );
    CREATE INDEX IF NOT EXISTS station_data_station_time
        ON station_data (station, measured_at);";

const INSERT_STATION: &str = "
    INSERT OR REPLACE INTO stations (id, display_name, country, latitude, longitude, timezone)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)";

const INSERT_STATION_DATA: &str = "
    INSERT INTO station_data
        (station, measured_at, temp, dwpt, rhum, prcp, snow, wdir, wspd, wpgt, pres, tsun, coco)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)";

/// SQLite-backed station and observation store.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        debug!(path = %path.display(), "Opened database");

        Ok(SqliteStore { conn })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(SqliteStore {
            conn: Connection::open_in_memory()?,
        })
    }

    /// Creates both tables if they are missing.
    pub fn setup(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(CREATE_STATIONS)?;
        self.conn.execute_batch(CREATE_STATION_DATA)?;
        Ok(())
    }

    /// Streams a compressed station archive into the stations table.
    ///
    /// Existing stations are replaced, so rerunning is harmless.
    pub fn import_stations<R: Read>(&mut self, compressed: R) -> Result<u64, ImportError> {
        let tx = self.conn.transaction().map_err(StoreError::from)?;
        let count = {
            let mut stmt = tx.prepare(INSERT_STATION).map_err(StoreError::from)?;
            for_each_station(compressed, |s| {
                stmt.execute(params![
                    s.id,
                    s.display_name,
                    s.country,
                    s.latitude,
                    s.longitude,
                    s.timezone
                ])
                .map_err(StoreError::from)?;
                Ok(())
            })?
        };
        tx.commit().map_err(StoreError::from)?;

        Ok(count)
    }

    pub fn close(self) -> Result<(), StoreError> {
        self.conn.close().map_err(|(_, e)| StoreError::from(e))
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl ObservationStore for SqliteStore {
    type Batch<'a> = SqliteBatch<'a>;

    fn station_timezone(&self, station: &str) -> Result<Option<String>, StoreError> {
        let timezone = self
            .conn
            .query_row(
                "SELECT timezone FROM stations WHERE id = ?1",
                [station],
                |row| row.get(0),
            )
            .optional()?;

        Ok(timezone)
    }

    fn begin_batch(&self) -> Result<SqliteBatch<'_>, StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        let stmt = self.conn.prepare(INSERT_STATION_DATA)?;

        Ok(SqliteBatch { stmt, tx })
    }
}

pub struct SqliteBatch<'c> {
    // Declared first so the statement is finalized before a dropped
    // transaction rolls back.
    stmt: Statement<'c>,
    tx: Transaction<'c>,
}

impl ObservationBatch for SqliteBatch<'_> {
    fn insert(&mut self, o: &Observation<'_>) -> Result<(), StoreError> {
        let m = &o.measurements;
        self.stmt.execute(params![
            o.station,
            o.measured_at,
            m.temp,
            m.dwpt,
            m.rhum,
            m.prcp,
            m.snow,
            m.wdir,
            m.wspd,
            m.wpgt,
            m.pres,
            m.tsun,
            m.coco
        ])?;
        Ok(())
    }

    fn commit(self) -> Result<(), StoreError> {
        let SqliteBatch { stmt, tx } = self;
        tx.commit()?;
        stmt.finalize()?;
        Ok(())
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod test {
    use std::io::Cursor;

    use chrono::{DateTime, TimeZone, Utc};

    use super::*;
    use crate::reading::{hourly::tests::gzip, Measurements};

    pub(crate) fn store_with_station(id: &str, timezone: &str) -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store.setup().unwrap();
        store
            .connection()
            .execute(
                INSERT_STATION,
                params![id, "Test", "DE", 50.0f32, 8.0f32, timezone],
            )
            .unwrap();
        store
    }

    pub(crate) fn count(store: &SqliteStore) -> i64 {
        store
            .connection()
            .query_row("SELECT COUNT(*) FROM station_data", [], |r| r.get(0))
            .unwrap()
    }

    fn observation(hour: u32) -> Observation<'static> {
        Observation {
            station: "10637",
            measured_at: Utc.with_ymd_and_hms(2023, 1, 1, hour, 0, 0).unwrap(),
            measurements: Measurements {
                temp: Some(10.5),
                ..Measurements::default()
            },
        }
    }

    #[test]
    fn should_setup_twice() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.setup().unwrap();
        store.setup().unwrap();
    }

    #[test]
    fn should_look_up_timezone() {
        let store = store_with_station("10637", "Europe/Berlin");

        assert_eq!(
            store.station_timezone("10637").unwrap(),
            Some("Europe/Berlin".to_string())
        );
        assert_eq!(store.station_timezone("99999").unwrap(), None);
    }

    #[test]
    fn should_commit_batch() {
        let store = store_with_station("10637", "Europe/Berlin");

        let mut batch = store.begin_batch().unwrap();
        batch.insert(&observation(4)).unwrap();
        batch.insert(&observation(5)).unwrap();
        batch.commit().unwrap();

        assert_eq!(count(&store), 2);
        let (measured_at, temp, dwpt): (DateTime<Utc>, Option<f32>, Option<f32>) = store
            .connection()
            .query_row(
                "SELECT measured_at, temp, dwpt FROM station_data ORDER BY measured_at LIMIT 1",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .unwrap();
        assert_eq!(measured_at, Utc.with_ymd_and_hms(2023, 1, 1, 4, 0, 0).unwrap());
        assert_eq!(temp, Some(10.5));
        assert_eq!(dwpt, None);
    }

    #[test]
    fn should_discard_dropped_batch() {
        let store = store_with_station("10637", "Europe/Berlin");

        let mut first = store.begin_batch().unwrap();
        first.insert(&observation(1)).unwrap();
        first.commit().unwrap();

        let mut second = store.begin_batch().unwrap();
        second.insert(&observation(2)).unwrap();
        drop(second);

        assert_eq!(count(&store), 1);
    }

    #[test]
    fn should_import_stations_idempotently() {
        let archive = gzip(
            r#"[{"id": "10637", "name": {"en": "Frankfurt"}, "country": "DE",
                 "timezone": "Europe/Berlin",
                 "location": {"latitude": 50.05, "longitude": 8.6, "elevation": 111}}]"#,
        );
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.setup().unwrap();

        assert_eq!(store.import_stations(Cursor::new(archive.clone())).unwrap(), 1);
        assert_eq!(store.import_stations(Cursor::new(archive)).unwrap(), 1);

        let stations: i64 = store
            .connection()
            .query_row("SELECT COUNT(*) FROM stations", [], |r| r.get(0))
            .unwrap();
        assert_eq!(stations, 1);
        assert_eq!(
            store.station_timezone("10637").unwrap().as_deref(),
            Some("Europe/Berlin")
        );
    }

    #[test]
    fn should_roll_back_stations_on_decode_error() {
        let archive = gzip(
            r#"[{"id": "10637", "name": {}, "country": "DE", "timezone": "Europe/Berlin",
                 "location": {"latitude": 50.05, "longitude": 8.6}}, {"id": 5}]"#,
        );
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.setup().unwrap();

        assert!(store.import_stations(Cursor::new(archive)).is_err());
        assert_eq!(store.station_timezone("10637").unwrap(), None);
    }
}
