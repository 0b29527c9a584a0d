// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the water-quality-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! SQLite reading store

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, SecondsFormat, Utc};
use log::{debug, info};
use rusqlite::{params, Connection};

use super::{ReadingHistory, ReadingSink, SinkError, StoredReading};

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS water_readings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    turbidity REAL NOT NULL,
    tds REAL NOT NULL,
    reading_time TEXT NOT NULL
)";

/// Readings stored in a `water_readings` table.
///
/// The connection is guarded by a mutex so the store can be shared between
/// the reader loop and the HTTP handlers.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and make sure the table exists
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SinkError> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        info!("Reading store opened at {}", path.display());
        Self::with_connection(conn)
    }

    /// A private database living only as long as the store
    pub fn open_in_memory() -> Result<Self, SinkError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, SinkError> {
        conn.execute(CREATE_TABLE, [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ReadingSink for SqliteStore {
    fn insert(&self, turbidity: f64, tds: f64) -> Result<(), SinkError> {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        self.lock().execute(
            "INSERT INTO water_readings (turbidity, tds, reading_time) VALUES (?1, ?2, ?3)",
            params![turbidity, tds, now],
        )?;
        debug!("Stored reading turbidity={} tds={}", turbidity, tds);
        Ok(())
    }
}

impl ReadingHistory for SqliteStore {
    fn recent(&self, limit: usize) -> Result<Vec<StoredReading>, SinkError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT turbidity, tds, reading_time FROM water_readings ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, f64>(0)?,
                row.get::<_, f64>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut readings = Vec::new();
        for row in rows {
            let (turbidity, tds, time) = row?;
            let reading_time = DateTime::parse_from_rfc3339(&time)
                .map_err(|err| SinkError::Corrupt(format!("reading_time '{}': {}", time, err)))?
                .with_timezone(&Utc);
            readings.push(StoredReading {
                turbidity,
                tds,
                reading_time,
            });
        }
        Ok(readings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_insert_and_read_back_newest_first() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert(1.5, 200.0).unwrap();
        store.insert(2.5, 210.0).unwrap();
        store.insert(3.5, 220.0).unwrap();

        let recent = store.recent(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].turbidity, 3.5);
        assert_eq!(recent[0].tds, 220.0);
        assert_eq!(recent[1].turbidity, 2.5);
        assert!(recent[0].reading_time >= recent[1].reading_time);
    }

    #[test]
    fn test_empty_store() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.recent(10).unwrap().is_empty());
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("readings.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.insert(0.8, 150.0).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        let recent = store.recent(10).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].turbidity, 0.8);
    }

    #[test]
    fn test_unwritable_path_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("readings.db");
        assert!(matches!(SqliteStore::open(path), Err(SinkError::Storage(_))));
    }
}
