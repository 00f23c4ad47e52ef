//! Vehicle state persistence using SQLite.
//!
//! One row per vehicle id; an accepted write replaces the whole row.
//! `updated_at` is stored as Unix epoch milliseconds so the freshness cutoff
//! and the last-writer guard are plain integer comparisons in SQL.

use super::{StoreError, VehicleRecord, VehicleStore};
use crate::update::VehicleUpdate;
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;

/// Persists vehicle state in SQLite.
///
/// # Schema
/// ```sql
/// CREATE TABLE buses (
///     id          TEXT PRIMARY KEY,
///     lat         REAL NOT NULL,
///     lon         REAL NOT NULL,
///     crowd_level INTEGER NOT NULL,
///     updated_at  INTEGER NOT NULL  -- Unix epoch milliseconds
/// );
/// ```
///
/// # Thread Safety
/// - Connection is wrapped in Mutex for safe concurrent access
/// - The single-statement conditional upsert keeps each write atomic per row
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) the store and ensures the table exists.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path).context("Failed to open vehicle database")?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.create_table()?;
        Ok(store)
    }

    fn create_table(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS buses (
                id          TEXT PRIMARY KEY,
                lat         REAL NOT NULL,
                lon         REAL NOT NULL,
                crowd_level INTEGER NOT NULL,
                updated_at  INTEGER NOT NULL
            );",
        )
        .context("Failed to create buses table")?;
        Ok(())
    }
}

impl VehicleStore for SqliteStore {
    fn upsert(&self, update: &VehicleUpdate, at: DateTime<Utc>) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        // The WHERE guard drops writes stamped older than the stored row, so
        // the greatest accepted timestamp wins regardless of apply order.
        conn.execute(
            "INSERT INTO buses (id, lat, lon, crowd_level, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                 lat = excluded.lat,
                 lon = excluded.lon,
                 crowd_level = excluded.crowd_level,
                 updated_at = excluded.updated_at
             WHERE excluded.updated_at >= buses.updated_at",
            params![
                update.id,
                update.lat,
                update.lon,
                update.crowd_level,
                at.timestamp_millis()
            ],
        )?;
        Ok(())
    }

    fn query_fresh(
        &self,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<Vec<VehicleRecord>, StoreError> {
        let cutoff = (now - window).timestamp_millis();
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, lat, lon, crowd_level, updated_at FROM buses WHERE updated_at >= ?1",
        )?;
        let rows = stmt.query_map(params![cutoff], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, f64>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, lat, lon, crowd_level, millis) = row?;
            let updated_at = DateTime::from_timestamp_millis(millis)
                .ok_or_else(|| StoreError::new(format!("corrupt updated_at for '{}'", id)))?;
            records.push(VehicleRecord {
                id,
                lat,
                lon,
                crowd_level,
                updated_at,
            });
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn open_store() -> (SqliteStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("buses.db")).unwrap();
        (store, dir)
    }

    fn update(id: &str, lat: f64, lon: f64, crowd_level: i64) -> VehicleUpdate {
        VehicleUpdate {
            id: id.to_string(),
            lat,
            lon,
            crowd_level,
        }
    }

    #[test]
    fn test_upsert_inserts_new_row() {
        let (store, _dir) = open_store();
        let now = Utc::now();

        store.upsert(&update("bus-7", 1.0, 2.0, 1), now).unwrap();

        let rows = store.query_fresh(Duration::minutes(5), now).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "bus-7");
        assert_eq!(rows[0].lat, 1.0);
        assert_eq!(rows[0].updated_at.timestamp_millis(), now.timestamp_millis());
    }

    #[test]
    fn test_upsert_replaces_whole_row() {
        let (store, _dir) = open_store();
        let now = Utc::now();

        store.upsert(&update("bus-7", 1.0, 2.0, 1), now).unwrap();
        store
            .upsert(&update("bus-7", 1.1, 2.1, 2), now + Duration::seconds(1))
            .unwrap();

        let rows = store.query_fresh(Duration::minutes(5), now).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].lat, 1.1);
        assert_eq!(rows[0].lon, 2.1);
        assert_eq!(rows[0].crowd_level, 2);
    }

    #[test]
    fn test_stale_write_ignored() {
        let (store, _dir) = open_store();
        let now = Utc::now();

        store.upsert(&update("bus-7", 1.1, 2.1, 2), now).unwrap();
        // A write stamped earlier must not overwrite the newer row
        store
            .upsert(&update("bus-7", 9.9, 9.9, 9), now - Duration::seconds(30))
            .unwrap();

        let rows = store.query_fresh(Duration::minutes(5), now).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].lat, 1.1);
        assert_eq!(rows[0].updated_at.timestamp_millis(), now.timestamp_millis());
    }

    #[test]
    fn test_query_fresh_window_boundaries() {
        let (store, _dir) = open_store();
        let now = Utc::now();
        let window = Duration::minutes(5);

        store
            .upsert(&update("fresh", 1.0, 1.0, 0), now - Duration::minutes(4))
            .unwrap();
        store
            .upsert(&update("stale", 2.0, 2.0, 0), now - Duration::minutes(6))
            .unwrap();
        // Exactly at the cutoff is still fresh (>= comparison)
        store
            .upsert(&update("edge", 3.0, 3.0, 0), now - window)
            .unwrap();

        let mut ids: Vec<String> = store
            .query_fresh(window, now)
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["edge", "fresh"]);
    }

    #[test]
    fn test_vehicle_included_then_excluded_over_time() {
        let (store, _dir) = open_store();
        let window = Duration::minutes(5);
        let t = Utc::now();

        store.upsert(&update("bus-3", 1.0, 1.0, 0), t).unwrap();

        // Query four minutes later: included
        let rows = store.query_fresh(window, t + Duration::minutes(4)).unwrap();
        assert_eq!(rows.len(), 1);

        // Query six minutes later: excluded
        let rows = store.query_fresh(window, t + Duration::minutes(6)).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_rows_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("buses.db");
        let now = Utc::now();

        {
            let store = SqliteStore::new(&path).unwrap();
            store.upsert(&update("bus-7", 1.0, 2.0, 1), now).unwrap();
        }

        let store = SqliteStore::new(&path).unwrap();
        let rows = store.query_fresh(Duration::minutes(5), now).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "bus-7");
    }

    #[test]
    fn test_concurrent_upserts_no_field_mixing() {
        let (store, _dir) = open_store();
        let store = Arc::new(store);
        let base = Utc::now();

        // Writers race on the same id with distinct timestamps; the row must
        // end up exactly as written by the greatest timestamp, never a blend.
        let handles: Vec<_> = (0..8i64)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    let u = VehicleUpdate {
                        id: "bus-1".to_string(),
                        lat: i as f64,
                        lon: (i * 10) as f64,
                        crowd_level: i,
                    };
                    store.upsert(&u, base + Duration::milliseconds(i)).unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let rows = store.query_fresh(Duration::minutes(5), base).unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.updated_at.timestamp_millis(), base.timestamp_millis() + 7);
        assert_eq!(row.lat, 7.0);
        assert_eq!(row.lon, 70.0);
        assert_eq!(row.crowd_level, 7);
    }
}
