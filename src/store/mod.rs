use crate::update::VehicleUpdate;
use chrono::{DateTime, Duration, Utc};
use std::fmt;

mod sqlite;

pub use sqlite::SqliteStore;

/// Latest observed state for one vehicle.
#[derive(Clone, Debug)]
pub struct VehicleRecord {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    pub crowd_level: i64,

    /// Server-assigned write time of the last accepted update
    pub updated_at: DateTime<Utc>,
}

/// Storage-layer failure.
///
/// A failed upsert carries no partial-write guarantee — the caller must treat
/// the write as "may or may not have applied".
#[derive(Debug, Clone)]
pub struct StoreError(String);

impl StoreError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "storage error: {}", self.0)
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self(e.to_string())
    }
}

/// Last-writer-wins vehicle state table.
///
/// `upsert` must be atomic per row: concurrent upserts to the same id are
/// serialized in some order and never leave a row mixing fields from
/// different calls. Writes carrying a timestamp older than the stored row
/// are ignored, so `updated_at` is monotonically non-decreasing per id and
/// the greatest accepted timestamp determines the visible state.
pub trait VehicleStore: Send + Sync {
    /// Inserts or fully replaces the row for `update.id`, stamped with `at`.
    fn upsert(&self, update: &VehicleUpdate, at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Returns all rows with `updated_at >= now - window`.
    ///
    /// Pure read; row order is unspecified.
    fn query_fresh(
        &self,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<Vec<VehicleRecord>, StoreError>;
}
