use serde::{Deserialize, Serialize};

mod validation;
#[cfg(test)]
mod tests;

pub use validation::ValidationError;

/// RawUpdate is the untrusted wire shape of a position update.
///
/// Only `id` is required. The numeric fields pass through unchecked and
/// default to zero when absent — callers are trusted for coordinate ranges
/// and occupancy values.
#[derive(Clone, Debug, Deserialize)]
pub struct RawUpdate {
    /// Vehicle identifier
    #[serde(default)]
    pub id: Option<String>,

    /// Latitude in decimal degrees
    #[serde(default)]
    pub lat: f64,

    /// Longitude in decimal degrees
    #[serde(default)]
    pub lon: f64,

    /// Opaque occupancy scalar
    #[serde(default)]
    pub crowd_level: i64,
}

impl RawUpdate {
    /// Validates the update and normalizes it for ingestion.
    ///
    /// Returns Ok(VehicleUpdate) if valid, Err(ValidationError) otherwise.
    pub fn validate(self) -> Result<VehicleUpdate, ValidationError> {
        validation::validate(self)
    }
}

/// A validated position update, ready for persistence and broadcast.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VehicleUpdate {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    pub crowd_level: i64,
}
