use super::{RawUpdate, VehicleUpdate};
use std::fmt;

/// Validation errors for position updates
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    MissingId,
    EmptyId,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::MissingId => write!(f, "id is required"),
            ValidationError::EmptyId => write!(f, "id must not be empty"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validates a raw update and normalizes it.
///
/// Validation rules:
/// - `id` must be present and non-empty
/// - All other fields pass through unchecked (minimal-trust environment)
pub fn validate(raw: RawUpdate) -> Result<VehicleUpdate, ValidationError> {
    let id = match raw.id {
        None => return Err(ValidationError::MissingId),
        Some(id) if id.is_empty() => return Err(ValidationError::EmptyId),
        Some(id) => id,
    };

    Ok(VehicleUpdate {
        id,
        lat: raw.lat,
        lon: raw.lon,
        crowd_level: raw.crowd_level,
    })
}
