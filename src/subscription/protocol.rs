use crate::update::{RawUpdate, VehicleUpdate};
use serde::{Deserialize, Serialize};

/// Client → Server message types
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Periodic position+occupancy report from a vehicle
    #[serde(rename = "driver-update")]
    DriverUpdate(RawUpdate),
}

/// Server → Client: position update broadcast to every observer session
#[derive(Debug, Clone, Serialize)]
pub struct BusLocationMessage {
    #[serde(rename = "type")]
    pub msg_type: String,
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    pub crowd_level: i64,
}

impl From<VehicleUpdate> for BusLocationMessage {
    fn from(update: VehicleUpdate) -> Self {
        Self {
            msg_type: "bus-location".to_string(),
            id: update.id,
            lat: update.lat,
            lon: update.lon,
            crowd_level: update.crowd_level,
        }
    }
}
