use super::*;
use serde_json::json;

#[test]
fn test_deserialize_full_payload() {
    let raw: RawUpdate =
        serde_json::from_value(json!({"id": "bus-7", "lat": 1.0, "lon": 2.0, "crowd_level": 1}))
            .unwrap();
    assert_eq!(raw.id.as_deref(), Some("bus-7"));
    assert_eq!(raw.lat, 1.0);
    assert_eq!(raw.lon, 2.0);
    assert_eq!(raw.crowd_level, 1);
}

#[test]
fn test_deserialize_missing_id() {
    let raw: RawUpdate =
        serde_json::from_value(json!({"lat": 1.0, "lon": 2.0, "crowd_level": 1})).unwrap();
    assert!(raw.id.is_none());
}

#[test]
fn test_missing_numeric_fields_default_to_zero() {
    let raw: RawUpdate = serde_json::from_value(json!({"id": "bus-7"})).unwrap();
    assert_eq!(raw.lat, 0.0);
    assert_eq!(raw.lon, 0.0);
    assert_eq!(raw.crowd_level, 0);
}

#[test]
fn test_unknown_fields_ignored() {
    let raw: RawUpdate = serde_json::from_value(json!({
        "id": "bus-7",
        "lat": 1.0,
        "lon": 2.0,
        "crowd_level": 1,
        "route": "42A"
    }))
    .unwrap();
    assert_eq!(raw.id.as_deref(), Some("bus-7"));
}

#[test]
fn test_vehicle_update_serde_round_trip() {
    let update = VehicleUpdate {
        id: "bus-7".to_string(),
        lat: 1.1,
        lon: 2.1,
        crowd_level: 2,
    };

    let json_str = serde_json::to_string(&update).unwrap();
    assert!(json_str.contains("\"crowd_level\""));

    let deserialized: VehicleUpdate = serde_json::from_str(&json_str).unwrap();
    assert_eq!(deserialized.id, update.id);
    assert_eq!(deserialized.lat, update.lat);
}
