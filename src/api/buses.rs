use crate::store::VehicleStore;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::{Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::error;

/// Shared state for the active-vehicle query API
pub struct BusesAppState {
    pub store: Arc<dyn VehicleStore>,

    /// Trailing window defining "active"; older rows are excluded
    pub freshness_window: Duration,
}

/// Vehicle row response
#[derive(Serialize)]
pub struct BusResponse {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    pub crowd_level: i64,
    pub updated_at: String,
}

/// Create the active-vehicle query router
pub fn create_buses_router(state: Arc<BusesAppState>) -> Router {
    Router::new()
        .route("/api/buses", get(list_buses))
        .with_state(state)
}

/// GET /api/buses - All vehicles updated within the freshness window
///
/// The cutoff is computed against wall-clock time at call time; staleness is
/// derived here, never stored.
async fn list_buses(
    State(state): State<Arc<BusesAppState>>,
) -> Result<Json<Vec<BusResponse>>, QueryError> {
    let records = state
        .store
        .query_fresh(state.freshness_window, Utc::now())
        .map_err(|e| {
            error!(error = %e, "Active vehicle query failed");
            QueryError::Storage
        })?;

    let response: Vec<BusResponse> = records
        .into_iter()
        .map(|record| BusResponse {
            id: record.id,
            lat: record.lat,
            lon: record.lon,
            crowd_level: record.crowd_level,
            updated_at: record.updated_at.to_rfc3339(),
        })
        .collect();

    Ok(Json(response))
}

/// Query error types
#[derive(Debug)]
enum QueryError {
    Storage,
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        match self {
            QueryError::Storage => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use crate::update::VehicleUpdate;

    fn make_state(window_minutes: i64) -> (Arc<BusesAppState>, Arc<dyn VehicleStore>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn VehicleStore> =
            Arc::new(SqliteStore::new(dir.path().join("buses.db")).unwrap());
        let state = Arc::new(BusesAppState {
            store: Arc::clone(&store),
            freshness_window: Duration::minutes(window_minutes),
        });
        (state, store, dir)
    }

    fn update(id: &str) -> VehicleUpdate {
        VehicleUpdate {
            id: id.to_string(),
            lat: 1.0,
            lon: 2.0,
            crowd_level: 1,
        }
    }

    #[tokio::test]
    async fn test_list_buses_empty_store() {
        let (state, _, _dir) = make_state(5);
        let result = list_buses(State(state)).await.unwrap();
        assert!(result.0.is_empty());
    }

    #[tokio::test]
    async fn test_list_buses_excludes_stale_rows() {
        let (state, store, _dir) = make_state(5);
        let now = Utc::now();

        store.upsert(&update("fresh"), now).unwrap();
        store
            .upsert(&update("stale"), now - Duration::minutes(10))
            .unwrap();

        let result = list_buses(State(state)).await.unwrap();
        assert_eq!(result.0.len(), 1);
        assert_eq!(result.0[0].id, "fresh");
    }

    #[tokio::test]
    async fn test_list_buses_renders_rfc3339_timestamp() {
        let (state, store, _dir) = make_state(5);
        store.upsert(&update("bus-7"), Utc::now()).unwrap();

        let result = list_buses(State(state)).await.unwrap();
        // RFC 3339 with explicit UTC offset
        assert!(result.0[0].updated_at.contains('T'));
        assert!(result.0[0].updated_at.contains("+00:00"));
    }
}
