use crate::ingress::{IngressError, PersistMode, UpdateIngress};
use crate::update::RawUpdate;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use std::sync::Arc;
use tracing::{error, info};

/// Shared state for the one-shot location update API
pub struct LocationAppState {
    pub ingress: Arc<UpdateIngress>,
}

/// Create the location update router
pub fn create_location_router(state: Arc<LocationAppState>) -> Router {
    Router::new()
        .route("/api/location", post(update_location))
        .with_state(state)
}

/// POST /api/location - Confirmed-write location update
///
/// Unlike the streaming path, a failed persist aborts the request and nothing
/// is broadcast.
async fn update_location(
    State(state): State<Arc<LocationAppState>>,
    Json(raw): Json<RawUpdate>,
) -> Result<(StatusCode, &'static str), AppError> {
    let update = state
        .ingress
        .accept(raw, PersistMode::Required)
        .map_err(|e| match e {
            IngressError::Invalid(err) => AppError::Validation(err.to_string()),
            IngressError::Storage(err) => {
                error!(error = %err, "Location update failed");
                AppError::Storage
            }
        })?;

    info!(vehicle_id = %update.id, "Location updated");
    Ok((StatusCode::OK, "Location updated"))
}

/// Application error types
enum AppError {
    Validation(String),
    Storage,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            AppError::Storage => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Update failed").into_response()
            }
        }
    }
}
