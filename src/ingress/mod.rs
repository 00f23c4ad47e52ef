use crate::hub::BroadcastHub;
use crate::store::{StoreError, VehicleStore};
use crate::update::{RawUpdate, ValidationError, VehicleUpdate};
use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Persistence coupling of an ingress path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PersistMode {
    /// Streaming telemetry: persist is best-effort. Whether a failed persist
    /// still broadcasts is governed by the `broadcast_on_persist_failure`
    /// switch.
    BestEffort,

    /// One-shot request: persist must succeed before anything is broadcast.
    Required,
}

/// Ingress errors
#[derive(Debug)]
pub enum IngressError {
    /// Rejected before touching storage
    Invalid(ValidationError),
    /// Upsert failed; the write may or may not have applied
    Storage(StoreError),
}

impl fmt::Display for IngressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngressError::Invalid(e) => write!(f, "invalid update: {}", e),
            IngressError::Storage(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for IngressError {}

/// Accepts raw position updates from both ingress paths, writes them through
/// to the store, and hands accepted updates to the hub.
///
/// The two paths couple persistence and broadcast differently (best-effort
/// telemetry vs confirmed write); the coupling is selected per call via
/// [`PersistMode`], not baked into the pipeline.
pub struct UpdateIngress {
    store: Arc<dyn VehicleStore>,
    hub: Arc<BroadcastHub>,

    /// Streaming-path switch: broadcast even when the persist failed.
    /// When true, telemetry keeps flowing to observers while storage is
    /// down.
    broadcast_on_persist_failure: bool,
}

impl UpdateIngress {
    pub fn new(
        store: Arc<dyn VehicleStore>,
        hub: Arc<BroadcastHub>,
        broadcast_on_persist_failure: bool,
    ) -> Self {
        Self {
            store,
            hub,
            broadcast_on_persist_failure,
        }
    }

    /// Validates `raw`, persists it stamped with the current server time, and
    /// broadcasts it to all observer sessions per `mode`.
    ///
    /// Returns the normalized update that was accepted.
    pub fn accept(&self, raw: RawUpdate, mode: PersistMode) -> Result<VehicleUpdate, IngressError> {
        let update = raw.validate().map_err(IngressError::Invalid)?;

        if let Err(e) = self.store.upsert(&update, Utc::now()) {
            match mode {
                PersistMode::Required => {
                    warn!(vehicle_id = %update.id, error = %e, "Persist failed, aborting confirmed update");
                    return Err(IngressError::Storage(e));
                }
                PersistMode::BestEffort => {
                    warn!(vehicle_id = %update.id, error = %e, "Persist failed on streaming path");
                    if !self.broadcast_on_persist_failure {
                        return Err(IngressError::Storage(e));
                    }
                }
            }
        }

        let delivered = self.hub.publish(&update);
        debug!(vehicle_id = %update.id, observers = delivered, "Update broadcast");

        Ok(update)
    }
}
