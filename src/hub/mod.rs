use crate::update::VehicleUpdate;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Opaque handle assigned to an observer session at registration.
pub type SessionId = Uuid;

// Per-session queue depth. An observer that falls this far behind starts
// losing intermediate updates; it still sees the latest state on the next
// broadcast.
const SESSION_QUEUE_DEPTH: usize = 64;

struct SessionHandle {
    tx: mpsc::Sender<VehicleUpdate>,
}

/// Fan-out hub over the set of connected observer sessions.
///
/// The hub owns each session from `register` until `unregister` (or until its
/// receive side is found closed). Delivery is best-effort, unordered across
/// sessions, and independent per session: `publish` never blocks on a slow
/// observer.
pub struct BroadcastHub {
    sessions: DashMap<SessionId, SessionHandle>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Registers a new observer session and returns its update stream.
    pub fn register(&self) -> (SessionId, mpsc::Receiver<VehicleUpdate>) {
        let (tx, rx) = mpsc::channel(SESSION_QUEUE_DEPTH);
        let session_id = Uuid::new_v4();
        self.sessions.insert(session_id, SessionHandle { tx });
        info!(
            session_id = %session_id,
            sessions = self.sessions.len(),
            "Observer session registered"
        );
        (session_id, rx)
    }

    /// Removes a session. Dropping its sender ends the session's stream.
    pub fn unregister(&self, session_id: SessionId) {
        if self.sessions.remove(&session_id).is_some() {
            info!(
                session_id = %session_id,
                sessions = self.sessions.len(),
                "Observer session unregistered"
            );
        }
    }

    /// Delivers `update` to every registered session without blocking.
    ///
    /// A session whose queue is full drops this update; a session whose
    /// receive side is gone is pruned after the pass. Returns the number of
    /// sessions the update was handed to.
    pub fn publish(&self, update: &VehicleUpdate) -> usize {
        let mut delivered = 0;
        let mut stale = Vec::new();

        for entry in self.sessions.iter() {
            match entry.value().tx.try_send(update.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(
                        session_id = %entry.key(),
                        vehicle_id = %update.id,
                        "Observer queue full, dropping update"
                    );
                }
                Err(TrySendError::Closed(_)) => stale.push(*entry.key()),
            }
        }

        // Prune after the pass — removing while holding an iter guard can
        // deadlock on the shard lock.
        for session_id in stale {
            if self.sessions.remove(&session_id).is_some() {
                debug!(session_id = %session_id, "Pruned closed observer session");
            }
        }

        delivered
    }

    /// Number of currently registered sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}
