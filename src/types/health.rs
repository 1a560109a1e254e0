//! Per-service liveness/connectivity, fed by ping/conn frames.

use serde::Serialize;

/// Health of one backend service, keyed by service name. Read by the display
/// layer; mutated only through the store.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceHealth {
    pub service: String,
    pub connected: bool,
    /// Epoch seconds of the last ping frame, 0 if never seen.
    pub last_ping: i64,
}

impl ServiceHealth {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            connected: false,
            last_ping: 0,
        }
    }

    /// True when no ping has arrived within `threshold_secs` of `now`.
    pub fn is_stale(&self, now: i64, threshold_secs: i64) -> bool {
        self.last_ping == 0 || now - self.last_ping > threshold_secs
    }
}
