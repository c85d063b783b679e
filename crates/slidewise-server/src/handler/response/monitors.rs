use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use slidewise_core::health::ServiceStatus;
use slidewise_nats::StorageHealth;

/// Storage backend in use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageStatus {
    /// `nats` or `memory`.
    pub backend: String,
    /// Whether records survive a restart.
    pub durable: bool,
}

impl From<StorageHealth> for StorageStatus {
    fn from(health: StorageHealth) -> Self {
        Self {
            backend: health.backend.to_owned(),
            durable: health.durable,
        }
    }
}

/// Health check response.
#[must_use]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Degraded while running on the in-memory backend.
    pub status: ServiceStatus,
    pub storage: StorageStatus,
    pub checked_at: Timestamp,
}
