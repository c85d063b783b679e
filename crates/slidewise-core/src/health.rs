//! Health reporting for external collaborators.

use std::time::Duration;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Operational status of a service.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    /// Operating normally.
    #[default]
    Healthy,
    /// Functional with reduced guarantees.
    Degraded,
    /// Not operational.
    Unhealthy,
}

/// Result of a health check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub status: ServiceStatus,
    /// Time the check took.
    pub response: Option<Duration>,
    pub message: Option<String>,
    pub checked_at: Timestamp,
}

impl ServiceHealth {
    fn with_status(status: ServiceStatus, message: Option<String>) -> Self {
        Self {
            status,
            response: None,
            message,
            checked_at: Timestamp::now(),
        }
    }

    /// Creates a healthy report.
    pub fn healthy() -> Self {
        Self::with_status(ServiceStatus::Healthy, None)
    }

    /// Creates a degraded report.
    pub fn degraded(message: impl Into<String>) -> Self {
        Self::with_status(ServiceStatus::Degraded, Some(message.into()))
    }

    /// Creates an unhealthy report.
    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::with_status(ServiceStatus::Unhealthy, Some(message.into()))
    }

    /// Sets the time the check took.
    pub fn with_response_time(mut self, response: Duration) -> Self {
        self.response = Some(response);
        self
    }

    /// Returns true unless the service is unhealthy.
    pub fn is_operational(&self) -> bool {
        self.status != ServiceStatus::Unhealthy
    }
}
