//! Authentication request types.

use serde::{Deserialize, Serialize};

/// Request payload for login.
#[must_use]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Login {
    /// Shared password configured on the server.
    pub password: String,
}
