use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Issued bearer session.
#[must_use]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    /// Bearer token to send in the `Authorization` header.
    pub token: String,
    /// Time after which the token is rejected.
    pub expires_at: Timestamp,
}
