//! Middleware for `axum::Router` and HTTP request processing.
//!
//! ```rust,ignore
//! use slidewise_server::middleware::{
//!     RouterObservabilityExt, RouterRecoveryExt, RouterSecurityExt,
//! };
//!
//! let app = routes(state.clone())
//!     .with_state(state)
//!     .with_default_security()
//!     .with_observability()
//!     .with_default_recovery();
//! ```

mod auth;
mod observability;
mod recovery;
mod security;

pub use auth::require_authentication;
pub use observability::{REQUEST_ID_HEADER, RouterObservabilityExt};
pub use recovery::{DEFAULT_REQUEST_TIMEOUT_SECS, RecoveryConfig, RouterRecoveryExt};
pub use security::{DEFAULT_MAX_BODY_SIZE, RouterSecurityExt, SecurityConfig};
