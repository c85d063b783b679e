//! All `axum::`[`Router`]s with related `axum::`[`Handler`]s.
//!
//! | Method | Path | Auth |
//! |---|---|---|
//! | GET | `/health` | no |
//! | POST | `/auth/login` | no |
//! | POST | `/auth/logout` | yes |
//! | POST | `/jobs` | yes |
//! | POST | `/jobs/{job_id}/run` | yes |
//! | GET | `/jobs/{job_id}` | yes |
//! | GET | `/jobs/{job_id}/result` | yes |
//! | GET | `/jobs/{job_id}/debug` | yes |
//! | DELETE | `/jobs/{job_id}` | yes |
//! | POST | `/jobs/{job_id}/chunks/{chunk_id}/retry` | yes |
//! | POST | `/jobs/{job_id}/chunks/{chunk_id}/recheck` | yes |
//!
//! [`Router`]: axum::routing::Router
//! [`Handler`]: axum::handler::Handler

mod authentication;
mod chunks;
mod error;
mod jobs;
mod monitors;
pub mod request;
pub mod response;

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::response::{IntoResponse, Response};

pub use crate::handler::error::{Error, ErrorKind, Result};
pub use crate::handler::response::ErrorResponse;
use crate::middleware::require_authentication;
use crate::service::ServiceState;

#[inline]
async fn handler() -> Response {
    ErrorKind::NotFound.into_response()
}

/// Returns a [`Router`] with all private routes.
fn private_routes() -> Router<ServiceState> {
    Router::new()
        .merge(authentication::private_routes())
        .merge(jobs::routes())
        .merge(chunks::routes())
}

/// Returns a [`Router`] with all public routes.
fn public_routes() -> Router<ServiceState> {
    Router::new()
        .merge(authentication::public_routes())
        .merge(monitors::routes())
}

/// Returns a [`Router`] with all routes.
pub fn routes(state: ServiceState) -> Router<ServiceState> {
    let require_authentication = from_fn_with_state(state, require_authentication);

    // Private routes with authentication middleware
    let private_router = private_routes().route_layer(require_authentication);

    // Public routes without authentication
    let public_router = public_routes();

    Router::new()
        .merge(private_router)
        .merge(public_router)
        .fallback(handler)
}
