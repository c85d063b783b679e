//! Request extractors with the standard error body on rejection.
//!
//! - [`AuthState`]: a request carrying a live bearer session
//! - [`Json`], [`Multipart`], [`Path`], [`Query`]: drop-in replacements for
//!   the axum extractors

mod auth_state;
pub mod reject;

pub use crate::extract::auth_state::AuthState;
pub use crate::extract::reject::{Json, Multipart, Path, Query};
