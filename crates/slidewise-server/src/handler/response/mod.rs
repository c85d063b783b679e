//! Response types for HTTP handlers.

mod authentications;
mod error_response;
mod jobs;
mod monitors;

pub use authentications::*;
pub use error_response::ErrorResponse;
pub use jobs::*;
pub use monitors::*;
