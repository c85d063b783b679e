//! Request types for HTTP handlers.

mod authentications;
mod jobs;
mod paths;

pub use authentications::*;
pub use jobs::*;
pub use paths::*;
