//! Drop-in replacements for axum's `Json`, `Multipart`, `Path` and `Query` whose
//! rejections render as the standard error body.

mod enhanced_json;
mod enhanced_multipart;
mod enhanced_path;
mod enhanced_query;

pub use enhanced_json::Json;
pub use enhanced_multipart::Multipart;
pub use enhanced_path::Path;
pub use enhanced_query::Query;

/// Keeps the first lines of an error message, capped in length.
fn sanitize_error_message(message: &str) -> String {
    message
        .lines()
        .take(2)
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(200)
        .collect()
}
