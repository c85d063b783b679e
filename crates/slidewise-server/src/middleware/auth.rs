use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::extract::AuthState;

/// Requires a live bearer session to proceed with the request.
///
/// Rejections are produced by the [`AuthState`] extractor, so the handler
/// behind this middleware can extract the cached state again for free.
///
/// #### Examples
///
/// ```rust,ignore
/// use axum::middleware::from_fn_with_state;
/// use slidewise_server::middleware::require_authentication;
///
/// let guard = from_fn_with_state(state, require_authentication);
/// ```
pub async fn require_authentication(
    _: AuthState,
    request: Request,
    next: Next,
) -> Response {
    next.run(request).await
}
