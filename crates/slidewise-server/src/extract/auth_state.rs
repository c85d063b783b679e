//! Bearer session extractor.

use axum::extract::{FromRef, FromRequestParts, OptionalFromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jiff::Timestamp;

use crate::TRACING_TARGET_AUTHENTICATION;
use crate::handler::{Error, ErrorKind, Result};
use crate::service::SessionStore;

/// A request authenticated by a live bearer session.
///
/// Extraction fails with:
/// - [`ErrorKind::MissingAuthToken`] when no `Authorization` header is sent,
/// - [`ErrorKind::MalformedAuthToken`] when it is not a bearer token,
/// - [`ErrorKind::Unauthorized`] when the session is unknown or expired.
///
/// The verified state is cached in the request extensions, so the
/// authentication middleware and a handler can both extract it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthState {
    token: String,
    expires_at: Timestamp,
}

impl AuthState {
    /// Returns the bearer token of the session.
    #[inline]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Returns the session expiry.
    #[inline]
    pub fn expires_at(&self) -> Timestamp {
        self.expires_at
    }

    /// Reads the bearer token from the `Authorization` header.
    fn bearer_token(parts: &Parts) -> Result<String> {
        let header = parts.headers.get(AUTHORIZATION).ok_or_else(|| {
            ErrorKind::MissingAuthToken
                .with_message("Authentication required")
                .with_context("Missing Authorization header with Bearer token")
                .with_resource("authentication")
        })?;

        let malformed = || {
            ErrorKind::MalformedAuthToken
                .with_message("Invalid token format")
                .with_context("Authorization header must contain a valid Bearer token")
                .with_resource("authentication")
        };

        let value = header.to_str().map_err(|_| malformed())?;
        let (scheme, token) = value.trim().split_once(' ').ok_or_else(malformed)?;
        let token = token.trim();
        if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
            return Err(malformed());
        }

        Ok(token.to_owned())
    }

    /// Verifies the request's bearer token against the session store.
    pub async fn from_parts(parts: &Parts, sessions: &SessionStore) -> Result<Self> {
        let token = Self::bearer_token(parts)?;

        let Some(expires_at) = sessions.verify(&token).await else {
            tracing::warn!(
                target: TRACING_TARGET_AUTHENTICATION,
                "Authentication failed: unknown or expired session"
            );
            return Err(ErrorKind::Unauthorized
                .with_message("Your session is invalid or has expired")
                .with_resource("authentication"));
        };

        tracing::debug!(
            target: TRACING_TARGET_AUTHENTICATION,
            expires_at = %expires_at,
            "Session verified"
        );

        Ok(Self { token, expires_at })
    }
}

impl<S> FromRequestParts<S> for AuthState
where
    S: Sync + Send,
    SessionStore: FromRef<S>,
{
    type Rejection = Error<'static>;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(auth_state) = parts.extensions.get::<Self>() {
            return Ok(auth_state.clone());
        }

        let sessions = SessionStore::from_ref(state);
        let auth_state = Self::from_parts(parts, &sessions).await?;
        parts.extensions.insert(auth_state.clone());
        Ok(auth_state)
    }
}

impl<S> OptionalFromRequestParts<S> for AuthState
where
    S: Sync + Send,
    SessionStore: FromRef<S>,
{
    type Rejection = Error<'static>;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        if !parts.headers.contains_key(AUTHORIZATION) {
            return Ok(None);
        }

        <Self as FromRequestParts<S>>::from_request_parts(parts, state)
            .await
            .map(Some)
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;
    use crate::service::AuthConfig;

    fn parts(authorization: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/jobs");
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn test_missing_and_malformed_tokens() {
        let sessions = SessionStore::new(&AuthConfig::new("secret"));

        let error = AuthState::from_parts(&parts(None), &sessions).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::MissingAuthToken);

        let error = AuthState::from_parts(&parts(Some("Basic abc")), &sessions)
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::MalformedAuthToken);

        let error = AuthState::from_parts(&parts(Some("Bearer ")), &sessions)
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::MalformedAuthToken);
    }

    #[tokio::test]
    async fn test_session_lookup() {
        let sessions = SessionStore::new(&AuthConfig::new("secret"));

        let error = AuthState::from_parts(&parts(Some("Bearer nope")), &sessions)
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Unauthorized);

        let session = sessions.login("secret").await.unwrap();
        let header = format!("Bearer {}", session.token);
        let auth_state = AuthState::from_parts(&parts(Some(&header)), &sessions)
            .await
            .unwrap();
        assert_eq!(auth_state.token(), session.token);
        assert_eq!(auth_state.expires_at(), session.expires_at);
    }
}
