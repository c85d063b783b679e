//! Password login and session logout handlers.

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;

use crate::TRACING_TARGET_AUTHENTICATION;
use crate::extract::{AuthState, Json};
use crate::handler::Result;
use crate::handler::request::Login;
use crate::handler::response::AuthSession;
use crate::service::{ServiceState, SessionStore};

/// Exchanges the shared password for a bearer session.
#[tracing::instrument(skip_all)]
async fn login(
    State(sessions): State<SessionStore>,
    Json(request): Json<Login>,
) -> Result<(StatusCode, Json<AuthSession>)> {
    tracing::trace!(target: TRACING_TARGET_AUTHENTICATION, "Login attempt");

    let session = sessions.login(&request.password).await?;
    let response = AuthSession {
        token: session.token,
        expires_at: session.expires_at,
    };

    Ok((StatusCode::OK, Json(response)))
}

/// Revokes the session the request was authenticated with.
#[tracing::instrument(skip_all)]
async fn logout(
    State(sessions): State<SessionStore>,
    auth_state: AuthState,
) -> Result<StatusCode> {
    // The session may expire between extraction and revocation.
    if !sessions.revoke(auth_state.token()).await {
        tracing::debug!(
            target: TRACING_TARGET_AUTHENTICATION,
            "Session already gone at logout"
        );
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Returns a [`Router`] with routes that need no session.
pub fn public_routes() -> Router<ServiceState> {
    Router::new().route("/auth/login", post(login))
}

/// Returns a [`Router`] with routes behind authentication.
pub fn private_routes() -> Router<ServiceState> {
    Router::new().route("/auth/logout", post(logout))
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use crate::handler::response::{AuthSession, ErrorResponse};
    use crate::handler::test::{TEST_PASSWORD, create_test_server, login};

    #[tokio::test]
    async fn test_login_issues_session() -> anyhow::Result<()> {
        let server = create_test_server().await?;

        let response = server
            .post("/auth/login")
            .json(&json!({ "password": TEST_PASSWORD }))
            .await;
        response.assert_status_ok();

        let session = response.json::<AuthSession>();
        assert_eq!(session.token.len(), 43);
        assert!(session.expires_at > jiff::Timestamp::now());

        Ok(())
    }

    #[tokio::test]
    async fn test_login_rejects_wrong_password() -> anyhow::Result<()> {
        let server = create_test_server().await?;

        let response = server
            .post("/auth/login")
            .json(&json!({ "password": "wrong" }))
            .await;
        response.assert_status_unauthorized();

        let body = response.json::<ErrorResponse<'static>>();
        assert_eq!(body.name, "unauthorized");

        Ok(())
    }

    #[tokio::test]
    async fn test_login_rejects_malformed_body() -> anyhow::Result<()> {
        let server = create_test_server().await?;

        let response = server
            .post("/auth/login")
            .json(&json!({ "passphrase": TEST_PASSWORD }))
            .await;
        response.assert_status_bad_request();

        Ok(())
    }

    #[tokio::test]
    async fn test_logout_revokes_session() -> anyhow::Result<()> {
        let server = create_test_server().await?;
        let (name, value) = login(&server).await;

        let response = server
            .post("/auth/logout")
            .add_header(name.clone(), value.clone())
            .await;
        response.assert_status(axum::http::StatusCode::NO_CONTENT);

        let response = server.post("/auth/logout").add_header(name, value).await;
        response.assert_status_unauthorized();

        Ok(())
    }

    #[tokio::test]
    async fn test_logout_without_token() -> anyhow::Result<()> {
        let server = create_test_server().await?;

        let response = server.post("/auth/logout").await;
        response.assert_status_unauthorized();

        Ok(())
    }
}
