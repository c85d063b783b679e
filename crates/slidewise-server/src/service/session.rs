//! Password login and bearer sessions.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
#[cfg(feature = "config")]
use clap::Args;
use jiff::{SignedDuration, Timestamp};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use crate::{Error, Result, TRACING_TARGET_AUTHENTICATION};

/// Default session lifetime: 12 hours.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 43_200;

/// Shared-password authentication settings.
#[derive(Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct AuthConfig {
    /// Shared password accepted by the login endpoint
    #[cfg_attr(feature = "config", arg(long = "auth-password", env = "AUTH_PASSWORD"))]
    pub auth_password: String,

    /// Lifetime of an issued session in seconds
    #[cfg_attr(
        feature = "config",
        arg(
            long = "session-ttl",
            env = "SESSION_TTL_SECS",
            default_value_t = DEFAULT_SESSION_TTL_SECS
        )
    )]
    pub session_ttl_secs: u64,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("auth_password", &"[REDACTED]")
            .field("session_ttl_secs", &self.session_ttl_secs)
            .finish()
    }
}

impl AuthConfig {
    /// Creates a configuration with the default session lifetime.
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            auth_password: password.into(),
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
        }
    }

    /// Sets the session lifetime.
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl_secs = ttl.as_secs();
        self
    }

    /// Returns the session lifetime.
    #[inline]
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    /// Validate the configuration and return any issues.
    pub fn validate(&self) -> Result<(), String> {
        if self.auth_password.is_empty() {
            return Err("Auth password cannot be empty".to_string());
        }

        if self.session_ttl_secs == 0 {
            return Err("Session lifetime must be at least 1 second".to_string());
        }

        Ok(())
    }
}

/// A freshly issued bearer token.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: Timestamp,
}

struct SessionStoreInner {
    password_digest: [u8; 32],
    ttl: SignedDuration,
    /// Expiry by SHA-256 hex digest of the token.
    sessions: RwLock<HashMap<String, Timestamp>>,
}

/// In-process session map.
///
/// Tokens are never stored; sessions are keyed by the digest of the token.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("ttl", &self.inner.ttl)
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Creates an empty store for the configured password.
    pub fn new(config: &AuthConfig) -> Self {
        let ttl_secs = i64::try_from(config.session_ttl_secs).unwrap_or(i64::MAX);
        Self {
            inner: Arc::new(SessionStoreInner {
                password_digest: digest(config.auth_password.as_bytes()),
                ttl: SignedDuration::from_secs(ttl_secs),
                sessions: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Checks the password and issues a new session.
    pub async fn login(&self, password: &str) -> Result<IssuedSession> {
        if !digests_match(&digest(password.as_bytes()), &self.inner.password_digest) {
            tracing::warn!(
                target: TRACING_TARGET_AUTHENTICATION,
                "Login rejected: password mismatch"
            );
            return Err(Error::auth("Invalid password"));
        }

        let now = Timestamp::now();
        let expires_at = now
            .checked_add(self.inner.ttl)
            .map_err(|e| Error::internal("session", "Session expiry out of range").with_source(e))?;

        let token = generate_token();
        let mut sessions = self.inner.sessions.write().await;
        sessions.retain(|_, expiry| *expiry > now);
        sessions.insert(token_key(&token), expires_at);

        tracing::info!(
            target: TRACING_TARGET_AUTHENTICATION,
            expires_at = %expires_at,
            active_sessions = sessions.len(),
            "Session issued"
        );

        Ok(IssuedSession { token, expires_at })
    }

    /// Returns the expiry of a live session, dropping it if it expired.
    pub async fn verify(&self, token: &str) -> Option<Timestamp> {
        let key = token_key(token);
        let expires_at = *self.inner.sessions.read().await.get(&key)?;
        if expires_at > Timestamp::now() {
            return Some(expires_at);
        }

        self.inner.sessions.write().await.remove(&key);
        tracing::debug!(
            target: TRACING_TARGET_AUTHENTICATION,
            expired_at = %expires_at,
            "Expired session dropped"
        );
        None
    }

    /// Revokes a session. Returns false if it was unknown.
    pub async fn revoke(&self, token: &str) -> bool {
        let revoked = self
            .inner
            .sessions
            .write()
            .await
            .remove(&token_key(token))
            .is_some();

        tracing::info!(
            target: TRACING_TARGET_AUTHENTICATION,
            revoked,
            "Session revoked"
        );
        revoked
    }

    /// Number of stored sessions, expired ones included.
    pub async fn len(&self) -> usize {
        self.inner.sessions.read().await.len()
    }

    /// Returns true if no session is stored.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn digest(bytes: &[u8]) -> [u8; 32] {
    Sha256::digest(bytes).into()
}

fn digests_match(a: &[u8; 32], b: &[u8; 32]) -> bool {
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn token_key(token: &str) -> String {
    hex::encode(digest(token.as_bytes()))
}

/// Size of a session token before encoding.
const TOKEN_SIZE: usize = 32;

/// Random bytes from the thread-local CSPRNG, base64url without padding.
fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_SIZE];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
