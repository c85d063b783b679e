//! Body limits, CORS and basic security headers.

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::header::{self, HeaderValue};
use axum::http::Method;
#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::set_header::SetResponseHeaderLayer;

/// Default maximum request body size: 32MB, enough for large slide decks.
pub const DEFAULT_MAX_BODY_SIZE: usize = 32 * 1024 * 1024;

/// Request size and cross-origin settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct SecurityConfig {
    /// Maximum request body size in bytes
    #[cfg_attr(
        feature = "config",
        arg(long = "max-body-size", env = "MAX_BODY_SIZE", default_value_t = DEFAULT_MAX_BODY_SIZE)
    )]
    pub max_body_size: usize,

    /// Origins allowed to call the API from a browser; none disables CORS
    #[cfg_attr(
        feature = "config",
        arg(long = "cors-origins", env = "CORS_ORIGINS", value_delimiter = ',')
    )]
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            allowed_origins: Vec::new(),
        }
    }
}

impl SecurityConfig {
    /// Parses the allowed origins, skipping invalid ones.
    pub fn origin_header_values(&self) -> Vec<HeaderValue> {
        self.allowed_origins
            .iter()
            .filter_map(|origin| HeaderValue::from_str(origin.trim()).ok())
            .collect()
    }

    /// Validate the configuration and return any issues.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_body_size == 0 {
            return Err("Maximum body size must be greater than 0".to_string());
        }

        Ok(())
    }
}

/// Extension trait for `axum::`[`Router`] to apply security middleware.
pub trait RouterSecurityExt<S> {
    /// Layers body limits, CORS (if origins are configured) and
    /// `X-Content-Type-Options: nosniff`.
    fn with_security(self, config: &SecurityConfig) -> Self;

    /// Layers security middleware with default configuration.
    fn with_default_security(self) -> Self;
}

impl<S> RouterSecurityExt<S> for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_security(self, config: &SecurityConfig) -> Self {
        let mut router = self
            .layer(DefaultBodyLimit::max(config.max_body_size))
            .layer(RequestBodyLimitLayer::new(config.max_body_size))
            .layer(SetResponseHeaderLayer::overriding(
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ));

        let origins = config.origin_header_values();
        if !origins.is_empty() {
            let cors_layer = CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods([Method::GET, Method::POST, Method::DELETE])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
                .expose_headers([header::CONTENT_DISPOSITION]);
            router = router.layer(cors_layer);
        }

        router
    }

    fn with_default_security(self) -> Self {
        self.with_security(&SecurityConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum_test::TestServer;

    use super::*;

    #[tokio::test]
    async fn test_body_limit() -> anyhow::Result<()> {
        let config = SecurityConfig {
            max_body_size: 16,
            ..SecurityConfig::default()
        };
        let router = Router::new()
            .route("/", post(|body: String| async move { body }))
            .with_security(&config);
        let server = TestServer::new(router)?;

        let response = server.post("/").text("small").await;
        response.assert_status_ok();
        assert_eq!(response.header(header::X_CONTENT_TYPE_OPTIONS), "nosniff");

        let response = server.post("/").text("x".repeat(64)).await;
        response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);

        Ok(())
    }

    #[test]
    fn test_origin_parsing() {
        let config = SecurityConfig {
            allowed_origins: vec!["http://localhost:5173".into(), "bad\norigin".into()],
            ..SecurityConfig::default()
        };
        assert_eq!(config.origin_header_values().len(), 1);
    }
}
