//! Health check handler.

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use jiff::Timestamp;
use slidewise_core::health::ServiceStatus;
use slidewise_nats::JobStorage;

use crate::extract::Json;
use crate::handler::Result;
use crate::handler::response::HealthStatus;
use crate::service::ServiceState;

/// Tracing target for monitor operations.
const TRACING_TARGET: &str = "slidewise_server::handler::monitors";

/// Reports whether job records are durable.
///
/// The service keeps serving on the in-memory fallback, so that case is
/// reported as degraded rather than unhealthy.
#[tracing::instrument(skip_all)]
async fn health_status(
    State(storage): State<JobStorage>,
) -> Result<(StatusCode, Json<HealthStatus>)> {
    let health = storage.health();
    let status = if health.durable {
        ServiceStatus::Healthy
    } else {
        ServiceStatus::Degraded
    };

    tracing::debug!(
        target: TRACING_TARGET,
        backend = health.backend,
        status = ?status,
        "Health status check requested"
    );

    let response = HealthStatus {
        status,
        storage: health.into(),
        checked_at: Timestamp::now(),
    };

    Ok((StatusCode::OK, Json(response)))
}

/// Returns a [`Router`] with all related routes.
pub fn routes() -> Router<ServiceState> {
    Router::new().route("/health", get(health_status))
}

#[cfg(test)]
mod test {
    use slidewise_core::health::ServiceStatus;

    use crate::handler::monitors::routes;
    use crate::handler::response::HealthStatus;
    use crate::handler::test::create_test_server_with_router;

    #[tokio::test]
    async fn test_health_reports_memory_backend() -> anyhow::Result<()> {
        let server = create_test_server_with_router(|_| routes()).await?;

        let response = server.get("/health").await;
        response.assert_status_ok();

        let body = response.json::<HealthStatus>();
        assert_eq!(body.status, ServiceStatus::Degraded);
        assert_eq!(body.storage.backend, "memory");
        assert!(!body.storage.durable);

        Ok(())
    }
}
