//! Application state and dependency injection.

mod config;
mod session;

use std::sync::Arc;

use slidewise_core::completion::CompletionService;
use slidewise_core::extract::{JsonSlideExtractor, SlideExtractor};
use slidewise_nats::JobStorage;

pub use crate::service::config::{ServiceConfig, ServiceConfigBuilder};
pub use crate::service::session::{
    AuthConfig, DEFAULT_SESSION_TTL_SECS, IssuedSession, SessionStore,
};
use crate::pipeline::{JobOrchestrator, PipelineConfig};
// Re-export error types from crate root for convenience
pub use crate::{Error, Result};

/// Application state.
///
/// Used for the [`State`] extraction (dependency injection).
///
/// [`State`]: axum::extract::State
#[must_use = "state does nothing unless you use it"]
#[derive(Debug, Clone)]
pub struct ServiceState {
    // External services:
    storage: JobStorage,
    completion: CompletionService,

    // Internal services:
    orchestrator: JobOrchestrator,
    sessions: SessionStore,
}

impl ServiceState {
    /// Initializes application state from configuration.
    ///
    /// Opens the job storage and creates the completion client. The worker
    /// pool starts empty; the stall sweeper is started by the caller.
    pub async fn from_config(config: &ServiceConfig) -> Result<Self> {
        config.validate()?;

        let storage = config.connect_storage().await?;
        let completion = config.connect_completion()?;
        let sessions = SessionStore::new(&config.auth);

        Ok(Self::from_parts(
            storage,
            completion,
            Arc::new(JsonSlideExtractor::default()),
            config.pipeline_config(),
            sessions,
        ))
    }

    /// Assembles the state from already constructed services.
    pub fn from_parts(
        storage: JobStorage,
        completion: CompletionService,
        extractor: Arc<dyn SlideExtractor>,
        pipeline: PipelineConfig,
        sessions: SessionStore,
    ) -> Self {
        let orchestrator =
            JobOrchestrator::new(storage.clone(), completion.clone(), extractor, pipeline);

        Self {
            storage,
            completion,
            orchestrator,
            sessions,
        }
    }

    /// Returns the job orchestrator.
    #[inline]
    pub fn orchestrator(&self) -> &JobOrchestrator {
        &self.orchestrator
    }

    /// Returns the job storage.
    #[inline]
    pub fn storage(&self) -> &JobStorage {
        &self.storage
    }
}

macro_rules! impl_di {
    ($($f:ident: $t:ty),+) => {$(
        impl axum::extract::FromRef<ServiceState> for $t {
            fn from_ref(state: &ServiceState) -> Self {
                state.$f.clone()
            }
        }
    )+};
}

// External services:
impl_di!(storage: JobStorage);
impl_di!(completion: CompletionService);

// Internal services:
impl_di!(orchestrator: JobOrchestrator);
impl_di!(sessions: SessionStore);
