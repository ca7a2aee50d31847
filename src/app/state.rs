//! Application state management.
//!
//! The shared state handed to every axum handler through the `State`
//! extractor.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use secrecy::SecretString;

use crate::domain::EventPublisher;

use super::mediator::{Mediator, Repositories};

/// Shared application state for the Axum web server.
///
/// Handlers only see the [`Mediator`]; the concrete repositories behind it
/// are chosen once at startup (PostgreSQL in production, in-memory mocks in
/// tests).
#[derive(Clone)]
pub struct AppState {
    pub mediator: Arc<Mediator>,

    /// When set, mutating requests must carry a matching `x-api-key` header.
    pub api_auth_key: Option<Arc<SecretString>>,

    /// Renders the Prometheus scrape body for `GET /metrics`.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn new(repositories: Repositories, events: Arc<dyn EventPublisher>) -> Self {
        Self {
            mediator: Arc::new(Mediator::new(repositories, events)),
            api_auth_key: None,
            metrics: None,
        }
    }

    #[must_use]
    pub fn with_api_key(mut self, key: Option<SecretString>) -> Self {
        self.api_auth_key = key.map(Arc::new);
        self
    }

    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// State backed by a fresh [`MockProvider`](crate::test_utils::MockProvider).
    #[cfg(any(test, feature = "test-utils"))]
    #[must_use]
    pub fn new_for_test() -> Arc<Self> {
        use crate::test_utils::{MockProvider, RecordingEventPublisher, mock_repos};

        let mock = Arc::new(MockProvider::new());
        Arc::new(Self::new(
            mock_repos(&mock),
            Arc::new(RecordingEventPublisher::new()),
        ))
    }
}
