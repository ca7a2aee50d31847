//! Health check query.

use async_trait::async_trait;
use tracing::{instrument, warn};

use super::mediator::{Handler, Mediator, Request};
use crate::domain::{AppError, HealthResponse, HealthStatus};

/// Checks the database. Never fails; an unreachable database is reported
/// as `unhealthy` in the response body.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckHealth;

impl Request for CheckHealth {
    type Response = HealthResponse;
}

#[async_trait]
impl Handler<CheckHealth> for Mediator {
    #[instrument(skip(self, _request))]
    async fn handle(&self, _request: CheckHealth) -> Result<HealthResponse, AppError> {
        let database = match self.health.health_check().await {
            Ok(()) => HealthStatus::Healthy,
            Err(e) => {
                warn!(error = %e, "Database health check failed");
                HealthStatus::Unhealthy
            }
        };
        Ok(HealthResponse::new(database))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockProvider, RecordingEventPublisher, mock_repos};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_health_reflects_database() {
        let mock = Arc::new(MockProvider::new());
        let mediator = Mediator::new(
            mock_repos(&mock),
            Arc::new(RecordingEventPublisher::new()),
        );

        let healthy = mediator.send(CheckHealth).await.unwrap();
        assert_eq!(healthy.status, HealthStatus::Healthy);

        mock.set_healthy(false);
        let unhealthy = mediator.send(CheckHealth).await.unwrap();
        assert_eq!(unhealthy.status, HealthStatus::Unhealthy);
        assert_eq!(unhealthy.database, HealthStatus::Unhealthy);
    }
}
