//! Production event publisher.

use async_trait::async_trait;
use metrics::counter;
use tracing::info;

use crate::domain::{AppError, DomainEvent, EventPublisher};

/// Emits each event as a structured log record and counts it per event name.
#[derive(Debug, Default, Clone)]
pub struct TracingEventPublisher;

impl TracingEventPublisher {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventPublisher for TracingEventPublisher {
    async fn publish(&self, events: &[DomainEvent]) -> Result<(), AppError> {
        for event in events {
            let payload = serde_json::to_string(event)?;
            info!(
                target: "domain_events",
                event = event.name(),
                aggregate_id = %event.aggregate_id(),
                occurred_at = %event.occurred_at(),
                payload = %payload,
                "Domain event"
            );
            counter!("domain_events_total", "event" => event.name()).increment(1);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StudentId;
    use chrono::Utc;

    #[tokio::test]
    async fn test_publish_succeeds() {
        let publisher = TracingEventPublisher::new();
        let events = vec![DomainEvent::StudentCreated {
            student_id: StudentId::new(),
            email: "a@b.com".to_string(),
            occurred_at: Utc::now(),
        }];
        assert!(publisher.publish(&events).await.is_ok());
        assert!(publisher.publish(&[]).await.is_ok());
    }
}
