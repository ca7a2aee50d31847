//! Request dispatch.
//!
//! Every use case is a plain request type implementing [`Request`]. The
//! [`Mediator`] implements [`Handler`] once per request type, so
//! `mediator.send(request)` resolves the handler at compile time.

use std::any::type_name;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;
use tracing::{Instrument, debug, info_span, warn};

use crate::domain::{
    AppError, CourseRepository, DatabaseError, DomainEvent, EventPublisher, HealthCheck,
    StudentRepository, TeacherRepository,
};

/// Attempts a load-modify-save command gets before a stale write is reported.
const MAX_WRITE_ATTEMPTS: u32 = 3;

/// A command or query with a known response type.
pub trait Request: Send + 'static {
    type Response: Send;
}

#[async_trait]
pub trait Handler<R: Request>: Send + Sync {
    async fn handle(&self, request: R) -> Result<R::Response, AppError>;
}

/// The ports a [`Mediator`] needs to run every handler.
#[derive(Clone)]
pub struct Repositories {
    pub students: Arc<dyn StudentRepository>,
    pub courses: Arc<dyn CourseRepository>,
    pub teachers: Arc<dyn TeacherRepository>,
    pub health: Arc<dyn HealthCheck>,
}

pub struct Mediator {
    pub(crate) students: Arc<dyn StudentRepository>,
    pub(crate) courses: Arc<dyn CourseRepository>,
    pub(crate) teachers: Arc<dyn TeacherRepository>,
    pub(crate) health: Arc<dyn HealthCheck>,
    events: Arc<dyn EventPublisher>,
}

impl Mediator {
    #[must_use]
    pub fn new(repositories: Repositories, events: Arc<dyn EventPublisher>) -> Self {
        Self {
            students: repositories.students,
            courses: repositories.courses,
            teachers: repositories.teachers,
            health: repositories.health,
            events,
        }
    }

    /// Dispatches `request` to its handler, recording the outcome.
    pub async fn send<R>(&self, request: R) -> Result<R::Response, AppError>
    where
        R: Request,
        Self: Handler<R>,
    {
        let name = request_name::<R>();
        let span = info_span!("mediator", request = name);
        let result = <Self as Handler<R>>::handle(self, request)
            .instrument(span)
            .await;

        let outcome = match &result {
            Ok(_) => "ok",
            Err(AppError::Validation(_)) | Err(AppError::Domain(_)) => "rejected",
            Err(AppError::NotFound { .. }) | Err(AppError::Conflict(_)) => "rejected",
            Err(_) => "error",
        };
        counter!("mediator_requests_total", "request" => name, "outcome" => outcome).increment(1);
        debug!(request = name, outcome, "Request handled");
        result
    }

    /// Publishes events drained from a saved aggregate.
    ///
    /// The change is already committed at this point, so a publishing failure
    /// is logged rather than returned to the caller.
    pub(crate) async fn publish(&self, events: Vec<DomainEvent>) {
        if events.is_empty() {
            return;
        }
        if let Err(e) = self.events.publish(&events).await {
            warn!(error = %e, count = events.len(), "Failed to publish domain events");
        }
    }
}

/// Runs `attempt` again from a fresh load when another writer saved the
/// same aggregate first. Used by commands whose intent does not depend on
/// the state the client saw, such as taking a seat.
pub(crate) async fn retry_stale_writes<T, F, Fut>(mut attempt: F) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let mut tries = 1;
    loop {
        match attempt().await {
            Err(AppError::Database(DatabaseError::StaleWrite(reason)))
                if tries < MAX_WRITE_ATTEMPTS =>
            {
                debug!(attempt = tries, %reason, "Concurrent write, retrying");
                counter!("stale_write_retries_total").increment(1);
                tries += 1;
            }
            result => return result,
        }
    }
}

/// `student_tracker::app::students::CreateStudent` -> `CreateStudent`
fn request_name<R>() -> &'static str {
    let full = type_name::<R>();
    full.rsplit("::").next().unwrap_or(full)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockProvider, RecordingEventPublisher, mock_repos};

    struct Ping(u32);

    impl Request for Ping {
        type Response = u32;
    }

    #[async_trait]
    impl Handler<Ping> for Mediator {
        async fn handle(&self, request: Ping) -> Result<u32, AppError> {
            if request.0 == 0 {
                return Err(AppError::Internal("zero".to_string()));
            }
            Ok(request.0 * 2)
        }
    }

    fn mediator() -> (Mediator, Arc<RecordingEventPublisher>) {
        let mock = Arc::new(MockProvider::new());
        let events = Arc::new(RecordingEventPublisher::new());
        (Mediator::new(mock_repos(&mock), events.clone()), events)
    }

    #[tokio::test]
    async fn test_send_dispatches_to_handler() {
        let (mediator, _) = mediator();
        assert_eq!(mediator.send(Ping(21)).await.unwrap(), 42);
        assert!(matches!(
            mediator.send(Ping(0)).await,
            Err(AppError::Internal(_))
        ));
    }

    #[test]
    fn test_request_name_is_short() {
        assert_eq!(request_name::<Ping>(), "Ping");
    }

    #[tokio::test]
    async fn test_retry_stale_writes_gives_up_after_limit() {
        let mut calls = 0;
        let result: Result<(), AppError> = retry_stale_writes(|| {
            calls += 1;
            async { Err(AppError::Database(DatabaseError::StaleWrite("row".into()))) }
        })
        .await;
        assert!(matches!(
            result,
            Err(AppError::Database(DatabaseError::StaleWrite(_)))
        ));
        assert_eq!(calls, MAX_WRITE_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_retry_stale_writes_does_not_retry_other_errors() {
        let mut calls = 0;
        let result: Result<(), AppError> = retry_stale_writes(|| {
            calls += 1;
            async { Err(AppError::Conflict("taken".into())) }
        })
        .await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_publish_skips_empty_batches() {
        let (mediator, events) = mediator();
        mediator.publish(Vec::new()).await;
        assert_eq!(events.publish_calls(), 0);
    }

    #[tokio::test]
    async fn test_publish_failure_is_swallowed() {
        let mock = Arc::new(MockProvider::new());
        let events = Arc::new(RecordingEventPublisher::failing());
        let mediator = Mediator::new(mock_repos(&mock), events.clone());

        mediator
            .publish(vec![DomainEvent::CourseCapacityReached {
                course_id: crate::domain::CourseId::new(),
                max_enrollment: 1,
                occurred_at: chrono::Utc::now(),
            }])
            .await;
        assert!(events.events().is_empty());
        assert_eq!(events.publish_calls(), 1);
    }
}
