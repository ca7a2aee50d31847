//! Additional integration tests for specific request flows.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use secrecy::SecretString;
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

use student_tracker::api::{RateLimitConfig, create_router, create_router_with_rate_limit};
use student_tracker::app::{AppState, StudentDto};
use student_tracker::domain::{ErrorResponse, PagedResult};
use student_tracker::test_utils::{MockProvider, RecordingEventPublisher, mock_repos};

fn create_test_state() -> (AppState, Arc<MockProvider>) {
    let mock = Arc::new(MockProvider::new());
    let state = AppState::new(mock_repos(&mock), Arc::new(RecordingEventPublisher::new()));
    (state, mock)
}

fn secured_router() -> (Router, Arc<MockProvider>) {
    let (state, mock) = create_test_state();
    let state = state.with_api_key(Some(SecretString::from("s3cret-key".to_string())));
    (create_router(Arc::new(state)), mock)
}

fn create_student_request(api_key: Option<&str>) -> Request<Body> {
    let payload = json!({
        "firstName": "Katherine",
        "lastName": "Johnson",
        "email": "katherine@nasa.gov",
        "dateOfBirth": "2002-08-26"
    });
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/students")
        .header("Content-Type", "application/json");
    if let Some(key) = api_key {
        builder = builder.header("x-api-key", key);
    }
    builder.body(Body::from(payload.to_string())).unwrap()
}

#[tokio::test]
async fn test_full_student_lifecycle_flow() {
    let (state, _mock) = create_test_state();
    let router = create_router(Arc::new(state));

    // 1. POST - Create student
    let create_response = router
        .clone()
        .oneshot(create_student_request(None))
        .await
        .unwrap();
    assert_eq!(create_response.status(), StatusCode::CREATED);

    let body_bytes = create_response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes();
    let created: StudentDto = serde_json::from_slice(&body_bytes).unwrap();
    let student_id = created.id;
    assert_eq!(created.status.to_string(), "active");

    // 2. PUT - Update the profile
    let update_request = Request::builder()
        .method("PUT")
        .uri(format!("/api/students/{}", student_id))
        .header("Content-Type", "application/json")
        .body(Body::from(
            json!({
                "firstName": "Katherine",
                "middleName": "Coleman",
                "lastName": "Johnson",
                "email": "kjohnson@nasa.gov",
                "dateOfBirth": "2002-08-26"
            })
            .to_string(),
        ))
        .unwrap();

    let update_response = router.clone().oneshot(update_request).await.unwrap();
    assert_eq!(update_response.status(), StatusCode::OK);

    let body_bytes = update_response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes();
    let updated: StudentDto = serde_json::from_slice(&body_bytes).unwrap();
    assert_eq!(updated.id, student_id);
    assert_eq!(updated.email, "kjohnson@nasa.gov");
    assert_eq!(updated.full_name, "Katherine Coleman Johnson");
    assert_eq!(updated.initials, "K.C.J.");

    // 3. GET - List students and verify the change is visible
    let list_request = Request::builder()
        .method("GET")
        .uri("/api/students?search=kjohnson")
        .body(Body::empty())
        .unwrap();

    let list_response = router.clone().oneshot(list_request).await.unwrap();
    assert_eq!(list_response.status(), StatusCode::OK);

    let body_bytes = list_response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes();
    let page: PagedResult<StudentDto> = serde_json::from_slice(&body_bytes).unwrap();
    assert_eq!(page.total_count, 1);
    assert_eq!(page.items[0].id, student_id);

    // 4. DELETE - Remove the student
    let delete_request = Request::builder()
        .method("DELETE")
        .uri(format!("/api/students/{}", student_id))
        .body(Body::empty())
        .unwrap();

    let delete_response = router.clone().oneshot(delete_request).await.unwrap();
    assert_eq!(delete_response.status(), StatusCode::NO_CONTENT);

    // 5. DELETE again - already gone
    let delete_request = Request::builder()
        .method("DELETE")
        .uri(format!("/api/students/{}", student_id))
        .body(Body::empty())
        .unwrap();

    let delete_response = router.oneshot(delete_request).await.unwrap();
    assert_eq!(delete_response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_mutation_without_api_key_is_rejected() {
    let (router, mock) = secured_router();

    let response = router.oneshot(create_student_request(None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let error: ErrorResponse = serde_json::from_slice(&body_bytes).unwrap();
    assert!(!error.message.is_empty());
    assert_eq!(mock.student_count(), 0);
}

#[tokio::test]
async fn test_mutation_with_wrong_api_key_is_rejected() {
    let (router, mock) = secured_router();

    let response = router
        .oneshot(create_student_request(Some("not-the-key")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(mock.student_count(), 0);
}

#[tokio::test]
async fn test_mutation_with_api_key_succeeds() {
    let (router, mock) = secured_router();

    let response = router
        .oneshot(create_student_request(Some("s3cret-key")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(mock.student_count(), 1);
}

#[tokio::test]
async fn test_reads_do_not_need_api_key() {
    let (router, _mock) = secured_router();

    let request = Request::builder()
        .method("GET")
        .uri("/api/courses")
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_rate_limited_requests_get_error_envelope() {
    let (state, _mock) = create_test_state();
    let config = RateLimitConfig {
        general_rps: 1,
        general_burst: 1,
        ..RateLimitConfig::default()
    };
    let router = create_router_with_rate_limit(Arc::new(state), config);

    let request = || {
        Request::builder()
            .method("GET")
            .uri("/api/teachers")
            .header("x-forwarded-for", "203.0.113.9")
            .body(Body::empty())
            .unwrap()
    };

    let first = router.clone().oneshot(request()).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = router.oneshot(request()).await.unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(second.headers().contains_key("retry-after"));

    let body_bytes = second.into_body().collect().await.unwrap().to_bytes();
    let error: ErrorResponse = serde_json::from_slice(&body_bytes).unwrap();
    assert!(error.message.starts_with("Rate limit exceeded"));
}
