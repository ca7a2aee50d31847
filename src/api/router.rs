//! HTTP routing configuration with rate limiting and OpenAPI documentation.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderValue, Method, Request, Response, StatusCode, header},
    middleware::{self, Next},
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use governor::{
    Quota, RateLimiter,
    clock::{Clock, DefaultClock},
    state::keyed::DashMapStateStore,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::app::AppState;
use crate::config::CorsOrigins;
use crate::domain::ErrorResponse;

use super::handlers::{ApiDoc, courses, health, students, teachers};
use super::middleware::auth_middleware;

/// Rate limiter configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Requests per second for `/api` endpoints
    pub general_rps: u32,
    /// Burst size for `/api` endpoints
    pub general_burst: u32,
    /// Requests per second for health endpoints
    pub health_rps: u32,
    /// Burst size for health endpoints
    pub health_burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            general_rps: 10,
            general_burst: 20,
            health_rps: 100,
            health_burst: 100,
        }
    }
}

/// Everything about the router that varies between deployments.
#[derive(Debug, Clone)]
pub struct RouterOptions {
    /// `None` disables rate limiting.
    pub rate_limit: Option<RateLimitConfig>,
    pub cors: CorsOrigins,
    pub request_timeout: Duration,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            rate_limit: None,
            cors: CorsOrigins::Any,
            request_timeout: Duration::from_secs(30),
        }
    }
}

type KeyedLimiter = RateLimiter<IpAddr, DashMapStateStore<IpAddr>, DefaultClock>;

/// How often idle per-client limiter entries are dropped.
const LIMITER_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// Shared rate limiter state, keyed by client IP.
pub struct RateLimitState {
    api_limiter: KeyedLimiter,
    health_limiter: KeyedLimiter,
    config: RateLimitConfig,
}

impl RateLimitState {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            api_limiter: RateLimiter::dashmap(quota(config.general_rps, config.general_burst)),
            health_limiter: RateLimiter::dashmap(quota(config.health_rps, config.health_burst)),
            config,
        }
    }

    /// Drops clients whose buckets have refilled completely.
    pub fn retain_recent(&self) {
        self.api_limiter.retain_recent();
        self.api_limiter.shrink_to_fit();
        self.health_limiter.retain_recent();
        self.health_limiter.shrink_to_fit();
    }

    /// Clients currently tracked across both limiters.
    pub fn tracked_clients(&self) -> usize {
        self.api_limiter.len() + self.health_limiter.len()
    }
}

/// Prunes `state` every `period` until the router that owns it is dropped.
fn spawn_limiter_pruning(state: &Arc<RateLimitState>, period: Duration) {
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        warn!("No Tokio runtime, rate limiter state will not be pruned");
        return;
    };
    let state = Arc::downgrade(state);
    runtime.spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let Some(state) = state.upgrade() else {
                break;
            };
            state.retain_recent();
            debug!(clients = state.tracked_clients(), "Pruned rate limiter state");
        }
    });
}

/// Zero rates are raised to one rather than rejected.
fn quota(rps: u32, burst: u32) -> Quota {
    let rps = NonZeroU32::new(rps).unwrap_or(NonZeroU32::MIN);
    let burst = NonZeroU32::new(burst).unwrap_or(NonZeroU32::MIN);
    Quota::per_second(rps).allow_burst(burst)
}

/// Extract client IP from request (X-Forwarded-For, X-Real-IP, or ConnectInfo).
/// Unknown clients share one bucket keyed on 0.0.0.0.
fn client_ip_from_request<B>(request: &Request<B>) -> IpAddr {
    let header_ip = |name: &str| {
        request
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|first| first.trim().parse::<IpAddr>().ok())
    };

    if let Some(ip) = header_ip("x-forwarded-for").or_else(|| header_ip("x-real-ip")) {
        return ip;
    }
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip();
    }
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn too_many_requests(retry_after: u64, message: &str) -> Response<Body> {
    let mut response =
        (StatusCode::TOO_MANY_REQUESTS, Json(ErrorResponse::new(message))).into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
    response
}

/// Rate limit middleware for `/api` endpoints
async fn rate_limit_api_middleware(
    State(rate_limit): State<Arc<RateLimitState>>,
    request: Request<Body>,
    next: Next,
) -> Response<Body> {
    let client_ip = client_ip_from_request(&request);
    let limit = HeaderValue::from(rate_limit.config.general_rps);
    match rate_limit.api_limiter.check_key(&client_ip) {
        Ok(_) => {
            let mut response = next.run(request).await;
            response.headers_mut().insert("X-RateLimit-Limit", limit);
            response
        }
        Err(not_until) => {
            let retry_after = not_until
                .wait_time_from(DefaultClock::default().now())
                .as_secs()
                .max(1);
            warn!(client_ip = %client_ip, "Rate limit exceeded");

            let mut response = too_many_requests(
                retry_after,
                "Rate limit exceeded. Please slow down your requests.",
            );
            let headers = response.headers_mut();
            headers.insert("X-RateLimit-Limit", limit);
            headers.insert("X-RateLimit-Remaining", HeaderValue::from(0u32));
            response
        }
    }
}

/// Rate limit middleware for health endpoints
async fn rate_limit_health_middleware(
    State(rate_limit): State<Arc<RateLimitState>>,
    request: Request<Body>,
    next: Next,
) -> Response<Body> {
    let client_ip = client_ip_from_request(&request);
    match rate_limit.health_limiter.check_key(&client_ip) {
        Ok(_) => next.run(request).await,
        Err(not_until) => {
            let retry_after = not_until
                .wait_time_from(DefaultClock::default().now())
                .as_secs()
                .max(1);
            too_many_requests(retry_after, "Rate limit exceeded")
        }
    }
}

fn cors_layer(origins: &CorsOrigins) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::HeaderName::from_static("x-api-key"),
        ]);

    match origins {
        CorsOrigins::Any => layer.allow_origin(Any),
        CorsOrigins::List(list) => {
            let values: Vec<HeaderValue> = list
                .iter()
                .filter_map(|origin| match HeaderValue::from_str(origin) {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!(origin = %origin, "Ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            layer.allow_origin(AllowOrigin::list(values))
        }
    }
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/students",
            get(students::list_students).post(students::create_student),
        )
        .route(
            "/students/{id}",
            get(students::get_student)
                .put(students::update_student)
                .delete(students::delete_student),
        )
        .route("/students/{id}/gpa", put(students::update_student_gpa))
        .route(
            "/students/{id}/status",
            put(students::change_student_status),
        )
        .route(
            "/courses",
            get(courses::list_courses).post(courses::create_course),
        )
        .route(
            "/courses/{id}",
            get(courses::get_course)
                .put(courses::update_course)
                .delete(courses::delete_course),
        )
        .route("/courses/{id}/status", put(courses::change_course_status))
        .route("/courses/{id}/enrollments", post(courses::enroll_student))
        .route(
            "/courses/{id}/enrollments/{student_id}",
            delete(courses::drop_student),
        )
        .route(
            "/teachers",
            get(teachers::list_teachers).post(teachers::create_teacher),
        )
        .route(
            "/teachers/{id}",
            get(teachers::get_teacher)
                .put(teachers::update_teacher)
                .delete(teachers::delete_teacher),
        )
        .route("/teachers/{id}/title", put(teachers::promote_teacher))
        .route("/teachers/{id}/courses", post(teachers::assign_course))
        .route(
            "/teachers/{id}/courses/{course_id}",
            delete(teachers::unassign_course),
        )
}

fn health_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(health::health_check_handler))
        .route("/live", get(health::liveness_handler))
        .route("/ready", get(health::readiness_handler))
}

/// Builds the full application router.
pub fn build_router(app_state: Arc<AppState>, options: RouterOptions) -> Router {
    let layers = ServiceBuilder::new()
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            options.request_timeout,
        ))
        .layer(cors_layer(&options.cors));

    let mut api = api_routes().layer(middleware::from_fn_with_state(
        Arc::clone(&app_state),
        auth_middleware,
    ));
    let mut health = health_routes();

    if let Some(config) = options.rate_limit {
        let rate_limit_state = Arc::new(RateLimitState::new(config));
        spawn_limiter_pruning(&rate_limit_state, LIMITER_PRUNE_INTERVAL);
        api = api.layer(middleware::from_fn_with_state(
            Arc::clone(&rate_limit_state),
            rate_limit_api_middleware,
        ));
        health = health.layer(middleware::from_fn_with_state(
            rate_limit_state,
            rate_limit_health_middleware,
        ));
    }

    Router::new()
        .nest("/api", api)
        .nest("/health", health)
        .route("/metrics", get(health::metrics_handler))
        .layer(layers)
        .with_state(app_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

/// Create router without rate limiting
pub fn create_router(app_state: Arc<AppState>) -> Router {
    build_router(app_state, RouterOptions::default())
}

/// Create router with rate limiting enabled
pub fn create_router_with_rate_limit(app_state: Arc<AppState>, config: RateLimitConfig) -> Router {
    build_router(
        app_state,
        RouterOptions {
            rate_limit: Some(config),
            ..RouterOptions::default()
        },
    )
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode},
        middleware,
        response::IntoResponse,
        routing::get,
    };
    use std::sync::Arc;
    use tower::ServiceExt;

    use super::*;

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    mod rate_limit_config_tests {
        use super::*;

        #[test]
        fn test_rate_limit_config_default() {
            let config = RateLimitConfig::default();
            assert_eq!(config.general_rps, 10);
            assert_eq!(config.general_burst, 20);
            assert_eq!(config.health_rps, 100);
            assert_eq!(config.health_burst, 100);
        }

        #[test]
        fn test_zero_quota_is_raised_to_one() {
            let state = RateLimitState::new(RateLimitConfig {
                general_rps: 0,
                general_burst: 0,
                health_rps: 0,
                health_burst: 0,
            });
            let ip = IpAddr::V4(Ipv4Addr::LOCALHOST);
            assert!(state.api_limiter.check_key(&ip).is_ok());
            assert!(state.api_limiter.check_key(&ip).is_err());
        }

        fn fast_refill() -> RateLimitState {
            RateLimitState::new(RateLimitConfig {
                general_rps: 1000,
                general_burst: 1,
                health_rps: 1000,
                health_burst: 1,
            })
        }

        #[test]
        fn test_retain_recent_drops_idle_clients() {
            let state = fast_refill();
            for last in 1..=50u8 {
                let ip = IpAddr::V4(Ipv4Addr::new(203, 0, 113, last));
                assert!(state.api_limiter.check_key(&ip).is_ok());
            }
            assert!(state.health_limiter.check_key(&IpAddr::V4(Ipv4Addr::LOCALHOST)).is_ok());
            assert_eq!(state.tracked_clients(), 51);

            std::thread::sleep(Duration::from_millis(20));
            state.retain_recent();
            assert_eq!(state.tracked_clients(), 0);
        }

        #[tokio::test]
        async fn test_pruning_task_runs_on_interval() {
            let state = Arc::new(fast_refill());
            assert!(state.api_limiter.check_key(&IpAddr::V4(Ipv4Addr::LOCALHOST)).is_ok());
            spawn_limiter_pruning(&state, Duration::from_millis(10));

            tokio::time::sleep(Duration::from_millis(50)).await;
            assert_eq!(state.tracked_clients(), 0);
        }
    }

    mod client_ip_tests {
        use super::*;

        #[test]
        fn test_forwarded_for_takes_first_address() {
            let request = Request::builder()
                .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
                .body(())
                .unwrap();
            assert_eq!(
                client_ip_from_request(&request),
                "203.0.113.7".parse::<IpAddr>().unwrap()
            );
        }

        #[test]
        fn test_connect_info_fallback() {
            let mut request = Request::builder().body(()).unwrap();
            let addr: SocketAddr = "192.0.2.1:5000".parse().unwrap();
            request.extensions_mut().insert(ConnectInfo(addr));
            assert_eq!(client_ip_from_request(&request), addr.ip());
        }

        #[test]
        fn test_unknown_client_shares_bucket() {
            let request = Request::builder().body(()).unwrap();
            assert_eq!(
                client_ip_from_request(&request),
                IpAddr::V4(Ipv4Addr::UNSPECIFIED)
            );
        }
    }

    mod middleware_tests {
        use super::*;
        use http_body_util::BodyExt;

        async fn dummy_handler() -> impl IntoResponse {
            StatusCode::OK
        }

        fn limited_app(config: RateLimitConfig, health: bool) -> Router {
            let state = Arc::new(RateLimitState::new(config));
            let router = Router::new().route("/", get(dummy_handler));
            if health {
                router.layer(middleware::from_fn_with_state(
                    state,
                    rate_limit_health_middleware,
                ))
            } else {
                router.layer(middleware::from_fn_with_state(
                    state,
                    rate_limit_api_middleware,
                ))
            }
        }

        fn strict() -> RateLimitConfig {
            RateLimitConfig {
                general_rps: 1,
                general_burst: 1,
                ..Default::default()
            }
        }

        #[tokio::test]
        async fn test_rate_limit_success_includes_limit_header() {
            let app = limited_app(
                RateLimitConfig {
                    general_rps: 100,
                    general_burst: 100,
                    ..Default::default()
                },
                false,
            );
            let response = app.oneshot(get_request("/")).await.unwrap();

            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response.headers().get("X-RateLimit-Limit").unwrap(), "100");
        }

        #[tokio::test]
        async fn test_rate_limit_exceeded_includes_headers_and_envelope() {
            let app = limited_app(strict(), false);
            app.clone().oneshot(get_request("/")).await.unwrap();

            let response = app.oneshot(get_request("/")).await.unwrap();
            assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
            assert!(response.headers().contains_key("X-RateLimit-Limit"));
            assert!(response.headers().contains_key("Retry-After"));
            assert_eq!(
                response.headers().get("X-RateLimit-Remaining").unwrap(),
                "0"
            );

            let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
            let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
            assert!(body["message"].as_str().unwrap().contains("slow down"));
            assert!(body["timestamp"].is_string());
        }

        #[tokio::test]
        async fn test_health_rate_limit_allows_high_volume() {
            let app = limited_app(strict(), true);
            for _ in 0..10 {
                let response = app.clone().oneshot(get_request("/")).await.unwrap();
                assert_eq!(response.status(), StatusCode::OK);
            }
        }

        #[tokio::test]
        async fn test_health_rate_limit_eventually_blocks() {
            let app = limited_app(
                RateLimitConfig {
                    health_rps: 1,
                    health_burst: 1,
                    ..Default::default()
                },
                true,
            );
            let first = app.clone().oneshot(get_request("/")).await.unwrap();
            assert_eq!(first.status(), StatusCode::OK);

            let second = app.oneshot(get_request("/")).await.unwrap();
            assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
            assert!(second.headers().contains_key("Retry-After"));
        }

        #[tokio::test]
        async fn test_rate_limit_is_per_ip() {
            let app = limited_app(strict(), false);
            let from = |ip: &str| {
                Request::builder()
                    .uri("/")
                    .header("X-Forwarded-For", ip)
                    .body(Body::empty())
                    .unwrap()
            };

            app.clone().oneshot(from("192.168.1.1")).await.unwrap();
            let blocked = app.clone().oneshot(from("192.168.1.1")).await.unwrap();
            assert_eq!(blocked.status(), StatusCode::TOO_MANY_REQUESTS);

            let other = app.oneshot(from("10.0.0.1")).await.unwrap();
            assert_eq!(other.status(), StatusCode::OK);
        }
    }

    mod router_tests {
        use super::*;
        use crate::app::AppState;

        #[tokio::test]
        async fn test_health_routes() {
            for uri in ["/health", "/health/live", "/health/ready"] {
                let router = create_router(AppState::new_for_test());
                let res = router.oneshot(get_request(uri)).await.unwrap();
                assert_eq!(res.status(), StatusCode::OK, "{uri}");
            }
        }

        #[tokio::test]
        async fn test_unknown_student_is_not_found() {
            let router = create_router(AppState::new_for_test());
            let uri = format!("/api/students/{}", uuid::Uuid::new_v4());
            let res = router.oneshot(get_request(&uri)).await.unwrap();
            assert_eq!(res.status(), StatusCode::NOT_FOUND);
        }

        #[tokio::test]
        async fn test_malformed_id_is_bad_request() {
            let router = create_router(AppState::new_for_test());
            let res = router
                .oneshot(get_request("/api/courses/not-a-uuid"))
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        }

        #[tokio::test]
        async fn test_metrics_without_recorder_is_not_found() {
            let router = create_router(AppState::new_for_test());
            let res = router.oneshot(get_request("/metrics")).await.unwrap();
            assert_eq!(res.status(), StatusCode::NOT_FOUND);
        }

        #[tokio::test]
        async fn test_router_with_rate_limit_applies_limits() {
            let router = create_router_with_rate_limit(
                AppState::new_for_test(),
                RateLimitConfig {
                    general_rps: 1,
                    general_burst: 1,
                    health_rps: 100,
                    health_burst: 100,
                },
            );

            let res = router
                .clone()
                .oneshot(get_request("/api/teachers"))
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::OK);

            let res = router
                .clone()
                .oneshot(get_request("/api/teachers"))
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);

            let res = router.oneshot(get_request("/health/live")).await.unwrap();
            assert_eq!(res.status(), StatusCode::OK);
        }

        #[tokio::test]
        async fn test_cors_preflight_is_answered() {
            let router = build_router(
                AppState::new_for_test(),
                RouterOptions {
                    cors: CorsOrigins::List(vec!["http://localhost:5173".to_string()]),
                    ..RouterOptions::default()
                },
            );
            let res = router
                .oneshot(
                    Request::builder()
                        .method("OPTIONS")
                        .uri("/api/students")
                        .header("origin", "http://localhost:5173")
                        .header("access-control-request-method", "POST")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(
                res.headers()
                    .get("access-control-allow-origin")
                    .unwrap(),
                "http://localhost:5173"
            );
        }

        #[tokio::test]
        async fn test_router_swagger_ui_accessible() {
            let router = create_router(AppState::new_for_test());
            let res = router.oneshot(get_request("/swagger-ui/")).await.unwrap();
            assert_eq!(res.status(), StatusCode::OK);
        }
    }
}
