use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use tracing::{info, warn};

use student_tracker::api::build_router;
use student_tracker::app::{AppState, Repositories, TracingEventPublisher};
use student_tracker::config::AppConfig;
use student_tracker::infra::{
    PostgresClient, PostgresCourseRepository, PostgresStudentRepository,
    PostgresTeacherRepository, init_metrics, init_tracing,
};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; the real environment still applies.
    dotenv().ok();

    let config = AppConfig::from_env().context("invalid configuration")?;
    init_tracing(config.log_format).context("failed to install tracing subscriber")?;
    let metrics = init_metrics().context("failed to install metrics recorder")?;

    let db = PostgresClient::new(&config.database_url, config.database.clone())
        .await
        .context("failed to connect to PostgreSQL")?;
    if config.run_migrations {
        db.run_migrations().await.context("migrations failed")?;
    } else {
        info!("RUN_MIGRATIONS=false, skipping migrations");
    }

    let pool = db.pool().clone();
    let repositories = Repositories {
        students: Arc::new(PostgresStudentRepository::new(pool.clone())),
        courses: Arc::new(PostgresCourseRepository::new(pool.clone())),
        teachers: Arc::new(PostgresTeacherRepository::new(pool)),
        health: Arc::new(db),
    };

    if config.api_auth_key.is_none() {
        warn!("API_AUTH_KEY not set, mutating endpoints are unauthenticated");
    }

    let addr = config.bind_address();
    let options = config.router_options();
    let state = AppState::new(repositories, Arc::new(TracingEventPublisher::new()))
        .with_api_key(config.api_auth_key)
        .with_metrics(metrics);
    let router = build_router(Arc::new(state), options);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "Server listening");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
