//! Student Tracker
//!
//! A REST service for managing students, courses and teachers, built on
//! trait-based abstraction and dependency injection so every layer can be
//! tested in isolation.
//!
//! # Architecture Overview
//!
//! This crate is organized into four main layers:
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                   API Layer                  │
//! │  HTTP handlers, routing, auth, rate limiting │
//! ├─────────────────────────────────────────────┤
//! │               Application Layer              │
//! │  Commands, queries and the mediator routing  │
//! ├─────────────────────────────────────────────┤
//! │                 Domain Layer                 │
//! │  Aggregates, value objects, events, traits   │
//! ├─────────────────────────────────────────────┤
//! │             Infrastructure Layer             │
//! │  PostgreSQL repositories, logging, metrics   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Key Features
//!
//! - **Trait-based persistence**: handlers reach storage only through the
//!   repository traits in [`domain::traits`]
//! - **Mediator**: every use case is a typed request dispatched through
//!   [`app::Mediator`]
//! - **Domain events**: aggregates record events that are published after a
//!   successful save
//! - **Validation**: `validator` derives on DTOs plus self-validating value
//!   objects, reported as per-field errors
//! - **Logging**: Structured logging with `tracing`
//! - **Security**: optional API key kept in a `secrecy::SecretString`
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use student_tracker::api::create_router;
//! use student_tracker::app::{AppState, Repositories, TracingEventPublisher};
//! use student_tracker::infra::{
//!     PostgresClient, PostgresCourseRepository, PostgresStudentRepository,
//!     PostgresTeacherRepository,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let db = PostgresClient::new(&database_url, Default::default()).await?;
//!     let pool = db.pool().clone();
//!     let repositories = Repositories {
//!         students: Arc::new(PostgresStudentRepository::new(pool.clone())),
//!         courses: Arc::new(PostgresCourseRepository::new(pool.clone())),
//!         teachers: Arc::new(PostgresTeacherRepository::new(pool)),
//!         health: Arc::new(db),
//!     };
//!
//!     let state = Arc::new(AppState::new(repositories, Arc::new(TracingEventPublisher::new())));
//!     axum::serve(listener, create_router(state)).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod app;
pub mod config;
pub mod domain;
pub mod infra;

// Test utilities are available in tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
