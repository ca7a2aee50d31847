//! Infrastructure layer implementations.

pub mod database;
pub mod observability;

pub use database::{
    PostgresClient, PostgresConfig, PostgresCourseRepository, PostgresStudentRepository,
    PostgresTeacherRepository,
};
pub use observability::{LogFormat, PrometheusHandle, init_metrics, init_tracing};
