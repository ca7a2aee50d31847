//! PostgreSQL adapters for the domain repository traits.
//!
//! Each repository owns a clone of the pool held by [`PostgresClient`]
//! and writes an aggregate together with its child rows in one
//! transaction.

mod courses;
pub mod postgres;
mod students;
mod teachers;

pub use courses::PostgresCourseRepository;
pub use postgres::{PostgresClient, PostgresConfig};
pub use students::PostgresStudentRepository;
pub use teachers::PostgresTeacherRepository;
