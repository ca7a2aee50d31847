//! Application error types with proper error chaining.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Error, Debug, Clone)]
pub enum DatabaseError {
    #[error("Connection failed: {0}")]
    Connection(String),
    #[error("Query execution failed: {0}")]
    Query(String),
    #[error("Record not found: {0}")]
    NotFound(String),
    #[error("Duplicate record: {0}")]
    Duplicate(String),
    #[error("Pool exhausted: {0}")]
    PoolExhausted(String),
    #[error("Migration failed: {0}")]
    Migration(String),
    #[error("Corrupt row: {0}")]
    CorruptRow(String),
    /// A versioned update lost the race to another writer.
    #[error("Stale write: {0}")]
    StaleWrite(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
    #[error("Parse error: {0}")]
    ParseError(String),
}

impl From<&str> for ConfigError {
    fn from(s: &str) -> Self {
        ConfigError::ParseError(s.to_string())
    }
}

/// A single field-level validation failure, as reported to API clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum ValidationError {
    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },
    #[error("Missing required field: {0}")]
    MissingField(String),
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
    #[error("Validation failed: {}", summarize(.0))]
    Fields(Vec<FieldError>),
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationError::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Flattens the error into the field list shown in the error envelope.
    pub fn field_errors(&self) -> Vec<FieldError> {
        match self {
            ValidationError::InvalidField { field, message } => {
                vec![FieldError::new(field.clone(), message.clone())]
            }
            ValidationError::MissingField(field) => {
                vec![FieldError::new(field.clone(), "is required")]
            }
            ValidationError::InvalidFormat(_) => Vec::new(),
            ValidationError::Fields(errors) => errors.clone(),
        }
    }

    /// Rewrites the field names with a prefix, e.g. `street` -> `address.street`.
    pub fn prefixed(self, prefix: &str) -> Self {
        match self {
            ValidationError::InvalidField { field, message } => ValidationError::InvalidField {
                field: format!("{prefix}.{field}"),
                message,
            },
            ValidationError::MissingField(field) => {
                ValidationError::MissingField(format!("{prefix}.{field}"))
            }
            ValidationError::Fields(errors) => ValidationError::Fields(
                errors
                    .into_iter()
                    .map(|e| FieldError::new(format!("{prefix}.{}", e.field), e.message))
                    .collect(),
            ),
            other => other,
        }
    }
}

impl From<&str> for ValidationError {
    fn from(s: &str) -> Self {
        ValidationError::InvalidFormat(s.to_string())
    }
}

/// Accumulates field errors so a request reports every problem at once.
#[derive(Debug, Default)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps the value on success, records the failure otherwise.
    pub fn capture<T>(&mut self, result: Result<T, ValidationError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                let fields = err.field_errors();
                if fields.is_empty() {
                    self.0.push(FieldError::new("request", err.to_string()));
                } else {
                    self.0.extend(fields);
                }
                None
            }
        }
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError::new(field, message));
    }

    pub fn extend(&mut self, errors: validator::ValidationErrors) {
        self.0.extend(flatten_validator_errors(&errors));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_result(self) -> Result<(), ValidationError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::Fields(self.0))
        }
    }
}

fn flatten_validator_errors(errors: &validator::ValidationErrors) -> Vec<FieldError> {
    let mut out: Vec<FieldError> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("is invalid ({})", e.code));
                FieldError::new(camel_case(field), message)
            })
        })
        .collect();
    out.sort_by(|a, b| a.field.cmp(&b.field));
    out
}

/// Request structs use snake_case fields but clients see camelCase names.
fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Violations of aggregate invariants that are not tied to a single input field.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Cannot change status from '{from}' to '{to}'")]
    InvalidStatusTransition { from: String, to: String },
    #[error("Course {0} is not open for enrollment")]
    CourseNotOpen(String),
    #[error("Course {0} is full")]
    CourseFull(String),
    #[error("Course {0} has no enrolled students")]
    NoEnrollments(String),
    #[error("Student {student} is already enrolled in course {course}")]
    AlreadyEnrolled { course: String, student: String },
    #[error("Student {student} is not enrolled in course {course}")]
    NotEnrolled { course: String, student: String },
    #[error("Capacity {requested} is below current enrollment of {enrolled}")]
    CapacityBelowEnrollment { requested: u32, enrolled: u32 },
    #[error("Course {0} still has enrolled students")]
    CourseHasEnrollments(String),
    #[error("Student {0} is not active")]
    StudentNotActive(String),
    #[error("Teacher is already assigned to course {0}")]
    AlreadyAssigned(String),
    #[error("Teacher is not assigned to course {0}")]
    NotAssigned(String),
    #[error("Teacher has reached the maximum course load of {0}")]
    CourseLoadExceeded(u8),
    #[error("Course load limit {requested} is below current load of {assigned}")]
    CourseLoadBelowAssigned { requested: u8, assigned: usize },
    #[error("Promotion must move to a higher title than '{0}'")]
    NotAPromotion(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("{entity} '{id}' was not found")]
    NotFound { entity: &'static str, id: String },
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Authentication failed: {0}")]
    Authentication(String),
    #[error("Deserialization error: {0}")]
    Deserialization(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Internal error: {0}")]
    Internal(String),
    #[error("Rate limit exceeded")]
    RateLimited,
}

impl AppError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        AppError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(ValidationError::Fields(flatten_validator_errors(&err)))
    }
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DatabaseError::NotFound("Row not found".to_string()),
            sqlx::Error::PoolTimedOut => DatabaseError::PoolExhausted("Pool timed out".to_string()),
            sqlx::Error::Database(db_err) => {
                if db_err.code().is_some_and(|code| code == "23505") {
                    return DatabaseError::Duplicate(db_err.message().to_string());
                }
                // A referenced row vanished between load and save.
                if db_err.code().is_some_and(|code| code == "23503") {
                    return DatabaseError::StaleWrite(db_err.message().to_string());
                }
                DatabaseError::Query(db_err.message().to_string())
            }
            _ => DatabaseError::Query(err.to_string()),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(DatabaseError::from(err))
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::Database(DatabaseError::Migration(err.to_string()))
    }
}
