//! Domain traits defining contracts for persistence and event delivery.

use async_trait::async_trait;

use super::course::Course;
use super::error::AppError;
use super::events::DomainEvent;
use super::ids::{CourseId, StudentId, TeacherId};
use super::student::Student;
use super::teacher::Teacher;
use super::types::{CourseFilter, PageRequest, PagedResult, StudentFilter, TeacherFilter};
use super::value_objects::{CourseCode, Email, EmployeeId};

/// Connectivity check for a backing store.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn health_check(&self) -> Result<(), AppError>;
}

/// Persistence for the `Student` aggregate, including its address.
#[async_trait]
pub trait StudentRepository: Send + Sync {
    async fn get(&self, id: StudentId) -> Result<Option<Student>, AppError>;

    /// Whether another student already uses `email`. `excluding` skips the
    /// student being updated.
    async fn email_exists(
        &self,
        email: &Email,
        excluding: Option<StudentId>,
    ) -> Result<bool, AppError>;

    async fn add(&self, student: &Student) -> Result<(), AppError>;

    async fn update(&self, student: &Student) -> Result<(), AppError>;

    /// Returns `false` when no student had that id.
    async fn delete(&self, id: StudentId) -> Result<bool, AppError>;

    async fn list(
        &self,
        filter: &StudentFilter,
        page: PageRequest,
    ) -> Result<PagedResult<Student>, AppError>;
}

/// Persistence for the `Course` aggregate, including its schedule.
#[async_trait]
pub trait CourseRepository: Send + Sync {
    async fn get(&self, id: CourseId) -> Result<Option<Course>, AppError>;

    async fn code_exists(
        &self,
        code: &CourseCode,
        excluding: Option<CourseId>,
    ) -> Result<bool, AppError>;

    async fn add(&self, course: &Course) -> Result<(), AppError>;

    async fn update(&self, course: &Course) -> Result<(), AppError>;

    async fn delete(&self, id: CourseId) -> Result<bool, AppError>;

    async fn list(
        &self,
        filter: &CourseFilter,
        page: PageRequest,
    ) -> Result<PagedResult<Course>, AppError>;
}

/// Persistence for the `Teacher` aggregate, including course assignments.
#[async_trait]
pub trait TeacherRepository: Send + Sync {
    async fn get(&self, id: TeacherId) -> Result<Option<Teacher>, AppError>;

    async fn email_exists(
        &self,
        email: &Email,
        excluding: Option<TeacherId>,
    ) -> Result<bool, AppError>;

    async fn employee_id_exists(&self, employee_id: &EmployeeId) -> Result<bool, AppError>;

    async fn add(&self, teacher: &Teacher) -> Result<(), AppError>;

    async fn update(&self, teacher: &Teacher) -> Result<(), AppError>;

    async fn delete(&self, id: TeacherId) -> Result<bool, AppError>;

    async fn list(
        &self,
        filter: &TeacherFilter,
        page: PageRequest,
    ) -> Result<PagedResult<Teacher>, AppError>;
}

/// Delivers domain events once the change that raised them is saved.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, events: &[DomainEvent]) -> Result<(), AppError>;
}
