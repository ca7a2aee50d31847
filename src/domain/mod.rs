//! Domain layer: value objects, aggregates, events and the contracts the
//! outer layers implement.

pub mod course;
pub mod error;
pub mod events;
pub mod ids;
pub mod student;
pub mod teacher;
pub mod traits;
pub mod types;
pub mod value_objects;

pub use course::{Course, CourseDetails, CourseRecord, CourseStatus};
pub use error::{
    AppError, ConfigError, DatabaseError, DomainError, FieldError, FieldErrors, ValidationError,
};
pub use events::DomainEvent;
pub use ids::{CourseId, StudentId, TeacherId};
pub use student::{Student, StudentProfile, StudentRecord, StudentStatus};
pub use teacher::{Teacher, TeacherProfile, TeacherRecord, TeacherTitle};
pub use traits::{
    CourseRepository, EventPublisher, HealthCheck, StudentRepository, TeacherRepository,
};
pub use types::{
    CourseFilter, CourseSortField, ErrorResponse, HealthResponse, HealthStatus, PageRequest,
    PagedResult, SortDirection, StudentFilter, StudentSortField, TeacherFilter, TeacherSortField,
};
pub use value_objects::{
    AcademicStanding, Address, CourseCode, CourseLevel, CourseSchedule, Credits, DayOfWeek, Email,
    EmailDomainKind, EmployeeId, FullName, Gpa, PhoneNumber,
};
