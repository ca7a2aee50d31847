//! Application layer: one request type per use case, dispatched through
//! the [`Mediator`], plus the shared state handed to the HTTP layer.

pub mod courses;
pub mod dto;
pub mod events;
pub mod health;
pub mod mediator;
pub mod state;
pub mod students;
pub mod teachers;

pub use dto::{AddressDto, CourseDto, ScheduleDto, StudentDto, TeacherDto};
pub use events::TracingEventPublisher;
pub use health::CheckHealth;
pub use mediator::{Handler, Mediator, Repositories, Request};
pub use state::AppState;
