//! HTTP request handlers with OpenAPI documentation.
//!
//! Handlers only translate between HTTP and mediator requests; every rule
//! lives in the application and domain layers.

pub mod courses;
pub mod health;
pub mod students;
pub mod teachers;

use utoipa::OpenApi;

use crate::app::courses::{
    CourseInput, CourseStatusInput, CreateCourse, EnrollmentInput, ScheduleInput,
};
use crate::app::dto::{AddressDto, CourseDto, ScheduleDto, StudentDto, TeacherDto};
use crate::app::students::{
    AddressInput, CreateStudent, GpaInput, StudentProfileInput, StudentStatusInput,
};
use crate::app::teachers::{
    AssignmentInput, CreateTeacher, TeacherProfileInput, TeacherTitleInput,
};
use crate::domain::{
    AcademicStanding, CourseLevel, CourseStatus, DayOfWeek, EmailDomainKind, ErrorResponse,
    FieldError, HealthResponse, HealthStatus, PagedResult, StudentStatus, TeacherTitle,
};

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Student Tracker API",
        version = "0.1.0",
        description = "Students, courses and teachers for an educational institution",
        license(
            name = "MIT"
        )
    ),
    paths(
        students::list_students,
        students::get_student,
        students::create_student,
        students::update_student,
        students::update_student_gpa,
        students::change_student_status,
        students::delete_student,
        courses::list_courses,
        courses::get_course,
        courses::create_course,
        courses::update_course,
        courses::change_course_status,
        courses::enroll_student,
        courses::drop_student,
        courses::delete_course,
        teachers::list_teachers,
        teachers::get_teacher,
        teachers::create_teacher,
        teachers::update_teacher,
        teachers::promote_teacher,
        teachers::assign_course,
        teachers::unassign_course,
        teachers::delete_teacher,
        health::health_check_handler,
        health::liveness_handler,
        health::readiness_handler,
        health::metrics_handler,
    ),
    components(
        schemas(
            StudentDto,
            AddressDto,
            CourseDto,
            ScheduleDto,
            TeacherDto,
            CreateStudent,
            StudentProfileInput,
            AddressInput,
            GpaInput,
            StudentStatusInput,
            CreateCourse,
            CourseInput,
            ScheduleInput,
            CourseStatusInput,
            EnrollmentInput,
            CreateTeacher,
            TeacherProfileInput,
            TeacherTitleInput,
            AssignmentInput,
            StudentStatus,
            CourseStatus,
            CourseLevel,
            DayOfWeek,
            TeacherTitle,
            EmailDomainKind,
            AcademicStanding,
            PagedResult<StudentDto>,
            PagedResult<CourseDto>,
            PagedResult<TeacherDto>,
            ErrorResponse,
            FieldError,
            HealthResponse,
            HealthStatus,
        )
    ),
    tags(
        (name = "students", description = "Student records"),
        (name = "courses", description = "Course catalog and enrollment"),
        (name = "teachers", description = "Teaching staff and course assignments"),
        (name = "health", description = "Health and metrics endpoints")
    )
)]
pub struct ApiDoc;
