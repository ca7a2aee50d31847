//! `/api/courses` endpoints, including enrollment.

use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};

use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::app::AppState;
use crate::app::courses::{
    ChangeCourseStatus, CourseInput, CourseStatusInput, CreateCourse, DeleteCourse,
    DropFromCourse, EnrollInCourse, EnrollmentInput, GetCourse, ListCourses, UpdateCourse,
};
use crate::app::dto::CourseDto;
use crate::domain::{AppError, CourseId, ErrorResponse, PagedResult, StudentId};

/// List courses
#[utoipa::path(
    get,
    path = "/api/courses",
    tag = "courses",
    params(ListCourses),
    responses(
        (status = 200, description = "One page of courses", body = PagedResult<CourseDto>),
        (status = 400, description = "Invalid filter or paging parameters", body = ErrorResponse)
    )
)]
pub async fn list_courses(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<ListCourses>,
) -> Result<Json<PagedResult<CourseDto>>, AppError> {
    Ok(Json(state.mediator.send(query).await?))
}

/// Get a course by id
#[utoipa::path(
    get,
    path = "/api/courses/{id}",
    tag = "courses",
    params(("id" = String, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course found", body = CourseDto),
        (status = 404, description = "Course not found", body = ErrorResponse)
    )
)]
pub async fn get_course(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<CourseId>,
) -> Result<Json<CourseDto>, AppError> {
    Ok(Json(state.mediator.send(GetCourse { id }).await?))
}

/// Create a course in `draft` status
#[utoipa::path(
    post,
    path = "/api/courses",
    tag = "courses",
    request_body = CreateCourse,
    responses(
        (status = 201, description = "Course created", body = CourseDto),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 401, description = "Missing or invalid API key", body = ErrorResponse),
        (status = 409, description = "Course code already in use", body = ErrorResponse)
    )
)]
pub async fn create_course(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<CreateCourse>,
) -> Result<impl IntoResponse, AppError> {
    let course = state.mediator.send(request).await?;
    let location = format!("/api/courses/{}", course.id);
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(course)))
}

/// Replace a course's details
#[utoipa::path(
    put,
    path = "/api/courses/{id}",
    tag = "courses",
    params(("id" = String, Path, description = "Course id")),
    request_body = CourseInput,
    responses(
        (status = 200, description = "Course updated", body = CourseDto),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse)
    )
)]
pub async fn update_course(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<CourseId>,
    ApiJson(details): ApiJson<CourseInput>,
) -> Result<Json<CourseDto>, AppError> {
    Ok(Json(
        state.mediator.send(UpdateCourse { id, details }).await?,
    ))
}

/// Change a course's status
#[utoipa::path(
    put,
    path = "/api/courses/{id}/status",
    tag = "courses",
    params(("id" = String, Path, description = "Course id")),
    request_body = CourseStatusInput,
    responses(
        (status = 200, description = "Status changed", body = CourseDto),
        (status = 400, description = "Transition not allowed", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse)
    )
)]
pub async fn change_course_status(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<CourseId>,
    ApiJson(input): ApiJson<CourseStatusInput>,
) -> Result<Json<CourseDto>, AppError> {
    Ok(Json(
        state
            .mediator
            .send(ChangeCourseStatus {
                id,
                status: input.status,
            })
            .await?,
    ))
}

/// Enroll an active student in an active course
#[utoipa::path(
    post,
    path = "/api/courses/{id}/enrollments",
    tag = "courses",
    params(("id" = String, Path, description = "Course id")),
    request_body = EnrollmentInput,
    responses(
        (status = 200, description = "Student enrolled", body = CourseDto),
        (status = 400, description = "Course full, not active, or student not active", body = ErrorResponse),
        (status = 404, description = "Course or student not found", body = ErrorResponse)
    )
)]
pub async fn enroll_student(
    State(state): State<Arc<AppState>>,
    ApiPath(course_id): ApiPath<CourseId>,
    ApiJson(input): ApiJson<EnrollmentInput>,
) -> Result<Json<CourseDto>, AppError> {
    Ok(Json(
        state
            .mediator
            .send(EnrollInCourse {
                course_id,
                student_id: input.student_id,
            })
            .await?,
    ))
}

/// Drop a student from a course
#[utoipa::path(
    delete,
    path = "/api/courses/{id}/enrollments/{student_id}",
    tag = "courses",
    params(
        ("id" = String, Path, description = "Course id"),
        ("student_id" = String, Path, description = "Student id")
    ),
    responses(
        (status = 204, description = "Enrollment dropped"),
        (status = 400, description = "Course has no enrollments", body = ErrorResponse),
        (status = 404, description = "Course or student not found", body = ErrorResponse)
    )
)]
pub async fn drop_student(
    State(state): State<Arc<AppState>>,
    ApiPath((course_id, student_id)): ApiPath<(CourseId, StudentId)>,
) -> Result<StatusCode, AppError> {
    state
        .mediator
        .send(DropFromCourse {
            course_id,
            student_id,
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete a course without enrollments
#[utoipa::path(
    delete,
    path = "/api/courses/{id}",
    tag = "courses",
    params(("id" = String, Path, description = "Course id")),
    responses(
        (status = 204, description = "Course deleted"),
        (status = 400, description = "Course still has enrolled students", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse)
    )
)]
pub async fn delete_course(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<CourseId>,
) -> Result<StatusCode, AppError> {
    state.mediator.send(DeleteCourse { id }).await?;
    Ok(StatusCode::NO_CONTENT)
}
