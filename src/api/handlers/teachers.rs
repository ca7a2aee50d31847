//! `/api/teachers` endpoints, including course assignment.

use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};

use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::app::AppState;
use crate::app::dto::TeacherDto;
use crate::app::teachers::{
    AssignCourse, AssignmentInput, CreateTeacher, DeleteTeacher, GetTeacher, ListTeachers,
    PromoteTeacher, TeacherProfileInput, TeacherTitleInput, UnassignCourse, UpdateTeacher,
};
use crate::domain::{AppError, CourseId, ErrorResponse, PagedResult, TeacherId};

/// List teachers
#[utoipa::path(
    get,
    path = "/api/teachers",
    tag = "teachers",
    params(ListTeachers),
    responses(
        (status = 200, description = "One page of teachers", body = PagedResult<TeacherDto>),
        (status = 400, description = "Invalid filter or paging parameters", body = ErrorResponse)
    )
)]
pub async fn list_teachers(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<ListTeachers>,
) -> Result<Json<PagedResult<TeacherDto>>, AppError> {
    Ok(Json(state.mediator.send(query).await?))
}

/// Get a teacher by id
#[utoipa::path(
    get,
    path = "/api/teachers/{id}",
    tag = "teachers",
    params(("id" = String, Path, description = "Teacher id")),
    responses(
        (status = 200, description = "Teacher found", body = TeacherDto),
        (status = 404, description = "Teacher not found", body = ErrorResponse)
    )
)]
pub async fn get_teacher(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<TeacherId>,
) -> Result<Json<TeacherDto>, AppError> {
    Ok(Json(state.mediator.send(GetTeacher { id }).await?))
}

/// Hire a teacher
#[utoipa::path(
    post,
    path = "/api/teachers",
    tag = "teachers",
    request_body = CreateTeacher,
    responses(
        (status = 201, description = "Teacher hired", body = TeacherDto),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 401, description = "Missing or invalid API key", body = ErrorResponse),
        (status = 409, description = "Email or employee id already in use", body = ErrorResponse)
    )
)]
pub async fn create_teacher(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<CreateTeacher>,
) -> Result<impl IntoResponse, AppError> {
    let teacher = state.mediator.send(request).await?;
    let location = format!("/api/teachers/{}", teacher.id);
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(teacher)))
}

/// Replace a teacher's profile
#[utoipa::path(
    put,
    path = "/api/teachers/{id}",
    tag = "teachers",
    params(("id" = String, Path, description = "Teacher id")),
    request_body = TeacherProfileInput,
    responses(
        (status = 200, description = "Teacher updated", body = TeacherDto),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 404, description = "Teacher not found", body = ErrorResponse),
        (status = 409, description = "Email already in use", body = ErrorResponse)
    )
)]
pub async fn update_teacher(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<TeacherId>,
    ApiJson(profile): ApiJson<TeacherProfileInput>,
) -> Result<Json<TeacherDto>, AppError> {
    Ok(Json(
        state.mediator.send(UpdateTeacher { id, profile }).await?,
    ))
}

/// Promote a teacher to a higher title
#[utoipa::path(
    put,
    path = "/api/teachers/{id}/title",
    tag = "teachers",
    params(("id" = String, Path, description = "Teacher id")),
    request_body = TeacherTitleInput,
    responses(
        (status = 200, description = "Teacher promoted", body = TeacherDto),
        (status = 400, description = "Not a promotion", body = ErrorResponse),
        (status = 404, description = "Teacher not found", body = ErrorResponse)
    )
)]
pub async fn promote_teacher(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<TeacherId>,
    ApiJson(input): ApiJson<TeacherTitleInput>,
) -> Result<Json<TeacherDto>, AppError> {
    Ok(Json(
        state
            .mediator
            .send(PromoteTeacher {
                id,
                title: input.title,
            })
            .await?,
    ))
}

/// Assign a course to a teacher
#[utoipa::path(
    post,
    path = "/api/teachers/{id}/courses",
    tag = "teachers",
    params(("id" = String, Path, description = "Teacher id")),
    request_body = AssignmentInput,
    responses(
        (status = 200, description = "Course assigned", body = TeacherDto),
        (status = 400, description = "Course load exceeded, already assigned, or course closed", body = ErrorResponse),
        (status = 404, description = "Teacher or course not found", body = ErrorResponse)
    )
)]
pub async fn assign_course(
    State(state): State<Arc<AppState>>,
    ApiPath(teacher_id): ApiPath<TeacherId>,
    ApiJson(input): ApiJson<AssignmentInput>,
) -> Result<Json<TeacherDto>, AppError> {
    Ok(Json(
        state
            .mediator
            .send(AssignCourse {
                teacher_id,
                course_id: input.course_id,
            })
            .await?,
    ))
}

/// Remove a course from a teacher
#[utoipa::path(
    delete,
    path = "/api/teachers/{id}/courses/{course_id}",
    tag = "teachers",
    params(
        ("id" = String, Path, description = "Teacher id"),
        ("course_id" = String, Path, description = "Course id")
    ),
    responses(
        (status = 204, description = "Course unassigned"),
        (status = 400, description = "Course not assigned to this teacher", body = ErrorResponse),
        (status = 404, description = "Teacher not found", body = ErrorResponse)
    )
)]
pub async fn unassign_course(
    State(state): State<Arc<AppState>>,
    ApiPath((teacher_id, course_id)): ApiPath<(TeacherId, CourseId)>,
) -> Result<StatusCode, AppError> {
    state
        .mediator
        .send(UnassignCourse {
            teacher_id,
            course_id,
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete a teacher
#[utoipa::path(
    delete,
    path = "/api/teachers/{id}",
    tag = "teachers",
    params(("id" = String, Path, description = "Teacher id")),
    responses(
        (status = 204, description = "Teacher deleted"),
        (status = 404, description = "Teacher not found", body = ErrorResponse)
    )
)]
pub async fn delete_teacher(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<TeacherId>,
) -> Result<StatusCode, AppError> {
    state.mediator.send(DeleteTeacher { id }).await?;
    Ok(StatusCode::NO_CONTENT)
}
