//! `/api/students` endpoints.

use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};

use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::app::AppState;
use crate::app::dto::StudentDto;
use crate::app::students::{
    ChangeStudentStatus, CreateStudent, DeleteStudent, GetStudent, GpaInput, ListStudents,
    StudentProfileInput, StudentStatusInput, UpdateStudent, UpdateStudentGpa,
};
use crate::domain::{AppError, ErrorResponse, PagedResult, StudentId};

/// List students
#[utoipa::path(
    get,
    path = "/api/students",
    tag = "students",
    params(ListStudents),
    responses(
        (status = 200, description = "One page of students", body = PagedResult<StudentDto>),
        (status = 400, description = "Invalid filter or paging parameters", body = ErrorResponse)
    )
)]
pub async fn list_students(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<ListStudents>,
) -> Result<Json<PagedResult<StudentDto>>, AppError> {
    Ok(Json(state.mediator.send(query).await?))
}

/// Get a student by id
#[utoipa::path(
    get,
    path = "/api/students/{id}",
    tag = "students",
    params(("id" = String, Path, description = "Student id")),
    responses(
        (status = 200, description = "Student found", body = StudentDto),
        (status = 404, description = "Student not found", body = ErrorResponse)
    )
)]
pub async fn get_student(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<StudentId>,
) -> Result<Json<StudentDto>, AppError> {
    Ok(Json(state.mediator.send(GetStudent { id }).await?))
}

/// Register a student
#[utoipa::path(
    post,
    path = "/api/students",
    tag = "students",
    request_body = CreateStudent,
    responses(
        (status = 201, description = "Student created", body = StudentDto),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 401, description = "Missing or invalid API key", body = ErrorResponse),
        (status = 409, description = "Email already in use", body = ErrorResponse)
    )
)]
pub async fn create_student(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<CreateStudent>,
) -> Result<impl IntoResponse, AppError> {
    let student = state.mediator.send(request).await?;
    let location = format!("/api/students/{}", student.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(student),
    ))
}

/// Replace a student's profile
#[utoipa::path(
    put,
    path = "/api/students/{id}",
    tag = "students",
    params(("id" = String, Path, description = "Student id")),
    request_body = StudentProfileInput,
    responses(
        (status = 200, description = "Student updated", body = StudentDto),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 404, description = "Student not found", body = ErrorResponse),
        (status = 409, description = "Email already in use", body = ErrorResponse)
    )
)]
pub async fn update_student(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<StudentId>,
    ApiJson(profile): ApiJson<StudentProfileInput>,
) -> Result<Json<StudentDto>, AppError> {
    Ok(Json(
        state.mediator.send(UpdateStudent { id, profile }).await?,
    ))
}

/// Record a student's GPA
#[utoipa::path(
    put,
    path = "/api/students/{id}/gpa",
    tag = "students",
    params(("id" = String, Path, description = "Student id")),
    request_body = GpaInput,
    responses(
        (status = 200, description = "GPA updated", body = StudentDto),
        (status = 400, description = "GPA out of range", body = ErrorResponse),
        (status = 404, description = "Student not found", body = ErrorResponse)
    )
)]
pub async fn update_student_gpa(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<StudentId>,
    ApiJson(input): ApiJson<GpaInput>,
) -> Result<Json<StudentDto>, AppError> {
    Ok(Json(
        state
            .mediator
            .send(UpdateStudentGpa { id, gpa: input.gpa })
            .await?,
    ))
}

/// Change a student's status
#[utoipa::path(
    put,
    path = "/api/students/{id}/status",
    tag = "students",
    params(("id" = String, Path, description = "Student id")),
    request_body = StudentStatusInput,
    responses(
        (status = 200, description = "Status changed", body = StudentDto),
        (status = 400, description = "Transition not allowed", body = ErrorResponse),
        (status = 404, description = "Student not found", body = ErrorResponse)
    )
)]
pub async fn change_student_status(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<StudentId>,
    ApiJson(input): ApiJson<StudentStatusInput>,
) -> Result<Json<StudentDto>, AppError> {
    Ok(Json(
        state
            .mediator
            .send(ChangeStudentStatus {
                id,
                status: input.status,
            })
            .await?,
    ))
}

/// Delete a student
#[utoipa::path(
    delete,
    path = "/api/students/{id}",
    tag = "students",
    params(("id" = String, Path, description = "Student id")),
    responses(
        (status = 204, description = "Student deleted"),
        (status = 404, description = "Student not found", body = ErrorResponse)
    )
)]
pub async fn delete_student(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<StudentId>,
) -> Result<StatusCode, AppError> {
    state.mediator.send(DeleteStudent { id }).await?;
    Ok(StatusCode::NO_CONTENT)
}
