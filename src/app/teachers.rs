//! Teacher commands, queries and their handlers, including course assignment.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::dto::TeacherDto;
use super::mediator::{Handler, Mediator, Request, retry_stale_writes};
use crate::domain::{
    AppError, CourseId, DomainError, Email, EmployeeId, FieldErrors, FullName, PageRequest,
    PagedResult, SortDirection, Teacher, TeacherFilter, TeacherId, TeacherProfile,
    TeacherSortField, TeacherTitle, ValidationError,
};

// ============================================================================
// Inputs
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeacherProfileInput {
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    #[validate(length(max = 254, message = "must be at most 254 characters"))]
    pub email: String,
    pub department: String,
    /// Defaults to 4.
    #[validate(range(min = 1, max = 8, message = "must be between 1 and 8"))]
    pub max_course_load: Option<i64>,
}

impl TeacherProfileInput {
    pub fn into_profile(self) -> Result<TeacherProfile, ValidationError> {
        let mut errors = FieldErrors::new();
        let name = errors.capture(FullName::parse(
            &self.first_name,
            self.middle_name.as_deref(),
            &self.last_name,
        ));
        let email = errors.capture(Email::parse(&self.email));
        errors.into_result()?;

        match (name, email) {
            (Some(name), Some(email)) => {
                TeacherProfile::new(name, email, &self.department, self.max_course_load)
            }
            _ => Err(ValidationError::InvalidFormat("teacher".to_string())),
        }
    }
}

// ============================================================================
// Commands
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTeacher {
    #[serde(flatten)]
    pub profile: TeacherProfileInput,
    pub employee_id: String,
    pub title: TeacherTitle,
    /// Defaults to today.
    pub hire_date: Option<NaiveDate>,
}

impl Request for CreateTeacher {
    type Response = TeacherDto;
}

#[derive(Debug, Clone)]
pub struct UpdateTeacher {
    pub id: TeacherId,
    pub profile: TeacherProfileInput,
}

impl Request for UpdateTeacher {
    type Response = TeacherDto;
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TeacherTitleInput {
    pub title: TeacherTitle,
}

#[derive(Debug, Clone)]
pub struct PromoteTeacher {
    pub id: TeacherId,
    pub title: TeacherTitle,
}

impl Request for PromoteTeacher {
    type Response = TeacherDto;
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentInput {
    pub course_id: CourseId,
}

#[derive(Debug, Clone)]
pub struct AssignCourse {
    pub teacher_id: TeacherId,
    pub course_id: CourseId,
}

impl Request for AssignCourse {
    type Response = TeacherDto;
}

#[derive(Debug, Clone)]
pub struct UnassignCourse {
    pub teacher_id: TeacherId,
    pub course_id: CourseId,
}

impl Request for UnassignCourse {
    type Response = ();
}

#[derive(Debug, Clone)]
pub struct DeleteTeacher {
    pub id: TeacherId,
}

impl Request for DeleteTeacher {
    type Response = ();
}

// ============================================================================
// Queries
// ============================================================================

#[derive(Debug, Clone)]
pub struct GetTeacher {
    pub id: TeacherId,
}

impl Request for GetTeacher {
    type Response = TeacherDto;
}

/// Query-string parameters for listing teachers.
#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListTeachers {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    /// Case-insensitive match on first name, last name or email.
    pub search: Option<String>,
    pub title: Option<String>,
    pub department: Option<String>,
    /// `name`, `employeeId` or `hireDate`.
    pub sort_by: Option<String>,
    pub sort_direction: Option<String>,
}

impl ListTeachers {
    pub fn into_filter(self) -> Result<(TeacherFilter, PageRequest), ValidationError> {
        let mut errors = FieldErrors::new();
        let page = errors.capture(PageRequest::new(self.page, self.page_size));
        let title = errors.capture(
            self.title
                .as_deref()
                .map(str::parse::<TeacherTitle>)
                .transpose(),
        );
        let sort_by = errors.capture(
            self.sort_by
                .as_deref()
                .map(str::parse::<TeacherSortField>)
                .transpose(),
        );
        let sort_direction = errors.capture(
            self.sort_direction
                .as_deref()
                .map(str::parse::<SortDirection>)
                .transpose(),
        );
        errors.into_result()?;

        let filter = TeacherFilter {
            search: self.search,
            title: title.flatten(),
            department: self.department,
            sort_by: sort_by.flatten().unwrap_or_default(),
            sort_direction: sort_direction.flatten().unwrap_or_default(),
        };
        Ok((filter, page.unwrap_or_default()))
    }
}

impl Request for ListTeachers {
    type Response = PagedResult<TeacherDto>;
}

// ============================================================================
// Handlers
// ============================================================================

impl Mediator {
    async fn load_teacher(&self, id: TeacherId) -> Result<Teacher, AppError> {
        self.teachers
            .get(id)
            .await?
            .ok_or_else(|| AppError::not_found("Teacher", id))
    }

    async fn save_teacher(&self, mut teacher: Teacher) -> Result<TeacherDto, AppError> {
        self.teachers.update(&teacher).await?;
        self.publish(teacher.take_events()).await;
        Ok(TeacherDto::from(&teacher))
    }

    async fn assign(
        &self,
        teacher_id: TeacherId,
        course_id: CourseId,
    ) -> Result<TeacherDto, AppError> {
        let mut teacher = self.load_teacher(teacher_id).await?;
        let course = self.load_course(course_id).await?;
        if course.status().is_terminal() {
            return Err(DomainError::CourseNotOpen(course.code().to_string()).into());
        }

        teacher.assign_course(course.id())?;
        self.save_teacher(teacher).await
    }

    async fn unassign(&self, teacher_id: TeacherId, course_id: CourseId) -> Result<(), AppError> {
        let mut teacher = self.load_teacher(teacher_id).await?;
        teacher.unassign_course(course_id)?;
        self.save_teacher(teacher).await?;
        Ok(())
    }

    async fn ensure_teacher_email_free(
        &self,
        email: &Email,
        excluding: Option<TeacherId>,
    ) -> Result<(), AppError> {
        if self.teachers.email_exists(email, excluding).await? {
            return Err(AppError::Conflict(format!(
                "A teacher with email '{}' already exists",
                email
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Handler<CreateTeacher> for Mediator {
    #[instrument(skip(self, request), fields(employee_id = %request.employee_id))]
    async fn handle(&self, request: CreateTeacher) -> Result<TeacherDto, AppError> {
        request.profile.validate()?;
        let mut errors = FieldErrors::new();
        let employee_id = errors.capture(EmployeeId::parse(&request.employee_id));
        let profile = errors.capture(request.profile.into_profile());
        errors.into_result()?;
        let (Some(employee_id), Some(profile)) = (employee_id, profile) else {
            return Err(ValidationError::InvalidFormat("teacher".to_string()).into());
        };

        if self.teachers.employee_id_exists(&employee_id).await? {
            return Err(AppError::Conflict(format!(
                "A teacher with employee id '{}' already exists",
                employee_id
            )));
        }
        self.ensure_teacher_email_free(profile.email(), None).await?;

        let mut teacher = Teacher::hire(profile, employee_id, request.title, request.hire_date)?;
        self.teachers.add(&teacher).await?;
        info!(teacher_id = %teacher.id(), "Teacher hired");

        self.publish(teacher.take_events()).await;
        Ok(TeacherDto::from(&teacher))
    }
}

#[async_trait]
impl Handler<UpdateTeacher> for Mediator {
    #[instrument(skip(self, request), fields(teacher_id = %request.id))]
    async fn handle(&self, request: UpdateTeacher) -> Result<TeacherDto, AppError> {
        request.profile.validate()?;
        let profile = request.profile.into_profile()?;
        let mut teacher = self.load_teacher(request.id).await?;
        if profile.email() != teacher.email() {
            self.ensure_teacher_email_free(profile.email(), Some(teacher.id()))
                .await?;
        }

        teacher.update_profile(profile)?;
        self.save_teacher(teacher).await
    }
}

#[async_trait]
impl Handler<PromoteTeacher> for Mediator {
    #[instrument(skip(self), fields(teacher_id = %request.id, title = %request.title))]
    async fn handle(&self, request: PromoteTeacher) -> Result<TeacherDto, AppError> {
        let mut teacher = self.load_teacher(request.id).await?;
        teacher.promote(request.title)?;
        self.save_teacher(teacher).await
    }
}

#[async_trait]
impl Handler<AssignCourse> for Mediator {
    #[instrument(skip(self), fields(teacher_id = %request.teacher_id, course_id = %request.course_id))]
    async fn handle(&self, request: AssignCourse) -> Result<TeacherDto, AppError> {
        retry_stale_writes(|| self.assign(request.teacher_id, request.course_id)).await
    }
}

#[async_trait]
impl Handler<UnassignCourse> for Mediator {
    #[instrument(skip(self), fields(teacher_id = %request.teacher_id, course_id = %request.course_id))]
    async fn handle(&self, request: UnassignCourse) -> Result<(), AppError> {
        retry_stale_writes(|| self.unassign(request.teacher_id, request.course_id)).await
    }
}

#[async_trait]
impl Handler<DeleteTeacher> for Mediator {
    #[instrument(skip(self), fields(teacher_id = %request.id))]
    async fn handle(&self, request: DeleteTeacher) -> Result<(), AppError> {
        if !self.teachers.delete(request.id).await? {
            return Err(AppError::not_found("Teacher", request.id));
        }
        info!("Teacher deleted");
        Ok(())
    }
}

#[async_trait]
impl Handler<GetTeacher> for Mediator {
    #[instrument(skip(self), fields(teacher_id = %request.id))]
    async fn handle(&self, request: GetTeacher) -> Result<TeacherDto, AppError> {
        let teacher = self.load_teacher(request.id).await?;
        Ok(TeacherDto::from(&teacher))
    }
}

#[async_trait]
impl Handler<ListTeachers> for Mediator {
    #[instrument(skip(self, request))]
    async fn handle(&self, request: ListTeachers) -> Result<PagedResult<TeacherDto>, AppError> {
        let (filter, page) = request.into_filter()?;
        let teachers = self.teachers.list(&filter, page).await?;
        Ok(teachers.map(|t| TeacherDto::from(&t)))
    }
}
