//! Course commands, queries and their handlers, including enrollment.

use async_trait::async_trait;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::dto::CourseDto;
use super::mediator::{Handler, Mediator, Request, retry_stale_writes};
use crate::domain::{
    AppError, Course, CourseCode, CourseDetails, CourseFilter, CourseId, CourseLevel,
    CourseSchedule, CourseSortField, CourseStatus, Credits, DayOfWeek, DomainError, FieldErrors,
    PageRequest, PagedResult, SortDirection, StudentId, ValidationError,
};

// ============================================================================
// Inputs
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleInput {
    pub days: Vec<DayOfWeek>,
    #[schema(value_type = String, example = "09:00:00")]
    pub start_time: NaiveTime,
    #[schema(value_type = String, example = "10:15:00")]
    pub end_time: NaiveTime,
    pub room: Option<String>,
}

impl ScheduleInput {
    fn into_schedule(self) -> Result<CourseSchedule, ValidationError> {
        CourseSchedule::new(
            &self.days,
            self.start_time,
            self.end_time,
            self.room.as_deref(),
        )
    }
}

/// Editable course attributes shared by create and update.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseInput {
    pub title: String,
    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub description: Option<String>,
    #[validate(range(min = 1, max = 6, message = "must be between 1 and 6"))]
    pub credits: i64,
    /// Defaults to the level suggested by the course number.
    pub level: Option<CourseLevel>,
    #[validate(range(min = 1, max = 500, message = "must be between 1 and 500"))]
    pub max_enrollment: i64,
    pub schedule: Option<ScheduleInput>,
}

impl CourseInput {
    pub fn into_details(self) -> Result<CourseDetails, ValidationError> {
        let mut errors = FieldErrors::new();
        let credits = errors.capture(Credits::new(self.credits));
        let schedule = match self.schedule {
            Some(input) => errors.capture(input.into_schedule()).map(Some),
            None => Some(None),
        };
        errors.into_result()?;

        match (credits, schedule) {
            (Some(credits), Some(schedule)) => CourseDetails::new(
                &self.title,
                self.description.as_deref(),
                credits,
                self.level,
                self.max_enrollment,
                schedule,
            ),
            _ => Err(ValidationError::InvalidFormat("course".to_string())),
        }
    }
}

// ============================================================================
// Commands
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCourse {
    /// Catalog code such as `CS101`; spaces and hyphens are ignored.
    pub code: String,
    #[serde(flatten)]
    pub details: CourseInput,
}

impl Request for CreateCourse {
    type Response = CourseDto;
}

#[derive(Debug, Clone)]
pub struct UpdateCourse {
    pub id: CourseId,
    pub details: CourseInput,
}

impl Request for UpdateCourse {
    type Response = CourseDto;
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CourseStatusInput {
    pub status: CourseStatus,
}

#[derive(Debug, Clone)]
pub struct ChangeCourseStatus {
    pub id: CourseId,
    pub status: CourseStatus,
}

impl Request for ChangeCourseStatus {
    type Response = CourseDto;
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentInput {
    pub student_id: StudentId,
}

#[derive(Debug, Clone)]
pub struct EnrollInCourse {
    pub course_id: CourseId,
    pub student_id: StudentId,
}

impl Request for EnrollInCourse {
    type Response = CourseDto;
}

#[derive(Debug, Clone)]
pub struct DropFromCourse {
    pub course_id: CourseId,
    pub student_id: StudentId,
}

impl Request for DropFromCourse {
    type Response = ();
}

#[derive(Debug, Clone)]
pub struct DeleteCourse {
    pub id: CourseId,
}

impl Request for DeleteCourse {
    type Response = ();
}

// ============================================================================
// Queries
// ============================================================================

#[derive(Debug, Clone)]
pub struct GetCourse {
    pub id: CourseId,
}

impl Request for GetCourse {
    type Response = CourseDto;
}

/// Query-string parameters for listing courses.
#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListCourses {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    /// Case-insensitive match on title or code.
    pub search: Option<String>,
    pub status: Option<String>,
    pub level: Option<String>,
    pub has_available_seats: Option<bool>,
    /// `title`, `code`, `credits` or `createdAt`.
    pub sort_by: Option<String>,
    pub sort_direction: Option<String>,
}

impl ListCourses {
    pub fn into_filter(self) -> Result<(CourseFilter, PageRequest), ValidationError> {
        let mut errors = FieldErrors::new();
        let page = errors.capture(PageRequest::new(self.page, self.page_size));
        let status = errors.capture(
            self.status
                .as_deref()
                .map(str::parse::<CourseStatus>)
                .transpose(),
        );
        let level = errors.capture(
            self.level
                .as_deref()
                .map(str::parse::<CourseLevel>)
                .transpose(),
        );
        let sort_by = errors.capture(
            self.sort_by
                .as_deref()
                .map(str::parse::<CourseSortField>)
                .transpose(),
        );
        let sort_direction = errors.capture(
            self.sort_direction
                .as_deref()
                .map(str::parse::<SortDirection>)
                .transpose(),
        );
        errors.into_result()?;

        let filter = CourseFilter {
            search: self.search,
            status: status.flatten(),
            level: level.flatten(),
            has_available_seats: self.has_available_seats,
            sort_by: sort_by.flatten().unwrap_or_default(),
            sort_direction: sort_direction.flatten().unwrap_or_default(),
        };
        Ok((filter, page.unwrap_or_default()))
    }
}

impl Request for ListCourses {
    type Response = PagedResult<CourseDto>;
}

// ============================================================================
// Handlers
// ============================================================================

impl Mediator {
    pub(crate) async fn load_course(&self, id: CourseId) -> Result<Course, AppError> {
        self.courses
            .get(id)
            .await?
            .ok_or_else(|| AppError::not_found("Course", id))
    }

    async fn save_course(&self, mut course: Course) -> Result<CourseDto, AppError> {
        self.courses.update(&course).await?;
        self.publish(course.take_events()).await;
        Ok(CourseDto::from(&course))
    }

    async fn enroll(
        &self,
        course_id: CourseId,
        student_id: StudentId,
    ) -> Result<CourseDto, AppError> {
        let mut course = self.load_course(course_id).await?;
        let student = self
            .students
            .get(student_id)
            .await?
            .ok_or_else(|| AppError::not_found("Student", student_id))?;
        if !student.is_active() {
            return Err(DomainError::StudentNotActive(student.id().to_string()).into());
        }

        course.enroll_student(student.id())?;
        self.save_course(course).await
    }

    async fn drop_enrollment(
        &self,
        course_id: CourseId,
        student_id: StudentId,
    ) -> Result<(), AppError> {
        let mut course = self.load_course(course_id).await?;
        if self.students.get(student_id).await?.is_none() {
            return Err(AppError::not_found("Student", student_id));
        }

        course.drop_student(student_id)?;
        self.save_course(course).await?;
        Ok(())
    }
}

#[async_trait]
impl Handler<CreateCourse> for Mediator {
    #[instrument(skip(self, request), fields(course_code = %request.code))]
    async fn handle(&self, request: CreateCourse) -> Result<CourseDto, AppError> {
        request.details.validate()?;
        let mut errors = FieldErrors::new();
        let code = errors.capture(CourseCode::parse(&request.code));
        let details = errors.capture(request.details.into_details());
        errors.into_result()?;
        let (Some(code), Some(details)) = (code, details) else {
            return Err(ValidationError::InvalidFormat("course".to_string()).into());
        };

        if self.courses.code_exists(&code, None).await? {
            return Err(AppError::Conflict(format!(
                "A course with code '{}' already exists",
                code
            )));
        }

        let mut course = Course::new(code, details);
        self.courses.add(&course).await?;
        info!(course_id = %course.id(), "Course created");

        self.publish(course.take_events()).await;
        Ok(CourseDto::from(&course))
    }
}

#[async_trait]
impl Handler<UpdateCourse> for Mediator {
    #[instrument(skip(self, request), fields(course_id = %request.id))]
    async fn handle(&self, request: UpdateCourse) -> Result<CourseDto, AppError> {
        request.details.validate()?;
        let details = request.details.into_details()?;
        let mut course = self.load_course(request.id).await?;
        course.update_details(details)?;
        self.save_course(course).await
    }
}

#[async_trait]
impl Handler<ChangeCourseStatus> for Mediator {
    #[instrument(skip(self), fields(course_id = %request.id, status = %request.status))]
    async fn handle(&self, request: ChangeCourseStatus) -> Result<CourseDto, AppError> {
        let mut course = self.load_course(request.id).await?;
        course.change_status(request.status)?;
        self.save_course(course).await
    }
}

#[async_trait]
impl Handler<EnrollInCourse> for Mediator {
    #[instrument(skip(self), fields(course_id = %request.course_id, student_id = %request.student_id))]
    async fn handle(&self, request: EnrollInCourse) -> Result<CourseDto, AppError> {
        retry_stale_writes(|| self.enroll(request.course_id, request.student_id)).await
    }
}

#[async_trait]
impl Handler<DropFromCourse> for Mediator {
    #[instrument(skip(self), fields(course_id = %request.course_id, student_id = %request.student_id))]
    async fn handle(&self, request: DropFromCourse) -> Result<(), AppError> {
        retry_stale_writes(|| self.drop_enrollment(request.course_id, request.student_id)).await
    }
}

#[async_trait]
impl Handler<DeleteCourse> for Mediator {
    #[instrument(skip(self), fields(course_id = %request.id))]
    async fn handle(&self, request: DeleteCourse) -> Result<(), AppError> {
        let course = self.load_course(request.id).await?;
        course.ensure_deletable()?;
        if !self.courses.delete(course.id()).await? {
            return Err(AppError::not_found("Course", request.id));
        }
        info!("Course deleted");
        Ok(())
    }
}

#[async_trait]
impl Handler<GetCourse> for Mediator {
    #[instrument(skip(self), fields(course_id = %request.id))]
    async fn handle(&self, request: GetCourse) -> Result<CourseDto, AppError> {
        let course = self.load_course(request.id).await?;
        Ok(CourseDto::from(&course))
    }
}

#[async_trait]
impl Handler<ListCourses> for Mediator {
    #[instrument(skip(self, request))]
    async fn handle(&self, request: ListCourses) -> Result<PagedResult<CourseDto>, AppError> {
        let (filter, page) = request.into_filter()?;
        let courses = self.courses.list(&filter, page).await?;
        Ok(courses.map(|c| CourseDto::from(&c)))
    }
}
