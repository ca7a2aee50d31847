//! Student commands, queries and their handlers.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::dto::StudentDto;
use super::mediator::{Handler, Mediator, Request};
use crate::domain::{
    Address, AppError, Email, FieldErrors, FullName, Gpa, PageRequest, PagedResult, PhoneNumber,
    SortDirection, Student, StudentFilter, StudentId, StudentProfile, StudentSortField,
    StudentStatus, ValidationError,
};

// ============================================================================
// Inputs
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddressInput {
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: Option<String>,
}

impl AddressInput {
    fn into_address(self) -> Result<Address, ValidationError> {
        Address::parse(
            &self.street,
            &self.city,
            &self.state,
            &self.postal_code,
            self.country.as_deref(),
        )
        .map_err(|e| e.prefixed("address"))
    }
}

/// Personal details accepted when creating or updating a student.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfileInput {
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    #[validate(length(max = 254, message = "must be at most 254 characters"))]
    pub email: String,
    pub date_of_birth: NaiveDate,
    pub phone: Option<String>,
    pub address: Option<AddressInput>,
}

impl StudentProfileInput {
    /// Builds the domain profile, reporting every invalid field at once.
    pub fn into_profile(self) -> Result<StudentProfile, ValidationError> {
        let mut errors = FieldErrors::new();
        let name = errors.capture(FullName::parse(
            &self.first_name,
            self.middle_name.as_deref(),
            &self.last_name,
        ));
        let email = errors.capture(Email::parse(&self.email));
        let phone = match self.phone.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            Some(raw) => errors.capture(PhoneNumber::parse(raw)).map(Some),
            None => Some(None),
        };
        let address = match self.address {
            Some(input) => errors.capture(input.into_address()).map(Some),
            None => Some(None),
        };
        errors.into_result()?;

        match (name, email, phone, address) {
            (Some(name), Some(email), Some(phone), Some(address)) => Ok(StudentProfile {
                name,
                email,
                date_of_birth: self.date_of_birth,
                phone,
                address,
            }),
            _ => Err(ValidationError::InvalidFormat("student".to_string())),
        }
    }
}

// ============================================================================
// Commands
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateStudent {
    #[serde(flatten)]
    pub profile: StudentProfileInput,
    /// Defaults to today.
    pub enrollment_date: Option<NaiveDate>,
}

impl Request for CreateStudent {
    type Response = StudentDto;
}

#[derive(Debug, Clone)]
pub struct UpdateStudent {
    pub id: StudentId,
    pub profile: StudentProfileInput,
}

impl Request for UpdateStudent {
    type Response = StudentDto;
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct GpaInput {
    #[validate(range(min = 0.0, max = 4.0, message = "must be between 0.0 and 4.0"))]
    pub gpa: f64,
}

#[derive(Debug, Clone)]
pub struct UpdateStudentGpa {
    pub id: StudentId,
    pub gpa: f64,
}

impl Request for UpdateStudentGpa {
    type Response = StudentDto;
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StudentStatusInput {
    pub status: StudentStatus,
}

#[derive(Debug, Clone)]
pub struct ChangeStudentStatus {
    pub id: StudentId,
    pub status: StudentStatus,
}

impl Request for ChangeStudentStatus {
    type Response = StudentDto;
}

#[derive(Debug, Clone)]
pub struct DeleteStudent {
    pub id: StudentId,
}

impl Request for DeleteStudent {
    type Response = ();
}

// ============================================================================
// Queries
// ============================================================================

#[derive(Debug, Clone)]
pub struct GetStudent {
    pub id: StudentId,
}

impl Request for GetStudent {
    type Response = StudentDto;
}

/// Query-string parameters for listing students.
#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListStudents {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    /// Case-insensitive match on first name, last name or email.
    pub search: Option<String>,
    pub status: Option<String>,
    pub min_gpa: Option<f64>,
    pub max_gpa: Option<f64>,
    /// `name`, `email`, `gpa`, `enrollmentDate` or `createdAt`.
    pub sort_by: Option<String>,
    /// `asc` or `desc`.
    pub sort_direction: Option<String>,
}

impl ListStudents {
    pub fn into_filter(self) -> Result<(StudentFilter, PageRequest), ValidationError> {
        let mut errors = FieldErrors::new();
        let page = errors.capture(PageRequest::new(self.page, self.page_size));
        let status = errors.capture(
            self.status
                .as_deref()
                .map(str::parse::<StudentStatus>)
                .transpose(),
        );
        let sort_by = errors.capture(
            self.sort_by
                .as_deref()
                .map(str::parse::<StudentSortField>)
                .transpose(),
        );
        let sort_direction = errors.capture(
            self.sort_direction
                .as_deref()
                .map(str::parse::<SortDirection>)
                .transpose(),
        );
        for (field, value) in [("minGpa", self.min_gpa), ("maxGpa", self.max_gpa)] {
            if value.is_some_and(|v| !(0.0..=4.0).contains(&v)) {
                errors.push(field, "must be between 0.0 and 4.0");
            }
        }
        if let (Some(min), Some(max)) = (self.min_gpa, self.max_gpa) {
            if min > max {
                errors.push("minGpa", "must not be greater than maxGpa");
            }
        }
        errors.into_result()?;

        let filter = StudentFilter {
            search: self.search,
            status: status.flatten(),
            min_gpa: self.min_gpa,
            max_gpa: self.max_gpa,
            sort_by: sort_by.flatten().unwrap_or_default(),
            sort_direction: sort_direction.flatten().unwrap_or_default(),
        };
        Ok((filter, page.unwrap_or_default()))
    }
}

impl Request for ListStudents {
    type Response = PagedResult<StudentDto>;
}

// ============================================================================
// Handlers
// ============================================================================

impl Mediator {
    async fn load_student(&self, id: StudentId) -> Result<Student, AppError> {
        self.students
            .get(id)
            .await?
            .ok_or_else(|| AppError::not_found("Student", id))
    }

    async fn ensure_student_email_free(
        &self,
        email: &Email,
        excluding: Option<StudentId>,
    ) -> Result<(), AppError> {
        if self.students.email_exists(email, excluding).await? {
            return Err(AppError::Conflict(format!(
                "A student with email '{}' already exists",
                email
            )));
        }
        Ok(())
    }

    async fn save_student(&self, mut student: Student) -> Result<StudentDto, AppError> {
        self.students.update(&student).await?;
        self.publish(student.take_events()).await;
        Ok(StudentDto::from(&student))
    }
}

#[async_trait]
impl Handler<CreateStudent> for Mediator {
    #[instrument(skip(self, request), fields(email = %request.profile.email))]
    async fn handle(&self, request: CreateStudent) -> Result<StudentDto, AppError> {
        request.profile.validate()?;
        let profile = request.profile.into_profile()?;
        self.ensure_student_email_free(&profile.email, None).await?;

        let mut student = Student::register(profile, request.enrollment_date)?;
        self.students.add(&student).await?;
        info!(student_id = %student.id(), "Student created");

        self.publish(student.take_events()).await;
        Ok(StudentDto::from(&student))
    }
}

#[async_trait]
impl Handler<UpdateStudent> for Mediator {
    #[instrument(skip(self, request), fields(student_id = %request.id))]
    async fn handle(&self, request: UpdateStudent) -> Result<StudentDto, AppError> {
        request.profile.validate()?;
        let profile = request.profile.into_profile()?;
        let mut student = self.load_student(request.id).await?;
        if profile.email != *student.email() {
            self.ensure_student_email_free(&profile.email, Some(student.id()))
                .await?;
        }

        student.update_profile(profile)?;
        self.save_student(student).await
    }
}

#[async_trait]
impl Handler<UpdateStudentGpa> for Mediator {
    #[instrument(skip(self), fields(student_id = %request.id))]
    async fn handle(&self, request: UpdateStudentGpa) -> Result<StudentDto, AppError> {
        let gpa = Gpa::new(request.gpa)?;
        let mut student = self.load_student(request.id).await?;
        student.update_gpa(gpa);
        self.save_student(student).await
    }
}

#[async_trait]
impl Handler<ChangeStudentStatus> for Mediator {
    #[instrument(skip(self), fields(student_id = %request.id, status = %request.status))]
    async fn handle(&self, request: ChangeStudentStatus) -> Result<StudentDto, AppError> {
        let mut student = self.load_student(request.id).await?;
        student.change_status(request.status)?;
        self.save_student(student).await
    }
}

#[async_trait]
impl Handler<DeleteStudent> for Mediator {
    #[instrument(skip(self), fields(student_id = %request.id))]
    async fn handle(&self, request: DeleteStudent) -> Result<(), AppError> {
        if !self.students.delete(request.id).await? {
            return Err(AppError::not_found("Student", request.id));
        }
        info!("Student deleted");
        Ok(())
    }
}

#[async_trait]
impl Handler<GetStudent> for Mediator {
    #[instrument(skip(self), fields(student_id = %request.id))]
    async fn handle(&self, request: GetStudent) -> Result<StudentDto, AppError> {
        let student = self.load_student(request.id).await?;
        Ok(StudentDto::from(&student))
    }
}

#[async_trait]
impl Handler<ListStudents> for Mediator {
    #[instrument(skip(self, request))]
    async fn handle(&self, request: ListStudents) -> Result<PagedResult<StudentDto>, AppError> {
        let (filter, page) = request.into_filter()?;
        let students = self.students.list(&filter, page).await?;
        Ok(students.map(|s| StudentDto::from(&s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DomainError;
    use crate::test_utils::{MockConfig, MockProvider, RecordingEventPublisher, mock_repos};
    use chrono::{Months, Utc};
    use std::sync::Arc;

    fn setup() -> (Mediator, Arc<MockProvider>, Arc<RecordingEventPublisher>) {
        let mock = Arc::new(MockProvider::new());
        let events = Arc::new(RecordingEventPublisher::new());
        let mediator = Mediator::new(mock_repos(&mock), events.clone());
        (mediator, mock, events)
    }

    fn profile(email: &str) -> StudentProfileInput {
        StudentProfileInput {
            first_name: "jane".to_string(),
            middle_name: None,
            last_name: "doe".to_string(),
            email: email.to_string(),
            date_of_birth: Utc::now()
                .date_naive()
                .checked_sub_months(Months::new(12 * 20))
                .unwrap(),
            phone: Some("555-234-5678".to_string()),
            address: None,
        }
    }

    fn create(email: &str) -> CreateStudent {
        CreateStudent {
            profile: profile(email),
            enrollment_date: None,
        }
    }

    #[tokio::test]
    async fn test_create_student_normalizes_and_publishes() {
        let (mediator, mock, events) = setup();
        let dto = mediator.send(create("Jane@Example.EDU")).await.unwrap();

        assert_eq!(dto.full_name, "Jane Doe");
        assert_eq!(dto.email, "jane@example.edu");
        assert_eq!(dto.phone.as_deref(), Some("5552345678"));
        assert_eq!(dto.status, StudentStatus::Active);
        assert_eq!(mock.student_count(), 1);
        assert_eq!(events.event_names(), vec!["student_created"]);
    }

    #[tokio::test]
    async fn test_create_student_duplicate_email_conflicts() {
        let (mediator, _, events) = setup();
        mediator.send(create("jane@example.edu")).await.unwrap();

        let err = mediator.send(create("JANE@example.edu")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(events.events().len(), 1);
    }

    #[tokio::test]
    async fn test_create_student_reports_all_field_errors() {
        let (mediator, mock, _) = setup();
        let mut input = create("not-an-email");
        input.profile.first_name = "".to_string();
        input.profile.phone = Some("123".to_string());
        input.profile.address = Some(AddressInput {
            street: "1 Main St".to_string(),
            city: "Springfield".to_string(),
            state: "Illinois".to_string(),
            postal_code: "62704".to_string(),
            country: None,
        });

        let err = mediator.send(input).await.unwrap_err();
        let AppError::Validation(err) = err else {
            panic!("expected validation error, got {err:?}");
        };
        let fields: Vec<_> = err.field_errors().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["firstName", "email", "phone", "address.state"]);
        assert_eq!(mock.student_count(), 0);
    }

    #[tokio::test]
    async fn test_update_student_email_change() {
        let (mediator, _, events) = setup();
        let created = mediator.send(create("jane@example.edu")).await.unwrap();
        mediator.send(create("john@example.edu")).await.unwrap();

        let err = mediator
            .send(UpdateStudent {
                id: created.id,
                profile: profile("john@example.edu"),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let updated = mediator
            .send(UpdateStudent {
                id: created.id,
                profile: profile("jane.doe@gmail.com"),
            })
            .await
            .unwrap();
        assert_eq!(updated.email, "jane.doe@gmail.com");
        assert_eq!(events.event_names().last(), Some(&"student_email_changed"));
    }

    #[tokio::test]
    async fn test_update_gpa_out_of_range() {
        let (mediator, _, _) = setup();
        let created = mediator.send(create("jane@example.edu")).await.unwrap();

        let err = mediator
            .send(UpdateStudentGpa {
                id: created.id,
                gpa: 4.5,
            })
            .await
            .unwrap_err();
        let AppError::Validation(err) = err else {
            panic!("expected validation error");
        };
        assert_eq!(err.field_errors()[0].field, "gpa");

        let dto = mediator
            .send(UpdateStudentGpa {
                id: created.id,
                gpa: 3.456,
            })
            .await
            .unwrap();
        assert_eq!(dto.gpa, Some(3.46));
        assert_eq!(dto.letter_grade.as_deref(), Some("B+"));
    }

    #[tokio::test]
    async fn test_graduated_is_terminal() {
        let (mediator, _, _) = setup();
        let created = mediator.send(create("jane@example.edu")).await.unwrap();
        let change = |status| ChangeStudentStatus {
            id: created.id,
            status,
        };

        mediator.send(change(StudentStatus::Graduated)).await.unwrap();
        let err = mediator.send(change(StudentStatus::Active)).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Domain(DomainError::InvalidStatusTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_get_and_delete_missing_student() {
        let (mediator, _, _) = setup();
        let id = StudentId::new();
        assert!(matches!(
            mediator.send(GetStudent { id }).await,
            Err(AppError::NotFound { entity: "Student", .. })
        ));
        assert!(matches!(
            mediator.send(DeleteStudent { id }).await,
            Err(AppError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_students_paginates_and_sorts() {
        let (mediator, _, _) = setup();
        for (first, email) in [("cara", "c@x.com"), ("anna", "a@x.com"), ("bea", "b@x.com")] {
            let mut input = create(email);
            input.profile.first_name = first.to_string();
            input.profile.last_name = "smith".to_string();
            mediator.send(input).await.unwrap();
        }

        let page = mediator
            .send(ListStudents {
                page: Some(1),
                page_size: Some(2),
                sort_by: Some("email".to_string()),
                sort_direction: Some("desc".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        let emails: Vec<_> = page.items.iter().map(|s| s.email.as_str()).collect();
        assert_eq!(emails, vec!["c@x.com", "b@x.com"]);
        assert_eq!(page.total_count, 3);
        assert_eq!(page.total_pages, 2);
        assert!(page.has_next_page);
    }

    #[tokio::test]
    async fn test_list_students_rejects_bad_query() {
        let (mediator, _, _) = setup();
        let err = mediator
            .send(ListStudents {
                page_size: Some(500),
                status: Some("expelled".to_string()),
                min_gpa: Some(3.0),
                max_gpa: Some(2.0),
                ..Default::default()
            })
            .await
            .unwrap_err();
        let AppError::Validation(err) = err else {
            panic!("expected validation error");
        };
        let fields: Vec<_> = err.field_errors().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["pageSize", "status", "minGpa"]);
    }

    #[test]
    fn test_list_query_defaults() {
        let (filter, page) = ListStudents::default().into_filter().unwrap();
        assert_eq!(page, PageRequest::default());
        assert_eq!(filter.sort_by, StudentSortField::Name);
    }

    #[tokio::test]
    async fn test_repository_failure_propagates() {
        let mock = Arc::new(MockProvider::with_config(MockConfig::failure("db down")));
        let mediator = Mediator::new(
            mock_repos(&mock),
            Arc::new(RecordingEventPublisher::new()),
        );
        let err = mediator.send(create("jane@example.edu")).await.unwrap_err();
        assert!(matches!(err, AppError::Database(_)));
    }
}
