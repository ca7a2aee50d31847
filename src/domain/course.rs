//! The `Course` aggregate.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::error::{DomainError, FieldErrors, ValidationError};
use super::events::DomainEvent;
use super::ids::{CourseId, StudentId};
use super::value_objects::{CourseCode, CourseLevel, CourseSchedule, Credits, required_text};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CourseStatus {
    Draft,
    Active,
    Completed,
    Cancelled,
}

impl CourseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CourseStatus::Draft => "draft",
            CourseStatus::Active => "active",
            CourseStatus::Completed => "completed",
            CourseStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, CourseStatus::Completed | CourseStatus::Cancelled)
    }

    pub fn can_transition_to(self, to: CourseStatus) -> bool {
        matches!(
            (self, to),
            (CourseStatus::Draft, CourseStatus::Active)
                | (CourseStatus::Draft, CourseStatus::Cancelled)
                | (CourseStatus::Active, CourseStatus::Completed)
                | (CourseStatus::Active, CourseStatus::Cancelled)
        )
    }
}

impl fmt::Display for CourseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CourseStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(CourseStatus::Draft),
            "active" => Ok(CourseStatus::Active),
            "completed" => Ok(CourseStatus::Completed),
            "cancelled" => Ok(CourseStatus::Cancelled),
            other => Err(ValidationError::invalid(
                "status",
                format!("unknown course status '{}'", other),
            )),
        }
    }
}

/// Validated, editable attributes of a course.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseDetails {
    title: String,
    description: Option<String>,
    credits: Credits,
    level: Option<CourseLevel>,
    max_enrollment: u32,
    schedule: Option<CourseSchedule>,
}

impl CourseDetails {
    pub const MAX_DESCRIPTION_LEN: usize = 2000;
    pub const MAX_ENROLLMENT_LIMIT: u32 = 500;

    /// `level` of `None` means "derive from the course code" for new courses
    /// and "keep the current level" for updates.
    pub fn new(
        title: &str,
        description: Option<&str>,
        credits: Credits,
        level: Option<CourseLevel>,
        max_enrollment: i64,
        schedule: Option<CourseSchedule>,
    ) -> Result<Self, ValidationError> {
        let mut errors = FieldErrors::new();
        let title = errors.capture(required_text("title", title, 3, 200));

        let description = description.map(str::trim).filter(|d| !d.is_empty());
        if description.is_some_and(|d| d.chars().count() > Self::MAX_DESCRIPTION_LEN) {
            errors.push(
                "description",
                format!("must be at most {} characters", Self::MAX_DESCRIPTION_LEN),
            );
        }
        if !(1..=i64::from(Self::MAX_ENROLLMENT_LIMIT)).contains(&max_enrollment) {
            errors.push(
                "maxEnrollment",
                format!("must be between 1 and {}", Self::MAX_ENROLLMENT_LIMIT),
            );
        }
        errors.into_result()?;

        let title = title.ok_or_else(|| ValidationError::MissingField("title".to_string()))?;
        Ok(Self {
            title,
            description: description.map(str::to_string),
            credits,
            level,
            max_enrollment: max_enrollment as u32,
            schedule,
        })
    }
}

/// Persisted state used to rebuild a [`Course`] without raising events.
#[derive(Debug, Clone)]
pub struct CourseRecord {
    pub id: CourseId,
    pub code: CourseCode,
    pub title: String,
    pub description: Option<String>,
    pub credits: Credits,
    pub level: CourseLevel,
    pub status: CourseStatus,
    pub max_enrollment: u32,
    /// Enrolled students in enrollment order.
    pub enrolled_students: Vec<StudentId>,
    pub schedule: Option<CourseSchedule>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i64,
}

/// A course and its enrollment roster.
///
/// `version` counts committed saves. Repositories only accept an update whose
/// version matches the stored one, so two writers that loaded the same state
/// cannot both commit.
#[derive(Debug, Clone)]
pub struct Course {
    id: CourseId,
    code: CourseCode,
    title: String,
    description: Option<String>,
    credits: Credits,
    level: CourseLevel,
    status: CourseStatus,
    max_enrollment: u32,
    enrolled_students: Vec<StudentId>,
    schedule: Option<CourseSchedule>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i64,
    events: Vec<DomainEvent>,
}

impl Course {
    /// Creates a course in `draft` status.
    pub fn new(code: CourseCode, details: CourseDetails) -> Self {
        let now = Utc::now();
        let id = CourseId::new();
        let level = details.level.unwrap_or_else(|| code.suggested_level());
        let event = DomainEvent::CourseCreated {
            course_id: id,
            code: code.to_string(),
            occurred_at: now,
        };
        Self {
            id,
            code,
            title: details.title,
            description: details.description,
            credits: details.credits,
            level,
            status: CourseStatus::Draft,
            max_enrollment: details.max_enrollment,
            enrolled_students: Vec::new(),
            schedule: details.schedule,
            created_at: now,
            updated_at: now,
            version: 0,
            events: vec![event],
        }
    }

    pub fn restore(record: CourseRecord) -> Self {
        Self {
            id: record.id,
            code: record.code,
            title: record.title,
            description: record.description,
            credits: record.credits,
            level: record.level,
            status: record.status,
            max_enrollment: record.max_enrollment,
            enrolled_students: record.enrolled_students,
            schedule: record.schedule,
            created_at: record.created_at,
            updated_at: record.updated_at,
            version: record.version,
            events: Vec::new(),
        }
    }

    pub fn id(&self) -> CourseId {
        self.id
    }

    pub fn code(&self) -> &CourseCode {
        &self.code
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn credits(&self) -> Credits {
        self.credits
    }

    pub fn level(&self) -> CourseLevel {
        self.level
    }

    pub fn status(&self) -> CourseStatus {
        self.status
    }

    pub fn max_enrollment(&self) -> u32 {
        self.max_enrollment
    }

    pub fn current_enrollment(&self) -> u32 {
        u32::try_from(self.enrolled_students.len()).unwrap_or(u32::MAX)
    }

    pub fn enrolled_students(&self) -> &[StudentId] {
        &self.enrolled_students
    }

    pub fn is_enrolled(&self, student_id: StudentId) -> bool {
        self.enrolled_students.contains(&student_id)
    }

    pub fn schedule(&self) -> Option<&CourseSchedule> {
        self.schedule.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    /// Called by repositories once an update has committed.
    pub(crate) fn advance_version(&mut self) {
        self.version += 1;
    }

    pub fn available_seats(&self) -> u32 {
        self.max_enrollment.saturating_sub(self.current_enrollment())
    }

    pub fn is_full(&self) -> bool {
        self.current_enrollment() >= self.max_enrollment
    }

    pub fn update_details(&mut self, details: CourseDetails) -> Result<(), DomainError> {
        self.change_capacity(details.max_enrollment)?;
        self.title = details.title;
        self.description = details.description;
        self.credits = details.credits;
        if let Some(level) = details.level {
            self.level = level;
        }
        self.schedule = details.schedule;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn set_schedule(&mut self, schedule: Option<CourseSchedule>) {
        self.schedule = schedule;
        self.updated_at = Utc::now();
    }

    pub fn change_capacity(&mut self, max_enrollment: u32) -> Result<(), DomainError> {
        if max_enrollment < self.current_enrollment() {
            return Err(DomainError::CapacityBelowEnrollment {
                requested: max_enrollment,
                enrolled: self.current_enrollment(),
            });
        }
        self.max_enrollment = max_enrollment;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn change_status(&mut self, to: CourseStatus) -> Result<(), DomainError> {
        if self.status == to {
            return Ok(());
        }
        if !self.status.can_transition_to(to) {
            return Err(DomainError::InvalidStatusTransition {
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }

        let now = Utc::now();
        self.events.push(DomainEvent::CourseStatusChanged {
            course_id: self.id,
            from: self.status,
            to,
            occurred_at: now,
        });
        self.status = to;
        self.updated_at = now;
        Ok(())
    }

    pub fn enroll_student(&mut self, student_id: StudentId) -> Result<(), DomainError> {
        if self.status != CourseStatus::Active {
            return Err(DomainError::CourseNotOpen(self.code.to_string()));
        }
        if self.is_enrolled(student_id) {
            return Err(DomainError::AlreadyEnrolled {
                course: self.code.to_string(),
                student: student_id.to_string(),
            });
        }
        if self.is_full() {
            return Err(DomainError::CourseFull(self.code.to_string()));
        }

        let now = Utc::now();
        self.enrolled_students.push(student_id);
        self.events.push(DomainEvent::CourseEnrollmentChanged {
            course_id: self.id,
            student_id,
            delta: 1,
            current_enrollment: self.current_enrollment(),
            occurred_at: now,
        });
        if self.is_full() {
            self.events.push(DomainEvent::CourseCapacityReached {
                course_id: self.id,
                max_enrollment: self.max_enrollment,
                occurred_at: now,
            });
        }
        self.updated_at = now;
        Ok(())
    }

    pub fn drop_student(&mut self, student_id: StudentId) -> Result<(), DomainError> {
        if self.enrolled_students.is_empty() {
            return Err(DomainError::NoEnrollments(self.code.to_string()));
        }
        let Some(position) = self.enrolled_students.iter().position(|id| *id == student_id) else {
            return Err(DomainError::NotEnrolled {
                course: self.code.to_string(),
                student: student_id.to_string(),
            });
        };

        let now = Utc::now();
        self.enrolled_students.remove(position);
        self.events.push(DomainEvent::CourseEnrollmentChanged {
            course_id: self.id,
            student_id,
            delta: -1,
            current_enrollment: self.current_enrollment(),
            occurred_at: now,
        });
        self.updated_at = now;
        Ok(())
    }

    pub fn ensure_deletable(&self) -> Result<(), DomainError> {
        if !self.enrolled_students.is_empty() {
            return Err(DomainError::CourseHasEnrollments(self.code.to_string()));
        }
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn pending_events(&self) -> &[DomainEvent] {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details(max_enrollment: i64) -> CourseDetails {
        CourseDetails::new(
            "Intro to Programming",
            None,
            Credits::new(3).unwrap(),
            None,
            max_enrollment,
            None,
        )
        .unwrap()
    }

    fn active_course(max_enrollment: i64) -> Course {
        let mut course = Course::new(CourseCode::parse("CS101").unwrap(), details(max_enrollment));
        course.change_status(CourseStatus::Active).unwrap();
        course.take_events();
        course
    }

    #[test]
    fn test_new_course_defaults() {
        let mut course = Course::new(CourseCode::parse("cs-410").unwrap(), details(30));
        assert_eq!(course.status(), CourseStatus::Draft);
        assert_eq!(course.level(), CourseLevel::Advanced);
        assert_eq!(course.available_seats(), 30);
        assert_eq!(course.take_events()[0].name(), "course_created");
    }

    #[test]
    fn test_details_validation_collects_errors() {
        let err = CourseDetails::new(
            "AI",
            Some(&"x".repeat(2001)),
            Credits::new(3).unwrap(),
            None,
            0,
            None,
        )
        .unwrap_err();
        let fields: Vec<_> = err.field_errors().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["title", "description", "maxEnrollment"]);
    }

    #[test]
    fn test_blank_description_is_none() {
        let d = CourseDetails::new("Algebra", Some("   "), Credits::new(4).unwrap(), None, 10, None)
            .unwrap();
        let course = Course::new(CourseCode::parse("MATH120").unwrap(), d);
        assert_eq!(course.description(), None);
    }

    #[test]
    fn test_status_transitions() {
        let mut course = Course::new(CourseCode::parse("CS101").unwrap(), details(10));
        assert!(course.change_status(CourseStatus::Completed).is_err());
        course.change_status(CourseStatus::Active).unwrap();
        course.change_status(CourseStatus::Completed).unwrap();
        assert!(course.change_status(CourseStatus::Active).is_err());
        assert!(course.change_status(CourseStatus::Cancelled).is_err());
        assert!(course.status().is_terminal());
    }

    #[test]
    fn test_enrollment_requires_active_course() {
        let mut course = Course::new(CourseCode::parse("CS101").unwrap(), details(10));
        let err = course.enroll_student(StudentId::new()).unwrap_err();
        assert_eq!(err, DomainError::CourseNotOpen("CS101".to_string()));
    }

    #[test]
    fn test_enrollment_until_full() {
        let mut course = active_course(2);
        course.enroll_student(StudentId::new()).unwrap();
        assert_eq!(course.take_events().len(), 1);

        course.enroll_student(StudentId::new()).unwrap();
        let events = course.take_events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].name(), "course_capacity_reached");
        assert!(course.is_full());
        assert_eq!(course.available_seats(), 0);

        let err = course.enroll_student(StudentId::new()).unwrap_err();
        assert_eq!(err, DomainError::CourseFull("CS101".to_string()));
    }

    #[test]
    fn test_drop_student() {
        let mut course = active_course(5);
        assert!(matches!(
            course.drop_student(StudentId::new()),
            Err(DomainError::NoEnrollments(_))
        ));

        let student = StudentId::new();
        course.enroll_student(student).unwrap();
        assert!(matches!(
            course.drop_student(StudentId::new()),
            Err(DomainError::NotEnrolled { .. })
        ));
        assert_eq!(course.current_enrollment(), 1);

        course.drop_student(student).unwrap();
        assert_eq!(course.current_enrollment(), 0);
        assert!(!course.is_enrolled(student));
    }

    #[test]
    fn test_student_takes_at_most_one_seat() {
        let mut course = active_course(5);
        let student = StudentId::new();
        course.enroll_student(student).unwrap();
        course.take_events();

        let err = course.enroll_student(student).unwrap_err();
        assert!(matches!(err, DomainError::AlreadyEnrolled { .. }));
        assert_eq!(course.current_enrollment(), 1);
        assert_eq!(course.enrolled_students(), &[student]);
        assert!(course.pending_events().is_empty());
    }

    #[test]
    fn test_version_starts_at_zero() {
        let mut course = active_course(5);
        assert_eq!(course.version(), 0);
        course.advance_version();
        assert_eq!(course.version(), 1);
    }

    #[test]
    fn test_capacity_cannot_drop_below_enrollment() {
        let mut course = active_course(5);
        course.enroll_student(StudentId::new()).unwrap();
        course.enroll_student(StudentId::new()).unwrap();

        let err = course.update_details(details(1)).unwrap_err();
        assert_eq!(
            err,
            DomainError::CapacityBelowEnrollment {
                requested: 1,
                enrolled: 2
            }
        );
        course.change_capacity(2).unwrap();
        assert!(course.is_full());
    }

    #[test]
    fn test_course_with_enrollments_not_deletable() {
        let mut course = active_course(5);
        assert!(course.ensure_deletable().is_ok());
        course.enroll_student(StudentId::new()).unwrap();
        assert!(course.ensure_deletable().is_err());
    }
}
