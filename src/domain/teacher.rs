//! The `Teacher` aggregate.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::error::{DomainError, FieldErrors, ValidationError};
use super::events::DomainEvent;
use super::ids::{CourseId, TeacherId};
use super::value_objects::{Email, EmployeeId, FullName, required_text};

/// Academic rank, ordered from junior to senior.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum TeacherTitle {
    Lecturer,
    Instructor,
    AssistantProfessor,
    AssociateProfessor,
    Professor,
}

impl TeacherTitle {
    pub fn as_str(self) -> &'static str {
        match self {
            TeacherTitle::Lecturer => "lecturer",
            TeacherTitle::Instructor => "instructor",
            TeacherTitle::AssistantProfessor => "assistant_professor",
            TeacherTitle::AssociateProfessor => "associate_professor",
            TeacherTitle::Professor => "professor",
        }
    }
}

impl fmt::Display for TeacherTitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TeacherTitle {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lecturer" => Ok(TeacherTitle::Lecturer),
            "instructor" => Ok(TeacherTitle::Instructor),
            "assistant_professor" => Ok(TeacherTitle::AssistantProfessor),
            "associate_professor" => Ok(TeacherTitle::AssociateProfessor),
            "professor" => Ok(TeacherTitle::Professor),
            other => Err(ValidationError::invalid(
                "title",
                format!("unknown teacher title '{}'", other),
            )),
        }
    }
}

/// Validated, editable details of a teacher.
#[derive(Debug, Clone, PartialEq)]
pub struct TeacherProfile {
    name: FullName,
    email: Email,
    department: String,
    max_course_load: u8,
}

impl TeacherProfile {
    pub const DEFAULT_MAX_COURSE_LOAD: u8 = 4;
    pub const COURSE_LOAD_LIMIT: u8 = 8;

    pub fn new(
        name: FullName,
        email: Email,
        department: &str,
        max_course_load: Option<i64>,
    ) -> Result<Self, ValidationError> {
        let mut errors = FieldErrors::new();
        let department = errors.capture(required_text("department", department, 2, 100));
        let max_course_load = max_course_load.unwrap_or(i64::from(Self::DEFAULT_MAX_COURSE_LOAD));
        if !(1..=i64::from(Self::COURSE_LOAD_LIMIT)).contains(&max_course_load) {
            errors.push(
                "maxCourseLoad",
                format!("must be between 1 and {}", Self::COURSE_LOAD_LIMIT),
            );
        }
        errors.into_result()?;

        let department =
            department.ok_or_else(|| ValidationError::MissingField("department".to_string()))?;
        Ok(Self {
            name,
            email,
            department,
            max_course_load: max_course_load as u8,
        })
    }

    pub fn name(&self) -> &FullName {
        &self.name
    }

    pub fn email(&self) -> &Email {
        &self.email
    }

    pub fn department(&self) -> &str {
        &self.department
    }

    pub fn max_course_load(&self) -> u8 {
        self.max_course_load
    }
}

/// Persisted state used to rebuild a [`Teacher`] without raising events.
#[derive(Debug, Clone)]
pub struct TeacherRecord {
    pub id: TeacherId,
    pub profile: TeacherProfile,
    pub employee_id: EmployeeId,
    pub title: TeacherTitle,
    pub hire_date: NaiveDate,
    pub assigned_courses: Vec<CourseId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i64,
}

#[derive(Debug, Clone)]
pub struct Teacher {
    id: TeacherId,
    profile: TeacherProfile,
    employee_id: EmployeeId,
    title: TeacherTitle,
    hire_date: NaiveDate,
    assigned_courses: Vec<CourseId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i64,
    events: Vec<DomainEvent>,
}

impl Teacher {
    /// Hires a teacher. The hire date defaults to today.
    pub fn hire(
        profile: TeacherProfile,
        employee_id: EmployeeId,
        title: TeacherTitle,
        hire_date: Option<NaiveDate>,
    ) -> Result<Self, ValidationError> {
        let today = Utc::now().date_naive();
        let hire_date = hire_date.unwrap_or(today);
        if hire_date > today {
            return Err(ValidationError::invalid("hireDate", "cannot be in the future"));
        }

        let now = Utc::now();
        let id = TeacherId::new();
        let event = DomainEvent::TeacherHired {
            teacher_id: id,
            employee_id: employee_id.to_string(),
            occurred_at: now,
        };
        Ok(Self {
            id,
            profile,
            employee_id,
            title,
            hire_date,
            assigned_courses: Vec::new(),
            created_at: now,
            updated_at: now,
            version: 0,
            events: vec![event],
        })
    }

    pub fn restore(record: TeacherRecord) -> Self {
        Self {
            id: record.id,
            profile: record.profile,
            employee_id: record.employee_id,
            title: record.title,
            hire_date: record.hire_date,
            assigned_courses: record.assigned_courses,
            created_at: record.created_at,
            updated_at: record.updated_at,
            version: record.version,
            events: Vec::new(),
        }
    }

    pub fn id(&self) -> TeacherId {
        self.id
    }

    pub fn profile(&self) -> &TeacherProfile {
        &self.profile
    }

    pub fn name(&self) -> &FullName {
        &self.profile.name
    }

    pub fn email(&self) -> &Email {
        &self.profile.email
    }

    pub fn department(&self) -> &str {
        &self.profile.department
    }

    pub fn max_course_load(&self) -> u8 {
        self.profile.max_course_load
    }

    pub fn employee_id(&self) -> &EmployeeId {
        &self.employee_id
    }

    pub fn title(&self) -> TeacherTitle {
        self.title
    }

    pub fn hire_date(&self) -> NaiveDate {
        self.hire_date
    }

    pub fn assigned_courses(&self) -> &[CourseId] {
        &self.assigned_courses
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Number of committed saves; repositories reject updates from a stale copy.
    pub fn version(&self) -> i64 {
        self.version
    }

    pub(crate) fn advance_version(&mut self) {
        self.version += 1;
    }

    pub fn course_load(&self) -> usize {
        self.assigned_courses.len()
    }

    pub fn can_take_more_courses(&self) -> bool {
        self.course_load() < usize::from(self.profile.max_course_load)
    }

    pub fn is_assigned_to(&self, course_id: CourseId) -> bool {
        self.assigned_courses.contains(&course_id)
    }

    pub fn update_profile(&mut self, profile: TeacherProfile) -> Result<(), DomainError> {
        if usize::from(profile.max_course_load) < self.course_load() {
            return Err(DomainError::CourseLoadBelowAssigned {
                requested: profile.max_course_load,
                assigned: self.course_load(),
            });
        }
        self.profile = profile;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn promote(&mut self, to: TeacherTitle) -> Result<(), DomainError> {
        if to <= self.title {
            return Err(DomainError::NotAPromotion(self.title.to_string()));
        }

        let now = Utc::now();
        self.events.push(DomainEvent::TeacherPromoted {
            teacher_id: self.id,
            from: self.title,
            to,
            occurred_at: now,
        });
        self.title = to;
        self.updated_at = now;
        Ok(())
    }

    pub fn assign_course(&mut self, course_id: CourseId) -> Result<(), DomainError> {
        if self.is_assigned_to(course_id) {
            return Err(DomainError::AlreadyAssigned(course_id.to_string()));
        }
        if !self.can_take_more_courses() {
            return Err(DomainError::CourseLoadExceeded(self.profile.max_course_load));
        }

        let now = Utc::now();
        self.assigned_courses.push(course_id);
        self.events.push(DomainEvent::TeacherAssignedToCourse {
            teacher_id: self.id,
            course_id,
            occurred_at: now,
        });
        self.updated_at = now;
        Ok(())
    }

    pub fn unassign_course(&mut self, course_id: CourseId) -> Result<(), DomainError> {
        let Some(pos) = self.assigned_courses.iter().position(|c| *c == course_id) else {
            return Err(DomainError::NotAssigned(course_id.to_string()));
        };

        let now = Utc::now();
        self.assigned_courses.remove(pos);
        self.events.push(DomainEvent::TeacherUnassignedFromCourse {
            teacher_id: self.id,
            course_id,
            occurred_at: now,
        });
        self.updated_at = now;
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn pending_events(&self) -> &[DomainEvent] {
        &self.events
    }
}
