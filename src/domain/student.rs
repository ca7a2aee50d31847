//! The `Student` aggregate.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::error::{DomainError, ValidationError};
use super::events::DomainEvent;
use super::ids::StudentId;
use super::value_objects::{Address, Email, FullName, Gpa, PhoneNumber};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StudentStatus {
    Active,
    Inactive,
    Suspended,
    Graduated,
    Withdrawn,
}

impl StudentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            StudentStatus::Active => "active",
            StudentStatus::Inactive => "inactive",
            StudentStatus::Suspended => "suspended",
            StudentStatus::Graduated => "graduated",
            StudentStatus::Withdrawn => "withdrawn",
        }
    }

    /// Whether moving from `self` to `to` is allowed. Re-applying the current
    /// status is always allowed and treated as a no-op.
    pub fn can_transition_to(self, to: StudentStatus) -> bool {
        if self == to {
            return true;
        }
        match (self, to) {
            (StudentStatus::Graduated, _) => false,
            (from, StudentStatus::Graduated) => from == StudentStatus::Active,
            _ => true,
        }
    }
}

impl fmt::Display for StudentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StudentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(StudentStatus::Active),
            "inactive" => Ok(StudentStatus::Inactive),
            "suspended" => Ok(StudentStatus::Suspended),
            "graduated" => Ok(StudentStatus::Graduated),
            "withdrawn" => Ok(StudentStatus::Withdrawn),
            other => Err(ValidationError::invalid(
                "status",
                format!("unknown student status '{}'", other),
            )),
        }
    }
}

/// The editable personal details of a student.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentProfile {
    pub name: FullName,
    pub email: Email,
    pub date_of_birth: NaiveDate,
    pub phone: Option<PhoneNumber>,
    pub address: Option<Address>,
}

/// Persisted state used to rebuild a [`Student`] without raising events.
#[derive(Debug, Clone)]
pub struct StudentRecord {
    pub id: StudentId,
    pub profile: StudentProfile,
    pub gpa: Option<Gpa>,
    pub status: StudentStatus,
    pub enrollment_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i64,
}

#[derive(Debug, Clone)]
pub struct Student {
    id: StudentId,
    profile: StudentProfile,
    gpa: Option<Gpa>,
    status: StudentStatus,
    enrollment_date: NaiveDate,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i64,
    events: Vec<DomainEvent>,
}

impl Student {
    pub const MIN_AGE: u32 = 16;
    pub const MAX_AGE: u32 = 120;

    /// Registers a new active student. The enrollment date defaults to today.
    pub fn register(
        profile: StudentProfile,
        enrollment_date: Option<NaiveDate>,
    ) -> Result<Self, ValidationError> {
        let today = Utc::now().date_naive();
        let enrollment_date = enrollment_date.unwrap_or(today);
        if enrollment_date > today {
            return Err(ValidationError::invalid(
                "enrollmentDate",
                "cannot be in the future",
            ));
        }
        validate_date_of_birth(profile.date_of_birth, enrollment_date)?;

        let now = Utc::now();
        let id = StudentId::new();
        let event = DomainEvent::StudentCreated {
            student_id: id,
            email: profile.email.to_string(),
            occurred_at: now,
        };
        Ok(Self {
            id,
            profile,
            gpa: None,
            status: StudentStatus::Active,
            enrollment_date,
            created_at: now,
            updated_at: now,
            version: 0,
            events: vec![event],
        })
    }

    pub fn restore(record: StudentRecord) -> Self {
        Self {
            id: record.id,
            profile: record.profile,
            gpa: record.gpa,
            status: record.status,
            enrollment_date: record.enrollment_date,
            created_at: record.created_at,
            updated_at: record.updated_at,
            version: record.version,
            events: Vec::new(),
        }
    }

    pub fn id(&self) -> StudentId {
        self.id
    }

    pub fn profile(&self) -> &StudentProfile {
        &self.profile
    }

    pub fn name(&self) -> &FullName {
        &self.profile.name
    }

    pub fn email(&self) -> &Email {
        &self.profile.email
    }

    pub fn date_of_birth(&self) -> NaiveDate {
        self.profile.date_of_birth
    }

    pub fn phone(&self) -> Option<&PhoneNumber> {
        self.profile.phone.as_ref()
    }

    pub fn address(&self) -> Option<&Address> {
        self.profile.address.as_ref()
    }

    pub fn gpa(&self) -> Option<Gpa> {
        self.gpa
    }

    pub fn status(&self) -> StudentStatus {
        self.status
    }

    pub fn enrollment_date(&self) -> NaiveDate {
        self.enrollment_date
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

    pub fn is_active(&self) -> bool {
        self.status == StudentStatus::Active
    }

    /// Age in whole years on `date`; zero when `date` precedes the birth date.
    pub fn age_on(&self, date: NaiveDate) -> u32 {
        date.years_since(self.profile.date_of_birth).unwrap_or(0)
    }

    pub fn update_profile(&mut self, profile: StudentProfile) -> Result<(), ValidationError> {
        validate_date_of_birth(profile.date_of_birth, self.enrollment_date)?;

        let now = Utc::now();
        if profile.email != self.profile.email {
            self.events.push(DomainEvent::StudentEmailChanged {
                student_id: self.id,
                old_email: self.profile.email.to_string(),
                new_email: profile.email.to_string(),
                occurred_at: now,
            });
        }
        self.profile = profile;
        self.updated_at = now;
        Ok(())
    }

    pub fn update_gpa(&mut self, gpa: Gpa) {
        let now = Utc::now();
        self.events.push(DomainEvent::StudentGpaUpdated {
            student_id: self.id,
            old_gpa: self.gpa.map(Gpa::value),
            new_gpa: gpa.value(),
            occurred_at: now,
        });
        self.gpa = Some(gpa);
        self.updated_at = now;
    }

    pub fn change_status(&mut self, to: StudentStatus) -> Result<(), DomainError> {
        if !self.status.can_transition_to(to) {
            return Err(DomainError::InvalidStatusTransition {
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        if self.status == to {
            return Ok(());
        }

        let now = Utc::now();
        self.events.push(DomainEvent::StudentStatusChanged {
            student_id: self.id,
            from: self.status,
            to,
            occurred_at: now,
        });
        self.status = to;
        self.updated_at = now;
        Ok(())
    }

    /// Drains the events raised since the last call.
    pub fn take_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn pending_events(&self) -> &[DomainEvent] {
        &self.events
    }
}

fn validate_date_of_birth(dob: NaiveDate, enrollment_date: NaiveDate) -> Result<(), ValidationError> {
    if dob > Utc::now().date_naive() {
        return Err(ValidationError::invalid(
            "dateOfBirth",
            "cannot be in the future",
        ));
    }
    let age = enrollment_date.years_since(dob).unwrap_or(0);
    if !(Student::MIN_AGE..=Student::MAX_AGE).contains(&age) {
        return Err(ValidationError::invalid(
            "dateOfBirth",
            format!(
                "student must be between {} and {} years old at enrollment",
                Student::MIN_AGE,
                Student::MAX_AGE
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Months;

    fn years_ago(years: u32) -> NaiveDate {
        Utc::now()
            .date_naive()
            .checked_sub_months(Months::new(years * 12))
            .unwrap()
    }

    fn profile(email: &str, dob: NaiveDate) -> StudentProfile {
        StudentProfile {
            name: FullName::parse("Jane", None, "Doe").unwrap(),
            email: Email::parse(email).unwrap(),
            date_of_birth: dob,
            phone: None,
            address: None,
        }
    }

    fn student() -> Student {
        let mut s = Student::register(profile("jane@example.edu", years_ago(20)), None).unwrap();
        s.take_events();
        s
    }

    #[test]
    fn test_register_raises_created_event() {
        let mut s = Student::register(profile("jane@example.edu", years_ago(20)), None).unwrap();
        assert!(s.is_active());
        assert_eq!(s.enrollment_date(), Utc::now().date_naive());
        let events = s.take_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name(), "student_created");
        assert!(s.take_events().is_empty());
    }

    #[test]
    fn test_register_rejects_out_of_range_age() {
        let err = Student::register(profile("a@b.com", years_ago(15)), None).unwrap_err();
        assert_eq!(err.field_errors()[0].field, "dateOfBirth");
        assert!(Student::register(profile("a@b.com", years_ago(121)), None).is_err());
        assert!(Student::register(profile("a@b.com", years_ago(16)), None).is_ok());
    }

    #[test]
    fn test_register_rejects_future_dates() {
        let tomorrow = Utc::now().date_naive().succ_opt().unwrap();
        let err = Student::register(profile("a@b.com", tomorrow), None).unwrap_err();
        assert_eq!(err.field_errors()[0].field, "dateOfBirth");

        let err = Student::register(profile("a@b.com", years_ago(20)), Some(tomorrow)).unwrap_err();
        assert_eq!(err.field_errors()[0].field, "enrollmentDate");
    }

    #[test]
    fn test_age_on() {
        let s = student();
        assert_eq!(s.age_on(Utc::now().date_naive()), 20);
        assert_eq!(s.age_on(years_ago(30)), 0);
    }

    #[test]
    fn test_email_change_raises_event() {
        let mut s = student();
        s.update_profile(profile("jane@example.edu", years_ago(20))).unwrap();
        assert!(s.pending_events().is_empty());

        s.update_profile(profile("jane.doe@gmail.com", years_ago(20))).unwrap();
        let events = s.take_events();
        assert_eq!(events.len(), 1);
        match &events[0] {
            DomainEvent::StudentEmailChanged { old_email, new_email, .. } => {
                assert_eq!(old_email, "jane@example.edu");
                assert_eq!(new_email, "jane.doe@gmail.com");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_update_gpa() {
        let mut s = student();
        s.update_gpa(Gpa::new(3.7).unwrap());
        assert_eq!(s.gpa().map(Gpa::value), Some(3.7));
        assert_eq!(s.take_events()[0].name(), "student_gpa_updated");
    }

    #[test]
    fn test_status_transitions() {
        let mut s = student();
        s.change_status(StudentStatus::Suspended).unwrap();
        assert!(!s.is_active());

        let err = s.change_status(StudentStatus::Graduated).unwrap_err();
        assert!(matches!(err, DomainError::InvalidStatusTransition { .. }));

        s.change_status(StudentStatus::Active).unwrap();
        s.change_status(StudentStatus::Graduated).unwrap();
        assert!(s.change_status(StudentStatus::Active).is_err());
        assert_eq!(s.take_events().len(), 3);
    }

    #[test]
    fn test_same_status_is_noop() {
        let mut s = student();
        s.change_status(StudentStatus::Active).unwrap();
        assert!(s.pending_events().is_empty());

        let mut graduated = student();
        graduated.change_status(StudentStatus::Graduated).unwrap();
        assert!(graduated.change_status(StudentStatus::Graduated).is_ok());
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("withdrawn".parse::<StudentStatus>().unwrap(), StudentStatus::Withdrawn);
        assert!("expelled".parse::<StudentStatus>().is_err());
    }
}
