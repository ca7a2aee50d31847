//! Domain events raised by the aggregates.
//!
//! Aggregates record events while they are mutated. The application layer
//! drains them after the aggregate has been saved and hands them to an
//! [`EventPublisher`](super::traits::EventPublisher), so an event is only
//! ever observed for a change that actually persisted.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::course::CourseStatus;
use super::ids::{CourseId, StudentId, TeacherId};
use super::student::StudentStatus;
use super::teacher::TeacherTitle;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DomainEvent {
    #[serde(rename_all = "camelCase")]
    StudentCreated {
        student_id: StudentId,
        email: String,
        occurred_at: DateTime<Utc>,
    },

    #[serde(rename_all = "camelCase")]
    StudentEmailChanged {
        student_id: StudentId,
        old_email: String,
        new_email: String,
        occurred_at: DateTime<Utc>,
    },

    #[serde(rename_all = "camelCase")]
    StudentGpaUpdated {
        student_id: StudentId,
        old_gpa: Option<f64>,
        new_gpa: f64,
        occurred_at: DateTime<Utc>,
    },

    #[serde(rename_all = "camelCase")]
    StudentStatusChanged {
        student_id: StudentId,
        from: StudentStatus,
        to: StudentStatus,
        occurred_at: DateTime<Utc>,
    },

    #[serde(rename_all = "camelCase")]
    CourseCreated {
        course_id: CourseId,
        code: String,
        occurred_at: DateTime<Utc>,
    },

    #[serde(rename_all = "camelCase")]
    CourseStatusChanged {
        course_id: CourseId,
        from: CourseStatus,
        to: CourseStatus,
        occurred_at: DateTime<Utc>,
    },

    /// Enrollment went up (`delta = 1`) or down (`delta = -1`).
    #[serde(rename_all = "camelCase")]
    CourseEnrollmentChanged {
        course_id: CourseId,
        student_id: StudentId,
        delta: i32,
        current_enrollment: u32,
        occurred_at: DateTime<Utc>,
    },

    #[serde(rename_all = "camelCase")]
    CourseCapacityReached {
        course_id: CourseId,
        max_enrollment: u32,
        occurred_at: DateTime<Utc>,
    },

    #[serde(rename_all = "camelCase")]
    TeacherHired {
        teacher_id: TeacherId,
        employee_id: String,
        occurred_at: DateTime<Utc>,
    },

    #[serde(rename_all = "camelCase")]
    TeacherPromoted {
        teacher_id: TeacherId,
        from: TeacherTitle,
        to: TeacherTitle,
        occurred_at: DateTime<Utc>,
    },

    #[serde(rename_all = "camelCase")]
    TeacherAssignedToCourse {
        teacher_id: TeacherId,
        course_id: CourseId,
        occurred_at: DateTime<Utc>,
    },

    #[serde(rename_all = "camelCase")]
    TeacherUnassignedFromCourse {
        teacher_id: TeacherId,
        course_id: CourseId,
        occurred_at: DateTime<Utc>,
    },
}

impl DomainEvent {
    /// Stable event name used in logs and metric labels.
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::StudentCreated { .. } => "student_created",
            DomainEvent::StudentEmailChanged { .. } => "student_email_changed",
            DomainEvent::StudentGpaUpdated { .. } => "student_gpa_updated",
            DomainEvent::StudentStatusChanged { .. } => "student_status_changed",
            DomainEvent::CourseCreated { .. } => "course_created",
            DomainEvent::CourseStatusChanged { .. } => "course_status_changed",
            DomainEvent::CourseEnrollmentChanged { .. } => "course_enrollment_changed",
            DomainEvent::CourseCapacityReached { .. } => "course_capacity_reached",
            DomainEvent::TeacherHired { .. } => "teacher_hired",
            DomainEvent::TeacherPromoted { .. } => "teacher_promoted",
            DomainEvent::TeacherAssignedToCourse { .. } => "teacher_assigned_to_course",
            DomainEvent::TeacherUnassignedFromCourse { .. } => "teacher_unassigned_from_course",
        }
    }

    /// Id of the aggregate that raised the event.
    pub fn aggregate_id(&self) -> Uuid {
        match self {
            DomainEvent::StudentCreated { student_id, .. }
            | DomainEvent::StudentEmailChanged { student_id, .. }
            | DomainEvent::StudentGpaUpdated { student_id, .. }
            | DomainEvent::StudentStatusChanged { student_id, .. } => student_id.into_inner(),
            DomainEvent::CourseCreated { course_id, .. }
            | DomainEvent::CourseStatusChanged { course_id, .. }
            | DomainEvent::CourseEnrollmentChanged { course_id, .. }
            | DomainEvent::CourseCapacityReached { course_id, .. } => course_id.into_inner(),
            DomainEvent::TeacherHired { teacher_id, .. }
            | DomainEvent::TeacherPromoted { teacher_id, .. }
            | DomainEvent::TeacherAssignedToCourse { teacher_id, .. }
            | DomainEvent::TeacherUnassignedFromCourse { teacher_id, .. } => {
                teacher_id.into_inner()
            }
        }
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            DomainEvent::StudentCreated { occurred_at, .. }
            | DomainEvent::StudentEmailChanged { occurred_at, .. }
            | DomainEvent::StudentGpaUpdated { occurred_at, .. }
            | DomainEvent::StudentStatusChanged { occurred_at, .. }
            | DomainEvent::CourseCreated { occurred_at, .. }
            | DomainEvent::CourseStatusChanged { occurred_at, .. }
            | DomainEvent::CourseEnrollmentChanged { occurred_at, .. }
            | DomainEvent::CourseCapacityReached { occurred_at, .. }
            | DomainEvent::TeacherHired { occurred_at, .. }
            | DomainEvent::TeacherPromoted { occurred_at, .. }
            | DomainEvent::TeacherAssignedToCourse { occurred_at, .. }
            | DomainEvent::TeacherUnassignedFromCourse { occurred_at, .. } => *occurred_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_accessors() {
        let course_id = CourseId::new();
        let now = Utc::now();
        let event = DomainEvent::CourseCapacityReached {
            course_id,
            max_enrollment: 30,
            occurred_at: now,
        };
        assert_eq!(event.name(), "course_capacity_reached");
        assert_eq!(event.aggregate_id(), course_id.into_inner());
        assert_eq!(event.occurred_at(), now);
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = DomainEvent::StudentStatusChanged {
            student_id: StudentId::new(),
            from: StudentStatus::Active,
            to: StudentStatus::Graduated,
            occurred_at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "studentStatusChanged");
        assert_eq!(json["from"], "active");
        assert_eq!(json["to"], "graduated");
        assert!(json.get("studentId").is_some());
    }
}
