//! Read models returned by the handlers.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{
    AcademicStanding, Address, Course, CourseId, CourseLevel, CourseSchedule, CourseStatus,
    DayOfWeek, EmailDomainKind, Student, StudentId, StudentStatus, Teacher, TeacherId,
    TeacherTitle,
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddressDto {
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub single_line: String,
}

impl From<&Address> for AddressDto {
    fn from(address: &Address) -> Self {
        Self {
            street: address.street().to_string(),
            city: address.city().to_string(),
            state: address.state().to_string(),
            postal_code: address.postal_code().to_string(),
            country: address.country().to_string(),
            single_line: address.single_line(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentDto {
    pub id: StudentId,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub full_name: String,
    pub formal_name: String,
    pub initials: String,
    pub email: String,
    pub email_domain_type: EmailDomainKind,
    pub date_of_birth: NaiveDate,
    pub age: u32,
    pub phone: Option<String>,
    pub phone_formatted: Option<String>,
    pub address: Option<AddressDto>,
    pub gpa: Option<f64>,
    pub letter_grade: Option<String>,
    pub academic_standing: Option<AcademicStanding>,
    pub status: StudentStatus,
    pub enrollment_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Student> for StudentDto {
    fn from(student: &Student) -> Self {
        let name = student.name();
        Self {
            id: student.id(),
            first_name: name.first().to_string(),
            middle_name: name.middle().map(str::to_string),
            last_name: name.last().to_string(),
            full_name: name.display_name(),
            formal_name: name.formal_name(),
            initials: name.initials(),
            email: student.email().to_string(),
            email_domain_type: student.email().domain_kind(),
            date_of_birth: student.date_of_birth(),
            age: student.age_on(Utc::now().date_naive()),
            phone: student.phone().map(|p| p.digits().to_string()),
            phone_formatted: student.phone().map(|p| p.formatted()),
            address: student.address().map(AddressDto::from),
            gpa: student.gpa().map(|g| g.value()),
            letter_grade: student.gpa().map(|g| g.letter_grade().to_string()),
            academic_standing: student.gpa().map(|g| g.standing()),
            status: student.status(),
            enrollment_date: student.enrollment_date(),
            created_at: student.created_at(),
            updated_at: student.updated_at(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleDto {
    pub days: Vec<DayOfWeek>,
    #[schema(value_type = String, example = "09:00:00")]
    pub start_time: NaiveTime,
    #[schema(value_type = String, example = "10:15:00")]
    pub end_time: NaiveTime,
    pub room: Option<String>,
    pub weekly_minutes: i64,
}

impl From<&CourseSchedule> for ScheduleDto {
    fn from(schedule: &CourseSchedule) -> Self {
        Self {
            days: schedule.days().to_vec(),
            start_time: schedule.start_time(),
            end_time: schedule.end_time(),
            room: schedule.room().map(str::to_string),
            weekly_minutes: schedule.weekly_minutes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseDto {
    pub id: CourseId,
    pub code: String,
    pub subject: String,
    pub title: String,
    pub description: Option<String>,
    pub credits: u8,
    pub level: CourseLevel,
    pub status: CourseStatus,
    pub max_enrollment: u32,
    pub current_enrollment: u32,
    pub available_seats: u32,
    pub is_full: bool,
    pub schedule: Option<ScheduleDto>,
    pub schedule_summary: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Course> for CourseDto {
    fn from(course: &Course) -> Self {
        Self {
            id: course.id(),
            code: course.code().to_string(),
            subject: course.code().subject().to_string(),
            title: course.title().to_string(),
            description: course.description().map(str::to_string),
            credits: course.credits().value(),
            level: course.level(),
            status: course.status(),
            max_enrollment: course.max_enrollment(),
            current_enrollment: course.current_enrollment(),
            available_seats: course.available_seats(),
            is_full: course.is_full(),
            schedule: course.schedule().map(ScheduleDto::from),
            schedule_summary: course.schedule().map(CourseSchedule::summary),
            created_at: course.created_at(),
            updated_at: course.updated_at(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeacherDto {
    pub id: TeacherId,
    pub employee_id: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub full_name: String,
    pub email: String,
    pub email_domain_type: EmailDomainKind,
    pub title: TeacherTitle,
    pub department: String,
    pub hire_date: NaiveDate,
    pub max_course_load: u8,
    pub course_load: usize,
    pub can_take_more_courses: bool,
    pub assigned_course_ids: Vec<CourseId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Teacher> for TeacherDto {
    fn from(teacher: &Teacher) -> Self {
        let name = teacher.name();
        Self {
            id: teacher.id(),
            employee_id: teacher.employee_id().to_string(),
            first_name: name.first().to_string(),
            middle_name: name.middle().map(str::to_string),
            last_name: name.last().to_string(),
            full_name: name.display_name(),
            email: teacher.email().to_string(),
            email_domain_type: teacher.email().domain_kind(),
            title: teacher.title(),
            department: teacher.department().to_string(),
            hire_date: teacher.hire_date(),
            max_course_load: teacher.max_course_load(),
            course_load: teacher.course_load(),
            can_take_more_courses: teacher.can_take_more_courses(),
            assigned_course_ids: teacher.assigned_courses().to_vec(),
            created_at: teacher.created_at(),
            updated_at: teacher.updated_at(),
        }
    }
}
