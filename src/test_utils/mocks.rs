//! Mock implementations for testing.
//!
//! [`MockProvider`] keeps every aggregate in memory and implements all
//! repository ports, so a single instance can back a whole [`Mediator`].
//! Failure modes are driven by [`MockConfig`].
//!
//! [`Mediator`]: crate::app::Mediator

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::app::Repositories;
use crate::domain::{
    AppError, Course, CourseCode, CourseFilter, CourseId, CourseRepository, DatabaseError,
    DomainEvent, Email, EmployeeId, EventPublisher, HealthCheck, PageRequest, PagedResult,
    Student, StudentFilter, StudentId, StudentRepository, Teacher, TeacherFilter, TeacherId,
    TeacherRepository,
};

/// Configuration for mock behavior.
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// If true, operations will fail.
    pub should_fail: bool,
    /// If true, only `add`, `update` and `delete` fail; reads still work.
    pub fail_writes: bool,
    /// Custom error message for failures.
    pub error_message: Option<String>,
    /// Simulated latency in milliseconds.
    pub latency_ms: Option<u64>,
}

impl MockConfig {
    #[must_use]
    pub fn success() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            should_fail: true,
            error_message: Some(message.into()),
            ..Self::default()
        }
    }

    /// Lookups succeed but every write fails, so a handler gets as far as
    /// saving before it errors.
    #[must_use]
    pub fn write_failure(message: impl Into<String>) -> Self {
        Self {
            fail_writes: true,
            error_message: Some(message.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_latency(mut self, ms: u64) -> Self {
        self.latency_ms = Some(ms);
        self
    }
}

#[derive(Default)]
struct Store {
    students: HashMap<StudentId, Student>,
    courses: HashMap<CourseId, Course>,
    teachers: HashMap<TeacherId, Teacher>,
}

/// In-memory implementation of every repository port.
///
/// Saved aggregates are stored without their pending events, the same way
/// a round trip through the database would drop them.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use student_tracker::test_utils::{MockConfig, MockProvider, mock_repos};
///
/// let mock = Arc::new(MockProvider::new());
/// let repositories = mock_repos(&mock);
///
/// let failing = MockProvider::with_config(MockConfig::failure("DB error"));
/// ```
pub struct MockProvider {
    store: Mutex<Store>,
    config: MockConfig,
    call_count: AtomicU64,
    is_healthy: AtomicBool,
    fail_writes: AtomicBool,
}

impl MockProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(MockConfig::success())
    }

    #[must_use]
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            store: Mutex::new(Store::default()),
            fail_writes: AtomicBool::new(config.fail_writes),
            config,
            call_count: AtomicU64::new(0),
            is_healthy: AtomicBool::new(true),
        }
    }

    /// Gets the number of times any repository method was called.
    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::Relaxed)
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.is_healthy.store(healthy, Ordering::Relaxed);
    }

    /// Makes writes fail from now on, after fixtures have been saved.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }

    pub fn student_count(&self) -> usize {
        self.lock().students.len()
    }

    pub fn course_count(&self) -> usize {
        self.lock().courses.len()
    }

    pub fn teacher_count(&self) -> usize {
        self.lock().teachers.len()
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn enter(&self) -> Result<(), AppError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if let Some(ms) = self.config.latency_ms {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
        if self.config.should_fail {
            return Err(self.configured_error());
        }
        Ok(())
    }

    async fn enter_write(&self) -> Result<(), AppError> {
        self.enter().await?;
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(self.configured_error());
        }
        Ok(())
    }

    fn configured_error(&self) -> AppError {
        let msg = self
            .config
            .error_message
            .clone()
            .unwrap_or_else(|| "Mock database error".to_string());
        AppError::Database(DatabaseError::Query(msg))
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Wires one provider into every repository slot.
pub fn mock_repos(mock: &Arc<MockProvider>) -> Repositories {
    Repositories {
        students: mock.clone(),
        courses: mock.clone(),
        teachers: mock.clone(),
        health: mock.clone(),
    }
}

fn clean_student(student: &Student) -> Student {
    let mut stored = student.clone();
    stored.take_events();
    stored
}

fn clean_course(course: &Course) -> Course {
    let mut stored = course.clone();
    stored.take_events();
    stored
}

fn clean_teacher(teacher: &Teacher) -> Teacher {
    let mut stored = teacher.clone();
    stored.take_events();
    stored
}

fn missing(entity: &str, id: impl std::fmt::Display) -> AppError {
    AppError::Database(DatabaseError::NotFound(format!("{entity} {id} not found")))
}

fn stale(entity: &str, id: impl std::fmt::Display, version: i64) -> AppError {
    AppError::Database(DatabaseError::StaleWrite(format!(
        "{entity} {id} is no longer at version {version}"
    )))
}

#[async_trait]
impl HealthCheck for MockProvider {
    async fn health_check(&self) -> Result<(), AppError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if !self.is_healthy.load(Ordering::Relaxed) {
            return Err(AppError::Database(DatabaseError::Connection(
                "Mock database unhealthy".to_string(),
            )));
        }
        self.enter().await
    }
}

#[async_trait]
impl StudentRepository for MockProvider {
    async fn get(&self, id: StudentId) -> Result<Option<Student>, AppError> {
        self.enter().await?;
        Ok(self.lock().students.get(&id).cloned())
    }

    async fn email_exists(
        &self,
        email: &Email,
        excluding: Option<StudentId>,
    ) -> Result<bool, AppError> {
        self.enter().await?;
        Ok(self
            .lock()
            .students
            .values()
            .any(|s| s.email() == email && Some(s.id()) != excluding))
    }

    async fn add(&self, student: &Student) -> Result<(), AppError> {
        self.enter_write().await?;
        let mut store = self.lock();
        if store.students.values().any(|s| s.email() == student.email()) {
            return Err(AppError::Database(DatabaseError::Duplicate(format!(
                "students.email {}",
                student.email()
            ))));
        }
        store.students.insert(student.id(), clean_student(student));
        Ok(())
    }

    async fn update(&self, student: &Student) -> Result<(), AppError> {
        self.enter_write().await?;
        let mut store = self.lock();
        match store.students.get_mut(&student.id()) {
            Some(existing) if existing.version() != student.version() => {
                Err(stale("Student", student.id(), student.version()))
            }
            Some(existing) => {
                *existing = clean_student(student);
                existing.advance_version();
                Ok(())
            }
            None => Err(missing("Student", student.id())),
        }
    }

    /// Mirrors the `ON DELETE CASCADE` on `course_enrollments`.
    async fn delete(&self, id: StudentId) -> Result<bool, AppError> {
        self.enter_write().await?;
        let mut store = self.lock();
        if store.students.remove(&id).is_none() {
            return Ok(false);
        }
        for course in store.courses.values_mut() {
            if course.is_enrolled(id) && course.drop_student(id).is_ok() {
                course.take_events();
                course.advance_version();
            }
        }
        Ok(true)
    }

    async fn list(
        &self,
        filter: &StudentFilter,
        page: PageRequest,
    ) -> Result<PagedResult<Student>, AppError> {
        self.enter().await?;
        let mut matching: Vec<Student> = self
            .lock()
            .students
            .values()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();
        matching.sort_by(|a, b| filter.compare(a, b));
        Ok(PagedResult::from_all(matching, page))
    }
}

#[async_trait]
impl CourseRepository for MockProvider {
    async fn get(&self, id: CourseId) -> Result<Option<Course>, AppError> {
        self.enter().await?;
        Ok(self.lock().courses.get(&id).cloned())
    }

    async fn code_exists(
        &self,
        code: &CourseCode,
        excluding: Option<CourseId>,
    ) -> Result<bool, AppError> {
        self.enter().await?;
        Ok(self
            .lock()
            .courses
            .values()
            .any(|c| c.code() == code && Some(c.id()) != excluding))
    }

    async fn add(&self, course: &Course) -> Result<(), AppError> {
        self.enter_write().await?;
        let mut store = self.lock();
        if store.courses.values().any(|c| c.code() == course.code()) {
            return Err(AppError::Database(DatabaseError::Duplicate(format!(
                "courses.code {}",
                course.code()
            ))));
        }
        store.courses.insert(course.id(), clean_course(course));
        Ok(())
    }

    async fn update(&self, course: &Course) -> Result<(), AppError> {
        self.enter_write().await?;
        let mut store = self.lock();
        match store.courses.get_mut(&course.id()) {
            Some(existing) if existing.version() != course.version() => {
                Err(stale("Course", course.id(), course.version()))
            }
            Some(existing) => {
                *existing = clean_course(course);
                existing.advance_version();
                Ok(())
            }
            None => Err(missing("Course", course.id())),
        }
    }

    /// Mirrors the `ON DELETE CASCADE` on `teacher_courses`.
    async fn delete(&self, id: CourseId) -> Result<bool, AppError> {
        self.enter_write().await?;
        let mut store = self.lock();
        if store.courses.remove(&id).is_none() {
            return Ok(false);
        }
        for teacher in store.teachers.values_mut() {
            if teacher.is_assigned_to(id) && teacher.unassign_course(id).is_ok() {
                teacher.take_events();
                teacher.advance_version();
            }
        }
        Ok(true)
    }

    async fn list(
        &self,
        filter: &CourseFilter,
        page: PageRequest,
    ) -> Result<PagedResult<Course>, AppError> {
        self.enter().await?;
        let mut matching: Vec<Course> = self
            .lock()
            .courses
            .values()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        matching.sort_by(|a, b| filter.compare(a, b));
        Ok(PagedResult::from_all(matching, page))
    }
}

#[async_trait]
impl TeacherRepository for MockProvider {
    async fn get(&self, id: TeacherId) -> Result<Option<Teacher>, AppError> {
        self.enter().await?;
        Ok(self.lock().teachers.get(&id).cloned())
    }

    async fn email_exists(
        &self,
        email: &Email,
        excluding: Option<TeacherId>,
    ) -> Result<bool, AppError> {
        self.enter().await?;
        Ok(self
            .lock()
            .teachers
            .values()
            .any(|t| t.email() == email && Some(t.id()) != excluding))
    }

    async fn employee_id_exists(&self, employee_id: &EmployeeId) -> Result<bool, AppError> {
        self.enter().await?;
        Ok(self
            .lock()
            .teachers
            .values()
            .any(|t| t.employee_id() == employee_id))
    }

    async fn add(&self, teacher: &Teacher) -> Result<(), AppError> {
        self.enter_write().await?;
        let mut store = self.lock();
        if store
            .teachers
            .values()
            .any(|t| t.employee_id() == teacher.employee_id() || t.email() == teacher.email())
        {
            return Err(AppError::Database(DatabaseError::Duplicate(format!(
                "teachers {}",
                teacher.employee_id()
            ))));
        }
        store.teachers.insert(teacher.id(), clean_teacher(teacher));
        Ok(())
    }

    async fn update(&self, teacher: &Teacher) -> Result<(), AppError> {
        self.enter_write().await?;
        let mut store = self.lock();
        match store.teachers.get_mut(&teacher.id()) {
            Some(existing) if existing.version() != teacher.version() => {
                Err(stale("Teacher", teacher.id(), teacher.version()))
            }
            Some(existing) => {
                *existing = clean_teacher(teacher);
                existing.advance_version();
                Ok(())
            }
            None => Err(missing("Teacher", teacher.id())),
        }
    }

    async fn delete(&self, id: TeacherId) -> Result<bool, AppError> {
        self.enter_write().await?;
        Ok(self.lock().teachers.remove(&id).is_some())
    }

    async fn list(
        &self,
        filter: &TeacherFilter,
        page: PageRequest,
    ) -> Result<PagedResult<Teacher>, AppError> {
        self.enter().await?;
        let mut matching: Vec<Teacher> = self
            .lock()
            .teachers
            .values()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();
        matching.sort_by(|a, b| filter.compare(a, b));
        Ok(PagedResult::from_all(matching, page))
    }
}

/// Event publisher that keeps everything it receives.
#[derive(Default)]
pub struct RecordingEventPublisher {
    events: Mutex<Vec<DomainEvent>>,
    publish_calls: AtomicU64,
    fail: bool,
}

impl RecordingEventPublisher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A publisher whose every call fails without recording anything.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<DomainEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn event_names(&self) -> Vec<&'static str> {
        self.events().iter().map(DomainEvent::name).collect()
    }

    pub fn publish_calls(&self) -> u64 {
        self.publish_calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl EventPublisher for RecordingEventPublisher {
    async fn publish(&self, events: &[DomainEvent]) -> Result<(), AppError> {
        self.publish_calls.fetch_add(1, Ordering::Relaxed);
        if self.fail {
            return Err(AppError::Internal("event sink unavailable".to_string()));
        }
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .extend_from_slice(events);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        CourseDetails, Credits, FullName, StudentProfile, TeacherProfile, TeacherTitle,
    };
    use chrono::NaiveDate;

    fn student(email: &str) -> Student {
        Student::register(
            StudentProfile {
                name: FullName::parse("Ada", None, "Lovelace").unwrap(),
                email: Email::parse(email).unwrap(),
                date_of_birth: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
                phone: None,
                address: None,
            },
            None,
        )
        .unwrap()
    }

    fn course(code: &str) -> Course {
        let details =
            CourseDetails::new("Algorithms", None, Credits::new(3).unwrap(), None, 30, None)
                .unwrap();
        Course::new(CourseCode::parse(code).unwrap(), details)
    }

    #[tokio::test]
    async fn test_add_and_get_drops_pending_events() {
        let mock = MockProvider::new();
        let s = student("ada@example.com");
        assert!(!s.pending_events().is_empty());

        StudentRepository::add(&mock, &s).await.unwrap();
        let fetched = StudentRepository::get(&mock, s.id()).await.unwrap().unwrap();
        assert!(fetched.pending_events().is_empty());
        assert_eq!(mock.student_count(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let mock = MockProvider::new();
        StudentRepository::add(&mock, &student("dup@example.com"))
            .await
            .unwrap();
        let result = StudentRepository::add(&mock, &student("dup@example.com")).await;
        assert!(matches!(
            result,
            Err(AppError::Database(DatabaseError::Duplicate(_)))
        ));
    }

    #[tokio::test]
    async fn test_failure_config() {
        let mock = MockProvider::with_config(MockConfig::failure("Connection timeout"));
        let result = StudentRepository::get(&mock, StudentId::new()).await;
        assert!(matches!(
            result,
            Err(AppError::Database(DatabaseError::Query(msg))) if msg == "Connection timeout"
        ));
    }

    #[tokio::test]
    async fn test_write_failure_keeps_reads_working() {
        let mock = MockProvider::new();
        let s = student("ada@example.com");
        StudentRepository::add(&mock, &s).await.unwrap();

        mock.set_fail_writes(true);
        assert!(StudentRepository::get(&mock, s.id()).await.unwrap().is_some());
        assert!(StudentRepository::update(&mock, &s).await.is_err());
        assert!(StudentRepository::delete(&mock, s.id()).await.is_err());

        let failing = MockProvider::with_config(MockConfig::write_failure("disk full"));
        let email = Email::parse("grace@example.com").unwrap();
        assert!(!StudentRepository::email_exists(&failing, &email, None).await.unwrap());
        assert!(matches!(
            StudentRepository::add(&failing, &s).await,
            Err(AppError::Database(DatabaseError::Query(msg))) if msg == "disk full"
        ));
    }

    #[tokio::test]
    async fn test_update_from_stale_copy_is_rejected() {
        let mock = MockProvider::new();
        let c = course("CS101");
        CourseRepository::add(&mock, &c).await.unwrap();

        let first = CourseRepository::get(&mock, c.id()).await.unwrap().unwrap();
        let second = first.clone();
        CourseRepository::update(&mock, &first).await.unwrap();

        let err = CourseRepository::update(&mock, &second).await.unwrap_err();
        assert!(matches!(err, AppError::Database(DatabaseError::StaleWrite(_))));
        let stored = CourseRepository::get(&mock, c.id()).await.unwrap().unwrap();
        assert_eq!(stored.version(), 1);
    }

    #[tokio::test]
    async fn test_student_delete_frees_seats() {
        let mock = MockProvider::new();
        let s = student("ada@example.com");
        StudentRepository::add(&mock, &s).await.unwrap();
        let mut c = course("CS101");
        c.change_status(crate::domain::CourseStatus::Active).unwrap();
        c.enroll_student(s.id()).unwrap();
        CourseRepository::add(&mock, &c).await.unwrap();

        assert!(StudentRepository::delete(&mock, s.id()).await.unwrap());
        let stored = CourseRepository::get(&mock, c.id()).await.unwrap().unwrap();
        assert_eq!(stored.current_enrollment(), 0);
        assert_eq!(stored.version(), 1);
    }

    #[tokio::test]
    async fn test_call_count_and_health() {
        let mock = MockProvider::new();
        assert_eq!(mock.call_count(), 0);
        assert!(mock.health_check().await.is_ok());
        assert_eq!(mock.call_count(), 1);

        mock.set_healthy(false);
        assert!(mock.health_check().await.is_err());
    }

    #[tokio::test]
    async fn test_course_delete_cascades_to_assignments() {
        let mock = MockProvider::new();
        let c = course("CS101");
        CourseRepository::add(&mock, &c).await.unwrap();

        let profile = TeacherProfile::new(
            FullName::parse("Alan", None, "Turing").unwrap(),
            Email::parse("alan@uni.edu").unwrap(),
            "Computer Science",
            None,
        )
        .unwrap();
        let mut t = Teacher::hire(
            profile,
            EmployeeId::parse("EMP-1001").unwrap(),
            TeacherTitle::Lecturer,
            None,
        )
        .unwrap();
        t.assign_course(c.id()).unwrap();
        TeacherRepository::add(&mock, &t).await.unwrap();

        assert!(CourseRepository::delete(&mock, c.id()).await.unwrap());
        let t = TeacherRepository::get(&mock, t.id()).await.unwrap().unwrap();
        assert_eq!(t.course_load(), 0);
    }

    #[tokio::test]
    async fn test_recording_publisher() {
        let publisher = RecordingEventPublisher::new();
        let c = course("MATH200");
        publisher.publish(c.pending_events()).await.unwrap();
        assert_eq!(publisher.event_names(), vec!["course_created"]);

        let failing = RecordingEventPublisher::failing();
        assert!(failing.publish(c.pending_events()).await.is_err());
        assert_eq!(failing.publish_calls(), 1);
        assert!(failing.events().is_empty());
    }
}
