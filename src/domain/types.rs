//! Pagination, list filters and response envelopes shared across layers.

use std::cmp::Ordering;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::course::{Course, CourseStatus};
use super::error::{FieldError, ValidationError};
use super::student::{Student, StudentStatus};
use super::teacher::{Teacher, TeacherTitle};
use super::value_objects::{CourseLevel, FullName};

// ============================================================================
// Pagination
// ============================================================================

/// A validated page request. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: Self::DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub const DEFAULT_PAGE_SIZE: u32 = 10;
    pub const MAX_PAGE_SIZE: u32 = 100;

    pub fn new(page: Option<i64>, page_size: Option<i64>) -> Result<Self, ValidationError> {
        let page = page.unwrap_or(1);
        let page_size = page_size.unwrap_or(i64::from(Self::DEFAULT_PAGE_SIZE));
        let mut errors = Vec::new();
        if !(1..=i64::from(u32::MAX)).contains(&page) {
            errors.push(FieldError::new("page", "must be at least 1"));
        }
        if !(1..=i64::from(Self::MAX_PAGE_SIZE)).contains(&page_size) {
            errors.push(FieldError::new(
                "pageSize",
                format!("must be between 1 and {}", Self::MAX_PAGE_SIZE),
            ));
        }
        if !errors.is_empty() {
            return Err(ValidationError::Fields(errors));
        }
        Ok(Self {
            page: page as u32,
            page_size: page_size as u32,
        })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }
}

/// One page of results plus navigation metadata.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total_count: u64,
    pub total_pages: u32,
    pub has_previous_page: bool,
    pub has_next_page: bool,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total_count: u64, request: PageRequest) -> Self {
        let total_pages = total_count.div_ceil(u64::from(request.page_size)) as u32;
        Self {
            items,
            page: request.page,
            page_size: request.page_size,
            total_count,
            total_pages,
            has_previous_page: request.page > 1,
            has_next_page: request.page < total_pages,
        }
    }

    /// Slices an in-memory collection that is already filtered and sorted.
    pub fn from_all(all: Vec<T>, request: PageRequest) -> Self {
        let total = all.len() as u64;
        let items = all
            .into_iter()
            .skip(request.offset() as usize)
            .take(request.page_size as usize)
            .collect();
        Self::new(items, total, request)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedResult<U> {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            page_size: self.page_size,
            total_count: self.total_count,
            total_pages: self.total_pages,
            has_previous_page: self.has_previous_page,
            has_next_page: self.has_next_page,
        }
    }
}

// ============================================================================
// Sorting
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

impl FromStr for SortDirection {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            _ => Err(ValidationError::invalid(
                "sortDirection",
                "must be 'asc' or 'desc'",
            )),
        }
    }
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

fn compare_names(a: &FullName, b: &FullName) -> Ordering {
    a.last()
        .to_lowercase()
        .cmp(&b.last().to_lowercase())
        .then_with(|| a.first().to_lowercase().cmp(&b.first().to_lowercase()))
}

/// Orders `None` after every value regardless of direction, like `NULLS LAST`.
fn compare_optional<T: PartialOrd>(a: Option<T>, b: Option<T>, dir: SortDirection) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => dir.apply(a.partial_cmp(&b).unwrap_or(Ordering::Equal)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn parse_sort_field<T>(raw: &str, options: &[(&str, T)]) -> Result<T, ValidationError>
where
    T: Copy,
{
    options
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(raw))
        .map(|(_, field)| *field)
        .ok_or_else(|| {
            let allowed = options.iter().map(|(n, _)| *n).collect::<Vec<_>>().join(", ");
            ValidationError::invalid("sortBy", format!("must be one of: {}", allowed))
        })
}

// ============================================================================
// Student filter
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StudentSortField {
    #[default]
    Name,
    Email,
    Gpa,
    EnrollmentDate,
    CreatedAt,
}

impl FromStr for StudentSortField {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_sort_field(
            s,
            &[
                ("name", StudentSortField::Name),
                ("email", StudentSortField::Email),
                ("gpa", StudentSortField::Gpa),
                ("enrollmentDate", StudentSortField::EnrollmentDate),
                ("createdAt", StudentSortField::CreatedAt),
            ],
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudentFilter {
    pub search: Option<String>,
    pub status: Option<StudentStatus>,
    pub min_gpa: Option<f64>,
    pub max_gpa: Option<f64>,
    pub sort_by: StudentSortField,
    pub sort_direction: SortDirection,
}

impl StudentFilter {
    /// Lowercased, trimmed search term, `None` when blank.
    pub fn search_term(&self) -> Option<String> {
        normalized_search(self.search.as_deref())
    }

    pub fn matches(&self, student: &Student) -> bool {
        if let Some(term) = self.search_term() {
            let name = student.name();
            let hit = contains_ci(name.first(), &term)
                || contains_ci(name.last(), &term)
                || student.email().as_str().contains(&term);
            if !hit {
                return false;
            }
        }
        if self.status.is_some_and(|s| s != student.status()) {
            return false;
        }
        if self.min_gpa.is_some() || self.max_gpa.is_some() {
            let Some(gpa) = student.gpa().map(|g| g.value()) else {
                return false;
            };
            if self.min_gpa.is_some_and(|min| gpa < min) || self.max_gpa.is_some_and(|max| gpa > max) {
                return false;
            }
        }
        true
    }

    pub fn compare(&self, a: &Student, b: &Student) -> Ordering {
        let dir = self.sort_direction;
        let primary = match self.sort_by {
            StudentSortField::Name => dir.apply(compare_names(a.name(), b.name())),
            StudentSortField::Email => dir.apply(a.email().as_str().cmp(b.email().as_str())),
            StudentSortField::Gpa => {
                compare_optional(a.gpa().map(|g| g.value()), b.gpa().map(|g| g.value()), dir)
            }
            StudentSortField::EnrollmentDate => {
                dir.apply(a.enrollment_date().cmp(&b.enrollment_date()))
            }
            StudentSortField::CreatedAt => dir.apply(a.created_at().cmp(&b.created_at())),
        };
        primary.then_with(|| a.id().into_inner().cmp(&b.id().into_inner()))
    }
}

// ============================================================================
// Course filter
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CourseSortField {
    Title,
    #[default]
    Code,
    Credits,
    CreatedAt,
}

impl FromStr for CourseSortField {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_sort_field(
            s,
            &[
                ("title", CourseSortField::Title),
                ("code", CourseSortField::Code),
                ("credits", CourseSortField::Credits),
                ("createdAt", CourseSortField::CreatedAt),
            ],
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CourseFilter {
    pub search: Option<String>,
    pub status: Option<CourseStatus>,
    pub level: Option<CourseLevel>,
    pub has_available_seats: Option<bool>,
    pub sort_by: CourseSortField,
    pub sort_direction: SortDirection,
}

impl CourseFilter {
    pub fn search_term(&self) -> Option<String> {
        normalized_search(self.search.as_deref())
    }

    pub fn matches(&self, course: &Course) -> bool {
        if let Some(term) = self.search_term() {
            if !contains_ci(course.title(), &term) && !contains_ci(course.code().as_str(), &term) {
                return false;
            }
        }
        if self.status.is_some_and(|s| s != course.status()) {
            return false;
        }
        if self.level.is_some_and(|l| l != course.level()) {
            return false;
        }
        if self.has_available_seats.is_some_and(|open| open == course.is_full()) {
            return false;
        }
        true
    }

    pub fn compare(&self, a: &Course, b: &Course) -> Ordering {
        let primary = match self.sort_by {
            CourseSortField::Title => a.title().to_lowercase().cmp(&b.title().to_lowercase()),
            CourseSortField::Code => a.code().as_str().cmp(b.code().as_str()),
            CourseSortField::Credits => a.credits().cmp(&b.credits()),
            CourseSortField::CreatedAt => a.created_at().cmp(&b.created_at()),
        };
        self.sort_direction
            .apply(primary)
            .then_with(|| a.id().into_inner().cmp(&b.id().into_inner()))
    }
}

// ============================================================================
// Teacher filter
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TeacherSortField {
    #[default]
    Name,
    EmployeeId,
    HireDate,
}

impl FromStr for TeacherSortField {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_sort_field(
            s,
            &[
                ("name", TeacherSortField::Name),
                ("employeeId", TeacherSortField::EmployeeId),
                ("hireDate", TeacherSortField::HireDate),
            ],
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeacherFilter {
    pub search: Option<String>,
    pub title: Option<TeacherTitle>,
    pub department: Option<String>,
    pub sort_by: TeacherSortField,
    pub sort_direction: SortDirection,
}

impl TeacherFilter {
    pub fn search_term(&self) -> Option<String> {
        normalized_search(self.search.as_deref())
    }

    pub fn matches(&self, teacher: &Teacher) -> bool {
        if let Some(term) = self.search_term() {
            let name = teacher.name();
            let hit = contains_ci(name.first(), &term)
                || contains_ci(name.last(), &term)
                || teacher.email().as_str().contains(&term);
            if !hit {
                return false;
            }
        }
        if self.title.is_some_and(|t| t != teacher.title()) {
            return false;
        }
        if let Some(department) = self.department.as_deref().map(str::trim) {
            // Full Unicode lowercasing, the same as `LOWER()` in Postgres.
            if !department.is_empty()
                && department.to_lowercase() != teacher.department().to_lowercase()
            {
                return false;
            }
        }
        true
    }

    pub fn compare(&self, a: &Teacher, b: &Teacher) -> Ordering {
        let primary = match self.sort_by {
            TeacherSortField::Name => compare_names(a.name(), b.name()),
            TeacherSortField::EmployeeId => a.employee_id().as_str().cmp(b.employee_id().as_str()),
            TeacherSortField::HireDate => a.hire_date().cmp(&b.hire_date()),
        };
        self.sort_direction
            .apply(primary)
            .then_with(|| a.id().into_inner().cmp(&b.id().into_inner()))
    }
}

fn normalized_search(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
}

// ============================================================================
// Envelopes
// ============================================================================

/// Error body returned by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default)]
    pub errors: Vec<FieldError>,
    pub timestamp: DateTime<Utc>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: None,
            errors: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_errors(mut self, errors: Vec<FieldError>) -> Self {
        self.errors = errors;
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub database: HealthStatus,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

impl HealthResponse {
    pub fn new(database: HealthStatus) -> Self {
        Self {
            status: database,
            database,
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now(),
        }
    }
}
