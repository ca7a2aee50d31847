//! Validated value objects for the student tracker domain.
//!
//! Every type in this module can only be constructed through a parsing
//! function that enforces its format rules, so holding one is proof that the
//! value is valid. Inputs are normalized (trimmed, re-cased, stripped of
//! formatting characters) before validation.
//!
//! ```
//! use student_tracker::domain::value_objects::{Email, FullName, PhoneNumber};
//!
//! let email = Email::parse("  Ada@Example.EDU ").unwrap();
//! assert_eq!(email.as_str(), "ada@example.edu");
//!
//! let name = FullName::parse("ada", None, "LOVELACE").unwrap();
//! assert_eq!(name.display_name(), "Ada Lovelace");
//!
//! let phone = PhoneNumber::parse("555.234.5678").unwrap();
//! assert_eq!(phone.formatted(), "(555) 234-5678");
//! ```

use std::fmt;
use std::sync::LazyLock;

use chrono::NaiveTime;
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::error::{FieldErrors, ValidationError};

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}$").expect("email regex is valid")
});
static POSTAL_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{5}(-\d{4})?$").expect("postal code regex is valid"));
static COURSE_CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Z]{2,4})([0-9]{3,4})[A-Z]?$").expect("course code regex is valid")
});
static EMPLOYEE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{2,4}-[0-9]{4,6}$").expect("employee id regex is valid"));

const PERSONAL_EMAIL_DOMAINS: &[&str] = &[
    "gmail.com",
    "yahoo.com",
    "outlook.com",
    "hotmail.com",
    "icloud.com",
    "aol.com",
    "protonmail.com",
    "live.com",
];

// ============================================================================
// Email
// ============================================================================

/// Broad classification of an email address by its domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EmailDomainKind {
    Educational,
    Personal,
    Organizational,
}

/// A validated, lowercased email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Email(String);

impl Email {
    pub const MAX_LEN: usize = 254;

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let email = input.trim().to_lowercase();
        if email.is_empty() {
            return Err(ValidationError::invalid("email", "is required"));
        }
        if email.len() > Self::MAX_LEN {
            return Err(ValidationError::invalid(
                "email",
                format!("must be at most {} characters", Self::MAX_LEN),
            ));
        }
        if !EMAIL_RE.is_match(&email) {
            return Err(ValidationError::invalid(
                "email",
                format!("'{}' is not a valid email address", email),
            ));
        }
        Ok(Self(email))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn local_part(&self) -> &str {
        self.0.split('@').next().unwrap_or("")
    }

    pub fn domain(&self) -> &str {
        self.0.split('@').nth(1).unwrap_or("")
    }

    pub fn domain_kind(&self) -> EmailDomainKind {
        let domain = self.domain();
        if domain.ends_with(".edu") || domain.contains(".edu.") || domain.contains(".ac.") {
            EmailDomainKind::Educational
        } else if PERSONAL_EMAIL_DOMAINS.contains(&domain) {
            EmailDomainKind::Personal
        } else {
            EmailDomainKind::Organizational
        }
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// FullName
// ============================================================================

/// A person's name with normalized casing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullName {
    first: String,
    middle: Option<String>,
    last: String,
}

impl FullName {
    pub const MAX_PART_LEN: usize = 50;

    pub fn parse(first: &str, middle: Option<&str>, last: &str) -> Result<Self, ValidationError> {
        let mut errors = FieldErrors::new();
        let first = errors.capture(Self::normalize_part("firstName", first));
        let last = errors.capture(Self::normalize_part("lastName", last));
        let middle = match middle.map(str::trim).filter(|m| !m.is_empty()) {
            Some(m) => errors.capture(Self::normalize_part("middleName", m)).map(Some),
            None => Some(None),
        };
        errors.into_result()?;

        match (first, middle, last) {
            (Some(first), Some(middle), Some(last)) => Ok(Self { first, middle, last }),
            _ => Err(ValidationError::InvalidFormat("name".to_string())),
        }
    }

    fn normalize_part(field: &str, raw: &str) -> Result<String, ValidationError> {
        let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            return Err(ValidationError::invalid(field, "is required"));
        }
        if collapsed.chars().count() > Self::MAX_PART_LEN {
            return Err(ValidationError::invalid(
                field,
                format!("must be at most {} characters", Self::MAX_PART_LEN),
            ));
        }
        if !collapsed.chars().next().is_some_and(char::is_alphabetic) {
            return Err(ValidationError::invalid(field, "must start with a letter"));
        }
        if let Some(bad) = collapsed
            .chars()
            .find(|c| !(c.is_alphabetic() || matches!(c, ' ' | '-' | '\'' | '.')))
        {
            return Err(ValidationError::invalid(
                field,
                format!("contains invalid character '{}'", bad),
            ));
        }
        Ok(title_case(&collapsed))
    }

    pub fn first(&self) -> &str {
        &self.first
    }

    pub fn middle(&self) -> Option<&str> {
        self.middle.as_deref()
    }

    pub fn last(&self) -> &str {
        &self.last
    }

    /// `First Middle Last`
    pub fn display_name(&self) -> String {
        match &self.middle {
            Some(middle) => format!("{} {} {}", self.first, middle, self.last),
            None => format!("{} {}", self.first, self.last),
        }
    }

    /// `Last, First M.`
    pub fn formal_name(&self) -> String {
        match self.middle.as_deref().and_then(|m| m.chars().next()) {
            Some(initial) => format!("{}, {} {}.", self.last, self.first, initial),
            None => format!("{}, {}", self.last, self.first),
        }
    }

    pub fn initials(&self) -> String {
        [Some(self.first.as_str()), self.middle.as_deref(), Some(self.last.as_str())]
            .into_iter()
            .flatten()
            .filter_map(|part| part.chars().next())
            .map(|c| format!("{}.", c))
            .collect()
    }
}

impl fmt::Display for FullName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

fn title_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut capitalize_next = true;
    for c in input.chars() {
        if capitalize_next {
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
        capitalize_next = matches!(c, ' ' | '-' | '\'');
    }
    out
}

// ============================================================================
// Gpa
// ============================================================================

/// Academic standing derived from a GPA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AcademicStanding {
    DeansList,
    Good,
    Probation,
}

/// Grade point average on a 4.0 scale, stored with two decimals.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Gpa(f64);

impl Gpa {
    pub const MIN: f64 = 0.0;
    pub const MAX: f64 = 4.0;

    const LETTER_BANDS: [(f64, &'static str); 11] = [
        (3.85, "A"),
        (3.5, "A-"),
        (3.15, "B+"),
        (2.85, "B"),
        (2.5, "B-"),
        (2.15, "C+"),
        (1.85, "C"),
        (1.5, "C-"),
        (1.15, "D+"),
        (0.85, "D"),
        (0.5, "D-"),
    ];

    pub fn new(value: f64) -> Result<Self, ValidationError> {
        if !value.is_finite() {
            return Err(ValidationError::invalid("gpa", "must be a finite number"));
        }
        if !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(ValidationError::invalid(
                "gpa",
                format!("must be between {:.1} and {:.1}", Self::MIN, Self::MAX),
            ));
        }
        Ok(Self((value * 100.0).round() / 100.0))
    }

    #[inline]
    pub fn value(self) -> f64 {
        self.0
    }

    pub fn letter_grade(self) -> &'static str {
        Self::LETTER_BANDS
            .iter()
            .find(|(threshold, _)| self.0 >= *threshold)
            .map(|(_, letter)| *letter)
            .unwrap_or("F")
    }

    pub fn standing(self) -> AcademicStanding {
        if self.0 >= 3.5 {
            AcademicStanding::DeansList
        } else if self.0 >= 2.0 {
            AcademicStanding::Good
        } else {
            AcademicStanding::Probation
        }
    }
}

impl fmt::Display for Gpa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

// ============================================================================
// PhoneNumber
// ============================================================================

/// A North American phone number stored as ten digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let digits: String = input.chars().filter(char::is_ascii_digit).collect();
        let digits = match digits.len() {
            10 => digits,
            11 if digits.starts_with('1') => digits[1..].to_string(),
            0 => return Err(ValidationError::invalid("phone", "is required")),
            n => {
                return Err(ValidationError::invalid(
                    "phone",
                    format!("must contain 10 digits, got {}", n),
                ));
            }
        };

        if matches!(digits.as_bytes()[0], b'0' | b'1') {
            return Err(ValidationError::invalid(
                "phone",
                "area code cannot start with 0 or 1",
            ));
        }
        if matches!(digits.as_bytes()[3], b'0' | b'1') {
            return Err(ValidationError::invalid(
                "phone",
                "exchange cannot start with 0 or 1",
            ));
        }
        Ok(Self(digits))
    }

    /// The ten digits without formatting.
    pub fn digits(&self) -> &str {
        &self.0
    }

    pub fn area_code(&self) -> &str {
        &self.0[0..3]
    }

    pub fn exchange(&self) -> &str {
        &self.0[3..6]
    }

    pub fn subscriber(&self) -> &str {
        &self.0[6..10]
    }

    /// `(555) 234-5678`
    pub fn formatted(&self) -> String {
        format!(
            "({}) {}-{}",
            self.area_code(),
            self.exchange(),
            self.subscriber()
        )
    }

    /// `+15552345678`
    pub fn e164(&self) -> String {
        format!("+1{}", self.0)
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.formatted())
    }
}

// ============================================================================
// Address
// ============================================================================

/// A postal address owned by a student.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    street: String,
    city: String,
    state: String,
    postal_code: String,
    country: String,
}

impl Address {
    pub const DEFAULT_COUNTRY: &'static str = "US";

    pub fn parse(
        street: &str,
        city: &str,
        state: &str,
        postal_code: &str,
        country: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let mut errors = FieldErrors::new();
        let street = errors.capture(required_text("street", street, 1, 200));
        let city = errors.capture(required_text("city", city, 1, 100));

        let state = state.trim().to_uppercase();
        if state.len() != 2 || !state.chars().all(|c| c.is_ascii_alphabetic()) {
            errors.push("state", "must be a two-letter state code");
        }

        let postal_code = postal_code.trim().to_string();
        if !POSTAL_CODE_RE.is_match(&postal_code) {
            errors.push("postalCode", "must be a 5-digit ZIP or ZIP+4");
        }

        let country = errors.capture(required_text(
            "country",
            country.unwrap_or(Self::DEFAULT_COUNTRY),
            2,
            60,
        ));

        errors.into_result()?;
        match (street, city, country) {
            (Some(street), Some(city), Some(country)) => Ok(Self {
                street,
                city,
                state,
                postal_code,
                country,
            }),
            _ => Err(ValidationError::InvalidFormat("address".to_string())),
        }
    }

    pub fn street(&self) -> &str {
        &self.street
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn postal_code(&self) -> &str {
        &self.postal_code
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    /// `123 Main St, Springfield, IL 62704, US`
    pub fn single_line(&self) -> String {
        format!(
            "{}, {}, {} {}, {}",
            self.street, self.city, self.state, self.postal_code, self.country
        )
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.single_line())
    }
}

/// Trims `raw` and checks its character count lies within `min..=max`.
pub(crate) fn required_text(
    field: &str,
    raw: &str,
    min: usize,
    max: usize,
) -> Result<String, ValidationError> {
    let value = raw.trim();
    let len = value.chars().count();
    if len == 0 {
        return Err(ValidationError::invalid(field, "is required"));
    }
    if len < min || len > max {
        return Err(ValidationError::invalid(
            field,
            format!("must be between {} and {} characters", min, max),
        ));
    }
    Ok(value.to_string())
}

// ============================================================================
// Course values
// ============================================================================

/// Academic level of a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CourseLevel {
    Introductory,
    Intermediate,
    Advanced,
    Graduate,
}

impl CourseLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            CourseLevel::Introductory => "introductory",
            CourseLevel::Intermediate => "intermediate",
            CourseLevel::Advanced => "advanced",
            CourseLevel::Graduate => "graduate",
        }
    }
}

impl std::str::FromStr for CourseLevel {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "introductory" => Ok(CourseLevel::Introductory),
            "intermediate" => Ok(CourseLevel::Intermediate),
            "advanced" => Ok(CourseLevel::Advanced),
            "graduate" => Ok(CourseLevel::Graduate),
            other => Err(ValidationError::invalid(
                "level",
                format!("unknown course level '{}'", other),
            )),
        }
    }
}

/// A catalog code such as `CS101` or `MATH2010H`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CourseCode(String);

impl CourseCode {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let code: String = input
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .flat_map(char::to_uppercase)
            .collect();
        if code.is_empty() {
            return Err(ValidationError::invalid("code", "is required"));
        }
        if !COURSE_CODE_RE.is_match(&code) {
            return Err(ValidationError::invalid(
                "code",
                "must be 2-4 letters followed by 3-4 digits and an optional letter suffix",
            ));
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn subject(&self) -> &str {
        let end = self
            .0
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(self.0.len());
        &self.0[..end]
    }

    pub fn number(&self) -> u32 {
        self.0
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(char::is_ascii_digit)
            .collect::<String>()
            .parse()
            .unwrap_or(0)
    }

    pub fn suggested_level(&self) -> CourseLevel {
        // Four-digit catalogs (e.g. 2010) scale down to the three-digit bands.
        let number = match self.number() {
            n if n >= 1000 => n / 10,
            n => n,
        };
        match number {
            0..200 => CourseLevel::Introductory,
            200..300 => CourseLevel::Intermediate,
            300..500 => CourseLevel::Advanced,
            _ => CourseLevel::Graduate,
        }
    }
}

impl fmt::Display for CourseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Credit hours awarded for a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Credits(u8);

impl Credits {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 6;

    pub fn new(value: i64) -> Result<Self, ValidationError> {
        if !(i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
            return Err(ValidationError::invalid(
                "credits",
                format!("must be between {} and {}", Self::MIN, Self::MAX),
            ));
        }
        Ok(Self(value as u8))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

/// Day of the week a course meets.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub fn short_name(self) -> &'static str {
        match self {
            DayOfWeek::Monday => "Mon",
            DayOfWeek::Tuesday => "Tue",
            DayOfWeek::Wednesday => "Wed",
            DayOfWeek::Thursday => "Thu",
            DayOfWeek::Friday => "Fri",
            DayOfWeek::Saturday => "Sat",
            DayOfWeek::Sunday => "Sun",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DayOfWeek::Monday => "monday",
            DayOfWeek::Tuesday => "tuesday",
            DayOfWeek::Wednesday => "wednesday",
            DayOfWeek::Thursday => "thursday",
            DayOfWeek::Friday => "friday",
            DayOfWeek::Saturday => "saturday",
            DayOfWeek::Sunday => "sunday",
        }
    }
}

impl std::str::FromStr for DayOfWeek {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monday" => Ok(DayOfWeek::Monday),
            "tuesday" => Ok(DayOfWeek::Tuesday),
            "wednesday" => Ok(DayOfWeek::Wednesday),
            "thursday" => Ok(DayOfWeek::Thursday),
            "friday" => Ok(DayOfWeek::Friday),
            "saturday" => Ok(DayOfWeek::Saturday),
            "sunday" => Ok(DayOfWeek::Sunday),
            other => Err(ValidationError::invalid(
                "schedule.days",
                format!("unknown day '{}'", other),
            )),
        }
    }
}

/// Weekly meeting pattern of a course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseSchedule {
    days: Vec<DayOfWeek>,
    start_time: NaiveTime,
    end_time: NaiveTime,
    room: Option<String>,
}

impl CourseSchedule {
    pub fn new(
        days: &[DayOfWeek],
        start_time: NaiveTime,
        end_time: NaiveTime,
        room: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let mut errors = FieldErrors::new();
        let mut days = days.to_vec();
        days.sort();
        days.dedup();
        if days.is_empty() {
            errors.push("schedule.days", "at least one meeting day is required");
        }
        if start_time >= end_time {
            errors.push("schedule.endTime", "must be after the start time");
        }
        let room = room.map(str::trim).filter(|r| !r.is_empty());
        if room.is_some_and(|r| r.chars().count() > 50) {
            errors.push("schedule.room", "must be at most 50 characters");
        }
        errors.into_result()?;

        Ok(Self {
            days,
            start_time,
            end_time,
            room: room.map(str::to_string),
        })
    }

    pub fn days(&self) -> &[DayOfWeek] {
        &self.days
    }

    pub fn start_time(&self) -> NaiveTime {
        self.start_time
    }

    pub fn end_time(&self) -> NaiveTime {
        self.end_time
    }

    pub fn room(&self) -> Option<&str> {
        self.room.as_deref()
    }

    pub fn weekly_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes() * self.days.len() as i64
    }

    /// `Mon/Wed 09:00-10:15 (Room 204)`
    pub fn summary(&self) -> String {
        let days = self
            .days
            .iter()
            .map(|d| d.short_name())
            .collect::<Vec<_>>()
            .join("/");
        let mut summary = format!(
            "{} {}-{}",
            days,
            self.start_time.format("%H:%M"),
            self.end_time.format("%H:%M")
        );
        if let Some(room) = &self.room {
            summary.push_str(&format!(" ({})", room));
        }
        summary
    }
}

// ============================================================================
// EmployeeId
// ============================================================================

/// Staff identifier such as `EMP-004217`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmployeeId(String);

impl EmployeeId {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let id = input.trim().to_uppercase();
        if id.is_empty() {
            return Err(ValidationError::invalid("employeeId", "is required"));
        }
        if !EMPLOYEE_ID_RE.is_match(&id) {
            return Err(ValidationError::invalid(
                "employeeId",
                "must look like 'EMP-1234' (2-4 letters, a hyphen, 4-6 digits)",
            ));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod email {
        use super::*;

        #[test]
        fn test_email_is_normalized() {
            let email = Email::parse("  John.Doe@Example.COM ").unwrap();
            assert_eq!(email.as_str(), "john.doe@example.com");
            assert_eq!(email.local_part(), "john.doe");
            assert_eq!(email.domain(), "example.com");
        }

        #[test]
        fn test_invalid_emails_rejected() {
            for bad in ["", "   ", "plainaddress", "a@b", "a b@c.com", "@example.com"] {
                assert!(Email::parse(bad).is_err(), "{bad:?} should be rejected");
            }
        }

        #[test]
        fn test_email_too_long() {
            let local = "a".repeat(250);
            assert!(Email::parse(&format!("{local}@example.com")).is_err());
        }

        #[test]
        fn test_email_domain_kind() {
            let kind = |s: &str| Email::parse(s).unwrap().domain_kind();
            assert_eq!(kind("prof@mit.edu"), EmailDomainKind::Educational);
            assert_eq!(kind("s@cs.ox.ac.uk"), EmailDomainKind::Educational);
            assert_eq!(kind("me@gmail.com"), EmailDomainKind::Personal);
            assert_eq!(kind("dev@acme.io"), EmailDomainKind::Organizational);
        }

        #[test]
        fn test_email_error_names_field() {
            let err = Email::parse("nope").unwrap_err();
            assert_eq!(err.field_errors()[0].field, "email");
        }
    }

    mod full_name {
        use super::*;

        #[test]
        fn test_name_casing_is_normalized() {
            let name = FullName::parse("mary-jane", Some("  "), "o'NEIL").unwrap();
            assert_eq!(name.first(), "Mary-Jane");
            assert_eq!(name.middle(), None);
            assert_eq!(name.last(), "O'Neil");
        }

        #[test]
        fn test_whitespace_is_collapsed() {
            let name = FullName::parse("  anna   maria ", None, "van  der berg").unwrap();
            assert_eq!(name.first(), "Anna Maria");
            assert_eq!(name.last(), "Van Der Berg");
        }

        #[test]
        fn test_name_formats() {
            let name = FullName::parse("john", Some("ronald"), "tolkien").unwrap();
            assert_eq!(name.display_name(), "John Ronald Tolkien");
            assert_eq!(name.formal_name(), "Tolkien, John R.");
            assert_eq!(name.initials(), "J.R.T.");

            let name = FullName::parse("ada", None, "lovelace").unwrap();
            assert_eq!(name.formal_name(), "Lovelace, Ada");
            assert_eq!(name.initials(), "A.L.");
        }

        #[test]
        fn test_name_reports_every_bad_part() {
            let err = FullName::parse("", None, "R2D2").unwrap_err();
            let fields: Vec<_> = err.field_errors().into_iter().map(|e| e.field).collect();
            assert_eq!(fields, vec!["firstName", "lastName"]);
        }

        #[test]
        fn test_name_length_limit() {
            assert!(FullName::parse(&"a".repeat(51), None, "Smith").is_err());
            assert!(FullName::parse(&"a".repeat(50), None, "Smith").is_ok());
        }

        #[test]
        fn test_name_must_start_with_letter() {
            assert!(FullName::parse("-ann", None, "Smith").is_err());
        }
    }

    mod gpa {
        use super::*;

        #[test]
        fn test_gpa_range() {
            assert!(Gpa::new(0.0).is_ok());
            assert!(Gpa::new(4.0).is_ok());
            assert!(Gpa::new(-0.01).is_err());
            assert!(Gpa::new(4.01).is_err());
            assert!(Gpa::new(f64::NAN).is_err());
        }

        #[test]
        fn test_gpa_rounds_to_two_decimals() {
            assert_eq!(Gpa::new(3.14159).unwrap().value(), 3.14);
            assert_eq!(Gpa::new(3.146).unwrap().to_string(), "3.15");
        }

        #[test]
        fn test_letter_grade_bands() {
            let grade = |v: f64| Gpa::new(v).unwrap().letter_grade();
            assert_eq!(grade(4.0), "A");
            assert_eq!(grade(3.85), "A");
            assert_eq!(grade(3.6), "A-");
            assert_eq!(grade(3.2), "B+");
            assert_eq!(grade(3.0), "B");
            assert_eq!(grade(2.5), "B-");
            assert_eq!(grade(2.2), "C+");
            assert_eq!(grade(2.0), "C");
            assert_eq!(grade(1.5), "C-");
            assert_eq!(grade(1.2), "D+");
            assert_eq!(grade(1.0), "D");
            assert_eq!(grade(0.5), "D-");
            assert_eq!(grade(0.2), "F");
        }

        #[test]
        fn test_academic_standing() {
            assert_eq!(Gpa::new(3.5).unwrap().standing(), AcademicStanding::DeansList);
            assert_eq!(Gpa::new(2.0).unwrap().standing(), AcademicStanding::Good);
            assert_eq!(Gpa::new(1.99).unwrap().standing(), AcademicStanding::Probation);
        }
    }

    mod phone {
        use super::*;

        #[test]
        fn test_phone_decomposition() {
            let phone = PhoneNumber::parse("+1 (555) 234-5678").unwrap();
            assert_eq!(phone.digits(), "5552345678");
            assert_eq!(phone.area_code(), "555");
            assert_eq!(phone.exchange(), "234");
            assert_eq!(phone.subscriber(), "5678");
            assert_eq!(phone.formatted(), "(555) 234-5678");
            assert_eq!(phone.e164(), "+15552345678");
        }

        #[test]
        fn test_phone_digit_count() {
            assert!(PhoneNumber::parse("555-2345").is_err());
            assert!(PhoneNumber::parse("25552345678").is_err());
            assert!(PhoneNumber::parse("").is_err());
        }

        #[test]
        fn test_phone_area_code_and_exchange_rules() {
            assert!(PhoneNumber::parse("055-234-5678").is_err());
            assert!(PhoneNumber::parse("155-234-5678").is_err());
            assert!(PhoneNumber::parse("555-034-5678").is_err());
            assert!(PhoneNumber::parse("555-134-5678").is_err());
        }
    }

    mod address {
        use super::*;

        #[test]
        fn test_address_normalization() {
            let address =
                Address::parse(" 123 Main St ", "Springfield", "il", "62704", None).unwrap();
            assert_eq!(address.state(), "IL");
            assert_eq!(address.country(), "US");
            assert_eq!(
                address.single_line(),
                "123 Main St, Springfield, IL 62704, US"
            );
        }

        #[test]
        fn test_zip_plus_four() {
            assert!(Address::parse("1 A St", "Town", "NY", "10001-1234", Some("US")).is_ok());
            assert!(Address::parse("1 A St", "Town", "NY", "1000", Some("US")).is_err());
        }

        #[test]
        fn test_address_collects_errors() {
            let err = Address::parse("", "", "Illinois", "abc", None).unwrap_err();
            let fields: Vec<_> = err.field_errors().into_iter().map(|e| e.field).collect();
            assert_eq!(fields, vec!["street", "city", "state", "postalCode"]);
        }
    }

    mod course_values {
        use super::*;

        #[test]
        fn test_course_code_normalization() {
            let code = CourseCode::parse(" cs-101 ").unwrap();
            assert_eq!(code.as_str(), "CS101");
            assert_eq!(code.subject(), "CS");
            assert_eq!(code.number(), 101);
        }

        #[test]
        fn test_course_code_rejects_bad_shapes() {
            for bad in ["", "C101", "CS1", "COMPS101", "101CS", "CS101HH"] {
                assert!(CourseCode::parse(bad).is_err(), "{bad:?} should be rejected");
            }
        }

        #[test]
        fn test_suggested_level() {
            let level = |s: &str| CourseCode::parse(s).unwrap().suggested_level();
            assert_eq!(level("CS101"), CourseLevel::Introductory);
            assert_eq!(level("CS250"), CourseLevel::Intermediate);
            assert_eq!(level("CS410"), CourseLevel::Advanced);
            assert_eq!(level("CS610"), CourseLevel::Graduate);
            assert_eq!(level("MATH2010H"), CourseLevel::Intermediate);
        }

        #[test]
        fn test_credits_range() {
            assert!(Credits::new(0).is_err());
            assert!(Credits::new(7).is_err());
            assert_eq!(Credits::new(3).unwrap().value(), 3);
        }

        #[test]
        fn test_schedule_summary_and_minutes() {
            let schedule = CourseSchedule::new(
                &[DayOfWeek::Wednesday, DayOfWeek::Monday, DayOfWeek::Monday],
                NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(10, 15, 0).unwrap(),
                Some("Room 204"),
            )
            .unwrap();
            assert_eq!(schedule.days(), &[DayOfWeek::Monday, DayOfWeek::Wednesday]);
            assert_eq!(schedule.summary(), "Mon/Wed 09:00-10:15 (Room 204)");
            assert_eq!(schedule.weekly_minutes(), 150);
        }

        #[test]
        fn test_schedule_requires_days_and_ordered_times() {
            let t = |h| NaiveTime::from_hms_opt(h, 0, 0).unwrap();
            let err = CourseSchedule::new(&[], t(10), t(9), None).unwrap_err();
            assert_eq!(err.field_errors().len(), 2);
        }
    }

    mod employee_id {
        use super::*;

        #[test]
        fn test_employee_id_normalized() {
            assert_eq!(EmployeeId::parse(" emp-0042 ").unwrap().as_str(), "EMP-0042");
        }

        #[test]
        fn test_employee_id_shape() {
            assert!(EmployeeId::parse("EMP0042").is_err());
            assert!(EmployeeId::parse("E-0042").is_err());
            assert!(EmployeeId::parse("EMP-42").is_err());
        }
    }
}
