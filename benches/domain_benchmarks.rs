use chrono::NaiveDate;
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use sha2::{Digest, Sha256};
use student_tracker::app::students::{AddressInput, StudentProfileInput};
use student_tracker::domain::{
    CourseCode, Email, FullName, Gpa, PhoneNumber, SortDirection, Student, StudentFilter,
    StudentProfile, StudentSortField,
};
use validator::Validate;

fn profile_input() -> StudentProfileInput {
    StudentProfileInput {
        first_name: "  ada ".to_string(),
        middle_name: Some("king".to_string()),
        last_name: "LOVELACE".to_string(),
        email: "Ada.Lovelace@Berkeley.EDU".to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(2001, 4, 12).unwrap(),
        phone: Some("+1 (415) 555-0142".to_string()),
        address: Some(AddressInput {
            street: "12 College Ave".to_string(),
            city: "Berkeley".to_string(),
            state: "ca".to_string(),
            postal_code: "94704-1234".to_string(),
            country: None,
        }),
    }
}

fn bench_profile_validation(c: &mut Criterion) {
    let input = profile_input();

    c.bench_function("validate_student_profile_input", |b| {
        b.iter(|| {
            let input = black_box(&input).clone();
            let _ = input.validate();
            let _ = input.into_profile();
        })
    });
}

fn bench_value_objects(c: &mut Criterion) {
    c.bench_function("parse_email", |b| {
        b.iter(|| Email::parse(black_box("  Grace.Hopper@Navy.MIL ")))
    });
    c.bench_function("parse_phone", |b| {
        b.iter(|| PhoneNumber::parse(black_box("1-415-555-0142")))
    });
    c.bench_function("parse_course_code", |b| {
        b.iter(|| CourseCode::parse(black_box("cs-61b")))
    });
    c.bench_function("gpa_letter_grade", |b| {
        b.iter(|| Gpa::new(black_box(3.42)).map(Gpa::letter_grade))
    });
}

fn bench_filter_sort(c: &mut Criterion) {
    let students: Vec<Student> = (0..500)
        .map(|i| {
            let profile = StudentProfile {
                name: FullName::parse(&format!("Student{i}"), None, &format!("Family{}", i % 37))
                    .unwrap(),
                email: Email::parse(&format!("student{i}@example.edu")).unwrap(),
                date_of_birth: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
                phone: None,
                address: None,
            };
            let mut student = Student::register(profile, None).unwrap();
            student.update_gpa(Gpa::new(f64::from(i % 40) / 10.0).unwrap());
            student
        })
        .collect();
    let filter = StudentFilter {
        search: Some("family1".to_string()),
        min_gpa: Some(1.0),
        sort_by: StudentSortField::Gpa,
        sort_direction: SortDirection::Desc,
        ..StudentFilter::default()
    };

    c.bench_function("filter_and_sort_500_students", |b| {
        b.iter(|| {
            let mut hits: Vec<&Student> = students
                .iter()
                .filter(|s| black_box(&filter).matches(s))
                .collect();
            hits.sort_by(|a, b| filter.compare(a, b));
            hits.len()
        })
    });
}

fn bench_api_key_digest(c: &mut Criterion) {
    let key = "a-reasonably-long-api-key-taken-from-the-environment-0123456789";

    c.bench_function("sha256_api_key_digest", |b| {
        b.iter(|| Sha256::digest(black_box(key).as_bytes()))
    });
}

criterion_group!(
    benches,
    bench_profile_validation,
    bench_value_objects,
    bench_filter_sort,
    bench_api_key_digest
);
criterion_main!(benches);
