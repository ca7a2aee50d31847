//! `students` and `student_addresses` tables.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Row, Transaction, postgres::PgRow};
use tracing::instrument;

use super::postgres::{corrupt, like_pattern, limit_offset, missed_update};
use crate::domain::{
    Address, AppError, Email, FullName, Gpa, PageRequest, PagedResult,
    PhoneNumber, SortDirection, Student, StudentFilter, StudentId, StudentProfile, StudentRecord,
    StudentRepository, StudentSortField, StudentStatus,
};

const SELECT_STUDENTS: &str = r#"
    SELECT s.id, s.first_name, s.middle_name, s.last_name, s.email, s.date_of_birth,
           s.phone, s.gpa, s.status, s.enrollment_date, s.created_at, s.updated_at,
           s.version,
           a.street, a.city, a.state, a.postal_code, a.country
    FROM students s
    LEFT JOIN student_addresses a ON a.student_id = s.id
"#;

pub struct PostgresStudentRepository {
    pool: PgPool,
}

impl PostgresStudentRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_student(row: &PgRow) -> Result<Student, AppError> {
        let bad = |e| corrupt("students", e);

        let middle: Option<String> = row.try_get("middle_name")?;
        let name = FullName::parse(
            row.try_get::<&str, _>("first_name")?,
            middle.as_deref(),
            row.try_get::<&str, _>("last_name")?,
        )
        .map_err(bad)?;
        let email = Email::parse(row.try_get::<&str, _>("email")?).map_err(bad)?;
        let phone = row
            .try_get::<Option<&str>, _>("phone")?
            .map(PhoneNumber::parse)
            .transpose()
            .map_err(bad)?;

        let street: Option<String> = row.try_get("street")?;
        let address = match street {
            Some(street) => {
                let country: String = row.try_get("country")?;
                Some(
                    Address::parse(
                        &street,
                        row.try_get::<&str, _>("city")?,
                        row.try_get::<&str, _>("state")?,
                        row.try_get::<&str, _>("postal_code")?,
                        Some(&country),
                    )
                    .map_err(bad)?,
                )
            }
            None => None,
        };

        let gpa = row
            .try_get::<Option<f64>, _>("gpa")?
            .map(Gpa::new)
            .transpose()
            .map_err(bad)?;
        let status: StudentStatus = row
            .try_get::<&str, _>("status")?
            .parse()
            .map_err(bad)?;

        Ok(Student::restore(StudentRecord {
            id: StudentId::from_uuid(row.try_get("id")?),
            profile: StudentProfile {
                name,
                email,
                date_of_birth: row.try_get("date_of_birth")?,
                phone,
                address,
            },
            gpa,
            status,
            enrollment_date: row.try_get("enrollment_date")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            version: row.try_get("version")?,
        }))
    }

    async fn save_address(
        tx: &mut Transaction<'_, Postgres>,
        student: &Student,
    ) -> Result<(), AppError> {
        match student.address() {
            Some(address) => {
                sqlx::query(
                    r#"
                    INSERT INTO student_addresses (student_id, street, city, state, postal_code, country)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    ON CONFLICT (student_id) DO UPDATE SET
                        street = EXCLUDED.street,
                        city = EXCLUDED.city,
                        state = EXCLUDED.state,
                        postal_code = EXCLUDED.postal_code,
                        country = EXCLUDED.country
                    "#,
                )
                .bind(student.id().into_inner())
                .bind(address.street())
                .bind(address.city())
                .bind(address.state())
                .bind(address.postal_code())
                .bind(address.country())
                .execute(&mut **tx)
                .await?;
            }
            None => {
                sqlx::query("DELETE FROM student_addresses WHERE student_id = $1")
                    .bind(student.id().into_inner())
                    .execute(&mut **tx)
                    .await?;
            }
        }
        Ok(())
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &StudentFilter) {
    qb.push(" WHERE TRUE");
    if let Some(term) = filter.search_term() {
        let pattern = like_pattern(&term);
        qb.push(" AND (LOWER(s.first_name) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR LOWER(s.last_name) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR s.email LIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(status) = filter.status {
        qb.push(" AND s.status = ").push_bind(status.as_str());
    }
    if let Some(min) = filter.min_gpa {
        qb.push(" AND s.gpa >= ").push_bind(min);
    }
    if let Some(max) = filter.max_gpa {
        qb.push(" AND s.gpa <= ").push_bind(max);
    }
}

fn order_by(filter: &StudentFilter) -> String {
    let dir = filter.sort_direction.as_sql();
    let primary = match filter.sort_by {
        StudentSortField::Name => format!("LOWER(s.last_name) {dir}, LOWER(s.first_name) {dir}"),
        StudentSortField::Email => format!("s.email {dir}"),
        StudentSortField::Gpa => format!("s.gpa {dir} NULLS LAST"),
        StudentSortField::EnrollmentDate => format!("s.enrollment_date {dir}"),
        StudentSortField::CreatedAt => format!("s.created_at {dir}"),
    };
    format!(" ORDER BY {primary}, s.id {}", SortDirection::Asc.as_sql())
}

#[async_trait]
impl StudentRepository for PostgresStudentRepository {
    #[instrument(skip(self), fields(student_id = %id))]
    async fn get(&self, id: StudentId) -> Result<Option<Student>, AppError> {
        let row = sqlx::query(&format!("{SELECT_STUDENTS} WHERE s.id = $1"))
            .bind(id.into_inner())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_student).transpose()
    }

    #[instrument(skip(self, email))]
    async fn email_exists(
        &self,
        email: &Email,
        excluding: Option<StudentId>,
    ) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM students WHERE email = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(email.as_str())
        .bind(excluding.map(StudentId::into_inner))
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    #[instrument(skip(self, student), fields(student_id = %student.id()))]
    async fn add(&self, student: &Student) -> Result<(), AppError> {
        let name = student.name();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO students (id, first_name, middle_name, last_name, email, date_of_birth,
                                  phone, gpa, status, enrollment_date, created_at, updated_at,
                                  version)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(student.id().into_inner())
        .bind(name.first())
        .bind(name.middle())
        .bind(name.last())
        .bind(student.email().as_str())
        .bind(student.date_of_birth())
        .bind(student.phone().map(PhoneNumber::digits))
        .bind(student.gpa().map(Gpa::value))
        .bind(student.status().as_str())
        .bind(student.enrollment_date())
        .bind(student.created_at())
        .bind(student.updated_at())
        .bind(student.version())
        .execute(&mut *tx)
        .await?;

        Self::save_address(&mut tx, student).await?;
        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self, student), fields(student_id = %student.id()))]
    async fn update(&self, student: &Student) -> Result<(), AppError> {
        let name = student.name();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE students
            SET first_name = $2, middle_name = $3, last_name = $4, email = $5,
                date_of_birth = $6, phone = $7, gpa = $8, status = $9,
                enrollment_date = $10, updated_at = $11, version = version + 1
            WHERE id = $1 AND version = $12
            "#,
        )
        .bind(student.id().into_inner())
        .bind(name.first())
        .bind(name.middle())
        .bind(name.last())
        .bind(student.email().as_str())
        .bind(student.date_of_birth())
        .bind(student.phone().map(PhoneNumber::digits))
        .bind(student.gpa().map(Gpa::value))
        .bind(student.status().as_str())
        .bind(student.enrollment_date())
        .bind(student.updated_at())
        .bind(student.version())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(missed_update(
                &mut tx,
                "students",
                "Student",
                student.id().into_inner(),
                student.version(),
            )
            .await);
        }

        Self::save_address(&mut tx, student).await?;
        tx.commit().await?;
        Ok(())
    }

    /// The student's seats are freed through `ON DELETE CASCADE` on
    /// `course_enrollments`; the affected courses move to a new version.
    #[instrument(skip(self), fields(student_id = %id))]
    async fn delete(&self, id: StudentId) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE courses SET version = version + 1
            WHERE id IN (SELECT course_id FROM course_enrollments WHERE student_id = $1)
            "#,
        )
        .bind(id.into_inner())
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM students WHERE id = $1")
            .bind(id.into_inner())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn list(
        &self,
        filter: &StudentFilter,
        page: PageRequest,
    ) -> Result<PagedResult<Student>, AppError> {
        let mut count_qb: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM students s");
        push_filters(&mut count_qb, filter);
        let total: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

        let (limit, offset) = limit_offset(page);
        let mut select_qb: QueryBuilder<Postgres> = QueryBuilder::new(SELECT_STUDENTS);
        push_filters(&mut select_qb, filter);
        select_qb.push(order_by(filter));
        select_qb
            .push(" LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows = select_qb.build().fetch_all(&self.pool).await?;
        let students = rows
            .iter()
            .map(Self::row_to_student)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PagedResult::new(
            students,
            u64::try_from(total).unwrap_or_default(),
            page,
        ))
    }
}
