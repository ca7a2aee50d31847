//! `teachers` and `teacher_course_assignments` tables.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Row, Transaction, postgres::PgRow};
use tracing::instrument;
use uuid::Uuid;

use super::postgres::{corrupt, like_pattern, limit_offset, missed_update};
use crate::domain::{
    AppError, CourseId, Email, EmployeeId, FullName, PageRequest, PagedResult,
    Teacher, TeacherFilter, TeacherId, TeacherProfile, TeacherRecord, TeacherRepository,
    TeacherSortField, TeacherTitle,
};

const SELECT_TEACHERS: &str = r#"
    SELECT t.id, t.employee_id, t.first_name, t.middle_name, t.last_name, t.email,
           t.department, t.title, t.max_course_load, t.hire_date, t.created_at, t.updated_at,
           t.version
    FROM teachers t
"#;

pub struct PostgresTeacherRepository {
    pool: PgPool,
}

impl PostgresTeacherRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_teacher(row: &PgRow, assigned_courses: Vec<CourseId>) -> Result<Teacher, AppError> {
        let bad = |e| corrupt("teachers", e);

        let middle: Option<String> = row.try_get("middle_name")?;
        let name = FullName::parse(
            row.try_get::<&str, _>("first_name")?,
            middle.as_deref(),
            row.try_get::<&str, _>("last_name")?,
        )
        .map_err(bad)?;
        let email = Email::parse(row.try_get::<&str, _>("email")?).map_err(bad)?;
        let max_course_load: i16 = row.try_get("max_course_load")?;
        let profile = TeacherProfile::new(
            name,
            email,
            row.try_get::<&str, _>("department")?,
            Some(i64::from(max_course_load)),
        )
        .map_err(bad)?;

        Ok(Teacher::restore(TeacherRecord {
            id: TeacherId::from_uuid(row.try_get("id")?),
            profile,
            employee_id: EmployeeId::parse(row.try_get::<&str, _>("employee_id")?).map_err(bad)?,
            title: row
                .try_get::<&str, _>("title")?
                .parse::<TeacherTitle>()
                .map_err(bad)?,
            hire_date: row.try_get("hire_date")?,
            assigned_courses,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            version: row.try_get("version")?,
        }))
    }

    /// Assigned course ids per teacher, in assignment order.
    async fn load_assignments(
        &self,
        teacher_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<CourseId>>, AppError> {
        let rows = sqlx::query(
            r#"
            SELECT teacher_id, course_id
            FROM teacher_course_assignments
            WHERE teacher_id = ANY($1)
            ORDER BY teacher_id, position
            "#,
        )
        .bind(teacher_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut assignments: HashMap<Uuid, Vec<CourseId>> = HashMap::new();
        for row in rows {
            let teacher_id: Uuid = row.try_get("teacher_id")?;
            let course_id: Uuid = row.try_get("course_id")?;
            assignments
                .entry(teacher_id)
                .or_default()
                .push(CourseId::from_uuid(course_id));
        }
        Ok(assignments)
    }

    async fn save_assignments(
        tx: &mut Transaction<'_, Postgres>,
        teacher: &Teacher,
    ) -> Result<(), AppError> {
        let course_ids: Vec<Uuid> = teacher
            .assigned_courses()
            .iter()
            .map(|id| id.into_inner())
            .collect();

        sqlx::query(
            "DELETE FROM teacher_course_assignments WHERE teacher_id = $1 AND NOT (course_id = ANY($2))",
        )
        .bind(teacher.id().into_inner())
        .bind(&course_ids)
        .execute(&mut **tx)
        .await?;

        if course_ids.is_empty() {
            return Ok(());
        }

        // Existing rows keep their assigned_at; only the position moves.
        sqlx::query(
            r#"
            INSERT INTO teacher_course_assignments (teacher_id, course_id, position)
            SELECT $1, a.course_id, (a.ord - 1)::smallint
            FROM UNNEST($2::uuid[]) WITH ORDINALITY AS a(course_id, ord)
            ON CONFLICT (teacher_id, course_id) DO UPDATE SET position = EXCLUDED.position
            "#,
        )
        .bind(teacher.id().into_inner())
        .bind(&course_ids)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &TeacherFilter) {
    qb.push(" WHERE TRUE");
    if let Some(term) = filter.search_term() {
        let pattern = like_pattern(&term);
        qb.push(" AND (LOWER(t.first_name) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR LOWER(t.last_name) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR t.email LIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(title) = filter.title {
        qb.push(" AND t.title = ").push_bind(title.as_str());
    }
    if let Some(department) = filter
        .department
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
    {
        qb.push(" AND LOWER(t.department) = ")
            .push_bind(department.to_lowercase());
    }
}

fn order_by(filter: &TeacherFilter) -> String {
    let dir = filter.sort_direction.as_sql();
    let primary = match filter.sort_by {
        TeacherSortField::Name => format!("LOWER(t.last_name) {dir}, LOWER(t.first_name) {dir}"),
        TeacherSortField::EmployeeId => format!("t.employee_id {dir}"),
        TeacherSortField::HireDate => format!("t.hire_date {dir}"),
    };
    format!(" ORDER BY {primary}, t.id ASC")
}

#[async_trait]
impl TeacherRepository for PostgresTeacherRepository {
    #[instrument(skip(self), fields(teacher_id = %id))]
    async fn get(&self, id: TeacherId) -> Result<Option<Teacher>, AppError> {
        let Some(row) = sqlx::query(&format!("{SELECT_TEACHERS} WHERE t.id = $1"))
            .bind(id.into_inner())
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let mut assignments = self.load_assignments(&[id.into_inner()]).await?;
        let courses = assignments.remove(&id.into_inner()).unwrap_or_default();
        Self::row_to_teacher(&row, courses).map(Some)
    }

    #[instrument(skip(self, email))]
    async fn email_exists(
        &self,
        email: &Email,
        excluding: Option<TeacherId>,
    ) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM teachers WHERE email = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(email.as_str())
        .bind(excluding.map(TeacherId::into_inner))
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    #[instrument(skip(self, employee_id), fields(employee_id = %employee_id))]
    async fn employee_id_exists(&self, employee_id: &EmployeeId) -> Result<bool, AppError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM teachers WHERE employee_id = $1)")
                .bind(employee_id.as_str())
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    #[instrument(skip(self, teacher), fields(teacher_id = %teacher.id()))]
    async fn add(&self, teacher: &Teacher) -> Result<(), AppError> {
        let name = teacher.name();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO teachers (id, employee_id, first_name, middle_name, last_name, email,
                                  department, title, max_course_load, hire_date,
                                  created_at, updated_at, version)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(teacher.id().into_inner())
        .bind(teacher.employee_id().as_str())
        .bind(name.first())
        .bind(name.middle())
        .bind(name.last())
        .bind(teacher.email().as_str())
        .bind(teacher.department())
        .bind(teacher.title().as_str())
        .bind(i16::from(teacher.max_course_load()))
        .bind(teacher.hire_date())
        .bind(teacher.created_at())
        .bind(teacher.updated_at())
        .bind(teacher.version())
        .execute(&mut *tx)
        .await?;

        Self::save_assignments(&mut tx, teacher).await?;
        tx.commit().await?;
        Ok(())
    }

    /// The versioned row update runs first, so a writer holding a stale
    /// copy fails before touching the assignment rows.
    #[instrument(skip(self, teacher), fields(teacher_id = %teacher.id()))]
    async fn update(&self, teacher: &Teacher) -> Result<(), AppError> {
        let name = teacher.name();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE teachers
            SET first_name = $2, middle_name = $3, last_name = $4, email = $5,
                department = $6, title = $7, max_course_load = $8, updated_at = $9,
                version = version + 1
            WHERE id = $1 AND version = $10
            "#,
        )
        .bind(teacher.id().into_inner())
        .bind(name.first())
        .bind(name.middle())
        .bind(name.last())
        .bind(teacher.email().as_str())
        .bind(teacher.department())
        .bind(teacher.title().as_str())
        .bind(i16::from(teacher.max_course_load()))
        .bind(teacher.updated_at())
        .bind(teacher.version())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(missed_update(
                &mut tx,
                "teachers",
                "Teacher",
                teacher.id().into_inner(),
                teacher.version(),
            )
            .await);
        }

        Self::save_assignments(&mut tx, teacher).await?;
        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self), fields(teacher_id = %id))]
    async fn delete(&self, id: TeacherId) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM teachers WHERE id = $1")
            .bind(id.into_inner())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn list(
        &self,
        filter: &TeacherFilter,
        page: PageRequest,
    ) -> Result<PagedResult<Teacher>, AppError> {
        let mut count_qb: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM teachers t");
        push_filters(&mut count_qb, filter);
        let total: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

        let (limit, offset) = limit_offset(page);
        let mut select_qb: QueryBuilder<Postgres> = QueryBuilder::new(SELECT_TEACHERS);
        push_filters(&mut select_qb, filter);
        select_qb
            .push(order_by(filter))
            .push(" LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);
        let rows = select_qb.build().fetch_all(&self.pool).await?;

        let ids = rows
            .iter()
            .map(|row| row.try_get::<Uuid, _>("id"))
            .collect::<Result<Vec<_>, _>>()?;
        let mut assignments = if ids.is_empty() {
            HashMap::new()
        } else {
            self.load_assignments(&ids).await?
        };

        let teachers = rows
            .iter()
            .zip(&ids)
            .map(|(row, id)| {
                Self::row_to_teacher(row, assignments.remove(id).unwrap_or_default())
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PagedResult::new(
            teachers,
            u64::try_from(total).unwrap_or_default(),
            page,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_department_filter_is_case_insensitive() {
        let filter = TeacherFilter {
            department: Some(" Mathematics ".to_string()),
            title: Some(TeacherTitle::Professor),
            ..TeacherFilter::default()
        };
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM teachers t");
        push_filters(&mut qb, &filter);
        let sql = qb.sql();
        assert!(sql.contains("t.title = $1"));
        assert!(sql.contains("LOWER(t.department) = $2"));
    }

    #[test]
    fn test_blank_department_is_ignored() {
        let filter = TeacherFilter {
            department: Some("   ".to_string()),
            ..TeacherFilter::default()
        };
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM teachers t");
        push_filters(&mut qb, &filter);
        assert_eq!(qb.sql(), "SELECT COUNT(*) FROM teachers t WHERE TRUE");
    }

    #[test]
    fn test_order_by_employee_id() {
        let filter = TeacherFilter {
            sort_by: TeacherSortField::EmployeeId,
            ..TeacherFilter::default()
        };
        assert_eq!(order_by(&filter), " ORDER BY t.employee_id ASC, t.id ASC");
    }
}
