//! `courses`, `course_schedules` and `course_enrollments` tables.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveTime;
use sqlx::{PgPool, Postgres, QueryBuilder, Row, Transaction, postgres::PgRow};
use tracing::instrument;
use uuid::Uuid;

use super::postgres::{corrupt, db_int, like_pattern, limit_offset, missed_update, non_negative};
use crate::domain::{
    AppError, Course, CourseCode, CourseFilter, CourseId, CourseLevel, CourseRecord,
    CourseRepository, CourseSchedule, CourseSortField, CourseStatus, Credits, DayOfWeek,
    PageRequest, PagedResult, StudentId, ValidationError,
};

const SELECT_COURSES: &str = r#"
    SELECT c.id, c.code, c.title, c.description, c.credits, c.level, c.status,
           c.max_enrollment, c.created_at, c.updated_at, c.version,
           cs.days, cs.start_time, cs.end_time, cs.room
    FROM courses c
    LEFT JOIN course_schedules cs ON cs.course_id = c.id
"#;

pub struct PostgresCourseRepository {
    pool: PgPool,
}

impl PostgresCourseRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_course(row: &PgRow, enrolled_students: Vec<StudentId>) -> Result<Course, AppError> {
        let bad = |e| corrupt("courses", e);

        let days: Option<Vec<String>> = row.try_get("days")?;
        let schedule = match days {
            Some(days) => {
                let days = days
                    .iter()
                    .map(|d| d.parse::<DayOfWeek>())
                    .collect::<Result<Vec<_>, ValidationError>>()
                    .map_err(bad)?;
                let start: NaiveTime = row.try_get("start_time")?;
                let end: NaiveTime = row.try_get("end_time")?;
                let room: Option<String> = row.try_get("room")?;
                Some(CourseSchedule::new(&days, start, end, room.as_deref()).map_err(bad)?)
            }
            None => None,
        };

        let credits: i16 = row.try_get("credits")?;

        Ok(Course::restore(CourseRecord {
            id: CourseId::from_uuid(row.try_get("id")?),
            code: CourseCode::parse(row.try_get::<&str, _>("code")?).map_err(bad)?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            credits: Credits::new(i64::from(credits)).map_err(bad)?,
            level: row
                .try_get::<&str, _>("level")?
                .parse::<CourseLevel>()
                .map_err(bad)?,
            status: row
                .try_get::<&str, _>("status")?
                .parse::<CourseStatus>()
                .map_err(bad)?,
            max_enrollment: non_negative("courses", "max_enrollment", row.try_get("max_enrollment")?)?,
            enrolled_students,
            schedule,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            version: row.try_get("version")?,
        }))
    }

    /// Enrolled student ids per course, in enrollment order.
    async fn load_enrollments(
        &self,
        course_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<StudentId>>, AppError> {
        let rows = sqlx::query(
            r#"
            SELECT course_id, student_id
            FROM course_enrollments
            WHERE course_id = ANY($1)
            ORDER BY course_id, position
            "#,
        )
        .bind(course_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut rosters: HashMap<Uuid, Vec<StudentId>> = HashMap::new();
        for row in rows {
            let course_id: Uuid = row.try_get("course_id")?;
            let student_id: Uuid = row.try_get("student_id")?;
            rosters
                .entry(course_id)
                .or_default()
                .push(StudentId::from_uuid(student_id));
        }
        Ok(rosters)
    }

    async fn save_enrollments(
        tx: &mut Transaction<'_, Postgres>,
        course: &Course,
    ) -> Result<(), AppError> {
        let student_ids: Vec<Uuid> = course
            .enrolled_students()
            .iter()
            .map(|id| id.into_inner())
            .collect();

        sqlx::query(
            "DELETE FROM course_enrollments WHERE course_id = $1 AND NOT (student_id = ANY($2))",
        )
        .bind(course.id().into_inner())
        .bind(&student_ids)
        .execute(&mut **tx)
        .await?;

        if student_ids.is_empty() {
            return Ok(());
        }

        // Existing rows keep their enrolled_at; only the position moves.
        sqlx::query(
            r#"
            INSERT INTO course_enrollments (course_id, student_id, position)
            SELECT $1, e.student_id, (e.ord - 1)::integer
            FROM UNNEST($2::uuid[]) WITH ORDINALITY AS e(student_id, ord)
            ON CONFLICT (course_id, student_id) DO UPDATE SET position = EXCLUDED.position
            "#,
        )
        .bind(course.id().into_inner())
        .bind(&student_ids)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn save_schedule(
        tx: &mut Transaction<'_, Postgres>,
        course: &Course,
    ) -> Result<(), AppError> {
        match course.schedule() {
            Some(schedule) => {
                let days: Vec<String> = schedule
                    .days()
                    .iter()
                    .map(|d| d.as_str().to_string())
                    .collect();
                sqlx::query(
                    r#"
                    INSERT INTO course_schedules (course_id, days, start_time, end_time, room)
                    VALUES ($1, $2, $3, $4, $5)
                    ON CONFLICT (course_id) DO UPDATE SET
                        days = EXCLUDED.days,
                        start_time = EXCLUDED.start_time,
                        end_time = EXCLUDED.end_time,
                        room = EXCLUDED.room
                    "#,
                )
                .bind(course.id().into_inner())
                .bind(days)
                .bind(schedule.start_time())
                .bind(schedule.end_time())
                .bind(schedule.room())
                .execute(&mut **tx)
                .await?;
            }
            None => {
                sqlx::query("DELETE FROM course_schedules WHERE course_id = $1")
                    .bind(course.id().into_inner())
                    .execute(&mut **tx)
                    .await?;
            }
        }
        Ok(())
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &CourseFilter) {
    qb.push(" WHERE TRUE");
    if let Some(term) = filter.search_term() {
        let pattern = like_pattern(&term);
        qb.push(" AND (LOWER(c.title) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR LOWER(c.code) LIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(status) = filter.status {
        qb.push(" AND c.status = ").push_bind(status.as_str());
    }
    if let Some(level) = filter.level {
        qb.push(" AND c.level = ").push_bind(level.as_str());
    }
    if let Some(open) = filter.has_available_seats {
        qb.push(" AND (SELECT COUNT(*) FROM course_enrollments e WHERE e.course_id = c.id)")
            .push(if open { " < " } else { " >= " })
            .push("c.max_enrollment");
    }
}

fn order_by(filter: &CourseFilter) -> String {
    let column = match filter.sort_by {
        CourseSortField::Title => "LOWER(c.title)",
        CourseSortField::Code => "c.code",
        CourseSortField::Credits => "c.credits",
        CourseSortField::CreatedAt => "c.created_at",
    };
    format!(" ORDER BY {column} {}, c.id ASC", filter.sort_direction.as_sql())
}

#[async_trait]
impl CourseRepository for PostgresCourseRepository {
    #[instrument(skip(self), fields(course_id = %id))]
    async fn get(&self, id: CourseId) -> Result<Option<Course>, AppError> {
        let Some(row) = sqlx::query(&format!("{SELECT_COURSES} WHERE c.id = $1"))
            .bind(id.into_inner())
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let mut rosters = self.load_enrollments(&[id.into_inner()]).await?;
        let roster = rosters.remove(&id.into_inner()).unwrap_or_default();
        Self::row_to_course(&row, roster).map(Some)
    }

    #[instrument(skip(self, code), fields(code = %code))]
    async fn code_exists(
        &self,
        code: &CourseCode,
        excluding: Option<CourseId>,
    ) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM courses WHERE code = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(code.as_str())
        .bind(excluding.map(CourseId::into_inner))
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    #[instrument(skip(self, course), fields(course_id = %course.id(), code = %course.code()))]
    async fn add(&self, course: &Course) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO courses (id, code, title, description, credits, level, status,
                                 max_enrollment, created_at, updated_at, version)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(course.id().into_inner())
        .bind(course.code().as_str())
        .bind(course.title())
        .bind(course.description())
        .bind(i16::from(course.credits().value()))
        .bind(course.level().as_str())
        .bind(course.status().as_str())
        .bind(db_int(course.max_enrollment()))
        .bind(course.created_at())
        .bind(course.updated_at())
        .bind(course.version())
        .execute(&mut *tx)
        .await?;

        Self::save_schedule(&mut tx, course).await?;
        Self::save_enrollments(&mut tx, course).await?;
        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self, course), fields(course_id = %course.id()))]
    async fn update(&self, course: &Course) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        // The code is immutable after creation, so it is never rewritten.
        let result = sqlx::query(
            r#"
            UPDATE courses
            SET title = $2, description = $3, credits = $4, level = $5, status = $6,
                max_enrollment = $7, updated_at = $8, version = version + 1
            WHERE id = $1 AND version = $9
            "#,
        )
        .bind(course.id().into_inner())
        .bind(course.title())
        .bind(course.description())
        .bind(i16::from(course.credits().value()))
        .bind(course.level().as_str())
        .bind(course.status().as_str())
        .bind(db_int(course.max_enrollment()))
        .bind(course.updated_at())
        .bind(course.version())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(missed_update(
                &mut tx,
                "courses",
                "Course",
                course.id().into_inner(),
                course.version(),
            )
            .await);
        }

        Self::save_schedule(&mut tx, course).await?;
        Self::save_enrollments(&mut tx, course).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Schedules, enrollments and teacher assignments go with the course
    /// through `ON DELETE CASCADE`. Teachers who lose an assignment move to a
    /// new version so a copy loaded before the delete cannot be saved.
    #[instrument(skip(self), fields(course_id = %id))]
    async fn delete(&self, id: CourseId) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE teachers SET version = version + 1
            WHERE id IN (SELECT teacher_id FROM teacher_course_assignments WHERE course_id = $1)
            "#,
        )
        .bind(id.into_inner())
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(id.into_inner())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn list(
        &self,
        filter: &CourseFilter,
        page: PageRequest,
    ) -> Result<PagedResult<Course>, AppError> {
        let mut count_qb: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM courses c");
        push_filters(&mut count_qb, filter);
        let total: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

        let (limit, offset) = limit_offset(page);
        let mut select_qb: QueryBuilder<Postgres> = QueryBuilder::new(SELECT_COURSES);
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
        let mut rosters = if ids.is_empty() {
            HashMap::new()
        } else {
            self.load_enrollments(&ids).await?
        };

        let courses = rows
            .iter()
            .zip(&ids)
            .map(|(row, id)| Self::row_to_course(row, rosters.remove(id).unwrap_or_default()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PagedResult::new(
            courses,
            u64::try_from(total).unwrap_or_default(),
            page,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SortDirection;

    #[test]
    fn test_seat_filter_compares_columns() {
        let filter = CourseFilter {
            has_available_seats: Some(true),
            level: Some(CourseLevel::Advanced),
            ..CourseFilter::default()
        };
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM courses c");
        push_filters(&mut qb, &filter);
        let sql = qb.sql();
        assert!(sql.contains("c.level = $1"));
        assert!(sql.ends_with(
            "(SELECT COUNT(*) FROM course_enrollments e WHERE e.course_id = c.id) < c.max_enrollment"
        ));
    }

    #[test]
    fn test_order_by_defaults_to_code() {
        assert_eq!(
            order_by(&CourseFilter::default()),
            " ORDER BY c.code ASC, c.id ASC"
        );
        let filter = CourseFilter {
            sort_by: CourseSortField::Credits,
            sort_direction: SortDirection::Desc,
            ..CourseFilter::default()
        };
        assert_eq!(order_by(&filter), " ORDER BY c.credits DESC, c.id ASC");
    }
}
