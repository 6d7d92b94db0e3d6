use anyhow::Result;
use bcrypt::{hash, DEFAULT_COST};
use chrono::Utc;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use crate::models::{Course, CourseFilter, EnrollOutcome, NewCourseForm, Student, User, WithdrawOutcome};

// `full` is quoted because it is an SQL keyword.
const COURSE_COLUMNS: &str = "id, course_code, course_name, course_detail, course_credit, \
     course_section, course_remain, \"full\", semester, year";

/// Persistence service over the SQLite pool. Cheap to clone; every
/// handler works through one of these.
#[derive(Clone)]
pub struct EnrollmentService {
    pool: SqlitePool,
}

impl EnrollmentService {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
        sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

        run_migrations(&pool).await?;

        Ok(Self { pool })
    }

    /// Creates the configured admin account if it does not exist yet.
    pub async fn ensure_admin(&self, username: &str, password: &str) -> Result<()> {
        if self.get_user(username).await?.is_none() {
            let password_hash = hash(password, DEFAULT_COST)?;
            sqlx::query("INSERT INTO users (username, password_hash, is_admin) VALUES (?, ?, 1)")
                .bind(username)
                .bind(password_hash)
                .execute(&self.pool)
                .await?;
            tracing::info!("Provisioned admin account {}", username);
        }
        Ok(())
    }

    pub async fn get_user(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, is_admin, created_at FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
    }

    /// Creates a login account and its student profile in one transaction.
    pub async fn register_student(
        &self,
        username: &str,
        name: &str,
        password_hash: &str,
    ) -> Result<Student, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let user_id = sqlx::query("INSERT INTO users (username, password_hash, is_admin) VALUES (?, ?, 0)")
            .bind(username)
            .bind(password_hash)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

        let student_id = sqlx::query("INSERT INTO students (user_id, name, username) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(name)
            .bind(username)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

        tx.commit().await?;

        Ok(Student {
            id: student_id,
            user_id,
            name: name.to_string(),
            username: username.to_string(),
        })
    }

    pub async fn get_student(&self, username: &str) -> Result<Option<Student>, sqlx::Error> {
        sqlx::query_as::<_, Student>("SELECT id, user_id, name, username FROM students WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
    }

    /// Courses matching the filter; either field may be given alone and
    /// empty values are ignored, so an unfiltered request returns all
    /// courses.
    pub async fn list_courses(&self, filter: &CourseFilter) -> Result<Vec<Course>, sqlx::Error> {
        let year = filter.year.as_deref().filter(|y| !y.is_empty());
        let semester = filter.semester.as_deref().filter(|s| !s.is_empty());

        let mut sql = format!("SELECT {} FROM courses", COURSE_COLUMNS);
        let mut clauses = Vec::new();
        if year.is_some() {
            clauses.push("year = ?");
        }
        if semester.is_some() {
            clauses.push("semester = ?");
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY course_code, course_section");

        let mut query = sqlx::query_as::<_, Course>(&sql);
        if let Some(year) = year {
            query = query.bind(year);
        }
        if let Some(semester) = semester {
            query = query.bind(semester);
        }
        query.fetch_all(&self.pool).await
    }

    pub async fn get_course(&self, course_id: i64) -> Result<Option<Course>, sqlx::Error> {
        sqlx::query_as::<_, Course>(&format!("SELECT {} FROM courses WHERE id = ?", COURSE_COLUMNS))
            .bind(course_id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Inserts a course from the provisioning form. `full` is derived
    /// from the submitted capacity.
    pub async fn create_course(&self, form: &NewCourseForm) -> Result<i64, sqlx::Error> {
        let course_remain = form.course_remain.max(0);
        let result = sqlx::query(
            "INSERT INTO courses (course_code, course_name, course_detail, course_credit, \
             course_section, course_remain, \"full\", semester, year) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&form.course_code)
        .bind(&form.course_name)
        .bind(&form.course_detail)
        .bind(form.course_credit)
        .bind(&form.course_section)
        .bind(course_remain)
        .bind(course_remain == 0)
        .bind(&form.semester)
        .bind(&form.year)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn enrolled_courses(&self, student_id: i64) -> Result<Vec<Course>, sqlx::Error> {
        sqlx::query_as::<_, Course>(&format!(
            "SELECT {} FROM courses \
             JOIN enrollments ON enrollments.course_id = courses.id \
             WHERE enrollments.student_id = ? \
             ORDER BY enrollments.enrolled_at",
            COURSE_COLUMNS
        ))
        .bind(student_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn is_enrolled(&self, student_id: i64, course_id: i64) -> Result<bool, sqlx::Error> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM enrollments WHERE student_id = ? AND course_id = ?")
                .bind(student_id)
                .bind(course_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count > 0)
    }

    pub async fn enrolled_count(&self, course_id: i64) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM enrollments WHERE course_id = ?")
            .bind(course_id)
            .fetch_one(&self.pool)
            .await
    }

    /// Distinct (year, semester) terms that have at least one course.
    pub async fn academic_terms(&self) -> Result<Vec<(String, String)>, sqlx::Error> {
        sqlx::query_as::<_, (String, String)>(
            "SELECT DISTINCT year, semester FROM courses ORDER BY year, semester",
        )
        .fetch_all(&self.pool)
        .await
    }

    /// Adds the student to the course and takes a seat, all in one
    /// transaction. A full course or an existing membership leaves every
    /// row untouched. The seat decrement carries a `course_remain > 0`
    /// guard so two racing requests cannot take the last seat twice.
    pub async fn enroll(&self, student_id: i64, course_id: i64) -> Result<EnrollOutcome, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let course = sqlx::query_as::<_, Course>(&format!(
            "SELECT {} FROM courses WHERE id = ?",
            COURSE_COLUMNS
        ))
        .bind(course_id)
        .fetch_optional(&mut *tx)
        .await?;

        let course = match course {
            Some(course) => course,
            None => return Ok(EnrollOutcome::CourseNotFound),
        };

        if course.full || course.course_remain == 0 {
            return Ok(EnrollOutcome::CourseFull);
        }

        let inserted = sqlx::query(
            "INSERT OR IGNORE INTO enrollments (student_id, course_id, enrolled_at) VALUES (?, ?, ?)",
        )
        .bind(student_id)
        .bind(course_id)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted == 0 {
            return Ok(EnrollOutcome::AlreadyEnrolled);
        }

        // The RHS reads the pre-update row, so `full` is set iff this
        // decrement reaches zero.
        let updated = sqlx::query(
            "UPDATE courses SET course_remain = course_remain - 1, \
             \"full\" = (course_remain - 1 = 0) \
             WHERE id = ? AND course_remain > 0",
        )
        .bind(course_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            // A racing request took the last seat between the read and
            // the update; dropping the transaction rolls the insert back.
            return Ok(EnrollOutcome::CourseFull);
        }

        tx.commit().await?;
        Ok(EnrollOutcome::Enrolled)
    }

    /// Removes the student from the course. The seat counter moves only
    /// when a membership row was actually deleted, so repeated
    /// withdrawals cannot inflate it.
    pub async fn withdraw(&self, student_id: i64, course_id: i64) -> Result<WithdrawOutcome, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let known: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM courses WHERE id = ?")
            .bind(course_id)
            .fetch_one(&mut *tx)
            .await?;
        if known == 0 {
            return Ok(WithdrawOutcome::CourseNotFound);
        }

        let removed = sqlx::query("DELETE FROM enrollments WHERE student_id = ? AND course_id = ?")
            .bind(student_id)
            .bind(course_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if removed == 0 {
            return Ok(WithdrawOutcome::NotEnrolled);
        }

        sqlx::query("UPDATE courses SET course_remain = course_remain + 1, \"full\" = 0 WHERE id = ?")
            .bind(course_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(WithdrawOutcome::Withdrawn)
    }
}

async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    execute_sql(pool, include_str!("../../migrations/001_initial.sql")).await
}

// Executes a SQL migration file statement by statement, skipping comment
// lines.
async fn execute_sql(pool: &SqlitePool, sql: &str) -> Result<()> {
    for statement in sql.split(';') {
        let cleaned: String = statement
            .lines()
            .filter(|line| !line.trim().starts_with("--"))
            .collect::<Vec<_>>()
            .join("\n");
        let trimmed = cleaned.trim();
        if !trimmed.is_empty() {
            sqlx::query(trimmed).execute(pool).await?;
        }
    }
    Ok(())
}
