use anyhow::Context;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;
use time::OffsetDateTime;
use tracing::info;

use crate::db::{Ratee, SetField, Store};
use crate::error::{PaddyError, PaddyResult};
use crate::models::class::Class;
use crate::models::group::Group;
use crate::models::instructor::Instructor;
use crate::models::rating::{Rating, RatingSubmission};
use crate::models::student::Student;
use crate::models::user::User;

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .context("Failed to connect to the database")?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run database migrations")?;
        info!("connected to postgres");

        Ok(Self { pool })
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    email: String,
    username: String,
    pass_hash: String,
    first_name: String,
    last_name: String,
    department: String,
    role: String,
}

impl UserRow {
    fn into_user(self) -> PaddyResult<User> {
        Ok(User {
            role: self.role.parse().map_err(PaddyError::ProcessingError)?,
            id: self.id,
            email: self.email,
            username: self.username,
            pass_hash: self.pass_hash,
            first_name: self.first_name,
            last_name: self.last_name,
            department: self.department,
        })
    }
}

#[derive(sqlx::FromRow)]
struct StudentRow {
    id: i64,
    first_name: String,
    last_name: String,
    email: String,
    username: String,
    department: String,
    classes: Vec<i64>,
    groups: Vec<i64>,
    ratings: Json<Vec<Rating>>,
    rice_grains: i64,
}

impl From<StudentRow> for Student {
    fn from(row: StudentRow) -> Self {
        Student {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            username: row.username,
            department: row.department,
            classes: row.classes,
            groups: row.groups,
            ratings: row.ratings.0,
            rice_grains: row.rice_grains,
        }
    }
}

#[derive(sqlx::FromRow)]
struct InstructorRow {
    id: i64,
    first_name: String,
    last_name: String,
    email: String,
    username: String,
    department: String,
    classes: Vec<i64>,
    groups: Vec<i64>,
    ratings: Json<Vec<Rating>>,
}

impl From<InstructorRow> for Instructor {
    fn from(row: InstructorRow) -> Self {
        Instructor {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            username: row.username,
            department: row.department,
            classes: row.classes,
            groups: row.groups,
            ratings: row.ratings.0,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ClassRow {
    id: i64,
    name: String,
    subject: String,
    section: String,
    instructor: i64,
    students: Vec<i64>,
    groups: Vec<i64>,
    submission_deadline: Option<OffsetDateTime>,
}

impl From<ClassRow> for Class {
    fn from(row: ClassRow) -> Self {
        Class {
            id: row.id,
            name: row.name,
            subject: row.subject,
            section: row.section,
            instructor: row.instructor,
            students: row.students,
            groups: row.groups,
            submission_deadline: row.submission_deadline,
        }
    }
}

#[derive(sqlx::FromRow)]
struct GroupRow {
    id: i64,
    name: String,
    class_id: i64,
    instructor: i64,
    students: Vec<i64>,
}

impl From<GroupRow> for Group {
    fn from(row: GroupRow) -> Self {
        Group {
            id: row.id,
            name: row.name,
            class: row.class_id,
            instructor: row.instructor,
            students: row.students,
        }
    }
}

const USER_COLUMNS: &str =
    "id, email, username, pass_hash, first_name, last_name, department, role";
const STUDENT_COLUMNS: &str = "id, first_name, last_name, email, username, department, \
     classes, groups, ratings, rice_grains";
const INSTRUCTOR_COLUMNS: &str =
    "id, first_name, last_name, email, username, department, classes, groups, ratings";
const CLASS_COLUMNS: &str =
    "id, name, subject, section, instructor, students, groups, submission_deadline";
const GROUP_COLUMNS: &str = "id, name, class_id, instructor, students";

#[async_trait]
impl Store for PgStore {
    async fn user(&self, id: i64) -> PaddyResult<Option<User>> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        sqlx::query_as::<_, UserRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(UserRow::into_user)
            .transpose()
    }

    async fn user_by_login(&self, login: &str) -> PaddyResult<Option<User>> {
        let query = format!(
            "SELECT {} FROM users WHERE username = $1 OR email = $1 LIMIT 1",
            USER_COLUMNS
        );
        sqlx::query_as::<_, UserRow>(&query)
            .bind(login)
            .fetch_optional(&self.pool)
            .await?
            .map(UserRow::into_user)
            .transpose()
    }

    async fn insert_user(&self, user: User) -> PaddyResult<bool> {
        let result = sqlx::query(
            "INSERT INTO users (id, email, username, pass_hash, first_name, last_name, department, role)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             ON CONFLICT DO NOTHING",
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.pass_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.department)
        .bind(user.role.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn session_user(&self, token: &str) -> PaddyResult<Option<i64>> {
        sqlx::query_scalar::<_, i64>("SELECT user_id FROM sessions WHERE token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(Into::into)
    }

    async fn session_for_user(&self, user_id: i64) -> PaddyResult<Option<String>> {
        sqlx::query_scalar::<_, String>("SELECT token FROM sessions WHERE user_id = $1 LIMIT 1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Into::into)
    }

    async fn insert_session(&self, token: &str, user_id: i64) -> PaddyResult<()> {
        sqlx::query("INSERT INTO sessions (token, user_id) VALUES ($1, $2)")
            .bind(token)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn remove_sessions(&self, user_id: i64) -> PaddyResult<()> {
        sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn student(&self, id: i64) -> PaddyResult<Option<Student>> {
        let query = format!("SELECT {} FROM students WHERE id = $1", STUDENT_COLUMNS);
        let row = sqlx::query_as::<_, StudentRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    async fn students(&self, ids: &[i64]) -> PaddyResult<Vec<Student>> {
        let query = format!(
            "SELECT {} FROM students WHERE id = ANY($1) ORDER BY id",
            STUDENT_COLUMNS
        );
        let rows = sqlx::query_as::<_, StudentRow>(&query)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn insert_students(&self, students: Vec<Student>) -> PaddyResult<usize> {
        let mut transaction = self.pool.begin().await?;
        let mut inserted = 0;

        for student in students {
            let result = sqlx::query(
                "INSERT INTO students
                     (id, first_name, last_name, email, username, department,
                      classes, groups, ratings, rice_grains)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                 ON CONFLICT (id) DO NOTHING",
            )
            .bind(student.id)
            .bind(&student.first_name)
            .bind(&student.last_name)
            .bind(&student.email)
            .bind(&student.username)
            .bind(&student.department)
            .bind(&student.classes)
            .bind(&student.groups)
            .bind(Json(&student.ratings))
            .bind(student.rice_grains)
            .execute(&mut transaction)
            .await?;
            inserted += result.rows_affected() as usize;
        }
        transaction.commit().await?;

        Ok(inserted)
    }

    async fn instructor(&self, id: i64) -> PaddyResult<Option<Instructor>> {
        let query = format!(
            "SELECT {} FROM instructors WHERE id = $1",
            INSTRUCTOR_COLUMNS
        );
        let row = sqlx::query_as::<_, InstructorRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    async fn insert_instructor(&self, instructor: Instructor) -> PaddyResult<bool> {
        let result = sqlx::query(
            "INSERT INTO instructors
                 (id, first_name, last_name, email, username, department, classes, groups, ratings)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(instructor.id)
        .bind(&instructor.first_name)
        .bind(&instructor.last_name)
        .bind(&instructor.email)
        .bind(&instructor.username)
        .bind(&instructor.department)
        .bind(&instructor.classes)
        .bind(&instructor.groups)
        .bind(Json(&instructor.ratings))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn class(&self, id: i64) -> PaddyResult<Option<Class>> {
        let query = format!("SELECT {} FROM classes WHERE id = $1", CLASS_COLUMNS);
        let row = sqlx::query_as::<_, ClassRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    async fn classes(&self, ids: &[i64]) -> PaddyResult<Vec<Class>> {
        let query = format!(
            "SELECT {} FROM classes WHERE id = ANY($1) ORDER BY id",
            CLASS_COLUMNS
        );
        let rows = sqlx::query_as::<_, ClassRow>(&query)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn insert_class(&self, class: Class) -> PaddyResult<bool> {
        let result = sqlx::query(
            "INSERT INTO classes
                 (id, name, subject, section, instructor, students, groups, submission_deadline)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(class.id)
        .bind(&class.name)
        .bind(&class.subject)
        .bind(&class.section)
        .bind(class.instructor)
        .bind(&class.students)
        .bind(&class.groups)
        .bind(class.submission_deadline)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_submission_deadline(
        &self,
        class_id: i64,
        deadline: Option<OffsetDateTime>,
    ) -> PaddyResult<bool> {
        let result = sqlx::query("UPDATE classes SET submission_deadline = $2 WHERE id = $1")
            .bind(class_id)
            .bind(deadline)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn group(&self, id: i64) -> PaddyResult<Option<Group>> {
        let query = format!("SELECT {} FROM student_groups WHERE id = $1", GROUP_COLUMNS);
        let row = sqlx::query_as::<_, GroupRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    async fn groups_for_class(&self, class_id: i64) -> PaddyResult<Vec<Group>> {
        let query = format!(
            "SELECT {} FROM student_groups WHERE class_id = $1 ORDER BY id",
            GROUP_COLUMNS
        );
        let rows = sqlx::query_as::<_, GroupRow>(&query)
            .bind(class_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn insert_group(&self, group: Group) -> PaddyResult<bool> {
        let result = sqlx::query(
            "INSERT INTO student_groups (id, name, class_id, instructor, students)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(group.id)
        .bind(&group.name)
        .bind(group.class)
        .bind(group.instructor)
        .bind(&group.students)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn add_to_set(&self, field: SetField, id: i64, value: i64) -> PaddyResult<bool> {
        let (table, column) = field.location();
        let query = format!(
            "UPDATE {table} SET {column} = CASE WHEN $2 = ANY({column}) THEN {column} \
                 ELSE array_append({column}, $2) END \
             WHERE id = $1",
            table = table,
            column = column
        );
        let result = sqlx::query(&query)
            .bind(id)
            .bind(value)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove_from_set(&self, field: SetField, id: i64, value: i64) -> PaddyResult<bool> {
        let (table, column) = field.location();
        let query = format!(
            "UPDATE {table} SET {column} = array_remove({column}, $2) WHERE id = $1",
            table = table,
            column = column
        );
        let result = sqlx::query(&query)
            .bind(id)
            .bind(value)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn record_rating(
        &self,
        ratee: Ratee,
        submission: &RatingSubmission,
    ) -> PaddyResult<Option<bool>> {
        let table = match ratee {
            Ratee::Student(_) => "students",
            Ratee::Instructor(_) => "instructors",
        };
        let mut transaction = self.pool.begin().await?;

        let select = format!("SELECT ratings FROM {} WHERE id = $1 FOR UPDATE", table);
        let stored: Option<Json<Vec<Rating>>> = sqlx::query_scalar(&select)
            .bind(ratee.id())
            .fetch_optional(&mut transaction)
            .await?;
        let mut ratings = match stored {
            Some(Json(ratings)) => ratings,
            None => return Ok(None),
        };

        let replaced = Rating::record(&mut ratings, submission);
        let update = format!("UPDATE {} SET ratings = $2 WHERE id = $1", table);
        sqlx::query(&update)
            .bind(ratee.id())
            .bind(Json(&ratings))
            .execute(&mut transaction)
            .await?;
        transaction.commit().await?;

        Ok(Some(replaced))
    }

    async fn increment_grains(&self, student_id: i64, amount: i64) -> PaddyResult<Option<i64>> {
        sqlx::query_scalar::<_, i64>(
            "UPDATE students SET rice_grains = rice_grains + $2 WHERE id = $1 RETURNING rice_grains",
        )
        .bind(student_id)
        .bind(amount)
        .fetch_optional(&self.pool)
        .await
        .map_err(Into::into)
    }
}
