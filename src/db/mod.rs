//! The record store: every collection the API persists, behind one trait.
//!
//! Each method is a single-document operation. Operations spanning several
//! documents (group creation, roster upload) are sequences of these calls
//! with no transaction around them, so every step has to be safe to repeat.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use time::OffsetDateTime;

use crate::config::{Config, StoreKind};
use crate::error::PaddyResult;
use crate::models::class::Class;
use crate::models::group::Group;
use crate::models::instructor::Instructor;
use crate::models::rating::RatingSubmission;
use crate::models::student::Student;
use crate::models::user::User;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// The ID list fields that only ever change through set-union or removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetField {
    ClassStudents,
    ClassGroups,
    InstructorClasses,
    InstructorGroups,
    StudentClasses,
    StudentGroups,
    GroupStudents,
}

impl SetField {
    /// The table and column backing the field.
    pub fn location(self) -> (&'static str, &'static str) {
        match self {
            SetField::ClassStudents => ("classes", "students"),
            SetField::ClassGroups => ("classes", "groups"),
            SetField::InstructorClasses => ("instructors", "classes"),
            SetField::InstructorGroups => ("instructors", "groups"),
            SetField::StudentClasses => ("students", "classes"),
            SetField::StudentGroups => ("students", "groups"),
            SetField::GroupStudents => ("student_groups", "students"),
        }
    }
}

/// Whose record a rating is written onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ratee {
    Student(i64),
    Instructor(i64),
}

impl Ratee {
    pub fn id(self) -> i64 {
        match self {
            Ratee::Student(id) | Ratee::Instructor(id) => id,
        }
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn user(&self, id: i64) -> PaddyResult<Option<User>>;
    /// Finds a user by username or email.
    async fn user_by_login(&self, login: &str) -> PaddyResult<Option<User>>;
    /// Returns false without writing if the ID, email or username is taken.
    async fn insert_user(&self, user: User) -> PaddyResult<bool>;

    async fn session_user(&self, token: &str) -> PaddyResult<Option<i64>>;
    async fn session_for_user(&self, user_id: i64) -> PaddyResult<Option<String>>;
    async fn insert_session(&self, token: &str, user_id: i64) -> PaddyResult<()>;
    async fn remove_sessions(&self, user_id: i64) -> PaddyResult<()>;

    async fn student(&self, id: i64) -> PaddyResult<Option<Student>>;
    /// The students that exist among `ids`, in ID order.
    async fn students(&self, ids: &[i64]) -> PaddyResult<Vec<Student>>;
    /// Inserts the students whose IDs aren't taken yet, returning how many were new.
    async fn insert_students(&self, students: Vec<Student>) -> PaddyResult<usize>;

    async fn instructor(&self, id: i64) -> PaddyResult<Option<Instructor>>;
    async fn insert_instructor(&self, instructor: Instructor) -> PaddyResult<bool>;

    async fn class(&self, id: i64) -> PaddyResult<Option<Class>>;
    async fn classes(&self, ids: &[i64]) -> PaddyResult<Vec<Class>>;
    /// Inserts the class unless one already has its ID.
    async fn insert_class(&self, class: Class) -> PaddyResult<bool>;
    async fn set_submission_deadline(
        &self,
        class_id: i64,
        deadline: Option<OffsetDateTime>,
    ) -> PaddyResult<bool>;

    async fn group(&self, id: i64) -> PaddyResult<Option<Group>>;
    async fn groups_for_class(&self, class_id: i64) -> PaddyResult<Vec<Group>>;
    /// Inserts the group unless one already has its ID.
    async fn insert_group(&self, group: Group) -> PaddyResult<bool>;

    /// Adds `value` to a set field of document `id`, leaving it alone if
    /// already present. Returns false if the document doesn't exist.
    async fn add_to_set(&self, field: SetField, id: i64, value: i64) -> PaddyResult<bool>;
    /// Removes `value` from a set field of document `id`. Returns false if
    /// the document doesn't exist.
    async fn remove_from_set(&self, field: SetField, id: i64, value: i64) -> PaddyResult<bool>;

    /// Writes a submission onto the ratee's record.
    ///
    /// Returns `None` if the ratee doesn't exist (and nothing was written),
    /// otherwise whether the rater's earlier entries were replaced.
    async fn record_rating(
        &self,
        ratee: Ratee,
        submission: &RatingSubmission,
    ) -> PaddyResult<Option<bool>>;
    /// Atomically adds to a student's grains, returning the new balance, or
    /// `None` if the student doesn't exist.
    async fn increment_grains(&self, student_id: i64, amount: i64) -> PaddyResult<Option<i64>>;
}

/// Opens whichever store the config asks for.
pub async fn connect(config: &Config) -> Result<Arc<dyn Store>> {
    match config.store {
        StoreKind::Memory => Ok(Arc::new(MemoryStore::default())),
        StoreKind::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("No database URL provided")?;
            let store = PgStore::connect(url).await?;

            Ok(Arc::new(store))
        }
    }
}
