use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::info;

use crate::auth::LoggedIn;
use crate::db::{SetField, Store};
use crate::error::{PaddyError, PaddyResult};
use crate::models::user::Role;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Class {
    #[serde(rename = "ID")]
    pub id: i64,
    pub name: String,
    pub subject: String,
    pub section: String,
    /// The ID of the instructor teaching the class
    pub instructor: i64,
    /// The IDs of every enrolled student
    #[serde(default)]
    pub students: Vec<i64>,
    #[serde(default)]
    pub groups: Vec<i64>,
    /// After this, ratings can no longer be submitted for the class
    #[serde(
        rename = "submissionDeadline",
        default,
        with = "time::serde::rfc3339::option"
    )]
    pub submission_deadline: Option<OffsetDateTime>,
}

impl Class {
    pub async fn with_id(id: i64, store: &dyn Store) -> PaddyResult<Class> {
        store
            .class(id)
            .await?
            .ok_or_else(|| PaddyError::not_found("class", id))
    }

    /// The classes a user teaches or is enrolled in.
    pub async fn for_user(user: &LoggedIn, store: &dyn Store) -> PaddyResult<Vec<Class>> {
        let class_ids = match user.role() {
            Role::Instructor => user.instructor(store).await?.classes,
            Role::Student => user.student(store).await?.classes,
        };

        store.classes(&class_ids).await
    }

    pub fn taught_by(&self, instructor_id: i64) -> bool {
        self.instructor == instructor_id
    }

    pub fn has_student(&self, student_id: i64) -> bool {
        self.students.contains(&student_id)
    }

    pub fn accepts_submissions_at(&self, now: OffsetDateTime) -> bool {
        self.submission_deadline
            .map(|deadline| now <= deadline)
            .unwrap_or(true)
    }

    pub fn ensure_accepts_submissions(&self, now: OffsetDateTime) -> PaddyResult<()> {
        if self.accepts_submissions_at(now) {
            Ok(())
        } else {
            Err(PaddyError::InvalidInput(format!(
                "the submission deadline for class {} has passed",
                self.id
            )))
        }
    }

    pub async fn set_deadline(
        id: i64,
        deadline: Option<OffsetDateTime>,
        store: &dyn Store,
    ) -> PaddyResult<()> {
        if !store.set_submission_deadline(id, deadline).await? {
            return Err(PaddyError::not_found("class", id));
        }
        info!(class = id, ?deadline, "updated submission deadline");

        Ok(())
    }

    /// Creates the class, or picks it back up if an upload is being retried,
    /// then links it to its instructor and students.
    pub async fn create_or_resume(class: Class, store: &dyn Store) -> PaddyResult<()> {
        let class_id = class.id;
        let instructor_id = class.instructor;
        let student_ids = class.students.clone();

        if !store.insert_class(class).await? {
            let existing = Class::with_id(class_id, store).await?;
            if !existing.taught_by(instructor_id) {
                return Err(PaddyError::forbidden(format!(
                    "class {} belongs to another instructor",
                    class_id
                )));
            }
            info!(class = class_id, "class already exists, resuming upload");
        }

        if !store
            .add_to_set(SetField::InstructorClasses, instructor_id, class_id)
            .await?
        {
            return Err(PaddyError::not_found("instructor", instructor_id));
        }
        for student_id in student_ids {
            store
                .add_to_set(SetField::ClassStudents, class_id, student_id)
                .await?;
            store
                .add_to_set(SetField::StudentClasses, student_id, class_id)
                .await?;
        }

        Ok(())
    }
}

/// The required format for changing a class's deadline.
#[derive(Debug, Deserialize)]
pub struct DeadlineUpdate {
    #[serde(rename = "classID")]
    pub class_id: i64,
    #[serde(
        rename = "submissionDeadline",
        default,
        with = "time::serde::rfc3339::option"
    )]
    pub submission_deadline: Option<OffsetDateTime>,
}
