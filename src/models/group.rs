//! Student groups, and keeping their memberships in step with classes,
//! students and instructors.
//!
//! None of these updates are transactional. Each step is an idempotent
//! set-union or removal, so a request that fails halfway can simply be sent
//! again to finish the job.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db::{SetField, Store};
use crate::error::{PaddyError, PaddyResult};
use crate::models::class::Class;
use crate::models::student::Classmate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    #[serde(rename = "groupID")]
    pub id: i64,
    #[serde(rename = "GroupName")]
    pub name: String,
    /// The ID of the class the group is part of
    #[serde(rename = "Class")]
    pub class: i64,
    #[serde(rename = "Instructor")]
    pub instructor: i64,
    #[serde(rename = "Students", default)]
    pub students: Vec<i64>,
}

/// The required format for creating a group.
#[derive(Debug, Clone, Deserialize)]
pub struct NewGroup {
    #[serde(rename = "groupID")]
    pub id: i64,
    #[serde(rename = "GroupName")]
    pub name: String,
    #[serde(rename = "classID")]
    pub class_id: i64,
    #[serde(rename = "studentIDs", default)]
    pub student_ids: Vec<i64>,
}

/// The required format for adding students to or removing them from a group.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupMembersUpdate {
    #[serde(rename = "groupID")]
    pub group_id: i64,
    #[serde(rename = "studentIDs")]
    pub student_ids: Vec<i64>,
}

impl Group {
    pub async fn with_id(id: i64, store: &dyn Store) -> PaddyResult<Group> {
        store
            .group(id)
            .await?
            .ok_or_else(|| PaddyError::not_found("group", id))
    }

    pub fn has_student(&self, student_id: i64) -> bool {
        self.students.contains(&student_id)
    }

    /// Whether both students are in this group.
    pub fn pairs(&self, first: i64, second: i64) -> bool {
        self.has_student(first) && self.has_student(second)
    }

    pub async fn create(
        new_group: NewGroup,
        instructor_id: i64,
        store: &dyn Store,
    ) -> PaddyResult<Group> {
        if new_group.name.trim().is_empty() {
            return Err(PaddyError::InvalidInput("GroupName is required".to_owned()));
        }
        let class = Class::with_id(new_group.class_id, store).await?;
        ensure_enrolled(&class, &new_group.student_ids)?;

        let mut student_ids = new_group.student_ids;
        student_ids.sort_unstable();
        student_ids.dedup();

        let group = Group {
            id: new_group.id,
            name: new_group.name.trim().to_owned(),
            class: class.id,
            instructor: instructor_id,
            students: student_ids.clone(),
        };

        if store.insert_group(group.clone()).await? {
            info!(group = group.id, class = class.id, "created group");
        } else {
            let existing = Group::with_id(group.id, store).await?;
            if existing.class != group.class {
                return Err(PaddyError::InvalidInput(format!(
                    "group {} already exists in class {}",
                    group.id, existing.class
                )));
            }
            info!(group = group.id, "group already exists, re-linking members");
        }

        store
            .add_to_set(SetField::ClassGroups, class.id, group.id)
            .await?;
        store
            .add_to_set(SetField::InstructorGroups, instructor_id, group.id)
            .await?;
        Self::link_students(group.id, &student_ids, store).await?;

        Group::with_id(group.id, store).await
    }

    pub async fn add_students(
        group_id: i64,
        student_ids: &[i64],
        store: &dyn Store,
    ) -> PaddyResult<Group> {
        let group = Group::with_id(group_id, store).await?;
        let class = Class::with_id(group.class, store).await?;
        ensure_enrolled(&class, student_ids)?;

        Self::link_students(group.id, student_ids, store).await?;
        info!(group = group.id, added = ?student_ids, "added students to group");

        Group::with_id(group.id, store).await
    }

    pub async fn remove_students(
        group_id: i64,
        student_ids: &[i64],
        store: &dyn Store,
    ) -> PaddyResult<Group> {
        let group = Group::with_id(group_id, store).await?;

        for &student_id in student_ids {
            store
                .remove_from_set(SetField::GroupStudents, group.id, student_id)
                .await?;
            store
                .remove_from_set(SetField::StudentGroups, student_id, group.id)
                .await?;
        }
        info!(group = group.id, removed = ?student_ids, "removed students from group");

        Group::with_id(group.id, store).await
    }

    async fn link_students(group_id: i64, student_ids: &[i64], store: &dyn Store) -> PaddyResult<()> {
        for &student_id in student_ids {
            store
                .add_to_set(SetField::GroupStudents, group_id, student_id)
                .await?;
            if !store
                .add_to_set(SetField::StudentGroups, student_id, group_id)
                .await?
            {
                return Err(PaddyError::not_found("student", student_id));
            }
        }

        Ok(())
    }
}

/// A group along with who is in it, for rendering rating forms.
#[derive(Debug, Clone, Serialize)]
pub struct GroupWithMembers {
    #[serde(rename = "groupID")]
    pub id: i64,
    #[serde(rename = "GroupName")]
    pub name: String,
    #[serde(rename = "Class")]
    pub class: i64,
    #[serde(rename = "Students")]
    pub students: Vec<Classmate>,
}

impl GroupWithMembers {
    pub async fn load(group: Group, store: &dyn Store) -> PaddyResult<Self> {
        let students = store.students(&group.students).await?;

        Ok(Self {
            id: group.id,
            name: group.name,
            class: group.class,
            students: students.iter().map(Classmate::from).collect(),
        })
    }
}

fn ensure_enrolled(class: &Class, student_ids: &[i64]) -> PaddyResult<()> {
    match student_ids.iter().find(|id| !class.has_student(**id)) {
        Some(student_id) => Err(PaddyError::InvalidInput(format!(
            "student {} is not enrolled in class {}",
            student_id, class.id
        ))),
        None => Ok(()),
    }
}
