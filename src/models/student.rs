use serde::{Deserialize, Serialize};

use crate::db::Store;
use crate::error::{PaddyError, PaddyResult};
use crate::models::rating::Rating;
use crate::models::user::User;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Student {
    /// The student's ID, assigned by the school
    #[serde(rename = "ID")]
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub department: String,
    /// The IDs of the classes the student is enrolled in
    #[serde(default)]
    pub classes: Vec<i64>,
    /// The IDs of the groups the student belongs to
    #[serde(default)]
    pub groups: Vec<i64>,
    /// Every rating the student has received, by class
    #[serde(default)]
    pub ratings: Vec<Rating>,
    #[serde(default)]
    pub rice_grains: i64,
}

impl Student {
    pub fn new(id: i64, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            id,
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: String::new(),
            username: String::new(),
            department: String::new(),
            classes: Vec::new(),
            groups: Vec::new(),
            ratings: Vec::new(),
            rice_grains: 0,
        }
    }

    pub fn for_user(user: &User) -> Self {
        Self {
            email: user.email.clone(),
            username: user.username.clone(),
            department: user.department.clone(),
            ..Self::new(user.id, &user.first_name, &user.last_name)
        }
    }

    pub async fn with_id(id: i64, store: &dyn Store) -> PaddyResult<Student> {
        store
            .student(id)
            .await?
            .ok_or_else(|| PaddyError::not_found("student", id))
    }
}

/// A student as seen by their classmates: no ratings or grains.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Classmate {
    #[serde(rename = "ID")]
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl From<&Student> for Classmate {
    fn from(student: &Student) -> Self {
        Self {
            id: student.id,
            first_name: student.first_name.clone(),
            last_name: student.last_name.clone(),
            email: student.email.clone(),
        }
    }
}
