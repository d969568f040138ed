use serde::{Deserialize, Serialize};

use crate::db::Store;
use crate::error::{PaddyError, PaddyResult};
use crate::models::rating::Rating;
use crate::models::user::User;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Instructor {
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
    /// The IDs of the classes they teach
    #[serde(default)]
    pub classes: Vec<i64>,
    /// The IDs of the groups they've created
    #[serde(default)]
    pub groups: Vec<i64>,
    /// The ratings students have given them, by class
    #[serde(default)]
    pub ratings: Vec<Rating>,
}

impl Instructor {
    pub fn for_user(user: &User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            username: user.username.clone(),
            department: user.department.clone(),
            classes: Vec::new(),
            groups: Vec::new(),
            ratings: Vec::new(),
        }
    }

    pub async fn with_id(id: i64, store: &dyn Store) -> PaddyResult<Instructor> {
        store
            .instructor(id)
            .await?
            .ok_or_else(|| PaddyError::not_found("instructor", id))
    }
}
