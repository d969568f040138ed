use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db::Store;
use crate::error::{PaddyError, PaddyResult};
use crate::models::instructor::Instructor;
use crate::models::student::Student;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Student,
    Instructor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "Student",
            Role::Instructor => "Instructor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Student" => Ok(Role::Student),
            "Instructor" => Ok(Role::Instructor),
            other => Err(format!("unknown role {}", other)),
        }
    }
}

/// A login identity. Its ID is shared with the student or instructor record
/// it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    /// The bcrypt hash of the user's password
    pub pass_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub department: String,
    pub role: Role,
}

/// The required format for creating an account.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewUser {
    #[serde(rename = "ID")]
    pub id: i64,
    pub email: String,
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub department: String,
    pub role: Role,
}

impl User {
    /// Checks a username (or email) and password, returning the user they belong to.
    pub async fn login_is_valid(
        login: &str,
        password: &str,
        store: &dyn Store,
    ) -> PaddyResult<Option<User>> {
        if let Some(user) = store.user_by_login(login).await? {
            if bcrypt::verify(password, &user.pass_hash)? {
                return Ok(Some(user));
            }
        }

        Ok(None)
    }

    pub async fn register(new_user: NewUser, bcrypt_cost: u32, store: &dyn Store) -> PaddyResult<User> {
        if new_user.id <= 0 {
            return Err(PaddyError::InvalidInput(format!(
                "{} is not a valid ID",
                new_user.id
            )));
        }
        for (field, value) in [
            ("Email", &new_user.email),
            ("Username", &new_user.username),
            ("Password", &new_user.password),
            ("FirstName", &new_user.first_name),
            ("LastName", &new_user.last_name),
        ] {
            if value.trim().is_empty() {
                return Err(PaddyError::InvalidInput(format!("{} is required", field)));
            }
        }

        let user = User {
            id: new_user.id,
            email: new_user.email.trim().to_owned(),
            username: new_user.username.trim().to_owned(),
            pass_hash: bcrypt::hash(&new_user.password, bcrypt_cost)?,
            first_name: new_user.first_name.trim().to_owned(),
            last_name: new_user.last_name.trim().to_owned(),
            department: new_user.department.trim().to_owned(),
            role: new_user.role,
        };

        if !store.insert_user(user.clone()).await? {
            return Err(PaddyError::InvalidInput(
                "another account already has that ID, email or username".to_owned(),
            ));
        }

        match user.role {
            Role::Instructor => {
                store.insert_instructor(Instructor::for_user(&user)).await?;
            }
            Role::Student => {
                store.insert_students(vec![Student::for_user(&user)]).await?;
            }
        }
        info!(user = user.id, role = %user.role, "registered new user");

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::tests::mock::seeded_store;

    fn new_user(id: i64, username: &str, role: Role) -> NewUser {
        NewUser {
            id,
            email: format!("{}@uni.edu", username),
            username: username.to_owned(),
            password: "hunter22".to_owned(),
            first_name: "Test".to_owned(),
            last_name: "User".to_owned(),
            department: "CS".to_owned(),
            role,
        }
    }

    #[tokio::test]
    async fn registering_creates_the_matching_record() {
        let store = MemoryStore::default();

        User::register(new_user(100, "grace", Role::Instructor), 4, &store)
            .await
            .unwrap();
        User::register(new_user(1, "ada", Role::Student), 4, &store)
            .await
            .unwrap();

        assert!(store.instructor(100).await.unwrap().is_some());
        assert!(store.student(100).await.unwrap().is_none());
        assert_eq!(store.student(1).await.unwrap().unwrap().username, "ada");
    }

    #[tokio::test]
    async fn rostered_students_keep_their_records_on_signup() {
        let store = seeded_store().await;
        store.increment_grains(1, 70).await.unwrap();

        User::register(new_user(1, "ada", Role::Student), 4, &store)
            .await
            .unwrap();

        let student = store.student(1).await.unwrap().unwrap();
        assert_eq!(student.rice_grains, 70);
        assert_eq!(student.classes, vec![10]);
    }

    #[tokio::test]
    async fn taken_usernames_are_rejected() {
        let store = MemoryStore::default();
        User::register(new_user(1, "ada", Role::Student), 4, &store)
            .await
            .unwrap();

        let mut duplicate = new_user(2, "ada", Role::Student);
        duplicate.email = "someone.else@uni.edu".to_owned();
        let result = User::register(duplicate, 4, &store).await;

        assert!(matches!(result, Err(PaddyError::InvalidInput(_))));
        assert!(store.student(2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn logins_check_the_password_hash() {
        let store = MemoryStore::default();
        User::register(new_user(1, "ada", Role::Student), 4, &store)
            .await
            .unwrap();

        let by_username = User::login_is_valid("ada", "hunter22", &store).await.unwrap();
        assert_eq!(by_username.map(|user| user.id), Some(1));
        let by_email = User::login_is_valid("ada@uni.edu", "hunter22", &store).await.unwrap();
        assert!(by_email.is_some());

        assert!(User::login_is_valid("ada", "wrong", &store).await.unwrap().is_none());
        assert!(User::login_is_valid("nobody", "hunter22", &store).await.unwrap().is_none());
    }
}
