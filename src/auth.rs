//! Authorization handling for the API.
//!
//! The [LoggedIn](crate::auth::LoggedIn) struct, in use as an extractable
//! parameter for endpoints, is the primary method for handling authorization
//! for the API: extracting one asserts that a user is logged in, and its
//! `require` and `class_taught` methods gate access to individual resources.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{FromRequest, RequestParts};
use axum::headers::{Cookie, HeaderMapExt};
use axum::http::HeaderMap;
use tracing::warn;

use crate::db::Store;
use crate::error::{PaddyError, PaddyResult};
use crate::models::class::Class;
use crate::models::instructor::Instructor;
use crate::models::session::Session;
use crate::models::student::Student;
use crate::models::user::{Role, User};
use crate::AppState;

/// The user making the current request.
#[derive(Debug, Clone)]
pub struct LoggedIn {
    pub user: User,
}

impl LoggedIn {
    pub fn id(&self) -> i64 {
        self.user.id
    }

    pub fn role(&self) -> Role {
        self.user.role
    }

    pub fn require(&self, role: Role) -> PaddyResult<()> {
        if self.user.role == role {
            Ok(())
        } else {
            warn!(user = self.user.id, required = %role, "rejected request for the wrong role");
            Err(PaddyError::forbidden(format!(
                "only {}s may do that",
                role.as_str().to_lowercase()
            )))
        }
    }

    /// The caller's student record; forbidden for instructors.
    pub async fn student(&self, store: &dyn Store) -> PaddyResult<Student> {
        self.require(Role::Student)?;
        Student::with_id(self.user.id, store).await
    }

    /// The caller's instructor record; forbidden for students.
    pub async fn instructor(&self, store: &dyn Store) -> PaddyResult<Instructor> {
        self.require(Role::Instructor)?;
        Instructor::with_id(self.user.id, store).await
    }

    /// Loads a class, making sure the caller is the one teaching it.
    pub async fn class_taught(&self, class_id: i64, store: &dyn Store) -> PaddyResult<Class> {
        self.require(Role::Instructor)?;
        let class = Class::with_id(class_id, store).await?;

        if class.taught_by(self.user.id) {
            Ok(class)
        } else {
            warn!(user = self.user.id, class = class_id, "rejected access to another instructor's class");
            Err(PaddyError::forbidden(format!(
                "you don't teach class {}",
                class_id
            )))
        }
    }
}

/// Finds the session token in the cookie, falling back to a `token` header.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .typed_get::<Cookie>()
        .and_then(|cookie| cookie.get(Session::COOKIE_NAME).map(str::to_owned))
        .or_else(|| {
            headers
                .get(Session::TOKEN_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned)
        })
        .filter(|token| !token.is_empty())
}

#[async_trait]
impl<B: Send> FromRequest<B> for LoggedIn {
    type Rejection = PaddyError;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        let state = req
            .extensions()
            .get::<Arc<AppState>>()
            .cloned()
            .ok_or_else(|| PaddyError::ProcessingError("app state not configured".to_owned()))?;
        let token = session_token(req.headers()).ok_or(PaddyError::Unauthorized)?;

        let user_id = state
            .store
            .session_user(&token)
            .await?
            .ok_or(PaddyError::Unauthorized)?;
        let user = state
            .store
            .user(user_id)
            .await?
            .ok_or(PaddyError::Unauthorized)?;

        Ok(LoggedIn { user })
    }
}
