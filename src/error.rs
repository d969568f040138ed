//! Error handling for the API.
//!
//! In development, feel free to add a variant to the PaddyError enum
//! to better format errors. This is always better than just forcing it
//! into an `InvalidInput` or a generic `ProcessingError`. Make sure when
//! doing so to add adequate documentation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

/// The error enum for all error handling across the API.
///
/// See each variant for its corresponding error status code
/// and JSON error bodies.
#[derive(Debug, thiserror::Error)]
pub enum PaddyError {
    /// \[401\] The endpoint requires a logged-in user.
    ///
    /// ```json
    /// {
    ///     "message": "login required",
    ///     "statusCode": 401
    /// }
    /// ```
    #[error("login required")]
    Unauthorized,
    /// \[403\] The current user may not touch the requested resource.
    ///
    /// ```json
    /// {
    ///     "message": "access forbidden",
    ///     "statusCode": 403,
    ///     "reason": <reason>?
    /// }
    /// ```
    #[error("access forbidden")]
    Forbidden(Option<String>),
    /// \[400\] The request to the API was malformed.
    ///
    /// ```json
    /// {
    ///     "message": "invalid input",
    ///     "statusCode": 400,
    ///     "reason": <reason>
    /// }
    /// ```
    #[error("invalid input")]
    InvalidInput(String),
    /// \[404\] A referenced class, group, student or instructor doesn't exist.
    ///
    /// ```json
    /// {
    ///     "message": "resource not found",
    ///     "statusCode": 404,
    ///     "reason": <what was missing>
    /// }
    /// ```
    #[error("resource not found")]
    NotFound(String),
    /// \[500\] An error occurred while handling the request, e.g. a roster
    /// that couldn't be parsed.
    ///
    /// ```json
    /// {
    ///     "message": "processing error",
    ///     "statusCode": 500,
    ///     "error": <error message>
    /// }
    /// ```
    #[error("processing error")]
    ProcessingError(String),
    /// \[500\] An error occured while interacting with the database.
    ///
    /// ```json
    /// {
    ///     "message": "database error",
    ///     "statusCode": 500,
    ///     "error": <error message>
    /// }
    /// ```
    #[error("database error")]
    DbError(#[from] sqlx::Error),
}

/// The return type for all endpoints.
pub type PaddyResult<T> = Result<T, PaddyError>;

impl PaddyError {
    pub fn status(&self) -> StatusCode {
        match self {
            PaddyError::Unauthorized => StatusCode::UNAUTHORIZED,
            PaddyError::Forbidden(_) => StatusCode::FORBIDDEN,
            PaddyError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            PaddyError::NotFound(_) => StatusCode::NOT_FOUND,
            PaddyError::ProcessingError(_) | PaddyError::DbError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn as_json(&self) -> Value {
        let mut json_val = match self {
            PaddyError::Unauthorized => json!({}),
            PaddyError::Forbidden(Some(reason)) => json!({ "reason": reason }),
            PaddyError::Forbidden(None) => json!({}),
            PaddyError::InvalidInput(reason) => json!({ "reason": reason }),
            PaddyError::NotFound(reason) => json!({ "reason": reason }),
            PaddyError::ProcessingError(error) => json!({ "error": error }),
            PaddyError::DbError(error) => json!({ "error": error.to_string() }),
        };

        json_val["statusCode"] = json!(self.status().as_u16());
        json_val["message"] = json!(self.to_string());

        json_val
    }

    pub fn not_found(kind: &str, id: i64) -> Self {
        PaddyError::NotFound(format!("no {} with ID {}", kind, id))
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        PaddyError::Forbidden(Some(reason.into()))
    }
}

impl IntoResponse for PaddyError {
    fn into_response(self) -> Response {
        match &self {
            PaddyError::ProcessingError(_) | PaddyError::DbError(_) => {
                tracing::error!(error = ?self, "request failed");
            }
            _ => tracing::debug!(error = ?self, "request rejected"),
        }

        (self.status(), Json(self.as_json())).into_response()
    }
}

impl From<csv::Error> for PaddyError {
    fn from(error: csv::Error) -> PaddyError {
        PaddyError::ProcessingError(format!("couldn't parse roster: {}", error))
    }
}

impl From<bcrypt::BcryptError> for PaddyError {
    fn from(error: bcrypt::BcryptError) -> PaddyError {
        PaddyError::ProcessingError(format!("password hashing failed: {}", error))
    }
}
