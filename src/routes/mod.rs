//! The REST surface of the API.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::{Extension, Router};
use serde_json::{json, Value};

use crate::AppState;

pub mod auth_routes;
pub mod class_routes;
pub mod group_routes;
pub mod rating_routes;

/// Builds the router for every endpoint, sharing `state` with each handler.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // accounts
        .route("/signup", post(auth_routes::signup))
        .route("/login", post(auth_routes::login))
        .route("/logout", post(auth_routes::logout))
        .route("/index", get(auth_routes::index))
        // classes
        .route("/uploadClass", post(class_routes::upload_class))
        .route("/getClasses", get(class_routes::get_classes))
        .route("/getGroups/:classID", get(class_routes::get_groups))
        .route("/setDeadline", post(class_routes::set_deadline))
        // groups
        .route("/createGroup", post(group_routes::create_group))
        .route("/addStudentsToGroup", post(group_routes::add_students_to_group))
        .route(
            "/removeStudentFromGroup",
            post(group_routes::remove_student_from_group),
        )
        // ratings
        .route(
            "/studentRatingsSubmit",
            post(rating_routes::student_ratings_submit),
        )
        .route(
            "/instructorRatingsSubmit",
            post(rating_routes::instructor_ratings_submit),
        )
        .route("/getUserGrades", get(rating_routes::get_user_grades))
        .route("/getInstructorGrades", get(rating_routes::get_instructor_grades))
        .route("/studentsSummary/:classID", get(rating_routes::students_summary))
        .route("/detailView/:classID", get(rating_routes::detail_view))
        .layer(Extension(state))
}

pub fn basic_success() -> Value {
    json!({ "message": "OK" })
}
