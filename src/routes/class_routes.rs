use std::sync::Arc;

use axum::{Extension, Json};
use serde_json::{json, Value};

use super::basic_success;
use crate::auth::LoggedIn;
use crate::error::{PaddyError, PaddyResult};
use crate::extract::{ClassUploadBody, JsonBody, PathParam};
use crate::models::class::{Class, DeadlineUpdate};
use crate::models::group::GroupWithMembers;
use crate::models::roster::ingest_roster;
use crate::models::user::Role;
use crate::AppState;

pub async fn upload_class(
    user: LoggedIn,
    Extension(state): Extension<Arc<AppState>>,
    ClassUploadBody(upload): ClassUploadBody,
) -> PaddyResult<Json<Value>> {
    let instructor = user.instructor(&*state.store).await?;
    let report = ingest_roster(upload, instructor.id, &*state.store).await?;

    Ok(Json(json!({
        "message": "Class created",
        "class": report.class,
        "newStudents": report.new_students,
        "existingStudents": report.existing_students,
    })))
}

pub async fn get_classes(
    user: LoggedIn,
    Extension(state): Extension<Arc<AppState>>,
) -> PaddyResult<Json<Vec<Class>>> {
    Class::for_user(&user, &*state.store).await.map(Json)
}

/// Instructors see every group in their class, students only their own.
pub async fn get_groups(
    PathParam(class_id): PathParam<i64>,
    user: LoggedIn,
    Extension(state): Extension<Arc<AppState>>,
) -> PaddyResult<Json<Vec<GroupWithMembers>>> {
    let store = &*state.store;
    let groups = match user.role() {
        Role::Instructor => {
            user.class_taught(class_id, store).await?;
            store.groups_for_class(class_id).await?
        }
        Role::Student => {
            let class = Class::with_id(class_id, store).await?;
            if !class.has_student(user.id()) {
                return Err(PaddyError::forbidden(format!(
                    "you aren't enrolled in class {}",
                    class_id
                )));
            }

            store
                .groups_for_class(class_id)
                .await?
                .into_iter()
                .filter(|group| group.has_student(user.id()))
                .collect()
        }
    };

    let mut with_members = Vec::with_capacity(groups.len());
    for group in groups {
        with_members.push(GroupWithMembers::load(group, store).await?);
    }

    Ok(Json(with_members))
}

pub async fn set_deadline(
    user: LoggedIn,
    Extension(state): Extension<Arc<AppState>>,
    JsonBody(update): JsonBody<DeadlineUpdate>,
) -> PaddyResult<Json<Value>> {
    user.class_taught(update.class_id, &*state.store).await?;
    Class::set_deadline(update.class_id, update.submission_deadline, &*state.store).await?;

    Ok(Json(basic_success()))
}
