use std::sync::Arc;

use axum::{Extension, Json};
use serde_json::{json, Value};

use crate::auth::LoggedIn;
use crate::error::PaddyResult;
use crate::extract::JsonBody;
use crate::models::group::{Group, GroupMembersUpdate, NewGroup};
use crate::AppState;

pub async fn create_group(
    user: LoggedIn,
    Extension(state): Extension<Arc<AppState>>,
    JsonBody(new_group): JsonBody<NewGroup>,
) -> PaddyResult<Json<Value>> {
    user.class_taught(new_group.class_id, &*state.store).await?;
    let group = Group::create(new_group, user.id(), &*state.store).await?;

    Ok(Json(json!({ "message": "Group created", "group": group })))
}

pub async fn add_students_to_group(
    user: LoggedIn,
    Extension(state): Extension<Arc<AppState>>,
    JsonBody(update): JsonBody<GroupMembersUpdate>,
) -> PaddyResult<Json<Value>> {
    let group = Group::with_id(update.group_id, &*state.store).await?;
    user.class_taught(group.class, &*state.store).await?;
    let group = Group::add_students(group.id, &update.student_ids, &*state.store).await?;

    Ok(Json(json!({ "message": "Students added", "group": group })))
}

pub async fn remove_student_from_group(
    user: LoggedIn,
    Extension(state): Extension<Arc<AppState>>,
    JsonBody(update): JsonBody<GroupMembersUpdate>,
) -> PaddyResult<Json<Value>> {
    let group = Group::with_id(update.group_id, &*state.store).await?;
    user.class_taught(group.class, &*state.store).await?;
    let group = Group::remove_students(group.id, &update.student_ids, &*state.store).await?;

    Ok(Json(json!({ "message": "Students removed", "group": group })))
}
