use std::sync::Arc;

use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::LoggedIn;
use crate::error::{PaddyError, PaddyResult};
use crate::extract::{JsonBody, PathParam, QueryParams};
use crate::models::grades::matrix::GroupMatrix;
use crate::models::grades::{summarize_class_for_instructor, Grades};
use crate::models::rating::Rating;
use crate::models::submission::{
    submit_instructor_rating, submit_peer_rating, RatingsSubmit, SubmissionOutcome,
};
use crate::util::now;
use crate::AppState;

#[derive(Deserialize)]
pub struct GradesQuery {
    #[serde(rename = "classID")]
    class_id: Option<i64>,
}

pub async fn student_ratings_submit(
    user: LoggedIn,
    Extension(state): Extension<Arc<AppState>>,
    JsonBody(request): JsonBody<RatingsSubmit>,
) -> PaddyResult<Json<Value>> {
    let rater = user.student(&*state.store).await?;
    let outcome = submit_peer_rating(&rater, request, now(), &*state.store).await?;

    Ok(Json(submitted(outcome)))
}

pub async fn instructor_ratings_submit(
    user: LoggedIn,
    Extension(state): Extension<Arc<AppState>>,
    JsonBody(request): JsonBody<RatingsSubmit>,
) -> PaddyResult<Json<Value>> {
    let rater = user.student(&*state.store).await?;
    let outcome = submit_instructor_rating(&rater, request, now(), &*state.store).await?;

    Ok(Json(submitted(outcome)))
}

fn submitted(outcome: SubmissionOutcome) -> Value {
    json!({
        "message": "Ratings submitted",
        "grainsAwarded": outcome.award.grains_awarded,
        "perfectBonusApplied": outcome.award.perfect_bonus_applied,
        "replaced": outcome.replaced,
    })
}

/// Picks the classes to report on: just the requested one, which the
/// caller has to belong to, or all of theirs.
fn classes_to_show(requested: Option<i64>, belongs_to: &[i64]) -> PaddyResult<Vec<i64>> {
    match requested {
        Some(class_id) if belongs_to.contains(&class_id) => Ok(vec![class_id]),
        Some(class_id) => Err(PaddyError::forbidden(format!(
            "you aren't part of class {}",
            class_id
        ))),
        None => Ok(belongs_to.to_vec()),
    }
}

fn grades_for(ratings: &[Rating], class_ids: Vec<i64>) -> Vec<Grades> {
    class_ids
        .into_iter()
        .map(|class_id| Grades::for_ratee(ratings, class_id))
        .collect()
}

/// The ratings a student has received, averaged per class.
pub async fn get_user_grades(
    user: LoggedIn,
    Extension(state): Extension<Arc<AppState>>,
    QueryParams(query): QueryParams<GradesQuery>,
) -> PaddyResult<Json<Value>> {
    let student = user.student(&*state.store).await?;
    let class_ids = classes_to_show(query.class_id, &student.classes)?;

    Ok(Json(json!({
        "RiceGrains": student.rice_grains,
        "grades": grades_for(&student.ratings, class_ids),
    })))
}

pub async fn get_instructor_grades(
    user: LoggedIn,
    Extension(state): Extension<Arc<AppState>>,
    QueryParams(query): QueryParams<GradesQuery>,
) -> PaddyResult<Json<Value>> {
    let instructor = user.instructor(&*state.store).await?;
    let class_ids = classes_to_show(query.class_id, &instructor.classes)?;

    Ok(Json(json!({
        "grades": grades_for(&instructor.ratings, class_ids),
    })))
}

pub async fn students_summary(
    PathParam(class_id): PathParam<i64>,
    user: LoggedIn,
    Extension(state): Extension<Arc<AppState>>,
) -> PaddyResult<Json<Value>> {
    let class = user.class_taught(class_id, &*state.store).await?;
    let students = state.store.students(&class.students).await?;

    Ok(Json(json!({
        "classID": class.id,
        "students": summarize_class_for_instructor(&students, class.id),
    })))
}

/// Who rated whom, group by group.
pub async fn detail_view(
    PathParam(class_id): PathParam<i64>,
    user: LoggedIn,
    Extension(state): Extension<Arc<AppState>>,
) -> PaddyResult<Json<Value>> {
    let class = user.class_taught(class_id, &*state.store).await?;
    let groups = state.store.groups_for_class(class.id).await?;

    let mut member_ids: Vec<i64> = groups
        .iter()
        .flat_map(|group| group.students.iter().copied())
        .collect();
    member_ids.sort_unstable();
    member_ids.dedup();
    let members = state.store.students(&member_ids).await?;

    let matrices: Vec<GroupMatrix> = groups
        .iter()
        .map(|group| GroupMatrix::for_group(group, &members))
        .collect();

    Ok(Json(json!({
        "classID": class.id,
        "groups": matrices,
    })))
}
