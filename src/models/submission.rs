//! Students submitting ratings of their teammates and instructors.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::db::{Ratee, Store};
use crate::error::{PaddyError, PaddyResult};
use crate::models::class::Class;
use crate::models::rating::{Dimension, DimensionScore, RatingSubmission};
use crate::models::reward::{apply_award, compute_award, Award};
use crate::models::student::Student;

/// The required format for one dimension of a submission.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedDimension {
    pub dimension_name: Dimension,
    pub rating_value: i64,
    #[serde(default)]
    pub comments: Option<String>,
}

/// The required format for submitting a rating.
///
/// `rateeID` is required when rating a teammate. When rating an instructor
/// it defaults to the class's instructor.
#[derive(Debug, Clone, Deserialize)]
pub struct RatingsSubmit {
    #[serde(rename = "classID")]
    pub class_id: i64,
    #[serde(rename = "rateeID", default)]
    pub ratee_id: Option<i64>,
    pub ratings: Vec<SubmittedDimension>,
}

impl RatingsSubmit {
    pub fn into_submission(self, rater_id: i64) -> PaddyResult<RatingSubmission> {
        let scores = self
            .ratings
            .into_iter()
            .map(|rating| {
                DimensionScore::new(rating.dimension_name, rating.rating_value).map(|score| {
                    score.with_comments(rating.comments.unwrap_or_default().trim().to_owned())
                })
            })
            .collect::<PaddyResult<Vec<_>>>()?;

        RatingSubmission::new(self.class_id, rater_id, scores)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionOutcome {
    #[serde(flatten)]
    pub award: Award,
    /// Whether this replaced an earlier submission for the same ratee
    pub replaced: bool,
}

/// Records a student's rating of a groupmate and pays the ratee.
///
/// Only a rater's first submission for a ratee earns grains; later ones
/// replace the stored ratings without paying out again.
pub async fn submit_peer_rating(
    rater: &Student,
    request: RatingsSubmit,
    now: OffsetDateTime,
    store: &dyn Store,
) -> PaddyResult<SubmissionOutcome> {
    let ratee_id = request
        .ratee_id
        .ok_or_else(|| PaddyError::InvalidInput("rateeID is required".to_owned()))?;
    if ratee_id == rater.id {
        return Err(PaddyError::InvalidInput("you can't rate yourself".to_owned()));
    }
    let submission = request.into_submission(rater.id)?;

    let class = Class::with_id(submission.class_id, store).await?;
    class.ensure_accepts_submissions(now)?;

    let groups = store.groups_for_class(class.id).await?;
    if !groups.iter().any(|group| group.pairs(rater.id, ratee_id)) {
        warn!(rater = rater.id, ratee = ratee_id, class = class.id, "rater and ratee aren't groupmates");
        return Err(PaddyError::forbidden(format!(
            "student {} is not in your group for class {}",
            ratee_id, class.id
        )));
    }

    let replaced = store
        .record_rating(Ratee::Student(ratee_id), &submission)
        .await?
        .ok_or_else(|| PaddyError::not_found("student", ratee_id))?;
    info!(rater = rater.id, ratee = ratee_id, class = class.id, replaced, "recorded peer rating");

    let award = if replaced {
        Award::NONE
    } else {
        compute_award(&submission.scores)
    };
    if award.grains_awarded > 0 {
        apply_award(ratee_id, award, store).await?;
    }

    Ok(SubmissionOutcome { award, replaced })
}

/// Records a student's rating of the instructor teaching one of their classes.
pub async fn submit_instructor_rating(
    rater: &Student,
    request: RatingsSubmit,
    now: OffsetDateTime,
    store: &dyn Store,
) -> PaddyResult<SubmissionOutcome> {
    let requested_ratee = request.ratee_id;
    let submission = request.into_submission(rater.id)?;

    let class = Class::with_id(submission.class_id, store).await?;
    if let Some(ratee_id) = requested_ratee {
        if !class.taught_by(ratee_id) {
            return Err(PaddyError::InvalidInput(format!(
                "instructor {} doesn't teach class {}",
                ratee_id, class.id
            )));
        }
    }
    class.ensure_accepts_submissions(now)?;
    if !class.has_student(rater.id) {
        return Err(PaddyError::forbidden(format!(
            "you aren't enrolled in class {}",
            class.id
        )));
    }

    let replaced = store
        .record_rating(Ratee::Instructor(class.instructor), &submission)
        .await?
        .ok_or_else(|| PaddyError::not_found("instructor", class.instructor))?;
    info!(rater = rater.id, instructor = class.instructor, class = class.id, replaced, "recorded instructor rating");

    Ok(SubmissionOutcome {
        award: Award::NONE,
        replaced,
    })
}

#[cfg(test)]
mod tests {
    use time::Duration;

    use super::*;
    use crate::models::grades::Grades;
    use crate::models::group::{Group, NewGroup};
    use crate::models::Score;
    use crate::tests::mock::{mock_time, seeded_store};

    fn request(ratee_id: Option<i64>, values: [i64; 4]) -> RatingsSubmit {
        RatingsSubmit {
            class_id: 10,
            ratee_id,
            ratings: Dimension::ALL
                .iter()
                .zip(values.iter())
                .map(|(dimension, value)| SubmittedDimension {
                    dimension_name: *dimension,
                    rating_value: *value,
                    comments: Some(format!("  notes on {}  ", dimension)),
                })
                .collect(),
        }
    }

    async fn grouped_store() -> crate::db::MemoryStore {
        let store = seeded_store().await;
        Group::create(
            NewGroup {
                id: 50,
                name: "Team Rocket".to_owned(),
                class_id: 10,
                student_ids: vec![1, 2],
            },
            100,
            &store,
        )
        .await
        .unwrap();
        store.increment_grains(2, 100).await.unwrap();

        store
    }

    #[tokio::test]
    async fn perfect_ratings_pay_the_bonus() {
        let store = grouped_store().await;
        let rater = store.student(1).await.unwrap().unwrap();

        let outcome = submit_peer_rating(&rater, request(Some(2), [5, 5, 5, 5]), mock_time(), &store)
            .await
            .unwrap();

        assert_eq!(outcome.award.grains_awarded, 250);
        assert!(outcome.award.perfect_bonus_applied);
        let ratee = store.student(2).await.unwrap().unwrap();
        assert_eq!(ratee.rice_grains, 350);

        let grades = Grades::for_ratee(&ratee.ratings, 10);
        assert_eq!(grades.overall_average, Score::Value(5.0));
        assert_eq!(grades.dimensions[0].comments, vec!["notes on Cooperation".to_owned()]);
    }

    #[tokio::test]
    async fn resubmissions_replace_without_paying_again() {
        let store = grouped_store().await;
        let rater = store.student(1).await.unwrap().unwrap();

        submit_peer_rating(&rater, request(Some(2), [2, 2, 2, 2]), mock_time(), &store)
            .await
            .unwrap();
        let outcome = submit_peer_rating(&rater, request(Some(2), [4, 4, 4, 4]), mock_time(), &store)
            .await
            .unwrap();

        assert!(outcome.replaced);
        assert_eq!(outcome.award, Award::NONE);
        let ratee = store.student(2).await.unwrap().unwrap();
        assert_eq!(ratee.rice_grains, 180);
        let grades = Grades::for_ratee(&ratee.ratings, 10);
        assert_eq!(grades.dimensions[0].count, 1);
        assert_eq!(grades.overall_average, Score::Value(4.0));
    }

    #[tokio::test]
    async fn only_groupmates_can_be_rated() {
        let store = grouped_store().await;
        let rater = store.student(1).await.unwrap().unwrap();

        let result = submit_peer_rating(&rater, request(Some(3), [3, 3, 3, 3]), mock_time(), &store).await;

        assert!(matches!(result, Err(PaddyError::Forbidden(_))));
        assert!(store.student(3).await.unwrap().unwrap().ratings.is_empty());
    }

    #[tokio::test]
    async fn self_ratings_and_bad_values_are_rejected() {
        let store = grouped_store().await;
        let rater = store.student(1).await.unwrap().unwrap();

        let own = submit_peer_rating(&rater, request(Some(1), [3, 3, 3, 3]), mock_time(), &store).await;
        assert!(matches!(own, Err(PaddyError::InvalidInput(_))));

        let out_of_range =
            submit_peer_rating(&rater, request(Some(2), [3, 6, 3, 3]), mock_time(), &store).await;
        assert!(matches!(out_of_range, Err(PaddyError::InvalidInput(_))));
        assert_eq!(store.student(2).await.unwrap().unwrap().rice_grains, 100);
    }

    #[tokio::test]
    async fn late_submissions_are_rejected() {
        let store = grouped_store().await;
        store
            .set_submission_deadline(10, Some(mock_time()))
            .await
            .unwrap();
        let rater = store.student(1).await.unwrap().unwrap();

        let result = submit_peer_rating(
            &rater,
            request(Some(2), [3, 3, 3, 3]),
            mock_time() + Duration::days(1),
            &store,
        )
        .await;

        assert!(matches!(result, Err(PaddyError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn instructors_are_rated_without_grains() {
        let store = grouped_store().await;
        let rater = store.student(3).await.unwrap().unwrap();

        let outcome = submit_instructor_rating(&rater, request(None, [4, 5, 4, 5]), mock_time(), &store)
            .await
            .unwrap();

        assert_eq!(outcome.award, Award::NONE);
        let instructor = store.instructor(100).await.unwrap().unwrap();
        let grades = Grades::for_ratee(&instructor.ratings, 10);
        assert_eq!(grades.overall_average, Score::Value(4.5));

        let wrong = submit_instructor_rating(&rater, request(Some(7), [4, 5, 4, 5]), mock_time(), &store).await;
        assert!(matches!(wrong, Err(PaddyError::InvalidInput(_))));
    }
}
