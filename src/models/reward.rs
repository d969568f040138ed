//! Rice grains earned by being rated.

use serde::Serialize;
use tracing::info;

use crate::db::Store;
use crate::error::{PaddyError, PaddyResult};
use crate::models::rating::DimensionScore;

/// How many grains each star is worth
pub const GRAINS_PER_STAR: i64 = 10;
/// Given on top when every dimension of a submission gets full marks
pub const PERFECT_BONUS: i64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Award {
    pub grains_awarded: i64,
    pub perfect_bonus_applied: bool,
}

impl Award {
    pub const NONE: Award = Award {
        grains_awarded: 0,
        perfect_bonus_applied: false,
    };
}

/// The grains a ratee earns for one submission.
pub fn compute_award(scores: &[DimensionScore]) -> Award {
    let stars: i64 = scores.iter().map(|score| score.value.get()).sum();
    let perfect = !scores.is_empty() && scores.iter().all(|score| score.value.is_perfect());

    Award {
        grains_awarded: stars * GRAINS_PER_STAR + if perfect { PERFECT_BONUS } else { 0 },
        perfect_bonus_applied: perfect,
    }
}

/// Credits an award to a student, returning their new balance.
pub async fn apply_award(student_id: i64, award: Award, store: &dyn Store) -> PaddyResult<i64> {
    let balance = store
        .increment_grains(student_id, award.grains_awarded)
        .await?
        .ok_or_else(|| PaddyError::not_found("student", student_id))?;
    info!(
        student = student_id,
        awarded = award.grains_awarded,
        bonus = award.perfect_bonus_applied,
        balance,
        "awarded rice grains"
    );

    Ok(balance)
}
