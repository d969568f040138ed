//! The rater-by-ratee breakdown instructors use to audit a group.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::group::Group;
use crate::models::rating::{Dimension, Rating};
use crate::models::student::Student;
use crate::models::Score;

/// What one rater gave one ratee.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RaterRow {
    #[serde(rename = "raterID")]
    pub rater_id: i64,
    #[serde(rename = "FirstName")]
    pub first_name: String,
    #[serde(rename = "LastName")]
    pub last_name: String,
    pub ratings: BTreeMap<Dimension, Score>,
    pub average: Score,
}

/// Every rater's row for a single ratee.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateeBlock {
    #[serde(rename = "rateeID")]
    pub ratee_id: i64,
    #[serde(rename = "FirstName")]
    pub first_name: String,
    #[serde(rename = "LastName")]
    pub last_name: String,
    pub raters: Vec<RaterRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupMatrix {
    #[serde(rename = "groupID")]
    pub group_id: i64,
    #[serde(rename = "GroupName")]
    pub group_name: String,
    pub ratees: Vec<RateeBlock>,
}

impl GroupMatrix {
    /// Builds the matrix for a group out of its members' records.
    pub fn for_group(group: &Group, students: &[Student]) -> Self {
        let members: Vec<Student> = students
            .iter()
            .filter(|student| group.has_student(student.id))
            .cloned()
            .collect();

        Self {
            group_id: group.id,
            group_name: group.name.clone(),
            ratees: aggregate_rater_matrix(&members, &members, group.class),
        }
    }
}

/// Lays out what every rater gave every ratee in each dimension.
///
/// Ratings live on the ratee's record, so each cell is looked up there by
/// rater ID. Anything missing shows up as `"N/A"`, and a student's own row
/// in their block is all `"-"`.
pub fn aggregate_rater_matrix(
    raters: &[Student],
    ratees: &[Student],
    class_id: i64,
) -> Vec<RateeBlock> {
    ratees
        .iter()
        .map(|ratee| RateeBlock {
            ratee_id: ratee.id,
            first_name: ratee.first_name.clone(),
            last_name: ratee.last_name.clone(),
            raters: raters
                .iter()
                .map(|rater| rater_row(rater, ratee, class_id))
                .collect(),
        })
        .collect()
}

fn rater_row(rater: &Student, ratee: &Student, class_id: i64) -> RaterRow {
    let ratings: BTreeMap<Dimension, Score> = Dimension::ALL
        .iter()
        .map(|dimension| {
            let score = if rater.id == ratee.id {
                Score::SelfPair
            } else {
                Rating::entry_from(&ratee.ratings, class_id, *dimension, rater.id)
                    .map(|entry| Score::Value(entry.rating_value.get() as f64))
                    .unwrap_or(Score::NotAvailable)
            };

            (*dimension, score)
        })
        .collect();

    let average = if rater.id == ratee.id {
        Score::SelfPair
    } else {
        Score::mean_of(ratings.values().copied())
    };

    RaterRow {
        rater_id: rater.id,
        first_name: rater.first_name.clone(),
        last_name: rater.last_name.clone(),
        ratings,
        average,
    }
}
