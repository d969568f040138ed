//! Turning raw ratings into the averages students and instructors see.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::models::rating::{Dimension, Rating};
use crate::models::student::Student;
use crate::models::Score;

pub mod matrix;

/// How a ratee did in one dimension of one class.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionSummary {
    pub dimension_name: Dimension,
    pub average_rating: Score,
    /// How many ratings went into the average
    pub count: usize,
    /// Every non-empty comment left, in the order they were stored
    pub comments: Vec<String>,
}

/// Everything a ratee has received within one class.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Grades {
    #[serde(rename = "classID")]
    pub class_id: i64,
    pub dimensions: Vec<DimensionSummary>,
    pub overall_average: Score,
}

impl Grades {
    pub fn for_ratee(ratings: &[Rating], class_id: i64) -> Self {
        let dimensions = aggregate_ratings_for_ratee(ratings, class_id);

        Self {
            class_id,
            overall_average: overall_average(&dimensions),
            dimensions,
        }
    }
}

#[derive(Default)]
struct Tally {
    total: i64,
    count: usize,
    comments: Vec<String>,
}

/// Averages a ratee's ratings for one class, one summary per dimension.
///
/// Every dimension is present in the output; those nobody rated yet have an
/// average of `"N/A"`.
pub fn aggregate_ratings_for_ratee(ratings: &[Rating], class_id: i64) -> Vec<DimensionSummary> {
    let mut tallies: BTreeMap<Dimension, Tally> = Dimension::ALL
        .iter()
        .map(|dimension| (*dimension, Tally::default()))
        .collect();

    for rating in Rating::for_class(ratings, class_id) {
        for dimension in &rating.dimensions {
            let tally = tallies.entry(dimension.dimension_name).or_default();

            for entry in &dimension.group_ratings {
                tally.total += entry.rating_value.get();
                tally.count += 1;
                if !entry.comments.is_empty() {
                    tally.comments.push(entry.comments.clone());
                }
            }
        }
    }

    tallies
        .into_iter()
        .map(|(dimension_name, tally)| DimensionSummary {
            dimension_name,
            average_rating: Score::average(tally.total as f64, tally.count),
            count: tally.count,
            comments: tally.comments,
        })
        .collect()
}

/// The mean of the dimensions that have an average.
pub fn overall_average(summaries: &[DimensionSummary]) -> Score {
    Score::mean_of(summaries.iter().map(|summary| summary.average_rating))
}

/// How many different raters have rated this ratee in the class.
pub fn peers_who_responded(ratings: &[Rating], class_id: i64) -> usize {
    Rating::for_class(ratings, class_id)
        .flat_map(|rating| rating.dimensions.iter())
        .flat_map(|dimension| dimension.group_ratings.iter())
        .map(|entry| entry.rater_id)
        .collect::<HashSet<_>>()
        .len()
}

/// One line of an instructor's class overview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentSummaryRow {
    #[serde(rename = "ID")]
    pub id: i64,
    #[serde(rename = "FirstName")]
    pub first_name: String,
    #[serde(rename = "LastName")]
    pub last_name: String,
    pub dimensions: BTreeMap<Dimension, Score>,
    #[serde(rename = "overallAverage")]
    pub overall_average: Score,
    #[serde(rename = "PeersWhoResponded")]
    pub peers_who_responded: usize,
}

pub fn summarize_class_for_instructor(students: &[Student], class_id: i64) -> Vec<StudentSummaryRow> {
    students
        .iter()
        .map(|student| {
            let summaries = aggregate_ratings_for_ratee(&student.ratings, class_id);

            StudentSummaryRow {
                id: student.id,
                first_name: student.first_name.clone(),
                last_name: student.last_name.clone(),
                overall_average: overall_average(&summaries),
                dimensions: summaries
                    .into_iter()
                    .map(|summary| (summary.dimension_name, summary.average_rating))
                    .collect(),
                peers_who_responded: peers_who_responded(&student.ratings, class_id),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::mock::{mock_student, rated};

    #[test]
    fn averages_and_comments_are_collected_per_dimension() {
        let mut ratings = Vec::new();
        rated(&mut ratings, 10, 2, [5, 4, 3, 2], "great teammate");
        rated(&mut ratings, 10, 3, [4, 4, 4, 5], "");
        rated(&mut ratings, 11, 3, [1, 1, 1, 1], "other class");

        let summaries = aggregate_ratings_for_ratee(&ratings, 10);

        assert_eq!(summaries.len(), 4);
        assert_eq!(summaries[0].dimension_name, Dimension::Cooperation);
        assert_eq!(summaries[0].average_rating, Score::Value(4.5));
        assert_eq!(summaries[0].count, 2);
        assert_eq!(summaries[0].comments, vec!["great teammate".to_owned()]);
        assert_eq!(summaries[2].average_rating, Score::Value(3.5));
        assert_eq!(summaries[3].average_rating, Score::Value(3.5));
    }

    #[test]
    fn only_empty_comments_are_left_out() {
        let mut ratings = Vec::new();
        rated(&mut ratings, 10, 2, [3, 3, 3, 3], "");
        rated(&mut ratings, 10, 3, [3, 3, 3, 3], "ok");

        let summaries = aggregate_ratings_for_ratee(&ratings, 10);

        assert!(summaries
            .iter()
            .all(|summary| summary.comments == vec!["ok".to_owned()]));
    }

    #[test]
    fn unrated_dimensions_are_not_available() {
        let summaries = aggregate_ratings_for_ratee(&[], 10);

        assert!(summaries
            .iter()
            .all(|summary| summary.average_rating == Score::NotAvailable && summary.count == 0));
        assert_eq!(overall_average(&summaries), Score::NotAvailable);

        let json = serde_json::to_value(&summaries[0]).unwrap();
        assert_eq!(json["averageRating"], "N/A");
        assert_eq!(json["dimensionName"], "Cooperation");
    }

    #[test]
    fn averages_ignore_the_order_ratings_arrived_in() {
        let values = [[5, 1, 2, 3], [2, 2, 5, 4], [3, 5, 1, 1], [4, 3, 3, 2]];

        let mut forward = Vec::new();
        for (rater, scores) in values.iter().enumerate() {
            rated(&mut forward, 1, rater as i64, *scores, "");
        }
        let mut backward = Vec::new();
        for (rater, scores) in values.iter().enumerate().rev() {
            rated(&mut backward, 1, rater as i64, *scores, "");
        }

        let forward = aggregate_ratings_for_ratee(&forward, 1);
        let backward = aggregate_ratings_for_ratee(&backward, 1);
        for (a, b) in forward.iter().zip(backward.iter()) {
            assert_eq!(a.average_rating, b.average_rating);
        }
    }

    #[test]
    fn the_overall_average_spans_every_rated_dimension() {
        let mut ratings = Vec::new();
        rated(&mut ratings, 10, 2, [5, 4, 3, 2], "");

        let grades = Grades::for_ratee(&ratings, 10);

        assert_eq!(grades.overall_average, Score::Value(3.5));
    }

    #[test]
    fn class_summaries_count_distinct_peers() {
        let mut ada = mock_student(1, "Ada", "Lovelace");
        rated(&mut ada.ratings, 10, 2, [5, 5, 5, 5], "");
        rated(&mut ada.ratings, 10, 3, [3, 3, 3, 3], "");
        let alan = mock_student(2, "Alan", "Kay");

        let rows = summarize_class_for_instructor(&[ada, alan], 10);

        assert_eq!(rows[0].peers_who_responded, 2);
        assert_eq!(rows[0].overall_average, Score::Value(4.0));
        assert_eq!(rows[0].dimensions[&Dimension::WorkEthic], Score::Value(4.0));
        assert_eq!(rows[1].peers_who_responded, 0);
        assert_eq!(rows[1].overall_average, Score::NotAvailable);

        let json = serde_json::to_value(&rows[1]).unwrap();
        assert_eq!(json["dimensions"]["Practical Contribution"], "N/A");
        assert_eq!(json["PeersWhoResponded"], 0);
    }
}
