use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PaddyError, PaddyResult};

/// The four rubric categories every rating is made along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Dimension {
    Cooperation,
    #[serde(rename = "Conceptual Contribution")]
    ConceptualContribution,
    #[serde(rename = "Practical Contribution")]
    PracticalContribution,
    #[serde(rename = "Work Ethic")]
    WorkEthic,
}

impl Dimension {
    /// Every dimension, in the order they're displayed.
    pub const ALL: [Dimension; 4] = [
        Dimension::Cooperation,
        Dimension::ConceptualContribution,
        Dimension::PracticalContribution,
        Dimension::WorkEthic,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Dimension::Cooperation => "Cooperation",
            Dimension::ConceptualContribution => "Conceptual Contribution",
            Dimension::PracticalContribution => "Practical Contribution",
            Dimension::WorkEthic => "Work Ethic",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A star rating between 1 and 5, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct RatingValue(u8);

impl RatingValue {
    pub const MIN: i64 = 1;
    pub const MAX: i64 = 5;

    pub fn get(self) -> i64 {
        self.0 as i64
    }

    pub fn is_perfect(self) -> bool {
        self.get() == Self::MAX
    }
}

impl TryFrom<i64> for RatingValue {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(RatingValue(value as u8))
        } else {
            Err(format!(
                "rating values must be between {} and {}, got {}",
                Self::MIN,
                Self::MAX,
                value
            ))
        }
    }
}

impl From<RatingValue> for i64 {
    fn from(value: RatingValue) -> i64 {
        value.get()
    }
}

/// One rater's score in one dimension, as stored on the ratee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRatingEntry {
    #[serde(rename = "raterID")]
    pub rater_id: i64,
    pub rating_value: RatingValue,
    #[serde(default)]
    pub comments: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionRatings {
    pub dimension_name: Dimension,
    #[serde(default)]
    pub group_ratings: Vec<GroupRatingEntry>,
}

/// Everything a ratee has received within one class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    #[serde(rename = "classID")]
    pub class_id: i64,
    #[serde(default)]
    pub dimensions: Vec<DimensionRatings>,
}

impl Rating {
    /// The stored ratings for a single class, if there are any.
    pub fn for_class(ratings: &[Rating], class_id: i64) -> impl Iterator<Item = &Rating> {
        ratings
            .iter()
            .filter(move |rating| rating.class_id == class_id)
    }

    /// The entry `rater_id` left for this ratee in `dimension`.
    ///
    /// Stored data from before resubmissions replaced old entries may hold
    /// several entries from one rater; the latest one wins.
    pub fn entry_from<'r>(
        ratings: &'r [Rating],
        class_id: i64,
        dimension: Dimension,
        rater_id: i64,
    ) -> Option<&'r GroupRatingEntry> {
        Self::for_class(ratings, class_id)
            .flat_map(|rating| rating.dimensions.iter())
            .filter(|dimension_ratings| dimension_ratings.dimension_name == dimension)
            .flat_map(|dimension_ratings| dimension_ratings.group_ratings.iter())
            .filter(|entry| entry.rater_id == rater_id)
            .last()
    }

    /// Writes a submission into a ratee's ratings.
    ///
    /// Returns whether the rater had already rated this ratee in the class,
    /// in which case their earlier entries are replaced.
    pub fn record(ratings: &mut Vec<Rating>, submission: &RatingSubmission) -> bool {
        let index = match ratings
            .iter()
            .position(|rating| rating.class_id == submission.class_id)
        {
            Some(index) => index,
            None => {
                ratings.push(Rating {
                    class_id: submission.class_id,
                    dimensions: Vec::new(),
                });
                ratings.len() - 1
            }
        };
        let rating = &mut ratings[index];

        let mut replaced = false;
        for score in &submission.scores {
            let dimension_index = match rating
                .dimensions
                .iter()
                .position(|dimension| dimension.dimension_name == score.dimension)
            {
                Some(index) => index,
                None => {
                    rating.dimensions.push(DimensionRatings {
                        dimension_name: score.dimension,
                        group_ratings: Vec::new(),
                    });
                    rating.dimensions.len() - 1
                }
            };
            let entries = &mut rating.dimensions[dimension_index].group_ratings;

            let before = entries.len();
            entries.retain(|entry| entry.rater_id != submission.rater_id);
            replaced |= entries.len() != before;

            entries.push(GroupRatingEntry {
                rater_id: submission.rater_id,
                rating_value: score.value,
                comments: score.comments.clone(),
            });
        }

        replaced
    }
}

/// A freshly submitted score for one dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionScore {
    pub dimension: Dimension,
    pub value: RatingValue,
    pub comments: String,
}

impl DimensionScore {
    pub fn new(dimension: Dimension, value: i64) -> PaddyResult<Self> {
        Ok(Self {
            dimension,
            value: RatingValue::try_from(value).map_err(PaddyError::InvalidInput)?,
            comments: String::new(),
        })
    }

    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = comments.into();
        self
    }
}

/// One rater's complete rating of one ratee, across every dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingSubmission {
    pub class_id: i64,
    pub rater_id: i64,
    pub scores: Vec<DimensionScore>,
}

impl RatingSubmission {
    /// Validates that every dimension is scored exactly once.
    pub fn new(class_id: i64, rater_id: i64, scores: Vec<DimensionScore>) -> PaddyResult<Self> {
        for dimension in Dimension::ALL {
            match scores
                .iter()
                .filter(|score| score.dimension == dimension)
                .count()
            {
                1 => {}
                0 => {
                    return Err(PaddyError::InvalidInput(format!(
                        "missing a rating for {}",
                        dimension
                    )))
                }
                _ => {
                    return Err(PaddyError::InvalidInput(format!(
                        "{} was rated more than once",
                        dimension
                    )))
                }
            }
        }

        let mut scores = scores;
        scores.sort_by_key(|score| score.dimension);

        Ok(Self {
            class_id,
            rater_id,
            scores,
        })
    }
}
