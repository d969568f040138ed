use serde::{Serialize, Serializer};

pub mod class;
pub mod grades;
pub mod group;
pub mod instructor;
pub mod rating;
pub mod reward;
pub mod roster;
pub mod session;
pub mod student;
pub mod submission;
pub mod user;

/// An averaged score as shown to users.
///
/// Serializes as a number, `"N/A"` when nobody has rated yet, or `"-"` for
/// the cells where someone would be rating themself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Score {
    Value(f64),
    NotAvailable,
    SelfPair,
}

impl Score {
    pub const NOT_AVAILABLE: &'static str = "N/A";
    pub const SELF_PAIR: &'static str = "-";

    /// The average of `total` over `count` ratings, rounded to a tenth.
    pub fn average(total: f64, count: usize) -> Self {
        if count > 0 {
            Score::Value(round_to_tenth(total / count as f64))
        } else {
            Score::NotAvailable
        }
    }

    /// The mean of the valid scores given, skipping `"N/A"` and `"-"` cells.
    pub fn mean_of<I: IntoIterator<Item = Score>>(scores: I) -> Self {
        let (total, count) = scores
            .into_iter()
            .filter_map(|score| score.value())
            .fold((0.0, 0), |(total, count), value| (total + value, count + 1));

        Self::average(total, count)
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Score::Value(value) => Some(*value),
            Score::NotAvailable | Score::SelfPair => None,
        }
    }
}

impl Serialize for Score {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Score::Value(value) => serializer.serialize_f64(*value),
            Score::NotAvailable => serializer.serialize_str(Self::NOT_AVAILABLE),
            Score::SelfPair => serializer.serialize_str(Self::SELF_PAIR),
        }
    }
}

pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
