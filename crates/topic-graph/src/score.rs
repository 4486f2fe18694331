//! Scores and multi-perspective aggregation
//!
//! Scores are discrete levels. Averaging maps each level to the numeric
//! midpoint of the band it stands for, averages, and maps back to the
//! nearest level. The midpoint table is fixed; changing it would change how
//! every stored score reads.

use crate::ids::GraphPartId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Discrete score level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum Score {
    /// Sentinel: nobody scored this part
    #[default]
    #[serde(rename = "-")]
    Unscored,
    #[serde(rename = "1")]
    One,
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "3")]
    Three,
    #[serde(rename = "4")]
    Four,
    #[serde(rename = "5")]
    Five,
    #[serde(rename = "6")]
    Six,
    #[serde(rename = "7")]
    Seven,
    #[serde(rename = "8")]
    Eight,
    #[serde(rename = "9")]
    Nine,
}

/// Level -> numeric midpoint used for averaging
const SCORE_MIDPOINTS: [(Score, f64); 9] = [
    (Score::One, 1.0),
    (Score::Two, 2.0),
    (Score::Three, 3.0),
    (Score::Four, 4.0),
    (Score::Five, 5.0),
    (Score::Six, 6.0),
    (Score::Seven, 7.0),
    (Score::Eight, 8.0),
    (Score::Nine, 9.0),
];

impl Score {
    /// Numeric midpoint, `None` for the sentinel
    #[must_use]
    pub fn midpoint(self) -> Option<f64> {
        SCORE_MIDPOINTS
            .iter()
            .find(|(level, _)| *level == self)
            .map(|(_, value)| *value)
    }

    /// Nearest level to a numeric value; halfway values round up
    #[must_use]
    pub fn nearest(value: f64) -> Self {
        let mut best = SCORE_MIDPOINTS[0];
        for candidate in SCORE_MIDPOINTS {
            if (candidate.1 - value).abs() <= (best.1 - value).abs() {
                best = candidate;
            }
        }
        best.0
    }

    /// Level from its digit (1-9)
    #[must_use]
    pub fn from_digit(digit: u8) -> Option<Self> {
        SCORE_MIDPOINTS
            .get(usize::from(digit).checked_sub(1)?)
            .map(|(level, _)| *level)
    }

    #[inline]
    #[must_use]
    pub fn is_scored(self) -> bool {
        self != Self::Unscored
    }
}

/// Whose scores are being read: a username or the playground identity
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Perspective(pub String);

impl Perspective {
    /// Reserved identity for unauthenticated playground sessions
    pub const PLAYGROUND: &'static str = "playground";

    #[inline]
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        Self(username.into())
    }

    #[inline]
    #[must_use]
    pub fn playground() -> Self {
        Self(Self::PLAYGROUND.to_string())
    }

    #[inline]
    #[must_use]
    pub fn is_playground(&self) -> bool {
        self.0 == Self::PLAYGROUND
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Perspective {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Scores keyed by (username, graph part)
///
/// Unscored parts are absent rather than stored as the sentinel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserScores(BTreeMap<Perspective, BTreeMap<GraphPartId, Score>>);

impl UserScores {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Score a perspective gave a part (sentinel if absent)
    #[must_use]
    pub fn get(&self, perspective: &Perspective, part: GraphPartId) -> Score {
        self.0
            .get(perspective)
            .and_then(|scores| scores.get(&part))
            .copied()
            .unwrap_or_default()
    }

    /// Set a score; the sentinel removes the entry
    pub fn set(&mut self, perspective: Perspective, part: GraphPartId, score: Score) {
        if score.is_scored() {
            self.0.entry(perspective).or_default().insert(part, score);
            return;
        }
        if let Some(scores) = self.0.get_mut(&perspective) {
            scores.remove(&part);
            if scores.is_empty() {
                self.0.remove(&perspective);
            }
        }
    }

    /// Drop every score for `part` (part deleted)
    pub fn remove_part(&mut self, part: GraphPartId) {
        for scores in self.0.values_mut() {
            scores.remove(&part);
        }
        self.0.retain(|_, scores| !scores.is_empty());
    }

    /// Flat (perspective, part, score) triples in key order
    pub fn iter(&self) -> impl Iterator<Item = (&Perspective, GraphPartId, Score)> + '_ {
        self.0.iter().flat_map(|(perspective, scores)| {
            scores
                .iter()
                .map(move |(part, score)| (perspective, *part, *score))
        })
    }

    /// Perspectives that scored anything
    pub fn perspectives(&self) -> impl Iterator<Item = &Perspective> + '_ {
        self.0.keys()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// How perspectives are merged into one display score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AggregationMode {
    /// First perspective's value, unchanged
    Single,
    /// Mean of scored perspectives, rounded to the nearest level
    #[default]
    Average,
    /// Scores suppressed
    None,
}

/// Merge per-perspective scores into one display score per part
///
/// Pure: inputs are untouched and a fresh map is returned.
#[must_use]
pub fn get_display_scores(
    part_ids: &[GraphPartId],
    perspectives: &[Perspective],
    user_scores: &UserScores,
    mode: AggregationMode,
) -> BTreeMap<GraphPartId, Score> {
    part_ids
        .iter()
        .map(|part| {
            let score = match mode {
                AggregationMode::None => Score::Unscored,
                AggregationMode::Single => perspectives
                    .first()
                    .map(|perspective| user_scores.get(perspective, *part))
                    .unwrap_or_default(),
                AggregationMode::Average => average(
                    perspectives
                        .iter()
                        .map(|perspective| user_scores.get(perspective, *part)),
                ),
            };
            (*part, score)
        })
        .collect()
}

fn average(scores: impl Iterator<Item = Score>) -> Score {
    let values: Vec<f64> = scores.filter_map(Score::midpoint).collect();
    if values.is_empty() {
        return Score::Unscored;
    }
    #[allow(clippy::cast_precision_loss)]
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    Score::nearest(mean)
}
