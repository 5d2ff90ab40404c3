//! Core data model types for scantrend.
//!
//! These are the records a score source hands to the engine: evaluation
//! windows, competencies, the raw per-window score matrix, and the ancillary
//! goal/reflection lists.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ShapeError;

/// A discrete scoring period ("scan") for a cohort of students.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationWindow {
    /// Unique identifier for this window.
    pub id: String,
    /// Human-readable title, used as the chart label.
    pub title: String,
    /// When the window opened. Used as the recency key.
    pub start_date: NaiveDate,
    /// Course this window belongs to, if any.
    #[serde(default)]
    pub course_id: Option<String>,
}

/// A single assessable skill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Competency {
    pub id: String,
    pub name: String,
    /// Owning category. A competency without one cannot be attributed.
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub category_name: Option<String>,
}

/// One student's row in a window's score matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawScoreRow {
    pub student_id: String,
    pub student_name: String,
    #[serde(default)]
    pub class_name: String,
    /// Competency id → score. `None` means "not assessed", never zero.
    #[serde(default)]
    pub scores: BTreeMap<String, Option<f64>>,
}

/// The raw per-student, per-competency score matrix for one window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Heatmap {
    #[serde(default)]
    pub competencies: Vec<Competency>,
    #[serde(default)]
    pub rows: Vec<RawScoreRow>,
}

impl Heatmap {
    /// Check the matrix against the score scale before it enters aggregation.
    pub fn validate(&self, scale: &ScoreScale) -> Result<(), ShapeError> {
        let mut competency_ids = HashSet::new();
        for competency in &self.competencies {
            if !competency_ids.insert(competency.id.as_str()) {
                return Err(ShapeError::DuplicateCompetency(competency.id.clone()));
            }
        }

        let mut student_ids = HashSet::new();
        for row in &self.rows {
            if !student_ids.insert(row.student_id.as_str()) {
                return Err(ShapeError::DuplicateStudent(row.student_id.clone()));
            }
            for (competency_id, score) in &row.scores {
                let Some(score) = *score else { continue };
                if !score.is_finite() {
                    return Err(ShapeError::NonFiniteScore {
                        student_id: row.student_id.clone(),
                        competency_id: competency_id.clone(),
                    });
                }
                if !scale.contains(score) {
                    return Err(ShapeError::OutOfScale {
                        student_id: row.student_id.clone(),
                        competency_id: competency_id.clone(),
                        score,
                        min: scale.min,
                        max: scale.max,
                    });
                }
            }
        }
        Ok(())
    }

    /// Drop every row that does not belong to `class_name`.
    pub fn retain_class(&mut self, class_name: &str) {
        self.rows.retain(|row| row.class_name == class_name);
    }

    /// Every non-null score in the matrix, in row order.
    pub fn score_population(&self) -> Vec<f64> {
        self.rows
            .iter()
            .flat_map(|row| row.scores.values().filter_map(|s| *s))
            .collect()
    }
}

/// A student goal attached to a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub student_id: String,
    #[serde(default)]
    pub competency_id: Option<String>,
    pub text: String,
    #[serde(default)]
    pub created_at: Option<NaiveDate>,
}

/// A student reflection attached to a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reflection {
    pub id: String,
    pub student_id: String,
    pub text: String,
    #[serde(default)]
    pub created_at: Option<NaiveDate>,
}

/// The bounded numeric scale scores are recorded on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreScale {
    #[serde(default = "default_scale_min")]
    pub min: f64,
    #[serde(default = "default_scale_max")]
    pub max: f64,
}

fn default_scale_min() -> f64 {
    1.0
}

fn default_scale_max() -> f64 {
    5.0
}

impl Default for ScoreScale {
    fn default() -> Self {
        Self {
            min: default_scale_min(),
            max: default_scale_max(),
        }
    }
}

impl ScoreScale {
    pub fn contains(&self, score: f64) -> bool {
        score >= self.min && score <= self.max
    }

    /// Integer histogram buckets covered by this scale (1..=5 by default).
    pub fn buckets(&self) -> std::ops::RangeInclusive<i64> {
        (self.min.round() as i64)..=(self.max.round() as i64)
    }

    /// Round a score to its integer bucket, clamped into the scale.
    pub fn bucket_of(&self, score: f64) -> i64 {
        let buckets = self.buckets();
        (score.round() as i64).clamp(*buckets.start(), *buckets.end())
    }
}

/// Thresholds used to flag students and count improvements.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// A current category average strictly below this is a `low_score`.
    #[serde(default = "default_low_score")]
    pub low_score: f64,
    /// A category delta strictly above this is `strong_growth`.
    #[serde(default = "default_swing")]
    pub strong_growth: f64,
    /// A category delta strictly below the negation of this is a `decline`.
    #[serde(default = "default_swing")]
    pub decline: f64,
    /// Overall-average change that counts a student as improved/declined.
    #[serde(default = "default_improvement")]
    pub improvement: f64,
}

fn default_low_score() -> f64 {
    2.5
}

fn default_swing() -> f64 {
    0.5
}

fn default_improvement() -> f64 {
    0.1
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            low_score: default_low_score(),
            strong_growth: default_swing(),
            decline: default_swing(),
            improvement: default_improvement(),
        }
    }
}

/// How many of the most recent windows to include in the scan history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ScanRange {
    Last(usize),
    All,
}

impl Default for ScanRange {
    fn default() -> Self {
        ScanRange::Last(3)
    }
}

impl ScanRange {
    /// Number of windows to take out of `available`.
    pub fn span(&self, available: usize) -> usize {
        match self {
            ScanRange::Last(n) => (*n).min(available),
            ScanRange::All => available,
        }
    }
}

impl fmt::Display for ScanRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanRange::Last(n) => write!(f, "last_{n}"),
            ScanRange::All => write!(f, "all"),
        }
    }
}

impl FromStr for ScanRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        if lower == "all" {
            return Ok(ScanRange::All);
        }
        match lower.strip_prefix("last_").map(str::parse::<usize>) {
            Some(Ok(n)) if n >= 1 => Ok(ScanRange::Last(n)),
            _ => Err(format!("unknown scan range: {s}")),
        }
    }
}

impl TryFrom<String> for ScanRange {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ScanRange> for String {
    fn from(range: ScanRange) -> Self {
        range.to_string()
    }
}

/// Caller-selected filters shared by the dashboard operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverviewFilters {
    #[serde(default)]
    pub course_id: Option<String>,
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub range: ScanRange,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(student: &str, class: &str, scores: &[(&str, Option<f64>)]) -> RawScoreRow {
        RawScoreRow {
            student_id: student.into(),
            student_name: student.to_uppercase(),
            class_name: class.into(),
            scores: scores.iter().map(|(c, s)| (c.to_string(), *s)).collect(),
        }
    }

    #[test]
    fn scan_range_display_and_parse() {
        assert_eq!("last_3".parse::<ScanRange>().unwrap(), ScanRange::Last(3));
        assert_eq!("LAST_5".parse::<ScanRange>().unwrap(), ScanRange::Last(5));
        assert_eq!("all".parse::<ScanRange>().unwrap(), ScanRange::All);
        assert_eq!(ScanRange::Last(7).to_string(), "last_7");
        assert!("last_0".parse::<ScanRange>().is_err());
        assert!("recent".parse::<ScanRange>().is_err());
        assert_eq!(ScanRange::default(), ScanRange::Last(3));
    }

    #[test]
    fn scan_range_span_is_capped() {
        assert_eq!(ScanRange::Last(5).span(2), 2);
        assert_eq!(ScanRange::Last(3).span(10), 3);
        assert_eq!(ScanRange::All.span(10), 10);
    }

    #[test]
    fn filters_deserialize_range_from_string() {
        let filters: OverviewFilters =
            serde_json::from_str(r#"{"course_id": "c1", "range": "last_5"}"#).unwrap();
        assert_eq!(filters.range, ScanRange::Last(5));
        assert_eq!(filters.course_id.as_deref(), Some("c1"));
        assert!(serde_json::from_str::<OverviewFilters>(r#"{"range": "soon"}"#).is_err());
    }

    #[test]
    fn scale_buckets_round_and_clamp() {
        let scale = ScoreScale::default();
        assert_eq!(scale.buckets(), 1..=5);
        assert_eq!(scale.bucket_of(2.4), 2);
        assert_eq!(scale.bucket_of(2.5), 3);
        assert_eq!(scale.bucket_of(5.0), 5);
        assert_eq!(scale.bucket_of(0.2), 1);
    }

    #[test]
    fn validate_rejects_out_of_scale() {
        let heatmap = Heatmap {
            competencies: vec![],
            rows: vec![row("s1", "A", &[("c1", Some(7.0))])],
        };
        let err = heatmap.validate(&ScoreScale::default()).unwrap_err();
        assert!(matches!(err, ShapeError::OutOfScale { .. }));
    }

    #[test]
    fn validate_rejects_nan_and_duplicates() {
        let nan = Heatmap {
            competencies: vec![],
            rows: vec![row("s1", "A", &[("c1", Some(f64::NAN))])],
        };
        assert!(matches!(
            nan.validate(&ScoreScale::default()),
            Err(ShapeError::NonFiniteScore { .. })
        ));

        let dup = Heatmap {
            competencies: vec![],
            rows: vec![row("s1", "A", &[]), row("s1", "B", &[])],
        };
        assert!(matches!(
            dup.validate(&ScoreScale::default()),
            Err(ShapeError::DuplicateStudent(id)) if id == "s1"
        ));
    }

    #[test]
    fn validate_accepts_nulls() {
        let heatmap = Heatmap {
            competencies: vec![],
            rows: vec![row("s1", "A", &[("c1", None), ("c2", Some(3.0))])],
        };
        assert!(heatmap.validate(&ScoreScale::default()).is_ok());
        assert_eq!(heatmap.score_population(), vec![3.0]);
    }

    #[test]
    fn retain_class_filters_rows() {
        let mut heatmap = Heatmap {
            competencies: vec![],
            rows: vec![row("s1", "A", &[]), row("s2", "B", &[])],
        };
        heatmap.retain_class("B");
        assert_eq!(heatmap.rows.len(), 1);
        assert_eq!(heatmap.rows[0].student_id, "s2");
    }
}
