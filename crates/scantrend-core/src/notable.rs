//! Threshold rules that flag individual students.
//!
//! Each rule is evaluated independently per student and category, so one
//! student may carry several flags.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::aggregate::WindowAggregate;
use crate::model::Thresholds;
use crate::trend::TrendReport;

/// Why a student was flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotableKind {
    LowScore,
    StrongGrowth,
    Decline,
}

impl fmt::Display for NotableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotableKind::LowScore => write!(f, "low_score"),
            NotableKind::StrongGrowth => write!(f, "strong_growth"),
            NotableKind::Decline => write!(f, "decline"),
        }
    }
}

/// A flagged observation about one student in one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotableStudent {
    pub student_id: String,
    pub student_name: String,
    pub class_name: String,
    #[serde(rename = "type")]
    pub kind: NotableKind,
    pub category_id: String,
    pub category: String,
    /// Current category average.
    pub score: Option<f64>,
    pub delta: Option<f64>,
}

/// Which rules a single (average, delta) pair trips, in a fixed order.
pub fn classify(average: Option<f64>, delta: Option<f64>, thresholds: &Thresholds) -> Vec<NotableKind> {
    let mut kinds = Vec::new();
    if average.is_some_and(|a| a < thresholds.low_score) {
        kinds.push(NotableKind::LowScore);
    }
    if let Some(d) = delta {
        if d > thresholds.strong_growth {
            kinds.push(NotableKind::StrongGrowth);
        }
        if d < -thresholds.decline {
            kinds.push(NotableKind::Decline);
        }
    }
    kinds
}

/// Flag students in the current window.
///
/// Output is ordered by student id, then category order, then rule.
pub fn detect(
    current: &WindowAggregate,
    trend: &TrendReport,
    thresholds: &Thresholds,
) -> Vec<NotableStudent> {
    let mut flagged = Vec::new();
    for (student_id, student) in &current.students {
        for category in &current.categories {
            let score = student.average(&category.id);
            let delta = trend.delta(student_id, &category.id);
            for kind in classify(score, delta, thresholds) {
                flagged.push(NotableStudent {
                    student_id: student_id.clone(),
                    student_name: student.student_name.clone(),
                    class_name: student.class_name.clone(),
                    kind,
                    category_id: category.id.clone(),
                    category: category.name.clone(),
                    score,
                    delta,
                });
            }
        }
    }
    flagged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate_window;
    use crate::model::{Competency, EvaluationWindow, Heatmap, RawScoreRow};
    use crate::trend::compare;
    use chrono::NaiveDate;

    fn aggregate(id: &str, scores: &[(&str, Option<f64>)]) -> WindowAggregate {
        let window = EvaluationWindow {
            id: id.into(),
            title: id.into(),
            start_date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            course_id: None,
        };
        let competencies = ["compA", "compB"]
            .iter()
            .zip(["cat1", "cat2"])
            .map(|(id, cat)| Competency {
                id: id.to_string(),
                name: id.to_string(),
                category_id: Some(cat.into()),
                category_name: Some(cat.to_uppercase()),
            })
            .collect();
        let heatmap = Heatmap {
            competencies,
            rows: vec![RawScoreRow {
                student_id: "student1".into(),
                student_name: "Student One".into(),
                class_name: "7A".into(),
                scores: scores.iter().map(|(c, s)| (c.to_string(), *s)).collect(),
            }],
        };
        aggregate_window(&window, &heatmap)
    }

    #[test]
    fn classify_boundaries_are_strict() {
        let t = Thresholds::default();
        assert!(classify(Some(2.5), None, &t).is_empty());
        assert_eq!(classify(Some(2.49), None, &t), vec![NotableKind::LowScore]);
        assert!(classify(Some(3.0), Some(0.5), &t).is_empty());
        assert!(classify(Some(3.0), Some(-0.5), &t).is_empty());
        assert_eq!(classify(Some(3.0), Some(0.51), &t), vec![NotableKind::StrongGrowth]);
        assert_eq!(classify(Some(3.0), Some(-0.51), &t), vec![NotableKind::Decline]);
        assert!(classify(None, None, &t).is_empty());
    }

    #[test]
    fn low_score_is_independent_of_trend() {
        let t = Thresholds::default();
        assert_eq!(
            classify(Some(2.0), Some(1.0), &t),
            vec![NotableKind::LowScore, NotableKind::StrongGrowth]
        );
    }

    #[test]
    fn strong_growth_scenario() {
        let current = aggregate("w1", &[("compA", Some(2.0)), ("compB", Some(4.0))]);
        let previous = aggregate("w0", &[("compA", Some(1.0)), ("compB", Some(4.0))]);
        let trend = compare(&current, Some(&previous), 0.1);
        let flagged = detect(&current, &trend, &Thresholds::default());

        // cat1 average 2.0 is also below the low-score line.
        let kinds: Vec<(&str, NotableKind)> = flagged
            .iter()
            .map(|n| (n.category_id.as_str(), n.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("cat1", NotableKind::LowScore),
                ("cat1", NotableKind::StrongGrowth)
            ]
        );
        assert_eq!(flagged[1].delta, Some(1.0));
        assert!(flagged.iter().all(|n| n.category_id != "cat2"));
    }

    #[test]
    fn decline_needs_both_windows() {
        let current = aggregate("w1", &[("compA", Some(3.0))]);
        let trend = compare(&current, None, 0.1);
        assert!(detect(&current, &trend, &Thresholds::default()).is_empty());

        let previous = aggregate("w0", &[("compA", Some(4.0))]);
        let trend = compare(&current, Some(&previous), 0.1);
        let flagged = detect(&current, &trend, &Thresholds::default());
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].kind, NotableKind::Decline);
    }

    #[test]
    fn serializes_kind_as_type() {
        let n = NotableStudent {
            student_id: "s1".into(),
            student_name: "S".into(),
            class_name: "7A".into(),
            kind: NotableKind::StrongGrowth,
            category_id: "c".into(),
            category: "C".into(),
            score: Some(3.0),
            delta: Some(0.75),
        };
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["type"], "strong_growth");
        assert_eq!(json["studentId"], "s1");
    }
}
