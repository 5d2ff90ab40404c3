//! Inter-window trend deltas.
//!
//! Deltas are only reported where both windows have a value. A missing side
//! yields `None`, never a zero.

use std::collections::BTreeMap;

use crate::aggregate::WindowAggregate;
use crate::statistics::mean;

/// TrendCalculator output for a current/previous window pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrendReport {
    /// Category delta keyed by `(student_id, category_id)`, one entry per
    /// current-window student and category.
    pub deltas: BTreeMap<(String, String), Option<f64>>,
    /// Change in overall (cross-category) average per student.
    pub overall_deltas: BTreeMap<String, Option<f64>>,
    /// Class-level delta over categories comparable in both windows.
    pub class_delta: Option<f64>,
    pub students_improved: usize,
    pub students_declined: usize,
}

impl TrendReport {
    pub fn delta(&self, student_id: &str, category_id: &str) -> Option<f64> {
        self.deltas
            .get(&(student_id.to_string(), category_id.to_string()))
            .copied()
            .flatten()
    }

    pub fn overall_delta(&self, student_id: &str) -> Option<f64> {
        self.overall_deltas.get(student_id).copied().flatten()
    }
}

/// `current - previous` when both are present.
pub fn delta(current: Option<f64>, previous: Option<f64>) -> Option<f64> {
    Some(current? - previous?)
}

/// Compare the current window against the one before it.
///
/// `improvement` is the overall-average change a student must exceed to be
/// counted as improved (or fall below the negation of, to be counted as
/// declined).
pub fn compare(
    current: &WindowAggregate,
    previous: Option<&WindowAggregate>,
    improvement: f64,
) -> TrendReport {
    let mut report = TrendReport::default();

    for (student_id, student) in &current.students {
        let before = previous.and_then(|p| p.students.get(student_id));
        for category in &current.categories {
            report.deltas.insert(
                (student_id.clone(), category.id.clone()),
                delta(
                    student.average(&category.id),
                    before.and_then(|b| b.average(&category.id)),
                ),
            );
        }

        let overall = delta(
            student.overall_average(),
            before.and_then(|b| b.overall_average()),
        );
        match overall {
            Some(d) if d > improvement => report.students_improved += 1,
            Some(d) if d < -improvement => report.students_declined += 1,
            _ => {}
        }
        report.overall_deltas.insert(student_id.clone(), overall);
    }

    report.class_delta = previous.and_then(|previous| class_delta(current, previous));
    report
}

/// Mean of current category averages minus mean of previous ones, over the
/// categories that have a value in both windows.
fn class_delta(current: &WindowAggregate, previous: &WindowAggregate) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = current
        .categories
        .iter()
        .filter_map(|c| {
            Some((
                current.category_average(&c.id)?,
                previous.category_average(&c.id)?,
            ))
        })
        .collect();
    Some(mean(pairs.iter().map(|p| p.0))? - mean(pairs.iter().map(|p| p.1))?)
}
