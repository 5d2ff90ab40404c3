//! Per-student, per-category averaging of a window's score matrix.
//!
//! A student's category average is the mean of that student's non-null
//! competency scores in the category. Class-level category averages are means
//! of those per-student averages, never a flat mean of raw cells.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{EvaluationWindow, Heatmap};
use crate::statistics::{mean, mean_present};

/// A category as it appears in one window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: String,
    pub name: String,
}

/// A competency score that could not be attributed to a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeIssue {
    /// The competency carries no category mapping.
    Uncategorized { competency_id: String },
    /// A row scores a competency the window does not list.
    UnknownCompetency {
        student_id: String,
        competency_id: String,
    },
}

impl fmt::Display for ShapeIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeIssue::Uncategorized { competency_id } => {
                write!(f, "competency '{competency_id}' has no category mapping")
            }
            ShapeIssue::UnknownCompetency {
                student_id,
                competency_id,
            } => write!(
                f,
                "student '{student_id}' has a score for unknown competency '{competency_id}'"
            ),
        }
    }
}

/// One student's category averages for one window.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentCategories {
    pub student_id: String,
    pub student_name: String,
    pub class_name: String,
    /// Category id → average. Every window category is present.
    pub averages: BTreeMap<String, Option<f64>>,
}

impl StudentCategories {
    pub fn average(&self, category_id: &str) -> Option<f64> {
        self.averages.get(category_id).copied().flatten()
    }

    /// Mean of the student's non-null category averages.
    pub fn overall_average(&self) -> Option<f64> {
        mean_present(self.averages.values())
    }
}

/// CategoryAggregator output for one window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowAggregate {
    pub window: EvaluationWindow,
    /// Categories in order of first appearance in the competency list.
    pub categories: Vec<CategoryRef>,
    pub students: BTreeMap<String, StudentCategories>,
    pub issues: Vec<ShapeIssue>,
}

impl WindowAggregate {
    pub fn category(&self, category_id: &str) -> Option<&CategoryRef> {
        self.categories.iter().find(|c| c.id == category_id)
    }

    /// Mean of the students' non-null averages in one category.
    pub fn category_average(&self, category_id: &str) -> Option<f64> {
        mean(self.students.values().filter_map(|s| s.average(category_id)))
    }

    /// Number of students with a non-null average in one category.
    pub fn students_assessed(&self, category_id: &str) -> usize {
        self.students
            .values()
            .filter(|s| s.average(category_id).is_some())
            .count()
    }

    /// Mean of every non-null student category average in the window.
    pub fn class_average(&self) -> Option<f64> {
        mean(
            self.students
                .values()
                .flat_map(|s| s.averages.values().filter_map(|v| *v)),
        )
    }
}

/// Aggregate a window's score matrix into per-student category averages.
///
/// Scores that cannot be attributed to a category are left out and reported
/// in [`WindowAggregate::issues`].
pub fn aggregate_window(window: &EvaluationWindow, heatmap: &Heatmap) -> WindowAggregate {
    let mut categories: Vec<CategoryRef> = Vec::new();
    let mut competency_category: HashMap<&str, Option<&str>> = HashMap::new();
    let mut issues = Vec::new();

    for competency in &heatmap.competencies {
        let category_id = competency
            .category_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty());
        match category_id {
            Some(id) => {
                if !categories.iter().any(|c| c.id == id) {
                    categories.push(CategoryRef {
                        id: id.to_string(),
                        name: competency
                            .category_name
                            .clone()
                            .unwrap_or_else(|| id.to_string()),
                    });
                }
            }
            None => issues.push(ShapeIssue::Uncategorized {
                competency_id: competency.id.clone(),
            }),
        }
        competency_category.insert(competency.id.as_str(), category_id);
    }

    let mut students = BTreeMap::new();
    for row in &heatmap.rows {
        let mut scored: HashMap<&str, Vec<f64>> = HashMap::new();
        for (competency_id, score) in &row.scores {
            match competency_category.get(competency_id.as_str()) {
                Some(Some(category_id)) => {
                    if let Some(score) = score {
                        scored.entry(*category_id).or_default().push(*score);
                    }
                }
                Some(None) => {}
                None => {
                    if score.is_some() {
                        issues.push(ShapeIssue::UnknownCompetency {
                            student_id: row.student_id.clone(),
                            competency_id: competency_id.clone(),
                        });
                    }
                }
            }
        }

        let averages = categories
            .iter()
            .map(|c| {
                let average = scored
                    .get(c.id.as_str())
                    .and_then(|scores| mean(scores.iter().copied()));
                (c.id.clone(), average)
            })
            .collect();

        students.insert(
            row.student_id.clone(),
            StudentCategories {
                student_id: row.student_id.clone(),
                student_name: row.student_name.clone(),
                class_name: row.class_name.clone(),
                averages,
            },
        );
    }

    for issue in &issues {
        tracing::warn!(window = %window.id, "excluded from category aggregation: {issue}");
    }

    WindowAggregate {
        window: window.clone(),
        categories,
        students,
        issues,
    }
}
