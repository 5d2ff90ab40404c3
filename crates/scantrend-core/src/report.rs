//! Dashboard payload types.
//!
//! Field names serialize in camelCase, which is what the dashboard reads.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::{EvaluationWindow, Goal, Reflection};
use crate::notable::{NotableKind, NotableStudent};
use crate::statistics::DistributionBucket;

/// Identifies one window in a payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRef {
    pub id: String,
    pub label: String,
    pub date: NaiveDate,
}

impl From<&EvaluationWindow> for ScanRef {
    fn from(window: &EvaluationWindow) -> Self {
        Self {
            id: window.id.clone(),
            label: window.title.clone(),
            date: window.start_date,
        }
    }
}

/// Class average for one category in one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryAverage {
    pub category_id: String,
    pub category_name: String,
    pub average: Option<f64>,
}

/// Statistics for one window, used for the scan-history chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSummary {
    pub window_id: String,
    pub label: String,
    pub date: NaiveDate,
    pub overall_average: Option<f64>,
    pub median: Option<f64>,
    pub p10: Option<f64>,
    pub p25: Option<f64>,
    pub p75: Option<f64>,
    pub p90: Option<f64>,
    pub category_averages: Vec<CategoryAverage>,
}

/// Current-window summary of one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    pub category_id: String,
    pub category_name: String,
    pub average_score: Option<f64>,
    pub previous_average: Option<f64>,
    pub trend_delta: Option<f64>,
    pub students_assessed: usize,
    pub low_score_count: usize,
    pub strong_growth_count: usize,
    pub decline_count: usize,
}

/// One student's row in the category heatmap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapRow {
    pub student_id: String,
    pub student_name: String,
    pub class_name: String,
    pub category_scores: BTreeMap<String, Option<f64>>,
    pub overall_average: Option<f64>,
    pub overall_delta: Option<f64>,
}

/// The dashboard overview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewPayload {
    pub current_scan: Option<ScanRef>,
    pub previous_scan: Option<ScanRef>,
    pub class_average_score: Option<f64>,
    pub class_trend_delta: Option<f64>,
    pub students_improved: usize,
    pub students_declined: usize,
    pub total_students: usize,
    pub category_summaries: Vec<CategorySummary>,
    /// Oldest first.
    pub scans: Vec<ScanSummary>,
    pub heatmap_rows: Vec<HeatmapRow>,
    pub notable_students: Vec<NotableStudent>,
}

impl OverviewPayload {
    /// The payload for a course with no windows.
    pub fn empty() -> Self {
        Self {
            current_scan: None,
            previous_scan: None,
            class_average_score: None,
            class_trend_delta: None,
            students_improved: 0,
            students_declined: 0,
            total_students: 0,
            category_summaries: Vec::new(),
            scans: Vec::new(),
            heatmap_rows: Vec::new(),
            notable_students: Vec::new(),
        }
    }

    /// Save the payload as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize overview")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write overview to {}", path.display()))?;
        Ok(())
    }
}

/// A student at risk in one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskStudent {
    pub student_id: String,
    pub student_name: String,
    pub class_name: String,
    pub average: Option<f64>,
    pub delta: Option<f64>,
    pub reasons: Vec<NotableKind>,
}

/// Drill-down view of one category in the current window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDetail {
    pub category: CategorySummary,
    pub score_distribution: Vec<DistributionBucket>,
    pub risk_students: Vec<RiskStudent>,
}

/// A student's score in one category, used for strongest/weakest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryScore {
    pub category_id: String,
    pub category_name: String,
    pub average: f64,
}

/// One row of the students table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
    pub student_id: String,
    pub student_name: String,
    pub class_name: String,
    pub overall_average: Option<f64>,
    pub overall_delta: Option<f64>,
    pub strongest_category: Option<CategoryScore>,
    pub weakest_category: Option<CategoryScore>,
    pub flags: Vec<NotableKind>,
}

/// One student's category averages in one scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentScanScores {
    pub scan_id: String,
    pub scan_label: String,
    pub scan_date: NaiveDate,
    pub overall_average: Option<f64>,
    pub category_scores: Vec<CategoryAverage>,
}

/// A student's per-scan history, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentHistory {
    pub student_id: String,
    pub scans: Vec<StudentScanScores>,
}

/// Goals and reflections of one student in one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentFeedback {
    pub student_id: String,
    pub goals: Vec<Goal>,
    pub reflections: Vec<Reflection>,
}

/// Goals and reflections of one window, grouped by student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanFeedback {
    pub window_id: String,
    pub students: Vec<StudentFeedback>,
}

impl ScanFeedback {
    /// Group goals and reflections by student, keeping each list's order.
    pub fn group(window_id: &str, goals: Vec<Goal>, reflections: Vec<Reflection>) -> Self {
        let mut by_student: BTreeMap<String, StudentFeedback> = BTreeMap::new();
        for goal in goals {
            by_student
                .entry(goal.student_id.clone())
                .or_insert_with(|| StudentFeedback::new(&goal.student_id))
                .goals
                .push(goal);
        }
        for reflection in reflections {
            by_student
                .entry(reflection.student_id.clone())
                .or_insert_with(|| StudentFeedback::new(&reflection.student_id))
                .reflections
                .push(reflection);
        }
        Self {
            window_id: window_id.to_string(),
            students: by_student.into_values().collect(),
        }
    }
}

impl StudentFeedback {
    fn new(student_id: &str) -> Self {
        Self {
            student_id: student_id.to_string(),
            goals: Vec::new(),
            reflections: Vec::new(),
        }
    }
}
