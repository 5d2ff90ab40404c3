//! The read-side collaborator the engine pulls score data from.
//!
//! Implemented by the `scantrend-sources` crate (HTTP API, snapshot file,
//! scripted mock).

use async_trait::async_trait;

use crate::model::{EvaluationWindow, Goal, Heatmap, Reflection};

/// Supplies evaluation windows and their raw score matrices.
///
/// Implementations are read-only. They may return windows in any order; the
/// engine sorts by recency itself.
#[async_trait]
pub trait ScoreSource: Send + Sync {
    /// Human-readable source name (e.g. "http").
    fn name(&self) -> &str;

    /// List the evaluation windows, optionally restricted to one course.
    async fn list_windows(&self, course_id: Option<&str>) -> anyhow::Result<Vec<EvaluationWindow>>;

    /// Fetch the raw score matrix for one window.
    async fn get_heatmap(&self, window_id: &str) -> anyhow::Result<Heatmap>;

    /// Fetch the goals recorded during one window.
    async fn get_goals(&self, window_id: &str) -> anyhow::Result<Vec<Goal>>;

    /// Fetch the reflections recorded during one window.
    async fn get_reflections(&self, window_id: &str) -> anyhow::Result<Vec<Reflection>>;
}
