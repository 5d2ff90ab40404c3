//! Score source that serves a JSON snapshot file.
//!
//! Useful for demos, offline analysis and tests. The file holds the window
//! list and every window's score matrix:
//!
//! ```json
//! {
//!   "windows": [{"id": "w1", "title": "Fall", "start_date": "2024-09-02"}],
//!   "heatmaps": {"w1": {"competencies": [], "rows": []}},
//!   "goals": {"w1": []},
//!   "reflections": {"w1": []}
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use scantrend_core::model::{EvaluationWindow, Goal, Heatmap, Reflection};
use scantrend_core::traits::ScoreSource;

use crate::error::SourceError;

/// Everything a score source can serve, captured at one point in time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub windows: Vec<EvaluationWindow>,
    #[serde(default)]
    pub heatmaps: HashMap<String, Heatmap>,
    #[serde(default)]
    pub goals: HashMap<String, Vec<Goal>>,
    #[serde(default)]
    pub reflections: HashMap<String, Vec<Reflection>>,
}

impl Snapshot {
    /// Load a snapshot from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read snapshot: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("failed to parse snapshot: {}", path.display()))
    }

    /// Parse a snapshot from a JSON string.
    pub fn parse(content: &str) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_str(content)?;
        Ok(snapshot)
    }

    /// Structural problems a source would not catch on its own.
    pub fn lint(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        for window in &self.windows {
            if !self.heatmaps.contains_key(&window.id) {
                warnings.push(format!("window '{}' has no heatmap", window.id));
            }
        }
        let mut orphans: Vec<&String> = self
            .heatmaps
            .keys()
            .filter(|id| !self.windows.iter().any(|w| &w.id == *id))
            .collect();
        orphans.sort();
        for id in orphans {
            warnings.push(format!("heatmap '{id}' does not belong to any window"));
        }
        warnings
    }
}

/// A [`ScoreSource`] over an in-memory [`Snapshot`].
#[derive(Debug)]
pub struct SnapshotSource {
    snapshot: Snapshot,
}

impl SnapshotSource {
    pub fn new(snapshot: Snapshot) -> Self {
        Self { snapshot }
    }

    /// Read the snapshot file once; later calls serve the in-memory copy.
    pub fn from_path(path: &Path) -> Result<Self> {
        Ok(Self::new(Snapshot::load(path)?))
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }
}

#[async_trait]
impl ScoreSource for SnapshotSource {
    fn name(&self) -> &str {
        "snapshot"
    }

    async fn list_windows(&self, course_id: Option<&str>) -> anyhow::Result<Vec<EvaluationWindow>> {
        Ok(self
            .snapshot
            .windows
            .iter()
            .filter(|w| course_id.is_none() || w.course_id.as_deref() == course_id)
            .cloned()
            .collect())
    }

    async fn get_heatmap(&self, window_id: &str) -> anyhow::Result<Heatmap> {
        self.snapshot
            .heatmaps
            .get(window_id)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(format!("heatmap for window '{window_id}'")).into())
    }

    async fn get_goals(&self, window_id: &str) -> anyhow::Result<Vec<Goal>> {
        Ok(self.snapshot.goals.get(window_id).cloned().unwrap_or_default())
    }

    async fn get_reflections(&self, window_id: &str) -> anyhow::Result<Vec<Reflection>> {
        Ok(self
            .snapshot
            .reflections
            .get(window_id)
            .cloned()
            .unwrap_or_default())
    }
}
