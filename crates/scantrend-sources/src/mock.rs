//! Mock source for testing.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use scantrend_core::model::{EvaluationWindow, Goal, Heatmap, Reflection};
use scantrend_core::traits::ScoreSource;

use crate::error::SourceError;

/// An in-memory score source for exercising the engine without a live API.
///
/// Failures are scripted per window; every call is counted.
#[derive(Default)]
pub struct MockSource {
    windows: Vec<EvaluationWindow>,
    heatmaps: HashMap<String, Heatmap>,
    goals: HashMap<String, Vec<Goal>>,
    reflections: HashMap<String, Vec<Reflection>>,
    /// Windows whose heatmap fetch fails with a network error.
    failing: HashSet<String>,
    /// Whether the window list itself fails.
    fail_list: bool,
    list_calls: AtomicU32,
    heatmap_calls: AtomicU32,
    /// Window ids in the order their heatmaps were requested.
    requested: Mutex<Vec<String>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a window and its score matrix.
    pub fn with_window(mut self, window: EvaluationWindow, heatmap: Heatmap) -> Self {
        self.heatmaps.insert(window.id.clone(), heatmap);
        self.windows.push(window);
        self
    }

    /// Add a window whose score matrix is missing.
    pub fn with_bare_window(mut self, window: EvaluationWindow) -> Self {
        self.windows.push(window);
        self
    }

    pub fn with_goals(mut self, window_id: &str, goals: Vec<Goal>) -> Self {
        self.goals.insert(window_id.to_string(), goals);
        self
    }

    pub fn with_reflections(mut self, window_id: &str, reflections: Vec<Reflection>) -> Self {
        self.reflections.insert(window_id.to_string(), reflections);
        self
    }

    /// Make every fetch for this window fail.
    pub fn failing(mut self, window_id: &str) -> Self {
        self.failing.insert(window_id.to_string());
        self
    }

    /// Make the window list fail.
    pub fn failing_list(mut self) -> Self {
        self.fail_list = true;
        self
    }

    /// Number of `list_windows` calls made.
    pub fn list_calls(&self) -> u32 {
        self.list_calls.load(Ordering::Relaxed)
    }

    /// Number of `get_heatmap` calls made.
    pub fn heatmap_calls(&self) -> u32 {
        self.heatmap_calls.load(Ordering::Relaxed)
    }

    /// Window ids whose heatmaps were requested, in call order.
    pub fn requested(&self) -> Vec<String> {
        self.requested
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn check(&self, window_id: &str) -> anyhow::Result<()> {
        if self.failing.contains(window_id) {
            return Err(SourceError::Network(format!("scripted failure for '{window_id}'")).into());
        }
        Ok(())
    }
}

#[async_trait]
impl ScoreSource for MockSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn list_windows(&self, course_id: Option<&str>) -> anyhow::Result<Vec<EvaluationWindow>> {
        self.list_calls.fetch_add(1, Ordering::Relaxed);
        if self.fail_list {
            return Err(SourceError::Network("scripted window list failure".into()).into());
        }
        Ok(self
            .windows
            .iter()
            .filter(|w| course_id.is_none() || w.course_id.as_deref() == course_id)
            .cloned()
            .collect())
    }

    async fn get_heatmap(&self, window_id: &str) -> anyhow::Result<Heatmap> {
        self.heatmap_calls.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut requested) = self.requested.lock() {
            requested.push(window_id.to_string());
        }
        self.check(window_id)?;
        self.heatmaps
            .get(window_id)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(format!("heatmap for window '{window_id}'")).into())
    }

    async fn get_goals(&self, window_id: &str) -> anyhow::Result<Vec<Goal>> {
        self.check(window_id)?;
        Ok(self.goals.get(window_id).cloned().unwrap_or_default())
    }

    async fn get_reflections(&self, window_id: &str) -> anyhow::Result<Vec<Reflection>> {
        self.check(window_id)?;
        Ok(self.reflections.get(window_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use chrono::NaiveDate;
    use scantrend_core::engine::{EngineConfig, OverviewEngine};
    use scantrend_core::error::OverviewError;
    use scantrend_core::model::{Competency, OverviewFilters, RawScoreRow, ScanRange};

    use super::*;

    fn window(id: &str, day: u32) -> EvaluationWindow {
        EvaluationWindow {
            id: id.into(),
            title: format!("Scan {id}"),
            start_date: NaiveDate::from_ymd_opt(2024, 9, day).unwrap(),
            course_id: None,
        }
    }

    fn heatmap(score: f64) -> Heatmap {
        Heatmap {
            competencies: vec![Competency {
                id: "c1".into(),
                name: "Plans work".into(),
                category_id: Some("org".into()),
                category_name: Some("Organizing".into()),
            }],
            rows: vec![RawScoreRow {
                student_id: "s1".into(),
                student_name: "Ana".into(),
                class_name: "7A".into(),
                scores: BTreeMap::from([("c1".to_string(), Some(score))]),
            }],
        }
    }

    fn engine(source: Arc<MockSource>) -> OverviewEngine {
        OverviewEngine::new(source, EngineConfig::default())
    }

    #[tokio::test]
    async fn counts_calls() {
        let source = MockSource::new().with_window(window("w1", 1), heatmap(3.0));
        assert_eq!(source.list_windows(None).await.unwrap().len(), 1);
        source.get_heatmap("w1").await.unwrap();
        assert!(source.get_heatmap("w2").await.is_err());
        assert_eq!(source.list_calls(), 1);
        assert_eq!(source.heatmap_calls(), 2);
        assert_eq!(source.requested(), vec!["w1", "w2"]);
    }

    #[tokio::test]
    async fn failed_previous_window_degrades_trend() {
        let source = Arc::new(
            MockSource::new()
                .with_window(window("w1", 1), heatmap(2.0))
                .with_window(window("w2", 8), heatmap(3.0))
                .with_window(window("w3", 15), heatmap(4.0))
                .failing("w2"),
        );
        let overview = engine(source.clone())
            .get_overview(&OverviewFilters::default())
            .await
            .unwrap();

        assert_eq!(overview.current_scan.unwrap().id, "w3");
        assert_eq!(overview.class_average_score, Some(4.0));
        assert_eq!(overview.class_trend_delta, None);
        let ids: Vec<&str> = overview.scans.iter().map(|s| s.window_id.as_str()).collect();
        assert_eq!(ids, vec!["w1", "w3"]);
        assert_eq!(source.list_calls(), 1);
    }

    #[tokio::test]
    async fn failed_current_window_is_fatal() {
        let source = Arc::new(
            MockSource::new()
                .with_window(window("w1", 1), heatmap(2.0))
                .with_window(window("w2", 8), heatmap(3.0))
                .failing("w2"),
        );
        let err = engine(source)
            .get_overview(&OverviewFilters::default())
            .await
            .unwrap_err();
        assert!(matches!(err, OverviewError::CurrentWindow { .. }));
        assert_eq!(err.window_id(), Some("w2"));
    }

    #[tokio::test]
    async fn failed_list_is_fatal() {
        let source = Arc::new(MockSource::new().failing_list());
        let err = engine(source)
            .get_overview(&OverviewFilters::default())
            .await
            .unwrap_err();
        assert!(matches!(err, OverviewError::WindowList { .. }));
    }

    #[tokio::test]
    async fn range_limits_fetches() {
        let source = Arc::new(
            MockSource::new()
                .with_window(window("w1", 1), heatmap(2.0))
                .with_window(window("w2", 8), heatmap(3.0))
                .with_window(window("w3", 15), heatmap(4.0))
                .with_window(window("w4", 22), heatmap(5.0)),
        );
        let filters = OverviewFilters {
            range: ScanRange::Last(2),
            ..Default::default()
        };
        let overview = engine(source.clone()).get_overview(&filters).await.unwrap();
        assert_eq!(overview.scans.len(), 2);
        assert_eq!(overview.class_trend_delta, Some(1.0));

        let mut requested = source.requested();
        requested.sort();
        requested.dedup();
        assert_eq!(requested, vec!["w3", "w4"]);
    }

    #[tokio::test]
    async fn feedback_failure_names_window() {
        let source = Arc::new(
            MockSource::new()
                .with_window(window("w1", 1), heatmap(2.0))
                .failing("w1"),
        );
        let err = engine(source).get_scan_feedback("w1").await.unwrap_err();
        assert!(matches!(err, OverviewError::Feedback { .. }));
    }

    #[tokio::test]
    async fn bare_previous_window_degrades_trend() {
        let source = Arc::new(
            MockSource::new()
                .with_window(window("w1", 1), heatmap(2.0))
                .with_bare_window(window("w2", 8))
                .with_window(window("w3", 15), heatmap(4.0)),
        );
        let err = source.get_heatmap("w2").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SourceError>(),
            Some(SourceError::NotFound(_))
        ));

        let overview = engine(source.clone())
            .get_overview(&OverviewFilters::default())
            .await
            .unwrap();
        assert_eq!(overview.current_scan.unwrap().id, "w3");
        assert_eq!(overview.class_trend_delta, None);
        assert_eq!(overview.heatmap_rows[0].overall_delta, None);
        let ids: Vec<&str> = overview.scans.iter().map(|s| s.window_id.as_str()).collect();
        assert_eq!(ids, vec!["w1", "w3"]);
    }

    #[tokio::test]
    async fn feedback_is_grouped_by_student() {
        let goal = |id: &str, student: &str| Goal {
            id: id.into(),
            student_id: student.into(),
            competency_id: Some("c1".into()),
            text: format!("goal {id}"),
            created_at: None,
        };
        let reflection = |id: &str, student: &str| Reflection {
            id: id.into(),
            student_id: student.into(),
            text: format!("reflection {id}"),
            created_at: NaiveDate::from_ymd_opt(2024, 9, 20),
        };
        let source = Arc::new(
            MockSource::new()
                .with_window(window("w1", 1), heatmap(3.0))
                .with_goals("w1", vec![goal("g1", "s2"), goal("g2", "s1"), goal("g3", "s2")])
                .with_reflections("w1", vec![reflection("r1", "s3"), reflection("r2", "s1")]),
        );

        let feedback = engine(source.clone()).get_scan_feedback("w1").await.unwrap();
        assert_eq!(feedback.window_id, "w1");
        let students: Vec<&str> = feedback
            .students
            .iter()
            .map(|s| s.student_id.as_str())
            .collect();
        assert_eq!(students, vec!["s1", "s2", "s3"]);

        let s2_goals: Vec<&str> = feedback.students[1]
            .goals
            .iter()
            .map(|g| g.id.as_str())
            .collect();
        assert_eq!(s2_goals, vec!["g1", "g3"]);
        assert!(feedback.students[1].reflections.is_empty());
        assert_eq!(feedback.students[0].goals[0].id, "g2");
        assert_eq!(feedback.students[0].reflections[0].id, "r2");
        assert!(feedback.students[2].goals.is_empty());

        let empty = engine(source).get_scan_feedback("w9").await.unwrap();
        assert!(empty.students.is_empty());
    }
}
