//! Central dashboard orchestrator.
//!
//! Pulls the window list and the score matrices a request needs from a
//! [`ScoreSource`] with bounded parallelism, then runs aggregation, trend,
//! statistics and flagging over that immutable snapshot.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use anyhow::anyhow;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;

use crate::aggregate::{aggregate_window, CategoryRef, WindowAggregate};
use crate::error::OverviewError;
use crate::model::{EvaluationWindow, Heatmap, OverviewFilters, ScoreScale, Thresholds};
use crate::notable::{classify, detect, NotableKind, NotableStudent};
use crate::report::{
    CategoryAverage, CategoryDetail, CategoryScore, CategorySummary, HeatmapRow, OverviewPayload,
    RiskStudent, ScanFeedback, ScanRef, ScanSummary, StudentHistory, StudentScanScores,
    StudentSummary,
};
use crate::statistics::{score_distribution, PopulationStats};
use crate::traits::ScoreSource;
use crate::trend::{self, compare, TrendReport};

/// Configuration for the overview engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum concurrent score-matrix fetches.
    pub parallelism: usize,
    /// Flagging and improvement thresholds.
    pub thresholds: Thresholds,
    /// Valid score range; matrices outside it are rejected.
    pub scale: ScoreScale,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallelism: 4,
            thresholds: Thresholds::default(),
            scale: ScoreScale::default(),
        }
    }
}

/// Sort windows most recent first by start date, newest id first on ties.
pub fn sort_most_recent_first(windows: &mut [EvaluationWindow]) {
    windows.sort_by(|a, b| {
        b.start_date
            .cmp(&a.start_date)
            .then_with(|| b.id.cmp(&a.id))
    });
}

/// Whether a failure on the most recent window aborts the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CurrentPolicy {
    Required,
    BestEffort,
}

struct LoadedWindow {
    aggregate: WindowAggregate,
    heatmap: Heatmap,
    population: Vec<f64>,
}

/// Aggregated windows for one request, most recent first.
///
/// A slot is `None` when that window's fetch or validation failed and the
/// failure was not fatal.
struct Snapshot {
    windows: Vec<Option<LoadedWindow>>,
}

impl Snapshot {
    fn current(&self) -> Option<&LoadedWindow> {
        self.windows.first()?.as_ref()
    }

    fn previous(&self) -> Option<&LoadedWindow> {
        self.windows.get(1)?.as_ref()
    }
}

/// Current and previous window with the derived trend and flags.
struct Analysis<'a> {
    current: &'a LoadedWindow,
    previous: Option<&'a LoadedWindow>,
    trend: TrendReport,
    notable: Vec<NotableStudent>,
}

/// The dashboard engine.
pub struct OverviewEngine {
    source: Arc<dyn ScoreSource>,
    config: EngineConfig,
}

impl OverviewEngine {
    pub fn new(source: Arc<dyn ScoreSource>, config: EngineConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Assemble the dashboard overview for the requested range.
    pub async fn get_overview(
        &self,
        filters: &OverviewFilters,
    ) -> Result<OverviewPayload, OverviewError> {
        let windows = self.ordered_windows(filters.course_id.as_deref()).await?;
        if windows.is_empty() {
            tracing::info!("no evaluation windows, returning empty overview");
            return Ok(OverviewPayload::empty());
        }

        let span = filters.range.span(windows.len());
        // The previous window is needed for trends even when the range is 1.
        let fetch = span.max(2).min(windows.len());
        let snapshot = self
            .load(
                &windows[..fetch],
                filters.class_name.as_deref(),
                CurrentPolicy::Required,
            )
            .await?;
        let Some(analysis) = self.analyze(&snapshot) else {
            return Ok(OverviewPayload::empty());
        };
        let current = &analysis.current.aggregate;

        let category_summaries = current
            .categories
            .iter()
            .map(|c| category_summary(c, &analysis))
            .collect();

        let scans = snapshot.windows[..span]
            .iter()
            .rev()
            .flatten()
            .map(scan_summary)
            .collect();

        let heatmap_rows = current
            .students
            .values()
            .map(|s| HeatmapRow {
                student_id: s.student_id.clone(),
                student_name: s.student_name.clone(),
                class_name: s.class_name.clone(),
                category_scores: s.averages.clone(),
                overall_average: s.overall_average(),
                overall_delta: analysis.trend.overall_delta(&s.student_id),
            })
            .collect();

        Ok(OverviewPayload {
            current_scan: Some(ScanRef::from(&current.window)),
            previous_scan: analysis.previous.map(|p| ScanRef::from(&p.aggregate.window)),
            class_average_score: current.class_average(),
            class_trend_delta: analysis.trend.class_delta,
            students_improved: analysis.trend.students_improved,
            students_declined: analysis.trend.students_declined,
            total_students: current.students.len(),
            category_summaries,
            scans,
            heatmap_rows,
            notable_students: analysis.notable,
        })
    }

    /// Drill into one category of the current window.
    ///
    /// Returns `None` when there is no window or the category does not occur
    /// in the current one.
    pub async fn get_category_detail(
        &self,
        category_id: &str,
        filters: &OverviewFilters,
    ) -> Result<Option<CategoryDetail>, OverviewError> {
        let Some(snapshot) = self.load_current_pair(filters).await? else {
            return Ok(None);
        };
        let Some(analysis) = self.analyze(&snapshot) else {
            return Ok(None);
        };
        let current = analysis.current;
        let Some(category) = current.aggregate.category(category_id) else {
            return Ok(None);
        };

        let competency_ids: HashSet<&str> = current
            .heatmap
            .competencies
            .iter()
            .filter(|c| c.category_id.as_deref().map(str::trim) == Some(category.id.as_str()))
            .map(|c| c.id.as_str())
            .collect();
        let scores = current.heatmap.rows.iter().flat_map(|row| {
            row.scores
                .iter()
                .filter(|(id, _)| competency_ids.contains(id.as_str()))
                .filter_map(|(_, score)| *score)
        });
        let score_distribution = score_distribution(scores, &self.config.scale);

        let mut risk_students: Vec<RiskStudent> = current
            .aggregate
            .students
            .values()
            .filter_map(|s| {
                let average = s.average(&category.id);
                let delta = analysis.trend.delta(&s.student_id, &category.id);
                let reasons: Vec<NotableKind> = classify(average, delta, &self.config.thresholds)
                    .into_iter()
                    .filter(|k| *k != NotableKind::StrongGrowth)
                    .collect();
                (!reasons.is_empty()).then(|| RiskStudent {
                    student_id: s.student_id.clone(),
                    student_name: s.student_name.clone(),
                    class_name: s.class_name.clone(),
                    average,
                    delta,
                    reasons,
                })
            })
            .collect();
        risk_students.sort_by(|a, b| {
            let key = |r: &RiskStudent| r.average.unwrap_or(f64::INFINITY);
            key(a)
                .total_cmp(&key(b))
                .then_with(|| a.student_id.cmp(&b.student_id))
        });

        Ok(Some(CategoryDetail {
            category: category_summary(category, &analysis),
            score_distribution,
            risk_students,
        }))
    }

    /// One summary row per student in the current window, ordered by name.
    pub async fn get_students(
        &self,
        filters: &OverviewFilters,
    ) -> Result<Vec<StudentSummary>, OverviewError> {
        let Some(snapshot) = self.load_current_pair(filters).await? else {
            return Ok(Vec::new());
        };
        let Some(analysis) = self.analyze(&snapshot) else {
            return Ok(Vec::new());
        };
        let current = &analysis.current.aggregate;

        let mut students: Vec<StudentSummary> = current
            .students
            .values()
            .map(|s| {
                let mut strongest: Option<CategoryScore> = None;
                let mut weakest: Option<CategoryScore> = None;
                for category in &current.categories {
                    let Some(average) = s.average(&category.id) else {
                        continue;
                    };
                    let score = CategoryScore {
                        category_id: category.id.clone(),
                        category_name: category.name.clone(),
                        average,
                    };
                    if strongest.as_ref().map_or(true, |b| average > b.average) {
                        strongest = Some(score.clone());
                    }
                    if weakest.as_ref().map_or(true, |w| average < w.average) {
                        weakest = Some(score);
                    }
                }
                let flags: BTreeSet<NotableKind> = analysis
                    .notable
                    .iter()
                    .filter(|n| n.student_id == s.student_id)
                    .map(|n| n.kind)
                    .collect();
                StudentSummary {
                    student_id: s.student_id.clone(),
                    student_name: s.student_name.clone(),
                    class_name: s.class_name.clone(),
                    overall_average: s.overall_average(),
                    overall_delta: analysis.trend.overall_delta(&s.student_id),
                    strongest_category: strongest,
                    weakest_category: weakest,
                    flags: flags.into_iter().collect(),
                }
            })
            .collect();
        students.sort_by(|a, b| {
            a.student_name
                .cmp(&b.student_name)
                .then_with(|| a.student_id.cmp(&b.student_id))
        });
        Ok(students)
    }

    /// A student's category averages in every available scan, oldest first.
    ///
    /// Scans that fail to load, or in which the student has no row, are
    /// left out.
    pub async fn get_student_historical_scores(
        &self,
        student_id: &str,
        course_id: Option<&str>,
    ) -> Result<StudentHistory, OverviewError> {
        let windows = self.ordered_windows(course_id).await?;
        let snapshot = self
            .load(&windows, None, CurrentPolicy::BestEffort)
            .await?;

        let scans = snapshot
            .windows
            .iter()
            .rev()
            .flatten()
            .filter_map(|loaded| {
                let aggregate = &loaded.aggregate;
                let student = aggregate.students.get(student_id)?;
                Some(StudentScanScores {
                    scan_id: aggregate.window.id.clone(),
                    scan_label: aggregate.window.title.clone(),
                    scan_date: aggregate.window.start_date,
                    overall_average: student.overall_average(),
                    category_scores: aggregate
                        .categories
                        .iter()
                        .map(|c| CategoryAverage {
                            category_id: c.id.clone(),
                            category_name: c.name.clone(),
                            average: student.average(&c.id),
                        })
                        .collect(),
                })
            })
            .collect();

        Ok(StudentHistory {
            student_id: student_id.to_string(),
            scans,
        })
    }

    /// Goals and reflections for one window, grouped by student.
    pub async fn get_scan_feedback(&self, window_id: &str) -> Result<ScanFeedback, OverviewError> {
        let (goals, reflections) = tokio::try_join!(
            self.source.get_goals(window_id),
            self.source.get_reflections(window_id)
        )
        .map_err(|source| OverviewError::Feedback {
            window_id: window_id.to_string(),
            source,
        })?;
        Ok(ScanFeedback::group(window_id, goals, reflections))
    }

    async fn ordered_windows(
        &self,
        course_id: Option<&str>,
    ) -> Result<Vec<EvaluationWindow>, OverviewError> {
        let mut windows = self
            .source
            .list_windows(course_id)
            .await
            .map_err(|source| OverviewError::WindowList { source })?;
        if let Some(course) = course_id {
            windows.retain(|w| w.course_id.as_deref().map_or(true, |c| c == course));
        }
        sort_most_recent_first(&mut windows);
        tracing::debug!(
            source = self.source.name(),
            count = windows.len(),
            "listed evaluation windows"
        );
        Ok(windows)
    }

    /// Current and previous window only, for the single-window views.
    async fn load_current_pair(
        &self,
        filters: &OverviewFilters,
    ) -> Result<Option<Snapshot>, OverviewError> {
        let windows = self.ordered_windows(filters.course_id.as_deref()).await?;
        if windows.is_empty() {
            return Ok(None);
        }
        let fetch = windows.len().min(2);
        let snapshot = self
            .load(
                &windows[..fetch],
                filters.class_name.as_deref(),
                CurrentPolicy::Required,
            )
            .await?;
        Ok(Some(snapshot))
    }

    fn analyze<'a>(&self, snapshot: &'a Snapshot) -> Option<Analysis<'a>> {
        let current = snapshot.current()?;
        let previous = snapshot.previous();
        let trend = compare(
            &current.aggregate,
            previous.map(|p| &p.aggregate),
            self.config.thresholds.improvement,
        );
        let notable = detect(&current.aggregate, &trend, &self.config.thresholds);
        Some(Analysis {
            current,
            previous,
            trend,
            notable,
        })
    }

    /// Fetch, validate and aggregate `windows` (most recent first).
    async fn load(
        &self,
        windows: &[EvaluationWindow],
        class_name: Option<&str>,
        policy: CurrentPolicy,
    ) -> Result<Snapshot, OverviewError> {
        let fetched = self.fetch_heatmaps(windows).await;
        let mut loaded = Vec::with_capacity(windows.len());

        for (index, (window, result)) in windows.iter().zip(fetched).enumerate() {
            let required = index == 0 && policy == CurrentPolicy::Required;
            let mut heatmap = match result {
                Ok(heatmap) => heatmap,
                Err(source) if required => {
                    return Err(OverviewError::CurrentWindow {
                        window_id: window.id.clone(),
                        source,
                    });
                }
                Err(e) => {
                    tracing::warn!(window = %window.id, "omitting window, fetch failed: {e:#}");
                    loaded.push(None);
                    continue;
                }
            };
            if let Err(source) = heatmap.validate(&self.config.scale) {
                if required {
                    return Err(OverviewError::MalformedWindow {
                        window_id: window.id.clone(),
                        source,
                    });
                }
                tracing::warn!(window = %window.id, "omitting window, malformed data: {source}");
                loaded.push(None);
                continue;
            }

            if let Some(class_name) = class_name {
                heatmap.retain_class(class_name);
            }
            let aggregate = aggregate_window(window, &heatmap);
            let population = heatmap.score_population();
            loaded.push(Some(LoadedWindow {
                aggregate,
                heatmap,
                population,
            }));
        }

        Ok(Snapshot { windows: loaded })
    }

    /// Fetch score matrices concurrently, at most `parallelism` at a time.
    ///
    /// Results come back in the order of `windows`.
    async fn fetch_heatmaps(&self, windows: &[EvaluationWindow]) -> Vec<anyhow::Result<Heatmap>> {
        let semaphore = Arc::new(Semaphore::new(self.config.parallelism.max(1)));
        let mut futures = FuturesUnordered::new();
        tracing::debug!(
            windows = windows.len(),
            parallelism = self.config.parallelism,
            "fetching score matrices"
        );

        for (index, window) in windows.iter().enumerate() {
            let source = Arc::clone(&self.source);
            let semaphore = Arc::clone(&semaphore);
            let window_id = window.id.clone();

            futures.push(async move {
                let result = async {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .map_err(|_| anyhow!("semaphore closed"))?;
                    source.get_heatmap(&window_id).await
                }
                .await;
                (index, result)
            });
        }

        let mut results: Vec<Option<anyhow::Result<Heatmap>>> =
            windows.iter().map(|_| None).collect();
        while let Some((index, result)) = futures.next().await {
            results[index] = Some(result);
        }
        results
            .into_iter()
            .map(|r| r.unwrap_or_else(|| Err(anyhow!("fetch did not complete"))))
            .collect()
    }
}

fn category_summary(category: &CategoryRef, analysis: &Analysis<'_>) -> CategorySummary {
    let current = &analysis.current.aggregate;
    let average_score = current.category_average(&category.id);
    let previous_average = analysis
        .previous
        .and_then(|p| p.aggregate.category_average(&category.id));
    let count = |kind: NotableKind| {
        analysis
            .notable
            .iter()
            .filter(|n| n.category_id == category.id && n.kind == kind)
            .count()
    };
    CategorySummary {
        category_id: category.id.clone(),
        category_name: category.name.clone(),
        average_score,
        previous_average,
        trend_delta: trend::delta(average_score, previous_average),
        students_assessed: current.students_assessed(&category.id),
        low_score_count: count(NotableKind::LowScore),
        strong_growth_count: count(NotableKind::StrongGrowth),
        decline_count: count(NotableKind::Decline),
    }
}

fn scan_summary(loaded: &LoadedWindow) -> ScanSummary {
    let window = &loaded.aggregate.window;
    let stats = PopulationStats::compute(&loaded.population);
    let stat = |f: fn(&PopulationStats) -> f64| stats.as_ref().map(f);
    ScanSummary {
        window_id: window.id.clone(),
        label: window.title.clone(),
        date: window.start_date,
        overall_average: stat(|s| s.mean),
        median: stat(|s| s.median),
        p10: stat(|s| s.p10),
        p25: stat(|s| s.p25),
        p75: stat(|s| s.p75),
        p90: stat(|s| s.p90),
        category_averages: loaded
            .aggregate
            .categories
            .iter()
            .map(|c| CategoryAverage {
                category_id: c.id.clone(),
                category_name: c.name.clone(),
                average: loaded.aggregate.category_average(&c.id),
            })
            .collect(),
    }
}
