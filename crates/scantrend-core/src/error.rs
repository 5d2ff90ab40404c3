//! Engine error types.
//!
//! `OverviewError` is what a dashboard operation surfaces when it cannot
//! produce a payload. Secondary fetch failures never reach this type: they are
//! logged and the affected fields are left empty.

use thiserror::Error;

/// Fatal failures of a dashboard operation.
#[derive(Debug, Error)]
pub enum OverviewError {
    /// The window list could not be fetched.
    #[error("failed to list evaluation windows: {source:#}")]
    WindowList {
        #[source]
        source: anyhow::Error,
    },

    /// The current window's score matrix could not be fetched.
    #[error("failed to fetch current window '{window_id}': {source:#}")]
    CurrentWindow {
        window_id: String,
        #[source]
        source: anyhow::Error,
    },

    /// The current window's score matrix failed boundary validation.
    #[error("window '{window_id}' has malformed score data: {source}")]
    MalformedWindow {
        window_id: String,
        #[source]
        source: ShapeError,
    },

    /// Goals or reflections for a window could not be fetched.
    #[error("failed to fetch feedback for window '{window_id}': {source:#}")]
    Feedback {
        window_id: String,
        #[source]
        source: anyhow::Error,
    },
}

impl OverviewError {
    /// The window the failure is attributed to, if any.
    pub fn window_id(&self) -> Option<&str> {
        match self {
            OverviewError::WindowList { .. } => None,
            OverviewError::CurrentWindow { window_id, .. }
            | OverviewError::MalformedWindow { window_id, .. }
            | OverviewError::Feedback { window_id, .. } => Some(window_id),
        }
    }
}

/// A score matrix that cannot be aggregated as delivered.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShapeError {
    #[error("score for student '{student_id}' competency '{competency_id}' is not a finite number")]
    NonFiniteScore {
        student_id: String,
        competency_id: String,
    },

    #[error("score {score} for student '{student_id}' competency '{competency_id}' is outside {min}..={max}")]
    OutOfScale {
        student_id: String,
        competency_id: String,
        score: f64,
        min: f64,
        max: f64,
    },

    #[error("student '{0}' appears in more than one row")]
    DuplicateStudent(String),

    #[error("competency '{0}' is listed more than once")]
    DuplicateCompetency(String),
}
