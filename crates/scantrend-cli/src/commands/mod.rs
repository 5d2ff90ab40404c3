//! Subcommand implementations and the plumbing they share.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use serde::Serialize;

use scantrend_core::engine::OverviewEngine;
use scantrend_core::model::{OverviewFilters, ScanRange};
use scantrend_core::traits::ScoreSource;
use scantrend_sources::config::load_config_from;
use scantrend_sources::snapshot::SnapshotSource;
use scantrend_sources::{create_source, ScantrendConfig};

pub mod category;
pub mod feedback;
pub mod history;
pub mod init;
pub mod overview;
pub mod students;
pub mod validate;

/// Where the config and scores come from.
pub struct SourceArgs {
    pub config: Option<PathBuf>,
    pub snapshot: Option<PathBuf>,
}

impl SourceArgs {
    pub fn load_config(&self) -> Result<ScantrendConfig> {
        load_config_from(self.config.as_deref())
    }

    /// Build an engine over `--snapshot` if given, else the configured source.
    pub fn engine(&self) -> Result<(OverviewEngine, ScantrendConfig)> {
        let config = self.load_config()?;
        let source: Arc<dyn ScoreSource> = match (&self.snapshot, &config.source) {
            (Some(path), _) => Arc::new(SnapshotSource::from_path(path)?),
            (None, Some(source)) => {
                create_source(source).context("failed to create score source")?
            }
            (None, None) => anyhow::bail!(
                "no score source configured; add a [source] section to scantrend.toml or pass --snapshot"
            ),
        };
        tracing::debug!(source = source.name(), "using score source");
        Ok((OverviewEngine::new(source, config.engine_config()), config))
    }
}

/// Filters shared by the current-scan views.
#[derive(Args, Debug, Clone)]
pub struct FilterArgs {
    /// Restrict to one course
    #[arg(long)]
    pub course: Option<String>,

    /// Restrict to one class
    #[arg(long)]
    pub class: Option<String>,

    /// Scan range: last_3, last_5, last_<N> or all (default from config)
    #[arg(long)]
    pub range: Option<ScanRange>,
}

impl FilterArgs {
    pub fn into_filters(self, config: &ScantrendConfig) -> OverviewFilters {
        OverviewFilters {
            course_id: self.course,
            class_name: self.class,
            range: self.range.unwrap_or(config.default_range),
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// A score with two decimals, or `-` when absent.
pub(crate) fn score(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"))
}

/// A signed delta with two decimals, or `-` when absent.
pub(crate) fn delta(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:+.2}"))
}
