//! scantrend-core: Competency score aggregation and trend analysis.
//!
//! This crate turns raw per-window competency scores into category averages,
//! inter-window trend deltas, population statistics and notable-student flags,
//! and assembles them into the payloads a dashboard consumes.

pub mod aggregate;
pub mod engine;
pub mod error;
pub mod model;
pub mod notable;
pub mod report;
pub mod statistics;
pub mod traits;
pub mod trend;
