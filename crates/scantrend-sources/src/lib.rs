//! scantrend-sources: Score source integrations.
//!
//! Implements the `ScoreSource` trait for the school platform's read API and
//! for JSON snapshot files, plus a scripted mock for tests.

pub mod config;
pub mod error;
pub mod http;
pub mod mock;
pub mod snapshot;

pub use config::{create_source, load_config, ScantrendConfig, SourceConfig};
pub use error::SourceError;
