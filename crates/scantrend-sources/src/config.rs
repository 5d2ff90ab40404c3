//! Source configuration and factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use scantrend_core::engine::EngineConfig;
use scantrend_core::model::{ScanRange, ScoreScale, Thresholds};
use scantrend_core::traits::ScoreSource;

use crate::http::{HttpScoreSource, DEFAULT_TIMEOUT_SECS};
use crate::snapshot::SnapshotSource;

/// Where scores are read from.
///
/// Note: Custom Debug impl masks the API token to keep it out of logs.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceConfig {
    Http {
        base_url: String,
        #[serde(default)]
        api_token: Option<String>,
        #[serde(default = "default_timeout")]
        timeout_secs: u64,
    },
    Snapshot {
        path: PathBuf,
    },
}

impl std::fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceConfig::Http {
                base_url,
                api_token,
                timeout_secs,
            } => f
                .debug_struct("Http")
                .field("base_url", base_url)
                .field("api_token", &api_token.as_ref().map(|_| "***"))
                .field("timeout_secs", timeout_secs)
                .finish(),
            SourceConfig::Snapshot { path } => {
                f.debug_struct("Snapshot").field("path", path).finish()
            }
        }
    }
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Top-level scantrend configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScantrendConfig {
    /// Score source. Commands fail without one unless `--snapshot` is given.
    #[serde(default)]
    pub source: Option<SourceConfig>,
    /// Max concurrent score-matrix fetches.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// Scan range used when none is requested.
    #[serde(default)]
    pub default_range: ScanRange,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub scale: ScoreScale,
}

fn default_parallelism() -> usize {
    4
}

impl Default for ScantrendConfig {
    fn default() -> Self {
        Self {
            source: None,
            parallelism: default_parallelism(),
            default_range: ScanRange::default(),
            thresholds: Thresholds::default(),
            scale: ScoreScale::default(),
        }
    }
}

impl ScantrendConfig {
    /// Engine settings derived from this config.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            parallelism: self.parallelism,
            thresholds: self.thresholds,
            scale: self.scale,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.parallelism == 0 {
            anyhow::bail!("parallelism must be at least 1");
        }
        if !(self.scale.min < self.scale.max) {
            anyhow::bail!(
                "scale.min ({}) must be below scale.max ({})",
                self.scale.min,
                self.scale.max
            );
        }
        Ok(())
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
///
/// Substituted values are copied through as-is and never rescanned. An
/// unterminated `${` is left in place.
fn resolve_env_vars(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        let var_name = &rest[start + 2..start + len];
        result.push_str(&std::env::var(var_name).unwrap_or_default());
        rest = &rest[start + len + 1..];
    }
    result.push_str(rest);
    result
}

/// Resolve env vars in a source config. Relative snapshot paths are taken
/// relative to `base_dir`.
fn resolve_source_config(config: &SourceConfig, base_dir: Option<&Path>) -> SourceConfig {
    match config {
        SourceConfig::Http {
            base_url,
            api_token,
            timeout_secs,
        } => SourceConfig::Http {
            base_url: resolve_env_vars(base_url),
            api_token: api_token
                .as_ref()
                .map(|t| resolve_env_vars(t))
                .filter(|t| !t.is_empty()),
            timeout_secs: *timeout_secs,
        },
        SourceConfig::Snapshot { path } => {
            let resolved = PathBuf::from(resolve_env_vars(&path.to_string_lossy()));
            let path = match base_dir {
                Some(dir) if resolved.is_relative() => dir.join(resolved),
                _ => resolved,
            };
            SourceConfig::Snapshot { path }
        }
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `scantrend.toml` in the current directory
/// 2. `~/.config/scantrend/config.toml`
///
/// Environment variable overrides: `SCANTREND_BASE_URL`, `SCANTREND_API_TOKEN`.
pub fn load_config() -> Result<ScantrendConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<ScantrendConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("scantrend.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match &config_path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<ScantrendConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => ScantrendConfig::default(),
    };

    apply_env_overrides(&mut config);

    let base_dir = config_path
        .as_deref()
        .and_then(Path::parent)
        .filter(|p| !p.as_os_str().is_empty());
    config.source = config
        .source
        .as_ref()
        .map(|s| resolve_source_config(s, base_dir));

    config.validate()?;
    tracing::debug!(source = ?config.source, parallelism = config.parallelism, "loaded config");
    Ok(config)
}

fn apply_env_overrides(config: &mut ScantrendConfig) {
    if let Ok(url) = std::env::var("SCANTREND_BASE_URL") {
        match &mut config.source {
            Some(SourceConfig::Http { base_url, .. }) => *base_url = url,
            _ => {
                config.source = Some(SourceConfig::Http {
                    base_url: url,
                    api_token: None,
                    timeout_secs: default_timeout(),
                })
            }
        }
    }

    if let Ok(token) = std::env::var("SCANTREND_API_TOKEN") {
        if let Some(SourceConfig::Http { api_token, .. }) = &mut config.source {
            *api_token = Some(token);
        }
    }
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("scantrend"))
}

/// Create a source instance from its configuration.
pub fn create_source(config: &SourceConfig) -> Result<Arc<dyn ScoreSource>> {
    match config {
        SourceConfig::Http {
            base_url,
            api_token,
            timeout_secs,
        } => Ok(Arc::new(HttpScoreSource::new(
            base_url,
            api_token.clone(),
            *timeout_secs,
        )?)),
        SourceConfig::Snapshot { path } => Ok(Arc::new(SnapshotSource::from_path(path)?)),
    }
}
