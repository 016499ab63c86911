//! Run configuration
//!
//! Settings come from three layers, lowest priority first: built-in
//! defaults, an optional TOML file, then `HISTOFAN_*` environment variables.
//! Command-line flags are applied on top by the binary.

use crate::error::{Error, Result};
use crate::fleet::WorkerIndex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;


/// Input name that asks the parent to cancel that slot's worker.
pub const DEFAULT_CANCEL_MARKER: &str = "SIG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Directory that receives the `file<pid>.hist` artifacts
    pub output_dir: PathBuf,

    /// Input name reserved for deliberately cancelled workers
    pub cancel_marker: String,

    /// How long a cancellation slot's worker runs before it is sent SIGINT
    #[serde(with = "humantime_serde")]
    pub kill_grace: Duration,

    /// Upper bound on draining one payload after its worker exited
    #[serde(with = "humantime_serde")]
    pub drain_timeout: Duration,

    /// How long a held worker idles if nobody cancels it
    #[serde(with = "humantime_serde")]
    pub hold_limit: Duration,

    /// Time every worker lingers after publishing
    #[serde(with = "humantime_serde")]
    pub linger_base: Duration,

    /// Extra linger per worker index, staggering exits
    #[serde(with = "humantime_serde")]
    pub linger_step: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            cancel_marker: DEFAULT_CANCEL_MARKER.to_string(),
            kill_grace: Duration::from_secs(2),
            drain_timeout: Duration::from_secs(5),
            hold_limit: Duration::from_secs(60),
            linger_base: Duration::ZERO,
            linger_step: Duration::ZERO,
        }
    }
}

impl RunConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file. Missing keys fall back to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn merge_env_vars(&mut self) -> Result<()> {
        self.merge_env_with(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    pub fn merge_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("HISTOFAN_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }

        if let Some(marker) = lookup("HISTOFAN_CANCEL_MARKER") {
            self.cancel_marker = marker;
        }

        if let Some(grace) = lookup("HISTOFAN_KILL_GRACE") {
            self.kill_grace = parse_duration("HISTOFAN_KILL_GRACE", &grace)?;
        }

        if let Some(timeout) = lookup("HISTOFAN_DRAIN_TIMEOUT") {
            self.drain_timeout = parse_duration("HISTOFAN_DRAIN_TIMEOUT", &timeout)?;
        }

        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if self.cancel_marker.is_empty() {
            return Err(Error::Config("cancel_marker must not be empty".to_string()));
        }
        if self.drain_timeout.is_zero() {
            return Err(Error::Config("drain_timeout must be positive".to_string()));
        }
        Ok(())
    }

    /// Linger for worker `index`: `linger_base + index * linger_step`.
    pub fn linger_for(&self, index: WorkerIndex) -> Duration {
        let steps = u32::try_from(index).unwrap_or(u32::MAX);
        self.linger_base
            .saturating_add(self.linger_step.saturating_mul(steps))
    }
}

fn parse_duration(key: &str, value: &str) -> Result<Duration> {
    humantime_serde::re::humantime::parse_duration(value)
        .map_err(|e| Error::Config(format!("{key}={value:?} is not a duration: {e}")))
}
