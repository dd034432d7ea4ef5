use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::error::Error;

/// Project-level settings read from `.pasta/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub channels: BTreeMap<String, ChannelOverride>,
    #[serde(default)]
    pub replay: ReplayConfig,
}

/// Copypasta detection defaults applied to every channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    #[serde(default = "default_need")]
    pub need: usize,
    #[serde(default = "default_within_ms")]
    pub within_ms: u64,
    #[serde(default = "default_true")]
    pub learn: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            need: default_need(),
            within_ms: default_within_ms(),
            learn: default_true(),
        }
    }
}

/// Per-channel overrides. Unset fields fall back to [`DetectorConfig`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelOverride {
    #[serde(default)]
    pub need: Option<usize>,
    #[serde(default)]
    pub within_ms: Option<u64>,
    #[serde(default)]
    pub learn: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Channel used for transcript lines that do not name one.
    #[serde(default = "default_channel")]
    pub default_channel: String,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            default_channel: default_channel(),
        }
    }
}

/// Fully resolved, validated settings for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    pub need: usize,
    pub within: Duration,
    pub learn: bool,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            need: default_need(),
            within: Duration::from_millis(default_within_ms()),
            learn: default_true(),
        }
    }
}

impl ProjectConfig {
    /// Resolve the settings for `channel`, applying its overrides.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidThreshold`] when the effective `need` is zero
    /// and [`Error::InvalidWindow`] when the effective window is empty.
    pub fn channel(&self, channel: &str) -> Result<ChannelConfig, Error> {
        let over = self.channels.get(channel).cloned().unwrap_or_default();
        let need = over.need.unwrap_or(self.detector.need);
        let within_ms = over.within_ms.unwrap_or(self.detector.within_ms);

        if need == 0 {
            return Err(Error::InvalidThreshold {
                channel: channel.to_string(),
            });
        }
        if within_ms == 0 {
            return Err(Error::InvalidWindow {
                channel: channel.to_string(),
            });
        }

        Ok(ChannelConfig {
            need,
            within: Duration::from_millis(within_ms),
            learn: over.learn.unwrap_or(self.detector.learn),
        })
    }
}

/// Parse a project config from TOML text.
///
/// # Errors
///
/// Returns [`Error::ConfigParse`] on malformed TOML or mistyped fields.
pub fn parse_project_config(content: &str) -> Result<ProjectConfig, Error> {
    Ok(toml::from_str::<ProjectConfig>(content)?)
}

/// Load `.pasta/config.toml` under `project_root`, or defaults if absent.
///
/// # Errors
///
/// Fails when the file exists but cannot be read or parsed.
pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_root.join(".pasta/config.toml");
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no project config, using defaults");
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    parse_project_config(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

const fn default_true() -> bool {
    true
}

const fn default_need() -> usize {
    3
}

const fn default_within_ms() -> u64 {
    30_000
}

fn default_channel() -> String {
    "#general".to_string()
}
