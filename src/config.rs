//! Settings loading.
//!
//! Settings are read from `$HOME/.omni-autolink/settings.json` (or a YAML
//! file given explicitly). Environment variables override file values.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::autolink::AutolinkConfig;

/// Environment variable overriding [`Settings::enrichment_timeout_ms`].
pub const ENRICHMENT_TIMEOUT_ENV: &str = "OMNI_AUTOLINK_ENRICHMENT_TIMEOUT_MS";

/// Default wait before rendering with lookups still pending.
pub const DEFAULT_ENRICHMENT_TIMEOUT_MS: u64 = 250;

fn default_enrichment_timeout_ms() -> u64 {
    DEFAULT_ENRICHMENT_TIMEOUT_MS
}

/// Settings loaded from `$HOME/.omni-autolink/settings.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// User-configured autolinks.
    #[serde(default)]
    pub autolinks: Vec<AutolinkConfig>,
    /// Milliseconds to wait for issue lookups before rendering.
    #[serde(default = "default_enrichment_timeout_ms")]
    pub enrichment_timeout_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            autolinks: Vec::new(),
            enrichment_timeout_ms: DEFAULT_ENRICHMENT_TIMEOUT_MS,
        }
    }
}

impl Settings {
    /// Loads settings from the default location.
    pub fn load() -> Result<Self> {
        let settings_path = Self::get_settings_path()?;
        Self::load_from_path(&settings_path)
    }

    /// Loads settings from a specific path. A missing file yields defaults.
    ///
    /// `.yaml` and `.yml` files are parsed as YAML, everything else as JSON.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;

        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

        if is_yaml {
            serde_yaml::from_str::<Self>(&content)
                .with_context(|| format!("Failed to parse settings file: {}", path.display()))
        } else {
            serde_json::from_str::<Self>(&content)
                .with_context(|| format!("Failed to parse settings file: {}", path.display()))
        }
    }

    /// Returns the default settings path.
    pub fn get_settings_path() -> Result<PathBuf> {
        let home_dir = dirs::home_dir().context("Failed to determine home directory")?;

        Ok(home_dir.join(".omni-autolink").join("settings.json"))
    }

    /// Returns the enrichment wait, preferring the environment over the file.
    pub fn enrichment_timeout(&self) -> Duration {
        let millis = env::var(ENRICHMENT_TIMEOUT_ENV)
            .ok()
            .and_then(|value| value.trim().parse::<u64>().ok())
            .unwrap_or(self.enrichment_timeout_ms);
        Duration::from_millis(millis)
    }
}
