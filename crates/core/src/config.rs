//! Application configuration: file under the user config directory, then
//! `DRIVE_*` environment overrides.

use std::{
    fs,
    path::{Path, PathBuf},
};

use ::config::{Config, Environment, File};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::storage::Dataset;

/// Directory name used under the platform config, data and cache roots.
pub const APP_DIR: &str = "drive-admin";

const DEFAULT_CONFIG: &str = r#"# drive-admin configuration
#
# Every key can be overridden with an environment variable prefixed DRIVE_,
# e.g. DRIVE_CARDS_SOURCE=https://example.com/drive-card.json

# Directory that saved datasets are written to.
# data_dir = "/path/to/data"

# Directory holding the last-good snapshots used when a source is unavailable.
# cache_dir = "/path/to/cache"

# Where cards and precons are loaded from: a file path or an http(s) URL.
# Defaults to the dataset files inside data_dir.
# cards_source = "drive-card.json"
# precons_source = "drive-precons.json"
"#;

/// Resolved settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Output directory for saved datasets.
    pub data_dir: PathBuf,
    /// Snapshot cache directory.
    pub cache_dir: PathBuf,
    /// Card source override (path or URL).
    #[serde(default)]
    pub cards_source: Option<String>,
    /// Precon source override (path or URL).
    #[serde(default)]
    pub precons_source: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR),
            cache_dir: dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from(".cache"))
                .join(APP_DIR),
            cards_source: None,
            precons_source: None,
        }
    }
}

impl AppConfig {
    /// Load from the default config file and the environment.
    pub fn load() -> Result<Self> {
        Self::load_from(config_path())
    }

    /// Load from `path` (optional on disk) and the environment.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let defaults = Self::default();
        let settings = Config::builder()
            .set_default("data_dir", defaults.data_dir.to_string_lossy().into_owned())?
            .set_default("cache_dir", defaults.cache_dir.to_string_lossy().into_owned())?
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix("DRIVE"))
            .build()
            .with_context(|| format!("failed to read configuration {}", path.display()))?;
        let config: AppConfig = settings
            .try_deserialize()
            .context("invalid configuration")?;
        Ok(config)
    }

    /// Source to load `dataset` from: the configured override, else the
    /// dataset file inside the data directory.
    pub fn source(&self, dataset: Dataset) -> String {
        let configured = match dataset {
            Dataset::Cards => self.cards_source.as_deref(),
            Dataset::Precons => self.precons_source.as_deref(),
        };
        configured
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| {
                self.data_dir
                    .join(dataset.file_name())
                    .to_string_lossy()
                    .into_owned()
            })
    }
}

/// Default location of the config file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("config.toml")
}

/// Write the commented default config file if none exists yet.
pub fn ensure_default_config() -> Result<()> {
    ensure_default_config_at(config_path()).map(|_| ())
}

/// [`ensure_default_config`] for an explicit path. Returns whether a file
/// was written.
pub fn ensure_default_config_at(path: impl AsRef<Path>) -> Result<bool> {
    let path = path.as_ref();
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "wrote default configuration");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_file_is_written_once_and_parses() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join("config.toml");

        assert!(ensure_default_config_at(&path)?);
        assert!(!ensure_default_config_at(&path)?);

        let config = AppConfig::load_from(&path)?;
        assert!(config.data_dir.ends_with(APP_DIR));
        assert_eq!(config.cards_source, None);
        Ok(())
    }

    #[test]
    fn file_values_override_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "data_dir = \"/srv/drive\"\nprecons_source = \"https://example.com/p.json\"\n",
        )?;

        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.data_dir, PathBuf::from("/srv/drive"));
        assert_eq!(config.source(Dataset::Precons), "https://example.com/p.json");
        assert_eq!(
            PathBuf::from(config.source(Dataset::Cards)),
            PathBuf::from("/srv/drive").join("drive-card.json")
        );
        Ok(())
    }
}
