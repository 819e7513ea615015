//! Snapshot cache: one JSON file per key holding the last good copy of a
//! dataset.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stored copy of a dataset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// When the snapshot was written.
    pub saved_at: DateTime<Utc>,
    /// Dataset contents, exactly as loaded or exported.
    pub data: Value,
}

/// Directory of `<key>.json` snapshot files.
#[derive(Debug, Clone)]
pub struct LocalCache {
    root: PathBuf,
}

impl LocalCache {
    /// Cache rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Cache directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", sanitize_key(key)))
    }

    /// Snapshot stored under `key`, `None` when there is none.
    pub fn read(&self, key: &str) -> Result<Option<Snapshot>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("failed to read cache {}", path.display()))?;
        let snapshot = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse cache {}", path.display()))?;
        Ok(Some(snapshot))
    }

    /// Replace the snapshot under `key`.
    pub fn write(&self, key: &str, data: &Value) -> Result<Snapshot> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("failed to create {}", self.root.display()))?;
        let snapshot = Snapshot {
            saved_at: Utc::now(),
            data: data.clone(),
        };
        let path = self.path_for(key);
        let serialized =
            serde_json::to_vec_pretty(&snapshot).context("failed to serialize snapshot")?;
        fs::write(&path, serialized)
            .with_context(|| format!("failed to write cache {}", path.display()))?;
        Ok(snapshot)
    }

    /// Drop the snapshot under `key`, if any.
    pub fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("failed to remove cache {}", path.display()))?;
        }
        Ok(())
    }
}

fn sanitize_key(key: &str) -> String {
    let cleaned: String = key
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_'))
        .collect();
    if cleaned.is_empty() {
        "snapshot".to_string()
    } else {
        cleaned
    }
}
