//! Loading and saving the two JSON datasets.

use std::{fmt, path::PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{info, warn};

use super::cache::LocalCache;
use crate::{
    config::AppConfig,
    export::export_cards,
    library::Library,
    models::Precon,
    normalize::normalize,
};

/// The persisted JSON datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dataset {
    /// `drive-card.json`
    Cards,
    /// `drive-precons.json`
    Precons,
}

impl Dataset {
    /// Both datasets.
    pub const ALL: [Dataset; 2] = [Dataset::Cards, Dataset::Precons];

    /// File name used for loading defaults and saving.
    pub fn file_name(self) -> &'static str {
        match self {
            Dataset::Cards => "drive-card.json",
            Dataset::Precons => "drive-precons.json",
        }
    }

    /// Key of the snapshot in the local cache.
    pub fn cache_key(self) -> &'static str {
        match self {
            Dataset::Cards => "drive-card-data",
            Dataset::Precons => "drive-precons-data",
        }
    }

    /// Dataset stored in a file called `name`.
    pub fn from_file_name(name: &str) -> Option<Dataset> {
        Self::ALL
            .into_iter()
            .find(|dataset| dataset.file_name() == name)
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dataset::Cards => f.write_str("cards"),
            Dataset::Precons => f.write_str("precons"),
        }
    }
}

/// Where loaded data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOrigin {
    /// The configured file or URL.
    Source,
    /// The cached snapshot, after the source failed.
    Cache,
    /// Nothing usable was found.
    Empty,
}

/// Loaded data plus its provenance.
#[derive(Debug, Clone)]
pub struct Loaded<T> {
    /// The data.
    pub data: T,
    /// Where it came from.
    pub origin: LoadOrigin,
    /// Snapshot time when served from the cache.
    pub cached_at: Option<DateTime<Utc>>,
}

impl<T> Loaded<T> {
    fn map<U>(self, f: impl FnOnce(T) -> U) -> Loaded<U> {
        Loaded {
            data: f(self.data),
            origin: self.origin,
            cached_at: self.cached_at,
        }
    }
}

/// Reads datasets from their sources with cache fallback, and writes them
/// back out.
#[derive(Debug, Clone)]
pub struct DataStore {
    config: AppConfig,
    cache: LocalCache,
    client: reqwest::Client,
}

impl DataStore {
    /// Store using the directories and sources in `config`.
    pub fn new(config: AppConfig) -> Self {
        let cache = LocalCache::new(config.cache_dir.clone());
        Self {
            config,
            cache,
            client: reqwest::Client::new(),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Snapshot cache.
    pub fn cache(&self) -> &LocalCache {
        &self.cache
    }

    /// Path a dataset is saved to.
    pub fn output_path(&self, dataset: Dataset) -> PathBuf {
        self.config.data_dir.join(dataset.file_name())
    }

    /// Load and normalize the card library.
    pub async fn load_cards(&self) -> Loaded<Library> {
        self.load_raw(Dataset::Cards)
            .await
            .map(|raw| Library::from_cards(raw.iter().map(normalize)))
    }

    /// Load precon decks. Entries that are not deck objects are skipped.
    pub async fn load_precons(&self) -> Loaded<Vec<Precon>> {
        self.load_raw(Dataset::Precons).await.map(|raw| {
            raw.into_iter()
                .enumerate()
                .filter_map(|(index, value)| match serde_json::from_value(value) {
                    Ok(precon) => Some(precon),
                    Err(err) => {
                        warn!(index, "skipping malformed precon: {err}");
                        None
                    }
                })
                .collect()
        })
    }

    /// Write the library in file format and refresh its snapshot.
    pub async fn save_cards(&self, library: &Library) -> Result<PathBuf> {
        self.save(Dataset::Cards, export_cards(library.iter())).await
    }

    /// Write the precons and refresh their snapshot.
    pub async fn save_precons(&self, precons: &[Precon]) -> Result<PathBuf> {
        let value = serde_json::to_value(precons).context("failed to serialize precons")?;
        self.save(Dataset::Precons, value).await
    }

    async fn save(&self, dataset: Dataset, value: Value) -> Result<PathBuf> {
        let path = self.output_path(dataset);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_vec_pretty(&value)
            .with_context(|| format!("failed to serialize {dataset}"))?;
        tokio::fs::write(&path, serialized)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(%dataset, path = %path.display(), "saved dataset");
        self.refresh_cache(dataset, value).await;
        Ok(path)
    }

    /// Snapshot `value` into the cache on the blocking pool. Failures are
    /// logged and otherwise ignored.
    async fn refresh_cache(&self, dataset: Dataset, value: Value) {
        let cache = self.cache.clone();
        let written =
            tokio::task::spawn_blocking(move || cache.write(dataset.cache_key(), &value)).await;
        match written {
            Ok(Ok(_)) => {}
            Ok(Err(err)) => warn!(%dataset, "failed to refresh cache: {err:#}"),
            Err(err) => warn!(%dataset, "cache refresh task failed: {err}"),
        }
    }

    async fn load_raw(&self, dataset: Dataset) -> Loaded<Vec<Value>> {
        let source = self.config.source(dataset);
        match self.fetch(&source).await {
            Ok(values) => {
                self.refresh_cache(dataset, Value::Array(values.clone())).await;
                info!(%dataset, %source, count = values.len(), "loaded dataset");
                return Loaded {
                    data: values,
                    origin: LoadOrigin::Source,
                    cached_at: None,
                };
            }
            Err(err) => {
                warn!(%dataset, %source, "load failed, trying cached copy: {err:#}");
            }
        }

        match self.cache.read(dataset.cache_key()) {
            Ok(Some(snapshot)) => match snapshot.data {
                Value::Array(values) => {
                    return Loaded {
                        data: values,
                        origin: LoadOrigin::Cache,
                        cached_at: Some(snapshot.saved_at),
                    };
                }
                _ => warn!(%dataset, "cached snapshot is not an array"),
            },
            Ok(None) => {}
            Err(err) => warn!(%dataset, "cached copy unusable: {err:#}"),
        }

        warn!(%dataset, "no usable data, starting empty");
        Loaded {
            data: Vec::new(),
            origin: LoadOrigin::Empty,
            cached_at: None,
        }
    }

    async fn fetch(&self, source: &str) -> Result<Vec<Value>> {
        let body = if is_url(source) {
            self.client
                .get(source)
                .send()
                .await
                .with_context(|| format!("failed to request {source}"))?
                .error_for_status()?
                .text()
                .await
                .with_context(|| format!("failed to read response from {source}"))?
        } else {
            tokio::fs::read_to_string(source)
                .await
                .with_context(|| format!("failed to read {source}"))?
        };
        let parsed: Value =
            serde_json::from_str(&body).with_context(|| format!("failed to parse {source}"))?;
        match parsed {
            Value::Array(values) => Ok(values),
            _ => bail!("{source} does not contain a JSON array"),
        }
    }
}

fn is_url(source: &str) -> bool {
    let lower = source.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::{fs, path::Path};
    use tempfile::tempdir;

    fn store_in(root: &Path) -> DataStore {
        DataStore::new(AppConfig {
            data_dir: root.join("data"),
            cache_dir: root.join("cache"),
            cards_source: None,
            precons_source: None,
        })
    }

    fn write_source(store: &DataStore, dataset: Dataset, contents: &str) -> Result<()> {
        let path = store.output_path(dataset);
        fs::create_dir_all(path.parent().expect("output has a parent"))?;
        fs::write(path, contents)?;
        Ok(())
    }

    #[test]
    fn dataset_names() {
        assert_eq!(Dataset::from_file_name("drive-precons.json"), Some(Dataset::Precons));
        assert_eq!(Dataset::from_file_name("other.json"), None);
        assert_eq!(Dataset::Cards.cache_key(), "drive-card-data");
        assert!(is_url("HTTPS://example.com/drive-card.json"));
        assert!(!is_url("/tmp/drive-card.json"));
    }

    #[tokio::test]
    async fn save_succeeds_when_the_cache_cannot_be_written() -> Result<()> {
        let dir = tempdir()?;
        let blocked = dir.path().join("cache");
        fs::write(&blocked, "not a directory")?;
        let store = store_in(dir.path());

        let library = Library::from_cards([normalize(&json!({"id": "card_taxi", "name": "Taxi"}))]);
        let path = store.save_cards(&library).await?;
        let saved: Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
        assert_eq!(saved[0]["name"], "Taxi");
        assert!(store.cache().read(Dataset::Cards.cache_key())?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn loads_from_source_and_caches() -> Result<()> {
        let dir = tempdir()?;
        let store = store_in(dir.path());
        write_source(
            &store,
            Dataset::Cards,
            r#"[{"id": "card_taxi", "name": "Taxi", "prints": [{"setId": "Core", "cardNumber": "7"}]}]"#,
        )?;

        let loaded = store.load_cards().await;
        assert_eq!(loaded.origin, LoadOrigin::Source);
        let card = loaded.data.find_by_id("card_taxi").expect("card loaded");
        assert_eq!(card.set_name, "Core");
        assert!(card.prints[0].is_primary);

        let snapshot = store.cache().read(Dataset::Cards.cache_key())?;
        assert_eq!(snapshot.map(|snapshot| snapshot.data[0]["name"].clone()), Some(json!("Taxi")));
        Ok(())
    }

    #[tokio::test]
    async fn falls_back_to_cache_then_empty() -> Result<()> {
        let dir = tempdir()?;
        let store = store_in(dir.path());

        let loaded = store.load_precons().await;
        assert_eq!(loaded.origin, LoadOrigin::Empty);
        assert!(loaded.data.is_empty());

        store.cache().write(
            Dataset::Precons.cache_key(),
            &json!([{"name": "Starter", "cards": [{"cardId": "card_taxi", "count": 2}]}]),
        )?;
        write_source(&store, Dataset::Precons, r#"{"not": "an array"}"#)?;

        let loaded = store.load_precons().await;
        assert_eq!(loaded.origin, LoadOrigin::Cache);
        assert!(loaded.cached_at.is_some());
        assert_eq!(loaded.data[0].total_cards(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn malformed_cache_yields_empty() -> Result<()> {
        let dir = tempdir()?;
        let store = store_in(dir.path());
        fs::create_dir_all(store.cache().root())?;
        fs::write(store.cache().path_for(Dataset::Cards.cache_key()), "[oops")?;

        let loaded = store.load_cards().await;
        assert_eq!(loaded.origin, LoadOrigin::Empty);
        assert!(loaded.data.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn save_writes_file_format_and_reloads() -> Result<()> {
        let dir = tempdir()?;
        let store = store_in(dir.path());
        let library = Library::from_cards([normalize(&json!({
            "id": "card_bus",
            "name": "Bus",
            "type": "Vehicle",
            "extra": {"hp": 20},
            "prints": [{"setName": "Core", "cardNumber": "12", "isPrimary": true}]
        }))]);

        let path = store.save_cards(&library).await?;
        let written: Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
        assert_eq!(written[0]["prints"], json!([{"setId": "Core", "cardNumber": "12"}]));
        assert_eq!(written[0]["extra"]["hp"], 20.0);

        let reloaded = store.load_cards().await;
        assert_eq!(reloaded.origin, LoadOrigin::Source);
        assert_eq!(reloaded.data.cards(), library.cards());
        Ok(())
    }

    #[tokio::test]
    async fn malformed_precons_are_skipped() -> Result<()> {
        let dir = tempdir()?;
        let store = store_in(dir.path());
        write_source(
            &store,
            Dataset::Precons,
            r#"[{"name": "Starter", "cards": []}, 42, {"name": "Rally"}]"#,
        )?;

        let loaded = store.load_precons().await;
        assert_eq!(loaded.origin, LoadOrigin::Source);
        let names: Vec<&str> = loaded.data.iter().map(|precon| precon.name.as_str()).collect();
        assert_eq!(names, vec!["Starter", "Rally"]);

        let path = store.save_precons(&loaded.data).await?;
        assert!(path.ends_with("drive-precons.json"));
        Ok(())
    }
}
