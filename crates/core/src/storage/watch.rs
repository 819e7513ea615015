//! File watcher reporting on-disk changes to the dataset files.

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::debug;

use super::store::Dataset;

/// Events emitted by [`DataWatcher`].
#[derive(Debug)]
pub enum WatchEvent {
    /// A dataset file was created, modified or removed.
    Changed(Dataset),
    /// The watcher backend reported an error.
    Error(anyhow::Error),
}

/// Watches the output directory for changes to the dataset files. Stops when
/// dropped.
pub struct DataWatcher {
    dir: PathBuf,
    _watcher: RecommendedWatcher,
}

impl DataWatcher {
    /// Start watching `dir`, creating it when missing.
    pub fn spawn(dir: impl Into<PathBuf>, sender: mpsc::Sender<WatchEvent>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;

        let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
            for event in classify(result) {
                if sender.blocking_send(event).is_err() {
                    break;
                }
            }
        })
        .context("failed to create file watcher")?;
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("failed to watch {}", dir.display()))?;
        debug!(dir = %dir.display(), "watching dataset directory");

        Ok(Self {
            dir,
            _watcher: watcher,
        })
    }

    /// Watched directory.
    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }
}

fn classify(result: notify::Result<Event>) -> Vec<WatchEvent> {
    let event = match result {
        Ok(event) => event,
        Err(err) => return vec![WatchEvent::Error(err.into())],
    };
    if !matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) {
        return Vec::new();
    }

    let mut changed: Vec<Dataset> = Vec::new();
    for path in &event.paths {
        let dataset = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(Dataset::from_file_name);
        if let Some(dataset) = dataset {
            if !changed.contains(&dataset) {
                changed.push(dataset);
            }
        }
    }
    changed.into_iter().map(WatchEvent::Changed).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, ModifyKind};

    fn changed(events: Vec<WatchEvent>) -> Vec<Dataset> {
        events
            .into_iter()
            .filter_map(|event| match event {
                WatchEvent::Changed(dataset) => Some(dataset),
                WatchEvent::Error(_) => None,
            })
            .collect()
    }

    #[test]
    fn reports_dataset_files_once() {
        let event = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(PathBuf::from("/data/drive-card.json"))
            .add_path(PathBuf::from("/data/drive-card.json"))
            .add_path(PathBuf::from("/data/notes.txt"));
        assert_eq!(changed(classify(Ok(event))), vec![Dataset::Cards]);

        let event = Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/data/drive-precons.json"));
        assert_eq!(changed(classify(Ok(event))), vec![Dataset::Precons]);
    }

    #[test]
    fn ignores_reads() {
        let event = Event::new(EventKind::Access(AccessKind::Any))
            .add_path(PathBuf::from("/data/drive-card.json"));
        assert!(classify(Ok(event)).is_empty());
    }

    #[test]
    fn forwards_backend_errors() {
        let events = classify(Err(notify::Error::generic("backend gone")));
        assert!(matches!(events.as_slice(), [WatchEvent::Error(_)]));
    }
}
