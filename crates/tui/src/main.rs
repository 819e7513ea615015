mod app;

use anyhow::Result;
use std::fs::{self, OpenOptions};

use drive_core::{
    config::{self, AppConfig},
    storage::{DataStore, DataWatcher},
};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    config::ensure_default_config()?;
    let config = AppConfig::load()?;
    info!(
        data_dir = %config.data_dir.display(),
        cache_dir = %config.cache_dir.display(),
        "configuration loaded"
    );

    let store = DataStore::new(config.clone());

    let (watch_tx, watch_rx) = mpsc::channel(16);
    let watcher = match DataWatcher::spawn(config.data_dir.clone(), watch_tx) {
        Ok(watcher) => Some(watcher),
        Err(err) => {
            warn!("file watcher unavailable: {err:#}");
            None
        }
    };

    let mut app = app::DriveAdminApp::new(store);
    if watcher.is_some() {
        app.attach_watcher(watch_rx);
    }
    let result = app.run().await;
    drop(watcher);
    result
}

fn init_logging() -> Result<()> {
    let log_dir = std::env::current_dir()?.join("logs");
    fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join("drive-admin.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(std::sync::Mutex::new(log_file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    Ok(())
}
