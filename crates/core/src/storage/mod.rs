//! Persistence: dataset loading with cache fallback, saving, and change
//! notifications.

pub mod cache;
pub mod store;
pub mod watch;

pub use cache::{LocalCache, Snapshot};
pub use store::{DataStore, Dataset, LoadOrigin, Loaded};
pub use watch::{DataWatcher, WatchEvent};
