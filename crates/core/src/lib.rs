#![warn(clippy::all, missing_docs)]

//! Core domain logic for the DRIVE card admin.
//!
//! This crate hosts the card and precon models, the normalizer that turns
//! legacy or partial JSON into canonical cards, the editing and bulk import
//! paths, export, and the persistence layer used by the terminal editor.

pub mod config;
pub mod editor;
pub mod export;
pub mod fields;
pub mod import;
pub mod library;
pub mod models;
pub mod normalize;
pub mod storage;

pub use config::AppConfig;
pub use editor::{EditSession, FormField, PrintError, PrintSet};
pub use export::{export_cards, serialize_for_export};
pub use import::{parse_bulk, BulkImport, BulkOptions, Delimiter, HeaderMode};
pub use library::{Library, MergeSummary, ResolvedEntry, Upsert};
pub use models::{Card, Extra, Precon, PreconEntry, Print};
pub use normalize::normalize;
pub use storage::{DataStore, DataWatcher, Dataset, LoadOrigin, Loaded, WatchEvent};
