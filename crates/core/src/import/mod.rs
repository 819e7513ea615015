#![allow(missing_docs)]

//! Bulk import of delimited text.

pub mod bulk;
pub mod rows;

pub use bulk::{parse_bulk, split_row, BulkImport, BulkOptions, Delimiter, HeaderMode};
pub use rows::{field_for_header, map_row, normalize_header, RowField};
