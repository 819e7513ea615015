//! Editing state for the card currently open in the editor.

/// Print list manipulation with primary-flag bookkeeping.
pub mod prints;
/// Form inputs and their conversion into a raw card.
pub mod session;

pub use prints::{PrintError, PrintSet};
pub use session::{CardForm, EditSession, FormField};
