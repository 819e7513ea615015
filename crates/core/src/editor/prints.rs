use thiserror::Error;

use crate::models::Print;

/// Rejected print edits. The list is left untouched when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrintError {
    /// Both the set name and the card number were blank.
    #[error("enter a set name or a card number before adding a print")]
    Empty,
    /// The index does not point at an existing print.
    #[error("print {index} does not exist ({len} prints)")]
    OutOfRange {
        /// Requested position.
        index: usize,
        /// Current list length.
        len: usize,
    },
}

/// In-progress prints of the card being edited.
///
/// Unlike a normalized card, entries keep the order they were added in; the
/// primary flag alone marks which print feeds the flat fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrintSet {
    prints: Vec<Print>,
}

impl PrintSet {
    /// Empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing card's prints.
    pub fn from_prints(prints: &[Print]) -> Self {
        Self {
            prints: prints.to_vec(),
        }
    }

    /// Append a print. The first print added to an empty list is primary.
    pub fn add(&mut self, set_name: &str, card_number: &str) -> Result<&Print, PrintError> {
        let set_name = set_name.trim();
        let card_number = card_number.trim();
        if set_name.is_empty() && card_number.is_empty() {
            return Err(PrintError::Empty);
        }
        let is_first = self.prints.is_empty();
        self.prints.push(Print::new(set_name, card_number, is_first));
        Ok(&self.prints[self.prints.len() - 1])
    }

    /// Remove the print at `index`. Removing the primary promotes the new
    /// first entry.
    pub fn remove(&mut self, index: usize) -> Result<Print, PrintError> {
        self.check(index)?;
        let removed = self.prints.remove(index);
        if removed.is_primary {
            if let Some(first) = self.prints.first_mut() {
                first.is_primary = true;
            }
        }
        Ok(removed)
    }

    /// Make the print at `index` the only primary one.
    pub fn set_primary(&mut self, index: usize) -> Result<(), PrintError> {
        self.check(index)?;
        for (position, print) in self.prints.iter_mut().enumerate() {
            print.is_primary = position == index;
        }
        Ok(())
    }

    /// Drop every print.
    pub fn clear(&mut self) {
        self.prints.clear();
    }

    /// The print flagged primary, if any.
    pub fn primary(&self) -> Option<&Print> {
        self.prints.iter().find(|print| print.is_primary)
    }

    /// Current prints in insertion order.
    pub fn as_slice(&self) -> &[Print] {
        &self.prints
    }

    /// Number of prints.
    pub fn len(&self) -> usize {
        self.prints.len()
    }

    /// Whether no print has been added.
    pub fn is_empty(&self) -> bool {
        self.prints.is_empty()
    }

    fn check(&self, index: usize) -> Result<(), PrintError> {
        if index < self.prints.len() {
            Ok(())
        } else {
            Err(PrintError::OutOfRange {
                index,
                len: self.prints.len(),
            })
        }
    }
}
