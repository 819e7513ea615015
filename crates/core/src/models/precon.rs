use serde::{Deserialize, Serialize};

/// Preconstructed deck: a named list of card references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Precon {
    /// Deck name.
    #[serde(default)]
    pub name: String,
    /// Free-text blurb shown under the name.
    #[serde(default)]
    pub description: String,
    /// Card references with copy counts.
    #[serde(default)]
    pub cards: Vec<PreconEntry>,
}

impl Precon {
    /// Total number of cards in the deck.
    pub fn total_cards(&self) -> u32 {
        self.cards.iter().map(|entry| entry.count).sum()
    }
}

/// A `(cardId, count)` reference into the library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreconEntry {
    /// Id of the referenced library card.
    pub card_id: String,
    /// Number of copies.
    #[serde(default = "default_count")]
    pub count: u32,
}

fn default_count() -> u32 {
    1
}
