//! Ordered, id-keyed collection of canonical cards.

use tracing::debug;

use crate::models::{Card, Precon};

/// What an upsert did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// The card was appended.
    Inserted,
    /// An existing entry at this position was replaced.
    Replaced(usize),
}

/// Counts from a bulk merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// Cards appended.
    pub added: usize,
    /// Existing cards replaced.
    pub updated: usize,
}

/// A precon entry paired with the card it references.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedEntry<'a> {
    /// Referenced id as stored in the deck.
    pub card_id: &'a str,
    /// Number of copies.
    pub count: u32,
    /// Library card, `None` when the id is unknown.
    pub card: Option<&'a Card>,
}

/// The card library. Entries are unique by id and keep insertion order.
#[derive(Debug, Clone, Default)]
pub struct Library {
    cards: Vec<Card>,
}

impl Library {
    /// Empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from already normalized cards, later duplicates replacing
    /// earlier ones.
    pub fn from_cards(cards: impl IntoIterator<Item = Card>) -> Self {
        let mut library = Self::new();
        for card in cards {
            library.upsert_by_id(card);
        }
        library
    }

    /// Replace the entry with the same id, else append.
    pub fn upsert_by_id(&mut self, card: Card) -> Upsert {
        match self.position_by_id(&card.id) {
            Some(index) => {
                self.cards[index] = card;
                Upsert::Replaced(index)
            }
            None => {
                self.cards.push(card);
                Upsert::Inserted
            }
        }
    }

    /// Bulk-import upsert: match by id, then by `(name, type)`, else append.
    ///
    /// A `(name, type)` match keeps the stored id, so re-imported rows with
    /// freshly generated ids overwrite the card they describe without breaking
    /// references to it.
    pub fn upsert_by_id_or_name_type(&mut self, mut card: Card) -> Upsert {
        if let Some(index) = self.position_by_id(&card.id) {
            self.cards[index] = card;
            return Upsert::Replaced(index);
        }
        let matched = self
            .cards
            .iter()
            .position(|existing| existing.same_identity(&card.name, &card.card_type));
        match matched {
            Some(index) => {
                card.id = self.cards[index].id.clone();
                self.cards[index] = card;
                Upsert::Replaced(index)
            }
            None => {
                self.cards.push(card);
                Upsert::Inserted
            }
        }
    }

    /// Merge a batch of imported cards.
    pub fn merge(&mut self, cards: impl IntoIterator<Item = Card>) -> MergeSummary {
        let mut summary = MergeSummary::default();
        for card in cards {
            match self.upsert_by_id_or_name_type(card) {
                Upsert::Inserted => summary.added += 1,
                Upsert::Replaced(_) => summary.updated += 1,
            }
        }
        debug!(
            added = summary.added,
            updated = summary.updated,
            "merged cards"
        );
        summary
    }

    /// Remove the card with `id`. Returns it if it was present.
    pub fn remove(&mut self, id: &str) -> Option<Card> {
        self.position_by_id(id).map(|index| self.cards.remove(index))
    }

    /// Card with `id`.
    pub fn find_by_id(&self, id: &str) -> Option<&Card> {
        self.cards.iter().find(|card| card.id == id)
    }

    /// Cards in library order.
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    /// Iterate over cards in library order.
    pub fn iter(&self) -> impl Iterator<Item = &Card> {
        self.cards.iter()
    }

    /// Number of cards.
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Whether the library has no cards.
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Cards matching a case-insensitive substring search over name, type,
    /// rarity, set, card number and tags.
    pub fn matching(&self, query: &str) -> Vec<&Card> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.cards.iter().collect();
        }
        self.cards
            .iter()
            .filter(|card| card_matches(card, &needle))
            .collect()
    }

    /// Pair each precon entry with its library card.
    pub fn resolve_precon<'a>(&'a self, precon: &'a Precon) -> Vec<ResolvedEntry<'a>> {
        precon
            .cards
            .iter()
            .map(|entry| ResolvedEntry {
                card_id: &entry.card_id,
                count: entry.count,
                card: self.find_by_id(&entry.card_id),
            })
            .collect()
    }

    fn position_by_id(&self, id: &str) -> Option<usize> {
        self.cards.iter().position(|card| card.id == id)
    }
}

fn card_matches(card: &Card, needle: &str) -> bool {
    [
        &card.name,
        &card.card_type,
        &card.rarity,
        &card.set_name,
        &card.card_number,
    ]
    .iter()
    .any(|value| value.to_lowercase().contains(needle))
        || card
            .tags
            .iter()
            .any(|tag| tag.to_lowercase().contains(needle))
}
