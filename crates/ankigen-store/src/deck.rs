//! Deck records and deck-name normalization.

use serde::Serialize;

use crate::error::{Error, Result};

/// Separator between levels of a deck hierarchy (`Parent::Child`).
pub const HIERARCHY_SEPARATOR: &str = "::";

/// A deck in the collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Deck {
    /// Store-assigned deck id.
    pub id: i64,
    /// Normalized deck name.
    pub name: String,
    /// Number of cards currently in the deck.
    pub card_count: usize,
}

/// Normalize a deck name for comparison and creation.
///
/// Each `::` level is trimmed and runs of whitespace collapse to a single
/// space. Empty levels are dropped, so `" Biology :: :: Genetics "` becomes
/// `"Biology::Genetics"`. Returns an empty string for a blank name.
///
/// # Example
///
/// ```
/// use ankigen_store::normalize_deck_name;
///
/// assert_eq!(normalize_deck_name("  Data   Structures "), "Data Structures");
/// assert_eq!(normalize_deck_name("Biology ::Genetics"), "Biology::Genetics");
/// assert_eq!(normalize_deck_name("   "), "");
/// ```
pub fn normalize_deck_name(name: &str) -> String {
    name.split(HIERARCHY_SEPARATOR)
        .map(|level| level.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|level| !level.is_empty())
        .collect::<Vec<_>>()
        .join(HIERARCHY_SEPARATOR)
}

/// Normalize a deck name and check that it can be stored.
///
/// Names that are blank after normalization, or that contain control
/// characters (the note field separator among them), are rejected.
pub fn validate_deck_name(name: &str) -> Result<String> {
    let normalized = normalize_deck_name(name);
    if normalized.is_empty() {
        return Err(Error::InvalidDeck(name.to_string()));
    }
    if normalized.chars().any(char::is_control) {
        return Err(Error::InvalidDeck(name.to_string()));
    }
    Ok(normalized)
}
