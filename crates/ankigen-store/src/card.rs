//! Stored card records and the helpers used to encode them as Anki notes.

use std::collections::BTreeSet;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::Serialize;

/// A flashcard persisted in the collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredCard {
    /// Note id assigned by the store.
    pub note_id: i64,
    /// Card id assigned by the store.
    pub card_id: i64,
    /// Deck the card was inserted into.
    pub deck: String,
    /// Front (question) field.
    pub front: String,
    /// Back (answer) field.
    pub back: String,
    /// Tags, deduplicated and sorted.
    pub tags: BTreeSet<String>,
    /// Creation time in milliseconds since the Unix epoch, at the one-second
    /// resolution of the note's `mod` column.
    pub created_ms: i64,
}

/// Clean a tag list into the set Anki can store.
///
/// Anki tags cannot contain spaces, so inner whitespace becomes `_`.
/// Blank tags are dropped and duplicates collapse.
pub fn clean_tags<I, S>(tags: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .map(|tag| tag.as_ref().split_whitespace().collect::<Vec<_>>().join("_"))
        .filter(|tag| !tag.is_empty())
        .collect()
}

/// Encode tags in Anki's space-padded column format (`" a b "`).
pub(crate) fn tags_column(tags: &BTreeSet<String>) -> String {
    if tags.is_empty() {
        return String::new();
    }
    let joined = tags.iter().map(String::as_str).collect::<Vec<_>>().join(" ");
    format!(" {} ", joined)
}

/// Decode Anki's tag column back into a set.
pub(crate) fn parse_tags_column(column: &str) -> BTreeSet<String> {
    column.split_whitespace().map(str::to_string).collect()
}

/// Generate a GUID for a note.
pub(crate) fn generate_guid(note_id: i64) -> String {
    // Base91 alphabet used by Anki
    const CHARS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz!#$%&()*+,-./:;<=>?@[]^_`{|}~";
    let mut n = note_id as u64;
    let mut result = String::new();
    while n > 0 {
        result.push(CHARS[(n % 91) as usize] as char);
        n /= 91;
    }
    result
}

/// Checksum of the sort field, used by Anki for duplicate lookups.
pub(crate) fn field_checksum(sort_field: &str) -> i64 {
    let text = strip_html(sort_field);
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    (hasher.finish() & 0xFFFF_FFFF) as i64
}

fn strip_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut in_tag = false;

    for c in s.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(c),
            _ => {}
        }
    }

    result
}
