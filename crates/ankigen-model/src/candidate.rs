//! Flashcard candidates and parsing of the model's reply.
//!
//! The reply is untrusted text. It must contain a JSON array of objects;
//! individual fields are read leniently (numbers become strings, a tag string
//! is split into tags) and left for the caller to validate.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// A flashcard proposed by the model, not yet validated or stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Question side. May be empty if the model omitted it.
    #[serde(default, deserialize_with = "lenient_text")]
    pub front: String,
    /// Answer side. May be empty if the model omitted it.
    #[serde(default, deserialize_with = "lenient_text")]
    pub back: String,
    /// Deck the model chose, if any.
    #[serde(default, alias = "deck_name", deserialize_with = "lenient_deck")]
    pub deck: Option<String>,
    /// Tags suggested by the model.
    #[serde(default, deserialize_with = "lenient_tags")]
    pub tags: Vec<String>,
}

impl Candidate {
    /// Create a candidate with no deck and no tags.
    pub fn new(front: impl Into<String>, back: impl Into<String>) -> Self {
        Self {
            front: front.into(),
            back: back.into(),
            deck: None,
            tags: Vec::new(),
        }
    }

    /// Set the target deck.
    pub fn deck(mut self, deck: impl Into<String>) -> Self {
        self.deck = Some(deck.into());
        self
    }

    /// Set the tags.
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// Parse a model reply into candidates.
///
/// Accepts a bare JSON array or one wrapped in a Markdown code fence. If the
/// text has prose around the array, the span from the first `[` to the last
/// `]` is tried. Anything else is [`Error::MalformedModelOutput`].
pub fn parse_candidates(reply: &str) -> Result<Vec<Candidate>> {
    let text = strip_code_fence(reply.trim());

    let first_err = match serde_json::from_str::<Vec<Candidate>>(text) {
        Ok(candidates) => return Ok(candidates),
        Err(e) => e,
    };

    if let (Some(start), Some(end)) = (text.find('['), text.rfind(']')) {
        if start < end {
            if let Ok(candidates) = serde_json::from_str::<Vec<Candidate>>(&text[start..=end]) {
                return Ok(candidates);
            }
        }
    }

    Err(Error::MalformedModelOutput(first_err.to_string()))
}

/// Remove a surrounding ```` ``` ```` fence (with optional language tag).
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let body = match rest.split_once('\n') {
        Some((_lang, body)) => body,
        None => rest,
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

fn lenient_deck<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

fn lenient_tags<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Value::String(s) => s
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    })
}
