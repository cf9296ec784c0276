//! Generation results and rejection reasons.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use ankigen_model::Candidate;
use ankigen_store::StoredCard;
use serde::Serialize;

/// Longest front text shown in a summary line, in characters.
const PREVIEW_CHARS: usize = 60;

/// Why a candidate was not inserted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum RejectReason {
    /// Front or back text was blank.
    EmptyField,
    /// The candidate came after the request's card limit.
    OverLimit,
    /// An earlier candidate in the same batch had the same front.
    DuplicateInBatch,
    /// The store refused the insertion.
    StoreRejected(String),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::EmptyField => write!(f, "empty field"),
            RejectReason::OverLimit => write!(f, "over card limit"),
            RejectReason::DuplicateInBatch => write!(f, "duplicate"),
            RejectReason::StoreRejected(msg) => write!(f, "store rejected: {}", msg),
        }
    }
}

/// A candidate that was not inserted, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    /// The candidate as the model proposed it.
    pub candidate: Candidate,
    /// Why it was rejected.
    pub reason: RejectReason,
}

impl Rejection {
    pub(crate) fn new(candidate: Candidate, reason: RejectReason) -> Self {
        Self { candidate, reason }
    }
}

/// Outcome of one generation request.
///
/// Partial success is normal: some candidates may be inserted while others
/// are rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerationResult {
    /// Cards inserted, in model order.
    pub inserted: Vec<StoredCard>,
    /// Candidates that were not inserted.
    pub rejected: Vec<Rejection>,
    /// Decks that received at least one card.
    pub decks_touched: BTreeSet<String>,
    /// Decks that did not exist before this request.
    pub decks_created: BTreeSet<String>,
}

impl GenerationResult {
    /// Whether some, but not all, candidates were inserted.
    pub fn is_partial(&self) -> bool {
        !self.inserted.is_empty() && !self.rejected.is_empty()
    }

    /// Inserted cards grouped by deck.
    pub fn by_deck(&self) -> BTreeMap<&str, Vec<&StoredCard>> {
        let mut groups: BTreeMap<&str, Vec<&StoredCard>> = BTreeMap::new();
        for card in &self.inserted {
            groups.entry(card.deck.as_str()).or_default().push(card);
        }
        groups
    }

    /// Human-readable confirmation with a per-deck breakdown.
    pub fn summary(&self) -> String {
        if self.inserted.is_empty() && self.rejected.is_empty() {
            return "No flashcard-worthy content found in the provided text.".to_string();
        }

        let mut lines = vec![format!(
            "Created {} flashcard(s).",
            self.inserted.len()
        )];

        for (deck, cards) in self.by_deck() {
            let marker = if self.decks_created.contains(deck) {
                ", new deck"
            } else {
                ""
            };
            lines.push(String::new());
            lines.push(format!("Deck: {} ({} card(s){})", deck, cards.len(), marker));
            for card in cards {
                lines.push(format!("  - {}", preview(&card.front)));
            }
        }

        if !self.rejected.is_empty() {
            let mut counts: BTreeMap<String, usize> = BTreeMap::new();
            for rejection in &self.rejected {
                let label = match &rejection.reason {
                    RejectReason::StoreRejected(_) => "store error".to_string(),
                    reason => reason.to_string(),
                };
                *counts.entry(label).or_default() += 1;
            }
            let detail = counts
                .iter()
                .map(|(label, count)| format!("{} {}", count, label))
                .collect::<Vec<_>>()
                .join(", ");
            lines.push(String::new());
            lines.push(format!(
                "Skipped {} candidate(s): {}.",
                self.rejected.len(),
                detail
            ));
        }

        lines.join("\n")
    }
}

fn preview(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() > PREVIEW_CHARS {
        let cut: String = flat.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", cut)
    } else {
        flat
    }
}
