//! Candidate validation.
//!
//! Runs entirely after the model call and before any store write, so a bad
//! reply can at worst produce zero cards and a full rejection list.
//!
//! Steps, in order:
//!
//! 1. drop candidates with a blank front or back
//! 2. normalize the deck name, falling back to the default deck
//! 3. keep the first `max_cards` candidates (model order is confidence order)
//! 4. drop later candidates whose normalized front repeats an earlier one

use std::collections::HashSet;

use ankigen_model::Candidate;
use ankigen_store::normalize_deck_name;

use crate::result::{RejectReason, Rejection};

/// A candidate that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ValidCard {
    pub candidate: Candidate,
    pub deck: String,
}

/// Output of [`validate`].
#[derive(Debug, Default)]
pub(crate) struct Batch {
    pub accepted: Vec<ValidCard>,
    pub rejected: Vec<Rejection>,
}

/// Key used to detect duplicate fronts: lowercase, whitespace collapsed.
pub(crate) fn dedupe_key(front: &str) -> String {
    front
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

pub(crate) fn validate(candidates: Vec<Candidate>, max_cards: usize, default_deck: &str) -> Batch {
    let mut batch = Batch::default();
    let mut valid = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        if candidate.front.trim().is_empty() || candidate.back.trim().is_empty() {
            batch.rejected.push(Rejection::new(candidate, RejectReason::EmptyField));
            continue;
        }

        let deck = candidate
            .deck
            .as_deref()
            .map(normalize_deck_name)
            .filter(|deck| !deck.is_empty())
            .unwrap_or_else(|| normalize_deck_name(default_deck));

        valid.push(ValidCard { candidate, deck });
    }

    if valid.len() > max_cards {
        for card in valid.split_off(max_cards) {
            batch
                .rejected
                .push(Rejection::new(card.candidate, RejectReason::OverLimit));
        }
    }

    let mut seen = HashSet::new();
    for card in valid {
        if seen.insert(dedupe_key(&card.candidate.front)) {
            batch.accepted.push(card);
        } else {
            batch
                .rejected
                .push(Rejection::new(card.candidate, RejectReason::DuplicateInBatch));
        }
    }

    batch
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fronts(cards: &[ValidCard]) -> Vec<&str> {
        cards.iter().map(|c| c.candidate.front.as_str()).collect()
    }

    #[test]
    fn test_dedupe_key() {
        assert_eq!(dedupe_key("  What IS   a Stack? "), "what is a stack?");
    }

    #[test]
    fn test_all_valid_cards_accepted() {
        let candidates = vec![
            Candidate::new("Q1", "A1").deck("Math"),
            Candidate::new("Q2", "A2").deck("Math"),
        ];

        let batch = validate(candidates, 10, "Default");

        assert_eq!(fronts(&batch.accepted), vec!["Q1", "Q2"]);
        assert!(batch.rejected.is_empty());
    }

    #[test]
    fn test_empty_fields_rejected() {
        let candidates = vec![
            Candidate::new("", "A1"),
            Candidate::new("Q2", "   "),
            Candidate::new("Q3", "A3"),
        ];

        let batch = validate(candidates, 10, "Default");

        assert_eq!(fronts(&batch.accepted), vec!["Q3"]);
        assert_eq!(batch.rejected.len(), 2);
        assert!(
            batch
                .rejected
                .iter()
                .all(|r| r.reason == RejectReason::EmptyField)
        );
    }

    #[test]
    fn test_missing_deck_uses_default() {
        let candidates = vec![
            Candidate::new("Q1", "A1"),
            Candidate::new("Q2", "A2").deck("   "),
        ];

        let batch = validate(candidates, 10, "Default");

        assert!(batch.accepted.iter().all(|c| c.deck == "Default"));
    }

    #[test]
    fn test_deck_name_normalized() {
        let batch = validate(
            vec![Candidate::new("Q", "A").deck(" Biology ::Genetics ")],
            10,
            "Default",
        );

        assert_eq!(batch.accepted[0].deck, "Biology::Genetics");
    }

    #[test]
    fn test_truncates_keeping_model_order() {
        let candidates = (1..=5)
            .map(|i| Candidate::new(format!("Q{}", i), "A"))
            .collect();

        let batch = validate(candidates, 3, "Default");

        assert_eq!(fronts(&batch.accepted), vec!["Q1", "Q2", "Q3"]);
        assert_eq!(batch.rejected.len(), 2);
        assert!(
            batch
                .rejected
                .iter()
                .all(|r| r.reason == RejectReason::OverLimit)
        );
    }

    #[test]
    fn test_duplicates_first_wins_across_decks() {
        let candidates = vec![
            Candidate::new("What is a stack?", "LIFO").deck("Data Structures"),
            Candidate::new("what is   a STACK?", "Last in, first out").deck("Algorithms"),
            Candidate::new("What is a queue?", "FIFO").deck("Data Structures"),
        ];

        let batch = validate(candidates, 10, "Default");

        assert_eq!(
            fronts(&batch.accepted),
            vec!["What is a stack?", "What is a queue?"]
        );
        assert_eq!(batch.accepted[0].candidate.back, "LIFO");
        assert_eq!(batch.rejected.len(), 1);
        assert_eq!(batch.rejected[0].reason, RejectReason::DuplicateInBatch);
        assert_eq!(batch.rejected[0].candidate.back, "Last in, first out");
    }

    #[test]
    fn test_empty_candidates_do_not_count_toward_limit() {
        let candidates = vec![
            Candidate::new("", ""),
            Candidate::new("Q1", "A1"),
            Candidate::new("Q2", "A2"),
        ];

        let batch = validate(candidates, 2, "Default");

        assert_eq!(fronts(&batch.accepted), vec!["Q1", "Q2"]);
    }
}
