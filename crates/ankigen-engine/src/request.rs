//! Generation requests and engine configuration.

use std::time::Duration;

/// Default number of cards per request.
pub const DEFAULT_MAX_CARDS: usize = 10;

/// Hard ceiling on cards per request.
pub const MAX_CARDS_CEILING: usize = 50;

/// Deck used when the model does not name one.
pub const DEFAULT_DECK: &str = "Default";

/// One request to turn content into flashcards.
///
/// # Example
///
/// ```
/// use ankigen_engine::GenerationRequest;
///
/// let request = GenerationRequest::new("The mitochondria is the powerhouse of the cell.")
///     .context("biology lecture")
///     .max_cards(3);
/// assert_eq!(request.max_cards, Some(3));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Text to extract flashcards from.
    pub content: String,
    /// Optional description of the conversation.
    pub context: Option<String>,
    /// Requested card limit. Out-of-range values are clamped, not rejected.
    pub max_cards: Option<i64>,
}

impl GenerationRequest {
    /// Create a request for `content` with the default limit.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            context: None,
            max_cards: None,
        }
    }

    /// Set the conversation context.
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Set the card limit.
    pub fn max_cards(mut self, max_cards: i64) -> Self {
        self.max_cards = Some(max_cards);
        self
    }
}

/// Engine settings, fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Limit used when a request does not give one.
    pub default_max_cards: usize,
    /// Largest limit a request may ask for.
    pub max_cards_ceiling: usize,
    /// Deck for candidates without a deck name.
    pub default_deck: String,
    /// Upper bound on the model call.
    pub generation_timeout: Duration,
    /// Convert Markdown in card fields to Anki HTML before storing.
    pub render_markdown: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_max_cards: DEFAULT_MAX_CARDS,
            max_cards_ceiling: MAX_CARDS_CEILING,
            default_deck: DEFAULT_DECK.to_string(),
            generation_timeout: Duration::from_secs(120),
            render_markdown: true,
        }
    }
}

impl EngineConfig {
    /// Clamp a requested limit into `[1, max_cards_ceiling]`.
    ///
    /// `None` means the default limit.
    pub fn clamp_max_cards(&self, requested: Option<i64>) -> usize {
        let ceiling = self.max_cards_ceiling.max(1);
        match requested {
            Some(n) => n.clamp(1, ceiling as i64) as usize,
            None => self.default_max_cards.clamp(1, ceiling),
        }
    }
}
