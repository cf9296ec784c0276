//! Prompt construction for flashcard extraction.

/// Everything the model needs to propose flashcards for one request.
///
/// # Example
///
/// ```
/// use ankigen_model::CardPrompt;
///
/// let prompt = CardPrompt::new("A stack is last-in, first-out.")
///     .context("intro data structures course")
///     .decks(["Data Structures", "Algorithms"])
///     .max_cards(5);
///
/// let text = prompt.render();
/// assert!(text.contains("\"Data Structures\""));
/// assert!(text.contains("at most 5"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardPrompt {
    /// Source text to extract cards from.
    pub content: String,
    /// Optional description of the conversation topic.
    pub context: Option<String>,
    /// Existing deck names, offered as categorization targets.
    pub decks: Vec<String>,
    /// Upper bound on cards the model should propose.
    pub max_cards: usize,
}

impl CardPrompt {
    /// Create a prompt for `content` with no context, no decks and a limit
    /// of 10 cards.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            context: None,
            decks: Vec::new(),
            max_cards: 10,
        }
    }

    /// Set the conversation context. Blank context is ignored.
    pub fn context(mut self, context: impl Into<String>) -> Self {
        let context = context.into();
        self.context = if context.trim().is_empty() {
            None
        } else {
            Some(context)
        };
        self
    }

    /// Set the existing deck names.
    pub fn decks<I, S>(mut self, decks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.decks = decks.into_iter().map(Into::into).collect();
        self
    }

    /// Set the card limit.
    pub fn max_cards(mut self, max_cards: usize) -> Self {
        self.max_cards = max_cards;
        self
    }

    /// Render the prompt text sent to the model.
    pub fn render(&self) -> String {
        let decks = if self.decks.is_empty() {
            "(none yet)".to_string()
        } else {
            self.decks
                .iter()
                .map(|deck| format!("\"{}\"", deck))
                .collect::<Vec<_>>()
                .join(", ")
        };

        let context = match &self.context {
            Some(context) => format!("\n**Additional context:** {}\n", context),
            None => String::new(),
        };

        format!(
            r#"You write Anki flashcards. Extract the key learning points from the content below and turn them into high-quality cards.

**Existing Anki decks:** {decks}

**Content:**
{content}
{context}
**Instructions:**
1. Pick out the concepts, facts, definitions, formulas, algorithms and terms worth memorizing.
2. Write at most {max} cards, most important first.
3. Front: a clear question or prompt (avoid yes/no questions). Back: a concise answer.
4. One concept per card. Use simple, precise language and add an example where it helps.
5. Put each card in the best-fitting existing deck. If none fits, propose a new deck name for the topic; use "::" for sub-decks (e.g. "Biology::Genetics").
6. Add a few short tags such as "definition", "formula", "algorithm" or "concept".

**Formatting:**
- Math uses LaTeX: \(...\) inline, \[...\] for display.
- Code uses Markdown code blocks with a language tag.

**Output format:**
Return a JSON array. Each element is an object with exactly these keys:
- "front": string
- "back": string
- "deck": string
- "tags": array of strings

Example:
[
  {{"front": "What is the time complexity of binary search?", "back": "O(log n), because each comparison halves the search space", "deck": "Algorithms", "tags": ["algorithm", "complexity"]}}
]

Return only the JSON array, with no other text. Return [] if nothing is worth memorizing."#,
            decks = decks,
            content = self.content,
            context = context,
            max = self.max_cards,
        )
    }
}
