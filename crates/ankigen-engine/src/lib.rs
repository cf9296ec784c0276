//! Turns conversation text into validated, deck-assigned Anki flashcards.
//!
//! The [`Engine`] ties a [`Collection`] to a [`Generator`]: it reads the
//! existing deck names, asks the model for candidates, validates them, and
//! inserts the survivors. Nothing is written unless the model reply parses.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use ankigen_engine::{Collection, Engine, GenerationRequest};
//! use ankigen_model::AnthropicClient;
//!
//! # async fn example() -> ankigen_engine::Result<()> {
//! let store = Arc::new(Collection::open("/syncserver/user1/collection.anki2")?);
//! let client = AnthropicClient::builder().api_key("sk-ant-...").build();
//! let engine = Engine::new(store, client);
//!
//! let result = engine
//!     .generate(GenerationRequest::new("A binary search tree keeps smaller keys on the left."))
//!     .await?;
//! println!("{}", result.summary());
//! # Ok(())
//! # }
//! ```

mod error;
pub mod markdown;
mod request;
mod result;
mod validate;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

pub use ankigen_model::{Candidate, CardPrompt, ErrorClass, Generator};
pub use ankigen_store::{Collection, Deck, StoredCard};
pub use error::{Error, Result};
pub use request::{DEFAULT_DECK, DEFAULT_MAX_CARDS, EngineConfig, GenerationRequest, MAX_CARDS_CEILING};
pub use result::{GenerationResult, RejectReason, Rejection};

use validate::{Batch, validate};

/// Flashcard extraction engine.
///
/// Cheap to share behind an `Arc`; concurrent requests serialize only at the
/// store.
#[derive(Debug)]
pub struct Engine<G> {
    store: Arc<Collection>,
    generator: G,
    config: EngineConfig,
}

impl<G: Generator> Engine<G> {
    /// Create an engine with the default configuration.
    pub fn new(store: Arc<Collection>, generator: G) -> Self {
        Self::with_config(store, generator, EngineConfig::default())
    }

    /// Create an engine with a custom configuration.
    pub fn with_config(store: Arc<Collection>, generator: G, config: EngineConfig) -> Self {
        Self {
            store,
            generator,
            config,
        }
    }

    /// The engine's configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The underlying collection.
    pub fn store(&self) -> &Arc<Collection> {
        &self.store
    }

    /// Generate flashcards from `request.content` and store them.
    ///
    /// Fails without touching the store if the content is blank, the model
    /// call fails or times out, or the reply is not a list of cards.
    /// Individual bad candidates are reported in
    /// [`GenerationResult::rejected`] instead.
    ///
    /// Once the reply is validated, insertion runs on a blocking task that
    /// finishes even if this future is dropped.
    pub async fn generate(&self, request: GenerationRequest) -> Result<GenerationResult> {
        if request.content.trim().is_empty() {
            return Err(Error::InvalidArgument("content must not be empty".into()));
        }
        let max_cards = self.config.clamp_max_cards(request.max_cards);

        let decks = self.blocking(|store| store.list_decks()).await?;
        debug!(existing_decks = decks.len(), max_cards, "Building prompt");

        let mut prompt = CardPrompt::new(request.content)
            .decks(decks)
            .max_cards(max_cards);
        if let Some(context) = request.context.filter(|c| !c.trim().is_empty()) {
            prompt = prompt.context(context);
        }

        let started = Instant::now();
        let candidates = tokio::time::timeout(
            self.config.generation_timeout,
            self.generator.generate(&prompt),
        )
        .await
        .map_err(|_| Error::Timeout(self.config.generation_timeout))??;
        info!(
            candidates = candidates.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Model replied"
        );

        let batch = validate(candidates, max_cards, &self.config.default_deck);
        let store = Arc::clone(&self.store);
        let render = self.config.render_markdown;
        let result = tokio::task::spawn_blocking(move || insert_batch(&store, batch, render)).await?;

        info!(
            inserted = result.inserted.len(),
            rejected = result.rejected.len(),
            decks_created = result.decks_created.len(),
            "Generation complete"
        );
        Ok(result)
    }

    /// Names of all decks in the collection.
    pub async fn list_decks(&self) -> Result<BTreeSet<String>> {
        self.blocking(|store| store.list_decks()).await
    }

    /// All decks with their card counts, sorted by name.
    pub async fn decks(&self) -> Result<Vec<Deck>> {
        self.blocking(|store| store.decks()).await
    }

    /// Create a deck if it does not exist.
    ///
    /// Returns the deck and whether it was newly created.
    pub async fn create_deck(&self, name: &str) -> Result<(Deck, bool)> {
        let name = ankigen_store::normalize_deck_name(name);
        if name.is_empty() {
            return Err(Error::InvalidArgument("deck name must not be empty".into()));
        }
        self.blocking(move |store| store.ensure_deck(&name)).await
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Collection) -> ankigen_store::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        Ok(tokio::task::spawn_blocking(move || f(&store)).await??)
    }
}

fn insert_batch(store: &Collection, batch: Batch, render_markdown: bool) -> GenerationResult {
    let mut result = GenerationResult {
        rejected: batch.rejected,
        ..GenerationResult::default()
    };

    for card in batch.accepted {
        let (front, back) = if render_markdown {
            (
                markdown::render_field(&card.candidate.front),
                markdown::render_field(&card.candidate.back),
            )
        } else {
            (card.candidate.front.clone(), card.candidate.back.clone())
        };

        match store.insert_card(&card.deck, &front, &back, &card.candidate.tags) {
            Ok((stored, deck_created)) => {
                if deck_created {
                    result.decks_created.insert(stored.deck.clone());
                }
                result.decks_touched.insert(stored.deck.clone());
                result.inserted.push(stored);
            }
            Err(e) => {
                warn!(deck = %card.deck, error = %e, "Card insert failed");
                result
                    .rejected
                    .push(Rejection::new(card.candidate, RejectReason::StoreRejected(e.to_string())));
            }
        }
    }

    result
}
