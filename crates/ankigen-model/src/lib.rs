//! Flashcard generation through an external language model.
//!
//! This crate isolates everything about talking to the model provider:
//! building the prompt, sending it, classifying failures, and parsing the
//! untrusted reply into [`Candidate`] flashcards.
//!
//! The [`Generator`] trait is the seam between the extraction engine and the
//! provider. [`AnthropicClient`] implements it against the Anthropic Messages
//! API; tests substitute a deterministic implementation.
//!
//! # Quick Start
//!
//! ```no_run
//! use ankigen_model::{AnthropicClient, CardPrompt, Generator};
//!
//! # async fn example() -> ankigen_model::Result<()> {
//! let client = AnthropicClient::builder().api_key("sk-ant-...").build();
//!
//! let prompt = CardPrompt::new("Photosynthesis converts light energy into chemical energy.")
//!     .context("high school biology")
//!     .decks(["Biology"])
//!     .max_cards(5);
//!
//! let candidates = client.generate(&prompt).await?;
//! println!("Model proposed {} cards", candidates.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Retries
//!
//! A request that fails with a connection error or timeout is retried once
//! after a short delay. Authentication failures, rate limiting and provider
//! error statuses are returned immediately.

mod candidate;
mod client;
mod error;
mod prompt;
mod request;

use std::future::Future;

pub use candidate::{Candidate, parse_candidates};
pub use client::{AnthropicClient, ClientBuilder, DEFAULT_MODEL, DEFAULT_URL};
pub use error::{Error, ErrorClass, Result};
pub use prompt::CardPrompt;

/// Something that turns a [`CardPrompt`] into flashcard candidates.
///
/// Implementations must be stateless per call: no state may carry over from
/// one request to the next beyond configuration.
pub trait Generator: Send + Sync {
    /// Ask the model for flashcards.
    ///
    /// Returns the candidates in the model's order, unvalidated. A reply
    /// that is not a list of objects is [`Error::MalformedModelOutput`].
    fn generate(&self, prompt: &CardPrompt) -> impl Future<Output = Result<Vec<Candidate>>> + Send;
}

impl<G: Generator> Generator for std::sync::Arc<G> {
    fn generate(&self, prompt: &CardPrompt) -> impl Future<Output = Result<Vec<Candidate>>> + Send {
        (**self).generate(prompt)
    }
}
