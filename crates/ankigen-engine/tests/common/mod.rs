//! Common test utilities for engine tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ankigen_engine::{Candidate, CardPrompt, Collection, Generator};
use ankigen_model::{Error, Result};
use tempfile::{TempDir, tempdir};

/// Open a fresh collection in a temporary directory.
pub fn temp_collection() -> (TempDir, Arc<Collection>) {
    let dir = tempdir().unwrap();
    let collection = Collection::open(dir.path().join("user1").join("collection.anki2")).unwrap();
    (dir, Arc::new(collection))
}

#[derive(Debug, Clone)]
enum Reply {
    Cards(Vec<Candidate>),
    Malformed,
    AuthFailure,
}

/// A scripted [`Generator`] that counts its calls and records prompts.
#[derive(Debug, Clone)]
pub struct StubGenerator {
    reply: Reply,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
    replies: Arc<AtomicUsize>,
    prompts: Arc<Mutex<Vec<CardPrompt>>>,
}

#[allow(dead_code)]
impl StubGenerator {
    /// Reply with `cards` on every call.
    pub fn cards(cards: Vec<Candidate>) -> Self {
        Self::with_reply(Reply::Cards(cards))
    }

    /// Reply with text that is not a list of cards.
    pub fn malformed() -> Self {
        Self::with_reply(Reply::Malformed)
    }

    /// Fail every call with a rejected credential.
    pub fn auth_failure() -> Self {
        Self::with_reply(Reply::AuthFailure)
    }

    fn with_reply(reply: Reply) -> Self {
        Self {
            reply,
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
            replies: Arc::new(AtomicUsize::new(0)),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Wait before replying.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of calls made so far, across clones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of calls that have finished waiting and replied.
    pub fn replies(&self) -> usize {
        self.replies.load(Ordering::SeqCst)
    }

    /// The most recent prompt received.
    pub fn last_prompt(&self) -> Option<CardPrompt> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

impl Generator for StubGenerator {
    async fn generate(&self, prompt: &CardPrompt) -> Result<Vec<Candidate>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.replies.fetch_add(1, Ordering::SeqCst);

        match &self.reply {
            Reply::Cards(cards) => Ok(cards.clone()),
            Reply::Malformed => Err(Error::MalformedModelOutput(
                "expected a JSON array of cards".into(),
            )),
            Reply::AuthFailure => Err(Error::AuthenticationFailed("invalid x-api-key".into())),
        }
    }
}

/// `n` distinct cards in `deck`.
#[allow(dead_code)]
pub fn numbered_cards(n: usize, deck: &str) -> Vec<Candidate> {
    (1..=n)
        .map(|i| Candidate::new(format!("Question {}", i), format!("Answer {}", i)).deck(deck))
        .collect()
}
