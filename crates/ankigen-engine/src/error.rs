//! Error types for ankigen-engine.
//!
//! Errors fall into three groups:
//!
//! 1. **Input errors**: [`Error::InvalidArgument`], raised before any store
//!    read or model call
//! 2. **Model errors**: wrapped from [`ankigen_model::Error`], plus
//!    [`Error::Timeout`]; these abort the request with no store mutation
//! 3. **Store errors**: wrapped from [`ankigen_store::Error`]
//!
//! Problems with individual candidates are not errors; they are reported as
//! rejections in the [`GenerationResult`](crate::GenerationResult).
//!
//! # Example
//!
//! ```no_run
//! use ankigen_engine::{Error, ErrorClass, GenerationRequest};
//!
//! # async fn example(engine: ankigen_engine::Engine<ankigen_model::AnthropicClient>) {
//! match engine.generate(GenerationRequest::new("")).await {
//!     Ok(result) => println!("{}", result.summary()),
//!     Err(e) if e.class() == ErrorClass::FixInput => eprintln!("Bad input: {}", e),
//!     Err(e) => eprintln!("{}: {}", e.class().hint(), e),
//! }
//! # }
//! ```

use std::time::Duration;

use ankigen_model::ErrorClass;
use thiserror::Error;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The caller supplied empty or malformed input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A collection store error.
    #[error(transparent)]
    Store(#[from] ankigen_store::Error),

    /// A model gateway error.
    #[error(transparent)]
    Model(#[from] ankigen_model::Error),

    /// The model did not answer within the configured time.
    #[error("model call timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// A background store task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl Error {
    /// Classify this error for the caller.
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::InvalidArgument(_) => ErrorClass::FixInput,
            Error::Store(ankigen_store::Error::InvalidDeck(_))
            | Error::Store(ankigen_store::Error::EmptyField(_)) => ErrorClass::FixInput,
            Error::Store(ankigen_store::Error::StoreUnavailable(_)) => ErrorClass::RetryLater,
            Error::Store(_) => ErrorClass::Internal,
            Error::Model(e) => e.class(),
            Error::Timeout(_) => ErrorClass::RetryLater,
            Error::Join(_) => ErrorClass::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classes() {
        assert_eq!(
            Error::InvalidArgument("content".into()).class(),
            ErrorClass::FixInput
        );
        assert_eq!(
            Error::Store(ankigen_store::Error::StoreUnavailable("locked".into())).class(),
            ErrorClass::RetryLater
        );
        assert_eq!(
            Error::Model(ankigen_model::Error::AuthenticationFailed("bad key".into())).class(),
            ErrorClass::CheckCredential
        );
        assert_eq!(
            Error::Timeout(Duration::from_secs(1)).class(),
            ErrorClass::RetryLater
        );
    }

    #[test]
    fn test_timeout_display() {
        assert_eq!(
            Error::Timeout(Duration::from_secs(120)).to_string(),
            "model call timed out after 120s"
        );
    }
}
