//! Error types for the model gateway.
//!
//! Every failure carries an [`ErrorClass`] so callers can tell the user
//! whether to fix their input, retry later, or check their credential.
//!
//! # Example
//!
//! ```no_run
//! use ankigen_model::{AnthropicClient, CardPrompt, Error, Generator};
//!
//! # async fn example() {
//! let client = AnthropicClient::builder().api_key("sk-ant-...").build();
//! let prompt = CardPrompt::new("Mitochondria produce ATP.");
//!
//! match client.generate(&prompt).await {
//!     Ok(cards) => println!("{} candidates", cards.len()),
//!     Err(Error::RateLimited { retry_after }) => {
//!         eprintln!("Slow down; retry after {:?}", retry_after);
//!     }
//!     Err(Error::AuthenticationFailed(msg)) => eprintln!("Bad key: {}", msg),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! # }
//! ```

use std::time::Duration;

use thiserror::Error;

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad category of a failure, as seen by the person using the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The request itself was wrong; retrying unchanged will not help.
    FixInput,
    /// A transient condition; the same request may succeed later.
    RetryLater,
    /// The API credential is missing or rejected.
    CheckCredential,
    /// Anything else.
    Internal,
}

impl ErrorClass {
    /// Short hint suitable for prefixing a user-facing message.
    pub fn hint(self) -> &'static str {
        match self {
            ErrorClass::FixInput => "fix the request and try again",
            ErrorClass::RetryLater => "try again later",
            ErrorClass::CheckCredential => "check your API credential",
            ErrorClass::Internal => "internal error",
        }
    }
}

/// Errors returned by a [`Generator`](crate::Generator).
#[derive(Debug, Error)]
pub enum Error {
    /// The API key is missing or was rejected (HTTP 401/403).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The provider is throttling requests (HTTP 429) or overloaded (529).
    #[error(
        "rate limited by model provider{}",
        .retry_after.map(|d| format!(" (retry after {}s)", d.as_secs())).unwrap_or_default()
    )]
    RateLimited {
        /// Delay requested by the provider, if it sent one.
        retry_after: Option<Duration>,
    },

    /// The provider returned an error status.
    #[error("model error (HTTP {status}): {message}")]
    ModelError {
        /// HTTP status code.
        status: u16,
        /// Error message from the provider.
        message: String,
    },

    /// The reply could not be parsed as a list of flashcards.
    #[error("malformed model output: {0}")]
    MalformedModelOutput(String),

    /// Network error, after the single retry.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Classify this error for the caller.
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::AuthenticationFailed(_) => ErrorClass::CheckCredential,
            Error::RateLimited { .. } => ErrorClass::RetryLater,
            Error::ModelError { status, .. } => match status {
                400 | 413 => ErrorClass::FixInput,
                500..=599 => ErrorClass::RetryLater,
                _ => ErrorClass::Internal,
            },
            Error::MalformedModelOutput(_) => ErrorClass::RetryLater,
            Error::Http(_) => ErrorClass::RetryLater,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_display_includes_delay() {
        let err = Error::RateLimited {
            retry_after: Some(Duration::from_secs(30)),
        };
        assert_eq!(
            err.to_string(),
            "rate limited by model provider (retry after 30s)"
        );

        let err = Error::RateLimited { retry_after: None };
        assert_eq!(err.to_string(), "rate limited by model provider");
    }

    #[test]
    fn test_classes() {
        assert_eq!(
            Error::AuthenticationFailed("nope".into()).class(),
            ErrorClass::CheckCredential
        );
        assert_eq!(
            Error::RateLimited { retry_after: None }.class(),
            ErrorClass::RetryLater
        );
        assert_eq!(
            Error::ModelError {
                status: 400,
                message: "prompt is too long".into()
            }
            .class(),
            ErrorClass::FixInput
        );
        assert_eq!(
            Error::ModelError {
                status: 503,
                message: "unavailable".into()
            }
            .class(),
            ErrorClass::RetryLater
        );
    }
}
