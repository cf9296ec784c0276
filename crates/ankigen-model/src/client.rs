//! The Anthropic Messages API client and builder.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use tracing::{debug, warn};

use crate::candidate::{Candidate, parse_candidates};
use crate::error::{Error, Result};
use crate::prompt::CardPrompt;
use crate::request::{API_VERSION, ErrorResponse, MessagesRequest, MessagesResponse};
use crate::Generator;

/// Default API base URL.
pub const DEFAULT_URL: &str = "https://api.anthropic.com";

/// Default model.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Default completion budget.
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Default timeout for a single HTTP attempt.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(90);

/// Default pause before the one retry of a transient network error.
const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Status the API uses when it is overloaded.
const STATUS_OVERLOADED: u16 = 529;

/// Client for the Anthropic Messages API.
///
/// Holds only the credential and endpoint configuration; every call is
/// independent.
///
/// # Example
///
/// ```no_run
/// use ankigen_model::{AnthropicClient, CardPrompt, Generator};
///
/// # async fn example() -> ankigen_model::Result<()> {
/// let client = AnthropicClient::builder()
///     .api_key(std::env::var("ANTHROPIC_API_KEY").unwrap_or_default())
///     .build();
///
/// let prompt = CardPrompt::new("TCP uses a three-way handshake: SYN, SYN-ACK, ACK.")
///     .decks(["Networking"]);
/// for card in client.generate(&prompt).await? {
///     println!("{} -> {}", card.front, card.back);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http_client: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    retry_delay: Duration,
}

impl AnthropicClient {
    /// Create a builder for client configuration.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// The model name requests are sent to.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send `prompt` as a single user message and return the reply text.
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        if self.api_key.trim().is_empty() {
            return Err(Error::AuthenticationFailed(
                "no API key configured".to_string(),
            ));
        }

        let request = MessagesRequest::new(&self.model, self.max_tokens, prompt);
        let response = match self.send(&request).await {
            Ok(response) => response,
            Err(e) if is_transient(&e) => {
                warn!(error = %e, delay_ms = self.retry_delay.as_millis() as u64, "Transient error, retrying once");
                tokio::time::sleep(self.retry_delay).await;
                self.send(&request).await?
            }
            Err(e) => return Err(Error::Http(e)),
        };

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(response).await);
        }

        let body = response.text().await?;
        let parsed: MessagesResponse = serde_json::from_str(&body).map_err(|e| {
            Error::MalformedModelOutput(format!("unexpected response body: {}", e))
        })?;

        parsed
            .text()
            .map(str::to_string)
            .ok_or_else(|| Error::MalformedModelOutput("reply contained no text".to_string()))
    }

    async fn send(&self, request: &MessagesRequest<'_>) -> reqwest::Result<Response> {
        self.http_client
            .post(format!("{}/v1/messages", self.base_url.trim_end_matches('/')))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(request)
            .send()
            .await
    }
}

impl Generator for AnthropicClient {
    async fn generate(&self, prompt: &CardPrompt) -> Result<Vec<Candidate>> {
        debug!(
            model = %self.model,
            content_len = prompt.content.len(),
            decks = prompt.decks.len(),
            max_cards = prompt.max_cards,
            "Requesting flashcards"
        );

        let reply = self.complete(&prompt.render()).await?;
        let candidates = parse_candidates(&reply)?;

        debug!(count = candidates.len(), "Parsed candidates");
        Ok(candidates)
    }
}

/// Connection failures and timeouts are worth one more attempt.
fn is_transient(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout() || err.is_request()
}

/// Map a non-success response to the error taxonomy.
async fn status_error(response: Response) -> Error {
    let status = response.status();
    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs);

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);

    warn!(status = status.as_u16(), message = %message, "Model provider returned an error");

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::AuthenticationFailed(message),
        StatusCode::TOO_MANY_REQUESTS => Error::RateLimited { retry_after },
        s if s.as_u16() == STATUS_OVERLOADED => Error::RateLimited { retry_after },
        s => Error::ModelError {
            status: s.as_u16(),
            message,
        },
    }
}

/// Builder for creating a customized [`AnthropicClient`].
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use ankigen_model::AnthropicClient;
///
/// let client = AnthropicClient::builder()
///     .api_key("sk-ant-example")
///     .model("claude-sonnet-4-20250514")
///     .timeout(Duration::from_secs(60))
///     .build();
/// assert_eq!(client.model(), "claude-sonnet-4-20250514");
/// ```
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    timeout: Duration,
    retry_delay: Duration,
}

impl ClientBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_URL.to_string(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: DEFAULT_TIMEOUT,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Set the API base URL.
    ///
    /// Defaults to `https://api.anthropic.com`.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the API key.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = key.into();
        self
    }

    /// Set the model name.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the completion token budget.
    ///
    /// Defaults to 4096.
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the timeout for one HTTP attempt.
    ///
    /// Defaults to 90 seconds.
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = duration;
        self
    }

    /// Set the pause before retrying a transient network error.
    ///
    /// Defaults to 500 milliseconds.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Build the client.
    pub fn build(self) -> AnthropicClient {
        let http_client = Client::builder()
            .timeout(self.timeout)
            .build()
            .unwrap_or_default();

        AnthropicClient {
            http_client,
            base_url: self.base_url,
            api_key: self.api_key,
            model: self.model,
            max_tokens: self.max_tokens,
            retry_delay: self.retry_delay,
        }
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let builder = ClientBuilder::new();
        assert_eq!(builder.base_url, DEFAULT_URL);
        assert_eq!(builder.model, DEFAULT_MODEL);
        assert_eq!(builder.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(builder.retry_delay, DEFAULT_RETRY_DELAY);
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_request() {
        let client = AnthropicClient::builder()
            .url("http://127.0.0.1:9")
            .build();

        let result = client.complete("hello").await;

        assert!(matches!(result, Err(Error::AuthenticationFailed(_))));
    }
}
