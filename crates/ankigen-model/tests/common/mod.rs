//! Common test utilities for gateway tests.

use std::time::Duration;

use ankigen_model::AnthropicClient;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate, Times};

/// Start a new mock server for testing.
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Create a client connected to the mock server.
pub fn client_for_mock(server: &MockServer) -> AnthropicClient {
    AnthropicClient::builder()
        .url(server.uri())
        .api_key("test-key")
        .retry_delay(Duration::from_millis(10))
        .build()
}

/// A successful Messages API response whose single text block is `text`.
pub fn mock_reply(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "id": "msg_test",
        "type": "message",
        "role": "assistant",
        "content": [{"type": "text", "text": text}],
        "stop_reason": "end_turn"
    }))
}

/// An error response in the provider's error format.
#[allow(dead_code)]
pub fn mock_error(status: u16, kind: &str, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(serde_json::json!({
        "type": "error",
        "error": {"type": kind, "message": message}
    }))
}

/// Mount a mock for the messages endpoint with an expected call count.
pub async fn mock_messages(server: &MockServer, response: ResponseTemplate, times: u64) {
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "test-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .respond_with(response)
        .expect(Times::from(times))
        .mount(server)
        .await;
}
