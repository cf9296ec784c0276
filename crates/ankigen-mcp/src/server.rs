//! MCP tool handlers.

use std::sync::Arc;

use ankigen_engine::{DEFAULT_MAX_CARDS, Engine, ErrorClass, GenerationRequest};
use ankigen_model::AnthropicClient;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::*,
    schemars, tool, tool_handler, tool_router,
};
use tracing::{debug, info, warn};

use crate::config::GenerationMode;

const GENERATE_TOOL: &str = "generate_flashcards";

// ============================================================================
// Parameter Types
// ============================================================================

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct GenerateParams {
    /// The text/conversation content to extract flashcards from. Include
    /// explanations, definitions, or concepts you just discussed.
    pub content: String,
    /// Optional context about the conversation topic or domain (e.g.,
    /// 'discussing Python programming', 'learning Spanish vocabulary')
    #[serde(default)]
    pub context: Option<String>,
    /// Maximum number of flashcards to generate (1-50, default: 10).
    /// Values outside the range are clamped.
    #[serde(default)]
    #[schemars(default = "default_max_cards", range(min = 1, max = 50))]
    pub max_cards: Option<i64>,
}

fn default_max_cards() -> Option<i64> {
    Some(DEFAULT_MAX_CARDS as i64)
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct CreateDeckParams {
    /// Name of the deck to create; use "::" for subdecks
    pub deck_name: String,
}

// ============================================================================
// Server Implementation
// ============================================================================

#[derive(Clone)]
pub struct FlashcardServer {
    engine: Arc<Engine<AnthropicClient>>,
    tool_router: ToolRouter<FlashcardServer>,
    mode: GenerationMode,
}

impl FlashcardServer {
    pub fn new(engine: Arc<Engine<AnthropicClient>>, mode: GenerationMode) -> Self {
        let mut tool_router = Self::tool_router();
        if let Some(route) = tool_router.map.get_mut(GENERATE_TOOL) {
            route.attr.description = Some(mode.tool_description().into());
        }
        Self {
            engine,
            tool_router,
            mode,
        }
    }
}

/// Map an engine error to a protocol error.
///
/// Input problems become `invalid_params`; everything else is an internal
/// error prefixed with what the user can do about it.
fn to_mcp_error(err: ankigen_engine::Error) -> McpError {
    match err.class() {
        ErrorClass::FixInput => McpError::invalid_params(err.to_string(), None),
        class => {
            warn!(error = %err, "Tool call failed");
            McpError::internal_error(format!("{}: {}", class.hint(), err), None)
        }
    }
}

#[tool_router]
impl FlashcardServer {
    #[tool(
        description = "List all available Anki decks. Use this to see what decks exist before generating flashcards, so you can categorize new cards correctly."
    )]
    async fn list_anki_decks(&self) -> Result<CallToolResult, McpError> {
        let decks = self.engine.decks().await.map_err(to_mcp_error)?;
        debug!(count = decks.len(), "Listed decks");

        let text = if decks.is_empty() {
            "No Anki decks yet. Generated cards will create decks as needed.".to_string()
        } else {
            let lines = decks
                .iter()
                .map(|deck| format!("  - {} ({} card(s))", deck.name, deck.card_count))
                .collect::<Vec<_>>()
                .join("\n");
            format!("Available Anki decks ({}):\n{}", decks.len(), lines)
        };

        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    #[tool(
        description = "Create a new Anki deck with a specific name. Use this when you need a new deck for organizing flashcards by topic."
    )]
    async fn create_anki_deck(
        &self,
        Parameters(params): Parameters<CreateDeckParams>,
    ) -> Result<CallToolResult, McpError> {
        debug!(deck = %params.deck_name, "Creating deck");

        let (deck, created) = self
            .engine
            .create_deck(&params.deck_name)
            .await
            .map_err(to_mcp_error)?;

        let text = if created {
            info!(deck = %deck.name, id = deck.id, "Deck created");
            format!("Created deck '{}'.", deck.name)
        } else {
            format!("Deck '{}' already exists.", deck.name)
        };
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    #[tool(
        description = "Generate Anki flashcards from conversation content. Only call this when the user explicitly asks for flashcards."
    )]
    async fn generate_flashcards(
        &self,
        Parameters(params): Parameters<GenerateParams>,
    ) -> Result<CallToolResult, McpError> {
        debug!(
            content_len = params.content.len(),
            max_cards = ?params.max_cards,
            "Generating flashcards"
        );

        let mut request = GenerationRequest::new(params.content);
        if let Some(context) = params.context {
            request = request.context(context);
        }
        if let Some(max_cards) = params.max_cards {
            request = request.max_cards(max_cards);
        }

        let result = self.engine.generate(request).await.map_err(to_mcp_error)?;

        Ok(CallToolResult::success(vec![Content::text(result.summary())]))
    }
}

#[tool_handler]
impl ServerHandler for FlashcardServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(self.mode.instructions().to_string()),
        }
    }
}
