//! Command-line arguments and their resolution into a [`ServerConfig`].

use std::path::PathBuf;
use std::time::Duration;

use ankigen_engine::{DEFAULT_MAX_CARDS, EngineConfig, MAX_CARDS_CEILING};
use clap::Parser;
use thiserror::Error;

/// File name of a collection inside a sync-server user directory.
const COLLECTION_FILE: &str = "collection.anki2";

/// MCP server that turns conversations into Anki flashcards.
#[derive(Parser, Debug)]
#[command(name = "ankigen-mcp")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Anthropic API key
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Anthropic API base URL
    #[arg(long, env = "ANTHROPIC_BASE_URL", default_value = ankigen_model::DEFAULT_URL)]
    pub api_url: String,

    /// Model used to write flashcards
    #[arg(long, env = "ANKIGEN_MODEL", default_value = ankigen_model::DEFAULT_MODEL)]
    pub model: String,

    /// Path to the collection file (overrides --sync-base/--sync-user)
    #[arg(long, env = "ANKIGEN_COLLECTION")]
    pub collection: Option<PathBuf>,

    /// Sync server data directory
    #[arg(long, env = "SYNC_BASE", default_value = "/syncserver")]
    pub sync_base: PathBuf,

    /// Sync server user as "username:password"
    #[arg(long, env = "SYNC_USER1", hide_env_values = true)]
    pub sync_user: Option<String>,

    /// Generation mode: proactive (true) or manual (false)
    #[arg(long, env = "AUTO_GENERATE", default_value = "proactive")]
    pub mode: GenerationMode,

    /// Most cards a single request may create
    #[arg(long, default_value_t = MAX_CARDS_CEILING)]
    pub max_cards: usize,

    /// Model call timeout in seconds
    #[arg(long, default_value_t = 120)]
    pub timeout: u64,

    /// Enable verbose logging (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Transport mode: stdio (default) or http
    #[arg(long, default_value = "stdio")]
    pub transport: Transport,

    /// HTTP server port (only used with --transport http)
    #[arg(long, env = "MCP_PORT", default_value_t = 3000)]
    pub http_port: u16,

    /// HTTP server bind address (only used with --transport http)
    #[arg(long, default_value = "127.0.0.1")]
    pub http_host: String,
}

/// Transport mode for the MCP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transport {
    /// Standard I/O transport (default, for CLI integration)
    #[default]
    Stdio,
    /// Streamable HTTP transport (for remote connections)
    Http,
}

impl std::str::FromStr for Transport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stdio" => Ok(Transport::Stdio),
            "http" => Ok(Transport::Http),
            _ => Err(format!("Invalid transport: {}. Use 'stdio' or 'http'", s)),
        }
    }
}

/// How the client is told to use `generate_flashcards`.
///
/// Only changes what the client is told; the server behaves the same way in
/// both modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenerationMode {
    /// The client should create cards whenever it explains something.
    #[default]
    Proactive,
    /// The client should create cards only when asked.
    Manual,
}

impl std::str::FromStr for GenerationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "proactive" | "true" | "1" | "yes" | "on" => Ok(GenerationMode::Proactive),
            "manual" | "false" | "0" | "no" | "off" => Ok(GenerationMode::Manual),
            _ => Err(format!(
                "Invalid mode: {}. Use 'proactive' or 'manual'",
                s
            )),
        }
    }
}

impl GenerationMode {
    /// Description of the `generate_flashcards` tool in this mode.
    pub fn tool_description(self) -> &'static str {
        match self {
            GenerationMode::Proactive => {
                "PROACTIVE MODE: Call this tool automatically whenever you explain:\n\
                 - New technical concepts, algorithms, or formulas\n\
                 - Definitions of terms, acronyms, or jargon\n\
                 - Important facts, dates, or relationships\n\
                 - Code patterns or best practices\n\
                 - Foreign language words or phrases\n\
                 - Mathematical equations or theorems\n\n\
                 The user wants to memorize what they learn. Generate flashcards \
                 during educational conversations without being explicitly asked."
            }
            GenerationMode::Manual => {
                "Generate Anki flashcards from conversation content. Only call this \
                 when the user explicitly asks for flashcards."
            }
        }
    }

    /// Server instructions sent to the client in this mode.
    pub fn instructions(self) -> &'static str {
        match self {
            GenerationMode::Proactive => {
                "Creates Anki flashcards from conversation content. Proactive mode: \
                 call generate_flashcards whenever you teach something worth remembering, \
                 without waiting to be asked. Call list_anki_decks first to see existing decks."
            }
            GenerationMode::Manual => {
                "Creates Anki flashcards from conversation content. Manual mode: \
                 call generate_flashcards only when the user explicitly asks for flashcards. \
                 Call list_anki_decks first to see existing decks."
            }
        }
    }
}

/// Errors resolving the command line into a [`ServerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No API key was given.
    #[error("an Anthropic API key is required (--api-key or ANTHROPIC_API_KEY)")]
    MissingApiKey,

    /// Neither a collection path nor a sync user was given.
    #[error("no collection configured: set --collection (ANKIGEN_COLLECTION) or --sync-user (SYNC_USER1)")]
    MissingCollection,

    /// The sync user was not in `username:password` form.
    #[error("sync user must be in the form 'username:password'")]
    InvalidSyncUser,

    /// The card ceiling was zero.
    #[error("--max-cards must be at least 1")]
    InvalidMaxCards,
}

/// Fully resolved server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Collection file to open.
    pub collection_path: PathBuf,
    /// Anthropic API key.
    pub api_key: String,
    /// Anthropic API base URL.
    pub api_url: String,
    /// Model name.
    pub model: String,
    /// What the client is told about when to generate.
    pub mode: GenerationMode,
    /// Engine settings.
    pub engine: EngineConfig,
}

impl ServerConfig {
    /// Resolve parsed arguments.
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        let api_key = args
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingApiKey)?
            .to_string();

        let collection_path = match (&args.collection, &args.sync_user) {
            (Some(path), _) => path.clone(),
            (None, Some(user)) => {
                let username = sync_username(user)?;
                args.sync_base.join(username).join(COLLECTION_FILE)
            }
            (None, None) => return Err(ConfigError::MissingCollection),
        };

        if args.max_cards == 0 {
            return Err(ConfigError::InvalidMaxCards);
        }

        let engine = EngineConfig {
            default_max_cards: DEFAULT_MAX_CARDS.min(args.max_cards),
            max_cards_ceiling: args.max_cards,
            generation_timeout: Duration::from_secs(args.timeout.max(1)),
            ..EngineConfig::default()
        };

        Ok(Self {
            collection_path,
            api_key,
            api_url: args.api_url.clone(),
            model: args.model.clone(),
            mode: args.mode,
            engine,
        })
    }
}

/// Username part of a `username:password` sync user.
fn sync_username(user: &str) -> Result<&str, ConfigError> {
    match user.split_once(':') {
        Some((name, _)) if !name.trim().is_empty() => Ok(name.trim()),
        _ => Err(ConfigError::InvalidSyncUser),
    }
}
