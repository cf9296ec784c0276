//! MCP server that turns conversations into Anki flashcards.
//!
//! Exposes three tools to an AI client: `list_anki_decks`,
//! `create_anki_deck` and `generate_flashcards`. Cards are written straight
//! into an Anki collection file, typically one served by a sync server.

mod config;
mod server;

use std::sync::Arc;

use ankigen_engine::{Collection, Engine};
use ankigen_model::AnthropicClient;
use clap::Parser;
use rmcp::ServiceExt;
use tracing::{info, warn};

use config::{Args, ServerConfig, Transport};
use server::FlashcardServer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize tracing
    let log_level = match args.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .init();

    let config = ServerConfig::from_args(&args)?;
    info!(
        collection = %config.collection_path.display(),
        model = %config.model,
        mode = ?config.mode,
        transport = ?args.transport,
        "Starting ankigen-mcp server"
    );

    if !config.collection_path.exists() {
        warn!(
            collection = %config.collection_path.display(),
            "Collection not found, creating an empty one"
        );
    }
    let store = Collection::open(&config.collection_path)?;

    let client = AnthropicClient::builder()
        .url(&config.api_url)
        .api_key(&config.api_key)
        .model(&config.model)
        .build();
    let engine = Engine::with_config(Arc::new(store), client, config.engine.clone());
    let server = FlashcardServer::new(Arc::new(engine), config.mode);

    match args.transport {
        Transport::Stdio => {
            let transport = (tokio::io::stdin(), tokio::io::stdout());
            let mcp_server = server.serve(transport).await?;
            mcp_server.waiting().await?;
        }
        Transport::Http => {
            use rmcp::transport::streamable_http_server::{
                StreamableHttpServerConfig, StreamableHttpService,
                session::local::LocalSessionManager,
            };

            let bind_addr = format!("{}:{}", args.http_host, args.http_port);
            info!(bind_addr = %bind_addr, "Starting HTTP transport");

            let service: StreamableHttpService<FlashcardServer, LocalSessionManager> =
                StreamableHttpService::new(
                    move || Ok(server.clone()),
                    Arc::new(LocalSessionManager::default()),
                    StreamableHttpServerConfig::default(),
                );

            let router = axum::Router::new().nest_service("/mcp", service);
            let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
            info!(bind_addr = %bind_addr, "MCP server listening on HTTP");

            axum::serve(listener, router).await?;
        }
    }

    Ok(())
}
