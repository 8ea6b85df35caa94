use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mcp_support_router::{
    agents::{Collaborators, QueryRouter},
    config::{Config, LogFormat},
    data::SqliteGateway,
    knowledge::{KnowledgeIndex, OpenAiEmbedder},
    langbase::LangbaseClient,
    server::{tool_definitions, AppState, McpServer},
    storage::SqliteStorage,
    tickets,
};

/// MCP server that answers player support questions.
#[derive(Parser, Debug)]
#[command(name = "mcp-support-router", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// Serve MCP requests on stdin/stdout (default)
    Serve,

    /// Create or update every configured Langbase pipe, then exit
    SyncPipes,

    /// Print the MCP tool definitions as JSON, then exit
    Tools,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Some(Commands::Tools) = cli.command {
        println!("{}", serde_json::to_string_pretty(&tool_definitions())?);
        return Ok(());
    }

    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "MCP Support Router starting..."
    );

    let langbase = match LangbaseClient::new(&config.langbase, config.request.clone()) {
        Ok(c) => {
            info!(base_url = %config.langbase.base_url, "Langbase client initialized");
            c
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize Langbase client");
            return Err(e.into());
        }
    };

    if let Some(Commands::SyncPipes) = cli.command {
        langbase.ensure_support_pipes(&config.pipes).await?;
        info!("All support pipes are in place");
        return Ok(());
    }

    // Pipes that already exist keep working even if the upsert fails
    if let Err(e) = langbase.ensure_support_pipes(&config.pipes).await {
        warn!(error = %e, "Failed to ensure support pipes exist, continuing with existing pipes");
    }

    let storage = match SqliteStorage::new(&config.database).await {
        Ok(s) => {
            info!(path = %config.database.path.display(), "Database initialized");
            Arc::new(s)
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize database");
            return Err(e.into());
        }
    };

    let gateway = match SqliteGateway::connect(&config.data_source).await {
        Ok(g) => g,
        Err(e) => {
            error!(error = %e, path = %config.data_source.path.display(), "Failed to open game data");
            return Err(e.into());
        }
    };

    let embedder = Arc::new(OpenAiEmbedder::new(&config.knowledge, &config.request)?);
    let index = match KnowledgeIndex::from_file(&config.knowledge.path, embedder).await {
        Ok(i) => {
            info!(units = i.len(), path = %config.knowledge.path.display(), "Knowledge base loaded");
            i
        }
        Err(e) => {
            error!(error = %e, "Failed to build knowledge index");
            return Err(e.into());
        }
    };

    let ticket_gateway = tickets::from_config(&config.ticketing, &config.request)?;
    if !config.ticketing.is_enabled() {
        warn!("Jira credentials incomplete, escalations will not create real tickets");
    }

    let deps = Collaborators {
        generator: Arc::new(langbase),
        storage: storage.clone(),
        gateway: Arc::new(gateway),
        index: Arc::new(index),
        tickets: ticket_gateway,
    };
    let router = QueryRouter::from_config(deps, &config);
    let state = Arc::new(AppState::new(config, storage, router));

    let server = McpServer::new(state);

    info!("Server ready, waiting for requests on stdin...");

    if let Err(e) = server.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging. Output goes to stderr; stdout carries MCP traffic.
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
