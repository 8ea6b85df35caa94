//! # MCP Support Router
//!
//! A Model Context Protocol (MCP) server that answers player support questions for an online
//! game. Each query is classified and handed to the agent that can answer it, with every
//! generation step delegated to Langbase Pipes.
//!
//! ## Features
//!
//! - **Classification**: STATIC, DYNAMIC, HYBRID, FOLLOW_UP or ESCALATION per query
//! - **Static answers**: retrieval over atomic knowledge units, answered from retrieved text only
//! - **Dynamic answers**: generated, sanitized, row-capped SQL against the game data store
//! - **Hybrid answers**: both agents combined, with dependent clan questions resolved in order
//! - **Escalation**: conversation transcripts turned into Jira tickets
//! - **Trace continuity**: every answer carries a run id linked to the previous turn
//! - **Feedback**: positive or negative feedback attached to stored query records
//!
//! ## Architecture
//!
//! ```text
//! MCP Client → MCP Server (Rust) → QueryRouter → Agents → Langbase Pipes (HTTP)
//!                    ↓                              ↓
//!              SQLite (records)       Game data (SQLite) · Knowledge index · Jira
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use mcp_support_router::agents::{Collaborators, QueryRouter};
//! use mcp_support_router::{AppState, Config, McpServer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let deps: Collaborators = build_collaborators(&config).await?;
//!     let storage = deps.storage.clone();
//!     let router = QueryRouter::from_config(deps, &config);
//!     let state = Arc::new(AppState::new(config, storage, router));
//!     McpServer::new(state).run().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

/// Query classification, dispatch and the answering agents.
pub mod agents;
/// Configuration management for the MCP server.
pub mod config;
/// Structured Data Gateway over the game data store.
pub mod data;
/// Error types and result aliases for the application.
pub mod error;
/// Document index over atomic knowledge units.
pub mod knowledge;
/// Langbase API client and types for pipe communication.
pub mod langbase;
/// Instruction blocks sent to Langbase pipes.
pub mod prompts;
/// MCP server implementation and request handling.
pub mod server;
/// SQLite storage layer for query records, feedback and the invocation log.
pub mod storage;
/// Ticketing Gateway for escalations.
pub mod tickets;

pub use agents::{AgentResponse, Classification, QueryRouter, SupportQuery, UserContext};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use server::{AppState, McpServer, SharedState};
