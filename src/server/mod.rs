//! Server module for MCP protocol handling.
//!
//! This module provides:
//! - MCP server implementation over stdio
//! - Tool call handlers for `support_query` and `support_feedback`
//! - Shared application state

mod handlers;
mod mcp;

pub use handlers::*;
pub use mcp::*;

use std::sync::Arc;

use crate::agents::QueryRouter;
use crate::config::Config;
use crate::storage::Storage;

/// Application state shared across handlers.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Query record and feedback store.
    pub storage: Arc<dyn Storage>,
    /// Query router with every agent wired in.
    pub router: QueryRouter,
}

impl AppState {
    /// Create new application state
    pub fn new(config: Config, storage: Arc<dyn Storage>, router: QueryRouter) -> Self {
        tracing::info!(
            classifier_pipe = %config.pipes.classifier,
            static_pipe = %config.pipes.static_qa,
            sql_pipe = %config.pipes.sql,
            ticketing_enabled = config.ticketing.is_enabled(),
            "AppState initialized"
        );

        Self {
            config,
            storage,
            router,
        }
    }
}

/// Shared application state handle
pub type SharedState = Arc<AppState>;
