//! Generation Service: Langbase pipe client and the `Generator` seam the agents call through.

mod client;
mod types;


pub use client::LangbaseClient;
pub use types::{
    CreatePipeRequest, CreatePipeResponse, Message, MessageRole, PipeRequest, PipeResponse,
    PipeStatus, RawResponse, Usage,
};

use async_trait::async_trait;

use crate::error::LangbaseResult;

/// Prompt in, text out. May fail or time out; callers own recovery.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Generator: Send + Sync {
    /// Run one generation call and return the completion text.
    async fn generate(&self, request: PipeRequest) -> LangbaseResult<String>;
}

#[async_trait]
impl Generator for LangbaseClient {
    async fn generate(&self, request: PipeRequest) -> LangbaseResult<String> {
        let response = self.call_pipe(request).await?;
        Ok(response.completion)
    }
}
