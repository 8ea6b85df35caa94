//! Core infrastructure shared by all agents.
//!
//! [`AgentCore`] wraps the generation client so that every agent builds requests,
//! trims completions and logs latency the same way.

use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::error::LangbaseResult;
use crate::langbase::{Generator, Message, PipeRequest};

/// Generation client shared by every agent.
#[derive(Clone)]
pub struct AgentCore {
    generator: Arc<dyn Generator>,
}

impl AgentCore {
    /// Create a new agent core around a generator.
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    /// Get a reference to the generator.
    #[inline]
    pub fn generator(&self) -> &Arc<dyn Generator> {
        &self.generator
    }

    /// Run one system+user generation call against `pipe` and return the trimmed completion.
    pub async fn complete(
        &self,
        pipe: &str,
        system: impl Into<String>,
        user: impl Into<String>,
    ) -> LangbaseResult<String> {
        let request = PipeRequest::new(pipe, vec![Message::system(system), Message::user(user)]);
        let start = Instant::now();

        let completion = self.generator.generate(request).await?;

        debug!(
            pipe = %pipe,
            latency_ms = start.elapsed().as_millis(),
            completion_len = completion.len(),
            "Generation completed"
        );

        Ok(completion.trim().to_string())
    }
}
