//! Document Index over atomic knowledge units.
//!
//! The knowledge base is split into single-fact units, each unit is embedded on its own,
//! and queries are answered by cosine similarity over those embeddings.

mod embedder;
mod index;
mod units;

pub use embedder::{Embedder, OpenAiEmbedder};
pub use index::{cosine_similarity, KnowledgeIndex};
pub use units::split_units;

#[cfg(test)]
pub use embedder::MockEmbedder;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::IndexResult;

/// A knowledge unit returned by a search, with its similarity score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredUnit {
    pub text: String,
    pub score: f32,
}

/// Nearest-neighbour search over text.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentIndex: Send + Sync {
    /// Return at most `k` units ordered by descending score.
    async fn search(&self, query: &str, k: usize) -> IndexResult<Vec<ScoredUnit>>;
}
