use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use super::{split_units, DocumentIndex, Embedder, ScoredUnit};
use crate::error::{IndexError, IndexResult};

const EMBED_BATCH_SIZE: usize = 64;

/// In-memory embedding index over atomic knowledge units
pub struct KnowledgeIndex {
    embedder: Arc<dyn Embedder>,
    entries: Vec<(String, Vec<f32>)>,
}

impl KnowledgeIndex {
    /// Embed every unit and build the index
    pub async fn build(units: Vec<String>, embedder: Arc<dyn Embedder>) -> IndexResult<Self> {
        let mut entries = Vec::with_capacity(units.len());

        for batch in units.chunks(EMBED_BATCH_SIZE) {
            let vectors = embedder.embed(batch).await?;
            if vectors.len() != batch.len() {
                return Err(IndexError::InvalidEmbedding {
                    message: format!(
                        "Expected {} embeddings, received {}",
                        batch.len(),
                        vectors.len()
                    ),
                });
            }
            entries.extend(batch.iter().cloned().zip(vectors));
        }

        info!(units = entries.len(), "Knowledge index built");
        Ok(Self { embedder, entries })
    }

    /// Load a knowledge base file, split it into units and build the index
    pub async fn from_file(path: &Path, embedder: Arc<dyn Embedder>) -> IndexResult<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| IndexError::Load {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        Self::build(split_units(&text), embedder).await
    }

    /// Number of indexed units
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no units are indexed
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl DocumentIndex for KnowledgeIndex {
    async fn search(&self, query: &str, k: usize) -> IndexResult<Vec<ScoredUnit>> {
        if k == 0 || self.entries.is_empty() {
            return Ok(Vec::new());
        }

        let mut vectors = self.embedder.embed(&[query.to_string()]).await?;
        let query_vector = vectors.pop().ok_or_else(|| IndexError::InvalidEmbedding {
            message: "No embedding returned for query".to_string(),
        })?;

        let mut scored: Vec<ScoredUnit> = self
            .entries
            .iter()
            .map(|(text, vector)| ScoredUnit {
                text: text.clone(),
                score: cosine_similarity(&query_vector, vector),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);

        debug!(
            k = k,
            top_score = scored.first().map(|s| s.score).unwrap_or(0.0),
            "Knowledge search completed"
        );

        Ok(scored)
    }
}

/// Cosine similarity between two vectors; zero for mismatched or zero-length input
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
