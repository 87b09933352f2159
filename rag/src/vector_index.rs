use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::chunk_text::Chunk;
use crate::embed_chunks::Embedder;
use crate::embed_query::embed_query;
use crate::error::{RagError, Result};

#[derive(Clone, Debug, PartialEq)]
pub struct Hit {
    pub chunk: Chunk,
    pub score: f32,
}

/// Chunks of one source document with their embeddings. Immutable once built.
pub struct DocumentIndex {
    source_name: String,
    chunks: Vec<Chunk>,
    vectors: Vec<Vec<f32>>,
    embedder: Arc<dyn Embedder>,
}

impl DocumentIndex {
    pub fn new(
        source_name: impl Into<String>,
        chunks: Vec<Chunk>,
        vectors: Vec<Vec<f32>>,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self> {
        if chunks.len() != vectors.len() {
            return Err(RagError::Indexing(format!(
                "{} chunks but {} vectors",
                chunks.len(),
                vectors.len()
            )));
        }
        if let Some(dims) = vectors.first().map(Vec::len) {
            if dims == 0 || vectors.iter().any(|v| v.len() != dims) {
                return Err(RagError::Indexing("inconsistent embedding dimensions".to_string()));
            }
        }
        Ok(Self {
            source_name: source_name.into(),
            chunks,
            vectors,
            embedder,
        })
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn embedder_name(&self) -> &str {
        self.embedder.name()
    }

    /// Top `k` chunks by cosine similarity to `query`; equal scores keep document order.
    pub fn search(&self, query: &str, k: usize) -> Result<Vec<Hit>> {
        if k == 0 || self.chunks.is_empty() {
            return Ok(vec![]);
        }
        let query_vec = embed_query(self.embedder.as_ref(), query)?;
        if query_vec.is_empty() {
            return Ok(vec![]);
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, cosine(&query_vec, v)))
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(i, score)| Hit {
                chunk: self.chunks[i].clone(),
                score,
            })
            .collect())
    }
}

impl fmt::Debug for DocumentIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentIndex")
            .field("source_name", &self.source_name)
            .field("chunks", &self.chunks.len())
            .field("embedder", &self.embedder.name())
            .finish()
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut na = 0.0f32;
    let mut nb = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na.sqrt() * nb.sqrt())
    }
}
