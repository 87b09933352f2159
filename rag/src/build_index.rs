use std::sync::Arc;

use tracing::info;

use crate::chunk_text::{chunk_pages, ChunkConfig};
use crate::config::Config;
use crate::embed_chunks::{embedder_from_config, Embedder};
use crate::error::{RagError, Result};
use crate::load_pdf::{load_pages, PdfSource};
use crate::vector_index::DocumentIndex;

/// Load, split, embed and store one PDF with the backend named in `cfg`.
pub fn build_index(cfg: &Config, source: &PdfSource) -> Result<DocumentIndex> {
    let chunk_cfg = cfg.chunk_config()?;
    let embedder = embedder_from_config(cfg)?;
    build_index_with(source, &chunk_cfg, embedder)
}

pub fn build_index_with(
    source: &PdfSource,
    chunk_cfg: &ChunkConfig,
    embedder: Arc<dyn Embedder>,
) -> Result<DocumentIndex> {
    let name = source.display_name();
    info!(source = %name, embedder = embedder.name(), "indexing policy document");

    let pages = load_pages(source)?;
    let chunks = chunk_pages(&pages, chunk_cfg);
    if chunks.is_empty() {
        return Err(RagError::SourceUnreadable(format!("{}: no text to index", name)));
    }

    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let vectors = embedder.embed(&texts).map_err(|e| match e {
        err @ RagError::Indexing(_) => err,
        other => RagError::Indexing(other.to_string()),
    })?;

    let index = DocumentIndex::new(name, chunks, vectors, embedder)?;
    info!(
        source = index.source_name(),
        pages = pages.len(),
        chunks = index.len(),
        "index ready"
    );
    Ok(index)
}
