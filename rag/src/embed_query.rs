use crate::embed_chunks::Embedder;
use crate::error::Result;

pub fn embed_query(embedder: &dyn Embedder, text: &str) -> Result<Vec<f32>> {
    let vecs = embedder.embed(&[text.to_string()])?;
    Ok(vecs.into_iter().next().unwrap_or_default())
}
