use std::sync::Arc;

use reqwest::blocking::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::config::{Config, EmbedderKind};
use crate::error::{RagError, Result};
use crate::http::{build_client, post_json, HttpOptions};

/// Turns texts into fixed-size vectors. One vector per input, in input order.
pub trait Embedder: Send + Sync {
    fn name(&self) -> &str;
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

pub fn embedder_from_config(cfg: &Config) -> Result<Arc<dyn Embedder>> {
    match cfg.embedder_kind()? {
        EmbedderKind::Hashed => Ok(Arc::new(HashedEmbedder::new(cfg.embed_dims)?)),
        EmbedderKind::Ollama => Ok(Arc::new(OllamaEmbedder::new(
            &cfg.ollama_url,
            &cfg.embed_model,
            &HttpOptions::from_config(cfg),
        )?)),
    }
}

/// Deterministic lexical vectors: every lower-cased alphanumeric token is hashed
/// into one of `dims` buckets, then the vector is L2-normalised.
#[derive(Clone, Debug)]
pub struct HashedEmbedder {
    dims: usize,
}

impl HashedEmbedder {
    pub fn new(dims: usize) -> Result<Self> {
        if dims == 0 {
            return Err(RagError::Configuration("embedding dimensions must be at least 1".to_string()));
        }
        Ok(Self { dims })
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dims];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let hash = fnv1a(token.to_lowercase().as_bytes());
            let bucket = (hash % self.dims as u64) as usize;
            // One hash bit picks the sign so unrelated tokens cancel out on average.
            let sign = if hash & (1 << 63) == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }
        normalize(&mut vector);
        vector
    }
}

impl Embedder for HashedEmbedder {
    fn name(&self) -> &str {
        "hashed"
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for b in bytes {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

/// Semantic embeddings served by Ollama.
pub struct OllamaEmbedder {
    client: Client,
    url: String,
    model: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Serialize)]
struct EmbedLegacyRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

impl OllamaEmbedder {
    pub fn new(url: &str, model: &str, opts: &HttpOptions) -> Result<Self> {
        let client = build_client(opts)
            .map_err(|e| RagError::Configuration(format!("http client: {}", e)))?;
        Ok(Self {
            client,
            url: url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    fn embed_legacy(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, String> {
        // The legacy endpoint only takes one prompt per call.
        let url = format!("{}/api/embeddings", self.url);
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            let req = EmbedLegacyRequest { model: &self.model, prompt: text };
            let res = post_json::<Value, _>(&self.client, &url, &req)?;
            out.extend(parse_embeddings(res)?);
        }
        Ok(out)
    }
}

impl Embedder for OllamaEmbedder {
    fn name(&self) -> &str {
        &self.model
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        let url = format!("{}/api/embed", self.url);
        let req = EmbedRequest { model: &self.model, input: texts };
        let vectors = match post_json::<Value, _>(&self.client, &url, &req) {
            Ok(res) => parse_embeddings(res),
            Err(err) => {
                warn!(error = %err, "/api/embed failed, trying legacy endpoint");
                self.embed_legacy(texts)
            }
        }
        .map_err(RagError::Indexing)?;

        if vectors.len() != texts.len() {
            return Err(RagError::Indexing(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                vectors.len()
            )));
        }
        Ok(vectors)
    }
}

pub fn parse_embeddings(value: Value) -> std::result::Result<Vec<Vec<f32>>, String> {
    if let Some(embeddings) = value.get("embeddings") {
        return parse_embeddings_value(embeddings);
    }
    if let Some(embedding) = value.get("embedding") {
        return parse_embeddings_value(embedding);
    }
    Err("No embeddings in response".to_string())
}

fn parse_embeddings_value(value: &Value) -> std::result::Result<Vec<Vec<f32>>, String> {
    if let Some(arr) = value.as_array() {
        if arr.is_empty() {
            return Ok(vec![]);
        }
        if arr[0].is_array() {
            let mut out = Vec::new();
            for row in arr {
                out.push(parse_vec(row)?);
            }
            return Ok(out);
        }
        return Ok(vec![parse_vec(value)?]);
    }
    Err("Invalid embeddings format".to_string())
}

fn parse_vec(value: &Value) -> std::result::Result<Vec<f32>, String> {
    let arr = value.as_array().ok_or("Embedding is not an array")?;
    let mut out = Vec::with_capacity(arr.len());
    for v in arr {
        let n = v.as_f64().ok_or("Embedding value is not a number")?;
        out.push(n as f32);
    }
    Ok(out)
}
