use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::chunk_text::ChunkConfig;
use crate::error::{RagError, Result};
use crate::generate::GenerationConfig;
use crate::prompts::EmployeeRecord;

pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";
pub const DEFAULT_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_PDF_PATH: &str = "data/umbrella_corp_policies.pdf";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmbedderKind {
    /// Offline feature-hashing vectors.
    Hashed,
    /// Semantic vectors from an Ollama server.
    Ollama,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub groq_api_key: Option<String>,
    pub groq_base_url: String,
    pub chat_model: String,
    pub temperature: f32,
    pub default_pdf_path: PathBuf,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub embedder: String,
    pub embed_dims: usize,
    pub ollama_url: String,
    pub embed_model: String,
    pub bypass_proxy: bool,
    pub force_ipv4: bool,
    pub http_timeout_secs: u64,
    pub log_dir: PathBuf,
    pub employee: Option<EmployeeRecord>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            groq_api_key: None,
            groq_base_url: "https://api.groq.com/openai/v1".to_string(),
            chat_model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            default_pdf_path: PathBuf::from(DEFAULT_PDF_PATH),
            chunk_size: 800,
            chunk_overlap: 150,
            top_k: 4,
            embedder: "hashed".to_string(),
            embed_dims: 384,
            ollama_url: "http://localhost:11434".to_string(),
            embed_model: "all-minilm".to_string(),
            bypass_proxy: true,
            force_ipv4: true,
            http_timeout_secs: 120,
            log_dir: PathBuf::from("logs"),
            employee: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        // Load .env if present so the API key works without manual `source .env`.
        let _ = dotenvy::dotenv();
        let defaults = Self::default();
        Self {
            groq_api_key: env::var("GROQ_API_KEY").ok().filter(|k| !k.trim().is_empty()),
            groq_base_url: env::var("GROQ_BASE_URL").unwrap_or(defaults.groq_base_url),
            chat_model: env::var("POLISENSE_MODEL").unwrap_or(defaults.chat_model),
            temperature: parsed("POLISENSE_TEMPERATURE").unwrap_or(defaults.temperature),
            default_pdf_path: env::var("POLISENSE_PDF_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.default_pdf_path),
            chunk_size: parsed("RAG_CHUNK_SIZE").unwrap_or(defaults.chunk_size),
            chunk_overlap: parsed("RAG_CHUNK_OVERLAP").unwrap_or(defaults.chunk_overlap),
            top_k: parsed("RAG_TOP_K").unwrap_or(defaults.top_k),
            embedder: env::var("RAG_EMBEDDER").unwrap_or(defaults.embedder),
            embed_dims: parsed("RAG_EMBED_DIMS").unwrap_or(defaults.embed_dims),
            ollama_url: env::var("OLLAMA_URL").unwrap_or(defaults.ollama_url),
            embed_model: env::var("OLLAMA_EMBED_MODEL").unwrap_or(defaults.embed_model),
            bypass_proxy: flag("POLISENSE_NO_PROXY").unwrap_or(defaults.bypass_proxy),
            force_ipv4: flag("POLISENSE_FORCE_IPV4").unwrap_or(defaults.force_ipv4),
            http_timeout_secs: parsed("POLISENSE_HTTP_TIMEOUT_SECS")
                .unwrap_or(defaults.http_timeout_secs),
            log_dir: env::var("POLISENSE_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.log_dir),
            employee: employee_from_env(),
        }
    }

    /// Checks the settings that cannot be repaired by falling back to a default.
    pub fn validate(&self) -> Result<()> {
        self.chunk_config()?;
        self.embedder_kind()?;
        if self.top_k == 0 {
            return Err(RagError::Configuration("RAG_TOP_K must be at least 1".to_string()));
        }
        if self.embed_dims == 0 {
            return Err(RagError::Configuration("RAG_EMBED_DIMS must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn chunk_config(&self) -> Result<ChunkConfig> {
        ChunkConfig::new(self.chunk_size, self.chunk_overlap)
    }

    pub fn embedder_kind(&self) -> Result<EmbedderKind> {
        match self.embedder.trim().to_ascii_lowercase().as_str() {
            "hashed" => Ok(EmbedderKind::Hashed),
            "ollama" => Ok(EmbedderKind::Ollama),
            other => Err(RagError::Configuration(format!(
                "unknown RAG_EMBEDDER '{}' (expected 'hashed' or 'ollama')",
                other
            ))),
        }
    }

    pub fn generation(&self) -> GenerationConfig {
        GenerationConfig::new(&self.chat_model, self.temperature)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn flag(key: &str) -> Option<bool> {
    let value = env::var(key).ok()?;
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn employee_from_env() -> Option<EmployeeRecord> {
    let field = |key: &str| env::var(key).ok().filter(|v| !v.trim().is_empty());
    let record = EmployeeRecord {
        name: field("EMPLOYEE_NAME"),
        role: field("EMPLOYEE_ROLE"),
        department: field("EMPLOYEE_DEPARTMENT"),
    };
    if record.is_empty() { None } else { Some(record) }
}
