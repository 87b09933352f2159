mod assistant;
mod build_index;
mod build_prompt;
mod chunk_text;
mod config;
mod embed_chunks;
mod embed_query;
mod error;
mod generate;
mod http;
mod load_pdf;
mod prompts;
mod session;
mod vector_index;

pub use assistant::{Assistant, PreparedPrompt};
pub use build_index::{build_index, build_index_with};
pub use build_prompt::{build_messages, format_policy_context, Message, Role, NO_POLICY_FOUND};
pub use chunk_text::{chunk_pages, chunk_text, Chunk, ChunkConfig};
pub use config::{Config, EmbedderKind, DEFAULT_MODEL, DEFAULT_PDF_PATH, DEFAULT_TEMPERATURE};
pub use embed_chunks::{embedder_from_config, parse_embeddings, Embedder, HashedEmbedder, OllamaEmbedder};
pub use error::{RagError, Result};
pub use generate::{
    parse_stream_line, snap_temperature, GenerationConfig, GroqClient, LlmClient, ResponseStream,
    SseFragments, StreamEvent, TEMPERATURE_STEP,
};
pub use http::HttpOptions;
pub use load_pdf::{is_pdf_name, load_pages, Page, PdfSource};
pub use prompts::{describe_employee, fill_system_prompt, EmployeeRecord, SYSTEM_PROMPT, WELCOME_MESSAGE};
pub use session::{PendingTurn, Phase, Session, TurnRequest};
pub use vector_index::{DocumentIndex, Hit};
