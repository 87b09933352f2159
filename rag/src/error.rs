use thiserror::Error;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Debug, Error)]
pub enum RagError {
    /// The PDF could not be read or parsed, or held no text.
    #[error("source unreadable: {0}")]
    SourceUnreadable(String),

    /// Embedding or index construction failed.
    #[error("indexing failed: {0}")]
    Indexing(String),

    /// The hosted model call failed, timed out, or returned a malformed stream.
    #[error("generation failed: {0}")]
    Generation(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    /// An operation does not fit the session's current phase.
    #[error("session state: {0}")]
    Busy(&'static str),
}
