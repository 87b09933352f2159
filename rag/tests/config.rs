use polisense_rag::{Config, EmbedderKind, RagError, DEFAULT_MODEL};

#[test]
fn defaults_are_valid() {
    let cfg = Config::default();
    cfg.validate().unwrap();
    assert_eq!(cfg.chat_model, DEFAULT_MODEL);
    assert_eq!(cfg.temperature, 0.3);
    assert_eq!(cfg.chunk_size, 800);
    assert_eq!(cfg.chunk_overlap, 150);
    assert_eq!(cfg.embedder_kind().unwrap(), EmbedderKind::Hashed);
    assert_eq!(cfg.generation().model, "llama-3.1-8b-instant");
}

#[test]
fn invalid_settings_are_rejected() {
    let overlap = Config { chunk_overlap: 800, ..Config::default() };
    assert!(matches!(overlap.validate(), Err(RagError::Configuration(_))));

    let embedder = Config { embedder: "faiss".to_string(), ..Config::default() };
    assert!(matches!(embedder.validate(), Err(RagError::Configuration(_))));

    let top_k = Config { top_k: 0, ..Config::default() };
    assert!(matches!(top_k.validate(), Err(RagError::Configuration(_))));

    let ollama = Config { embedder: " Ollama ".to_string(), ..Config::default() };
    assert_eq!(ollama.embedder_kind().unwrap(), EmbedderKind::Ollama);
}
