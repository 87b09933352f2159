use mockito::{Matcher, Server};
use polisense_rag::{parse_embeddings, Embedder, HttpOptions, OllamaEmbedder, RagError};
use serde_json::json;

#[test]
fn ollama_batch_endpoint() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/api/embed")
        .match_body(Matcher::PartialJson(json!({"model": "all-minilm", "input": ["a", "b"]})))
        .with_status(200)
        .with_body(r#"{"embeddings":[[0.1,0.2],[0.3,0.4]]}"#)
        .create();

    let embedder = OllamaEmbedder::new(&server.url(), "all-minilm", &HttpOptions::default()).unwrap();
    let vectors = embedder.embed(&["a".to_string(), "b".to_string()]).unwrap();

    assert_eq!(vectors, vec![vec![0.1, 0.2], vec![0.3, 0.4]]);
    assert_eq!(embedder.name(), "all-minilm");
    mock.assert();
}

#[test]
fn ollama_falls_back_to_legacy_endpoint() {
    let mut server = Server::new();
    let _missing = server.mock("POST", "/api/embed").with_status(404).create();
    let legacy = server
        .mock("POST", "/api/embeddings")
        .with_status(200)
        .with_body(r#"{"embedding":[0.5,0.5]}"#)
        .expect(2)
        .create();

    let embedder = OllamaEmbedder::new(&server.url(), "all-minilm", &HttpOptions::default()).unwrap();
    let vectors = embedder.embed(&["a".to_string(), "b".to_string()]).unwrap();

    assert_eq!(vectors.len(), 2);
    legacy.assert();
}

#[test]
fn ollama_count_mismatch_is_an_indexing_error() {
    let mut server = Server::new();
    let _mock = server
        .mock("POST", "/api/embed")
        .with_status(200)
        .with_body(r#"{"embeddings":[[0.1,0.2]]}"#)
        .create();

    let embedder = OllamaEmbedder::new(&server.url(), "all-minilm", &HttpOptions::default()).unwrap();
    let err = embedder.embed(&["a".to_string(), "b".to_string()]).unwrap_err();
    assert!(matches!(err, RagError::Indexing(_)));
}

#[test]
fn parses_both_response_shapes() {
    assert_eq!(parse_embeddings(json!({"embedding": [1.0, 2.0]})).unwrap(), vec![vec![1.0, 2.0]]);
    assert_eq!(parse_embeddings(json!({"embeddings": []})).unwrap(), Vec::<Vec<f32>>::new());
    assert!(parse_embeddings(json!({"data": []})).is_err());
}
