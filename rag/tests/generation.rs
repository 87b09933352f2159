use std::io::{Cursor, Write};
use std::thread;
use std::time::Duration;

use mockito::{Matcher, Server};
use polisense_rag::{
    parse_stream_line, snap_temperature, Config, GenerationConfig, GroqClient, HttpOptions,
    LlmClient, Message, RagError, SseFragments, StreamEvent,
};
use serde_json::json;

const STREAM_BODY: &str = "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n\
data: {\"choices\":[{\"delta\":{\"content\":\"Twenty \"}}]}\n\n\
: keep-alive\n\n\
data: {\"choices\":[{\"delta\":{\"content\":\"days.\"}}]}\n\n\
data: [DONE]\n\n";

#[test]
fn parses_stream_lines() {
    assert_eq!(
        parse_stream_line(r#"data: {"choices":[{"delta":{"content":"Hi"}}]}"#),
        StreamEvent::Fragment("Hi".to_string())
    );
    assert_eq!(parse_stream_line("data: [DONE]"), StreamEvent::Done);
    assert_eq!(parse_stream_line(""), StreamEvent::Skip);
    assert_eq!(parse_stream_line(": ping"), StreamEvent::Skip);
    assert_eq!(parse_stream_line("event: message"), StreamEvent::Skip);
    assert_eq!(
        parse_stream_line(r#"data: {"choices":[{"delta":{},"finish_reason":"stop"}]}"#),
        StreamEvent::Skip
    );
    assert_eq!(
        parse_stream_line(r#"data: {"error":{"message":"rate limited"}}"#),
        StreamEvent::Error("rate limited".to_string())
    );
    assert!(matches!(parse_stream_line("data: {not json"), StreamEvent::Error(_)));
}

#[test]
fn fragments_stop_at_done_and_after_errors() {
    let body = format!("{}data: {{\"choices\":[{{\"delta\":{{\"content\":\"ignored\"}}}}]}}\n", STREAM_BODY);
    let fragments: Vec<String> = SseFragments::new(Cursor::new(body))
        .map(|f| f.unwrap())
        .collect();
    assert_eq!(fragments, vec!["Twenty ", "days."]);

    let failing = "data: {\"choices\":[{\"delta\":{\"content\":\"Part\"}}]}\n\
data: {\"error\":{\"message\":\"overloaded\"}}\n\
data: {\"choices\":[{\"delta\":{\"content\":\"never\"}}]}\n";
    let items: Vec<_> = SseFragments::new(Cursor::new(failing)).collect();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_ref().unwrap(), "Part");
    assert!(matches!(items[1], Err(RagError::Generation(_))));
}

#[test]
fn groq_client_streams_completion() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer test-key")
        .match_body(Matcher::PartialJson(json!({
            "model": "llama-3.1-8b-instant",
            "temperature": 0.9,
            "stream": true,
            "messages": [{"role": "user", "content": "vacation?"}],
        })))
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(STREAM_BODY)
        .create();

    let client = GroqClient::new(&server.url(), "test-key", &HttpOptions::default()).unwrap();
    let generation = GenerationConfig::new("llama-3.1-8b-instant", 0.9);
    let text: String = client
        .stream_chat(&[Message::user("vacation?")], &generation)
        .unwrap()
        .map(|f| f.unwrap())
        .collect();

    assert_eq!(text, "Twenty days.");
    mock.assert();
}

#[test]
fn slow_stream_outlasting_the_http_timeout_completes() {
    let mut server = Server::new();
    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_chunked_body(|w| {
            for word in ["Twenty ", "days."] {
                let line = json!({"choices": [{"delta": {"content": word}}]});
                write!(w, "data: {}\n\n", line)?;
                w.flush()?;
                thread::sleep(Duration::from_millis(400));
            }
            write!(w, "data: [DONE]\n\n")
        })
        .create();

    let opts = HttpOptions {
        timeout: Duration::from_millis(300),
        ..HttpOptions::default()
    };
    let client = GroqClient::new(&server.url(), "test-key", &opts).unwrap();
    let text: String = client
        .stream_chat(&[Message::user("vacation?")], &GenerationConfig::new("m", 0.3))
        .unwrap()
        .map(|f| f.unwrap())
        .collect();

    assert_eq!(text, "Twenty days.");
}

#[test]
fn http_defaults_follow_config_defaults() {
    let opts = HttpOptions::default();
    let cfg = Config::default();
    assert_eq!(opts.force_ipv4, cfg.force_ipv4);
    assert_eq!(opts.bypass_proxy, cfg.bypass_proxy);
    assert_eq!(opts.timeout, cfg.http_timeout());
}

#[test]
fn groq_http_failure_is_a_generation_error() {
    let mut server = Server::new();
    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(503)
        .with_body("service unavailable")
        .create();

    let client = GroqClient::new(&server.url(), "test-key", &HttpOptions::default()).unwrap();
    let err = client
        .stream_chat(&[Message::user("hi")], &GenerationConfig::new("m", 0.3))
        .err()
        .expect("503 fails the request");
    match err {
        RagError::Generation(msg) => assert!(msg.contains("503")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_api_key_is_a_configuration_error() {
    let cfg = Config::default();
    assert!(matches!(GroqClient::from_config(&cfg), Err(RagError::Configuration(_))));
    assert!(matches!(
        GroqClient::new("http://localhost", "  ", &HttpOptions::default()),
        Err(RagError::Configuration(_))
    ));
}

#[test]
fn temperatures_snap_to_slider_steps() {
    assert_eq!(snap_temperature(0.3), 0.3);
    assert_eq!(snap_temperature(0.92), 0.9);
    assert_eq!(snap_temperature(0.98), 1.0);
    assert_eq!(snap_temperature(2.0), 1.0);
    assert_eq!(snap_temperature(-1.0), 0.0);
    assert_eq!(snap_temperature(f32::NAN), 0.3);
    assert_eq!(GenerationConfig::new("m", 0.3).with_temperature(0.9).temperature, 0.9);
}
