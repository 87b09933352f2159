use std::io::{BufRead, BufReader, Lines};

use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::build_prompt::Message;
use crate::config::Config;
use crate::error::{RagError, Result};
use crate::http::{build_streaming_client, post_event_stream, HttpOptions};

pub const TEMPERATURE_STEP: f32 = 0.05;

/// Generation parameters, passed with every request.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationConfig {
    pub model: String,
    pub temperature: f32,
}

impl GenerationConfig {
    pub fn new(model: &str, temperature: f32) -> Self {
        Self {
            model: model.to_string(),
            temperature: snap_temperature(temperature),
        }
    }

    pub fn with_temperature(&self, temperature: f32) -> Self {
        Self::new(&self.model, temperature)
    }
}

/// Clamps to `[0, 1]` and rounds to the nearest 0.05 step.
pub fn snap_temperature(value: f32) -> f32 {
    if !value.is_finite() {
        return crate::config::DEFAULT_TEMPERATURE;
    }
    let steps = (value.clamp(0.0, 1.0) / TEMPERATURE_STEP).round();
    (steps * TEMPERATURE_STEP * 100.0).round() / 100.0
}

/// Single-pass sequence of response fragments. Ends at the first error.
pub type ResponseStream = Box<dyn Iterator<Item = Result<String>> + Send>;

pub trait LlmClient: Send + Sync {
    fn stream_chat(&self, messages: &[Message], generation: &GenerationConfig) -> Result<ResponseStream>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    delta: Option<ChunkDelta>,
}

#[derive(Deserialize)]
struct ChunkDelta {
    content: Option<String>,
}

/// One decoded server-sent-events line of a streamed chat completion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamEvent {
    Fragment(String),
    Skip,
    Done,
    Error(String),
}

pub fn parse_stream_line(line: &str) -> StreamEvent {
    let line = line.trim();
    if line.is_empty() || line.starts_with(':') {
        return StreamEvent::Skip;
    }
    let Some(data) = line.strip_prefix("data:") else {
        // event:, id: and retry: fields carry nothing we use.
        return StreamEvent::Skip;
    };
    let data = data.trim();
    if data == "[DONE]" {
        return StreamEvent::Done;
    }

    let value: serde_json::Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => return StreamEvent::Error(format!("malformed stream chunk: {}", e)),
    };
    if let Some(err) = value.get("error") {
        let msg = err
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| err.to_string());
        return StreamEvent::Error(msg);
    }
    match serde_json::from_value::<ChatChunk>(value) {
        Ok(chunk) => {
            let content = chunk
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.delta)
                .and_then(|d| d.content)
                .unwrap_or_default();
            if content.is_empty() {
                StreamEvent::Skip
            } else {
                StreamEvent::Fragment(content)
            }
        }
        Err(e) => StreamEvent::Error(format!("unexpected stream chunk: {}", e)),
    }
}

/// Iterator over the fragments of a streamed chat completion body.
pub struct SseFragments<R> {
    lines: Lines<R>,
    finished: bool,
    fragments: usize,
}

impl<R: BufRead> SseFragments<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            finished: false,
            fragments: 0,
        }
    }
}

impl<R: BufRead> Iterator for SseFragments<R> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        loop {
            let line = match self.lines.next() {
                Some(Ok(line)) => line,
                Some(Err(e)) => {
                    self.finished = true;
                    return Some(Err(RagError::Generation(format!("stream interrupted: {}", e))));
                }
                None => {
                    self.finished = true;
                    debug!(fragments = self.fragments, "stream closed");
                    return None;
                }
            };
            match parse_stream_line(&line) {
                StreamEvent::Skip => continue,
                StreamEvent::Fragment(text) => {
                    self.fragments += 1;
                    return Some(Ok(text));
                }
                StreamEvent::Done => {
                    self.finished = true;
                    debug!(fragments = self.fragments, "stream done");
                    return None;
                }
                StreamEvent::Error(msg) => {
                    self.finished = true;
                    warn!(error = %msg, "stream reported an error");
                    return Some(Err(RagError::Generation(msg)));
                }
            }
        }
    }
}

/// Groq's OpenAI-compatible chat completions endpoint.
pub struct GroqClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl GroqClient {
    pub fn new(base_url: &str, api_key: &str, opts: &HttpOptions) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(RagError::Configuration("GROQ_API_KEY is not set".to_string()));
        }
        let client = build_streaming_client(opts)
            .map_err(|e| RagError::Configuration(format!("http client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let key = cfg
            .groq_api_key
            .as_deref()
            .ok_or_else(|| RagError::Configuration("GROQ_API_KEY is not set".to_string()))?;
        Self::new(&cfg.groq_base_url, key, &HttpOptions::from_config(cfg))
    }
}

impl LlmClient for GroqClient {
    fn stream_chat(&self, messages: &[Message], generation: &GenerationConfig) -> Result<ResponseStream> {
        let url = format!("{}/chat/completions", self.base_url);
        let req = ChatRequest {
            model: &generation.model,
            messages,
            temperature: generation.temperature,
            stream: true,
        };
        info!(
            model = %generation.model,
            temperature = generation.temperature,
            messages = messages.len(),
            "requesting completion"
        );
        let resp: Response =
            post_event_stream(&self.client, &url, &self.api_key, &req).map_err(RagError::Generation)?;
        Ok(Box::new(SseFragments::new(BufReader::new(resp))))
    }
}
