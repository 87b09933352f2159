use std::sync::Arc;

use tracing::{info, warn};

use crate::assistant::Assistant;
use crate::build_index::build_index;
use crate::build_prompt::Message;
use crate::config::Config;
use crate::error::{RagError, Result};
use crate::generate::{GenerationConfig, LlmClient, ResponseStream, TEMPERATURE_STEP};
use crate::load_pdf::PdfSource;
use crate::prompts::EmployeeRecord;
use crate::vector_index::{DocumentIndex, Hit};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    AwaitingCompletion,
    Reindexing,
}

/// Snapshot of what a turn needs, detached from the session so it can run on
/// another thread while the session keeps rendering.
#[derive(Clone)]
pub struct TurnRequest {
    pub user_text: String,
    pub history: Vec<Message>,
    pub generation: GenerationConfig,
    assistant: Assistant,
}

impl TurnRequest {
    /// Retrieves context and sends exactly one generation request.
    pub fn open(&self) -> Result<PendingTurn> {
        let prepared = self.assistant.prepare(&self.history, &self.user_text)?;
        let stream = self.assistant.stream(&prepared, &self.generation)?;
        Ok(PendingTurn {
            user_text: self.user_text.clone(),
            hits: prepared.hits,
            generation: self.generation.clone(),
            stream,
        })
    }
}

/// A question that has been sent and whose answer is still streaming.
pub struct PendingTurn {
    pub user_text: String,
    pub hits: Vec<Hit>,
    pub generation: GenerationConfig,
    pub stream: ResponseStream,
}

/// Everything one chat session owns. Created at session start, dropped at the end.
pub struct Session {
    messages: Vec<Message>,
    assistant: Assistant,
    generation: GenerationConfig,
    phase: Phase,
}

impl Session {
    pub fn new(
        index: DocumentIndex,
        llm: Arc<dyn LlmClient>,
        employee: Option<EmployeeRecord>,
        generation: GenerationConfig,
        top_k: usize,
    ) -> Self {
        Self {
            messages: Vec::new(),
            assistant: Assistant::new(employee, Arc::new(index), llm, top_k),
            generation,
            phase: Phase::Idle,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn generation(&self) -> &GenerationConfig {
        &self.generation
    }

    pub fn employee(&self) -> Option<&EmployeeRecord> {
        self.assistant.employee()
    }

    pub fn index(&self) -> &Arc<DocumentIndex> {
        self.assistant.index()
    }

    pub fn source_name(&self) -> &str {
        self.assistant.index().source_name()
    }

    /// Applies from the next request on. Returns the value actually stored.
    pub fn set_temperature(&mut self, temperature: f32) -> f32 {
        self.generation = self.generation.with_temperature(temperature);
        info!(temperature = self.generation.temperature, "temperature changed");
        self.generation.temperature
    }

    /// Moves the temperature by `steps` increments of 0.05.
    pub fn nudge_temperature(&mut self, steps: i32) -> f32 {
        let target = self.generation.temperature + steps as f32 * TEMPERATURE_STEP;
        self.set_temperature(target)
    }

    pub fn clear_history(&mut self) -> Result<()> {
        self.ensure_idle("cannot clear history")?;
        self.messages.clear();
        Ok(())
    }

    /// Marks the session busy and hands out what is needed to answer `user_text`.
    pub fn begin_turn(&mut self, user_text: &str) -> Result<TurnRequest> {
        self.ensure_idle("a response or reindex is already running")?;
        self.phase = Phase::AwaitingCompletion;
        Ok(TurnRequest {
            user_text: user_text.to_string(),
            history: self.messages.clone(),
            generation: self.generation.clone(),
            assistant: self.assistant.clone(),
        })
    }

    /// Retrieves context and opens the response stream. History is left untouched.
    pub fn start_turn(&mut self, user_text: &str) -> Result<PendingTurn> {
        let request = self.begin_turn(user_text)?;
        request.open().inspect_err(|_| self.phase = Phase::Idle)
    }

    /// Records both sides of a finished turn. Only valid while a turn is in flight.
    pub fn complete_turn(&mut self, user_text: String, response: String) -> Result<()> {
        self.ensure_awaiting("no response is in flight")?;
        self.messages.push(Message::user(user_text));
        self.messages.push(Message::assistant(response));
        self.phase = Phase::Idle;
        Ok(())
    }

    /// Abandons a turn whose stream failed. Nothing is recorded.
    pub fn fail_turn(&mut self) -> Result<()> {
        self.ensure_awaiting("no response is in flight")?;
        self.phase = Phase::Idle;
        Ok(())
    }

    /// Runs a whole turn synchronously: either both messages are committed or none.
    pub fn respond(&mut self, user_text: &str) -> Result<String> {
        let turn = self.start_turn(user_text)?;
        let mut response = String::new();
        for fragment in turn.stream {
            match fragment {
                Ok(text) => response.push_str(&text),
                Err(err) => {
                    warn!(error = %err, "response stream failed");
                    self.fail_turn()?;
                    return Err(err);
                }
            }
        }
        self.complete_turn(turn.user_text, response.clone())?;
        Ok(response)
    }

    pub fn begin_reindex(&mut self) -> Result<()> {
        self.ensure_idle("cannot reindex while busy")?;
        self.phase = Phase::Reindexing;
        Ok(())
    }

    /// Swaps in a successfully built index; on failure the current one stays active.
    pub fn finish_reindex(&mut self, built: Result<DocumentIndex>) -> Result<()> {
        if self.phase != Phase::Reindexing {
            return Err(RagError::Busy("no reindex is running"));
        }
        self.phase = Phase::Idle;
        match built {
            Ok(index) => {
                self.swap_index(index);
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, source = self.source_name(), "reindex failed, keeping current document");
                Err(err)
            }
        }
    }

    pub fn reindex(&mut self, cfg: &Config, source: &PdfSource) -> Result<()> {
        self.begin_reindex()?;
        let built = build_index(cfg, source);
        self.finish_reindex(built)
    }

    /// New document, fresh conversation. Model client and employee are kept.
    pub fn replace_index(&mut self, index: DocumentIndex) -> Result<()> {
        self.ensure_idle("cannot switch documents while busy")?;
        self.swap_index(index);
        Ok(())
    }

    fn swap_index(&mut self, index: DocumentIndex) {
        info!(source = index.source_name(), chunks = index.len(), "switching document");
        self.assistant = self.assistant.with_index(Arc::new(index));
        self.messages.clear();
    }

    fn ensure_awaiting(&self, what: &'static str) -> Result<()> {
        if self.phase == Phase::AwaitingCompletion {
            Ok(())
        } else {
            Err(RagError::Busy(what))
        }
    }

    fn ensure_idle(&self, what: &'static str) -> Result<()> {
        if self.phase == Phase::Idle {
            Ok(())
        } else {
            Err(RagError::Busy(what))
        }
    }
}
