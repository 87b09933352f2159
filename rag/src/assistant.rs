use std::sync::Arc;

use tracing::debug;

use crate::build_prompt::{build_messages, Message};
use crate::error::Result;
use crate::generate::{GenerationConfig, LlmClient, ResponseStream};
use crate::prompts::EmployeeRecord;
use crate::vector_index::{DocumentIndex, Hit};

/// A filled request, ready to be sent.
#[derive(Clone, Debug)]
pub struct PreparedPrompt {
    pub messages: Vec<Message>,
    pub hits: Vec<Hit>,
}

/// Answers questions against one document index.
///
/// The assistant never touches the chat history it is given; committing turns is the
/// caller's job so the question can be shown before the answer finishes streaming.
#[derive(Clone)]
pub struct Assistant {
    employee: Option<EmployeeRecord>,
    index: Arc<DocumentIndex>,
    llm: Arc<dyn LlmClient>,
    top_k: usize,
}

impl Assistant {
    pub fn new(
        employee: Option<EmployeeRecord>,
        index: Arc<DocumentIndex>,
        llm: Arc<dyn LlmClient>,
        top_k: usize,
    ) -> Self {
        Self { employee, index, llm, top_k }
    }

    pub fn employee(&self) -> Option<&EmployeeRecord> {
        self.employee.as_ref()
    }

    pub fn index(&self) -> &Arc<DocumentIndex> {
        &self.index
    }

    /// Same employee and model client, different document.
    pub fn with_index(&self, index: Arc<DocumentIndex>) -> Self {
        Self {
            employee: self.employee.clone(),
            index,
            llm: Arc::clone(&self.llm),
            top_k: self.top_k,
        }
    }

    pub fn prepare(&self, history: &[Message], user_text: &str) -> Result<PreparedPrompt> {
        let hits = self.index.search(user_text, self.top_k)?;
        debug!(hits = hits.len(), source = self.index.source_name(), "retrieved policy chunks");
        let messages = build_messages(self.employee.as_ref(), &hits, history, user_text);
        Ok(PreparedPrompt { messages, hits })
    }

    pub fn get_response(
        &self,
        history: &[Message],
        user_text: &str,
        generation: &GenerationConfig,
    ) -> Result<ResponseStream> {
        let prepared = self.prepare(history, user_text)?;
        self.stream(&prepared, generation)
    }

    pub fn stream(&self, prepared: &PreparedPrompt, generation: &GenerationConfig) -> Result<ResponseStream> {
        self.llm.stream_chat(&prepared.messages, generation)
    }
}
