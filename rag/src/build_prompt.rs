use serde::{Deserialize, Serialize};

use crate::prompts::{describe_employee, fill_system_prompt, EmployeeRecord};
use crate::vector_index::Hit;

pub const NO_POLICY_FOUND: &str = "(no relevant policy information found)";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Joins retrieved chunks in rank order. Scores stay out of the prompt.
pub fn format_policy_context(hits: &[Hit]) -> String {
    let texts: Vec<&str> = hits
        .iter()
        .map(|hit| hit.chunk.text.as_str())
        .filter(|text| !text.trim().is_empty())
        .collect();
    if texts.is_empty() {
        NO_POLICY_FOUND.to_string()
    } else {
        texts.join("\n\n")
    }
}

/// Request messages: filled system prompt, prior turns, then the new question.
pub fn build_messages(
    employee: Option<&EmployeeRecord>,
    hits: &[Hit],
    history: &[Message],
    question: &str,
) -> Vec<Message> {
    let system = fill_system_prompt(&describe_employee(employee), &format_policy_context(hits));

    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(Message::system(system));
    messages.extend(history.iter().filter(|m| m.role != Role::System).cloned());
    messages.push(Message::user(question));
    messages
}
