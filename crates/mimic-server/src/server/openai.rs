//! OpenAI-shaped response envelopes.

use crate::ids::generate_id;
use serde::Serialize;

/// Fallback model name for chat completions when the request names none
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4";
/// Fallback model name for text completions when the request names none
pub const DEFAULT_TEXT_MODEL: &str = "gpt-3.5-turbo-instruct";

const PROMPT_TOKENS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Usage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

impl Usage {
    /// Rough token accounting: fixed prompt cost, four characters per token
    pub fn estimate(content: &str) -> Self {
        let completion_tokens = content.len() / 4;
        Self {
            prompt_tokens: PROMPT_TOKENS,
            completion_tokens,
            total_tokens: PROMPT_TOKENS + completion_tokens,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct ChatChoice {
    pub index: u32,
    pub message: ChatMessage,
    pub finish_reason: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ChatCompletion {
    pub id: String,
    pub object: &'static str,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChatChoice>,
    pub usage: Usage,
}

impl ChatCompletion {
    pub fn new(model: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            id: generate_id("chatcmpl"),
            object: "chat.completion",
            created: chrono::Utc::now().timestamp(),
            model: model.into(),
            usage: Usage::estimate(&content),
            choices: vec![ChatChoice {
                index: 0,
                message: ChatMessage {
                    role: "assistant",
                    content,
                },
                finish_reason: "stop",
            }],
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TextChoice {
    pub text: String,
    pub index: u32,
    pub logprobs: Option<serde_json::Value>,
    pub finish_reason: &'static str,
}

#[derive(Debug, Serialize)]
pub struct TextCompletion {
    pub id: String,
    pub object: &'static str,
    pub created: i64,
    pub model: String,
    pub choices: Vec<TextChoice>,
    pub usage: Usage,
}

impl TextCompletion {
    pub fn new(model: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            id: generate_id("cmpl"),
            object: "text_completion",
            created: chrono::Utc::now().timestamp(),
            model: model.into(),
            usage: Usage::estimate(&text),
            choices: vec![TextChoice {
                text,
                index: 0,
                logprobs: None,
                finish_reason: "stop",
            }],
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Model {
    pub id: String,
    pub object: &'static str,
    pub created: i64,
    pub owned_by: &'static str,
}

impl Model {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            object: "model",
            created: chrono::Utc::now().timestamp(),
            owned_by: "openai",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ModelList {
    pub object: &'static str,
    pub data: Vec<Model>,
}

impl ModelList {
    pub fn new(ids: impl IntoIterator<Item = String>) -> Self {
        Self {
            object: "list",
            data: ids.into_iter().map(Model::new).collect(),
        }
    }
}
