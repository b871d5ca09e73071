//! Provider wire types — the three request/response shapes spoken upstream.
//!
//! OpenAI and DeepSeek share the chat-completions shape (DeepSeek adds an
//! explicit `stream: false`); Yandex Foundation Models uses camelCase keys,
//! a `modelUri` instead of a model name, and nests options separately.
//!
//! Deserialization is limited to the fields the relay actually extracts; a
//! 200 response that does not match these shapes is treated as malformed by
//! the caller.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────
// Chat completions (OpenAI / DeepSeek)
// ─────────────────────────────────────────────

/// A chat message in the OpenAI format.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Request body for an OpenAI-compatible chat completions API.
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f64,
    /// DeepSeek sends `stream: false` explicitly; OpenAI omits the field.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

/// Chat completions response, reduced to the extracted fields.
#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<ChatChoice>,
}

/// A single choice in a chat completions response.
#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: AssistantMessage,
}

/// The assistant message within a choice.
#[derive(Debug, Deserialize)]
pub struct AssistantMessage {
    pub content: Option<String>,
}

impl ChatCompletionResponse {
    /// Extract `choices[0].message.content`, if present.
    pub fn into_text(self) -> Option<String> {
        self.choices.into_iter().next()?.message.content
    }
}

// ─────────────────────────────────────────────
// Yandex Foundation Models
// ─────────────────────────────────────────────

/// Request body for the Yandex completion API.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YandexCompletionRequest {
    /// `gpt://<folder_id>/<model>`.
    pub model_uri: String,
    pub completion_options: YandexCompletionOptions,
    pub messages: Vec<YandexMessage>,
}

/// Generation options nested inside a Yandex request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YandexCompletionOptions {
    pub stream: bool,
    pub temperature: f64,
    pub max_tokens: u32,
}

/// A message in the Yandex format (`text` instead of `content`).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct YandexMessage {
    pub role: String,
    pub text: String,
}

impl YandexMessage {
    /// Create a user message.
    pub fn user(text: impl Into<String>) -> Self {
        YandexMessage {
            role: "user".to_string(),
            text: text.into(),
        }
    }
}

/// Yandex completion response, reduced to the extracted fields.
#[derive(Debug, Deserialize)]
pub struct YandexCompletionResponse {
    pub result: YandexResult,
}

/// The `result` object of a Yandex response.
#[derive(Debug, Deserialize)]
pub struct YandexResult {
    pub alternatives: Vec<YandexAlternative>,
}

/// A single alternative in a Yandex response.
#[derive(Debug, Deserialize)]
pub struct YandexAlternative {
    pub message: YandexMessage,
}

impl YandexCompletionResponse {
    /// Extract `result.alternatives[0].message.text`, if present.
    pub fn into_text(self) -> Option<String> {
        self.result
            .alternatives
            .into_iter()
            .next()
            .map(|alt| alt.message.text)
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
