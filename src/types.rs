//! Shared wire types for the chat client.
//!
//! These mirror the Ollama chat API, shared by request building and
//! response parsing.

use serde::{Deserialize, Serialize};

// ─── Request Types ───────────────────────────────────────────────────────────

/// Message role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single message in the conversation.
///
/// `images` holds base64-encoded payloads and is skipped when `None`, so
/// text-only conversations never carry the field on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
}

impl ChatMessage {
    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            images: None,
        }
    }

    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            images: None,
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            images: None,
        }
    }
}

/// Request body for `POST /api/chat`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<SamplingOptions>,
}

/// The `options` object within a chat request.
///
/// Each key is skipped when `None`; absent parameters are never sent as
/// `null`. The whole object is omitted from [`ChatRequest`] when no
/// parameter was supplied.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SamplingOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<i32>,
}

/// Per-call options for a chat request.
///
/// All fields are optional; `Default` gives a plain text-only call.
/// `max_tokens` maps to the wire name `num_predict`.
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    /// Sampling temperature (0.0 = deterministic, higher = more creative).
    pub temperature: Option<f32>,
    /// Nucleus sampling threshold.
    pub top_p: Option<f32>,
    /// Maximum number of tokens to generate.
    pub max_tokens: Option<i32>,
    /// Image references: remote URLs, local paths, or base64 payloads.
    pub images: Vec<String>,
}

impl ChatOptions {
    /// Collapse to the wire `options` object.
    ///
    /// Returns `None` when no sampling parameter was supplied, so the
    /// serialized request omits the object entirely.
    pub(crate) fn sampling(&self) -> Option<SamplingOptions> {
        if self.temperature.is_none() && self.top_p.is_none() && self.max_tokens.is_none() {
            return None;
        }
        Some(SamplingOptions {
            temperature: self.temperature,
            top_p: self.top_p,
            num_predict: self.max_tokens,
        })
    }
}

// ─── Response Types ──────────────────────────────────────────────────────────

/// Message payload within a chat response record.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub content: String,
}

/// A single decoded record from the streaming response.
///
/// Every field is defaulted so any JSON object the server emits decodes
/// cleanly; intermediate records carry `message`, the final record sets
/// `done` and the timing counters.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChunk {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub message: Option<ResponseMessage>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub total_duration: Option<u64>,
    #[serde(default)]
    pub eval_count: Option<u64>,
    #[serde(default)]
    pub eval_duration: Option<u64>,
    /// Server-reported error text, present on in-band error records.
    #[serde(default)]
    pub error: Option<String>,
}

impl ChatChunk {
    /// Incremental text carried by this record, if any.
    pub fn content(&self) -> &str {
        self.message
            .as_ref()
            .map(|m| m.content.as_str())
            .unwrap_or("")
    }
}

/// Normalized reply extracted from a non-streaming response.
#[derive(Debug, Clone)]
pub struct ChatReply {
    pub content: String,
    pub model: String,
    pub created_at: String,
    pub total_duration: Option<u64>,
    pub eval_count: Option<u64>,
    pub eval_duration: Option<u64>,
}

/// Outcome of a non-streaming chat call.
///
/// `Reply` is the normalized assistant message. `Raw` passes through any
/// JSON document that lacks a `message` field, so endpoints with other
/// response shapes can share the decoder.
#[derive(Debug, Clone)]
pub enum ChatOutcome {
    Reply(ChatReply),
    Raw(serde_json::Value),
}

impl ChatOutcome {
    /// The reply text, if this outcome is a normalized reply.
    pub fn content(&self) -> Option<&str> {
        match self {
            ChatOutcome::Reply(reply) => Some(&reply.content),
            ChatOutcome::Raw(_) => None,
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
