//! Minimal async client for the Ollama chat API.
//!
//! This crate handles all communication with a local inference server:
//! - Streaming and non-streaming chat requests
//! - Newline-delimited JSON response decoding, tolerant of records split
//!   across network chunks
//! - Image attachment from remote URLs, local files, or raw base64
//! - Model listing and liveness probing
//!
//! Configuration is an explicit [`ClientConfig`] value passed to
//! [`Client::new`]; nothing is process-global. Transport and parse
//! failures are returned as [`ClientError`] values, never panics.

pub mod client;
pub mod config;
pub mod errors;
mod image;
pub mod message;
pub mod streaming;
pub mod types;

// Re-exports for convenience
pub use client::Client;
pub use config::ClientConfig;
pub use errors::{ClientError, Result};
pub use message::ChatInput;
pub use streaming::{decode_chat_stream, parse_chat_response, LineDecoder};
pub use types::{ChatChunk, ChatMessage, ChatOptions, ChatOutcome, ChatReply, Role};
