//! Caller input normalization.
//!
//! A chat call accepts a plain prompt, one structured message, or a full
//! conversation history. The shape is fixed at the call boundary by
//! [`ChatInput`]; no runtime inspection happens downstream.

use crate::errors::{ClientError, Result};
use crate::types::ChatMessage;

/// Caller input for one chat call, one variant per accepted shape.
#[derive(Debug, Clone)]
pub enum ChatInput {
    /// Plain text, sent as a single `user` message.
    Prompt(String),
    /// One structured message.
    Message(ChatMessage),
    /// A full conversation history, passed through unchanged.
    History(Vec<ChatMessage>),
}

impl ChatInput {
    /// Produce the wire message list for this input.
    pub(crate) fn into_messages(self) -> Vec<ChatMessage> {
        match self {
            ChatInput::Prompt(text) => vec![ChatMessage::user(text)],
            ChatInput::Message(message) => vec![message],
            ChatInput::History(messages) => messages,
        }
    }
}

impl From<&str> for ChatInput {
    fn from(value: &str) -> Self {
        ChatInput::Prompt(value.to_string())
    }
}

impl From<String> for ChatInput {
    fn from(value: String) -> Self {
        ChatInput::Prompt(value)
    }
}

impl From<ChatMessage> for ChatInput {
    fn from(value: ChatMessage) -> Self {
        ChatInput::Message(value)
    }
}

impl From<Vec<ChatMessage>> for ChatInput {
    fn from(value: Vec<ChatMessage>) -> Self {
        ChatInput::History(value)
    }
}

fn empty_target_error() -> ClientError {
    ClientError::InvalidInput {
        reason: "images require at least one message to attach to".to_string(),
    }
}

/// Validate that `images` have a message to land on.
///
/// Runs before image encoding so the shape error surfaces before any
/// fetch or file read.
pub(crate) fn check_image_target(messages: &[ChatMessage], images: &[String]) -> Result<()> {
    if !images.is_empty() && messages.is_empty() {
        return Err(empty_target_error());
    }
    Ok(())
}

/// Attach encoded images to the last message in the list, replacing any
/// previous attachment. Attaching to an empty list fails; the images must
/// never be silently dropped.
pub(crate) fn attach_images(messages: &mut [ChatMessage], images: Vec<String>) -> Result<()> {
    if images.is_empty() {
        return Ok(());
    }
    match messages.last_mut() {
        Some(last) => {
            last.images = Some(images);
            Ok(())
        }
        None => Err(empty_target_error()),
    }
}
