//! Response decoding for the chat endpoint.
//!
//! The streaming side reads a `reqwest::Response` as a byte stream, splits
//! it on newlines, and decodes each record as JSON, tolerating records
//! split across network chunks. The non-streaming side decodes one whole
//! body into a normalized outcome.

use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::errors::{ClientError, Result};
use crate::types::{ChatChunk, ChatOutcome, ChatReply};

// ─── Line decoder ────────────────────────────────────────────────────────────

/// Incremental decoder for newline-delimited JSON.
///
/// The buffer holds at most one partial trailing line between feeds; every
/// complete line is drained and decoded before more bytes are appended.
/// Scanning happens on raw bytes, so multi-byte UTF-8 sequences split
/// across network chunks reassemble before any text decoding.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Append raw transport bytes.
    pub fn feed(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Decode the next complete line, if one is buffered.
    ///
    /// Whitespace-only lines are skipped. A line that is not valid JSON
    /// yields a `LineParse` error item; later lines still decode.
    pub fn next_event(&mut self) -> Option<Result<serde_json::Value>> {
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line_bytes: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line_bytes);
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            return Some(serde_json::from_str(trimmed).map_err(|e| {
                warn!(reason = %e, line = preview(trimmed), "failed to parse stream line");
                ClientError::LineParse {
                    line: trimmed.to_string(),
                    reason: e.to_string(),
                }
            }));
        }
        None
    }

    /// End of stream: discard any unterminated trailing fragment.
    ///
    /// The server terminates every record with a newline, so a non-empty
    /// buffer here means the transfer was cut short. Partial records are
    /// never emitted.
    pub fn finish(&mut self) {
        if !self.buffer.is_empty() {
            debug!(
                bytes = self.buffer.len(),
                "discarding unterminated stream fragment"
            );
            self.buffer.clear();
        }
    }
}

fn preview(line: &str) -> &str {
    match line.char_indices().nth(120) {
        Some((idx, _)) => &line[..idx],
        None => line,
    }
}

// ─── Chat stream ─────────────────────────────────────────────────────────────

/// Decode a newline-delimited JSON byte stream into chat records.
///
/// One [`ChatChunk`] is emitted per complete record, in arrival order. A
/// malformed line yields a recoverable `LineParse` item; a transport error
/// yields a `StreamFailed` item and ends the stream.
pub fn decode_chat_stream<S, B, E>(bytes: S) -> impl Stream<Item = Result<ChatChunk>>
where
    S: Stream<Item = std::result::Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    stream::unfold(
        (bytes, LineDecoder::new(), false),
        |(mut bytes, mut decoder, failed)| async move {
            if failed {
                return None;
            }
            loop {
                // Drain buffered records before pulling more bytes
                if let Some(event) = decoder.next_event() {
                    let item = event.and_then(chunk_from_value);
                    return Some((item, (bytes, decoder, false)));
                }

                match bytes.next().await {
                    Some(Ok(chunk)) => decoder.feed(chunk.as_ref()),
                    Some(Err(e)) => {
                        return Some((
                            Err(ClientError::StreamFailed {
                                reason: e.to_string(),
                            }),
                            (bytes, decoder, true),
                        ));
                    }
                    None => {
                        decoder.finish();
                        debug!("chat stream complete");
                        return None;
                    }
                }
            }
        },
    )
}

/// Decode the body of a streaming chat response.
pub fn parse_chat_stream(response: reqwest::Response) -> impl Stream<Item = Result<ChatChunk>> {
    decode_chat_stream(response.bytes_stream())
}

fn chunk_from_value(value: serde_json::Value) -> Result<ChatChunk> {
    ChatChunk::deserialize(&value).map_err(|e| ClientError::LineParse {
        line: value.to_string(),
        reason: e.to_string(),
    })
}

// ─── Non-streaming decode ────────────────────────────────────────────────────

/// Decode a non-streaming chat response body.
///
/// An empty body and a non-JSON body are errors. A JSON document with a
/// `message` field becomes a normalized [`ChatReply`]; any other document
/// is passed through raw, so endpoints with other response shapes can
/// share this decoder.
pub fn parse_chat_response(raw: &str) -> Result<ChatOutcome> {
    if raw.is_empty() {
        return Err(ClientError::EmptyResponse);
    }

    let data: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| ClientError::ResponseParse {
            reason: e.to_string(),
            raw: raw.to_string(),
        })?;

    let has_message = data.get("message").map(|m| !m.is_null()).unwrap_or(false);
    if !has_message {
        return Ok(ChatOutcome::Raw(data));
    }

    #[derive(Deserialize)]
    struct Body {
        message: BodyMessage,
        #[serde(default)]
        model: String,
        #[serde(default)]
        created_at: String,
        total_duration: Option<u64>,
        eval_count: Option<u64>,
        eval_duration: Option<u64>,
    }

    #[derive(Deserialize)]
    struct BodyMessage {
        #[serde(default)]
        content: String,
    }

    let body = Body::deserialize(&data).map_err(|e| ClientError::ResponseParse {
        reason: e.to_string(),
        raw: raw.to_string(),
    })?;

    Ok(ChatOutcome::Reply(ChatReply {
        content: body.message.content,
        model: body.model,
        created_at: body.created_at,
        total_duration: body.total_duration,
        eval_count: body.eval_count,
        eval_duration: body.eval_duration,
    }))
}

// ─── Tests ───────────────────────────────────────────────────────────────────
