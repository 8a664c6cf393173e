//! Chat client for the Ollama HTTP API.
//!
//! Owns the transport for one server instance and drives both response
//! paths: a single aggregated reply, or an incremental stream of records
//! decoded as they arrive.

use std::time::Duration;

use futures::Stream;
use reqwest::Client as HttpClient;
use tracing::debug;

use crate::config::ClientConfig;
use crate::errors::{ClientError, Result};
use crate::image;
use crate::message::{self, ChatInput};
use crate::streaming::{parse_chat_response, parse_chat_stream};
use crate::types::{ChatChunk, ChatOptions, ChatOutcome, ChatRequest};

// ─── Constants ───────────────────────────────────────────────────────────────

/// TCP connection timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Total request timeout for non-streaming calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Total request timeout for streaming calls.
///
/// A full streamed generation can far outlast a single aggregated reply;
/// the model may spend minutes prefilling a large context before the first
/// record arrives, and the timeout covers the whole transfer.
const STREAM_REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

// ─── Client ──────────────────────────────────────────────────────────────────

/// Client for one chat API server.
///
/// Holds connection-reusing HTTP transports and the resolved model name.
/// Create one per server instance; sequential calls share the same
/// connections.
#[derive(Debug)]
pub struct Client {
    /// HTTP client for non-streaming requests.
    http: HttpClient,
    /// HTTP client for streaming requests (wider timeout).
    http_stream: HttpClient,
    base_url: String,
    model: String,
}

impl Client {
    /// Create a client from explicit configuration.
    ///
    /// Requires `server_ip` and a resolved model; both are validated here,
    /// before any network activity. Connectivity is not checked until the
    /// first request.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let base_url = config.base_url()?;
        let model = config.default_model.ok_or_else(|| ClientError::Config {
            reason: "model not specified".to_string(),
        })?;

        let http = HttpClient::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ClientError::Config {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        let http_stream = HttpClient::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(STREAM_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ClientError::Config {
                reason: format!("failed to build streaming HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            http_stream,
            base_url,
            model,
        })
    }

    /// The base URL this client targets.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The model sent with each request.
    pub fn model(&self) -> &str {
        &self.model
    }

    // ─── Chat (non-streaming) ────────────────────────────────────────────

    /// Send a chat request and wait for the single aggregated reply.
    ///
    /// Accepts a plain prompt, one structured message, or a full history
    /// (anything `Into<ChatInput>`). Transport failures come back as
    /// `Timeout` or `RequestFailed` values; the response body decodes per
    /// [`parse_chat_response`], with no HTTP status inspection.
    pub async fn chat(
        &self,
        input: impl Into<ChatInput>,
        options: ChatOptions,
    ) -> Result<ChatOutcome> {
        let request = self.build_request(input.into(), &options, false).await?;
        let url = format!("{}/api/chat", self.base_url);

        debug!(
            model = %request.model,
            message_count = request.messages.len(),
            stream = false,
            "sending chat request"
        );

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(request_error)?;

        let body = response.text().await.map_err(request_error)?;
        parse_chat_response(&body)
    }

    /// Convenience wrapper: one plain prompt with default options.
    pub async fn ask(&self, prompt: &str) -> Result<ChatOutcome> {
        self.chat(prompt, ChatOptions::default()).await
    }

    // ─── Chat (streaming) ────────────────────────────────────────────────

    /// Send a chat request and stream the reply incrementally.
    ///
    /// One [`ChatChunk`] is yielded per server record, in arrival order;
    /// the stream ending cleanly means the reply is complete. The next
    /// chunk is pulled from the transport only when the stream is polled,
    /// so consumer pace throttles the transfer. Dropping the stream aborts
    /// it. Every transport failure on this path, during connect or
    /// mid-body, surfaces as `StreamFailed`.
    pub async fn chat_stream(
        &self,
        input: impl Into<ChatInput>,
        options: ChatOptions,
    ) -> Result<impl Stream<Item = Result<ChatChunk>>> {
        let request = self.build_request(input.into(), &options, true).await?;
        let url = format!("{}/api/chat", self.base_url);

        debug!(
            model = %request.model,
            message_count = request.messages.len(),
            stream = true,
            "sending chat request"
        );

        let response = self
            .http_stream
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ClientError::StreamFailed {
                reason: e.to_string(),
            })?;

        Ok(parse_chat_stream(response))
    }

    // ─── Server endpoints ────────────────────────────────────────────────

    /// List the models the server has available.
    ///
    /// The `/api/tags` document is passed through without normalization.
    pub async fn list_models(&self) -> Result<serde_json::Value> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ClientError::ListModels {
                reason: e.to_string(),
            })?;

        response.json().await.map_err(|e| ClientError::ListModels {
            reason: e.to_string(),
        })
    }

    /// Check if the server is reachable.
    ///
    /// Never fails: any transport problem reads as `false`.
    pub async fn ping(&self) -> bool {
        let url = format!("{}/", self.base_url);

        match self.http.get(&url).timeout(CONNECT_TIMEOUT).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    // ─── Request assembly ────────────────────────────────────────────────

    async fn build_request(
        &self,
        input: ChatInput,
        options: &ChatOptions,
        stream: bool,
    ) -> Result<ChatRequest> {
        let mut messages = input.into_messages();
        // Shape errors surface before any image fetch or network I/O
        message::check_image_target(&messages, &options.images)?;

        if !options.images.is_empty() {
            let encoded = image::encode_images(&self.http, &options.images).await?;
            message::attach_images(&mut messages, encoded)?;
        }

        Ok(ChatRequest {
            model: self.model.clone(),
            messages,
            stream,
            options: options.sampling(),
        })
    }
}

fn request_error(e: reqwest::Error) -> ClientError {
    if e.is_timeout() {
        ClientError::Timeout {
            reason: e.to_string(),
        }
    } else {
        ClientError::RequestFailed {
            reason: e.to_string(),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use mockito::Matcher;
    use serde_json::json;

    fn client_for(server: &mockito::Server) -> Client {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("smollama=debug")
            .try_init();
        let addr = server.host_with_port();
        let (ip, port) = addr.rsplit_once(':').unwrap();
        let config = ClientConfig::new(ip)
            .with_port(port.parse().unwrap())
            .with_model("test-model");
        Client::new(config).unwrap()
    }

    /// Client pointed at a local port with nothing listening.
    fn unreachable_client() -> Client {
        let config = ClientConfig::new("127.0.0.1")
            .with_port(9)
            .with_model("test-model");
        Client::new(config).unwrap()
    }

    #[test]
    fn test_new_requires_model() {
        let err = Client::new(ClientConfig::new("localhost")).unwrap_err();
        assert!(matches!(err, ClientError::Config { .. }));
    }

    #[test]
    fn test_new_requires_server_ip() {
        let err = Client::new(ClientConfig::new("").with_model("m")).unwrap_err();
        assert!(matches!(err, ClientError::Config { .. }));
    }

    #[tokio::test]
    async fn test_chat_returns_normalized_reply() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/chat")
            .match_body(Matcher::PartialJson(json!({
                "model": "test-model",
                "stream": false,
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"model":"test-model","created_at":"2025-01-01T00:00:00Z","message":{"role":"assistant","content":"Hello!"},"done":true,"eval_count":3}"#,
            )
            .create_async()
            .await;

        let client = client_for(&server);
        let outcome = client.chat("Hi", ChatOptions::default()).await.unwrap();

        assert_eq!(outcome.content(), Some("Hello!"));
        match outcome {
            ChatOutcome::Reply(reply) => {
                assert_eq!(reply.model, "test-model");
                assert_eq!(reply.eval_count, Some(3));
            }
            ChatOutcome::Raw(_) => panic!("expected normalized reply"),
        }
    }

    #[tokio::test]
    async fn test_chat_error_body_passes_through_raw() {
        // The chat path never inspects HTTP status; a JSON error body
        // without a `message` field comes back as raw passthrough.
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/chat")
            .with_status(500)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":"model not found"}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let outcome = client.chat("Hi", ChatOptions::default()).await.unwrap();

        match outcome {
            ChatOutcome::Raw(value) => assert_eq!(value["error"], "model not found"),
            ChatOutcome::Reply(_) => panic!("expected raw passthrough"),
        }
    }

    #[tokio::test]
    async fn test_chat_empty_body_is_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/chat")
            .with_status(200)
            .with_body("")
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client.chat("Hi", ChatOptions::default()).await.unwrap_err();
        assert_eq!(err.to_string(), "Empty response");
    }

    #[tokio::test]
    async fn test_chat_non_json_body_keeps_raw() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/chat")
            .with_status(200)
            .with_body("oops")
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client.chat("Hi", ChatOptions::default()).await.unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse response:"));
        assert_eq!(err.raw_body(), Some("oops"));
    }

    #[tokio::test]
    async fn test_chat_connection_refused_maps_to_request_failed() {
        let client = unreachable_client();
        let err = client.chat("Hi", ChatOptions::default()).await.unwrap_err();
        assert!(err.to_string().starts_with("Request failed:"));
    }

    #[tokio::test]
    async fn test_chat_sends_sampling_options() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/chat")
            .match_body(Matcher::PartialJson(json!({
                "options": {"temperature": 0.5}
            })))
            .with_status(200)
            .with_body(r#"{"message":{"content":"ok"},"model":"test-model"}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let options = ChatOptions {
            temperature: Some(0.5),
            ..Default::default()
        };
        client.chat("Hi", options).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_chat_attaches_fetched_image() {
        let mut server = mockito::Server::new_async().await;
        let _image_mock = server
            .mock("GET", "/cat.png")
            .with_status(200)
            .with_body("pixels")
            .create_async()
            .await;
        let chat_mock = server
            .mock("POST", "/api/chat")
            .match_body(Matcher::PartialJson(json!({
                "messages": [{"role": "user", "content": "look", "images": ["cGl4ZWxz"]}]
            })))
            .with_status(200)
            .with_body(r#"{"message":{"content":"a cat"},"model":"test-model"}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let options = ChatOptions {
            images: vec![format!("{}/cat.png", server.url())],
            ..Default::default()
        };
        let outcome = client.chat("look", options).await.unwrap();

        assert_eq!(outcome.content(), Some("a cat"));
        chat_mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_chat_images_without_messages_fails_before_send() {
        let client = unreachable_client();
        let options = ChatOptions {
            images: vec!["aGVsbG8=".to_string()],
            ..Default::default()
        };
        let err = client
            .chat(Vec::<crate::types::ChatMessage>::new(), options)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn test_ask_returns_reply_content() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/chat")
            .with_status(200)
            .with_body(r#"{"message":{"content":"four"},"model":"test-model"}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let outcome = client.ask("What is 2+2?").await.unwrap();
        assert_eq!(outcome.content(), Some("four"));
    }

    #[tokio::test]
    async fn test_chat_stream_yields_records_in_order() {
        let body = "{\"message\":{\"role\":\"assistant\",\"content\":\"Hel\"},\"done\":false}\n\
                    {\"message\":{\"role\":\"assistant\",\"content\":\"lo\"},\"done\":false}\n\
                    {\"done\":true,\"eval_count\":2}\n";
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/chat")
            .match_body(Matcher::PartialJson(json!({"stream": true})))
            .with_status(200)
            .with_header("content-type", "application/x-ndjson")
            .with_body(body)
            .create_async()
            .await;

        let client = client_for(&server);
        let stream = client
            .chat_stream("Hi", ChatOptions::default())
            .await
            .unwrap();
        let chunks: Vec<_> = stream.collect().await;

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].as_ref().unwrap().content(), "Hel");
        assert_eq!(chunks[1].as_ref().unwrap().content(), "lo");
        assert!(chunks[2].as_ref().unwrap().done);
    }

    #[tokio::test]
    async fn test_chat_stream_connect_error_maps_to_stream_failed() {
        let client = unreachable_client();
        let err = client
            .chat_stream("Hi", ChatOptions::default())
            .await
            .err()
            .expect("connect failure should surface as an error");
        assert!(err.to_string().starts_with("Stream failed:"));
    }

    #[tokio::test]
    async fn test_list_models_passes_through() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/tags")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"models":[{"name":"llama3.2"},{"name":"qwen2.5"}]}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let models = client.list_models().await.unwrap();
        assert_eq!(models["models"][0]["name"], "llama3.2");
        assert_eq!(models["models"][1]["name"], "qwen2.5");
    }

    #[tokio::test]
    async fn test_list_models_failure_renders_message() {
        let client = unreachable_client();
        let err = client.list_models().await.unwrap_err();
        assert!(err.to_string().starts_with("Failed to list models:"));
    }

    #[tokio::test]
    async fn test_ping_true_when_server_responds() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/")
            .with_status(200)
            .with_body("Ollama is running")
            .create_async()
            .await;

        let client = client_for(&server);
        assert!(client.ping().await);
    }

    #[tokio::test]
    async fn test_ping_false_when_unreachable() {
        let client = unreachable_client();
        assert!(!client.ping().await);
    }
}
