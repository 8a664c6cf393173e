//! Client configuration.
//!
//! Configuration is an explicit value handed to `Client::new`; nothing is
//! process-global. A config can be built in code, read from the
//! environment, or loaded from a YAML file with environment-variable
//! interpolation.

use std::path::Path;

use serde::Deserialize;

use crate::errors::{ClientError, Result};

/// Default chat API port.
pub const DEFAULT_PORT: u16 = 11434;

/// Connection settings for one server instance.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Host the server listens on. Required.
    pub server_ip: String,
    /// Port the server listens on.
    #[serde(default = "default_port")]
    pub server_port: u16,
    /// Model used when a call does not specify one.
    #[serde(default)]
    pub default_model: Option<String>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl ClientConfig {
    /// Configuration for a server at `server_ip` on the default port.
    pub fn new(server_ip: impl Into<String>) -> Self {
        Self {
            server_ip: server_ip.into(),
            server_port: DEFAULT_PORT,
            default_model: None,
        }
    }

    /// Override the server port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.server_port = port;
        self
    }

    /// Set the model used when a call does not specify one.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    /// Read configuration from `SMOLLAMA_SERVER_IP`, `SMOLLAMA_SERVER_PORT`
    /// and `SMOLLAMA_MODEL`.
    pub fn from_env() -> Result<Self> {
        let server_ip = std::env::var("SMOLLAMA_SERVER_IP").map_err(|_| ClientError::Config {
            reason: "SMOLLAMA_SERVER_IP is not set".to_string(),
        })?;
        let server_port = match std::env::var("SMOLLAMA_SERVER_PORT") {
            Ok(raw) => raw.parse().map_err(|_| ClientError::Config {
                reason: format!("invalid SMOLLAMA_SERVER_PORT: {raw}"),
            })?,
            Err(_) => DEFAULT_PORT,
        };
        let default_model = std::env::var("SMOLLAMA_MODEL").ok();
        Ok(Self {
            server_ip,
            server_port,
            default_model,
        })
    }

    /// Load configuration from a YAML file.
    ///
    /// String values matching `${VAR}` or `${VAR:-default}` are replaced
    /// from the environment before parsing.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ClientError::Config {
            reason: format!("failed to read {}: {e}", path.display()),
        })?;

        let interpolated = interpolate_env_vars(&raw);

        let config: ClientConfig =
            serde_yaml::from_str(&interpolated).map_err(|e| ClientError::Config {
                reason: format!("failed to parse {}: {e}", path.display()),
            })?;

        Ok(config)
    }

    /// Base URL for all endpoint paths on this server.
    pub fn base_url(&self) -> Result<String> {
        if self.server_ip.is_empty() {
            return Err(ClientError::Config {
                reason: "server IP not configured".to_string(),
            });
        }
        Ok(format!("http://{}:{}", self.server_ip, self.server_port))
    }
}

// ─── Env-var interpolation ───────────────────────────────────────────────────

/// Replace `${VAR}` and `${VAR:-default}` in a string.
fn interpolate_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_expr = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_expr.push(c);
            }
            result.push_str(&resolve_var_expr(&var_expr));
        } else {
            result.push(ch);
        }
    }

    result
}

/// Resolve a variable expression like `VAR` or `VAR:-default`.
fn resolve_var_expr(expr: &str) -> String {
    if let Some(idx) = expr.find(":-") {
        let var_name = &expr[..idx];
        let default = &expr[idx + 2..];
        std::env::var(var_name).unwrap_or_else(|_| default.to_string())
    } else {
        std::env::var(expr).unwrap_or_default()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
