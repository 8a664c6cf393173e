//! Image reference resolution.
//!
//! Each reference is resolved in priority order: remote URL (fetched and
//! encoded), existing local file (read and encoded), anything else passed
//! through as an already-base64 payload.

use base64::prelude::*;
use std::path::Path;
use tracing::warn;

use crate::errors::{ClientError, Result};

/// How a single reference will be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RefKind {
    Url,
    File,
    Base64,
}

/// Classify one reference. The file check runs against the current
/// filesystem state, so classification happens at resolution time.
pub(crate) fn classify(reference: &str) -> RefKind {
    if reference.starts_with("http://") || reference.starts_with("https://") {
        RefKind::Url
    } else if Path::new(reference).exists() {
        RefKind::File
    } else {
        RefKind::Base64
    }
}

/// Resolve every reference to a base64 payload, one output per input,
/// order preserved.
///
/// URL fetches go through the supplied HTTP client. A fetch or read
/// failure fails the whole call; references are never silently dropped.
pub(crate) async fn encode_images(http: &reqwest::Client, refs: &[String]) -> Result<Vec<String>> {
    let mut encoded = Vec::with_capacity(refs.len());
    for reference in refs {
        encoded.push(encode_one(http, reference).await?);
    }
    Ok(encoded)
}

async fn encode_one(http: &reqwest::Client, reference: &str) -> Result<String> {
    match classify(reference) {
        RefKind::Url => fetch_and_encode(http, reference).await,
        RefKind::File => read_and_encode(reference),
        RefKind::Base64 => Ok(reference.to_string()),
    }
}

async fn fetch_and_encode(http: &reqwest::Client, url: &str) -> Result<String> {
    let response = http
        .get(url)
        .send()
        .await
        .and_then(|resp| resp.error_for_status())
        .map_err(|e| fetch_error(url, e.to_string()))?;
    let bytes = response
        .bytes()
        .await
        .map_err(|e| fetch_error(url, e.to_string()))?;
    Ok(BASE64_STANDARD.encode(&bytes))
}

fn fetch_error(url: &str, reason: String) -> ClientError {
    warn!(url, %reason, "image fetch failed");
    ClientError::InvalidImage {
        reference: url.to_string(),
        reason,
    }
}

fn read_and_encode(path: &str) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|e| ClientError::InvalidImage {
        reference: path.to_string(),
        reason: e.to_string(),
    })?;
    Ok(BASE64_STANDARD.encode(&bytes))
}
