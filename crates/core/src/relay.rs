//! JSON Relay
//!
//! Forwards JSON requests to another HTTP service and hands back whatever the
//! upstream answered, status and body untouched.

use anyhow::{Context, Result};
use bytes::Bytes;
use serde::Serialize;
use tracing::debug;

/// A response received from an upstream service, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: Bytes,
}

impl UpstreamResponse {
    /// Reads status and body bytes out of a `reqwest` response.
    pub async fn read(response: reqwest::Response) -> Result<Self> {
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .context("Failed to read upstream response body")?;
        Ok(Self { status, body })
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Posts JSON bodies to paths under a fixed base URL.
#[derive(Clone, Debug)]
pub struct JsonRelay {
    http: reqwest::Client,
    base_url: String,
}

impl JsonRelay {
    /// Creates a relay for the service at `base_url` (e.g. `http://localhost:8080`).
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends `body` as JSON to `{base_url}/{path}`.
    pub async fn post_json<T>(&self, path: &str, body: &T) -> Result<UpstreamResponse>
    where
        T: Serialize + ?Sized + Sync,
    {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        debug!(%url, "Relaying request");
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Request to {url} failed"))?;
        UpstreamResponse::read(response).await
    }
}
