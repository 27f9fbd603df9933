//! Ephemeral Realtime Sessions
//!
//! Mints short-lived voice-AI session credentials. The browser uses the
//! returned client secret to open its own WebRTC connection, so the provider's
//! response is handed back unmodified.

use crate::relay::UpstreamResponse;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-realtime-preview-2024-12-17";
pub const DEFAULT_VOICE: &str = "verse";

/// Parameters for a new realtime session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionRequest {
    pub model: String,
    pub voice: String,
    pub instructions: String,
}

/// A provider that can mint ephemeral realtime session credentials.
#[async_trait]
pub trait RealtimeSessionClient: Send + Sync {
    async fn create_session(&self, request: &SessionRequest) -> Result<UpstreamResponse>;
}

/// [`RealtimeSessionClient`] for the OpenAI Realtime API.
pub struct OpenAIRealtimeSessions {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl OpenAIRealtimeSessions {
    /// # Arguments
    ///
    /// * `api_base` - Base URL of the API, e.g. `https://api.openai.com/v1`.
    /// * `api_key` - Long-lived key used to mint the ephemeral one.
    pub fn new(http: reqwest::Client, api_base: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl RealtimeSessionClient for OpenAIRealtimeSessions {
    async fn create_session(&self, request: &SessionRequest) -> Result<UpstreamResponse> {
        let response = self
            .http
            .post(format!("{}/realtime/sessions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .context("Failed to create realtime session")?;

        let upstream = UpstreamResponse::read(response).await?;
        info!(
            status = upstream.status,
            model = %request.model,
            voice = %request.voice,
            "Realtime session requested"
        );
        Ok(upstream)
    }
}
