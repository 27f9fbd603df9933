//! API Models
//!
//! Request and response payloads for the HTTP API, with `utoipa` schemas for
//! the OpenAPI document.

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Voices accepted by the realtime agent.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Voice {
    #[default]
    Alloy,
    Ash,
    Ballad,
    Coral,
    Echo,
    Sage,
    Shimmer,
    Verse,
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Voice::Alloy => "alloy",
            Voice::Ash => "ash",
            Voice::Ballad => "ballad",
            Voice::Coral => "coral",
            Voice::Echo => "echo",
            Voice::Sage => "sage",
            Voice::Shimmer => "shimmer",
            Voice::Verse => "verse",
        };
        f.write_str(name)
    }
}

/// The client's account details the agent may need during the call.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct ClientData {
    #[schema(example = "Jane Doe")]
    pub name: String,
    #[schema(example = "1990-01-01")]
    pub date_of_birth: String,
    #[schema(example = "123 Main St")]
    pub home_address: String,
    #[schema(example = "ACC123456")]
    pub account_number: String,
}

fn default_language() -> String {
    "en".to_string()
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct StartAgentPayload {
    #[schema(example = "channelName")]
    pub channel_name: String,
    #[schema(example = 9999)]
    pub uid: u32,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub system_instruction: String,
    #[serde(default)]
    pub voice: Voice,
    pub client_data: ClientData,
    pub client_name: String,
    pub client_dob: String,
    pub client_address: String,
    pub client_account_number: String,
}

/// Body for `/stop_agent` and `/hold_call`.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct ChannelPayload {
    #[schema(example = "channelName")]
    pub channel_name: String,
}

#[derive(Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct GenerateTokenPayload {
    #[schema(example = 1234)]
    pub uid: u32,
    /// 1 publishes, 2 only subscribes.
    #[schema(example = 1)]
    pub role: u32,
}

/// What is forwarded to the RTC token service.
#[derive(Serialize, ToSchema, Debug, Clone, PartialEq)]
pub struct RtcTokenRequest {
    pub channel_name: String,
    pub uid: u32,
    pub role: u32,
    pub token_expiration_secs: u32,
    pub privilege_expiration_secs: u32,
}

/// Error body for every failure this service produces itself.
#[derive(Serialize, ToSchema, Debug)]
pub struct ErrorResponse {
    #[schema(example = "Invalid request data")]
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_voice_serialization() {
        assert_eq!(serde_json::to_string(&Voice::Shimmer).unwrap(), "\"shimmer\"");
        let verse: Voice = serde_json::from_str("\"verse\"").unwrap();
        assert_eq!(verse, Voice::Verse);
        assert_eq!(verse.to_string(), "verse");
    }

    #[test]
    fn test_unknown_voice_is_rejected() {
        let result: Result<Voice, _> = serde_json::from_str("\"robot\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_start_agent_payload_defaults() {
        let payload: StartAgentPayload = serde_json::from_value(json!({
            "channel_name": "channelName",
            "uid": 9999,
            "client_data": {
                "name": "Jane Doe",
                "date_of_birth": "1990-01-01",
                "home_address": "123 Main St",
                "account_number": "ACC123456"
            },
            "client_name": "Jane Doe",
            "client_dob": "1990-01-01",
            "client_address": "123 Main St",
            "client_account_number": "ACC123456"
        }))
        .unwrap();

        assert_eq!(payload.language, "en");
        assert_eq!(payload.system_instruction, "");
        assert_eq!(payload.voice, Voice::Alloy);
        assert_eq!(payload.client_data.account_number, "ACC123456");
    }

    #[test]
    fn test_start_agent_payload_missing_client_data() {
        let result: Result<StartAgentPayload, _> = serde_json::from_value(json!({
            "channel_name": "channelName",
            "uid": 9999
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_generate_token_payload() {
        let payload: GenerateTokenPayload =
            serde_json::from_str(r#"{"uid": 1234, "role": 1}"#).unwrap();
        assert_eq!(payload, GenerateTokenPayload { uid: 1234, role: 1 });
    }

    #[test]
    fn test_error_response_serialization() {
        let json = serde_json::to_string(&ErrorResponse::new("Outputs not found")).unwrap();
        assert_eq!(json, r#"{"error":"Outputs not found"}"#);

        let json = serde_json::to_string(
            &ErrorResponse::new("Invalid request data").with_details("missing field `uid`"),
        )
        .unwrap();
        assert_eq!(
            json,
            r#"{"error":"Invalid request data","details":"missing field `uid`"}"#
        );
    }
}
