//! Axum Handlers for the REST API
//!
//! Token minting, pipeline data retrieval and the relays to the realtime agent
//! and RTC token services. It uses `utoipa` doc comments to generate OpenAPI
//! documentation.

use axum::{
    extract::{Query, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use negotiator_core::{
    negotiation::NegotiationContext, realtime_session::SessionRequest, relay::UpstreamResponse,
};
use std::{collections::BTreeMap, sync::Arc};
use tracing::{error, info, warn};

use crate::{
    models::{
        ChannelPayload, ErrorResponse, GenerateTokenPayload, RtcTokenRequest, StartAgentPayload,
    },
    state::AppState,
};

pub enum ApiError {
    /// The request body could not be parsed into the expected payload.
    InvalidRequest(JsonRejection),
    /// A relay target is not configured.
    ServiceUnavailable(String),
    /// An upstream service could not be reached.
    BadGateway(anyhow::Error),
    InternalServerError(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::InvalidRequest(rejection) => {
                warn!(error = %rejection.body_text(), "Invalid request data");
                let body = ErrorResponse::new("Invalid request data")
                    .with_details(rejection.body_text());
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            ApiError::ServiceUnavailable(message) => {
                (StatusCode::SERVICE_UNAVAILABLE, Json(ErrorResponse::new(message))).into_response()
            }
            ApiError::BadGateway(err) => {
                error!("Upstream request failed: {:?}", err);
                let body = ErrorResponse::new(format!("Upstream request failed: {err}"));
                (StatusCode::BAD_GATEWAY, Json(body)).into_response()
            }
            ApiError::InternalServerError(err) => {
                error!("Internal Server Error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse::new("An internal server error occurred.")),
                )
                    .into_response()
            }
        }
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::InternalServerError(err.into())
    }
}

/// Unwraps a JSON body, turning axum's rejection into a 400 `ErrorResponse`.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(ApiError::InvalidRequest)
}

/// Returns an upstream answer to the caller exactly as it was received.
fn passthrough(upstream: UpstreamResponse) -> Response {
    let status = StatusCode::from_u16(upstream.status).unwrap_or(StatusCode::BAD_GATEWAY);
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        upstream.body,
    )
        .into_response()
}

/// Liveness banner.
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Service is up", body = String))
)]
pub async fn root() -> &'static str {
    "Negotiator backend with pipeline poller running"
}

/// Return the latest persisted pipeline outputs.
#[utoipa::path(
    get,
    path = "/get-data",
    responses(
        (status = 200, description = "Stored pipeline outputs"),
        (status = 404, description = "No outputs stored yet", body = String),
        (status = 500, description = "Stored outputs are unreadable", body = ErrorResponse)
    )
)]
pub async fn get_data(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    match state.outputs.load().await? {
        Some(outputs) => Ok(Json(outputs).into_response()),
        None => Ok((StatusCode::NOT_FOUND, "Outputs not found").into_response()),
    }
}

/// Mint an ephemeral realtime session whose instructions are built from the query string.
///
/// Every query parameter is treated as a negotiation form field. The voice-AI
/// provider's response is returned unmodified.
#[utoipa::path(
    get,
    path = "/token",
    params(
        ("first_name" = Option<String>, Query, description = "Client first name"),
        ("last_name" = Option<String>, Query, description = "Client last name"),
        ("isp" = Option<String>, Query, description = "Current internet provider"),
        ("account_number" = Option<String>, Query, description = "ISP account number"),
        ("situation" = Option<String>, Query, description = "What the client wants out of the call")
    ),
    responses(
        (status = 200, description = "Provider session, including the client secret"),
        (status = 502, description = "Provider unreachable", body = ErrorResponse)
    )
)]
pub async fn token(
    State(state): State<Arc<AppState>>,
    Query(fields): Query<BTreeMap<String, String>>,
) -> Result<Response, ApiError> {
    let context = NegotiationContext::new(fields);
    let plan_data = match state.outputs.load().await {
        Ok(plan_data) => plan_data,
        Err(e) => {
            warn!(error = ?e, "Ignoring unreadable pipeline outputs");
            None
        }
    };

    let request = SessionRequest {
        model: state.config.realtime_model.clone(),
        voice: state.config.realtime_voice.clone(),
        instructions: state.prompt.render(&context, plan_data.as_ref()),
    };
    info!(
        fields = context.fields().len(),
        with_plan_data = plan_data.is_some(),
        "Minting realtime session"
    );

    let upstream = state
        .sessions
        .create_session(&request)
        .await
        .map_err(ApiError::BadGateway)?;
    Ok(passthrough(upstream))
}

/// Mint an RTC join token through the configured token service.
#[utoipa::path(
    post,
    path = "/generate-token",
    request_body = GenerateTokenPayload,
    responses(
        (status = 200, description = "Token service response"),
        (status = 400, description = "Malformed body", body = ErrorResponse),
        (status = 502, description = "Token service unreachable", body = ErrorResponse),
        (status = 503, description = "Token service not configured", body = ErrorResponse)
    )
)]
pub async fn generate_token(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<GenerateTokenPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    let payload = json_body(payload)?;
    let relay = state.token_relay.as_ref().ok_or_else(|| {
        ApiError::ServiceUnavailable("RTC_TOKEN_SERVICE_URL is not configured".to_string())
    })?;

    let ttl = state.config.rtc_token_ttl_secs;
    let request = RtcTokenRequest {
        channel_name: state.config.rtc_channel_name.clone(),
        uid: payload.uid,
        role: payload.role,
        token_expiration_secs: ttl,
        privilege_expiration_secs: ttl,
    };
    info!(uid = request.uid, role = request.role, channel = %request.channel_name, "Requesting RTC token");

    let upstream = relay
        .post_json("generate-token", &request)
        .await
        .map_err(ApiError::BadGateway)?;
    Ok(passthrough(upstream))
}

async fn relay_to_agent<T>(state: &AppState, route: &str, body: &T) -> Result<Response, ApiError>
where
    T: serde::Serialize + Sync,
{
    let relay = state.agent_relay.as_ref().ok_or_else(|| {
        ApiError::ServiceUnavailable("AGENT_SERVICE_URL is not configured".to_string())
    })?;
    let upstream = relay
        .post_json(route, body)
        .await
        .map_err(ApiError::BadGateway)?;
    if !upstream.is_success() {
        warn!(route, status = upstream.status, "Agent service rejected request");
    }
    Ok(passthrough(upstream))
}

/// Start the negotiation agent on a channel.
#[utoipa::path(
    post,
    path = "/start_agent",
    request_body = StartAgentPayload,
    responses(
        (status = 200, description = "Agent service response"),
        (status = 400, description = "Malformed body, or rejected by the agent service", body = ErrorResponse),
        (status = 502, description = "Agent service unreachable", body = ErrorResponse),
        (status = 503, description = "Agent service not configured", body = ErrorResponse)
    )
)]
pub async fn start_agent(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<StartAgentPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    let payload = json_body(payload)?;
    info!(channel = %payload.channel_name, uid = payload.uid, voice = %payload.voice, "Starting agent");
    relay_to_agent(&state, "start_agent", &payload).await
}

/// Stop the agent running on a channel.
#[utoipa::path(
    post,
    path = "/stop_agent",
    request_body = ChannelPayload,
    responses(
        (status = 200, description = "Agent service response"),
        (status = 400, description = "Malformed body, or no agent on that channel", body = ErrorResponse),
        (status = 502, description = "Agent service unreachable", body = ErrorResponse),
        (status = 503, description = "Agent service not configured", body = ErrorResponse)
    )
)]
pub async fn stop_agent(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChannelPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    let payload = json_body(payload)?;
    info!(channel = %payload.channel_name, "Stopping agent");
    relay_to_agent(&state, "stop_agent", &payload).await
}

/// Ask the agent on a channel to put the call on hold.
#[utoipa::path(
    post,
    path = "/hold_call",
    request_body = ChannelPayload,
    responses(
        (status = 200, description = "Agent service response"),
        (status = 400, description = "Malformed body", body = ErrorResponse),
        (status = 404, description = "No agent on that channel"),
        (status = 502, description = "Agent service unreachable", body = ErrorResponse),
        (status = 503, description = "Agent service not configured", body = ErrorResponse)
    )
)]
pub async fn hold_call(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChannelPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    let payload = json_body(payload)?;
    info!(channel = %payload.channel_name, "Holding call");
    relay_to_agent(&state, "hold_call", &payload).await
}
