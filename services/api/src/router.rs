//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the REST API and OpenAPI documentation.

use crate::{
    handlers,
    models::{
        ChannelPayload, ClientData, ErrorResponse, GenerateTokenPayload, RtcTokenRequest,
        StartAgentPayload, Voice,
    },
    state::AppState,
};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::root,
        handlers::get_data,
        handlers::token,
        handlers::generate_token,
        handlers::start_agent,
        handlers::stop_agent,
        handlers::hold_call,
    ),
    components(
        schemas(StartAgentPayload, ClientData, Voice, ChannelPayload, GenerateTokenPayload, RtcTokenRequest, ErrorResponse)
    ),
    tags(
        (name = "Negotiator API", description = "Voice session tokens, ISP plan data and agent control")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route("/", get(handlers::root))
        .route("/get-data", get(handlers::get_data))
        .route("/token", get(handlers::token))
        .route("/generate-token", post(handlers::generate_token))
        .route("/start_agent", post(handlers::start_agent))
        .route("/stop_agent", post(handlers::stop_agent))
        .route("/hold_call", post(handlers::hold_call))
        .with_state(app_state);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}
