//! Main Entrypoint for the Negotiator API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Loading the negotiation prompt template.
//! 3. Initializing the outbound clients and the output store.
//! 4. Starting the scheduled pipeline poller, when configured.
//! 5. Constructing the Axum router and applying middleware.
//! 6. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use negotiator_api::{config::Config, router::create_router, state::AppState};
use negotiator_core::{
    negotiation::PromptTemplate,
    outputs::OutputStore,
    pipeline::{GumloopClient, PipelinePoller},
    realtime_session::{OpenAIRealtimeSessions, RealtimeSessionClient},
    relay::JsonRelay,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C; shutting down");
        return;
    }
    info!("Received shutdown signal. Shutting down gracefully...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    // --- 2. Load Prompt Template ---
    let prompt_file = config.prompts_path.join("negotiation.md");
    let prompt = match PromptTemplate::from_file(&prompt_file)? {
        Some(template) => {
            info!(path = %prompt_file.display(), "Loaded negotiation prompt");
            template
        }
        None => {
            warn!(path = %prompt_file.display(), "Prompt file not found; using built-in prompt");
            PromptTemplate::default()
        }
    };

    // --- 3. Initialize Shared Services ---
    let http = reqwest::Client::builder()
        .user_agent(concat!("negotiator/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    let outputs = Arc::new(OutputStore::new(&config.outputs_path));
    let sessions: Arc<dyn RealtimeSessionClient> = Arc::new(OpenAIRealtimeSessions::new(
        http.clone(),
        config.openai_api_base.clone(),
        config.openai_api_key.clone(),
    ));
    let agent_relay = config
        .agent_service_url
        .as_ref()
        .map(|url| Arc::new(JsonRelay::new(http.clone(), url.clone())));
    let token_relay = config
        .rtc_token_service_url
        .as_ref()
        .map(|url| Arc::new(JsonRelay::new(http.clone(), url.clone())));
    if agent_relay.is_none() {
        warn!("AGENT_SERVICE_URL not set; agent control routes will answer 503");
    }
    if token_relay.is_none() {
        warn!("RTC_TOKEN_SERVICE_URL not set; /generate-token will answer 503");
    }

    // --- 4. Start Pipeline Poller ---
    match &config.pipeline {
        Some(pipeline) => {
            let client = Arc::new(GumloopClient::new(http.clone(), pipeline.gumloop.clone()));
            let poller = Arc::new(PipelinePoller::new(
                client,
                OutputStore::new(&config.outputs_path),
                pipeline.poll_interval,
            ));
            if pipeline.run_on_startup {
                let poller = Arc::clone(&poller);
                tokio::spawn(async move { poller.run_logged().await });
            }
            info!(
                at = %pipeline.schedule.time(),
                poll_interval = ?pipeline.poll_interval,
                "Pipeline poller enabled"
            );
            tokio::spawn(poller.run_on_schedule(pipeline.schedule));
        }
        None => warn!("Gumloop settings incomplete; pipeline poller disabled"),
    }

    let app_state = Arc::new(AppState {
        outputs,
        sessions,
        prompt: Arc::new(prompt),
        agent_relay,
        token_relay,
        config: Arc::new(config.clone()),
    });

    // --- 5. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    // --- 6. Start Server ---
    info!(
        model = %config.realtime_model,
        voice = %config.realtime_voice,
        bind_address = %config.bind_address,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server has shut down.");
    Ok(())
}
