//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds the output store,
//! outbound service clients and configuration shared by every handler.

use crate::config::Config;
use negotiator_core::{
    negotiation::PromptTemplate, outputs::OutputStore, realtime_session::RealtimeSessionClient,
    relay::JsonRelay,
};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub outputs: Arc<OutputStore>,
    pub sessions: Arc<dyn RealtimeSessionClient>,
    pub prompt: Arc<PromptTemplate>,
    /// Relay to the realtime agent service, if one is configured.
    pub agent_relay: Option<Arc<JsonRelay>>,
    /// Relay to the RTC token service, if one is configured.
    pub token_relay: Option<Arc<JsonRelay>>,
    pub config: Arc<Config>,
}
