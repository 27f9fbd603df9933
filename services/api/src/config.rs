use negotiator_core::{
    pipeline::{DEFAULT_POLL_INTERVAL, GumloopSettings},
    realtime_session::{DEFAULT_API_BASE, DEFAULT_MODEL, DEFAULT_VOICE},
    schedule::DailySchedule,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

pub const DEFAULT_GUMLOOP_API_BASE: &str = "https://api.gumloop.com/api/v1";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Settings for the scheduled pipeline poller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineConfig {
    pub gumloop: GumloopSettings,
    pub poll_interval: Duration,
    pub schedule: DailySchedule,
    pub run_on_startup: bool,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub openai_api_key: String,
    pub openai_api_base: String,
    pub realtime_model: String,
    pub realtime_voice: String,
    pub log_level: Level,
    pub prompts_path: PathBuf,
    pub outputs_path: PathBuf,
    /// `None` when any of the Gumloop variables is unset.
    pub pipeline: Option<PipelineConfig>,
    pub agent_service_url: Option<String>,
    pub rtc_token_service_url: Option<String>,
    pub rtc_channel_name: String,
    pub rtc_token_ttl_secs: u32,
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(name: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    var_or(name, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string()))
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address = parse_var::<SocketAddr>("BIND_ADDRESS", "0.0.0.0:3000")?;

        let openai_api_key = non_empty_var("OPENAI_API_KEY")
            .or_else(|| non_empty_var("VITE_OPENAI_API_KEY"))
            .ok_or_else(|| ConfigError::MissingVar("OPENAI_API_KEY".to_string()))?;

        let log_level_str = var_or("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let pipeline = Self::pipeline_from_env()?;

        let rtc_token_ttl_secs = parse_var::<u32>("RTC_TOKEN_TTL_SECS", "3600")?;

        Ok(Self {
            bind_address,
            openai_api_key,
            openai_api_base: var_or("OPENAI_API_BASE", DEFAULT_API_BASE),
            realtime_model: var_or("REALTIME_MODEL", DEFAULT_MODEL),
            realtime_voice: var_or("REALTIME_VOICE", DEFAULT_VOICE),
            log_level,
            prompts_path: PathBuf::from(var_or("PROMPTS_PATH", "./prompts")),
            outputs_path: PathBuf::from(var_or("OUTPUTS_PATH", "outputs.json")),
            pipeline,
            agent_service_url: non_empty_var("AGENT_SERVICE_URL"),
            rtc_token_service_url: non_empty_var("RTC_TOKEN_SERVICE_URL"),
            rtc_channel_name: var_or("RTC_CHANNEL_NAME", "channelName"),
            rtc_token_ttl_secs,
        })
    }

    fn pipeline_from_env() -> Result<Option<PipelineConfig>, ConfigError> {
        let (
            Some(user_id),
            Some(saved_item_id),
            Some(auth_token),
            Some(input_name),
            Some(input_value),
        ) = (
            non_empty_var("GUMLOOP_USER_ID"),
            non_empty_var("GUMLOOP_SAVED_ITEM_ID"),
            non_empty_var("AUTH_TOKEN"),
            non_empty_var("PIPELINE_INPUT_NAME"),
            non_empty_var("PIPELINE_INPUT_VALUE"),
        )
        else {
            return Ok(None);
        };

        let poll_secs = parse_var::<u64>(
            "PIPELINE_POLL_INTERVAL_SECS",
            &DEFAULT_POLL_INTERVAL.as_secs().to_string(),
        )?;
        if poll_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "PIPELINE_POLL_INTERVAL_SECS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Some(PipelineConfig {
            gumloop: GumloopSettings {
                api_base: var_or("GUMLOOP_API_BASE", DEFAULT_GUMLOOP_API_BASE),
                user_id,
                saved_item_id,
                auth_token,
                input_name,
                input_value,
            },
            poll_interval: Duration::from_secs(poll_secs),
            schedule: parse_var::<DailySchedule>("PIPELINE_SCHEDULE", "00:00")?,
            run_on_startup: parse_var::<bool>("PIPELINE_RUN_ON_STARTUP", "false")?,
        }))
    }
}
