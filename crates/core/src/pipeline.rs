//! Pipeline Poller
//!
//! Starts an externally hosted data pipeline (Gumloop), polls its run status at
//! a fixed interval until it leaves the `RUNNING` state, and persists the run's
//! outputs through the [`OutputStore`].

use crate::{outputs::OutputStore, schedule::DailySchedule};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{error, info, warn};

/// The only non-terminal run state reported by the pipeline service.
pub const RUNNING_STATE: &str = "RUNNING";

/// Default delay between two status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("No run_id received in the start response: {0}")]
    MissingRunId(Value),
    #[error("A pipeline run is already in flight")]
    AlreadyRunning,
}

/// Body returned when a pipeline run is started.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StartResponse {
    #[serde(default)]
    pub run_id: Option<String>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// A snapshot of a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStatus {
    pub state: String,
    #[serde(default)]
    pub outputs: Value,
}

impl RunStatus {
    pub fn is_running(&self) -> bool {
        self.state == RUNNING_STATE
    }
}

/// The operations the poller needs from a pipeline service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PipelineClient: Send + Sync {
    /// Kicks off a new run of the configured pipeline.
    async fn start_run(&self) -> Result<StartResponse>;

    /// Fetches the current status of the run identified by `run_id`.
    async fn run_status(&self, run_id: &str) -> Result<RunStatus>;
}

/// Connection details for a saved Gumloop pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GumloopSettings {
    pub api_base: String,
    pub user_id: String,
    pub saved_item_id: String,
    pub auth_token: String,
    pub input_name: String,
    pub input_value: String,
}

/// [`PipelineClient`] backed by the Gumloop REST API.
pub struct GumloopClient {
    http: reqwest::Client,
    settings: GumloopSettings,
}

impl GumloopClient {
    pub fn new(http: reqwest::Client, settings: GumloopSettings) -> Self {
        Self { http, settings }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.settings.api_base.trim_end_matches('/'), endpoint)
    }
}

#[async_trait]
impl PipelineClient for GumloopClient {
    async fn start_run(&self) -> Result<StartResponse> {
        let body = json!({
            "user_id": self.settings.user_id,
            "saved_item_id": self.settings.saved_item_id,
            "pipeline_inputs": [{
                "input_name": self.settings.input_name,
                "value": self.settings.input_value,
            }],
        });

        let response = self
            .http
            .post(self.url("start_pipeline"))
            .bearer_auth(&self.settings.auth_token)
            .json(&body)
            .send()
            .await
            .context("Failed to start pipeline")?
            .error_for_status()?;

        let started: StartResponse = response
            .json()
            .await
            .context("Invalid start_pipeline response")?;
        info!(run_id = ?started.run_id, "Pipeline started");
        Ok(started)
    }

    async fn run_status(&self, run_id: &str) -> Result<RunStatus> {
        let response = self
            .http
            .get(self.url("get_pl_run"))
            .query(&[("run_id", run_id), ("user_id", &self.settings.user_id)])
            .bearer_auth(&self.settings.auth_token)
            .send()
            .await
            .context("Failed to check pipeline status")?
            .error_for_status()?;

        response
            .json()
            .await
            .context("Invalid get_pl_run response")
    }
}

/// Polls `run_id` every `interval` until the run is no longer `RUNNING`.
///
/// There is no upper bound on the number of polls. The first client error
/// ends the loop and is returned.
pub async fn poll_until_terminal(
    client: &dyn PipelineClient,
    run_id: &str,
    interval: Duration,
) -> Result<RunStatus> {
    loop {
        let status = client.run_status(run_id).await?;
        if !status.is_running() {
            info!(%run_id, state = %status.state, "Pipeline completed");
            return Ok(status);
        }
        info!(%run_id, retry_in = ?interval, "Pipeline still running");
        tokio::time::sleep(interval).await;
    }
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Runs the start → poll → persist cycle, once or on a daily schedule.
pub struct PipelinePoller {
    client: Arc<dyn PipelineClient>,
    store: OutputStore,
    poll_interval: Duration,
    in_flight: AtomicBool,
}

impl PipelinePoller {
    pub fn new(client: Arc<dyn PipelineClient>, store: OutputStore, poll_interval: Duration) -> Self {
        Self {
            client,
            store,
            poll_interval,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Starts one pipeline run, waits for it to finish and saves its outputs.
    ///
    /// Fails with [`PipelineError::AlreadyRunning`] if another run started by
    /// this poller has not finished yet.
    pub async fn run_once(&self) -> Result<RunStatus> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            return Err(PipelineError::AlreadyRunning.into());
        }
        let _guard = InFlight(&self.in_flight);

        let started = self.client.start_run().await?;
        let run_id = started
            .run_id
            .ok_or_else(|| PipelineError::MissingRunId(Value::Object(started.rest)))?;

        let status = poll_until_terminal(self.client.as_ref(), &run_id, self.poll_interval).await?;
        self.store.save(&status.outputs).await?;
        Ok(status)
    }

    /// [`run_once`](Self::run_once), with every failure logged instead of returned.
    pub async fn run_logged(&self) {
        match self.run_once().await {
            Ok(status) => info!(state = %status.state, "Pipeline run finished"),
            Err(e) => match e.downcast_ref::<PipelineError>() {
                Some(PipelineError::AlreadyRunning) => {
                    warn!("Previous pipeline run still in flight; skipping this one")
                }
                _ => error!(error = ?e, "Pipeline run failed"),
            },
        }
    }

    /// Fires a run every day at the schedule's time. Never returns.
    pub async fn run_on_schedule(self: Arc<Self>, schedule: DailySchedule) {
        self.run_schedule_with(schedule, Utc::now).await
    }

    /// [`run_on_schedule`](Self::run_on_schedule) reading wall-clock time from `now`.
    ///
    /// Each run is spawned, so a run that outlives its day does not delay the
    /// next firing; that firing is skipped by the in-flight guard instead.
    pub async fn run_schedule_with<F>(self: Arc<Self>, schedule: DailySchedule, now: F)
    where
        F: Fn() -> DateTime<Utc> + Send + 'static,
    {
        loop {
            let now = now();
            let wait = schedule.until_next(now);
            info!(next_run = %schedule.next_after(now), "Pipeline run scheduled");
            tokio::time::sleep(wait).await;

            let poller = Arc::clone(&self);
            tokio::spawn(async move { poller.run_logged().await });
        }
    }
}
