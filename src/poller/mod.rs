//! Consumer-side watcher for meal-plan generation.
//!
//! The server exposes no real progress, so the progress figure here is a
//! cosmetic estimate driven by a local clock. A watch ends successfully only
//! when the list holds plans and the server no longer reports an attempt in
//! flight or failed.

mod http;

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use time::OffsetDateTime;
use tokio::{
    sync::watch,
    time::{interval, interval_at, sleep, Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::meal_plans::{GenerationState, GenerationStatus, MealPlan};

pub use http::HttpListSource;

#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub poll_interval: Duration,
    pub progress_tick: Duration,
    /// Percentage points added per tick.
    pub progress_step: u8,
    pub timeout: Duration,
    /// Only lists created this recently are assumed to have generation running.
    pub freshness_window: Duration,
    pub max_retries: u32,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            progress_tick: Duration::from_secs(1),
            progress_step: 2,
            timeout: Duration::from_secs(60),
            freshness_window: Duration::from_secs(120),
            max_retries: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptStatus {
    Pending,
    Succeeded,
    Failed,
}

/// Client-side view of the current generation, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationAttempt {
    pub progress: u8,
    pub status: AttemptStatus,
    pub retry_count: u32,
    /// Set once the server refuses further retries.
    pub retries_exhausted: bool,
}

impl Default for GenerationAttempt {
    fn default() -> Self {
        Self {
            progress: 0,
            status: AttemptStatus::Pending,
            retry_count: 0,
            retries_exhausted: false,
        }
    }
}

/// What a UI should show for the attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Generating,
    Ready,
    FailedRetryAvailable,
    FailedRetriesExhausted,
}

/// The subset of a list the poller cares about.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSnapshot {
    pub id: Uuid,
    #[serde(default)]
    pub meal_plans: Vec<MealPlan>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default)]
    pub generation: Option<GenerationStatus>,
}

impl ListSnapshot {
    /// Plans left over from an earlier generation do not count while a newer
    /// attempt is running or has failed.
    pub fn plans_ready(&self) -> bool {
        !self.meal_plans.is_empty()
            && self
                .generation
                .as_ref()
                .map_or(true, |g| g.state == GenerationState::Succeeded)
    }
}

#[derive(Debug, Error)]
pub enum PollError {
    #[error("grocery list not found")]
    NotFound,
    #[error("grocery list has no items")]
    EmptyList,
    #[error("generation already in progress")]
    AlreadyRunning,
    #[error("no retries left")]
    RetriesExhausted,
    #[error("request failed: {0}")]
    Http(String),
}

#[async_trait]
pub trait ListSource: Send + Sync {
    async fn fetch(&self, list_id: Uuid) -> Result<ListSnapshot, PollError>;
    async fn request_generation(&self, list_id: Uuid) -> Result<(), PollError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Ready(Vec<MealPlan>),
    TimedOut,
}

pub struct MealPlanPoller<S> {
    source: S,
    list_id: Uuid,
    config: PollerConfig,
    state: watch::Sender<GenerationAttempt>,
}

impl<S: ListSource> MealPlanPoller<S> {
    pub fn new(source: S, list_id: Uuid, config: PollerConfig) -> Self {
        let (state, _) = watch::channel(GenerationAttempt::default());
        Self {
            source,
            list_id,
            config,
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<GenerationAttempt> {
        self.state.subscribe()
    }

    pub fn attempt(&self) -> GenerationAttempt {
        self.state.borrow().clone()
    }

    pub fn phase(&self) -> Phase {
        let a = self.attempt();
        match a.status {
            AttemptStatus::Pending => Phase::Generating,
            AttemptStatus::Succeeded => Phase::Ready,
            AttemptStatus::Failed
                if a.retries_exhausted || a.retry_count >= self.config.max_retries =>
            {
                Phase::FailedRetriesExhausted
            }
            AttemptStatus::Failed => Phase::FailedRetryAvailable,
        }
    }

    /// A list is worth watching when it has no meal plans yet and was created
    /// recently enough that its first attempt may still be running.
    pub fn should_watch(&self, list: &ListSnapshot, now: OffsetDateTime) -> bool {
        list.meal_plans.is_empty() && now - list.created_at <= self.config.freshness_window
    }

    /// Polls until meal plans appear or the timeout passes.
    pub async fn watch(&self) -> Result<PollOutcome, PollError> {
        self.state.send_modify(|a| {
            a.progress = 0;
            a.status = AttemptStatus::Pending;
        });

        let deadline = sleep(self.config.timeout);
        tokio::pin!(deadline);
        let mut polls = interval(self.config.poll_interval);
        polls.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let tick = self.config.progress_tick;
        let mut ticks = interval_at(Instant::now() + tick, tick);

        loop {
            tokio::select! {
                biased;
                _ = &mut deadline => {
                    self.state.send_modify(|a| a.status = AttemptStatus::Failed);
                    info!(list_id = %self.list_id, "meal plan watch timed out");
                    return Ok(PollOutcome::TimedOut);
                }
                _ = polls.tick() => match self.source.fetch(self.list_id).await {
                    Ok(list) if list.plans_ready() => {
                        self.state.send_modify(|a| {
                            a.progress = 100;
                            a.status = AttemptStatus::Succeeded;
                        });
                        info!(list_id = %self.list_id, meal_plans = list.meal_plans.len(), "meal plans ready");
                        return Ok(PollOutcome::Ready(list.meal_plans));
                    }
                    Ok(_) => debug!(list_id = %self.list_id, "meal plans not ready yet"),
                    Err(PollError::NotFound) => {
                        self.state.send_modify(|a| a.status = AttemptStatus::Failed);
                        return Err(PollError::NotFound);
                    }
                    Err(e) => warn!(list_id = %self.list_id, error = %e, "poll failed; will try again"),
                },
                _ = ticks.tick() => {
                    let step = self.config.progress_step;
                    self.state.send_modify(|a| a.progress = a.progress.saturating_add(step).min(100));
                }
            }
        }
    }

    /// Asks the server for another attempt and watches it.
    pub async fn retry(&self) -> Result<PollOutcome, PollError> {
        let current = self.attempt();
        if current.retries_exhausted || current.retry_count >= self.config.max_retries {
            return Err(PollError::RetriesExhausted);
        }

        match self.source.request_generation(self.list_id).await {
            Ok(()) => {}
            Err(PollError::AlreadyRunning) => {
                debug!(list_id = %self.list_id, "generation already running; watching it")
            }
            Err(PollError::RetriesExhausted) => {
                self.state.send_modify(|a| {
                    a.retries_exhausted = true;
                    a.status = AttemptStatus::Failed;
                });
                return Err(PollError::RetriesExhausted);
            }
            Err(e) => return Err(e),
        }

        self.state.send_modify(|a| a.retry_count += 1);
        self.watch().await
    }
}
