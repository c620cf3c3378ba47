//! Lifecycle of meal-plan generation attempts, one state machine per list.
//!
//! `none -> running -> succeeded | failed`. Attempts run detached from the
//! request that triggered them; the only thing a caller ever waits for is the
//! bookkeeping below, never the remote workflow.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Instant,
};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::{
    error::GenerationError, normalizer::normalize, projector::project,
    types::GenerationRequest, webhook::MealPlanWebhook,
};
use crate::{
    catalog::CatalogRepo,
    lists::{GroceryList, GroceryListRepo},
};

/// First attempt plus two manual retries.
pub const MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationState {
    #[default]
    None,
    Running,
    Succeeded,
    Failed,
}

/// What API callers see about a list's generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationStatus {
    pub state: GenerationState,
    pub attempts: u32,
    pub max_attempts: u32,
    pub retry_available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerReceipt {
    pub attempt: u32,
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Creation,
    Manual,
}

#[derive(Debug, Default)]
struct GenerationRecord {
    state: GenerationState,
    /// Attempts in the current cycle. A success drops the record, so the next
    /// trigger starts a new cycle.
    attempts: u32,
    last_error: Option<&'static str>,
    /// The list was deleted while an attempt was running.
    forgotten: bool,
}

enum AttemptOutcome {
    Persisted(usize),
    /// The list vanished (or changed owner) before the result could be written.
    Discarded,
}

pub struct MealPlanOrchestrator {
    lists: Arc<dyn GroceryListRepo>,
    catalog: Arc<dyn CatalogRepo>,
    webhook: Arc<dyn MealPlanWebhook>,
    records: Mutex<HashMap<Uuid, GenerationRecord>>,
}

impl MealPlanOrchestrator {
    pub fn new(
        lists: Arc<dyn GroceryListRepo>,
        catalog: Arc<dyn CatalogRepo>,
        webhook: Arc<dyn MealPlanWebhook>,
    ) -> Arc<Self> {
        Arc::new(Self {
            lists,
            catalog,
            webhook,
            records: Mutex::new(HashMap::new()),
        })
    }

    fn records(&self) -> MutexGuard<'_, HashMap<Uuid, GenerationRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state_of(&self, list_id: Uuid) -> GenerationState {
        self.records()
            .get(&list_id)
            .map(|r| r.state)
            .unwrap_or_default()
    }

    pub fn status(&self, list: &GroceryList) -> GenerationStatus {
        let records = self.records();
        let (state, attempts, last_error) = match records.get(&list.id) {
            Some(r) => (r.state, r.attempts, r.last_error),
            None if !list.meal_plans.is_empty() => (GenerationState::Succeeded, 0, None),
            None => (GenerationState::None, 0, None),
        };
        GenerationStatus {
            state,
            attempts,
            max_attempts: MAX_ATTEMPTS,
            retry_available: state == GenerationState::Failed && attempts < MAX_ATTEMPTS,
            last_error: last_error.map(str::to_string),
        }
    }

    /// Fire-and-forget generation for a freshly stored list. Never fails the
    /// caller; problems are logged.
    pub fn schedule_after_create(self: &Arc<Self>, list: &GroceryList) {
        match self.start(list, Trigger::Creation) {
            Ok(receipt) => debug!(list_id = %list.id, attempt = receipt.attempt, "meal plan generation scheduled"),
            Err(GenerationError::Configuration(missing)) => {
                error!(list_id = %list.id, missing, "meal plan generation not configured")
            }
            Err(e) => debug!(list_id = %list.id, reason = e.kind(), "meal plan generation not scheduled"),
        }
    }

    /// Manual trigger on behalf of the list owner.
    pub async fn request(
        self: &Arc<Self>,
        user_id: Uuid,
        list_id: Uuid,
    ) -> Result<TriggerReceipt, GenerationError> {
        let list = self
            .lists
            .get(user_id, list_id)
            .await?
            .ok_or(GenerationError::ListNotFound)?;
        self.start(&list, Trigger::Manual)
    }

    /// Drops bookkeeping for a deleted list. A running attempt keeps its
    /// record until it finishes, whatever the outcome.
    pub fn forget(&self, list_id: Uuid) {
        let mut records = self.records();
        if let Some(rec) = records.get_mut(&list_id) {
            if rec.state == GenerationState::Running {
                rec.forgotten = true;
                return;
            }
        }
        records.remove(&list_id);
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.records().len()
    }

    fn start(
        self: &Arc<Self>,
        list: &GroceryList,
        trigger: Trigger,
    ) -> Result<TriggerReceipt, GenerationError> {
        if list.items.is_empty() {
            return Err(GenerationError::EmptyList);
        }
        self.webhook.ensure_configured()?;

        let attempt = {
            let mut records = self.records();
            let rec = records.entry(list.id).or_default();
            if rec.state == GenerationState::Running {
                return Err(GenerationError::AlreadyRunning);
            }
            if rec.attempts >= MAX_ATTEMPTS {
                return Err(GenerationError::CapExceeded {
                    attempts: rec.attempts,
                });
            }
            rec.state = GenerationState::Running;
            rec.attempts += 1;
            rec.last_error = None;
            rec.attempts
        };

        let span = info_span!(
            "meal_plan_attempt",
            list_id = %list.id,
            attempt,
            trigger = ?trigger
        );
        tokio::spawn(
            Arc::clone(self)
                .run_attempt(list.user_id, list.id, attempt)
                .instrument(span),
        );

        Ok(TriggerReceipt {
            attempt,
            max_attempts: MAX_ATTEMPTS,
        })
    }

    async fn run_attempt(self: Arc<Self>, user_id: Uuid, list_id: Uuid, attempt: u32) {
        let started = Instant::now();
        let result = self.attempt(user_id, list_id).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let mut records = self.records();
        match result {
            // Stored plans report `succeeded` on their own; nothing to keep.
            Ok(AttemptOutcome::Persisted(count)) => {
                info!(meal_plans = count, elapsed_ms, "meal plans generated");
                records.remove(&list_id);
            }
            Ok(AttemptOutcome::Discarded) => {
                info!(elapsed_ms, "list no longer exists; meal plan result discarded");
                records.remove(&list_id);
            }
            Err(e) => {
                warn!(
                    error = %e,
                    kind = e.kind(),
                    elapsed_ms,
                    retries_left = MAX_ATTEMPTS.saturating_sub(attempt),
                    "meal plan generation failed"
                );
                if records.get(&list_id).is_some_and(|r| r.forgotten) {
                    records.remove(&list_id);
                } else if let Some(rec) = records.get_mut(&list_id) {
                    rec.state = GenerationState::Failed;
                    rec.last_error = Some(e.kind());
                }
            }
        }
    }

    /// project -> call -> normalize -> persist. Nothing is written unless
    /// every step succeeds.
    async fn attempt(&self, user_id: Uuid, list_id: Uuid) -> Result<AttemptOutcome, GenerationError> {
        let Some(list) = self.lists.get(user_id, list_id).await? else {
            return Ok(AttemptOutcome::Discarded);
        };
        if list.items.is_empty() {
            return Err(GenerationError::EmptyList);
        }

        let ids: Vec<Uuid> = list.items.iter().map(|i| i.item).collect();
        let catalog: HashMap<_, _> = self
            .catalog
            .find_many(&ids)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();
        let ingredients = project(&list.items, &catalog)?;

        let request = GenerationRequest {
            grocery_list_id: list.id,
            ingredients,
            user_id,
            requested_at: OffsetDateTime::now_utc(),
        };
        let raw = self.webhook.call(&request).await?;
        let plans = normalize(&raw)?;

        if self.lists.set_meal_plans(user_id, list_id, &plans).await? {
            Ok(AttemptOutcome::Persisted(plans.len()))
        } else {
            Ok(AttemptOutcome::Discarded)
        }
    }
}
