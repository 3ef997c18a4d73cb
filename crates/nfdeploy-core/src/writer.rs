//! Persisting deployment statuses under optimistic concurrency.
//!
//! Every write is a fetch-modify-update cycle against the store. Condition
//! timestamps are reconciled against what the store currently holds, so an
//! unchanged condition keeps its original timestamps across rewrites. A
//! version conflict restarts the cycle from a fresh read.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use chrono::{DateTime, Utc};
use tracing::{debug, error};

use crate::config::RetryConfig;
use crate::error::WriteError;
use crate::status::{AggregateStatus, NfCounts, Phase};
use crate::store::StatusStore;
use crate::types::{
    ConditionReason, ConditionStatus, DeploymentCondition, DeploymentConditionType,
    DeploymentStatus, NamespacedName,
};

/// Cap applied when no `max_backoff` is configured.
pub const DEFAULT_MAX_BACKOFF: Duration =
    Duration::from_millis(backoff::default::MAX_INTERVAL_MILLIS);

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of write attempts, the first included.
    pub steps: u32,
    pub initial_backoff: Duration,
    pub factor: f64,
    pub max_backoff: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            steps: config.steps.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            factor: config.factor,
            max_backoff: config.max_backoff_ms.map(Duration::from_millis),
        }
    }

    /// Delays between conflicting attempts. Elapsed time is not bounded;
    /// `steps` is.
    pub fn exponential(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_backoff)
            .with_multiplier(self.factor)
            .with_max_interval(self.max_backoff.unwrap_or(DEFAULT_MAX_BACKOFF))
            .with_randomization_factor(0.0)
            .with_max_elapsed_time(None)
            .build()
    }
}

/// Stamp `fresh` with timestamps reconciled against `previous`.
pub fn reconcile_condition(
    previous: Option<&DeploymentCondition>,
    mut fresh: DeploymentCondition,
    now: DateTime<Utc>,
) -> DeploymentCondition {
    match previous {
        None => {
            fresh.last_transition_time = Some(now);
            fresh.last_update_time = Some(now);
        }
        Some(previous) if previous.same_state(&fresh) => {
            fresh.last_transition_time = previous.last_transition_time;
            fresh.last_update_time = previous.last_update_time;
        }
        Some(previous) => {
            fresh.last_transition_time = if previous.status == fresh.status {
                previous.last_transition_time
            } else {
                Some(now)
            };
            fresh.last_update_time = Some(now);
        }
    }
    fresh
}

/// What a single write replaces in the stored status. `None` fields keep
/// their stored value.
struct StatusUpdate {
    observed_generation: Option<i64>,
    counts: Option<NfCounts>,
    conditions: Vec<DeploymentCondition>,
}

impl StatusUpdate {
    fn apply(&self, current: &DeploymentStatus, now: DateTime<Utc>) -> DeploymentStatus {
        let conditions = self
            .conditions
            .iter()
            .map(|fresh| {
                reconcile_condition(current.condition(fresh.condition_type), fresh.clone(), now)
            })
            .collect();
        let counts = self.counts.unwrap_or(NfCounts {
            targeted: current.targeted_nfs,
            ready: current.ready_nfs,
            available: current.available_nfs,
            stalled: current.stalled_nfs,
        });
        DeploymentStatus {
            observed_generation: self
                .observed_generation
                .unwrap_or(current.observed_generation),
            targeted_nfs: counts.targeted,
            ready_nfs: counts.ready,
            available_nfs: counts.available,
            stalled_nfs: counts.stalled,
            conditions,
        }
    }
}

/// Writes the status of one deployment.
#[derive(Clone)]
pub struct StatusWriter {
    store: Arc<dyn StatusStore>,
    key: NamespacedName,
    policy: RetryPolicy,
}

impl StatusWriter {
    pub fn new(store: Arc<dyn StatusStore>, key: NamespacedName, policy: RetryPolicy) -> Self {
        Self { store, key, policy }
    }

    pub fn key(&self) -> &NamespacedName {
        &self.key
    }

    /// Persist freshly aggregated counts and conditions.
    pub async fn write_aggregate(&self, aggregate: &AggregateStatus) -> Result<(), WriteError> {
        self.write(StatusUpdate {
            observed_generation: None,
            counts: Some(aggregate.counts),
            conditions: aggregate.conditions.clone(),
        })
        .await
    }

    /// Mark every condition `Unknown` after the edge connection was lost.
    pub async fn write_connection_failure(
        &self,
        reason: ConditionReason,
        message: &str,
    ) -> Result<(), WriteError> {
        let conditions = DeploymentConditionType::ALL
            .into_iter()
            .map(|condition_type| {
                DeploymentCondition::new(condition_type, ConditionStatus::Unknown, reason, message)
            })
            .collect();
        self.write(StatusUpdate {
            observed_generation: None,
            counts: Some(NfCounts::default()),
            conditions,
        })
        .await
    }

    /// Record a lifecycle phase for `generation`. NF counts are left as
    /// stored.
    pub async fn write_phase(&self, generation: i64, phase: &Phase) -> Result<(), WriteError> {
        self.write(StatusUpdate {
            observed_generation: Some(generation),
            counts: None,
            conditions: phase.conditions(),
        })
        .await
    }

    async fn write(&self, update: StatusUpdate) -> Result<(), WriteError> {
        let attempts = AtomicU32::new(0);
        let (update, attempts) = (&update, &attempts);
        backoff::future::retry_notify(
            self.policy.exponential(),
            move || self.attempt(update, attempts.fetch_add(1, Ordering::SeqCst) + 1),
            |err: WriteError, wait: Duration| {
                debug!(
                    deployment = %self.key,
                    wait_ms = wait.as_millis() as u64,
                    "Status update conflicted, retrying: {}",
                    err
                );
            },
        )
        .await
    }

    /// One fetch-modify-update cycle. Only a conflict with attempts left is
    /// transient.
    async fn attempt(
        &self,
        update: &StatusUpdate,
        attempt: u32,
    ) -> Result<(), backoff::Error<WriteError>> {
        let mut current = self
            .store
            .get(&self.key)
            .await
            .map_err(|err| backoff::Error::permanent(err.into()))?;
        current.status = update.apply(&current.status, Utc::now());
        match self.store.update(&self.key, current).await {
            Ok(()) => Ok(()),
            Err(err) if err.is_conflict() && attempt < self.policy.steps => {
                Err(backoff::Error::transient(err.into()))
            }
            Err(err) if err.is_conflict() => {
                error!(
                    deployment = %self.key,
                    attempts = attempt,
                    "Giving up on status update after repeated conflicts"
                );
                Err(backoff::Error::permanent(WriteError::RetriesExhausted {
                    key: self.key.clone(),
                    attempts: attempt,
                }))
            }
            Err(err) => Err(backoff::Error::permanent(err.into())),
        }
    }
}
