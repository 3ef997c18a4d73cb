//! One tracked NF deployment: its graph, its lifetime and its status writes.
//!
//! Topology updates and edge events both mutate the graph under a single
//! lock, so they never interleave. Store writes happen after the graph lock
//! is released; a second lock, taken before the graph lock is dropped,
//! keeps writes in the order their statuses were computed.

pub mod manager;

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::edge::EdgeEvent;
use crate::error::WriteError;
use crate::graph::{DeploymentGraph, Node, TopologyChange};
use crate::profile::ProfileRepository;
use crate::status::{
    AggregateStatus, DropReason, NfCounts, NfReport, Phase, ReportOutcome, apply_report,
};
use crate::topology::Topology;
use crate::types::{ConditionReason, DeploymentCondition, NamespacedName};
use crate::writer::StatusWriter;

pub use manager::DeploymentManager;

#[derive(Debug, Default)]
struct GraphState {
    graph: DeploymentGraph,
    /// Set once any NF status event has been applied.
    observed: bool,
}

/// Point-in-time view of a deployment for reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentSummary {
    pub key: NamespacedName,
    pub counts: NfCounts,
    pub conditions: Vec<DeploymentCondition>,
    pub nodes: Vec<Node>,
    pub events_processed: u64,
}

pub struct Deployment {
    key: NamespacedName,
    state: Mutex<GraphState>,
    publish: Mutex<()>,
    writer: StatusWriter,
    profiles: Arc<dyn ProfileRepository>,
    cancel: CancellationToken,
    generation: AtomicI64,
    progress: watch::Sender<u64>,
}

impl Deployment {
    pub fn new(writer: StatusWriter, profiles: Arc<dyn ProfileRepository>) -> Self {
        Self {
            key: writer.key().clone(),
            state: Mutex::new(GraphState::default()),
            publish: Mutex::new(()),
            writer,
            profiles,
            cancel: CancellationToken::new(),
            generation: AtomicI64::new(0),
            progress: watch::Sender::new(0),
        }
    }

    pub fn key(&self) -> &NamespacedName {
        &self.key
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// End the processing lifetime; the listener exits at its next wait.
    pub fn shutdown(&self) {
        debug!(deployment = %self.key, "Shutting down deployment");
        self.cancel.cancel();
    }

    /// Record `generation`, returning whether it is newer than any seen.
    pub fn observe_generation(&self, generation: i64) -> bool {
        self.generation.fetch_max(generation, Ordering::SeqCst) < generation
    }

    /// Number of edge events handled so far, including dropped ones.
    pub fn progress(&self) -> watch::Receiver<u64> {
        self.progress.subscribe()
    }

    /// Rebuild the graph from `topology`.
    ///
    /// The aggregate is persisted only once NF statuses have been observed,
    /// so lifecycle phase statuses are not overwritten by an all-unknown
    /// aggregate.
    pub async fn report_topology(&self, topology: &Topology) -> Result<TopologyChange, WriteError> {
        let (change, pending) = {
            let mut state = self.state.lock().await;
            let change = state.graph.apply_topology(topology, self.profiles.as_ref());
            info!(
                deployment = %self.key,
                added = change.added.len(),
                removed = change.removed.len(),
                nfs = state.graph.len(),
                "Applied topology update"
            );
            let pending = if state.observed {
                let aggregate = AggregateStatus::compute(&state.graph);
                Some((aggregate, self.publish.lock().await))
            } else {
                None
            };
            (change, pending)
        };

        if let Some((aggregate, _publish)) = pending {
            self.writer.write_aggregate(&aggregate).await?;
        }
        Ok(change)
    }

    /// Decode and apply one edge event, then persist the new aggregate.
    pub async fn process_event(&self, event: &EdgeEvent) -> Result<ReportOutcome, WriteError> {
        let result = match event.to_report() {
            Ok(report) => self.process_report(&report).await,
            Err(err) => {
                info!(
                    deployment = %self.key,
                    kind = %event.key.kind,
                    "Dropping edge event: {}",
                    err
                );
                Ok(ReportOutcome::Dropped(DropReason::Undecodable))
            }
        };
        self.progress.send_modify(|processed| *processed += 1);
        result
    }

    pub async fn process_report(&self, report: &NfReport) -> Result<ReportOutcome, WriteError> {
        let (outcome, publish) = {
            let mut state = self.state.lock().await;
            let outcome = apply_report(&mut state.graph, report);
            if matches!(outcome, ReportOutcome::Dropped(_)) {
                return Ok(outcome);
            }
            state.observed = true;
            (outcome, self.publish.lock().await)
        };

        if let ReportOutcome::Applied(aggregate) = &outcome {
            self.writer.write_aggregate(aggregate).await?;
        }
        drop(publish);
        Ok(outcome)
    }

    pub async fn report_connection_failure(
        &self,
        reason: ConditionReason,
        message: &str,
    ) -> Result<(), WriteError> {
        let _publish = self.publish.lock().await;
        self.writer.write_connection_failure(reason, message).await
    }

    pub async fn report_phase(&self, generation: i64, phase: &Phase) -> Result<(), WriteError> {
        let _publish = self.publish.lock().await;
        debug!(deployment = %self.key, generation, phase = ?phase, "Writing lifecycle status");
        self.writer.write_phase(generation, phase).await
    }

    pub async fn summary(&self) -> DeploymentSummary {
        let state = self.state.lock().await;
        let aggregate = AggregateStatus::compute(&state.graph);
        DeploymentSummary {
            key: self.key.clone(),
            counts: aggregate.counts,
            conditions: aggregate.conditions,
            nodes: state.graph.nodes().cloned().collect(),
            events_processed: *self.progress.borrow(),
        }
    }
}

impl std::fmt::Debug for Deployment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deployment")
            .field("key", &self.key)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}
