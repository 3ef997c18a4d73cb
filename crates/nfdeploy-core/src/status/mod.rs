//! Status aggregation: folding one NF's report into the graph and
//! recomputing the deployment-wide conditions.

pub mod aggregate;
pub mod nf;
pub mod phase;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::graph::DeploymentGraph;
use crate::types::{NfCondition, NfType};

pub use aggregate::{AggregateStatus, NfCounts};
pub use nf::{ConditionSet, NfState, NfStatus};
pub use phase::Phase;

/// One NF's condition report, decoded from an edge event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NfReport {
    pub nf_id: String,
    /// Type implied by the event kind; `None` skips the type check.
    pub nf_type: Option<NfType>,
    pub conditions: Vec<NfCondition>,
    pub timestamp: DateTime<Utc>,
}

/// Why a report left the graph untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    Untracked,
    KindMismatch,
    Stale,
    Ambiguous,
    /// The event object could not be decoded into a report.
    Undecodable,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropReason::Untracked => "untracked",
            DropReason::KindMismatch => "kind-mismatch",
            DropReason::Stale => "stale",
            DropReason::Ambiguous => "ambiguous",
            DropReason::Undecodable => "undecodable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportOutcome {
    Applied(AggregateStatus),
    Dropped(DropReason),
}

/// Apply `report` to its node and recompute the aggregate.
///
/// The caller holds the deployment's lock for the duration.
pub fn apply_report(graph: &mut DeploymentGraph, report: &NfReport) -> ReportOutcome {
    let tracked_type = graph.nf_type_of(&report.nf_id);
    if tracked_type == NfType::Unspecified {
        info!(nf = %report.nf_id, "NF not present in current deployment, dropping event");
        return ReportOutcome::Dropped(DropReason::Untracked);
    }
    if report.nf_type.is_some_and(|nf_type| nf_type != tracked_type) {
        info!(
            nf = %report.nf_id,
            nf_type = %tracked_type,
            "NF of this kind not present in current deployment, dropping event"
        );
        return ReportOutcome::Dropped(DropReason::KindMismatch);
    }

    let Some(node) = graph.node_mut(&report.nf_id) else {
        return ReportOutcome::Dropped(DropReason::Untracked);
    };
    if !node.status.accepts(report.timestamp) {
        debug!(nf = %report.nf_id, timestamp = %report.timestamp, "Dropping stale event");
        return ReportOutcome::Dropped(DropReason::Stale);
    }

    let conditions = ConditionSet::from_reports(&report.conditions);
    if conditions.is_ambiguous() {
        info!(nf = %report.nf_id, "Ambiguous NF conditions received, keeping last status");
        return ReportOutcome::Dropped(DropReason::Ambiguous);
    }

    let mut status = conditions.derive();
    status.last_event_timestamp = Some(report.timestamp);
    debug!(nf = %report.nf_id, state = ?status.state, "Updated NF status");
    node.status = status;

    ReportOutcome::Applied(AggregateStatus::compute(graph))
}
