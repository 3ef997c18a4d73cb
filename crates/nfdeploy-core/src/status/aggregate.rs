//! Deployment-wide counts and the four aggregate conditions.

use serde::Serialize;

use crate::graph::{DeploymentGraph, Node};
use crate::types::{
    ConditionReason, ConditionStatus, DeploymentCondition, DeploymentConditionType,
    NfConditionType,
};

/// Node counts over every type partition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NfCounts {
    pub targeted: u32,
    pub ready: u32,
    pub available: u32,
    pub stalled: u32,
}

impl NfCounts {
    pub fn scan(graph: &DeploymentGraph) -> Self {
        let mut counts = Self::default();
        for node in graph.nodes() {
            counts.targeted += 1;
            if node.status.is_active(NfConditionType::Ready) {
                counts.ready += 1;
            }
            if node.status.is_active(NfConditionType::Available) {
                counts.available += 1;
            }
            if node.status.is_active(NfConditionType::Stalled) {
                counts.stalled += 1;
            }
        }
        counts
    }

    pub fn all_ready(&self) -> bool {
        self.ready == self.targeted
    }
}

/// Counts plus the four aggregate conditions, in write order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateStatus {
    pub counts: NfCounts,
    pub conditions: Vec<DeploymentCondition>,
}

impl AggregateStatus {
    pub fn compute(graph: &DeploymentGraph) -> Self {
        let counts = NfCounts::scan(graph);
        Self {
            counts,
            conditions: vec![
                stalled_condition(graph, &counts),
                ready_condition(graph, &counts),
                peering_condition(graph, &counts),
                reconciling_condition(graph, &counts),
            ],
        }
    }

    pub fn condition(&self, condition_type: DeploymentConditionType) -> Option<&DeploymentCondition> {
        self.conditions
            .iter()
            .find(|c| c.condition_type == condition_type)
    }
}

fn id_list<'a>(prefix: &str, ids: impl Iterator<Item = &'a str>) -> String {
    let ids: Vec<&str> = ids.collect();
    format!("{}{}.", prefix, ids.join(", "))
}

fn status_of(flag: bool) -> ConditionStatus {
    if flag {
        ConditionStatus::True
    } else {
        ConditionStatus::False
    }
}

pub fn stalled_condition(graph: &DeploymentGraph, counts: &NfCounts) -> DeploymentCondition {
    let reason = if counts.stalled == counts.targeted {
        ConditionReason::AllNfsStalled
    } else if counts.stalled == 0 {
        ConditionReason::NoNfsStalled
    } else {
        ConditionReason::SomeNfsStalled
    };
    let message = if counts.stalled == 0 {
        "No NFs are in stalled state.".to_string()
    } else {
        let entries: Vec<String> = graph
            .nodes()
            .filter_map(|node| {
                node.status
                    .active_conditions
                    .get(&NfConditionType::Stalled)
                    .map(|message| format!("{}: {}", node.id, message))
            })
            .collect();
        format!("{}.", entries.join(", "))
    };
    DeploymentCondition::new(
        DeploymentConditionType::Stalled,
        status_of(counts.stalled > 0),
        reason,
        message,
    )
}

pub fn ready_condition(graph: &DeploymentGraph, counts: &NfCounts) -> DeploymentCondition {
    let reason = if counts.ready == 0 {
        ConditionReason::NoNfsReady
    } else if counts.all_ready() {
        ConditionReason::AllNfsReady
    } else {
        ConditionReason::SomeNfsReady
    };
    let message = if counts.all_ready() {
        "All NFs are in Ready state.".to_string()
    } else {
        id_list(
            "The NFs which are not in Ready state are: ",
            graph
                .nodes()
                .filter(|node| !node.status.is_active(NfConditionType::Ready))
                .map(|node| node.id.as_str()),
        )
    };
    DeploymentCondition::new(
        DeploymentConditionType::Ready,
        status_of(counts.all_ready()),
        reason,
        message,
    )
}

/// Vocabulary of one "work in progress" condition.
struct ProgressWording {
    condition_type: DeploymentConditionType,
    active: NfConditionType,
    done: (ConditionReason, &'static str),
    all_remaining: ConditionReason,
    some: ConditionReason,
    none: (ConditionReason, &'static str),
    listing: &'static str,
}

const PEERING: ProgressWording = ProgressWording {
    condition_type: DeploymentConditionType::Peering,
    active: NfConditionType::Peering,
    done: (ConditionReason::AllNfsPeered, "All NFs are in Peered state."),
    all_remaining: ConditionReason::AllUnpeeredNfsPeering,
    some: ConditionReason::SomeNfsPeering,
    none: (ConditionReason::NoNfsPeering, "No NFs are in peering state."),
    listing: "The NFs which are in Peering state are: ",
};

const RECONCILING: ProgressWording = ProgressWording {
    condition_type: DeploymentConditionType::Reconciling,
    active: NfConditionType::Reconciling,
    done: (ConditionReason::AllNfsReconciled, "All NFs are in reconciled state."),
    all_remaining: ConditionReason::AllUnreconciledNfsReconciling,
    some: ConditionReason::SomeNfsReconciling,
    none: (ConditionReason::NoNfsReconciling, "No NFs are in reconciling state."),
    listing: "The NFs which are in Reconciling state are: ",
};

/// Peering and Reconciling report `False` once every NF is ready.
fn progress_condition(
    graph: &DeploymentGraph,
    counts: &NfCounts,
    wording: &ProgressWording,
) -> DeploymentCondition {
    if counts.all_ready() {
        let (reason, message) = wording.done;
        return DeploymentCondition::new(
            wording.condition_type,
            ConditionStatus::False,
            reason,
            message,
        );
    }

    let active: Vec<&Node> = graph
        .nodes()
        .filter(|node| node.status.is_active(wording.active))
        .collect();
    let active_count = active.len() as u32;
    if active_count == 0 {
        let (reason, message) = wording.none;
        return DeploymentCondition::new(
            wording.condition_type,
            ConditionStatus::False,
            reason,
            message,
        );
    }

    let reason = if counts.ready + active_count == counts.targeted {
        wording.all_remaining
    } else {
        wording.some
    };
    DeploymentCondition::new(
        wording.condition_type,
        ConditionStatus::True,
        reason,
        id_list(wording.listing, active.iter().map(|node| node.id.as_str())),
    )
}

pub fn peering_condition(graph: &DeploymentGraph, counts: &NfCounts) -> DeploymentCondition {
    progress_condition(graph, counts, &PEERING)
}

pub fn reconciling_condition(graph: &DeploymentGraph, counts: &NfCounts) -> DeploymentCondition {
    progress_condition(graph, counts, &RECONCILING)
}
