//! Deployment-level status document written to the status store.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ConditionStatus;

/// The four aggregate conditions of a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DeploymentConditionType {
    Stalled,
    Ready,
    Peering,
    Reconciling,
}

impl DeploymentConditionType {
    /// Order in which conditions are written.
    pub const ALL: [DeploymentConditionType; 4] = [
        DeploymentConditionType::Stalled,
        DeploymentConditionType::Ready,
        DeploymentConditionType::Peering,
        DeploymentConditionType::Reconciling,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentConditionType::Stalled => "Stalled",
            DeploymentConditionType::Ready => "Ready",
            DeploymentConditionType::Peering => "Peering",
            DeploymentConditionType::Reconciling => "Reconciling",
        }
    }
}

impl fmt::Display for DeploymentConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Machine-readable reason attached to a deployment condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionReason {
    #[serde(rename = "AllNFsStalled")]
    AllNfsStalled,
    #[serde(rename = "SomeNFsStalled")]
    SomeNfsStalled,
    #[serde(rename = "NoNFsStalled")]
    NoNfsStalled,
    #[serde(rename = "AllNFsReady")]
    AllNfsReady,
    #[serde(rename = "SomeNFsReady")]
    SomeNfsReady,
    #[serde(rename = "NoNFsReady")]
    NoNfsReady,
    #[serde(rename = "AllNFsPeered")]
    AllNfsPeered,
    #[serde(rename = "AllUnPeeredNFsPeering")]
    AllUnpeeredNfsPeering,
    #[serde(rename = "SomeNFsPeering")]
    SomeNfsPeering,
    #[serde(rename = "NoNFsPeering")]
    NoNfsPeering,
    #[serde(rename = "AllNFsReconciled")]
    AllNfsReconciled,
    #[serde(rename = "AllUnReconciledNFsReconciling")]
    AllUnreconciledNfsReconciling,
    #[serde(rename = "SomeNFsReconciling")]
    SomeNfsReconciling,
    #[serde(rename = "NoNFsReconciling")]
    NoNfsReconciling,
    EdgeConnectionFailure,
    EdgeConnectionBroken,
    NewVersionAvailable,
    AwaitingApproval,
    HydrationFailure,
    Stalled,
}

impl ConditionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionReason::AllNfsStalled => "AllNFsStalled",
            ConditionReason::SomeNfsStalled => "SomeNFsStalled",
            ConditionReason::NoNfsStalled => "NoNFsStalled",
            ConditionReason::AllNfsReady => "AllNFsReady",
            ConditionReason::SomeNfsReady => "SomeNFsReady",
            ConditionReason::NoNfsReady => "NoNFsReady",
            ConditionReason::AllNfsPeered => "AllNFsPeered",
            ConditionReason::AllUnpeeredNfsPeering => "AllUnPeeredNFsPeering",
            ConditionReason::SomeNfsPeering => "SomeNFsPeering",
            ConditionReason::NoNfsPeering => "NoNFsPeering",
            ConditionReason::AllNfsReconciled => "AllNFsReconciled",
            ConditionReason::AllUnreconciledNfsReconciling => "AllUnReconciledNFsReconciling",
            ConditionReason::SomeNfsReconciling => "SomeNFsReconciling",
            ConditionReason::NoNfsReconciling => "NoNFsReconciling",
            ConditionReason::EdgeConnectionFailure => "EdgeConnectionFailure",
            ConditionReason::EdgeConnectionBroken => "EdgeConnectionBroken",
            ConditionReason::NewVersionAvailable => "NewVersionAvailable",
            ConditionReason::AwaitingApproval => "AwaitingApproval",
            ConditionReason::HydrationFailure => "HydrationFailure",
            ConditionReason::Stalled => "Stalled",
        }
    }
}

impl fmt::Display for ConditionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One aggregate condition with its transition bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentCondition {
    #[serde(rename = "type")]
    pub condition_type: DeploymentConditionType,
    pub status: ConditionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<ConditionReason>,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<DateTime<Utc>>,
}

impl DeploymentCondition {
    pub fn new(
        condition_type: DeploymentConditionType,
        status: ConditionStatus,
        reason: ConditionReason,
        message: impl Into<String>,
    ) -> Self {
        Self {
            condition_type,
            status,
            reason: Some(reason),
            message: message.into(),
            last_update_time: None,
            last_transition_time: None,
        }
    }

    /// A condition carrying only a status, as written by lifecycle phases.
    pub fn bare(condition_type: DeploymentConditionType, status: ConditionStatus) -> Self {
        Self {
            condition_type,
            status,
            reason: None,
            message: String::new(),
            last_update_time: None,
            last_transition_time: None,
        }
    }

    /// Status, reason and message all match; timestamps are ignored.
    pub fn same_state(&self, other: &DeploymentCondition) -> bool {
        self.status == other.status && self.reason == other.reason && self.message == other.message
    }
}

/// Status document of one NF deployment resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentStatus {
    #[serde(default)]
    pub observed_generation: i64,
    #[serde(default, rename = "targetedNFs")]
    pub targeted_nfs: u32,
    #[serde(default, rename = "readyNFs")]
    pub ready_nfs: u32,
    #[serde(default, rename = "availableNFs")]
    pub available_nfs: u32,
    #[serde(default, rename = "stalledNFs")]
    pub stalled_nfs: u32,
    #[serde(default)]
    pub conditions: Vec<DeploymentCondition>,
}

impl DeploymentStatus {
    pub fn condition(&self, condition_type: DeploymentConditionType) -> Option<&DeploymentCondition> {
        self.conditions
            .iter()
            .find(|c| c.condition_type == condition_type)
    }
}
