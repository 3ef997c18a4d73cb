//! Statuses written by the reconciler outside of edge event processing.

use crate::types::{
    ConditionReason, ConditionStatus, DeploymentCondition, DeploymentConditionType,
};

/// Lifecycle phase of a deployment before its NFs report in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// A new generation of the resource is being rolled out.
    NewVersion,
    /// Generated packages wait for approval before they are deployed.
    AwaitingApproval { packages: Vec<String> },
    HydrationFailed { error: String },
}

impl Phase {
    /// The four conditions this phase stands for, in write order.
    pub fn conditions(&self) -> Vec<DeploymentCondition> {
        use DeploymentConditionType::*;

        let (reconciling, stalled) = match self {
            Phase::NewVersion => (
                DeploymentCondition::new(
                    Reconciling,
                    ConditionStatus::True,
                    ConditionReason::NewVersionAvailable,
                    "Reconciling NfDeploy",
                ),
                DeploymentCondition::bare(Stalled, ConditionStatus::False),
            ),
            Phase::AwaitingApproval { packages } => (
                DeploymentCondition::new(
                    Reconciling,
                    ConditionStatus::True,
                    ConditionReason::AwaitingApproval,
                    format!(
                        "These porch packages needs to be approved: [{}]",
                        packages.join(" ")
                    ),
                ),
                DeploymentCondition::bare(Stalled, ConditionStatus::False),
            ),
            Phase::HydrationFailed { error } => {
                let message = format!("Error Hydrating NfDeploy: {}", error);
                (
                    DeploymentCondition::new(
                        Reconciling,
                        ConditionStatus::False,
                        ConditionReason::Stalled,
                        message.clone(),
                    ),
                    DeploymentCondition::new(
                        Stalled,
                        ConditionStatus::True,
                        ConditionReason::HydrationFailure,
                        message,
                    ),
                )
            }
        };

        vec![
            stalled,
            DeploymentCondition::bare(Ready, ConditionStatus::Unknown),
            DeploymentCondition::bare(Peering, ConditionStatus::Unknown),
            reconciling,
        ]
    }
}
