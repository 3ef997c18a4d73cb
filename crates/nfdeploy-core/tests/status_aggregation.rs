//! Aggregation scenarios driven through a deployment and the status store.

mod support;

use std::sync::Arc;

use nfdeploy_core::deployment::Deployment;
use nfdeploy_core::profile::ProfileSet;
use nfdeploy_core::status::{DropReason, NfState, ReportOutcome};
use nfdeploy_core::store::{InMemoryStatusStore, StatusStore};
use nfdeploy_core::topology::Site;
use nfdeploy_core::types::{
    ConditionReason, ConditionStatus, DeploymentConditionType, DeploymentStatus, NfType,
};
use nfdeploy_core::writer::{RetryPolicy, StatusWriter};

use support::{UPF_SMF, at, event, key, only_true, resource, seeded_store};

async fn deployment() -> (Arc<InMemoryStatusStore>, Deployment) {
    let store = seeded_store().await;
    let writer = StatusWriter::new(store.clone(), key(), RetryPolicy::default());
    let deployment = Deployment::new(writer, Arc::new(ProfileSet::new()));
    deployment
        .report_topology(&resource(UPF_SMF).spec)
        .await
        .unwrap();
    (store, deployment)
}

async fn status(store: &InMemoryStatusStore) -> DeploymentStatus {
    store.snapshot(&key()).await.unwrap()
}

fn reason(status: &DeploymentStatus, condition_type: DeploymentConditionType) -> Option<ConditionReason> {
    status.condition(condition_type).and_then(|c| c.reason)
}

fn condition_status(status: &DeploymentStatus, condition_type: DeploymentConditionType) -> ConditionStatus {
    status.condition(condition_type).unwrap().status
}

#[tokio::test]
async fn reconciling_progresses_to_reconciled() {
    let (store, deployment) = deployment().await;

    deployment
        .process_event(&only_true("UPFDeploy", "upf", &["Reconciling"], at(1)))
        .await
        .unwrap();
    let current = status(&store).await;
    assert_eq!(condition_status(&current, DeploymentConditionType::Reconciling), ConditionStatus::True);
    assert_eq!(
        reason(&current, DeploymentConditionType::Reconciling),
        Some(ConditionReason::SomeNfsReconciling)
    );

    deployment
        .process_event(&only_true("SMFDeploy", "smf", &["Reconciling"], at(2)))
        .await
        .unwrap();
    let current = status(&store).await;
    assert_eq!(condition_status(&current, DeploymentConditionType::Reconciling), ConditionStatus::True);
    assert_eq!(
        reason(&current, DeploymentConditionType::Reconciling),
        Some(ConditionReason::AllUnreconciledNfsReconciling)
    );
    assert_eq!(
        current.condition(DeploymentConditionType::Reconciling).unwrap().message,
        "The NFs which are in Reconciling state are: upf, smf."
    );

    deployment
        .process_event(&only_true("UPFDeploy", "upf", &[], at(3)))
        .await
        .unwrap();
    deployment
        .process_event(&only_true("SMFDeploy", "smf", &[], at(4)))
        .await
        .unwrap();
    let current = status(&store).await;
    assert_eq!(condition_status(&current, DeploymentConditionType::Reconciling), ConditionStatus::False);
    assert_eq!(
        reason(&current, DeploymentConditionType::Reconciling),
        Some(ConditionReason::NoNfsReconciling)
    );
    assert_eq!(current.stalled_nfs, 2);
    assert_eq!(
        reason(&current, DeploymentConditionType::Stalled),
        Some(ConditionReason::AllNfsStalled)
    );

    deployment
        .process_event(&only_true("UPFDeploy", "upf", &["Ready", "Available"], at(5)))
        .await
        .unwrap();
    deployment
        .process_event(&only_true("SMFDeploy", "smf", &["Ready", "Available"], at(6)))
        .await
        .unwrap();
    let current = status(&store).await;
    assert_eq!(condition_status(&current, DeploymentConditionType::Reconciling), ConditionStatus::False);
    assert_eq!(
        reason(&current, DeploymentConditionType::Reconciling),
        Some(ConditionReason::AllNfsReconciled)
    );
    assert_eq!(condition_status(&current, DeploymentConditionType::Ready), ConditionStatus::True);
    assert_eq!(
        reason(&current, DeploymentConditionType::Ready),
        Some(ConditionReason::AllNfsReady)
    );
    assert_eq!(current.targeted_nfs, 2);
    assert_eq!(current.ready_nfs, 2);
    assert_eq!(current.available_nfs, 2);
    assert_eq!(current.stalled_nfs, 0);
}

#[tokio::test]
async fn every_write_carries_all_four_conditions() {
    let (store, deployment) = deployment().await;
    deployment
        .process_event(&only_true("UPFDeploy", "upf", &["Peering"], at(1)))
        .await
        .unwrap();

    let current = status(&store).await;
    assert_eq!(current.conditions.len(), 4);
    for condition_type in DeploymentConditionType::ALL {
        let condition = current.condition(condition_type).unwrap();
        assert!(condition.last_transition_time.is_some());
        assert!(condition.last_update_time.is_some());
    }
}

#[tokio::test]
async fn ambiguous_event_keeps_stored_status() {
    let (store, deployment) = deployment().await;
    deployment
        .process_event(&only_true("UPFDeploy", "upf", &["Reconciling"], at(1)))
        .await
        .unwrap();
    let before = store.get(&key()).await.unwrap();

    let ambiguous = event(
        "UPFDeploy",
        "upf",
        &[("Available", "Unknown"), ("Reconciling", "Unknown"), ("Ready", "False")],
        at(2),
    );
    let outcome = deployment.process_event(&ambiguous).await.unwrap();
    assert_eq!(outcome, ReportOutcome::Dropped(DropReason::Ambiguous));

    let after = store.get(&key()).await.unwrap();
    assert_eq!(after, before);
    assert_eq!(
        reason(&after.status, DeploymentConditionType::Reconciling),
        Some(ConditionReason::SomeNfsReconciling)
    );
}

#[tokio::test]
async fn ready_and_stalled_forces_stalled() {
    let (store, deployment) = deployment().await;
    deployment
        .process_event(&only_true(
            "UPFDeploy",
            "upf",
            &["Ready", "Stalled", "Available", "Peering"],
            at(1),
        ))
        .await
        .unwrap();

    let summary = deployment.summary().await;
    let upf = summary.nodes.iter().find(|n| n.id == "upf").unwrap();
    assert_eq!(upf.status.state, Some(NfState::Stalled));

    let current = status(&store).await;
    assert_eq!(current.stalled_nfs, 1);
    assert_eq!(current.ready_nfs, 0);
    assert_eq!(
        current.condition(DeploymentConditionType::Stalled).unwrap().message,
        "upf: Inconsistent NFTypeDeploy status received. Ready and stalled conditions cannot be true at the same time."
    );
}

#[tokio::test]
async fn stale_events_never_change_status() {
    let (store, deployment) = deployment().await;
    deployment
        .process_event(&only_true("UPFDeploy", "upf", &["Reconciling"], at(10)))
        .await
        .unwrap();
    let before = store.get(&key()).await.unwrap();
    let summary_before = deployment.summary().await;

    for timestamp in [at(10), at(9), at(0)] {
        let outcome = deployment
            .process_event(&only_true("UPFDeploy", "upf", &["Ready", "Available"], timestamp))
            .await
            .unwrap();
        assert_eq!(outcome, ReportOutcome::Dropped(DropReason::Stale));
    }

    assert_eq!(store.get(&key()).await.unwrap(), before);
    let summary_after = deployment.summary().await;
    assert_eq!(summary_after.nodes, summary_before.nodes);
}

#[tokio::test]
async fn events_for_unknown_nfs_are_dropped() {
    let (store, deployment) = deployment().await;

    let outcome = deployment
        .process_event(&only_true("UDMDeploy", "udm", &["Ready"], at(1)))
        .await
        .unwrap();
    assert_eq!(outcome, ReportOutcome::Dropped(DropReason::Untracked));

    let outcome = deployment
        .process_event(&only_true("SMFDeploy", "upf", &["Ready"], at(1)))
        .await
        .unwrap();
    assert_eq!(outcome, ReportOutcome::Dropped(DropReason::KindMismatch));

    let outcome = deployment
        .process_event(&only_true("AMFDeploy", "amf", &["Ready"], at(1)))
        .await
        .unwrap();
    assert_eq!(outcome, ReportOutcome::Dropped(DropReason::Undecodable));

    assert_eq!(store.get(&key()).await.unwrap().resource_version, 0);
    assert_eq!(*deployment.progress().borrow(), 3);
}

#[tokio::test]
async fn removing_a_site_decreases_targeted_count() {
    let (store, deployment) = deployment().await;
    deployment
        .process_event(&only_true("UPFDeploy", "upf", &["Ready", "Available"], at(1)))
        .await
        .unwrap();
    assert_eq!(status(&store).await.targeted_nfs, 2);

    let mut topology = resource(UPF_SMF).spec;
    topology.sites.retain(|site| site.id != "smf");
    deployment.report_topology(&topology).await.unwrap();

    let current = status(&store).await;
    assert_eq!(current.targeted_nfs, 1);
    assert_eq!(
        reason(&current, DeploymentConditionType::Ready),
        Some(ConditionReason::AllNfsReady)
    );
    let summary = deployment.summary().await;
    assert_eq!(summary.nodes.len(), 1);
    assert!(summary.nodes[0].connections.is_empty());

    topology.sites.push(Site::new("udm", NfType::Udm));
    deployment.report_topology(&topology).await.unwrap();
    let current = status(&store).await;
    assert_eq!(current.targeted_nfs, 2);
    assert_eq!(
        reason(&current, DeploymentConditionType::Ready),
        Some(ConditionReason::SomeNfsReady)
    );
}

#[tokio::test]
async fn unrecognized_condition_status_keeps_the_rest_of_the_event() {
    let (store, deployment) = deployment().await;
    let report = event(
        "UPFDeploy",
        "upf",
        &[
            ("Available", "True"),
            ("Ready", "False"),
            ("Peering", "False"),
            ("Reconciling", "yes"),
            ("Stalled", "False"),
        ],
        at(1),
    );

    let outcome = deployment.process_event(&report).await.unwrap();
    assert!(matches!(outcome, ReportOutcome::Applied(_)));

    let summary = deployment.summary().await;
    let upf = summary.nodes.iter().find(|n| n.id == "upf").unwrap();
    assert_eq!(upf.status.state, Some(NfState::Available));
    assert_eq!(status(&store).await.available_nfs, 1);
}
