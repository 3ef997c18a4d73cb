//! Listener protocol: subscription result, event loop, failures and
//! cancellation.

mod support;

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use nfdeploy_core::deployment::Deployment;
use nfdeploy_core::edge::{EdgeEvent, ListenerExit, Subscription, run_listener};
use nfdeploy_core::profile::ProfileSet;
use nfdeploy_core::store::{InMemoryStatusStore, StatusStore};
use nfdeploy_core::types::{ConditionReason, ConditionStatus, DeploymentStatus};
use nfdeploy_core::writer::{RetryPolicy, StatusWriter};

use support::{UPF_SMF, at, key, only_true, resource, seeded_store};

struct Harness {
    store: Arc<InMemoryStatusStore>,
    deployment: Arc<Deployment>,
    result: oneshot::Sender<Result<(), String>>,
    events: mpsc::Sender<EdgeEvent>,
    listener: tokio::task::JoinHandle<ListenerExit>,
}

async fn start() -> Harness {
    let store = seeded_store().await;
    let writer = StatusWriter::new(store.clone(), key(), RetryPolicy::default());
    let deployment = Arc::new(Deployment::new(writer, Arc::new(ProfileSet::new())));
    deployment
        .report_topology(&resource(UPF_SMF).spec)
        .await
        .unwrap();

    let (result_tx, result_rx) = oneshot::channel();
    let (events_tx, events_rx) = mpsc::channel(8);
    let listener = tokio::spawn(run_listener(
        deployment.clone(),
        Subscription {
            result: result_rx,
            events: events_rx,
        },
    ));
    Harness {
        store,
        deployment,
        result: result_tx,
        events: events_tx,
        listener,
    }
}

fn assert_all_unknown(status: &DeploymentStatus, reason: ConditionReason, message: &str) {
    assert_eq!(status.conditions.len(), 4);
    for condition in &status.conditions {
        assert_eq!(condition.status, ConditionStatus::Unknown);
        assert_eq!(condition.reason, Some(reason));
        assert_eq!(condition.message, message);
    }
}

#[tokio::test]
async fn subscription_error_marks_connection_failure() {
    let harness = start().await;
    harness.result.send(Err("tls handshake timeout".to_string())).unwrap();

    let exit = harness.listener.await.unwrap();
    assert!(matches!(exit, ListenerExit::SubscriptionFailed(_)));

    let status = harness.store.snapshot(&key()).await.unwrap();
    assert_all_unknown(
        &status,
        ConditionReason::EdgeConnectionFailure,
        "Connection with edge failed due to tls handshake timeout",
    );
    assert!(harness.events.is_closed());
}

#[tokio::test]
async fn dropped_result_marks_connection_failure() {
    let harness = start().await;
    drop(harness.result);

    assert!(matches!(
        harness.listener.await.unwrap(),
        ListenerExit::SubscriptionFailed(_)
    ));
    let status = harness.store.snapshot(&key()).await.unwrap();
    assert_all_unknown(
        &status,
        ConditionReason::EdgeConnectionFailure,
        "Edge connection broke unexpectedly",
    );
}

#[tokio::test]
async fn closed_stream_marks_connection_broken() {
    let harness = start().await;
    harness.result.send(Ok(())).unwrap();

    let mut progress = harness.deployment.progress();
    harness
        .events
        .send(only_true("UPFDeploy", "upf", &["Ready", "Available"], at(1)))
        .await
        .unwrap();
    progress.wait_for(|processed| *processed >= 1).await.unwrap();
    assert_eq!(harness.store.snapshot(&key()).await.unwrap().ready_nfs, 1);

    drop(harness.events);
    assert_eq!(harness.listener.await.unwrap(), ListenerExit::StreamClosed);

    let status = harness.store.snapshot(&key()).await.unwrap();
    assert_all_unknown(
        &status,
        ConditionReason::EdgeConnectionBroken,
        "Connection to edge broke unexpectedly.",
    );
    assert_eq!(status.targeted_nfs, 0);
}

#[tokio::test]
async fn shutdown_stops_event_loop_without_writing() {
    let harness = start().await;
    harness.result.send(Ok(())).unwrap();

    harness.deployment.shutdown();
    assert_eq!(harness.listener.await.unwrap(), ListenerExit::Cancelled);
    assert_eq!(harness.store.get(&key()).await.unwrap().resource_version, 0);
}

#[tokio::test]
async fn shutdown_before_subscription_result() {
    let harness = start().await;
    harness.deployment.shutdown();

    assert_eq!(harness.listener.await.unwrap(), ListenerExit::Cancelled);
    assert!(harness.result.is_closed());
    assert_eq!(harness.store.get(&key()).await.unwrap().resource_version, 0);
}
