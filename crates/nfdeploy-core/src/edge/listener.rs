//! Per-deployment task feeding subscription events into the aggregator.

use std::sync::Arc;

use tracing::{error, info, warn};

use super::Subscription;
use crate::deployment::Deployment;
use crate::types::ConditionReason;

/// Why a listener stopped. Every exit is terminal for that listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerExit {
    Cancelled,
    /// The subscription could not be established.
    SubscriptionFailed(String),
    /// The event stream closed after the subscription was established.
    StreamClosed,
}

/// Wait for the subscription result, then process events until the
/// deployment is shut down or the stream closes.
pub async fn run_listener(deployment: Arc<Deployment>, subscription: Subscription) -> ListenerExit {
    let Subscription { result, mut events } = subscription;
    let cancel = deployment.cancellation_token();
    let key = deployment.key().clone();

    let established = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            info!(deployment = %key, "Listener cancelled before subscription was established");
            return ListenerExit::Cancelled;
        }
        established = result => established,
    };

    let failure = match established {
        Ok(Ok(())) => None,
        Ok(Err(err)) => Some(format!("Connection with edge failed due to {}", err)),
        Err(_) => Some("Edge connection broke unexpectedly".to_string()),
    };
    if let Some(message) = failure {
        warn!(deployment = %key, "Edge subscription failed: {}", message);
        if let Err(err) = deployment
            .report_connection_failure(ConditionReason::EdgeConnectionFailure, &message)
            .await
        {
            error!(deployment = %key, "Unable to record edge connection failure: {}", err);
        }
        return ListenerExit::SubscriptionFailed(message);
    }
    info!(deployment = %key, "Edge subscription established");

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(deployment = %key, "Listener cancelled");
                return ListenerExit::Cancelled;
            }
            event = events.recv() => match event {
                Some(event) => {
                    if let Err(err) = deployment.process_event(&event).await {
                        error!(deployment = %key, "Failed to persist NF status: {}", err);
                    }
                }
                None => {
                    warn!(deployment = %key, "Edge event stream closed");
                    if let Err(err) = deployment
                        .report_connection_failure(
                            ConditionReason::EdgeConnectionBroken,
                            "Connection to edge broke unexpectedly.",
                        )
                        .await
                    {
                        error!(deployment = %key, "Unable to record broken edge connection: {}", err);
                    }
                    return ListenerExit::StreamClosed;
                }
            }
        }
    }
}
