//! Subscribing to NF status changes on the edge clusters of a deployment.

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use super::EdgeEvent;
use crate::types::NamespacedName;

/// Events buffered per subscription before the edge side is backpressured.
pub const DEFAULT_EVENT_BUFFER: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRequest {
    pub key: NamespacedName,
    /// Clusters hosting the deployment's NFs.
    pub clusters: Vec<String>,
}

/// Receiving side of a subscription.
///
/// `result` resolves once with the outcome of establishing the
/// subscription; on success, events follow on `events`.
#[derive(Debug)]
pub struct Subscription {
    pub result: oneshot::Receiver<Result<(), String>>,
    pub events: mpsc::Receiver<EdgeEvent>,
}

#[async_trait]
pub trait EdgeWatcher: Send + Sync {
    async fn subscribe(&self, request: SubscriptionRequest) -> Subscription;
}

/// Sending side of a subscription created by [`ChannelEdgeWatcher`].
#[derive(Debug)]
pub struct SubscriptionHandle {
    pub request: SubscriptionRequest,
    pub result: oneshot::Sender<Result<(), String>>,
    pub events: mpsc::Sender<EdgeEvent>,
}

/// In-process watcher that hands every subscription to a driver.
#[derive(Debug, Clone)]
pub struct ChannelEdgeWatcher {
    handles: mpsc::UnboundedSender<SubscriptionHandle>,
    buffer: usize,
}

impl ChannelEdgeWatcher {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SubscriptionHandle>) {
        Self::with_buffer(DEFAULT_EVENT_BUFFER)
    }

    pub fn with_buffer(buffer: usize) -> (Self, mpsc::UnboundedReceiver<SubscriptionHandle>) {
        let (handles, driver) = mpsc::unbounded_channel();
        (
            Self {
                handles,
                buffer: buffer.max(1),
            },
            driver,
        )
    }
}

#[async_trait]
impl EdgeWatcher for ChannelEdgeWatcher {
    async fn subscribe(&self, request: SubscriptionRequest) -> Subscription {
        let (result_tx, result_rx) = oneshot::channel();
        let (events_tx, events_rx) = mpsc::channel(self.buffer);
        let key = request.key.clone();
        // A dropped handle closes the result channel, which the listener
        // reports as a connection failure.
        if self
            .handles
            .send(SubscriptionHandle {
                request,
                result: result_tx,
                events: events_tx,
            })
            .is_err()
        {
            warn!(deployment = %key, "No edge driver is accepting subscriptions");
        }
        Subscription {
            result: result_rx,
            events: events_rx,
        }
    }
}
