//! Lifecycle of deployments keyed by their resource name.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::Deployment;
use crate::edge::{EdgeWatcher, ListenerExit, SubscriptionRequest, run_listener};
use crate::error::WriteError;
use crate::profile::ProfileRepository;
use crate::status::Phase;
use crate::store::StatusStore;
use crate::topology::NfDeployResource;
use crate::types::NamespacedName;
use crate::writer::{RetryPolicy, StatusWriter};

struct ManagedDeployment {
    deployment: Arc<Deployment>,
    listener: Option<JoinHandle<ListenerExit>>,
}

/// Creates, updates and tears down deployments as resources change.
pub struct DeploymentManager {
    store: Arc<dyn StatusStore>,
    watcher: Arc<dyn EdgeWatcher>,
    profiles: Arc<dyn ProfileRepository>,
    policy: RetryPolicy,
    deployments: Mutex<HashMap<NamespacedName, ManagedDeployment>>,
}

impl DeploymentManager {
    pub fn new(
        store: Arc<dyn StatusStore>,
        watcher: Arc<dyn EdgeWatcher>,
        profiles: Arc<dyn ProfileRepository>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            store,
            watcher,
            profiles,
            policy,
            deployments: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get(&self, key: &NamespacedName) -> Option<Arc<Deployment>> {
        self.deployments
            .lock()
            .await
            .get(key)
            .map(|managed| managed.deployment.clone())
    }

    pub async fn len(&self) -> usize {
        self.deployments.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Track `resource`, creating its deployment on first sight.
    ///
    /// A new generation is first recorded as [`Phase::NewVersion`]. A new
    /// deployment subscribes to its clusters and starts its listener; an
    /// existing one re-applies the topology. The registry lock is only held
    /// to look up or insert the entry, never across store or watcher calls.
    pub async fn report_topology_event(
        &self,
        resource: &NfDeployResource,
    ) -> Result<Arc<Deployment>, WriteError> {
        let key = resource.key();
        let generation = resource.metadata.generation;

        let (deployment, created) = {
            let mut deployments = self.deployments.lock().await;
            match deployments.entry(key.clone()) {
                Entry::Occupied(entry) => (entry.get().deployment.clone(), false),
                Entry::Vacant(entry) => {
                    let writer =
                        StatusWriter::new(self.store.clone(), key.clone(), self.policy.clone());
                    let deployment = Arc::new(Deployment::new(writer, self.profiles.clone()));
                    entry.insert(ManagedDeployment {
                        deployment: deployment.clone(),
                        listener: None,
                    });
                    (deployment, true)
                }
            }
        };

        if created {
            if let Err(err) = self.start(&deployment, resource).await {
                self.forget_if_current(&key, &deployment).await;
                return Err(err);
            }
            return Ok(deployment);
        }

        if deployment.observe_generation(generation) {
            deployment.report_phase(generation, &Phase::NewVersion).await?;
        }
        deployment.report_topology(&resource.spec).await?;
        Ok(deployment)
    }

    /// Publish the first phase and topology, then subscribe and attach the
    /// listener to the registry entry.
    async fn start(
        &self,
        deployment: &Arc<Deployment>,
        resource: &NfDeployResource,
    ) -> Result<(), WriteError> {
        let key = deployment.key().clone();
        let generation = resource.metadata.generation;
        deployment.observe_generation(generation);
        deployment.report_phase(generation, &Phase::NewVersion).await?;
        deployment.report_topology(&resource.spec).await?;

        if deployment.is_shut_down() {
            debug!(deployment = %key, "Deleted before subscribing");
            return Ok(());
        }

        let clusters = resource
            .spec
            .clusters()
            .into_iter()
            .map(str::to_string)
            .collect();
        let subscription = self
            .watcher
            .subscribe(SubscriptionRequest {
                key: key.clone(),
                clusters,
            })
            .await;
        let listener = tokio::spawn(run_listener(deployment.clone(), subscription));

        let mut deployments = self.deployments.lock().await;
        match deployments.get_mut(&key) {
            Some(managed) if Arc::ptr_eq(&managed.deployment, deployment) => {
                managed.listener = Some(listener);
                info!(deployment = %key, "Created deployment");
            }
            // Deleted while subscribing; the cancelled listener exits on its own.
            _ => deployment.shutdown(),
        }
        Ok(())
    }

    async fn forget_if_current(&self, key: &NamespacedName, deployment: &Arc<Deployment>) {
        let mut deployments = self.deployments.lock().await;
        if let Entry::Occupied(entry) = deployments.entry(key.clone()) {
            if Arc::ptr_eq(&entry.get().deployment, deployment) {
                entry.remove();
            }
        }
        deployment.shutdown();
    }

    /// Record a lifecycle phase for a tracked deployment.
    pub async fn report_phase(
        &self,
        key: &NamespacedName,
        generation: i64,
        phase: &Phase,
    ) -> Result<bool, WriteError> {
        let Some(deployment) = self.get(key).await else {
            return Ok(false);
        };
        deployment.observe_generation(generation);
        deployment.report_phase(generation, phase).await?;
        Ok(true)
    }

    /// Wait for the listener of `key` to stop on its own.
    ///
    /// Returns `None` if the deployment is unknown, its listener has not
    /// started yet, or it was already joined.
    pub async fn join_listener(&self, key: &NamespacedName) -> Option<ListenerExit> {
        let handle = self
            .deployments
            .lock()
            .await
            .get_mut(key)
            .and_then(|managed| managed.listener.take())?;
        join(key, handle).await
    }

    /// Stop tracking `key`: cancel its listener and discard the graph.
    pub async fn report_delete_event(&self, key: &NamespacedName) -> Option<ListenerExit> {
        let managed = self.deployments.lock().await.remove(key)?;
        managed.deployment.shutdown();
        let exit = match managed.listener {
            Some(handle) => join(key, handle).await,
            None => None,
        };
        info!(deployment = %key, exit = ?exit, "Deleted deployment");
        exit
    }

    pub async fn shutdown(&self) {
        let keys: Vec<NamespacedName> = self.deployments.lock().await.keys().cloned().collect();
        for key in keys {
            self.report_delete_event(&key).await;
        }
    }
}

async fn join(key: &NamespacedName, handle: JoinHandle<ListenerExit>) -> Option<ListenerExit> {
    match handle.await {
        Ok(exit) => Some(exit),
        Err(err) => {
            warn!(deployment = %key, "Listener task failed: {}", err);
            None
        }
    }
}
