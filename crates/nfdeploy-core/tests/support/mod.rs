#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use tokio::sync::{Notify, Semaphore};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;

use nfdeploy_core::edge::EdgeEvent;
use nfdeploy_core::error::StoreError;
use nfdeploy_core::store::{InMemoryStatusStore, StatusStore, VersionedStatus};
use nfdeploy_core::topology::NfDeployResource;
use nfdeploy_core::types::NamespacedName;

pub const UPF_SMF: &str = r#"
metadata:
  name: core
  namespace: default
  generation: 1
spec:
  sites:
    - id: upf
      nfType: upf
      clusterName: edge-1
      connectivities:
        - neighborName: smf
    - id: smf
      nfType: smf
      clusterName: edge-1
      connectivities:
        - neighborName: upf
"#;

pub fn key() -> NamespacedName {
    NamespacedName::new("default", "core")
}

pub fn resource(yaml: &str) -> NfDeployResource {
    NfDeployResource::from_yaml(yaml).unwrap()
}

/// `seconds` after a fixed reference instant.
pub fn at(seconds: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap() + chrono::Duration::seconds(seconds)
}

/// An NF deploy event for `id` with `(type, status)` conditions.
pub fn event(kind: &str, id: &str, conditions: &[(&str, &str)], timestamp: DateTime<Utc>) -> EdgeEvent {
    let conditions: Vec<serde_json::Value> = conditions
        .iter()
        .map(|(condition_type, status)| {
            json!({ "type": condition_type, "status": status, "message": format!("{id} {condition_type}") })
        })
        .collect();
    let object = json!({
        "metadata": {
            "name": id,
            "labels": { "nfdeploy.nephio.org/site-id": id }
        },
        "status": { "conditions": conditions }
    });
    EdgeEvent::new("default", kind, object, timestamp)
}

/// Every condition `False` except those listed as `True`.
pub fn only_true(kind: &str, id: &str, truthy: &[&str], timestamp: DateTime<Utc>) -> EdgeEvent {
    let conditions: Vec<(&str, &str)> = ["Available", "Ready", "Peering", "Reconciling", "Stalled"]
        .into_iter()
        .map(|condition_type| {
            let status = if truthy.contains(&condition_type) { "True" } else { "False" };
            (condition_type, status)
        })
        .collect();
    event(kind, id, &conditions, timestamp)
}

pub async fn seeded_store() -> Arc<InMemoryStatusStore> {
    let store = Arc::new(InMemoryStatusStore::new());
    store.insert(key()).await;
    store
}

/// Store that rejects the first `conflicts` updates with a version
/// conflict.
pub struct ConflictingStore {
    pub inner: InMemoryStatusStore,
    remaining: AtomicU32,
    pub updates: AtomicU32,
}

impl ConflictingStore {
    pub async fn new(conflicts: u32) -> Self {
        let inner = InMemoryStatusStore::new();
        inner.insert(key()).await;
        Self {
            inner,
            remaining: AtomicU32::new(conflicts),
            updates: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl StatusStore for ConflictingStore {
    async fn get(&self, key: &NamespacedName) -> Result<VersionedStatus, StoreError> {
        self.inner.get(key).await
    }

    async fn update(&self, key: &NamespacedName, status: VersionedStatus) -> Result<(), StoreError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        let conflicted = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if conflicted {
            return Err(StoreError::Conflict {
                key: key.clone(),
                expected: status.resource_version,
                found: status.resource_version + 1,
            });
        }
        self.inner.update(key, status).await
    }
}

/// Store whose updates always fail with a backend error.
pub struct BrokenStore;

#[async_trait]
impl StatusStore for BrokenStore {
    async fn get(&self, _key: &NamespacedName) -> Result<VersionedStatus, StoreError> {
        Ok(VersionedStatus::default())
    }

    async fn update(&self, _key: &NamespacedName, _status: VersionedStatus) -> Result<(), StoreError> {
        Err(StoreError::Backend("connection refused".to_string()))
    }
}

/// Store whose reads of one key park until a permit is released.
pub struct GatedStore {
    pub inner: InMemoryStatusStore,
    gated: NamespacedName,
    pub entered: Notify,
    pub release: Semaphore,
}

impl GatedStore {
    pub async fn new(keys: &[NamespacedName], gated: NamespacedName) -> Self {
        let inner = InMemoryStatusStore::new();
        for key in keys {
            inner.insert(key.clone()).await;
        }
        Self {
            inner,
            gated,
            entered: Notify::new(),
            release: Semaphore::new(0),
        }
    }
}

#[async_trait]
impl StatusStore for GatedStore {
    async fn get(&self, key: &NamespacedName) -> Result<VersionedStatus, StoreError> {
        if *key == self.gated {
            self.entered.notify_one();
            self.release
                .acquire()
                .await
                .map_err(|err| StoreError::Backend(err.to_string()))?
                .forget();
        }
        self.inner.get(key).await
    }

    async fn update(&self, key: &NamespacedName, status: VersionedStatus) -> Result<(), StoreError> {
        self.inner.update(key, status).await
    }
}
