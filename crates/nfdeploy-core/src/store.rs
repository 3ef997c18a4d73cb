//! Remote status store interface and an in-memory implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::types::{DeploymentStatus, NamespacedName};

/// A status document together with the store version it was read at.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VersionedStatus {
    pub resource_version: u64,
    pub status: DeploymentStatus,
}

/// Optimistically versioned storage for deployment statuses.
#[async_trait]
pub trait StatusStore: Send + Sync {
    async fn get(&self, key: &NamespacedName) -> Result<VersionedStatus, StoreError>;

    /// Replace the status of `key`.
    ///
    /// Fails with [`StoreError::Conflict`] if `status.resource_version` no
    /// longer matches the stored version.
    async fn update(&self, key: &NamespacedName, status: VersionedStatus) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct InMemoryStatusStore {
    entries: RwLock<HashMap<NamespacedName, VersionedStatus>>,
}

impl InMemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `key` with an empty status, as creating the resource would.
    pub async fn insert(&self, key: NamespacedName) {
        self.entries
            .write()
            .await
            .entry(key)
            .or_insert_with(VersionedStatus::default);
    }

    pub async fn snapshot(&self, key: &NamespacedName) -> Option<DeploymentStatus> {
        self.entries
            .read()
            .await
            .get(key)
            .map(|entry| entry.status.clone())
    }
}

#[async_trait]
impl StatusStore for InMemoryStatusStore {
    async fn get(&self, key: &NamespacedName) -> Result<VersionedStatus, StoreError> {
        self.entries
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.clone()))
    }

    async fn update(&self, key: &NamespacedName, status: VersionedStatus) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        let current = entries
            .get_mut(key)
            .ok_or_else(|| StoreError::NotFound(key.clone()))?;
        if current.resource_version != status.resource_version {
            return Err(StoreError::Conflict {
                key: key.clone(),
                expected: status.resource_version,
                found: current.resource_version,
            });
        }
        current.status = status.status;
        current.resource_version += 1;
        Ok(())
    }
}
