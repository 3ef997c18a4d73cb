//! Error types surfaced at the library boundary.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{NamespacedName, NfType};

/// Errors returned by a [`crate::store::StatusStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("status of {0} not found")]
    NotFound(NamespacedName),

    #[error("version conflict updating {key}: expected {expected}, found {found}")]
    Conflict {
        key: NamespacedName,
        expected: u64,
        found: u64,
    },

    #[error("status store error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

/// Errors returned by the status writer.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("status update for {key} still conflicting after {attempts} attempts")]
    RetriesExhausted { key: NamespacedName, attempts: u32 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors returned while resolving enrichment data for a site.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("{kind} with name {name} not found")]
    UnknownType { kind: &'static str, name: String },

    #[error("{kind} with name {name} not found")]
    UnknownCapacityProfile { kind: &'static str, name: String },

    #[error("no profiles are defined for NF type {0}")]
    Unsupported(NfType),

    #[error("failed to parse profile document {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to read profile directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while decoding an edge event into a typed payload.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("unsupported object kind: {0}")]
    UnknownKind(String),

    #[error("unable to decode {kind} object: {source}")]
    Decode {
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{kind} object carries no site id label")]
    MissingSiteLabel { kind: String },
}
