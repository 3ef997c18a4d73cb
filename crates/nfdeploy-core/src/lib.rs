//! NF Deploy Core Library
//!
//! Tracks the network functions declared by NF deployment resources,
//! folds the status events their edge clusters report into four
//! deployment-wide conditions and persists them under optimistic
//! concurrency.

pub mod config;
pub mod deployment;
pub mod edge;
pub mod error;
pub mod graph;
pub mod profile;
pub mod status;
pub mod store;
pub mod topology;
pub mod types;
pub mod writer;

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::{ConfigStore, ControllerConfig, RetryConfig};

    // Deployments
    pub use crate::deployment::{Deployment, DeploymentManager, DeploymentSummary};
    pub use crate::graph::{DeploymentGraph, Edge, Node};
    pub use crate::topology::{NfDeployResource, Site, Topology};

    // Status
    pub use crate::status::{AggregateStatus, NfCounts, NfState, NfStatus, Phase, ReportOutcome};
    pub use crate::store::{InMemoryStatusStore, StatusStore, VersionedStatus};
    pub use crate::writer::{RetryPolicy, StatusWriter};

    // Edge
    pub use crate::edge::{ChannelEdgeWatcher, EdgeEvent, EdgeWatcher, ListenerExit};

    // Profiles
    pub use crate::profile::{NfIntent, ProfileRepository, ProfileSet};

    pub use crate::error::{EventError, ProfileError, StoreError, WriteError};
    pub use crate::types::{
        ConditionReason, ConditionStatus, DeploymentCondition, DeploymentConditionType,
        DeploymentStatus, NamespacedName, NfType,
    };
}
