//! Enrichment of graph nodes from named NF type and capacity profiles.

pub mod set;

use serde::{Deserialize, Serialize};

use crate::error::ProfileError;
use crate::types::NfType;

pub use set::ProfileSet;

/// Type-specific enrichment resolved for a site's `nfTypeName`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum NfIntent {
    /// No enrichment is defined for this NF type.
    #[default]
    None,
    Upf { throughput: String },
    #[serde(rename_all = "camelCase")]
    Smf { max_sessions: String },
}

/// Resolves enrichment data by NF type and type name.
///
/// Implementations are injected into the graph builder; lookups happen while
/// the deployment lock is held, so they must not block on I/O.
pub trait ProfileRepository: Send + Sync {
    fn resolve_intent(&self, nf_type: NfType, type_name: &str) -> Result<NfIntent, ProfileError>;
}
