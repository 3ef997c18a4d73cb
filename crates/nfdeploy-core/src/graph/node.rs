//! Nodes and edges of a deployment graph.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::profile::NfIntent;
use crate::status::NfStatus;
use crate::types::NfType;

/// Type-specific spec of a node: placement plus resolved enrichment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NfSpec {
    pub cluster_name: String,
    pub intent: NfIntent,
}

/// One NF instance tracked by a deployment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    pub nf_type: NfType,
    pub spec: NfSpec,
    pub connections: BTreeSet<String>,
    pub status: NfStatus,
}

impl Node {
    pub fn new(id: impl Into<String>, nf_type: NfType) -> Self {
        Self {
            id: id.into(),
            nf_type,
            spec: NfSpec::default(),
            connections: BTreeSet::new(),
            status: NfStatus::default(),
        }
    }

    pub fn is_connected_to(&self, other: &str) -> bool {
        self.connections.contains(other)
    }
}

/// Declared connectivity between two nodes. Endpoints are unordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub first: String,
    pub second: String,
}

impl Edge {
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self {
            first: first.into(),
            second: second.into(),
        }
    }

    pub fn connects(&self, a: &str, b: &str) -> bool {
        (self.first == a && self.second == b) || (self.first == b && self.second == a)
    }

    pub fn touches(&self, id: &str) -> bool {
        self.first == id || self.second == id
    }
}
