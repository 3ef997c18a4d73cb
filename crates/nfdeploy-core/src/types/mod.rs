//! Shared core types used across the graph, aggregation and store layers.

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod status;

pub use status::{ConditionReason, DeploymentCondition, DeploymentConditionType, DeploymentStatus};

/// Key of a tracked NF deployment resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct NamespacedName {
    pub namespace: String,
    pub name: String,
}

impl NamespacedName {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for NamespacedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Network function type of a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NfType {
    /// User-plane function.
    Upf,
    /// Session-management function.
    Smf,
    /// Access and mobility management function.
    Amf,
    /// Authentication server function.
    Ausf,
    /// Unified data management function.
    Udm,
    #[default]
    #[serde(other)]
    Unspecified,
}

impl NfType {
    /// Types that are tracked as nodes of a deployment graph.
    pub const TRACKED: [NfType; 4] = [NfType::Upf, NfType::Smf, NfType::Ausf, NfType::Udm];

    /// Parse a declared type string; unknown values map to `Unspecified`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "upf" => NfType::Upf,
            "smf" => NfType::Smf,
            "amf" => NfType::Amf,
            "ausf" => NfType::Ausf,
            "udm" => NfType::Udm,
            _ => NfType::Unspecified,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NfType::Upf => "upf",
            NfType::Smf => "smf",
            NfType::Amf => "amf",
            NfType::Ausf => "ausf",
            NfType::Udm => "udm",
            NfType::Unspecified => "unspecified",
        }
    }

    /// Whether sites of this type become graph nodes.
    pub fn is_tracked(&self) -> bool {
        Self::TRACKED.contains(self)
    }
}

impl fmt::Display for NfType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tri-state status shared by NF conditions and deployment conditions.
///
/// Any other string decodes as `Unknown`: it asserts neither `True` nor
/// `False`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ConditionStatus {
    True,
    False,
    #[default]
    #[serde(other)]
    Unknown,
}

impl ConditionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionStatus::True => "True",
            ConditionStatus::False => "False",
            ConditionStatus::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Condition types reported by a single NF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NfConditionType {
    Available,
    Ready,
    Peering,
    Reconciling,
    Stalled,
}

impl NfConditionType {
    pub const ALL: [NfConditionType; 5] = [
        NfConditionType::Available,
        NfConditionType::Ready,
        NfConditionType::Peering,
        NfConditionType::Reconciling,
        NfConditionType::Stalled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NfConditionType::Available => "Available",
            NfConditionType::Ready => "Ready",
            NfConditionType::Peering => "Peering",
            NfConditionType::Reconciling => "Reconciling",
            NfConditionType::Stalled => "Stalled",
        }
    }
}

impl fmt::Display for NfConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One raw condition entry from an NF status document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NfCondition {
    #[serde(rename = "type")]
    pub condition_type: NfConditionType,
    #[serde(default)]
    pub status: ConditionStatus,
    #[serde(default)]
    pub message: String,
}

impl NfCondition {
    pub fn new(condition_type: NfConditionType, status: ConditionStatus) -> Self {
        Self {
            condition_type,
            status,
            message: String::new(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}
