//! Edge events and their decoding into per-NF condition reports.
//!
//! Events arrive with an untyped object. The object is decoded exactly once,
//! at this boundary, into an [`NfStatusPayload`] chosen by the event kind;
//! everything past this point works with the normalized [`NfReport`].

pub mod listener;
pub mod watcher;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::EventError;
use crate::status::NfReport;
use crate::types::{ConditionStatus, NfCondition, NfConditionType, NfType};

pub use listener::{ListenerExit, run_listener};
pub use watcher::{
    ChannelEdgeWatcher, EdgeWatcher, Subscription, SubscriptionHandle, SubscriptionRequest,
};

/// Label carrying the id of the site an NF object was deployed for.
pub const SITE_ID_LABEL: &str = "nfdeploy.nephio.org/site-id";

pub const UPF_DEPLOY_KIND: &str = "UPFDeploy";
pub const SMF_DEPLOY_KIND: &str = "SMFDeploy";
pub const UDM_DEPLOY_KIND: &str = "UDMDeploy";
pub const AUSF_DEPLOY_KIND: &str = "AUSFDeploy";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventKey {
    pub namespace: String,
    pub kind: String,
}

/// One status change observed on an edge cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeEvent {
    pub key: EventKey,
    pub object: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl EdgeEvent {
    pub fn new(
        namespace: impl Into<String>,
        kind: impl Into<String>,
        object: serde_json::Value,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            key: EventKey {
                namespace: namespace.into(),
                kind: kind.into(),
            },
            object,
            timestamp,
        }
    }

    /// Decode the object and normalize it into a report.
    pub fn to_report(&self) -> Result<NfReport, EventError> {
        NfStatusPayload::decode(&self.key.kind, &self.object)?.into_report(self.timestamp)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ObjectMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// Condition entry as found on an NF deploy object.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawCondition {
    #[serde(rename = "type")]
    pub condition_type: String,
    #[serde(default)]
    pub status: ConditionStatus,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NfDeployStatus {
    #[serde(default)]
    pub conditions: Vec<RawCondition>,
}

/// The parts of an NF deploy object this crate reads. All four kinds share
/// this shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NfDeployObject {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub status: NfDeployStatus,
}

impl NfDeployObject {
    pub fn site_id(&self) -> Option<&str> {
        self.metadata.labels.get(SITE_ID_LABEL).map(String::as_str)
    }

    /// Conditions of the five known types; others are skipped.
    pub fn conditions(&self) -> Vec<NfCondition> {
        self.status
            .conditions
            .iter()
            .filter_map(|raw| {
                let condition_type = parse_condition_type(&raw.condition_type)?;
                Some(NfCondition::new(condition_type, raw.status).with_message(raw.message.clone()))
            })
            .collect()
    }
}

fn parse_condition_type(value: &str) -> Option<NfConditionType> {
    NfConditionType::ALL
        .into_iter()
        .find(|condition_type| condition_type.as_str() == value)
}

/// Typed status payload of an edge event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NfStatusPayload {
    Upf(NfDeployObject),
    Smf(NfDeployObject),
    Udm(NfDeployObject),
    Ausf(NfDeployObject),
}

impl NfStatusPayload {
    pub fn decode(kind: &str, object: &serde_json::Value) -> Result<Self, EventError> {
        let wrap: fn(NfDeployObject) -> Self = match kind {
            UPF_DEPLOY_KIND => Self::Upf,
            SMF_DEPLOY_KIND => Self::Smf,
            UDM_DEPLOY_KIND => Self::Udm,
            AUSF_DEPLOY_KIND => Self::Ausf,
            other => return Err(EventError::UnknownKind(other.to_string())),
        };
        let document = NfDeployObject::deserialize(object).map_err(|source| EventError::Decode {
            kind: kind.to_string(),
            source,
        })?;
        Ok(wrap(document))
    }

    pub fn nf_type(&self) -> NfType {
        match self {
            Self::Upf(_) => NfType::Upf,
            Self::Smf(_) => NfType::Smf,
            Self::Udm(_) => NfType::Udm,
            Self::Ausf(_) => NfType::Ausf,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Upf(_) => UPF_DEPLOY_KIND,
            Self::Smf(_) => SMF_DEPLOY_KIND,
            Self::Udm(_) => UDM_DEPLOY_KIND,
            Self::Ausf(_) => AUSF_DEPLOY_KIND,
        }
    }

    pub fn object(&self) -> &NfDeployObject {
        match self {
            Self::Upf(object) | Self::Smf(object) | Self::Udm(object) | Self::Ausf(object) => {
                object
            }
        }
    }

    pub fn into_report(self, timestamp: DateTime<Utc>) -> Result<NfReport, EventError> {
        let nf_type = self.nf_type();
        let kind = self.kind();
        let object = self.object();
        let nf_id = object
            .site_id()
            .ok_or_else(|| EventError::MissingSiteLabel {
                kind: kind.to_string(),
            })?
            .to_string();
        debug!(nf = %nf_id, kind, "Edge event received");
        Ok(NfReport {
            nf_id,
            nf_type: Some(nf_type),
            conditions: object.conditions(),
            timestamp,
        })
    }
}
