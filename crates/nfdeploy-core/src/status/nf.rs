//! Per-NF status state machine.
//!
//! A raw report is normalized into a [`ConditionSet`] (absent types are
//! `Unknown`), screened for ambiguity, validated for contradictory
//! combinations and finally folded into an [`NfStatus`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ConditionStatus, NfCondition, NfConditionType};

const READY_AND_STALLED: &str = "Inconsistent NFTypeDeploy status received. Ready and stalled conditions cannot be true at the same time.";
const UNAVAILABLE_BUT_PROGRESSING: &str = "Inconsistent NFTypeDeploy status received. Available condition cannot be false when ready or peering conditions are true.";
const PEERING_NOT_RECONCILING: &str = "Inconsistent NFTypeDeploy status received. Reconciling condition cannot be false when peering condition is true.";
const READY_BUT_PROGRESSING: &str = "Inconsistent NFTypeDeploy status received. Ready condition cannot be true when either reconciling or peering condition are true.";
const NEITHER_AVAILABLE_NOR_RECONCILING: &str = "NF is neither available nor reconciling.";
const IMPLIED_BY_READY: &str = "NF is in ready state.";
const IMPLIED_BY_PEERING: &str = "NF is in peering state.";

/// Derived state of one NF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NfState {
    Available,
    Ready,
    Peering,
    Reconciling,
    Stalled,
}

/// Status held by a graph node.
///
/// `state` stays `None` until the first accepted event for the NF.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NfStatus {
    pub state: Option<NfState>,
    pub message: String,
    pub active_conditions: BTreeMap<NfConditionType, String>,
    pub last_event_timestamp: Option<DateTime<Utc>>,
}

impl NfStatus {
    fn stalled(message: &str) -> Self {
        Self {
            state: Some(NfState::Stalled),
            message: message.to_string(),
            active_conditions: BTreeMap::from([(NfConditionType::Stalled, message.to_string())]),
            last_event_timestamp: None,
        }
    }

    pub fn is_active(&self, condition_type: NfConditionType) -> bool {
        self.active_conditions.contains_key(&condition_type)
    }

    /// Whether an event stamped `timestamp` advances this status.
    pub fn accepts(&self, timestamp: DateTime<Utc>) -> bool {
        self.last_event_timestamp.is_none_or(|last| timestamp > last)
    }
}

/// A report normalized over all five condition types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionSet {
    entries: BTreeMap<NfConditionType, (ConditionStatus, String)>,
}

impl ConditionSet {
    /// Later entries for the same type override earlier ones.
    pub fn from_reports(reports: &[NfCondition]) -> Self {
        let mut entries: BTreeMap<NfConditionType, (ConditionStatus, String)> = reports
            .iter()
            .map(|c| (c.condition_type, (c.status, c.message.clone())))
            .collect();
        for condition_type in NfConditionType::ALL {
            entries
                .entry(condition_type)
                .or_insert((ConditionStatus::Unknown, String::new()));
        }
        Self { entries }
    }

    pub fn status(&self, condition_type: NfConditionType) -> ConditionStatus {
        self.entries
            .get(&condition_type)
            .map(|(status, _)| *status)
            .unwrap_or_default()
    }

    pub fn message(&self, condition_type: NfConditionType) -> &str {
        self.entries
            .get(&condition_type)
            .map(|(_, message)| message.as_str())
            .unwrap_or_default()
    }

    fn is_true(&self, condition_type: NfConditionType) -> bool {
        self.status(condition_type) == ConditionStatus::True
    }

    fn is_false(&self, condition_type: NfConditionType) -> bool {
        self.status(condition_type) == ConditionStatus::False
    }

    fn unavailable_and_idle(&self) -> bool {
        self.is_false(NfConditionType::Available) && self.is_false(NfConditionType::Reconciling)
    }

    /// Nothing is asserted and the NF is not explicitly stuck either.
    pub fn is_ambiguous(&self) -> bool {
        let any_true = self
            .entries
            .values()
            .any(|(status, _)| *status == ConditionStatus::True);
        !any_true && !self.unavailable_and_idle()
    }

    /// First violated consistency rule, if any.
    pub fn violation(&self) -> Option<&'static str> {
        use NfConditionType::*;

        if self.is_true(Ready) && self.is_true(Stalled) {
            return Some(READY_AND_STALLED);
        }
        if (self.is_true(Ready) || self.is_true(Peering)) && self.is_false(Available) {
            return Some(UNAVAILABLE_BUT_PROGRESSING);
        }
        if self.is_false(Reconciling) && self.is_true(Peering) {
            return Some(PEERING_NOT_RECONCILING);
        }
        if (self.is_true(Peering) || self.is_true(Reconciling)) && self.is_true(Ready) {
            return Some(READY_BUT_PROGRESSING);
        }
        None
    }

    /// Fold the set into a status. The event timestamp is left for the
    /// caller to stamp.
    pub fn derive(&self) -> NfStatus {
        use NfConditionType::*;

        if let Some(message) = self.violation() {
            return NfStatus::stalled(message);
        }
        if self.unavailable_and_idle() {
            return NfStatus::stalled(NEITHER_AVAILABLE_NOR_RECONCILING);
        }

        let mut active: BTreeMap<NfConditionType, String> = self
            .entries
            .iter()
            .filter(|(_, (status, _))| *status == ConditionStatus::True)
            .map(|(condition_type, (_, message))| (*condition_type, message.clone()))
            .collect();

        let state = if self.is_true(Stalled) {
            NfState::Stalled
        } else if self.is_true(Ready) {
            active
                .entry(Available)
                .or_insert_with(|| IMPLIED_BY_READY.to_string());
            NfState::Ready
        } else if self.is_true(Peering) {
            active
                .entry(Reconciling)
                .or_insert_with(|| IMPLIED_BY_PEERING.to_string());
            active
                .entry(Available)
                .or_insert_with(|| IMPLIED_BY_PEERING.to_string());
            NfState::Peering
        } else if self.is_true(Reconciling) {
            NfState::Reconciling
        } else {
            NfState::Available
        };

        let message = match state {
            NfState::Stalled => self.message(Stalled),
            NfState::Ready => self.message(Ready),
            NfState::Peering => self.message(Peering),
            NfState::Reconciling => self.message(Reconciling),
            NfState::Available => self.message(Available),
        };

        NfStatus {
            state: Some(state),
            message: message.to_string(),
            active_conditions: active,
            last_event_timestamp: None,
        }
    }
}
