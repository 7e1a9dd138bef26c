// Copyright (c) 2026 Vorion Labs, Inc.
// SPDX-License-Identifier: AGPL-3.0
//! # Agent Control State Machine
//!
//! Per-agent lifecycle state: active → paused/suspended → active, with
//! `terminated` as the single absorbing state. Every halt is captured as an
//! immutable [`PauseRecord`]; the record chain is the agent's full pause
//! history and is only ever appended to, never rewritten. The single
//! exception is the one-time `resumed_at` fill-in on the latest record.
//!
//! Direct dependencies and dependents of an agent are *not* stored here —
//! they are back-references owned by the dependency graph and resolved
//! through it (see [`crate::domain::dependency`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub Uuid);

impl AgentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PauseRecordId(pub Uuid);

impl PauseRecordId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PauseRecordId {
    fn default() -> Self {
        Self::new()
    }
}

/// Lifecycle state of an agent under governance control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlState {
    Active,
    Paused,
    Suspended,
    Terminated,
}

impl ControlState {
    /// True for any state that prevents the agent from executing.
    pub fn is_halted(&self) -> bool {
        matches!(self, ControlState::Paused | ControlState::Suspended)
    }

    /// `terminated` is absorbing: no transition leaves it.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ControlState::Terminated)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ControlState::Active => "active",
            ControlState::Paused => "paused",
            ControlState::Suspended => "suspended",
            ControlState::Terminated => "terminated",
        }
    }
}

impl fmt::Display for ControlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an agent was halted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseReason {
    Investigation,
    Maintenance,
    ConsumerRequest,
    CircuitBreaker,
    CascadeHalt,
    EmergencyStop,
    SecurityIncident,
    Other,
}

impl PauseReason {
    /// The halted state this reason maps to. `security_incident` is the only
    /// path into `suspended`; every other reason produces `paused`.
    pub fn halted_state(&self) -> ControlState {
        match self {
            PauseReason::SecurityIncident => ControlState::Suspended,
            _ => ControlState::Paused,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PauseReason::Investigation => "investigation",
            PauseReason::Maintenance => "maintenance",
            PauseReason::ConsumerRequest => "consumer_request",
            PauseReason::CircuitBreaker => "circuit_breaker",
            PauseReason::CascadeHalt => "cascade_halt",
            PauseReason::EmergencyStop => "emergency_stop",
            PauseReason::SecurityIncident => "security_incident",
            PauseReason::Other => "other",
        }
    }
}

impl fmt::Display for PauseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who requested a governance action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitiatorKind {
    Trainer,
    Admin,
    Council,
    System,
    Cascade,
}

impl InitiatorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InitiatorKind::Trainer => "trainer",
            InitiatorKind::Admin => "admin",
            InitiatorKind::Council => "council",
            InitiatorKind::System => "system",
            InitiatorKind::Cascade => "cascade",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Initiator {
    pub id: String,
    pub kind: InitiatorKind,
}

impl Initiator {
    pub fn new(id: impl Into<String>, kind: InitiatorKind) -> Self {
        Self { id: id.into(), kind }
    }

    /// The platform itself, used by scheduled sweeps and internal flows.
    pub fn system() -> Self {
        Self::new("system", InitiatorKind::System)
    }
}

/// One halt in an agent's history. Immutable once created, except for the
/// single `resumed_at` fill-in performed by the resume operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PauseRecord {
    pub id: PauseRecordId,
    pub agent_id: AgentId,
    pub previous_state: ControlState,
    pub new_state: ControlState,
    pub reason: PauseReason,
    pub initiator: Initiator,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub paused_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resumed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_resume_at: Option<DateTime<Utc>>,
    /// Links a cascade-created record back to the pause that triggered it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_incident_id: Option<PauseRecordId>,
}

/// Aggregate root for one agent's governance state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentControlState {
    pub agent_id: AgentId,
    /// Declared category attribute, used by kill-switch scope selectors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Declared tier attribute, used by kill-switch scope selectors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    /// Individually exempt from kill-switch scopes below lockdown level.
    #[serde(default)]
    pub kill_switch_exempt: bool,
    pub current_state: ControlState,
    pub last_state_change: DateTime<Utc>,
    pub pause_history: Vec<PauseRecord>,
}

impl AgentControlState {
    pub fn new(agent_id: AgentId) -> Self {
        Self {
            agent_id,
            category: None,
            tier: None,
            kill_switch_exempt: false,
            current_state: ControlState::Active,
            last_state_change: Utc::now(),
            pause_history: Vec::new(),
        }
    }

    pub fn latest_pause(&self) -> Option<&PauseRecord> {
        self.pause_history.last()
    }

    /// Append a pause record and move into its halted state.
    ///
    /// The caller is responsible for rejecting invalid transitions; this
    /// method only applies an already-validated one.
    pub fn apply_pause(&mut self, record: PauseRecord) {
        self.current_state = record.new_state;
        self.last_state_change = record.paused_at;
        self.pause_history.push(record);
    }

    /// Fill `resumed_at` on the latest open pause record and return to
    /// `active`. Returns the record id that was closed, or `None` if the
    /// latest record was already closed (double-resume guard).
    pub fn apply_resume(&mut self, at: DateTime<Utc>) -> Option<PauseRecordId> {
        let record = self.pause_history.last_mut()?;
        if record.resumed_at.is_some() {
            return None;
        }
        record.resumed_at = Some(at);
        let id = record.id;
        self.current_state = ControlState::Active;
        self.last_state_change = at;
        Some(id)
    }
}

/// Result of the `can_execute` dispatch-gate query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionGate {
    pub agent_id: AgentId,
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocking_state: Option<ControlState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocking_reason: Option<PauseReason>,
}

impl ExecutionGate {
    pub fn allowed(agent_id: AgentId) -> Self {
        Self {
            agent_id,
            allowed: true,
            blocking_state: None,
            blocking_reason: None,
        }
    }

    pub fn blocked(agent_id: AgentId, state: ControlState, reason: Option<PauseReason>) -> Self {
        Self {
            agent_id,
            allowed: false,
            blocking_state: Some(state),
            blocking_reason: reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pause_record(agent_id: AgentId, reason: PauseReason) -> PauseRecord {
        PauseRecord {
            id: PauseRecordId::new(),
            agent_id,
            previous_state: ControlState::Active,
            new_state: reason.halted_state(),
            reason,
            initiator: Initiator::new("ops-1", InitiatorKind::Admin),
            notes: None,
            paused_at: Utc::now(),
            resumed_at: None,
            auto_resume_at: None,
            related_incident_id: None,
        }
    }

    #[test]
    fn test_security_incident_maps_to_suspended() {
        assert_eq!(
            PauseReason::SecurityIncident.halted_state(),
            ControlState::Suspended
        );
        assert_eq!(PauseReason::Maintenance.halted_state(), ControlState::Paused);
        assert_eq!(PauseReason::CascadeHalt.halted_state(), ControlState::Paused);
    }

    #[test]
    fn test_apply_pause_transitions_state() {
        let id = AgentId::new();
        let mut state = AgentControlState::new(id);
        state.apply_pause(pause_record(id, PauseReason::Investigation));
        assert_eq!(state.current_state, ControlState::Paused);
        assert_eq!(state.pause_history.len(), 1);
    }

    #[test]
    fn test_apply_resume_fills_resumed_at_exactly_once() {
        let id = AgentId::new();
        let mut state = AgentControlState::new(id);
        state.apply_pause(pause_record(id, PauseReason::Maintenance));

        let closed = state.apply_resume(Utc::now());
        assert!(closed.is_some());
        assert_eq!(state.current_state, ControlState::Active);
        assert!(state.pause_history[0].resumed_at.is_some());

        // Second resume against the same record is a no-op guard.
        assert!(state.apply_resume(Utc::now()).is_none());
    }

    #[test]
    fn test_terminated_is_terminal() {
        assert!(ControlState::Terminated.is_terminal());
        assert!(!ControlState::Suspended.is_terminal());
        assert!(ControlState::Suspended.is_halted());
        assert!(!ControlState::Active.is_halted());
    }

    #[test]
    fn test_reason_serializes_snake_case() {
        let json = serde_json::to_string(&PauseReason::ConsumerRequest).unwrap();
        assert_eq!(json, "\"consumer_request\"");
        let json = serde_json::to_string(&InitiatorKind::Cascade).unwrap();
        assert_eq!(json, "\"cascade\"");
    }
}
