// Copyright (c) 2026 Vorion Labs, Inc.
// SPDX-License-Identifier: AGPL-3.0
//! # Global Kill Switch
//!
//! Platform-wide emergency stop with scope targeting. At most one switch
//! record may be active system-wide; activation and deactivation are guarded
//! by a global critical section in the application layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::agent_control::{AgentControlState, AgentId, Initiator};

/// Which agents an activation targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KillSwitchScope {
    /// Every registered agent.
    All,
    /// Agents whose declared category matches.
    Category { category: String },
    /// Agents whose declared tier matches.
    Tier { tier: String },
}

impl KillSwitchScope {
    pub fn matches(&self, agent: &AgentControlState) -> bool {
        match self {
            KillSwitchScope::All => true,
            KillSwitchScope::Category { category } => {
                agent.category.as_deref() == Some(category.as_str())
            }
            KillSwitchScope::Tier { tier } => agent.tier.as_deref() == Some(tier.as_str()),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            KillSwitchScope::All => "all".to_string(),
            KillSwitchScope::Category { category } => format!("category:{category}"),
            KillSwitchScope::Tier { tier } => format!("tier:{tier}"),
        }
    }
}

/// Severity of an activation. `critical` and `lockdown` require the caller
/// to supply an out-of-band authorization code (presence is validated here,
/// issuance is not). `lockdown` ignores individual exemptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationLevel {
    Standard,
    Critical,
    Lockdown,
}

impl ActivationLevel {
    pub fn requires_authorization(&self) -> bool {
        matches!(self, ActivationLevel::Critical | ActivationLevel::Lockdown)
    }

    /// Only lockdown overrides per-agent exemptions.
    pub fn honors_exemptions(&self) -> bool {
        !matches!(self, ActivationLevel::Lockdown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivationLevel::Standard => "standard",
            ActivationLevel::Critical => "critical",
            ActivationLevel::Lockdown => "lockdown",
        }
    }
}

impl fmt::Display for ActivationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The singleton kill-switch record. Invariant: at most one record has
/// `active = true` at any time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KillSwitchState {
    pub id: Uuid,
    pub active: bool,
    pub scope: KillSwitchScope,
    pub level: ActivationLevel,
    pub reason: String,
    pub activated_by: Initiator,
    pub activated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deactivated_by: Option<Initiator>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deactivated_at: Option<DateTime<Utc>>,
}

impl KillSwitchState {
    pub fn activate(
        scope: KillSwitchScope,
        level: ActivationLevel,
        reason: impl Into<String>,
        activated_by: Initiator,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            active: true,
            scope,
            level,
            reason: reason.into(),
            activated_by,
            activated_at: Utc::now(),
            deactivated_by: None,
            deactivated_at: None,
        }
    }

    pub fn deactivate(&mut self, by: Initiator, at: DateTime<Utc>) {
        self.active = false;
        self.deactivated_by = Some(by);
        self.deactivated_at = Some(at);
    }

    pub fn active_duration_ms(&self, now: DateTime<Utc>) -> u64 {
        let end = self.deactivated_at.unwrap_or(now);
        (end - self.activated_at).num_milliseconds().max(0) as u64
    }
}

/// Counts and classifications produced by one activation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivationSummary {
    pub switch_id: Uuid,
    pub scope: KillSwitchScope,
    pub level: ActivationLevel,
    pub agents_paused: Vec<AgentId>,
    pub agents_exempt: Vec<AgentId>,
    /// In scope but already paused, suspended, or terminated.
    pub agents_already_halted: Vec<AgentId>,
    pub agents_out_of_scope: usize,
}

/// Result of the `is_blocked` dispatch-gate query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockStatus {
    pub agent_id: AgentId,
    pub blocked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub switch_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl BlockStatus {
    pub fn clear(agent_id: AgentId) -> Self {
        Self {
            agent_id,
            blocked: false,
            switch_id: None,
            reason: None,
        }
    }
}
