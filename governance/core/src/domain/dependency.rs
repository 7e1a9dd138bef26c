// Copyright (c) 2026 Vorion Labs, Inc.
// SPDX-License-Identifier: AGPL-3.0
//! # Dependency Graph & Cascade Types
//!
//! The graph models "agent X requires agent Y to be active" as two
//! independently queryable edge sets: `depends_on` (forward) and
//! `dependent_agents` (inverse). The inverse set of node A must always equal
//! the set of nodes whose `depends_on` contains A; the registration
//! operation maintains that invariant. Edges are stable identifiers, never
//! object pointers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::agent_control::{AgentId, Initiator, PauseReason};

/// What a dependent does when one of its dependencies is paused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyPauseAction {
    /// Pause the dependent and keep propagating through it.
    Halt,
    /// Mark the dependent degraded; it stays active but propagation continues.
    Degrade,
    /// Record a notification only; propagation stops at this node.
    Continue,
}

/// What happens to an agent's dependents when the agent itself is paused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelfPauseAction {
    /// Cascade into the dependent subtree.
    HaltDependents,
    /// Notify direct dependents only, no propagation.
    NotifyOnly,
    /// No cascade at all.
    Ignore,
}

/// Cascade behavior attached to a dependency node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadePolicy {
    #[serde(default = "default_dependency_pause_action")]
    pub on_dependency_pause: DependencyPauseAction,
    #[serde(default = "default_self_pause_action")]
    pub on_self_pause: SelfPauseAction,
    #[serde(default)]
    pub auto_resume_with_dependency: bool,
    /// Advisory delay before dependents are halted. The traversal itself
    /// never sleeps; schedulers consume this value.
    #[serde(default)]
    pub cascade_delay_ms: u64,
    #[serde(default = "default_max_cascade_depth")]
    pub max_cascade_depth: u32,
}

fn default_dependency_pause_action() -> DependencyPauseAction {
    DependencyPauseAction::Halt
}

fn default_self_pause_action() -> SelfPauseAction {
    SelfPauseAction::HaltDependents
}

fn default_max_cascade_depth() -> u32 {
    10
}

impl Default for CascadePolicy {
    fn default() -> Self {
        Self {
            on_dependency_pause: default_dependency_pause_action(),
            on_self_pause: default_self_pause_action(),
            auto_resume_with_dependency: false,
            cascade_delay_ms: 0,
            max_cascade_depth: default_max_cascade_depth(),
        }
    }
}

/// One registered agent in the dependency graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyNode {
    pub agent_id: AgentId,
    /// Agents this one requires to be active.
    pub depends_on: Vec<AgentId>,
    /// Inverse edge set: agents whose `depends_on` contains this node.
    pub dependent_agents: Vec<AgentId>,
    pub policy: CascadePolicy,
}

impl DependencyNode {
    pub fn new(agent_id: AgentId) -> Self {
        Self {
            agent_id,
            depends_on: Vec::new(),
            dependent_agents: Vec::new(),
            policy: CascadePolicy::default(),
        }
    }
}

/// Action taken for one agent during a cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadeAction {
    Halted,
    Degraded,
    Notified,
}

/// One traversal edge of a cascade: who propagated to whom, at what depth,
/// and what the dependent's own policy decided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeStep {
    pub from_agent: AgentId,
    pub to_agent: AgentId,
    pub depth: u32,
    pub action: CascadeAction,
}

/// Everything one cascade operation did, returned to the caller and written
/// to the truth chain as a single pair of entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CascadeEvent {
    pub id: Uuid,
    pub source_agent_id: AgentId,
    pub source_reason: PauseReason,
    pub initiator: Initiator,
    pub agents_halted: Vec<AgentId>,
    pub agents_degraded: Vec<AgentId>,
    pub agents_notified: Vec<AgentId>,
    pub path: Vec<CascadeStep>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl CascadeEvent {
    pub fn total_affected(&self) -> usize {
        self.agents_halted.len() + self.agents_degraded.len() + self.agents_notified.len()
    }
}

/// Topological resume ordering over a set of agents. Cycles do not fail the
/// operation: remaining members are appended deterministically and flagged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeOrder {
    pub order: Vec<AgentId>,
    pub cycle_detected: bool,
    pub cycle_members: Vec<AgentId>,
}

/// Result of the dependency-readiness query before a resume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyReadiness {
    pub agent_id: AgentId,
    pub can_resume: bool,
    pub blocking_dependencies: Vec<AgentId>,
}
