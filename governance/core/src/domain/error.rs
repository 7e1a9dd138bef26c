// Copyright (c) 2026 Vorion Labs, Inc.
// SPDX-License-Identifier: AGPL-3.0
//! # Governance Error Taxonomy
//!
//! State conflicts and authorization failures surface verbatim to the
//! caller and are never retried automatically. Integrity violations are
//! fatal to the calling audit process: trust in the chain stops at the
//! reported block and escalation is a human decision, never a silent
//! repair. Blocked outcomes (`can_execute`, `is_blocked`,
//! `can_resume_with_dependencies`) are normal negative results, not errors,
//! and live on their query types instead.

use crate::domain::agent_control::{AgentId, ControlState};
use crate::domain::kill_switch::ActivationLevel;
use crate::domain::repository::RepositoryError;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum GovernanceError {
    #[error("agent {0} is not registered")]
    AgentNotFound(AgentId),

    #[error("agent {agent_id} is already {state}")]
    AlreadyPaused { agent_id: AgentId, state: ControlState },

    #[error("agent {0} is not paused")]
    NotPaused(AgentId),

    #[error("agent {0} is terminated; no recovery path exists")]
    Terminated(AgentId),

    #[error("agent {0} is paused for investigation; resume requires an explicit override")]
    InvestigationBlocked(AgentId),

    #[error("kill switch {switch_id} is already active")]
    KillSwitchAlreadyActive { switch_id: Uuid },

    #[error("no kill switch is active")]
    KillSwitchNotActive,

    #[error("activation level {level} requires an authorization code")]
    AuthorizationMissing { level: ActivationLevel },

    #[error("truth chain integrity violation at block {block_height}: {reason}")]
    IntegrityViolation { block_height: u64, reason: String },

    #[error("signature error: {0}")]
    Signature(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl GovernanceError {
    /// State conflicts are terminal for the request; callers must not retry
    /// them. Storage errors may be retried with backoff.
    pub fn is_state_conflict(&self) -> bool {
        matches!(
            self,
            GovernanceError::AlreadyPaused { .. }
                | GovernanceError::NotPaused(_)
                | GovernanceError::Terminated(_)
                | GovernanceError::KillSwitchAlreadyActive { .. }
                | GovernanceError::KillSwitchNotActive
        )
    }
}
