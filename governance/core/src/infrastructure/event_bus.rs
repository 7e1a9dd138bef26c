// Copyright (c) 2026 Vorion Labs, Inc.
// SPDX-License-Identifier: AGPL-3.0
// Event Bus - Pub/Sub for Governance Domain Events
//
// In-memory event streaming using tokio broadcast channels. Operator
// tooling subscribes to observe halts, cascades, and kill-switch actions in
// real time; the truth chain remains the durable record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::domain::agent_control::{AgentId, InitiatorKind, PauseReason};
use crate::domain::kill_switch::KillSwitchScope;

/// Unified governance event published on every recorded transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GovernanceEvent {
    AgentPaused {
        agent_id: AgentId,
        reason: PauseReason,
        initiator_kind: InitiatorKind,
        paused_at: DateTime<Utc>,
    },
    AgentResumed {
        agent_id: AgentId,
        auto: bool,
        resumed_at: DateTime<Utc>,
    },
    AgentTerminated {
        agent_id: AgentId,
        terminated_at: DateTime<Utc>,
    },
    /// A cascade marked this agent degraded; it remains active.
    AgentDegraded {
        agent_id: AgentId,
        source_agent_id: AgentId,
        at: DateTime<Utc>,
    },
    /// A cascade recorded a notification for this dependent without
    /// propagating further.
    DependentNotified {
        agent_id: AgentId,
        source_agent_id: AgentId,
        at: DateTime<Utc>,
    },
    CascadeCompleted {
        source_agent_id: AgentId,
        agents_halted: usize,
        agents_degraded: usize,
        agents_notified: usize,
        duration_ms: u64,
    },
    KillSwitchActivated {
        switch_id: Uuid,
        scope: KillSwitchScope,
        agents_paused: usize,
        at: DateTime<Utc>,
    },
    KillSwitchDeactivated {
        switch_id: Uuid,
        active_duration_ms: u64,
        at: DateTime<Utc>,
    },
}

/// Event bus for publishing and subscribing to governance events.
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<GovernanceEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity; slow
    /// subscribers lose the oldest events first.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(1000)
    }

    pub fn publish(&self, event: GovernanceEvent) {
        // Err only means no subscribers are currently listening.
        if self.sender.send(event).is_err() {
            debug!("governance event published with no active subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GovernanceEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
