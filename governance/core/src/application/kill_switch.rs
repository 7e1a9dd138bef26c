// Copyright (c) 2026 Vorion Labs, Inc.
// SPDX-License-Identifier: AGPL-3.0
//! # Kill Switch Service
//!
//! Platform-wide emergency stop. Activation is a global critical section:
//! the singleton check-and-set runs under one async mutex, so a second
//! attempt while one is in flight deterministically fails with the
//! state-conflict error instead of racing to an inconsistent count.
//!
//! Deactivation never auto-resumes agents — the condition that triggered
//! the stop may still apply to individual agents, so operators resume
//! explicitly.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::application::agent_control::{AgentControlService, PauseOptions};
use crate::application::truth_chain::TruthChainService;
use crate::domain::agent_control::{AgentId, Initiator, PauseReason};
use crate::domain::error::GovernanceError;
use crate::domain::kill_switch::{
    ActivationLevel, ActivationSummary, BlockStatus, KillSwitchScope, KillSwitchState,
};
use crate::domain::repository::{AgentControlRepository, KillSwitchRepository};
use crate::domain::truth_chain::{TruthEntryDraft, TruthEventType};
use crate::infrastructure::event_bus::{EventBus, GovernanceEvent};

pub struct KillSwitchService {
    switches: Arc<dyn KillSwitchRepository>,
    control: Arc<dyn AgentControlRepository>,
    agent_control: Arc<AgentControlService>,
    ledger: Arc<TruthChainService>,
    events: EventBus,
    /// Global critical section around activate/deactivate.
    activation_lock: Mutex<()>,
}

impl KillSwitchService {
    pub fn new(
        switches: Arc<dyn KillSwitchRepository>,
        control: Arc<dyn AgentControlRepository>,
        agent_control: Arc<AgentControlService>,
        ledger: Arc<TruthChainService>,
        events: EventBus,
    ) -> Self {
        Self {
            switches,
            control,
            agent_control,
            ledger,
            events,
            activation_lock: Mutex::new(()),
        }
    }

    /// Activate the kill switch. Pauses every in-scope, non-exempt agent
    /// with reason `emergency_stop` and returns the classification counts.
    ///
    /// `authorization_code` must be present for `critical` and `lockdown`
    /// levels; this core validates presence only, not issuance. The code is
    /// never written to the ledger or the logs.
    pub async fn activate(
        &self,
        scope: KillSwitchScope,
        level: ActivationLevel,
        reason: impl Into<String>,
        initiator: Initiator,
        authorization_code: Option<&str>,
    ) -> Result<ActivationSummary, GovernanceError> {
        let _guard = self.activation_lock.lock().await;

        if let Some(active) = self.switches.find_active().await? {
            return Err(GovernanceError::KillSwitchAlreadyActive {
                switch_id: active.id,
            });
        }
        if level.requires_authorization()
            && authorization_code.map(str::trim).filter(|c| !c.is_empty()).is_none()
        {
            return Err(GovernanceError::AuthorizationMissing { level });
        }

        let reason = reason.into();
        let switch = KillSwitchState::activate(scope.clone(), level, reason.clone(), initiator.clone());
        // Commit the singleton first so is_blocked answers correctly while
        // the pause loop runs.
        self.switches.save(&switch).await?;

        warn!(
            switch_id = %switch.id,
            scope = %scope.describe(),
            level = %level,
            "kill switch activated; halting in-scope agents"
        );

        let mut summary = ActivationSummary {
            switch_id: switch.id,
            scope: scope.clone(),
            level,
            agents_paused: Vec::new(),
            agents_exempt: Vec::new(),
            agents_already_halted: Vec::new(),
            agents_out_of_scope: 0,
        };

        for agent in self.control.list_all().await? {
            if !scope.matches(&agent) {
                summary.agents_out_of_scope += 1;
                continue;
            }
            if agent.kill_switch_exempt && level.honors_exemptions() {
                summary.agents_exempt.push(agent.agent_id);
                continue;
            }

            match self
                .agent_control
                .pause(
                    agent.agent_id,
                    PauseReason::EmergencyStop,
                    initiator.clone(),
                    PauseOptions::default(),
                )
                .await
            {
                Ok(_) => summary.agents_paused.push(agent.agent_id),
                Err(GovernanceError::AlreadyPaused { .. })
                | Err(GovernanceError::Terminated(_)) => {
                    summary.agents_already_halted.push(agent.agent_id);
                }
                Err(e) => {
                    error!(agent_id = %agent.agent_id, error = %e, "emergency pause failed");
                    return Err(e);
                }
            }
        }

        self.ledger
            .record(
                TruthEntryDraft::new(TruthEventType::KillSwitchActivate, initiator)
                    .targets(summary.agents_paused.clone())
                    .reason(reason)
                    .details(serde_json::json!({
                        "switch_id": switch.id,
                        "scope": scope,
                        "level": level,
                        "agents_paused": summary.agents_paused.len(),
                        "agents_exempt": summary.agents_exempt,
                        "agents_already_halted": summary.agents_already_halted.len(),
                        "authorization_code": if authorization_code.is_some() { "[redacted]" } else { "[none]" },
                    })),
            )
            .await?;

        self.events.publish(GovernanceEvent::KillSwitchActivated {
            switch_id: switch.id,
            scope,
            agents_paused: summary.agents_paused.len(),
            at: switch.activated_at,
        });

        Ok(summary)
    }

    /// Deactivate the active switch. No agent is resumed here.
    pub async fn deactivate(
        &self,
        initiator: Initiator,
        notes: Option<String>,
    ) -> Result<KillSwitchState, GovernanceError> {
        let _guard = self.activation_lock.lock().await;

        let mut switch = self
            .switches
            .find_active()
            .await?
            .ok_or(GovernanceError::KillSwitchNotActive)?;

        let now = Utc::now();
        switch.deactivate(initiator.clone(), now);
        let duration_ms = switch.active_duration_ms(now);
        self.switches.save(&switch).await?;

        self.ledger
            .record(
                TruthEntryDraft::new(TruthEventType::KillSwitchDeactivate, initiator)
                    .details(serde_json::json!({
                        "switch_id": switch.id,
                        "active_duration_ms": duration_ms,
                        "notes": notes,
                    })),
            )
            .await?;

        info!(switch_id = %switch.id, duration_ms, "kill switch deactivated");
        self.events.publish(GovernanceEvent::KillSwitchDeactivated {
            switch_id: switch.id,
            active_duration_ms: duration_ms,
            at: now,
        });

        Ok(switch)
    }

    /// Dispatch gate: blocked while an active switch's scope covers the
    /// agent and its exemption does not apply.
    pub async fn is_blocked(&self, agent_id: AgentId) -> Result<BlockStatus, GovernanceError> {
        let Some(switch) = self.switches.find_active().await? else {
            return Ok(BlockStatus::clear(agent_id));
        };
        let Some(agent) = self.control.find_by_id(agent_id).await? else {
            return Ok(BlockStatus::clear(agent_id));
        };

        let in_scope = switch.scope.matches(&agent);
        let exempt = agent.kill_switch_exempt && switch.level.honors_exemptions();
        if in_scope && !exempt {
            return Ok(BlockStatus {
                agent_id,
                blocked: true,
                switch_id: Some(switch.id),
                reason: Some(format!(
                    "kill switch active ({}): {}",
                    switch.scope.describe(),
                    switch.reason
                )),
            });
        }
        Ok(BlockStatus::clear(agent_id))
    }

    /// The currently active switch, if any.
    pub async fn active_switch(&self) -> Result<Option<KillSwitchState>, GovernanceError> {
        Ok(self.switches.find_active().await?)
    }
}
