// Copyright (c) 2026 Vorion Labs, Inc.
// SPDX-License-Identifier: AGPL-3.0
//! # Agent Control Service
//!
//! Pause, resume, terminate, and the `can_execute` dispatch gate, plus the
//! scheduled auto-resume sweep. Mutations are serialized per agent id
//! through a lock map so two concurrent pause/resume calls can never
//! produce an inconsistent pause history; different agents proceed fully
//! concurrently. Every successful transition writes through to the truth
//! chain before the repository commit, then publishes a broadcast event.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::dependency::DependencyGraphService;
use crate::application::truth_chain::TruthChainService;
use crate::domain::agent_control::{
    AgentControlState, AgentId, ControlState, ExecutionGate, Initiator, InitiatorKind,
    PauseReason, PauseRecord, PauseRecordId,
};
use crate::domain::dependency::{CascadeAction, CascadeEvent};
use crate::domain::error::GovernanceError;
use crate::domain::repository::AgentControlRepository;
use crate::domain::truth_chain::{TruthEntryDraft, TruthEventType};
use crate::infrastructure::event_bus::{EventBus, GovernanceEvent};

/// Registration attributes for one agent coming under governance control.
#[derive(Debug, Clone, Default)]
pub struct AgentRegistration {
    pub category: Option<String>,
    pub tier: Option<String>,
    pub kill_switch_exempt: bool,
}

/// Optional knobs on a pause request.
#[derive(Debug, Clone, Default)]
pub struct PauseOptions {
    /// Propagate the halt through the dependency graph.
    pub cascade_to_dependents: bool,
    pub auto_resume_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    /// Set on cascade-created pauses to link back to the trigger.
    pub related_incident_id: Option<PauseRecordId>,
}

/// What a pause call did: the source record, plus the cascade outcome when
/// one was requested.
#[derive(Debug, Clone)]
pub struct PauseOutcome {
    pub record: PauseRecord,
    pub cascade: Option<CascadeEvent>,
}

/// Control state joined with its graph back-references, for operator
/// tooling. The graph owns the edges; this is a read-time view.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AgentControlView {
    #[serde(flatten)]
    pub state: AgentControlState,
    pub depends_on: Vec<AgentId>,
    pub dependent_agents: Vec<AgentId>,
}

pub struct AgentControlService {
    control: Arc<dyn AgentControlRepository>,
    graph: Arc<DependencyGraphService>,
    ledger: Arc<TruthChainService>,
    events: EventBus,
    /// Per-agent mutation locks (row-level locking equivalent).
    locks: DashMap<AgentId, Arc<Mutex<()>>>,
}

impl AgentControlService {
    pub fn new(
        control: Arc<dyn AgentControlRepository>,
        graph: Arc<DependencyGraphService>,
        ledger: Arc<TruthChainService>,
        events: EventBus,
    ) -> Self {
        Self {
            control,
            graph,
            ledger,
            events,
            locks: DashMap::new(),
        }
    }

    fn agent_lock(&self, agent_id: AgentId) -> Arc<Mutex<()>> {
        self.locks
            .entry(agent_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone()
    }

    /// Bring an agent under governance control in the `active` state. If the
    /// agent is already registered, only its declared attributes are
    /// updated; state and history are untouched.
    pub async fn register_agent(
        &self,
        agent_id: AgentId,
        registration: AgentRegistration,
    ) -> Result<AgentControlState, GovernanceError> {
        let lock = self.agent_lock(agent_id);
        let _guard = lock.lock().await;

        let mut state = match self.control.find_by_id(agent_id).await? {
            Some(existing) => existing,
            None => {
                info!(agent_id = %agent_id, "agent registered with governance core");
                AgentControlState::new(agent_id)
            }
        };
        state.category = registration.category;
        state.tier = registration.tier;
        state.kill_switch_exempt = registration.kill_switch_exempt;
        self.control.save(&state).await?;
        Ok(state)
    }

    /// Halt an agent. `security_incident` suspends; every other reason
    /// pauses. With `cascade_to_dependents` set, the halt propagates through
    /// the dependency graph and the full cascade outcome is returned.
    pub async fn pause(
        &self,
        agent_id: AgentId,
        reason: PauseReason,
        initiator: Initiator,
        options: PauseOptions,
    ) -> Result<PauseOutcome, GovernanceError> {
        let cascade_requested = options.cascade_to_dependents;
        let record = self
            .pause_one(agent_id, reason, initiator.clone(), options)
            .await?;

        let cascade = if cascade_requested {
            Some(
                self.run_cascade(agent_id, reason, initiator, Some(record.id))
                    .await?,
            )
        } else {
            None
        };

        Ok(PauseOutcome { record, cascade })
    }

    /// Propagate a halt from `source` through the dependency graph without
    /// touching the source itself. Used when the source was halted out of
    /// band and its dependents must follow.
    pub async fn cascade_halt(
        &self,
        source: AgentId,
        source_reason: PauseReason,
        initiator: Initiator,
    ) -> Result<CascadeEvent, GovernanceError> {
        let state = self
            .control
            .find_by_id(source)
            .await?
            .ok_or(GovernanceError::AgentNotFound(source))?;
        let trigger = state.latest_pause().map(|r| r.id);
        self.run_cascade(source, source_reason, initiator, trigger).await
    }

    async fn pause_one(
        &self,
        agent_id: AgentId,
        reason: PauseReason,
        initiator: Initiator,
        options: PauseOptions,
    ) -> Result<PauseRecord, GovernanceError> {
        let lock = self.agent_lock(agent_id);
        let _guard = lock.lock().await;

        let mut state = self
            .control
            .find_by_id(agent_id)
            .await?
            .ok_or(GovernanceError::AgentNotFound(agent_id))?;

        if state.current_state.is_terminal() {
            return Err(GovernanceError::Terminated(agent_id));
        }
        if state.current_state.is_halted() {
            return Err(GovernanceError::AlreadyPaused {
                agent_id,
                state: state.current_state,
            });
        }

        let record = PauseRecord {
            id: PauseRecordId::new(),
            agent_id,
            previous_state: state.current_state,
            new_state: reason.halted_state(),
            reason,
            initiator: initiator.clone(),
            notes: options.notes,
            paused_at: Utc::now(),
            resumed_at: None,
            auto_resume_at: options.auto_resume_at,
            related_incident_id: options.related_incident_id,
        };

        // Ledger first: a halt that is not recorded must not take effect.
        self.ledger
            .record(
                TruthEntryDraft::new(TruthEventType::AgentPause, initiator.clone())
                    .targets(vec![agent_id])
                    .reason(reason.as_str())
                    .details(serde_json::json!({
                        "pause_record_id": record.id,
                        "new_state": record.new_state,
                        "auto_resume_at": record.auto_resume_at,
                        "related_incident_id": record.related_incident_id,
                    })),
            )
            .await?;

        state.apply_pause(record.clone());
        self.control.save(&state).await?;

        info!(agent_id = %agent_id, reason = %reason, state = %state.current_state, "agent halted");
        self.events.publish(GovernanceEvent::AgentPaused {
            agent_id,
            reason,
            initiator_kind: initiator.kind,
            paused_at: record.paused_at,
        });

        Ok(record)
    }

    async fn run_cascade(
        &self,
        source: AgentId,
        source_reason: PauseReason,
        initiator: Initiator,
        trigger_record_id: Option<PauseRecordId>,
    ) -> Result<CascadeEvent, GovernanceError> {
        let started_at = Utc::now();
        let timer = Instant::now();
        let plan = self.graph.plan_cascade(source).await?;

        let cascade_initiator = Initiator::new(source.to_string(), InitiatorKind::Cascade);
        let mut halted = Vec::new();
        let mut degraded = Vec::new();
        let mut notified = Vec::new();

        for step in &plan.steps {
            match step.action {
                CascadeAction::Halted => {
                    let options = PauseOptions {
                        related_incident_id: trigger_record_id,
                        ..PauseOptions::default()
                    };
                    match self
                        .pause_one(
                            step.to_agent,
                            PauseReason::CascadeHalt,
                            cascade_initiator.clone(),
                            options,
                        )
                        .await
                    {
                        Ok(_) => halted.push(step.to_agent),
                        // Already halted or terminated: the dependent is
                        // safe; the cascade still propagated through it.
                        Err(GovernanceError::AlreadyPaused { .. })
                        | Err(GovernanceError::Terminated(_)) => {
                            warn!(agent_id = %step.to_agent, "cascade target already halted");
                        }
                        Err(GovernanceError::AgentNotFound(id)) => {
                            warn!(agent_id = %id, "cascade target has no control row; skipping");
                        }
                        Err(e) => return Err(e),
                    }
                }
                CascadeAction::Degraded => {
                    degraded.push(step.to_agent);
                    self.events.publish(GovernanceEvent::AgentDegraded {
                        agent_id: step.to_agent,
                        source_agent_id: source,
                        at: Utc::now(),
                    });
                }
                CascadeAction::Notified => {
                    notified.push(step.to_agent);
                    self.events.publish(GovernanceEvent::DependentNotified {
                        agent_id: step.to_agent,
                        source_agent_id: source,
                        at: Utc::now(),
                    });
                }
            }
        }

        let event = CascadeEvent {
            id: Uuid::new_v4(),
            source_agent_id: source,
            source_reason,
            initiator: initiator.clone(),
            agents_halted: halted,
            agents_degraded: degraded,
            agents_notified: notified,
            path: plan.steps,
            started_at,
            duration_ms: timer.elapsed().as_millis() as u64,
        };

        let mut targets = vec![source];
        targets.extend(event.agents_halted.iter().copied());
        targets.extend(event.agents_degraded.iter().copied());
        targets.extend(event.agents_notified.iter().copied());

        self.ledger
            .record(
                TruthEntryDraft::new(TruthEventType::CascadeHalt, initiator.clone())
                    .targets(targets)
                    .reason(source_reason.as_str())
                    .details(serde_json::json!({
                        "cascade_id": event.id,
                        "source_agent_id": event.source_agent_id,
                        "agents_halted": event.agents_halted,
                        "agents_degraded": event.agents_degraded,
                        "agents_notified": event.agents_notified,
                        "path": event.path,
                    })),
            )
            .await?;
        self.ledger
            .record(
                TruthEntryDraft::new(TruthEventType::CascadeComplete, initiator)
                    .targets(vec![source])
                    .details(serde_json::json!({
                        "cascade_id": event.id,
                        "total_affected": event.total_affected(),
                        "duration_ms": event.duration_ms,
                    })),
            )
            .await?;

        info!(
            source = %source,
            halted = event.agents_halted.len(),
            degraded = event.agents_degraded.len(),
            notified = event.agents_notified.len(),
            "cascade halt complete"
        );
        self.events.publish(GovernanceEvent::CascadeCompleted {
            source_agent_id: source,
            agents_halted: event.agents_halted.len(),
            agents_degraded: event.agents_degraded.len(),
            agents_notified: event.agents_notified.len(),
            duration_ms: event.duration_ms,
        });

        Ok(event)
    }

    /// Return a halted agent to `active`, filling `resumed_at` on the latest
    /// pause record exactly once. Dependents that were halted by a cascade
    /// and whose policy sets `auto_resume_with_dependency` come back with it,
    /// once their own dependencies are all active again.
    pub async fn resume(
        &self,
        agent_id: AgentId,
        initiator: Initiator,
        notes: Option<String>,
    ) -> Result<AgentControlState, GovernanceError> {
        let state = self.resume_inner(agent_id, initiator, notes, false).await?;
        self.resume_followers(agent_id).await?;
        Ok(state)
    }

    /// Resume cascade-halted dependents that opted into following their
    /// dependency back up. Breadth-first from the resumed agent; each
    /// follower resumes at most once, so termination holds on any graph.
    async fn resume_followers(&self, root: AgentId) -> Result<Vec<AgentId>, GovernanceError> {
        let mut resumed = Vec::new();
        let mut queue = std::collections::VecDeque::from([root]);

        while let Some(current) = queue.pop_front() {
            for follower in self.graph.auto_resume_followers(current).await? {
                let Some(state) = self.control.find_by_id(follower).await? else {
                    continue;
                };
                // Only pauses the cascade itself created follow the resume;
                // manual pauses stay until an operator clears them.
                let cascade_halted = state.current_state.is_halted()
                    && state
                        .latest_pause()
                        .filter(|r| r.resumed_at.is_none())
                        .map(|r| r.reason == PauseReason::CascadeHalt)
                        .unwrap_or(false);
                if !cascade_halted {
                    continue;
                }
                if !self
                    .graph
                    .can_resume_with_dependencies(follower)
                    .await?
                    .can_resume
                {
                    continue;
                }

                match self
                    .resume_inner(follower, Initiator::system(), None, true)
                    .await
                {
                    Ok(_) => {
                        resumed.push(follower);
                        queue.push_back(follower);
                    }
                    Err(GovernanceError::NotPaused(_))
                    | Err(GovernanceError::Terminated(_))
                    | Err(GovernanceError::InvestigationBlocked(_)) => continue,
                    Err(e) => return Err(e),
                }
            }
        }

        if !resumed.is_empty() {
            info!(root = %root, count = resumed.len(), "dependents auto-resumed with dependency");
        }
        Ok(resumed)
    }

    async fn resume_inner(
        &self,
        agent_id: AgentId,
        initiator: Initiator,
        notes: Option<String>,
        auto: bool,
    ) -> Result<AgentControlState, GovernanceError> {
        let lock = self.agent_lock(agent_id);
        let _guard = lock.lock().await;

        let mut state = self
            .control
            .find_by_id(agent_id)
            .await?
            .ok_or(GovernanceError::AgentNotFound(agent_id))?;

        match state.current_state {
            ControlState::Active => return Err(GovernanceError::NotPaused(agent_id)),
            ControlState::Terminated => return Err(GovernanceError::Terminated(agent_id)),
            ControlState::Paused | ControlState::Suspended => {}
        }

        if state.latest_pause().map(|r| r.reason) == Some(PauseReason::Investigation) {
            return Err(GovernanceError::InvestigationBlocked(agent_id));
        }

        let now = Utc::now();
        let closed = state
            .apply_resume(now)
            .ok_or(GovernanceError::NotPaused(agent_id))?;

        let event_type = if auto {
            TruthEventType::AutoResume
        } else {
            TruthEventType::AgentResume
        };
        self.ledger
            .record(
                TruthEntryDraft::new(event_type, initiator)
                    .targets(vec![agent_id])
                    .details(serde_json::json!({
                        "pause_record_id": closed,
                        "notes": notes,
                    })),
            )
            .await?;

        self.control.save(&state).await?;

        info!(agent_id = %agent_id, auto, "agent resumed");
        self.events.publish(GovernanceEvent::AgentResumed {
            agent_id,
            auto,
            resumed_at: now,
        });

        Ok(state)
    }

    /// One-way transition into `terminated` from any non-terminated state.
    /// Always permitted; there is no recovery path afterwards.
    pub async fn terminate(
        &self,
        agent_id: AgentId,
        reason: PauseReason,
        initiator: Initiator,
    ) -> Result<AgentControlState, GovernanceError> {
        let lock = self.agent_lock(agent_id);
        let _guard = lock.lock().await;

        let mut state = self
            .control
            .find_by_id(agent_id)
            .await?
            .ok_or(GovernanceError::AgentNotFound(agent_id))?;

        if state.current_state.is_terminal() {
            return Err(GovernanceError::Terminated(agent_id));
        }

        let record = PauseRecord {
            id: PauseRecordId::new(),
            agent_id,
            previous_state: state.current_state,
            new_state: ControlState::Terminated,
            reason,
            initiator: initiator.clone(),
            notes: None,
            paused_at: Utc::now(),
            resumed_at: None,
            auto_resume_at: None,
            related_incident_id: None,
        };

        self.ledger
            .record(
                TruthEntryDraft::new(TruthEventType::AgentTerminate, initiator)
                    .targets(vec![agent_id])
                    .reason(reason.as_str())
                    .details(serde_json::json!({
                        "previous_state": record.previous_state,
                    })),
            )
            .await?;

        state.apply_pause(record);
        self.control.save(&state).await?;

        warn!(agent_id = %agent_id, reason = %reason, "agent terminated");
        self.events.publish(GovernanceEvent::AgentTerminated {
            agent_id,
            terminated_at: state.last_state_change,
        });

        Ok(state)
    }

    /// Dispatch gate: allowed only while `active`. Pure query; checked by
    /// every operation-dispatch path before letting an agent act.
    pub async fn can_execute(&self, agent_id: AgentId) -> Result<ExecutionGate, GovernanceError> {
        let state = self
            .control
            .find_by_id(agent_id)
            .await?
            .ok_or(GovernanceError::AgentNotFound(agent_id))?;

        if state.current_state == ControlState::Active {
            return Ok(ExecutionGate::allowed(agent_id));
        }
        Ok(ExecutionGate::blocked(
            agent_id,
            state.current_state,
            state.latest_pause().map(|r| r.reason),
        ))
    }

    /// Full pause history, oldest first.
    pub async fn get_pause_history(
        &self,
        agent_id: AgentId,
    ) -> Result<Vec<PauseRecord>, GovernanceError> {
        let state = self
            .control
            .find_by_id(agent_id)
            .await?
            .ok_or(GovernanceError::AgentNotFound(agent_id))?;
        Ok(state.pause_history)
    }

    /// Control state joined with graph back-references.
    pub async fn control_view(
        &self,
        agent_id: AgentId,
    ) -> Result<AgentControlView, GovernanceError> {
        let state = self
            .control
            .find_by_id(agent_id)
            .await?
            .ok_or(GovernanceError::AgentNotFound(agent_id))?;
        let node = self.graph.node(agent_id).await?;
        let (depends_on, dependent_agents) = node
            .map(|n| (n.depends_on, n.dependent_agents))
            .unwrap_or_default();
        Ok(AgentControlView {
            state,
            depends_on,
            dependent_agents,
        })
    }

    /// Scheduled sweep: resume every agent whose `auto_resume_at` expiry has
    /// passed, as the system initiator. Idempotent and safe to re-run
    /// concurrently with manual resumes; a lost race is simply skipped.
    pub async fn auto_resume_sweep(&self) -> Result<Vec<AgentId>, GovernanceError> {
        let now = Utc::now();
        let mut resumed = Vec::new();

        for state in self.control.list_all().await? {
            if !state.current_state.is_halted() {
                continue;
            }
            let due = state
                .latest_pause()
                .filter(|r| r.resumed_at.is_none())
                .and_then(|r| r.auto_resume_at)
                .map(|t| t <= now)
                .unwrap_or(false);
            if !due {
                continue;
            }

            match self
                .resume_inner(state.agent_id, Initiator::system(), None, true)
                .await
            {
                Ok(_) => {
                    resumed.push(state.agent_id);
                    resumed.extend(self.resume_followers(state.agent_id).await?);
                }
                // Lost a race with a manual resume/terminate, or the pause
                // is investigation-locked; both are fine to skip.
                Err(GovernanceError::NotPaused(_))
                | Err(GovernanceError::Terminated(_))
                | Err(GovernanceError::InvestigationBlocked(_)) => continue,
                Err(e) => return Err(e),
            }
        }

        if !resumed.is_empty() {
            info!(count = resumed.len(), "auto-resume sweep completed");
        }
        Ok(resumed)
    }
}
