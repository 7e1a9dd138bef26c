// Copyright (c) 2026 Vorion Labs, Inc.
// SPDX-License-Identifier: AGPL-3.0

//! Integration tests for the agent control state machine: pause/resume
//! round trips, the absorbing terminated state, investigation locks, the
//! dispatch gate, and the auto-resume sweep.

use chrono::{Duration, Utc};
use vorion_governance_core::application::{AgentRegistration, PauseOptions};
use vorion_governance_core::domain::{
    AgentId, ControlState, GovernanceError, Initiator, InitiatorKind, PauseReason, TruthEventType,
};
use vorion_governance_core::infrastructure::SystemSigner;
use vorion_governance_core::GovernanceCore;

fn core() -> GovernanceCore {
    GovernanceCore::new_in_memory(SystemSigner::from_seed([42u8; 32]))
}

fn admin() -> Initiator {
    Initiator::new("ops-1", InitiatorKind::Admin)
}

async fn register_agent(core: &GovernanceCore) -> AgentId {
    let id = AgentId::new();
    core.agent_control
        .register_agent(id, AgentRegistration::default())
        .await
        .unwrap();
    id
}

#[tokio::test]
async fn test_pause_transitions_to_paused_and_blocks_execution() {
    let core = core();
    let agent = register_agent(&core).await;

    let outcome = core
        .agent_control
        .pause(agent, PauseReason::Maintenance, admin(), PauseOptions::default())
        .await
        .unwrap();
    assert_eq!(outcome.record.previous_state, ControlState::Active);
    assert_eq!(outcome.record.new_state, ControlState::Paused);
    assert!(outcome.cascade.is_none());

    let gate = core.agent_control.can_execute(agent).await.unwrap();
    assert!(!gate.allowed);
    assert_eq!(gate.blocking_state, Some(ControlState::Paused));
    assert_eq!(gate.blocking_reason, Some(PauseReason::Maintenance));
}

#[tokio::test]
async fn test_security_incident_suspends_instead_of_pausing() {
    let core = core();
    let agent = register_agent(&core).await;

    core.agent_control
        .pause(agent, PauseReason::SecurityIncident, admin(), PauseOptions::default())
        .await
        .unwrap();

    let gate = core.agent_control.can_execute(agent).await.unwrap();
    assert_eq!(gate.blocking_state, Some(ControlState::Suspended));
}

#[tokio::test]
async fn test_double_pause_is_a_state_conflict() {
    let core = core();
    let agent = register_agent(&core).await;

    core.agent_control
        .pause(agent, PauseReason::Investigation, admin(), PauseOptions::default())
        .await
        .unwrap();
    let err = core
        .agent_control
        .pause(agent, PauseReason::Maintenance, admin(), PauseOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, GovernanceError::AlreadyPaused { .. }));
    assert!(err.is_state_conflict());
}

#[tokio::test]
async fn test_resume_round_trip_sets_resumed_at_exactly_once() {
    let core = core();
    let agent = register_agent(&core).await;

    core.agent_control
        .pause(agent, PauseReason::ConsumerRequest, admin(), PauseOptions::default())
        .await
        .unwrap();
    let state = core
        .agent_control
        .resume(agent, admin(), Some("all clear".to_string()))
        .await
        .unwrap();
    assert_eq!(state.current_state, ControlState::Active);

    let history = core.agent_control.get_pause_history(agent).await.unwrap();
    assert_eq!(history.len(), 1);
    assert!(history[0].resumed_at.is_some());

    // Double resume fails with a state conflict.
    let err = core.agent_control.resume(agent, admin(), None).await.unwrap_err();
    assert!(matches!(err, GovernanceError::NotPaused(_)));
    assert!(err.is_state_conflict());
}

#[tokio::test]
async fn test_investigation_pause_blocks_resume() {
    let core = core();
    let agent = register_agent(&core).await;

    core.agent_control
        .pause(agent, PauseReason::Investigation, admin(), PauseOptions::default())
        .await
        .unwrap();
    let err = core.agent_control.resume(agent, admin(), None).await.unwrap_err();
    assert!(matches!(err, GovernanceError::InvestigationBlocked(_)));
}

#[tokio::test]
async fn test_terminated_is_absorbing() {
    let core = core();
    let agent = register_agent(&core).await;

    core.agent_control
        .terminate(agent, PauseReason::SecurityIncident, admin())
        .await
        .unwrap();

    // No transition leaves terminated.
    assert!(matches!(
        core.agent_control
            .pause(agent, PauseReason::Maintenance, admin(), PauseOptions::default())
            .await
            .unwrap_err(),
        GovernanceError::Terminated(_)
    ));
    assert!(matches!(
        core.agent_control.resume(agent, admin(), None).await.unwrap_err(),
        GovernanceError::Terminated(_)
    ));
    assert!(matches!(
        core.agent_control
            .terminate(agent, PauseReason::Other, admin())
            .await
            .unwrap_err(),
        GovernanceError::Terminated(_)
    ));

    let gate = core.agent_control.can_execute(agent).await.unwrap();
    assert!(!gate.allowed);
    assert_eq!(gate.blocking_state, Some(ControlState::Terminated));
}

#[tokio::test]
async fn test_terminate_allowed_from_paused_state() {
    let core = core();
    let agent = register_agent(&core).await;

    core.agent_control
        .pause(agent, PauseReason::CircuitBreaker, admin(), PauseOptions::default())
        .await
        .unwrap();
    let state = core
        .agent_control
        .terminate(agent, PauseReason::SecurityIncident, admin())
        .await
        .unwrap();
    assert_eq!(state.current_state, ControlState::Terminated);

    let history = core.agent_control.get_pause_history(agent).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].previous_state, ControlState::Paused);
    assert_eq!(history[1].new_state, ControlState::Terminated);
}

#[tokio::test]
async fn test_unknown_agent_is_rejected() {
    let core = core();
    let err = core
        .agent_control
        .pause(AgentId::new(), PauseReason::Other, admin(), PauseOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, GovernanceError::AgentNotFound(_)));
}

#[tokio::test]
async fn test_auto_resume_sweep_resumes_expired_pauses_only() {
    let core = core();
    let due = register_agent(&core).await;
    let not_due = register_agent(&core).await;
    let locked = register_agent(&core).await;

    core.agent_control
        .pause(
            due,
            PauseReason::Maintenance,
            admin(),
            PauseOptions {
                auto_resume_at: Some(Utc::now() - Duration::seconds(5)),
                ..PauseOptions::default()
            },
        )
        .await
        .unwrap();
    core.agent_control
        .pause(
            not_due,
            PauseReason::Maintenance,
            admin(),
            PauseOptions {
                auto_resume_at: Some(Utc::now() + Duration::hours(1)),
                ..PauseOptions::default()
            },
        )
        .await
        .unwrap();
    core.agent_control
        .pause(
            locked,
            PauseReason::Investigation,
            admin(),
            PauseOptions {
                auto_resume_at: Some(Utc::now() - Duration::seconds(5)),
                ..PauseOptions::default()
            },
        )
        .await
        .unwrap();

    let resumed = core.agent_control.auto_resume_sweep().await.unwrap();
    assert_eq!(resumed, vec![due]);

    assert!(core.agent_control.can_execute(due).await.unwrap().allowed);
    assert!(!core.agent_control.can_execute(not_due).await.unwrap().allowed);
    assert!(!core.agent_control.can_execute(locked).await.unwrap().allowed);

    // Re-running the sweep is idempotent.
    assert!(core.agent_control.auto_resume_sweep().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_auto_resume_writes_auto_resume_ledger_entry() {
    let core = core();
    let agent = register_agent(&core).await;

    core.agent_control
        .pause(
            agent,
            PauseReason::Maintenance,
            admin(),
            PauseOptions {
                auto_resume_at: Some(Utc::now() - Duration::seconds(1)),
                ..PauseOptions::default()
            },
        )
        .await
        .unwrap();
    core.agent_control.auto_resume_sweep().await.unwrap();

    let entries = core.truth_chain.entries_from(1).await.unwrap();
    let types: Vec<TruthEventType> = entries.iter().map(|e| e.event_type).collect();
    assert!(types.contains(&TruthEventType::AgentPause));
    assert!(types.contains(&TruthEventType::AutoResume));

    let auto = entries
        .iter()
        .find(|e| e.event_type == TruthEventType::AutoResume)
        .unwrap();
    assert_eq!(auto.initiator.kind, InitiatorKind::System);
}

#[tokio::test]
async fn test_every_transition_writes_through_to_the_ledger() {
    let core = core();
    let agent = register_agent(&core).await;

    core.agent_control
        .pause(agent, PauseReason::Maintenance, admin(), PauseOptions::default())
        .await
        .unwrap();
    core.agent_control.resume(agent, admin(), None).await.unwrap();
    core.agent_control
        .terminate(agent, PauseReason::Other, admin())
        .await
        .unwrap();

    let entries = core.truth_chain.entries_from(1).await.unwrap();
    let types: Vec<TruthEventType> = entries.iter().map(|e| e.event_type).collect();
    assert_eq!(
        types,
        vec![
            TruthEventType::AgentPause,
            TruthEventType::AgentResume,
            TruthEventType::AgentTerminate,
        ]
    );
    assert!(entries.iter().all(|e| e.target_agents == vec![agent]));

    let verification = core.truth_chain.verify_integrity().await.unwrap();
    assert!(verification.valid);
}
