// Copyright (c) 2026 Vorion Labs, Inc.
// SPDX-License-Identifier: AGPL-3.0

//! Integration tests for the global kill switch: singleton activation,
//! scoping, exemptions, authorization levels, the dispatch block, and
//! deactivation semantics.

use vorion_governance_core::application::{AgentRegistration, PauseOptions};
use vorion_governance_core::domain::{
    ActivationLevel, AgentId, ControlState, GovernanceError, Initiator, InitiatorKind,
    KillSwitchScope, PauseReason, TruthEventType,
};
use vorion_governance_core::infrastructure::SystemSigner;
use vorion_governance_core::GovernanceCore;

fn core() -> GovernanceCore {
    GovernanceCore::new_in_memory(SystemSigner::from_seed([9u8; 32]))
}

fn council() -> Initiator {
    Initiator::new("council-1", InitiatorKind::Council)
}

async fn register(core: &GovernanceCore, registration: AgentRegistration) -> AgentId {
    let id = AgentId::new();
    core.agent_control.register_agent(id, registration).await.unwrap();
    id
}

async fn register_plain(core: &GovernanceCore) -> AgentId {
    register(core, AgentRegistration::default()).await
}

async fn current_state(core: &GovernanceCore, agent: AgentId) -> ControlState {
    let view = core.agent_control.control_view(agent).await.unwrap();
    view.state.current_state
}

#[tokio::test]
async fn test_activate_all_pauses_every_non_exempt_agent() {
    let core = core();
    let worker_a = register_plain(&core).await;
    let worker_b = register_plain(&core).await;
    let guardian = register(
        &core,
        AgentRegistration {
            kill_switch_exempt: true,
            ..AgentRegistration::default()
        },
    )
    .await;

    let summary = core
        .kill_switch
        .activate(
            KillSwitchScope::All,
            ActivationLevel::Standard,
            "model misbehavior",
            council(),
            None,
        )
        .await
        .unwrap();

    let mut paused = summary.agents_paused.clone();
    paused.sort();
    let mut expected = vec![worker_a, worker_b];
    expected.sort();
    assert_eq!(paused, expected);
    assert_eq!(summary.agents_exempt, vec![guardian]);
    assert_eq!(summary.agents_out_of_scope, 0);

    assert_eq!(current_state(&core, worker_a).await, ControlState::Paused);
    assert_eq!(current_state(&core, guardian).await, ControlState::Active);

    // Emergency pauses carry the emergency_stop reason.
    let history = core.agent_control.get_pause_history(worker_a).await.unwrap();
    assert_eq!(history[0].reason, PauseReason::EmergencyStop);
}

#[tokio::test]
async fn test_second_activation_is_rejected_while_one_is_active() {
    let core = core();
    register_plain(&core).await;

    core.kill_switch
        .activate(KillSwitchScope::All, ActivationLevel::Standard, "first", council(), None)
        .await
        .unwrap();
    let err = core
        .kill_switch
        .activate(KillSwitchScope::All, ActivationLevel::Standard, "second", council(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, GovernanceError::KillSwitchAlreadyActive { .. }));
    assert!(err.is_state_conflict());
}

#[tokio::test]
async fn test_critical_level_requires_authorization_code() {
    let core = core();
    register_plain(&core).await;

    for code in [None, Some(""), Some("   ")] {
        let err = core
            .kill_switch
            .activate(
                KillSwitchScope::All,
                ActivationLevel::Critical,
                "escalation",
                council(),
                code,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GovernanceError::AuthorizationMissing {
                level: ActivationLevel::Critical
            }
        ));
    }

    core.kill_switch
        .activate(
            KillSwitchScope::All,
            ActivationLevel::Critical,
            "escalation",
            council(),
            Some("AUTH-123"),
        )
        .await
        .unwrap();
    assert!(core.kill_switch.active_switch().await.unwrap().is_some());
}

#[tokio::test]
async fn test_lockdown_overrides_exemptions() {
    let core = core();
    let guardian = register(
        &core,
        AgentRegistration {
            kill_switch_exempt: true,
            ..AgentRegistration::default()
        },
    )
    .await;

    let summary = core
        .kill_switch
        .activate(
            KillSwitchScope::All,
            ActivationLevel::Lockdown,
            "full platform lockdown",
            council(),
            Some("AUTH-456"),
        )
        .await
        .unwrap();

    assert_eq!(summary.agents_paused, vec![guardian]);
    assert!(summary.agents_exempt.is_empty());
    assert_eq!(current_state(&core, guardian).await, ControlState::Paused);

    let status = core.kill_switch.is_blocked(guardian).await.unwrap();
    assert!(status.blocked);
}

#[tokio::test]
async fn test_category_scope_only_touches_matching_agents() {
    let core = core();
    let trader = register(
        &core,
        AgentRegistration {
            category: Some("trading".to_string()),
            ..AgentRegistration::default()
        },
    )
    .await;
    let support = register(
        &core,
        AgentRegistration {
            category: Some("support".to_string()),
            ..AgentRegistration::default()
        },
    )
    .await;
    let uncategorized = register_plain(&core).await;

    let summary = core
        .kill_switch
        .activate(
            KillSwitchScope::Category {
                category: "trading".to_string(),
            },
            ActivationLevel::Standard,
            "trading halt",
            council(),
            None,
        )
        .await
        .unwrap();

    assert_eq!(summary.agents_paused, vec![trader]);
    assert_eq!(summary.agents_out_of_scope, 2);
    assert_eq!(current_state(&core, support).await, ControlState::Active);
    assert_eq!(current_state(&core, uncategorized).await, ControlState::Active);

    assert!(core.kill_switch.is_blocked(trader).await.unwrap().blocked);
    assert!(!core.kill_switch.is_blocked(support).await.unwrap().blocked);
}

#[tokio::test]
async fn test_already_halted_agents_are_counted_not_paused_again() {
    let core = core();
    let agent = register_plain(&core).await;
    core.agent_control
        .pause(
            agent,
            PauseReason::Investigation,
            council(),
            PauseOptions::default(),
        )
        .await
        .unwrap();

    let summary = core
        .kill_switch
        .activate(KillSwitchScope::All, ActivationLevel::Standard, "stop", council(), None)
        .await
        .unwrap();

    assert!(summary.agents_paused.is_empty());
    assert_eq!(summary.agents_already_halted, vec![agent]);

    // The earlier pause record is untouched.
    let history = core.agent_control.get_pause_history(agent).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].reason, PauseReason::Investigation);
}

#[tokio::test]
async fn test_deactivate_clears_the_block_but_resumes_nobody() {
    let core = core();
    let agent = register_plain(&core).await;

    core.kill_switch
        .activate(KillSwitchScope::All, ActivationLevel::Standard, "stop", council(), None)
        .await
        .unwrap();
    assert!(core.kill_switch.is_blocked(agent).await.unwrap().blocked);

    let switch = core
        .kill_switch
        .deactivate(council(), Some("threat cleared".to_string()))
        .await
        .unwrap();
    assert!(!switch.active);
    assert!(switch.deactivated_at.is_some());

    // Block lifted, but the agent stays paused until explicitly resumed.
    assert!(!core.kill_switch.is_blocked(agent).await.unwrap().blocked);
    assert_eq!(current_state(&core, agent).await, ControlState::Paused);
    assert!(core.kill_switch.active_switch().await.unwrap().is_none());

    // A fresh activation is allowed again after deactivation.
    core.kill_switch
        .activate(KillSwitchScope::All, ActivationLevel::Standard, "again", council(), None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_deactivate_without_active_switch_fails() {
    let core = core();
    let err = core.kill_switch.deactivate(council(), None).await.unwrap_err();
    assert!(matches!(err, GovernanceError::KillSwitchNotActive));
}

#[tokio::test]
async fn test_authorization_code_never_reaches_the_ledger() {
    let core = core();
    register_plain(&core).await;

    core.kill_switch
        .activate(
            KillSwitchScope::All,
            ActivationLevel::Critical,
            "escalation",
            council(),
            Some("SECRET-CODE-789"),
        )
        .await
        .unwrap();

    let entries = core.truth_chain.entries_from(1).await.unwrap();
    let activation = entries
        .iter()
        .find(|e| e.event_type == TruthEventType::KillSwitchActivate)
        .unwrap();
    assert_eq!(
        activation.details["authorization_code"],
        serde_json::json!("[redacted]")
    );
    let serialized = serde_json::to_string(&entries).unwrap();
    assert!(!serialized.contains("SECRET-CODE-789"));
}

#[tokio::test]
async fn test_activation_and_deactivation_are_chained_in_the_ledger() {
    let core = core();
    register_plain(&core).await;

    core.kill_switch
        .activate(KillSwitchScope::All, ActivationLevel::Standard, "stop", council(), None)
        .await
        .unwrap();
    core.kill_switch.deactivate(council(), None).await.unwrap();

    let entries = core.truth_chain.entries_from(1).await.unwrap();
    let types: Vec<TruthEventType> = entries.iter().map(|e| e.event_type).collect();
    assert!(types.contains(&TruthEventType::AgentPause));
    assert!(types.contains(&TruthEventType::KillSwitchActivate));
    assert!(types.contains(&TruthEventType::KillSwitchDeactivate));
    assert!(core.truth_chain.verify_integrity().await.unwrap().valid);
}
