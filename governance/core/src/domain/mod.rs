// Copyright (c) 2026 Vorion Labs, Inc.
// SPDX-License-Identifier: AGPL-3.0

pub mod agent_control;
pub mod dependency;
pub mod error;
pub mod kill_switch;
pub mod repository;
pub mod truth_chain;

pub use agent_control::{
    AgentControlState, AgentId, ControlState, ExecutionGate, Initiator, InitiatorKind,
    PauseReason, PauseRecord, PauseRecordId,
};
pub use dependency::{
    CascadeAction, CascadeEvent, CascadePolicy, CascadeStep, DependencyNode, DependencyPauseAction,
    DependencyReadiness, ResumeOrder, SelfPauseAction,
};
pub use error::GovernanceError;
pub use kill_switch::{
    ActivationLevel, ActivationSummary, BlockStatus, KillSwitchScope, KillSwitchState,
};
pub use repository::{
    AgentControlRepository, DependencyGraphRepository, KillSwitchRepository, RepositoryError,
    TruthChainRepository,
};
pub use truth_chain::{
    ChainExport, ChainVerification, TruthChainEntry, TruthEntryDraft, TruthEventType, GENESIS_HASH,
};
