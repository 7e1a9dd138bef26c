// Copyright (c) 2026 Vorion Labs, Inc.
// SPDX-License-Identifier: AGPL-3.0
//! Application services implementing the governance operation set.

pub mod agent_control;
pub mod dependency;
pub mod kill_switch;
pub mod truth_chain;

pub use agent_control::{
    AgentControlService, AgentControlView, AgentRegistration, PauseOptions, PauseOutcome,
};
pub use dependency::{CascadePlan, DependencyGraphService};
pub use kill_switch::KillSwitchService;
pub use truth_chain::TruthChainService;

use std::sync::Arc;

use crate::config::GovernanceConfig;
use crate::infrastructure::event_bus::EventBus;
use crate::infrastructure::repositories::{
    InMemoryAgentControlRepository, InMemoryDependencyGraphRepository,
    InMemoryKillSwitchRepository, InMemoryTruthChainRepository,
};
use crate::infrastructure::signer::SystemSigner;

/// Fully wired governance core over in-memory storage. Production
/// deployments construct the services individually against durable
/// repositories; this wiring is used by tests, tooling, and development.
pub struct GovernanceCore {
    pub agent_control: Arc<AgentControlService>,
    pub dependencies: Arc<DependencyGraphService>,
    pub kill_switch: Arc<KillSwitchService>,
    pub truth_chain: Arc<TruthChainService>,
    pub events: EventBus,
}

impl GovernanceCore {
    pub fn new_in_memory(signer: SystemSigner) -> Self {
        Self::with_config(signer, &GovernanceConfig::default())
    }

    pub fn with_config(signer: SystemSigner, config: &GovernanceConfig) -> Self {
        let control_repo = Arc::new(InMemoryAgentControlRepository::new());
        let graph_repo = Arc::new(InMemoryDependencyGraphRepository::new());
        let switch_repo = Arc::new(InMemoryKillSwitchRepository::new());
        let chain_repo = Arc::new(InMemoryTruthChainRepository::new());
        let events = EventBus::new(config.event_bus_capacity);

        let truth_chain = Arc::new(TruthChainService::new(chain_repo, Arc::new(signer)));
        let dependencies = Arc::new(DependencyGraphService::new(
            graph_repo,
            control_repo.clone(),
            truth_chain.clone(),
            config.default_cascade_policy.clone(),
        ));
        let agent_control = Arc::new(AgentControlService::new(
            control_repo.clone(),
            dependencies.clone(),
            truth_chain.clone(),
            events.clone(),
        ));
        let kill_switch = Arc::new(KillSwitchService::new(
            switch_repo,
            control_repo,
            agent_control.clone(),
            truth_chain.clone(),
            events.clone(),
        ));

        Self {
            agent_control,
            dependencies,
            kill_switch,
            truth_chain,
            events,
        }
    }
}
