// Copyright (c) 2026 Vorion Labs, Inc.
// SPDX-License-Identifier: AGPL-3.0

pub mod event_bus;
pub mod repositories;
pub mod signer;

pub use event_bus::{EventBus, GovernanceEvent};
pub use repositories::{
    InMemoryAgentControlRepository, InMemoryDependencyGraphRepository,
    InMemoryKillSwitchRepository, InMemoryTruthChainRepository,
};
pub use signer::{verify_hex_signature, SystemSigner};
