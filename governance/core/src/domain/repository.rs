// Copyright (c) 2026 Vorion Labs, Inc.
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces
//!
//! Persistence contracts for each aggregate root, following the DDD
//! Repository pattern: one repository per aggregate, interface defined in
//! the domain layer, implemented in `crate::infrastructure::repositories`.
//!
//! | Trait | Aggregate | Guarantee required |
//! |-------|-----------|--------------------|
//! | `AgentControlRepository` | `AgentControlState` | transactional row storage |
//! | `DependencyGraphRepository` | `DependencyNode` | consistent snapshot reads |
//! | `KillSwitchRepository` | `KillSwitchState` | singleton-active row |
//! | `TruthChainRepository` | `TruthChainEntry` | append-only, no update/delete |
//!
//! The truth-chain store must never permit in-place update or deletion of a
//! written row; implementations reject out-of-order heights.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::domain::agent_control::{AgentControlState, AgentId};
use crate::domain::dependency::DependencyNode;
use crate::domain::kill_switch::KillSwitchState;
use crate::domain::truth_chain::TruthChainEntry;

/// Repository interface for per-agent control state (pause history included
/// in the aggregate).
#[async_trait]
pub trait AgentControlRepository: Send + Sync {
    /// Save control state (create or update).
    async fn save(&self, state: &AgentControlState) -> Result<(), RepositoryError>;

    /// Find control state by agent id.
    async fn find_by_id(&self, id: AgentId) -> Result<Option<AgentControlState>, RepositoryError>;

    /// List every registered agent's control state.
    async fn list_all(&self) -> Result<Vec<AgentControlState>, RepositoryError>;
}

/// Repository interface for dependency graph nodes.
#[async_trait]
pub trait DependencyGraphRepository: Send + Sync {
    /// Insert or replace a node.
    async fn upsert(&self, node: &DependencyNode) -> Result<(), RepositoryError>;

    /// Find a node by agent id.
    async fn find(&self, id: AgentId) -> Result<Option<DependencyNode>, RepositoryError>;

    /// Consistent point-in-time snapshot of the whole graph, used for the
    /// duration of one cascade traversal.
    async fn snapshot(&self) -> Result<HashMap<AgentId, DependencyNode>, RepositoryError>;
}

/// Repository interface for the kill-switch singleton record.
#[async_trait]
pub trait KillSwitchRepository: Send + Sync {
    /// Save switch state (create or update).
    async fn save(&self, state: &KillSwitchState) -> Result<(), RepositoryError>;

    /// The currently active switch, if any. At most one may exist.
    async fn find_active(&self) -> Result<Option<KillSwitchState>, RepositoryError>;

    /// All switch records, newest last.
    async fn history(&self) -> Result<Vec<KillSwitchState>, RepositoryError>;
}

/// Repository interface for the append-only truth chain. No update or
/// delete operations exist by construction.
#[async_trait]
pub trait TruthChainRepository: Send + Sync {
    /// Append one entry. Implementations must reject an entry whose height
    /// is not exactly `latest height + 1` (or 1 for an empty chain).
    async fn append(&self, entry: &TruthChainEntry) -> Result<(), RepositoryError>;

    /// The highest entry, if any.
    async fn latest(&self) -> Result<Option<TruthChainEntry>, RepositoryError>;

    /// Entry at an exact block height.
    async fn find_by_height(&self, height: u64) -> Result<Option<TruthChainEntry>, RepositoryError>;

    /// Entries with `block_height >= from`, ascending.
    async fn list_from(&self, from: u64) -> Result<Vec<TruthChainEntry>, RepositoryError>;

    /// Number of entries in the chain.
    async fn len(&self) -> Result<u64, RepositoryError>;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Append conflict: {0}")]
    AppendConflict(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}
