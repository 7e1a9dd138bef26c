// Copyright (c) 2026 Vorion Labs, Inc.
// SPDX-License-Identifier: AGPL-3.0
//! In-memory repository implementations.
//!
//! Used for development and testing; a durable backend (per-agent row
//! storage, an edge table, a singleton switch row, an append-only ledger
//! table) plugs in behind the same traits for production. The in-memory
//! truth chain enforces the same append-only discipline a production store
//! must: heights are assigned strictly sequentially and nothing is ever
//! rewritten.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::agent_control::{AgentControlState, AgentId};
use crate::domain::dependency::DependencyNode;
use crate::domain::kill_switch::KillSwitchState;
use crate::domain::repository::{
    AgentControlRepository, DependencyGraphRepository, KillSwitchRepository, RepositoryError,
    TruthChainRepository,
};
use crate::domain::truth_chain::TruthChainEntry;

#[derive(Clone, Default)]
pub struct InMemoryAgentControlRepository {
    states: Arc<RwLock<HashMap<AgentId, AgentControlState>>>,
}

impl InMemoryAgentControlRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AgentControlRepository for InMemoryAgentControlRepository {
    async fn save(&self, state: &AgentControlState) -> Result<(), RepositoryError> {
        self.states.write().insert(state.agent_id, state.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: AgentId) -> Result<Option<AgentControlState>, RepositoryError> {
        Ok(self.states.read().get(&id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<AgentControlState>, RepositoryError> {
        let mut all: Vec<AgentControlState> = self.states.read().values().cloned().collect();
        all.sort_by_key(|s| s.agent_id);
        Ok(all)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryDependencyGraphRepository {
    nodes: Arc<RwLock<HashMap<AgentId, DependencyNode>>>,
}

impl InMemoryDependencyGraphRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DependencyGraphRepository for InMemoryDependencyGraphRepository {
    async fn upsert(&self, node: &DependencyNode) -> Result<(), RepositoryError> {
        self.nodes.write().insert(node.agent_id, node.clone());
        Ok(())
    }

    async fn find(&self, id: AgentId) -> Result<Option<DependencyNode>, RepositoryError> {
        Ok(self.nodes.read().get(&id).cloned())
    }

    async fn snapshot(&self) -> Result<HashMap<AgentId, DependencyNode>, RepositoryError> {
        Ok(self.nodes.read().clone())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryKillSwitchRepository {
    records: Arc<RwLock<Vec<KillSwitchState>>>,
}

impl InMemoryKillSwitchRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KillSwitchRepository for InMemoryKillSwitchRepository {
    async fn save(&self, state: &KillSwitchState) -> Result<(), RepositoryError> {
        let mut records = self.records.write();
        if state.active && records.iter().any(|r| r.active && r.id != state.id) {
            return Err(RepositoryError::Storage(
                "another kill switch record is already active".to_string(),
            ));
        }
        if let Some(existing) = records.iter_mut().find(|r| r.id == state.id) {
            *existing = state.clone();
        } else {
            records.push(state.clone());
        }
        Ok(())
    }

    async fn find_active(&self) -> Result<Option<KillSwitchState>, RepositoryError> {
        Ok(self.records.read().iter().find(|r| r.active).cloned())
    }

    async fn history(&self) -> Result<Vec<KillSwitchState>, RepositoryError> {
        Ok(self.records.read().clone())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryTruthChainRepository {
    entries: Arc<RwLock<Vec<TruthChainEntry>>>,
}

impl InMemoryTruthChainRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TruthChainRepository for InMemoryTruthChainRepository {
    async fn append(&self, entry: &TruthChainEntry) -> Result<(), RepositoryError> {
        let mut entries = self.entries.write();
        let expected = entries.len() as u64 + 1;
        if entry.block_height != expected {
            return Err(RepositoryError::AppendConflict(format!(
                "expected block height {expected}, got {}",
                entry.block_height
            )));
        }
        entries.push(entry.clone());
        Ok(())
    }

    async fn latest(&self) -> Result<Option<TruthChainEntry>, RepositoryError> {
        Ok(self.entries.read().last().cloned())
    }

    async fn find_by_height(
        &self,
        height: u64,
    ) -> Result<Option<TruthChainEntry>, RepositoryError> {
        if height == 0 {
            return Ok(None);
        }
        Ok(self.entries.read().get(height as usize - 1).cloned())
    }

    async fn list_from(&self, from: u64) -> Result<Vec<TruthChainEntry>, RepositoryError> {
        let entries = self.entries.read();
        let skip = from.saturating_sub(1) as usize;
        Ok(entries.iter().skip(skip).cloned().collect())
    }

    async fn len(&self) -> Result<u64, RepositoryError> {
        Ok(self.entries.read().len() as u64)
    }
}
