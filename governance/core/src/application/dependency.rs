// Copyright (c) 2026 Vorion Labs, Inc.
// SPDX-License-Identifier: AGPL-3.0
//! # Dependency Graph Service
//!
//! Owns edge registration (with bidirectional consistency), cascade
//! traversal planning, resume ordering, and dependency-readiness queries.
//!
//! Traversal is explicitly iterative — a queue plus a visited set — so
//! adversarial graphs cannot grow the call stack, and the visited set
//! guarantees termination on any cycle even if the graph is re-registered
//! concurrently: one cascade plans against one snapshot.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::agent_control::{AgentId, ControlState, Initiator};
use crate::domain::dependency::{
    CascadeAction, CascadePolicy, CascadeStep, DependencyNode, DependencyPauseAction,
    DependencyReadiness, ResumeOrder, SelfPauseAction,
};
use crate::domain::error::GovernanceError;
use crate::domain::repository::{AgentControlRepository, DependencyGraphRepository};
use crate::domain::truth_chain::{TruthEntryDraft, TruthEventType};
use crate::application::truth_chain::TruthChainService;

/// Planned (not yet applied) outcome of one cascade traversal.
#[derive(Debug, Clone, Default)]
pub struct CascadePlan {
    pub steps: Vec<CascadeStep>,
}

impl CascadePlan {
    pub fn targets_with(&self, action: CascadeAction) -> Vec<AgentId> {
        self.steps
            .iter()
            .filter(|s| s.action == action)
            .map(|s| s.to_agent)
            .collect()
    }
}

pub struct DependencyGraphService {
    graph: Arc<dyn DependencyGraphRepository>,
    control: Arc<dyn AgentControlRepository>,
    ledger: Arc<TruthChainService>,
    /// Applied to nodes registered without an explicit policy.
    default_policy: CascadePolicy,
}

impl DependencyGraphService {
    pub fn new(
        graph: Arc<dyn DependencyGraphRepository>,
        control: Arc<dyn AgentControlRepository>,
        ledger: Arc<TruthChainService>,
        default_policy: CascadePolicy,
    ) -> Self {
        Self {
            graph,
            control,
            ledger,
            default_policy,
        }
    }

    /// Insert or update a node. Re-registration replaces the dependency
    /// list, and the inverse `dependent_agents` sets of every affected node
    /// are adjusted so both edge sets stay consistent.
    pub async fn register_dependencies(
        &self,
        agent_id: AgentId,
        depends_on: Vec<AgentId>,
        policy: Option<CascadePolicy>,
        initiator: Initiator,
    ) -> Result<DependencyNode, GovernanceError> {
        let mut depends_on: Vec<AgentId> = depends_on
            .into_iter()
            .filter(|id| *id != agent_id)
            .collect();
        depends_on.sort();
        depends_on.dedup();

        let existing = self.graph.find(agent_id).await?;
        let old_deps: HashSet<AgentId> = existing
            .as_ref()
            .map(|n| n.depends_on.iter().copied().collect())
            .unwrap_or_default();
        let new_deps: HashSet<AgentId> = depends_on.iter().copied().collect();

        // Drop this agent from the inverse set of dependencies it no longer has.
        for removed in old_deps.difference(&new_deps) {
            if let Some(mut node) = self.graph.find(*removed).await? {
                node.dependent_agents.retain(|d| *d != agent_id);
                self.graph.upsert(&node).await?;
            }
        }

        // Add it to the inverse set of each new dependency, creating missing
        // nodes with the default policy.
        for added in new_deps.difference(&old_deps) {
            let mut node = match self.graph.find(*added).await? {
                Some(node) => node,
                None => DependencyNode {
                    policy: self.default_policy.clone(),
                    ..DependencyNode::new(*added)
                },
            };
            if !node.dependent_agents.contains(&agent_id) {
                node.dependent_agents.push(agent_id);
                node.dependent_agents.sort();
            }
            self.graph.upsert(&node).await?;
        }

        let node = DependencyNode {
            agent_id,
            depends_on: depends_on.clone(),
            dependent_agents: existing
                .map(|n| n.dependent_agents)
                .unwrap_or_default(),
            policy: policy.unwrap_or_else(|| self.default_policy.clone()),
        };
        self.graph.upsert(&node).await?;

        self.ledger
            .record(
                TruthEntryDraft::new(TruthEventType::DependencyRegister, initiator)
                    .targets(vec![agent_id])
                    .details(serde_json::json!({
                        "depends_on": depends_on,
                        "dependency_count": depends_on.len(),
                    })),
            )
            .await?;

        info!(agent_id = %agent_id, dependencies = depends_on.len(), "dependencies registered");
        Ok(node)
    }

    pub async fn node(&self, agent_id: AgentId) -> Result<Option<DependencyNode>, GovernanceError> {
        Ok(self.graph.find(agent_id).await?)
    }

    /// Plan a cascade from `source` against a consistent graph snapshot.
    ///
    /// The source's own `on_self_pause` policy gates the whole cascade:
    /// `ignore` plans nothing, `notify_only` notifies direct dependents at
    /// depth 1, and `halt_dependents` runs the bounded traversal where each
    /// *dependent's* `on_dependency_pause` policy decides its action.
    pub async fn plan_cascade(&self, source: AgentId) -> Result<CascadePlan, GovernanceError> {
        let snapshot = self.graph.snapshot().await?;
        let Some(source_node) = snapshot.get(&source) else {
            return Ok(CascadePlan::default());
        };

        match source_node.policy.on_self_pause {
            SelfPauseAction::Ignore => Ok(CascadePlan::default()),
            SelfPauseAction::NotifyOnly => {
                let mut dependents = source_node.dependent_agents.clone();
                dependents.sort();
                let steps = dependents
                    .into_iter()
                    .map(|to_agent| CascadeStep {
                        from_agent: source,
                        to_agent,
                        depth: 1,
                        action: CascadeAction::Notified,
                    })
                    .collect();
                Ok(CascadePlan { steps })
            }
            SelfPauseAction::HaltDependents => Ok(Self::traverse(&snapshot, source)),
        }
    }

    fn traverse(snapshot: &HashMap<AgentId, DependencyNode>, source: AgentId) -> CascadePlan {
        let mut steps = Vec::new();
        let mut visited: HashSet<AgentId> = HashSet::from([source]);
        let mut queue: VecDeque<(AgentId, u32)> = VecDeque::from([(source, 0)]);

        while let Some((current, depth)) = queue.pop_front() {
            let Some(node) = snapshot.get(&current) else {
                continue;
            };
            // Each visited node bounds propagation through itself.
            if depth >= node.policy.max_cascade_depth {
                warn!(
                    agent_id = %current,
                    depth,
                    "cascade depth limit reached; not propagating further"
                );
                continue;
            }

            let mut dependents = node.dependent_agents.clone();
            dependents.sort();
            for dependent in dependents {
                if !visited.insert(dependent) {
                    continue;
                }
                let dependent_policy = snapshot
                    .get(&dependent)
                    .map(|n| n.policy.clone())
                    .unwrap_or_default();

                let action = match dependent_policy.on_dependency_pause {
                    DependencyPauseAction::Halt => {
                        queue.push_back((dependent, depth + 1));
                        CascadeAction::Halted
                    }
                    DependencyPauseAction::Degrade => {
                        queue.push_back((dependent, depth + 1));
                        CascadeAction::Degraded
                    }
                    DependencyPauseAction::Continue => CascadeAction::Notified,
                };
                steps.push(CascadeStep {
                    from_agent: current,
                    to_agent: dependent,
                    depth: depth + 1,
                    action,
                });
            }
        }

        CascadePlan { steps }
    }

    /// Topological resume ordering over the given set. Agents whose in-set
    /// dependencies are all already ordered come first; dependencies outside
    /// the set are ignored. Cycles never fail the operation: remaining
    /// members are appended in deterministic (sorted) order and flagged via
    /// `cycle_detected` so operators can see the configuration is circular.
    pub async fn get_resume_order(
        &self,
        agent_ids: Vec<AgentId>,
    ) -> Result<ResumeOrder, GovernanceError> {
        let in_scope: BTreeSet<AgentId> = agent_ids.into_iter().collect();
        let snapshot = self.graph.snapshot().await?;

        let mut order: Vec<AgentId> = Vec::with_capacity(in_scope.len());
        let mut placed: HashSet<AgentId> = HashSet::new();

        loop {
            let ready: Vec<AgentId> = in_scope
                .iter()
                .filter(|id| !placed.contains(id))
                .filter(|id| {
                    snapshot
                        .get(id)
                        .map(|node| {
                            node.depends_on
                                .iter()
                                .filter(|d| in_scope.contains(d))
                                .all(|d| placed.contains(d))
                        })
                        .unwrap_or(true)
                })
                .copied()
                .collect();

            if ready.is_empty() {
                break;
            }
            for id in ready {
                placed.insert(id);
                order.push(id);
            }
        }

        let cycle_members: Vec<AgentId> = in_scope
            .iter()
            .filter(|id| !placed.contains(id))
            .copied()
            .collect();
        let cycle_detected = !cycle_members.is_empty();
        if cycle_detected {
            warn!(
                members = cycle_members.len(),
                "circular dependency detected; appending remaining agents in deterministic order"
            );
            order.extend(cycle_members.iter().copied());
        }

        Ok(ResumeOrder {
            order,
            cycle_detected,
            cycle_members,
        })
    }

    /// Direct dependents of `agent_id` whose policy opts into resuming
    /// together with their dependency.
    pub async fn auto_resume_followers(
        &self,
        agent_id: AgentId,
    ) -> Result<Vec<AgentId>, GovernanceError> {
        let Some(node) = self.graph.find(agent_id).await? else {
            return Ok(Vec::new());
        };

        let mut followers = Vec::new();
        for dependent in node.dependent_agents {
            if let Some(dependent_node) = self.graph.find(dependent).await? {
                if dependent_node.policy.auto_resume_with_dependency {
                    followers.push(dependent);
                }
            }
        }
        followers.sort();
        Ok(followers)
    }

    /// Blocks a resume while any direct dependency is not `active`. A
    /// dependency with no control row cannot be confirmed active and counts
    /// as blocking.
    pub async fn can_resume_with_dependencies(
        &self,
        agent_id: AgentId,
    ) -> Result<DependencyReadiness, GovernanceError> {
        let depends_on = self
            .graph
            .find(agent_id)
            .await?
            .map(|n| n.depends_on)
            .unwrap_or_default();

        let mut blocking = Vec::new();
        for dep in depends_on {
            match self.control.find_by_id(dep).await? {
                Some(state) if state.current_state == ControlState::Active => {}
                _ => blocking.push(dep),
            }
        }
        blocking.sort();

        Ok(DependencyReadiness {
            agent_id,
            can_resume: blocking.is_empty(),
            blocking_dependencies: blocking,
        })
    }
}
