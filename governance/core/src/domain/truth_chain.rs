// Copyright (c) 2026 Vorion Labs, Inc.
// SPDX-License-Identifier: AGPL-3.0
//! # Truth Chain Ledger Types
//!
//! Append-only, hash-linked record of every governance action. Each entry's
//! `hash` covers all of its content including `previous_hash`, so mutating
//! or deleting any stored entry breaks the chain from that block onward.
//!
//! Canonical hashing: the hashed fields are serialized as a JSON object with
//! lexicographically sorted keys and SHA-256'd. Timestamps are hashed in
//! RFC 3339 form. The first entry links to [`GENESIS_HASH`] and carries
//! `block_height = 1`.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::domain::agent_control::{AgentId, Initiator};

/// `previous_hash` of the first entry in any chain.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Recorded action kinds. Serialized names are the wire-level event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TruthEventType {
    AgentPause,
    AgentResume,
    AutoResume,
    AgentTerminate,
    CascadeHalt,
    CascadeComplete,
    KillSwitchActivate,
    KillSwitchDeactivate,
    DependencyRegister,
}

impl TruthEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TruthEventType::AgentPause => "agent_pause",
            TruthEventType::AgentResume => "agent_resume",
            TruthEventType::AutoResume => "auto_resume",
            TruthEventType::AgentTerminate => "agent_terminate",
            TruthEventType::CascadeHalt => "cascade_halt",
            TruthEventType::CascadeComplete => "cascade_complete",
            TruthEventType::KillSwitchActivate => "kill_switch_activate",
            TruthEventType::KillSwitchDeactivate => "kill_switch_deactivate",
            TruthEventType::DependencyRegister => "dependency_register",
        }
    }
}

impl fmt::Display for TruthEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content of an entry before the ledger assigns height, linkage, hash, and
/// signature. This is what the other components hand to the append path.
#[derive(Debug, Clone)]
pub struct TruthEntryDraft {
    pub event_type: TruthEventType,
    pub initiator: Initiator,
    pub target_agents: Vec<AgentId>,
    pub reason: Option<String>,
    pub details: serde_json::Value,
}

impl TruthEntryDraft {
    pub fn new(event_type: TruthEventType, initiator: Initiator) -> Self {
        Self {
            event_type,
            initiator,
            target_agents: Vec::new(),
            reason: None,
            details: serde_json::Value::Null,
        }
    }

    pub fn targets(mut self, targets: Vec<AgentId>) -> Self {
        self.target_agents = targets;
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

/// One immutable, hash-linked ledger entry. Created exactly once, never
/// updated, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TruthChainEntry {
    pub id: Uuid,
    pub event_type: TruthEventType,
    pub timestamp: DateTime<Utc>,
    pub initiator: Initiator,
    pub target_agents: Vec<AgentId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub details: serde_json::Value,
    pub previous_hash: String,
    pub hash: String,
    pub block_height: u64,
    pub system_signature: String,
}

impl TruthChainEntry {
    /// Recompute the content hash from stored fields. Integrity holds when
    /// this equals the stored `hash`.
    pub fn content_hash(&self) -> String {
        let mut fields: BTreeMap<&str, serde_json::Value> = BTreeMap::new();
        fields.insert("id", serde_json::json!(self.id));
        fields.insert("event_type", serde_json::json!(self.event_type));
        fields.insert(
            "timestamp",
            serde_json::json!(self.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)),
        );
        fields.insert("initiator_id", serde_json::json!(self.initiator.id));
        fields.insert("initiator_kind", serde_json::json!(self.initiator.kind));
        fields.insert("target_agents", serde_json::json!(self.target_agents));
        fields.insert("reason", serde_json::json!(self.reason));
        fields.insert("details", self.details.clone());
        fields.insert("previous_hash", serde_json::json!(self.previous_hash));
        fields.insert("block_height", serde_json::json!(self.block_height));

        let serialized =
            serde_json::to_string(&fields).expect("canonical entry fields always serialize");
        sha256_hex(serialized.as_bytes())
    }
}

/// Verdict of a full-chain integrity walk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainVerification {
    pub valid: bool,
    pub entries_checked: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_invalid_block: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl ChainVerification {
    pub fn valid(entries_checked: u64) -> Self {
        Self {
            valid: true,
            entries_checked,
            first_invalid_block: None,
            failure: None,
        }
    }

    pub fn invalid(block_height: u64, entries_checked: u64, failure: impl Into<String>) -> Self {
        Self {
            valid: false,
            entries_checked,
            first_invalid_block: Some(block_height),
            failure: Some(failure.into()),
        }
    }
}

/// Full chain dump plus a signature over the export payload itself, so a
/// downstream party can verify the chain independently of the live system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainExport {
    pub entries: Vec<TruthChainEntry>,
    pub exported_at: DateTime<Utc>,
    /// Hash of the latest entry at export time, or the genesis constant for
    /// an empty chain.
    pub head_hash: String,
    /// Ed25519 signature (hex) over [`ChainExport::payload_digest`].
    pub signature: String,
    /// Hex-encoded Ed25519 public key of the signing system.
    pub public_key: String,
}

impl ChainExport {
    /// Deterministic digest the export signature covers.
    pub fn payload_digest(
        entries: &[TruthChainEntry],
        exported_at: DateTime<Utc>,
        head_hash: &str,
    ) -> Vec<u8> {
        let mut fields: BTreeMap<&str, serde_json::Value> = BTreeMap::new();
        fields.insert("entries", serde_json::json!(entries));
        fields.insert(
            "exported_at",
            serde_json::json!(exported_at.to_rfc3339_opts(SecondsFormat::Micros, true)),
        );
        fields.insert("head_hash", serde_json::json!(head_hash));
        let serialized =
            serde_json::to_string(&fields).expect("export payload always serializes");
        Sha256::digest(serialized.as_bytes()).to_vec()
    }
}

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
