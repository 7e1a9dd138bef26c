// Copyright (c) 2026 Vorion Labs, Inc.
// SPDX-License-Identifier: AGPL-3.0
//! # Truth Chain Service
//!
//! Append is the serialization point for the whole core: each entry's hash
//! depends on the previous entry's hash and a monotonic height, so the
//! read-latest → compute → write sequence runs under a single async mutex
//! per ledger instance. No two appends can observe the same
//! `previous_hash`/height.
//!
//! Integrity walk: recompute every stored entry's hash, confirm linkage to
//! the prior entry (genesis constant for height 1), and confirm heights are
//! gap-free. The first violating block is reported and trust in the chain
//! stops there.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};
use uuid::Uuid;

use crate::domain::error::GovernanceError;
use crate::domain::repository::TruthChainRepository;
use crate::domain::truth_chain::{
    ChainExport, ChainVerification, TruthChainEntry, TruthEntryDraft, GENESIS_HASH,
};
use crate::infrastructure::signer::{verify_hex_signature, SystemSigner};

pub struct TruthChainService {
    repository: Arc<dyn TruthChainRepository>,
    signer: Arc<SystemSigner>,
    /// Guards the read-latest → hash → append critical section.
    append_lock: Mutex<()>,
}

impl TruthChainService {
    pub fn new(repository: Arc<dyn TruthChainRepository>, signer: Arc<SystemSigner>) -> Self {
        Self {
            repository,
            signer,
            append_lock: Mutex::new(()),
        }
    }

    /// Append one entry for a recorded action. This is the write-through
    /// point every other component commits through.
    pub async fn record(&self, draft: TruthEntryDraft) -> Result<TruthChainEntry, GovernanceError> {
        let _guard = self.append_lock.lock().await;

        let latest = self.repository.latest().await?;
        let (previous_hash, block_height) = match &latest {
            Some(entry) => (entry.hash.clone(), entry.block_height + 1),
            None => (GENESIS_HASH.to_string(), 1),
        };

        let mut entry = TruthChainEntry {
            id: Uuid::new_v4(),
            event_type: draft.event_type,
            timestamp: Utc::now(),
            initiator: draft.initiator,
            target_agents: draft.target_agents,
            reason: draft.reason,
            details: draft.details,
            previous_hash,
            hash: String::new(),
            block_height,
            system_signature: String::new(),
        };
        entry.hash = entry.content_hash();
        entry.system_signature = self.signer.sign_hex(entry.hash.as_bytes());

        self.repository.append(&entry).await?;
        info!(
            event_type = %entry.event_type,
            block_height = entry.block_height,
            "truth chain entry appended"
        );
        Ok(entry)
    }

    pub async fn latest(&self) -> Result<Option<TruthChainEntry>, GovernanceError> {
        Ok(self.repository.latest().await?)
    }

    pub async fn entry_at(&self, height: u64) -> Result<Option<TruthChainEntry>, GovernanceError> {
        Ok(self.repository.find_by_height(height).await?)
    }

    pub async fn entries_from(&self, height: u64) -> Result<Vec<TruthChainEntry>, GovernanceError> {
        Ok(self.repository.list_from(height).await?)
    }

    pub async fn height(&self) -> Result<u64, GovernanceError> {
        Ok(self.repository.len().await?)
    }

    /// Walk all entries in height order and report the first violation.
    pub async fn verify_integrity(&self) -> Result<ChainVerification, GovernanceError> {
        let entries = self.repository.list_from(1).await?;
        let mut expected_previous = GENESIS_HASH.to_string();
        let mut expected_height: u64 = 1;

        for entry in &entries {
            if entry.block_height != expected_height {
                return Ok(self.report_invalid(
                    entry.block_height,
                    entries.len() as u64,
                    format!(
                        "height gap: expected {expected_height}, found {}",
                        entry.block_height
                    ),
                ));
            }
            if entry.previous_hash != expected_previous {
                return Ok(self.report_invalid(
                    entry.block_height,
                    entries.len() as u64,
                    "previous_hash does not match prior entry".to_string(),
                ));
            }
            let recomputed = entry.content_hash();
            if recomputed != entry.hash {
                return Ok(self.report_invalid(
                    entry.block_height,
                    entries.len() as u64,
                    "stored hash does not match recomputed content hash".to_string(),
                ));
            }
            expected_previous = entry.hash.clone();
            expected_height += 1;
        }

        Ok(ChainVerification::valid(entries.len() as u64))
    }

    fn report_invalid(&self, block: u64, checked: u64, failure: String) -> ChainVerification {
        error!(
            block_height = block,
            failure = %failure,
            "truth chain integrity violation; chain is untrusted from this block"
        );
        ChainVerification::invalid(block, checked, failure)
    }

    /// Full chain dump with a signature over the export payload, so a
    /// downstream party can re-verify the chain offline.
    pub async fn export(&self) -> Result<ChainExport, GovernanceError> {
        let entries = self.repository.list_from(1).await?;
        let exported_at = Utc::now();
        let head_hash = entries
            .last()
            .map(|e| e.hash.clone())
            .unwrap_or_else(|| GENESIS_HASH.to_string());

        let digest = ChainExport::payload_digest(&entries, exported_at, &head_hash);
        let signature = self.signer.sign_hex(&digest);

        Ok(ChainExport {
            entries,
            exported_at,
            head_hash,
            signature,
            public_key: self.signer.public_key_hex(),
        })
    }

    /// Offline check of an exported chain: signature over the payload, then
    /// the same linkage walk `verify_integrity` performs. Pure; needs no
    /// access to the live ledger.
    pub fn verify_export(export: &ChainExport) -> Result<ChainVerification, GovernanceError> {
        let digest =
            ChainExport::payload_digest(&export.entries, export.exported_at, &export.head_hash);
        if !verify_hex_signature(&digest, &export.signature, &export.public_key)? {
            return Ok(ChainVerification::invalid(
                0,
                export.entries.len() as u64,
                "export signature verification failed",
            ));
        }

        let mut expected_previous = GENESIS_HASH.to_string();
        let mut expected_height: u64 = 1;
        for entry in &export.entries {
            if entry.block_height != expected_height
                || entry.previous_hash != expected_previous
                || entry.content_hash() != entry.hash
            {
                return Ok(ChainVerification::invalid(
                    entry.block_height,
                    export.entries.len() as u64,
                    "exported chain fails linkage or hash check",
                ));
            }
            expected_previous = entry.hash.clone();
            expected_height += 1;
        }
        Ok(ChainVerification::valid(export.entries.len() as u64))
    }
}
