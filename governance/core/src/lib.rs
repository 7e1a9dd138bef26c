// Copyright (c) 2026 Vorion Labs, Inc.
// SPDX-License-Identifier: AGPL-3.0
//! # Vorion Governance Core
//!
//! The circuit-breaker subsystem of the Vorion agent platform: halt
//! misbehaving autonomous agents safely, propagate halts through their
//! dependency graph, perform platform-wide emergency stops with scoping,
//! and record every such action in a tamper-evident, hash-linked ledger.
//!
//! # Architecture
//!
//! - **Domain** — lifecycle state machine, dependency graph types,
//!   kill-switch singleton, truth-chain entries, repository contracts.
//! - **Application** — the operation set consumed by dispatch paths and
//!   operator tooling.
//! - **Infrastructure** — in-memory repositories, Ed25519 system signer,
//!   broadcast event bus.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use application::GovernanceCore;
pub use config::GovernanceConfig;
pub use domain::*;
