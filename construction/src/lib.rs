// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Cardano Construction Pipeline — Core Library
//!
//! Turns a semantic transaction intent (spend these UTXOs, pay these outputs,
//! register or delegate a stake key, vote for a DRep, manage a stake pool)
//! into a signed, submitted and chain-confirmed transaction against a
//! Cardano Rosetta gateway. Callers never touch transaction bytes: the
//! gateway encodes, the pipeline orchestrates.
//!
//! ## Architecture
//!
//! ```text
//!   OperationSetBuilder ──► ConstructionPipeline::build_transaction
//!                                   │  preprocess → metadata → fee-adjust
//!                                   │  → payloads → parse-verify
//!                                   ▼
//!                           SignatureRouter (payment / stake / pool-cold)
//!                                   │
//!                                   ▼
//!                      ConstructionPipeline::sign_and_submit
//!                                   │  combine → parse-verify → hash → submit
//!                                   ▼
//!                           ConfirmationWatcher
//! ```
//!
//! - **operation** — wire types and pure builders for operation sets.
//! - **gateway** — the single `post(endpoint, payload)` seam plus an HTTP
//!   implementation and a typed client.
//! - **signing** — key roles, the ed25519 keyring and payload routing.
//! - **pipeline** — the phase orchestrator and its fee arithmetic.
//! - **confirmation** — polling until the transaction lands in a block.
//! - **utxo** — coin selection strategies feeding the builders.
//! - **config** — protocol constants and pipeline settings.
//!
//! ## Ground rules
//!
//! 1. Amounts are `i64` lovelace in memory and decimal strings on the wire.
//!    No floating point anywhere near money.
//! 2. Deposits and refunds are named constants in [`config`], never literals.
//! 3. Every phase is awaited in order. Nothing runs in the background.

pub mod config;
pub mod confirmation;
pub mod error;
pub mod gateway;
pub mod operation;
pub mod pipeline;
pub mod signing;
pub mod utxo;

pub use config::{ParseVerification, PipelineConfig};
pub use confirmation::{ConfirmationWatcher, ConfirmedTransaction, WatchState};
pub use error::{ConstructionError, Result};
pub use gateway::{Gateway, GatewayError, HttpGateway, RosettaClient};
pub use operation::{Operation, OperationSet, OperationSetBuilder, OperationType};
pub use pipeline::{BuildOptions, ConstructionPipeline, SubmitOptions, SubmitOutcome, TransactionDraft};
pub use signing::{KeyAssignment, KeyRole, Keyring, PayloadSigner, SignatureRouter, Signer};
