//! # Operations
//!
//! Everything needed to describe a transaction as an ordered list of Rosetta
//! operations, without any I/O:
//!
//! - `types` — wire structures (`Operation`, `Amount`, `OperationSet`, ...).
//! - `builder` — single-operation builders and the fluent set builder.
//! - `intents` — complete operation sets for common stake and pool actions.
//! - `accounting` — deposit, refund and fee arithmetic over a set.

pub mod accounting;
pub mod builder;
pub mod intents;
pub mod types;

pub use accounting::Balance;
pub use builder::{
    build_certificate, build_input, build_output, build_pool_governance_vote,
    build_pool_registration, build_pool_registration_with_cert, build_withdrawal,
    CertificateExtra, DRep, DRepKind, GovernanceVote, OperationSetBuilder, Vote, VoteRationale,
};
pub use intents::StakeAccount;
pub use types::{
    count_types, AccountIdentifier, Amount, CoinAction, CoinChange, CoinIdentifier, Currency,
    Metadata, Operation, OperationIdentifier, OperationSet, OperationType, PublicKey,
};
