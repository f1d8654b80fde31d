//! # CLI Interface
//!
//! Argument structure for `cardano-construct`. Gateway, network and key
//! material are global options, each readable from the environment so
//! secrets never need to appear on the command line.

use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use cardano_construction::config::DEFAULT_NETWORK;
use cardano_construction::operation::Vote;

use crate::logging::LogFormat;

/// Build, sign and submit Cardano transactions through a Rosetta gateway.
#[derive(Parser, Debug)]
#[command(name = "cardano-construct", version, propagate_version = true)]
pub struct ConstructCli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Base URL of the Rosetta gateway.
    #[arg(long, global = true, env = "ROSETTA_ENDPOINT", default_value = "http://localhost:8082")]
    pub endpoint: String,

    /// Cardano network name placed in every `network_identifier`.
    #[arg(long, global = true, env = "CARDANO_NETWORK", default_value = DEFAULT_NETWORK)]
    pub network: String,

    #[arg(long, global = true, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Fail instead of warning when a parse verification finds mismatches.
    #[arg(long, global = true)]
    pub strict_parse: bool,

    /// Seconds to wait for on-chain confirmation.
    #[arg(long, global = true, env = "CONFIRMATION_TIMEOUT", default_value_t = 180)]
    pub timeout: u64,

    /// Return right after submission without polling for confirmation.
    #[arg(long, global = true)]
    pub no_wait: bool,

    #[command(flatten)]
    pub keys: KeyArgs,
}

impl GlobalArgs {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

/// Key material and the addresses it controls.
#[derive(Args, Debug)]
pub struct KeyArgs {
    /// Hex ed25519 seed of the payment key.
    #[arg(long, global = true, env = "PAYMENT_SECRET_KEY", hide_env_values = true)]
    pub payment_key: Option<String>,

    /// Hex ed25519 seed of the stake key.
    #[arg(long, global = true, env = "STAKE_SECRET_KEY", hide_env_values = true)]
    pub stake_key: Option<String>,

    /// Hex ed25519 seed of the pool cold key.
    #[arg(long, global = true, env = "POOL_COLD_SECRET_KEY", hide_env_values = true)]
    pub pool_cold_key: Option<String>,

    /// Address whose coins are spent and which receives change.
    #[arg(long, global = true, env = "PAYMENT_ADDRESS")]
    pub payment_address: Option<String>,

    /// Reward address of the stake key.
    #[arg(long, global = true, env = "STAKE_ADDRESS")]
    pub stake_address: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send lovelace to another address.
    Transfer {
        /// Recipient address.
        #[arg(long)]
        to: String,
        /// Amount in lovelace.
        #[arg(long)]
        amount: i64,
    },
    /// Register the stake key (pays the key deposit).
    RegisterStake {
        /// Also delegate to this pool in the same transaction.
        #[arg(long)]
        pool: Option<String>,
    },
    /// Deregister the stake key (refunds the key deposit).
    DeregisterStake,
    /// Delegate stake to a pool.
    Delegate {
        /// Pool key hash.
        #[arg(long)]
        pool: String,
    },
    /// Delegate voting power to a DRep.
    VoteDelegate {
        /// key_hash, script_hash, abstain or no_confidence.
        #[arg(long)]
        drep: String,
        /// DRep id, required for key_hash and script_hash.
        #[arg(long)]
        drep_id: Option<String>,
    },
    /// Withdraw accumulated rewards.
    Withdraw {
        /// Amount in lovelace.
        #[arg(long)]
        amount: i64,
    },
    /// Register a new stake pool (pays the pool deposit).
    PoolRegister {
        /// Address of the pool cold key.
        #[arg(long)]
        pool_address: String,
        /// `poolRegistrationParams` as a JSON object.
        #[arg(long)]
        params: String,
    },
    /// Re-register an existing pool from an encoded certificate.
    PoolUpdate {
        /// Address of the pool cold key.
        #[arg(long)]
        pool_address: String,
        /// CBOR hex of the pool registration certificate.
        #[arg(long)]
        certificate: String,
    },
    /// Cast the pool's vote on a governance action.
    PoolVote {
        /// Address of the pool cold key.
        #[arg(long)]
        pool_address: String,
        /// Governance action id, `<tx hash>#<index>`.
        #[arg(long)]
        action: String,
        #[arg(long, value_enum)]
        vote: VoteChoice,
        /// Anchor URL of the vote rationale.
        #[arg(long, requires = "rationale_hash")]
        rationale_url: Option<String>,
        /// Blake2b-256 hash of the rationale document.
        #[arg(long, requires = "rationale_url")]
        rationale_hash: Option<String>,
    },
    /// Retire a stake pool at the given epoch.
    PoolRetire {
        /// Address of the pool cold key.
        #[arg(long)]
        pool_address: String,
        #[arg(long)]
        epoch: u64,
    },
    /// Wait for a submitted transaction to appear in a block.
    Watch {
        /// Transaction hash.
        hash: String,
    },
    /// Show the ADA balance of an address (payment address by default).
    Balance { address: Option<String> },
    /// Show the gateway's view of the chain tip.
    Status,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum VoteChoice {
    Yes,
    No,
    Abstain,
}

impl From<VoteChoice> for Vote {
    fn from(choice: VoteChoice) -> Self {
        match choice {
            VoteChoice::Yes => Vote::Yes,
            VoteChoice::No => Vote::No,
            VoteChoice::Abstain => Vote::Abstain,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        ConstructCli::command().debug_assert();
    }

    #[test]
    fn delegate_parses_with_globals_after_subcommand() {
        let cli = ConstructCli::try_parse_from([
            "cardano-construct",
            "delegate",
            "--pool",
            "pool1abc",
            "--strict-parse",
            "--network",
            "preview",
        ])
        .unwrap();
        assert!(cli.global.strict_parse);
        assert_eq!(cli.global.network, "preview");
        assert!(matches!(cli.command, Commands::Delegate { ref pool } if pool == "pool1abc"));
    }

    #[test]
    fn pool_vote_rationale_flags_come_in_pairs() {
        let base = [
            "cardano-construct",
            "pool-vote",
            "--pool-address",
            "pool_cold",
            "--action",
            "ab12#0",
            "--vote",
            "abstain",
        ];
        let cli = ConstructCli::try_parse_from(base).unwrap();
        match cli.command {
            Commands::PoolVote { vote, rationale_url, .. } => {
                assert_eq!(Vote::from(vote), Vote::Abstain);
                assert!(rationale_url.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }

        let half = base.iter().copied().chain(["--rationale-url", "https://x.test/r.json"]);
        assert!(ConstructCli::try_parse_from(half).is_err());
    }
}
