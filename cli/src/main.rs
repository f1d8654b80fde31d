// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # cardano-construct
//!
//! Entry point for the `cardano-construct` binary. Parses arguments,
//! initializes logging, then runs one intent through the construction
//! pipeline:
//!
//! - `transfer`, `register-stake`, `deregister-stake`, `delegate`,
//!   `vote-delegate`, `withdraw`, `pool-register`, `pool-update`,
//!   `pool-vote`, `pool-retire` — build, sign, submit and
//!   (unless `--no-wait`) confirm a transaction
//! - `watch`   — poll for an already submitted transaction
//! - `balance` — ADA balance of an address
//! - `status`  — chain tip as seen by the gateway
//!
//! Results are printed to stdout as JSON; logs go to stderr.

mod cli;
mod logging;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use serde_json::json;

use cardano_construction::config::{LOVELACE_PER_ADA, POOL_DEPOSIT, STAKE_KEY_DEPOSIT};
use cardano_construction::operation::intents::{self, StakeAccount};
use cardano_construction::operation::{DRep, DRepKind, GovernanceVote, PublicKey, VoteRationale};
use cardano_construction::utxo::{select_utxos, SelectionStrategy, Utxo};
use cardano_construction::{
    BuildOptions, ConstructionPipeline, HttpGateway, KeyAssignment, KeyRole, Keyring, OperationSet,
    ParseVerification, PipelineConfig, SignatureRouter, Signer, SubmitOptions, SubmitOutcome,
};

use cli::{Commands, ConstructCli, GlobalArgs, KeyArgs};

/// Lovelace selected on top of what an intent needs, so the fee can be
/// taken from change.
const FEE_HEADROOM: i64 = LOVELACE_PER_ADA;

type Pipeline = ConstructionPipeline<HttpGateway>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = ConstructCli::parse();
    logging::init_logging(logging::DEFAULT_DIRECTIVES, cli.global.log_format);

    let pipeline = connect(&cli.global)?;
    tracing::info!(endpoint = %cli.global.endpoint, network = %cli.global.network, "gateway configured");

    let output = match cli.command {
        Commands::Status => {
            let status = pipeline.client().network_status().await.context("network status failed")?;
            json!({
                "network": cli.global.network,
                "tip": status.current_block_identifier,
                "timestamp": status.current_block_timestamp,
            })
        }
        Commands::Balance { address } => {
            let address = match address {
                Some(a) => a,
                None => required(&cli.global.keys.payment_address, "--payment-address")?.to_string(),
            };
            let balance = pipeline
                .client()
                .account_balance(&address)
                .await
                .with_context(|| format!("balance lookup for {address} failed"))?;
            json!({
                "address": address,
                "block": balance.block_identifier,
                "lovelace": balance.ada().map(|a| a.value.clone()).unwrap_or_else(|| "0".into()),
            })
        }
        Commands::Watch { hash } => {
            let confirmed = pipeline
                .wait_for_confirmation(&hash, Some(cli.global.timeout()))
                .await
                .with_context(|| format!("transaction {hash} was not confirmed"))?;
            json!({
                "transaction_hash": hash,
                "block": confirmed.block_identifier,
                "operations": confirmed.transaction.operations.len(),
            })
        }
        intent => {
            let outcome = run_intent(&pipeline, &cli.global, intent).await?;
            json!({
                "transaction_hash": outcome.transaction_hash,
                "block": outcome.confirmed.as_ref().map(|c| c.block_identifier.clone()),
            })
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn connect(global: &GlobalArgs) -> Result<Pipeline> {
    let gateway = HttpGateway::new(global.endpoint.as_str())
        .with_context(|| format!("failed to create gateway client for {}", global.endpoint))?;
    let mode = if global.strict_parse {
        ParseVerification::Strict
    } else {
        ParseVerification::Lenient
    };
    let config = PipelineConfig::for_network(global.network.as_str())
        .with_parse_verification(mode)
        .with_confirmation_timeout(global.timeout());
    Ok(ConstructionPipeline::new(gateway, config))
}

fn required<'a>(value: &'a Option<String>, flag: &str) -> Result<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| anyhow!("{flag} (or its environment variable) is required"))
}

fn load_keyring(keys: &KeyArgs) -> Result<Keyring> {
    let mut ring = Keyring::new();
    for (role, secret) in [
        (KeyRole::Payment, &keys.payment_key),
        (KeyRole::Stake, &keys.stake_key),
        (KeyRole::PoolCold, &keys.pool_cold_key),
    ] {
        if let Some(secret) = secret {
            ring = ring.with_hex(role, secret)?;
        }
    }
    Ok(ring)
}

fn stake_account(keys: &KeyArgs, ring: &Keyring) -> Result<StakeAccount> {
    let address = required(&keys.stake_address, "--stake-address")?;
    let credential = ring
        .public_key_hex(KeyRole::Stake)
        .context("stake operations need --stake-key")?;
    Ok(StakeAccount::new(address, credential))
}

/// Fetches the payment address's coins and selects enough to cover `needed`.
async fn select_inputs(pipeline: &Pipeline, address: &str, needed: i64) -> Result<Vec<Utxo>> {
    let coins = pipeline
        .client()
        .account_coins(address)
        .await
        .with_context(|| format!("failed to list coins of {address}"))?;
    let available = coins
        .coins
        .iter()
        .map(Utxo::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    let selected = select_utxos(
        &available,
        needed + FEE_HEADROOM,
        SelectionStrategy::Multiple { count: 1 },
        &[],
    )
    .with_context(|| format!("cannot fund {needed} lovelace from {address}"))?;
    tracing::info!(coins = selected.len(), "inputs selected");
    Ok(selected)
}

/// Builds the operations for `intent`, plus the key assignment and the
/// certificates to expect on chain.
async fn plan(
    pipeline: &Pipeline,
    keys: &KeyArgs,
    ring: &Keyring,
    intent: Commands,
) -> Result<(OperationSet, KeyAssignment, Vec<&'static str>)> {
    let payment = required(&keys.payment_address, "--payment-address")?;

    let planned = match intent {
        Commands::Transfer { to, amount } => {
            let utxos = select_inputs(pipeline, payment, amount).await?;
            (intents::transfer(payment, &to, &utxos, amount)?, KeyAssignment::Default, vec![])
        }
        Commands::RegisterStake { pool } => {
            let stake = stake_account(keys, ring)?;
            let utxos = select_inputs(pipeline, payment, STAKE_KEY_DEPOSIT).await?;
            match pool {
                Some(pool) => (
                    intents::registration_and_delegation(payment, &stake, &pool, &utxos)?,
                    KeyAssignment::Default,
                    vec!["registration", "delegation"],
                ),
                None => (
                    intents::stake_registration(payment, &stake, &utxos)?,
                    KeyAssignment::Default,
                    vec!["registration"],
                ),
            }
        }
        Commands::DeregisterStake => {
            let stake = stake_account(keys, ring)?;
            let utxos = select_inputs(pipeline, payment, 0).await?;
            (
                intents::stake_deregistration(payment, &stake, &utxos)?,
                KeyAssignment::Default,
                vec!["deregistration"],
            )
        }
        Commands::Delegate { pool } => {
            let stake = stake_account(keys, ring)?;
            let utxos = select_inputs(pipeline, payment, 0).await?;
            (
                intents::stake_delegation(payment, &stake, &pool, &utxos)?,
                KeyAssignment::Default,
                vec!["delegation"],
            )
        }
        Commands::VoteDelegate { drep, drep_id } => {
            let stake = stake_account(keys, ring)?;
            let kind: DRepKind = drep.parse().map_err(|e| anyhow!("{e}"))?;
            let utxos = select_inputs(pipeline, payment, 0).await?;
            (
                intents::drep_vote_delegation(payment, &stake, DRep::new(kind, drep_id), &utxos)?,
                KeyAssignment::Default,
                vec!["drepVoteDelegation"],
            )
        }
        Commands::Withdraw { amount } => {
            let stake = stake_account(keys, ring)?;
            let utxos = select_inputs(pipeline, payment, 0).await?;
            (
                intents::reward_withdrawal(payment, &stake, amount, &utxos)?,
                KeyAssignment::Default,
                vec!["withdrawal"],
            )
        }
        Commands::PoolRegister { pool_address, params } => {
            let params: serde_json::Value =
                serde_json::from_str(&params).context("--params must be a JSON object")?;
            let utxos = select_inputs(pipeline, payment, POOL_DEPOSIT).await?;
            (
                intents::pool_registration(payment, &pool_address, params, &utxos)?,
                KeyAssignment::pool_registration(),
                vec!["poolRegistration"],
            )
        }
        Commands::PoolUpdate { pool_address, certificate } => {
            let utxos = select_inputs(pipeline, payment, 0).await?;
            (
                intents::pool_certificate_update(payment, &pool_address, &certificate, &utxos)?,
                KeyAssignment::in_order([KeyRole::Payment, KeyRole::PoolCold]),
                vec!["poolRegistrationWithCert"],
            )
        }
        Commands::PoolVote {
            pool_address,
            action,
            vote,
            rationale_url,
            rationale_hash,
        } => {
            let pool_credential = ring
                .public_key_hex(KeyRole::PoolCold)
                .map(PublicKey::edwards25519)
                .context("pool votes need --pool-cold-key")?;
            let rationale = match (rationale_url, rationale_hash) {
                (Some(url), Some(data_hash)) => Some(VoteRationale { data_hash, url }),
                _ => None,
            };
            let vote = GovernanceVote {
                pool_credential,
                governance_action_hash: action,
                vote: vote.into(),
                rationale,
            };
            let utxos = select_inputs(pipeline, payment, 0).await?;
            (
                intents::pool_governance_vote(payment, &pool_address, &vote, &utxos)?,
                KeyAssignment::in_order([KeyRole::Payment, KeyRole::PoolCold]),
                vec!["poolGovernanceVote"],
            )
        }
        Commands::PoolRetire { pool_address, epoch } => {
            let utxos = select_inputs(pipeline, payment, 0).await?;
            (
                intents::pool_retirement(payment, &pool_address, epoch, &utxos)?,
                KeyAssignment::in_order([KeyRole::Payment, KeyRole::PoolCold]),
                vec!["poolRetirement"],
            )
        }
        Commands::Watch { .. } | Commands::Balance { .. } | Commands::Status => {
            bail!("not a transaction intent")
        }
    };
    Ok(planned)
}

async fn run_intent(pipeline: &Pipeline, global: &GlobalArgs, intent: Commands) -> Result<SubmitOutcome> {
    let ring = load_keyring(&global.keys)?;
    let (operations, assignment, expected) = plan(pipeline, &global.keys, &ring, intent).await?;

    let router = SignatureRouter::new(&ring, assignment);
    router.check_roles(&operations)?;

    let public_keys = ring
        .roles()
        .into_iter()
        .map(|role| ring.public_key_hex(role).map(PublicKey::edwards25519))
        .collect::<Result<Vec<_>, _>>()?;
    let draft = pipeline
        .build_transaction(&operations, &BuildOptions::default().with_public_keys(public_keys))
        .await
        .context("failed to build transaction")?;
    tracing::info!(fee = ?draft.fee, payloads = draft.payloads.len(), "transaction built");

    let mut options = if global.no_wait {
        SubmitOptions::no_wait()
    } else {
        SubmitOptions::default().with_timeout(global.timeout())
    };
    if !expected.is_empty() {
        options = options.expecting(expected);
    }

    pipeline
        .submit_draft(&draft, &router, &options)
        .await
        .context("failed to submit transaction")
}
