//! # Confirmation Watcher
//!
//! Polls the Data API until a submitted transaction appears in a block:
//!
//! ```text
//!   Polling ──/search/transactions hit──▶ Found(block)
//!      ▲                                     │ /block, /block/transaction
//!      │ error or not yet indexed            ▼
//!      └───────────────────────────────── Verified
//!
//!   Polling ──budget exhausted──▶ TimedOut
//! ```
//!
//! Errors inside one poll never abort the watch; they are logged and the
//! next poll runs after the usual interval.

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::error::{ConstructionError, Result};
use crate::gateway::types::{BlockIdentifier, Transaction};
use crate::gateway::{Gateway, RosettaClient};
use crate::operation::types::OperationType;

/// Where a [`ConfirmationWatcher`] is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchState {
    Polling { attempt: u32 },
    Found(BlockIdentifier),
    Verified,
    TimedOut,
}

/// A transaction as it landed on chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmedTransaction {
    pub block_identifier: BlockIdentifier,
    pub transaction: Transaction,
}

impl ConfirmedTransaction {
    pub fn hash(&self) -> &str {
        &self.transaction.transaction_identifier.hash
    }

    /// Inputs minus outputs of the on-chain operations. Matches the fee for
    /// plain transfers; deposits and refunds shift it for certificates.
    pub fn onchain_fee(&self) -> Result<i64> {
        let mut fee = 0;
        for op in &self.transaction.operations {
            let value = op.value()?.unwrap_or(0);
            match op.kind {
                OperationType::Input => fee += value.abs(),
                OperationType::Output => fee -= value,
                _ => {}
            }
        }
        Ok(fee)
    }
}

/// Single-use poller for one transaction hash at a time.
pub struct ConfirmationWatcher<'a, G> {
    client: &'a RosettaClient<G>,
    poll_interval: Duration,
    state: WatchState,
}

impl<'a, G: Gateway> ConfirmationWatcher<'a, G> {
    pub fn new(client: &'a RosettaClient<G>, poll_interval: Duration) -> Self {
        Self {
            client,
            poll_interval,
            state: WatchState::Polling { attempt: 0 },
        }
    }

    pub fn state(&self) -> &WatchState {
        &self.state
    }

    /// Polls every `poll_interval` until `hash` is confirmed or `timeout`
    /// has elapsed. The first poll runs immediately.
    pub async fn wait_for_confirmation(&mut self, hash: &str, timeout: Duration) -> Result<ConfirmedTransaction> {
        let started = Instant::now();
        let mut attempt = 0u32;

        while started.elapsed() < timeout {
            attempt += 1;
            self.state = WatchState::Polling { attempt };
            match self.poll_once(hash).await {
                Ok(Some(confirmed)) => {
                    info!(
                        %hash,
                        block = confirmed.block_identifier.index,
                        attempt,
                        "transaction confirmed"
                    );
                    return Ok(confirmed);
                }
                Ok(None) => debug!(%hash, attempt, "transaction not yet in a block"),
                Err(err) => warn!(%hash, attempt, error = %err, "confirmation poll failed"),
            }
            sleep(self.poll_interval).await;
        }

        self.state = WatchState::TimedOut;
        Err(ConstructionError::Timeout {
            hash: hash.to_string(),
            elapsed_secs: started.elapsed().as_secs(),
        })
    }

    /// One round: search, then fetch block and block transaction.
    pub async fn poll_once(&mut self, hash: &str) -> Result<Option<ConfirmedTransaction>> {
        let search = self.client.search_transaction(hash).await?;
        let Some(block_identifier) = search
            .transactions
            .into_iter()
            .find_map(|hit| hit.block_identifier)
        else {
            return Ok(None);
        };
        self.state = WatchState::Found(block_identifier.clone());

        match self.client.block(&block_identifier).await?.block {
            Some(block) if block.block_identifier != block_identifier => warn!(
                searched = block_identifier.index,
                fetched = block.block_identifier.index,
                "block lookup returned a different block"
            ),
            Some(_) => {}
            None => warn!(block = block_identifier.index, "block lookup returned no block"),
        }

        let transaction = self
            .client
            .block_transaction(&block_identifier, hash)
            .await?
            .transaction
            .ok_or_else(|| ConstructionError::network("block transaction lookup returned no transaction"))?;

        self.state = WatchState::Verified;
        Ok(Some(ConfirmedTransaction {
            block_identifier,
            transaction,
        }))
    }
}
