//! Confirmation polling under a paused clock. Sleeps complete instantly, so
//! a three-minute budget runs in milliseconds.

mod common;

use std::time::Duration;

use serde_json::json;

use cardano_construction::gateway::{Endpoint, RosettaClient};
use cardano_construction::{ConfirmationWatcher, ConstructionError, WatchState};

use common::*;

const POLL: Duration = Duration::from_secs(10);

fn client(gateway: ScriptedGateway) -> RosettaClient<ScriptedGateway> {
    RosettaClient::new(gateway, "preprod")
}

#[tokio::test(start_paused = true)]
async fn poll_errors_are_swallowed_until_the_block_appears() {
    let onchain = json!([]);
    let gateway = ScriptedGateway::new()
        .fail(Endpoint::SearchTransactions, server_error(Endpoint::SearchTransactions))
        .reply(Endpoint::SearchTransactions, search_miss())
        .always(Endpoint::SearchTransactions, search_hit(TX_HASH, 9))
        .always(Endpoint::Block, block(9))
        .always(Endpoint::BlockTransaction, block_transaction(TX_HASH, &onchain));
    let client = client(gateway);
    let mut watcher = ConfirmationWatcher::new(&client, POLL);

    let confirmed = watcher
        .wait_for_confirmation(TX_HASH, Duration::from_secs(180))
        .await
        .unwrap();

    assert_eq!(confirmed.block_identifier.index, 9);
    assert_eq!(confirmed.hash(), TX_HASH);
    assert_eq!(watcher.state(), &WatchState::Verified);
    assert_eq!(client.gateway().count(Endpoint::SearchTransactions), 3);
}

#[tokio::test(start_paused = true)]
async fn missing_block_transaction_keeps_polling() {
    let onchain = json!([]);
    let gateway = ScriptedGateway::new()
        .always(Endpoint::SearchTransactions, search_hit(TX_HASH, 3))
        .always(Endpoint::Block, block(3))
        .reply(Endpoint::BlockTransaction, json!({}))
        .always(Endpoint::BlockTransaction, block_transaction(TX_HASH, &onchain));
    let client = client(gateway);
    let mut watcher = ConfirmationWatcher::new(&client, POLL);

    watcher
        .wait_for_confirmation(TX_HASH, Duration::from_secs(60))
        .await
        .unwrap();
    assert_eq!(client.gateway().count(Endpoint::BlockTransaction), 2);
}

#[tokio::test(start_paused = true)]
async fn budget_exhaustion_times_out() {
    let gateway = ScriptedGateway::new().always(Endpoint::SearchTransactions, search_miss());
    let client = client(gateway);
    let mut watcher = ConfirmationWatcher::new(&client, POLL);

    let err = watcher
        .wait_for_confirmation(TX_HASH, Duration::from_secs(30))
        .await
        .unwrap_err();

    assert!(matches!(err, ConstructionError::Timeout { .. }));
    assert!(err.is_retryable());
    assert_eq!(watcher.state(), &WatchState::TimedOut);
    assert_eq!(client.gateway().count(Endpoint::SearchTransactions), 3);
}

#[tokio::test(start_paused = true)]
async fn repeated_watch_of_a_confirmed_hash_is_stable() {
    let onchain = json!([{
        "operation_identifier": { "index": 0 },
        "type": "input",
        "status": "success",
        "account": { "address": SENDER },
        "amount": ada(-5_000_000)
    }]);
    let gateway = ScriptedGateway::new()
        .always(Endpoint::SearchTransactions, search_hit(TX_HASH, 12))
        .always(Endpoint::Block, block(12))
        .always(Endpoint::BlockTransaction, block_transaction(TX_HASH, &onchain));
    let client = client(gateway);

    let first = ConfirmationWatcher::new(&client, POLL)
        .wait_for_confirmation(TX_HASH, Duration::from_secs(30))
        .await
        .unwrap();
    let second = ConfirmationWatcher::new(&client, POLL)
        .wait_for_confirmation(TX_HASH, Duration::from_secs(30))
        .await
        .unwrap();
    assert_eq!(first, second);
}

#[tokio::test(start_paused = true)]
async fn differing_block_lookup_still_confirms() {
    let onchain = json!([]);
    let gateway = ScriptedGateway::new()
        .always(Endpoint::SearchTransactions, search_hit(TX_HASH, 20))
        .always(Endpoint::Block, block(21))
        .always(Endpoint::BlockTransaction, block_transaction(TX_HASH, &onchain));
    let client = client(gateway);
    let mut watcher = ConfirmationWatcher::new(&client, POLL);

    let confirmed = watcher
        .wait_for_confirmation(TX_HASH, Duration::from_secs(30))
        .await
        .unwrap();

    assert_eq!(confirmed.block_identifier.index, 20);
    assert_eq!(watcher.state(), &WatchState::Verified);
    assert_eq!(client.gateway().count(Endpoint::SearchTransactions), 1);
    let lookup = &client.gateway().bodies(Endpoint::BlockTransaction)[0];
    assert_eq!(lookup["block_identifier"]["index"], 20);
}
