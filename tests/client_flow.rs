//! Client and broadcast flow against a mock node.

mod common;

use std::time::Duration;

use serde_json::{json, Value};
use taiyi_client::blockchain::{Broadcaster, Client, Wallet};
use taiyi_client::config::ClientConfig;
use taiyi_client::crypto::{transaction_digest, ChainId, KeyRole};
use taiyi_client::error::{Error, TransportError};
use taiyi_client::serializer::operations::AccountSimingAdoreOperation;
use taiyi_client::serializer::{Operation, SignedTransaction};
use taiyi_client::transport::{ConnectionState, DEFAULT_API};

use common::{Action, Call, MockNode};

const HEAD_BLOCK_ID: &str = "00000a2b7f1c5e6d0123456789abcdef01234567";

fn chain_handler(call: &Call) -> Action {
    match call.method.as_str() {
        "get_dynamic_global_properties" => Action::Result(json!({
            "head_block_number": 2603,
            "head_block_id": HEAD_BLOCK_ID,
            "time": "2020-01-01T00:00:00",
            "current_siming": "initminer",
            "last_irreversible_block_num": 2600
        })),
        "broadcast_transaction_synchronous" => Action::Result(json!({
            "id": "2961ad30c563dbd6e89735a4ed011480643b57d0",
            "block_num": 2604,
            "trx_num": 0,
            "expired": false
        })),
        "get_transaction_hex" => {
            let signed: SignedTransaction =
                serde_json::from_value(call.params[0].clone()).unwrap();
            Action::Result(json!(signed.to_hex().unwrap()))
        }
        "never" => Action::Silent,
        _ => Action::Result(json!({"id": call.id})),
    }
}

fn config(url: String) -> ClientConfig {
    let mut config = ClientConfig::default();
    config.node.url = url;
    config.node.request_timeout_ms = 2_000;
    config
}

fn broadcast_params(node: &MockNode) -> Value {
    node.calls()
        .into_iter()
        .find(|call| call.method == "broadcast_transaction_synchronous")
        .expect("no broadcast received")
        .params[0]
        .clone()
}

#[tokio::test]
async fn test_ids_increase_across_calls() {
    let node = MockNode::start(chain_handler).await;
    let client = Client::new(&config(node.ws_url())).unwrap();

    for _ in 0..3 {
        client.call(DEFAULT_API, "get_config", json!([])).await.unwrap();
    }
    let ids = node.received_ids();
    assert_eq!(ids.len(), 3);
    assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
    assert_eq!(client.state(), Some(ConnectionState::Open));
    client.disconnect().await;
    assert_eq!(client.state(), Some(ConnectionState::Disconnected));
}

#[tokio::test]
async fn test_default_request_timeout_applies() {
    let node = MockNode::start(chain_handler).await;
    let mut config = config(node.ws_url());
    config.node.request_timeout_ms = 100;
    let client = Client::new(&config).unwrap();

    let err = client.call(DEFAULT_API, "never", json!([])).await.unwrap_err();
    assert!(matches!(err, Error::Transport(TransportError::Timeout { .. })));
}

#[tokio::test]
async fn test_typed_call_over_http() {
    let node = MockNode::start(chain_handler).await;
    let client = Client::new(&config(node.http_url())).unwrap();

    let props = client.get_dynamic_global_properties().await.unwrap();
    assert_eq!(props.head_block_number, 2603);
    assert_eq!(props.current_siming, "initminer");

    // Wrong shape surfaces as a response error naming the method.
    let err = client
        .call_as::<Vec<String>>(DEFAULT_API, "get_dynamic_global_properties", json!([]))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Response { ref method, .. } if method == "get_dynamic_global_properties"
    ));
}

#[tokio::test]
async fn test_prepare_transaction_references_head_block() {
    let node = MockNode::start(chain_handler).await;
    let broadcaster = Broadcaster::new(Client::new(&config(node.http_url())).unwrap());

    let tx = broadcaster.prepare_transaction(Vec::new()).await.unwrap();
    assert_eq!(tx.ref_block_num, 2603);
    assert_eq!(tx.ref_block_prefix, 1834884223);
    assert_eq!(tx.expiration.secs(), 1577836800 + 60);
    assert!(tx.operations.is_empty());
}

#[tokio::test]
async fn test_transfer_is_signed_by_active_key() {
    let node = MockNode::start(chain_handler).await;
    let client = Client::new(&config(node.ws_url())).unwrap();
    let broadcaster = Broadcaster::new(client.clone());
    let wallet = Wallet::from_login("foo", "barman").unwrap();

    let confirmation = broadcaster
        .transfer(&wallet, "bar", "1.000 YANG".parse().unwrap(), "hi")
        .await
        .unwrap();
    assert_eq!(confirmation.block_num, 2604);
    assert!(!confirmation.expired);

    let signed: SignedTransaction = serde_json::from_value(broadcast_params(&node)).unwrap();
    assert_eq!(signed.signatures.len(), 1);
    match &signed.transaction.operations[..] {
        [Operation::Transfer(op)] => {
            assert_eq!(op.from, "foo");
            assert_eq!(op.to, "bar");
            assert_eq!(op.memo, "hi");
        }
        other => panic!("unexpected operations {other:?}"),
    }

    let digest = transaction_digest(&signed.transaction, client.chain_id()).unwrap();
    let signer = signed.signatures[0].recover(&digest).unwrap();
    assert_eq!(Some(signer), wallet.public_key(KeyRole::Active, "TAI"));
    assert!(signed.signatures[0].is_canonical());
    client.disconnect().await;
}

#[tokio::test]
async fn test_custom_json_prefers_posting_key() {
    let node = MockNode::start(chain_handler).await;
    let broadcaster = Broadcaster::new(Client::new(&config(node.http_url())).unwrap());
    let wallet = Wallet::from_login("foo", "barman").unwrap();

    broadcaster
        .custom_json(&wallet, "follow", &json!(["follow", {"what": ["blog"]}]))
        .await
        .unwrap();

    let params = broadcast_params(&node);
    let op = &params["operations"][0];
    assert_eq!(op[0], "custom_json");
    assert_eq!(op[1]["required_posting_auths"], json!(["foo"]));
    assert_eq!(op[1]["required_auths"], json!([]));
}

#[tokio::test]
async fn test_missing_key_is_reported_before_sending() {
    let node = MockNode::start(chain_handler).await;
    let broadcaster = Broadcaster::new(Client::new(&config(node.http_url())).unwrap());
    let posting =
        taiyi_client::crypto::PrivateKey::from_login("foo", "barman", KeyRole::Posting).unwrap();
    let wallet = Wallet::from_wif("foo", &posting.to_wif(), KeyRole::Posting).unwrap();

    let err = broadcaster
        .delegate_qi(&wallet, "bar", "1.000000 QI".parse().unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::KeyFormat(_)));
    assert!(node.calls().is_empty());
}

#[tokio::test]
async fn test_prepared_transaction_encodes_to_known_bytes() {
    let node = MockNode::start(chain_handler).await;
    let mut config = config(node.http_url());
    config.chain.chain_id = "18".repeat(32);
    let client = Client::new(&config).unwrap();
    assert_eq!(*client.chain_id(), ChainId::from_hex(&"18".repeat(32)).unwrap());

    let broadcaster = Broadcaster::new(client);
    let wallet = Wallet::from_login("foo", "barman").unwrap();
    let adore = AccountSimingAdoreOperation {
        account: "foo".into(),
        siming: "initminer".into(),
        approve: true,
    };
    let tx = broadcaster
        .prepare_transaction(vec![adore.into()])
        .await
        .unwrap();
    let signed = broadcaster
        .sign(tx, &[wallet.key(KeyRole::Active).unwrap().clone()])
        .unwrap();

    // ref block 2603 / 0x6d5e1c7f, expiration 2020-01-01T00:01:00,
    // account_siming_adore(foo, initminer, true), no extensions.
    let unsigned = "2b0a7f1c5e6d3ce10b5e01\
                    0903666f6f09696e69746d696e657201\
                    00";
    let expected = format!("{unsigned}01{}", signed.signatures[0]);
    assert_eq!(signed.to_hex().unwrap(), expected);

    // The JSON sent to the node carries everything the bytes do.
    let node_hex = broadcaster.node_transaction_hex(&signed).await.unwrap();
    assert_eq!(node_hex, expected);
}

#[tokio::test]
async fn test_http_client_ignores_connection_controls() {
    let node = MockNode::start(chain_handler).await;
    let client = Client::new(&config(node.http_url())).unwrap();
    client.connect().await.unwrap();
    client.disconnect().await;
    assert!(client.state().is_none());
    // Still usable: HTTP has no connection to close.
    let result = tokio::time::timeout(
        Duration::from_secs(2),
        client.call(DEFAULT_API, "get_config", json!([])),
    )
    .await
    .unwrap();
    assert!(result.is_ok());
}
