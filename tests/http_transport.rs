//! HTTP transport against a mock node.

mod common;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use taiyi_client::error::{Error, TransportError};
use taiyi_client::transport::{HttpOptions, HttpTransport, RpcRequest, DEFAULT_API};
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;

use common::{unused_addr, Action, MockNode};

fn request(id: u64, method: &str) -> RpcRequest {
    RpcRequest::call(id, DEFAULT_API, method, json!(["alice"]))
}

async fn node() -> MockNode {
    MockNode::start(|call| match call.method.as_str() {
        "fail" => Action::Error(json!({"code": -32601, "message": "method not found"})),
        "broken" => Action::Status(500, "node exploded".to_string()),
        "slow" => Action::Delay(Duration::from_secs(2), json!("too late")),
        _ => Action::Result(json!({"method": call.method, "params": call.params})),
    })
    .await
}

#[tokio::test]
async fn test_post_round_trip() {
    let node = node().await;
    let transport = HttpTransport::new(HttpOptions::new(node.http_url())).unwrap();

    let result = transport
        .send(request(5, "get_accounts"), Some(Duration::from_secs(2)))
        .await
        .unwrap();
    assert_eq!(result, json!({"method": "get_accounts", "params": ["alice"]}));
    assert_eq!(node.received_ids(), vec![5]);
    assert_eq!(transport.in_flight(), 0);
}

#[tokio::test]
async fn test_status_error_keeps_body() {
    let node = node().await;
    let transport = HttpTransport::new(HttpOptions {
        max_attempts: 3,
        ..HttpOptions::new(node.http_url())
    })
    .unwrap();

    let err = transport.send(request(1, "broken"), None).await.unwrap_err();
    match err {
        Error::Transport(TransportError::Http { status, message, .. }) => {
            assert_eq!(status, Some(500));
            assert_eq!(message, "node exploded");
        }
        other => panic!("unexpected {other:?}"),
    }
    // A status error is an answer, not a connection failure: no retry.
    assert_eq!(node.received_ids(), vec![1]);
}

#[tokio::test]
async fn test_rpc_error() {
    let node = node().await;
    let transport = HttpTransport::new(HttpOptions::new(node.http_url())).unwrap();

    let err = transport.send(request(2, "fail"), None).await.unwrap_err();
    match err {
        Error::Rpc(rpc) => {
            assert_eq!(rpc.code, -32601);
            assert_eq!(rpc.message, "method not found");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn test_timeout() {
    let node = node().await;
    let transport = HttpTransport::new(HttpOptions::new(node.http_url())).unwrap();

    let err = transport
        .send(request(3, "slow"), Some(Duration::from_millis(100)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Transport(TransportError::Timeout { id: 3, .. })
    ));
    assert_eq!(transport.in_flight(), 0);
}

#[tokio::test]
async fn test_connection_refused_retries_then_fails() {
    let addr = unused_addr().await;
    let transport = HttpTransport::new(HttpOptions {
        max_attempts: 2,
        retry_base_delay_ms: 10,
        retry_max_delay_ms: 20,
        ..HttpOptions::new(format!("http://{addr}/"))
    })
    .unwrap();

    let err = transport
        .send(request(4, "get_config"), Some(Duration::from_secs(5)))
        .await
        .unwrap_err();
    match err {
        Error::Transport(error) => {
            assert!(error.is_connection_failure());
            assert!(error.is_unsent());
            assert!(matches!(error, TransportError::Http { status: None, .. }));
        }
        other => panic!("unexpected {other:?}"),
    }
}

/// A node that reads each request and hangs up without answering.
async fn hang_up_node() -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let received = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&received);
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = [0u8; 4096];
            if matches!(socket.read(&mut buf).await, Ok(n) if n > 0) {
                counter.fetch_add(1, Ordering::SeqCst);
            }
            drop(socket);
        }
    });
    (addr, received)
}

#[tokio::test]
async fn test_failure_after_send_is_not_retried() {
    let (addr, received) = hang_up_node().await;
    let transport = HttpTransport::new(HttpOptions {
        max_attempts: 3,
        retry_base_delay_ms: 10,
        retry_max_delay_ms: 20,
        ..HttpOptions::new(format!("http://{addr}/"))
    })
    .unwrap();

    let err = transport
        .send(
            request(6, "broadcast_transaction_synchronous"),
            Some(Duration::from_secs(5)),
        )
        .await
        .unwrap_err();
    match err {
        Error::Transport(error) => {
            assert!(matches!(error, TransportError::Http { status: None, .. }));
            assert!(!error.is_unsent());
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(received.load(Ordering::SeqCst), 1);
}
