//! Topology bootstrap tests.

mod common;

use std::time::Duration;

use common::{MockNode, simple, slots_reply, unused_port};
use slotline::{ClusterClient, ClusterConfig, ClusterError};
use tokio::net::TcpListener;

fn fast(config: ClusterConfig) -> ClusterConfig {
    config.with_timeout(Duration::from_millis(500))
}

#[tokio::test]
async fn first_reachable_seed_wins() {
    let dead1 = unused_port().await;
    let dead2 = unused_port().await;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let node = MockNode::spawn_on(listener, move |args| match args[0].as_str() {
        "PING" => simple("PONG"),
        "CLUSTER" => slots_reply(&[(0, 16383, port)]),
        "GET" => common::bulk("value"),
        _ => common::error("ERR unexpected"),
    });

    let config = fast(ClusterConfig::new([
        ("127.0.0.1", dead1),
        ("127.0.0.1", dead2),
        ("127.0.0.1", node.port()),
    ]));
    let client = ClusterClient::connect(config).await.unwrap();

    // registry: the three seeds merged with the discovered node, deduped
    let nodes = client.known_nodes().await;
    assert_eq!(nodes.len(), 3);
    assert!(nodes.contains(&node.name()));

    // full map learned from the single reachable node
    assert_eq!(client.slot_owner(0).await, Some(node.name()));
    assert_eq!(client.slot_owner(16383).await, Some(node.name()));

    let value = client.kv().get("foo").await.unwrap();
    assert_eq!(value.as_deref(), Some(&b"value"[..]));
}

#[tokio::test]
async fn all_seeds_unreachable_is_fatal() {
    let dead1 = unused_port().await;
    let dead2 = unused_port().await;

    let config = fast(ClusterConfig::new([
        ("127.0.0.1", dead1),
        ("127.0.0.1", dead2),
    ]));
    let err = ClusterClient::connect(config).await.unwrap_err();
    assert!(matches!(err, ClusterError::StartupNodesUnreachable));
}

#[tokio::test]
async fn seed_with_malformed_topology_reply_is_skipped() {
    // first seed answers the topology query with garbage, second is fine
    let bad = MockNode::spawn(|args| match args[0].as_str() {
        "CLUSTER" => simple("OK"),
        _ => common::error("ERR unexpected"),
    })
    .await;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let good = MockNode::spawn_on(listener, move |args| match args[0].as_str() {
        "PING" => simple("PONG"),
        "CLUSTER" => slots_reply(&[(0, 16383, port)]),
        _ => common::error("ERR unexpected"),
    });

    let config = fast(ClusterConfig::new([
        ("127.0.0.1", bad.port()),
        ("127.0.0.1", good.port()),
    ]));
    let client = ClusterClient::connect(config).await.unwrap();
    assert_eq!(client.slot_owner(100).await, Some(good.name()));
}
