//! Broadcast command tests.

mod common;

use std::time::Duration;

use common::{MockNode, bulk, error, simple, slots_reply};
use slotline::{ClusterClient, ClusterConfig};
use tokio::net::TcpListener;

fn node_script(own_port: u16, peer_port: u16) -> impl Fn(&[String]) -> String {
    move |args: &[String]| match args[0].as_str() {
        "PING" => simple("PONG"),
        "CLUSTER" if args.get(1).map(String::as_str) == Some("SLOTS") => {
            slots_reply(&[(0, 8191, own_port), (8192, 16383, peer_port)])
        }
        "CLUSTER" => bulk("cluster_state:ok"),
        "INFO" => bulk("uptime_in_seconds:1"),
        "FLUSHDB" => simple("OK"),
        _ => error("ERR unexpected"),
    }
}

async fn two_node_cluster() -> (ClusterClient, MockNode, MockNode) {
    let listener_a = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let listener_b = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port_a = listener_a.local_addr().unwrap().port();
    let port_b = listener_b.local_addr().unwrap().port();

    let a = MockNode::spawn_on(listener_a, node_script(port_a, port_b));
    let b = MockNode::spawn_on(listener_b, node_script(port_b, port_a));

    let config = ClusterConfig::new([("127.0.0.1", port_a)])
        .with_timeout(Duration::from_millis(500));
    let client = ClusterClient::connect(config).await.unwrap();
    (client, a, b)
}

#[tokio::test]
async fn cluster_info_reaches_every_node() {
    let (client, a, b) = two_node_cluster().await;

    let replies = client.admin().cluster_info().await;
    assert_eq!(replies.len(), 2);
    assert_eq!(
        replies.get(&a.name()).unwrap().as_deref().unwrap(),
        "cluster_state:ok"
    );
    assert_eq!(
        replies.get(&b.name()).unwrap().as_deref().unwrap(),
        "cluster_state:ok"
    );
}

#[tokio::test]
async fn ping_all_reports_liveness() {
    let (client, a, b) = two_node_cluster().await;

    let alive = client.admin().ping_all().await;
    assert_eq!(alive.get(&a.name()), Some(&true));
    assert_eq!(alive.get(&b.name()), Some(&true));
}

#[tokio::test]
async fn one_dead_node_does_not_void_the_broadcast() {
    let (client, a, b) = two_node_cluster().await;
    let b_name = b.name();
    drop(b);

    let replies = client.admin().flushdb().await;
    assert_eq!(replies.len(), 2);
    assert!(replies.get(&a.name()).unwrap().is_ok());
    assert!(replies.get(&b_name).unwrap().is_err());
}

#[tokio::test]
async fn info_collects_per_node_text() {
    let (client, a, _b) = two_node_cluster().await;

    let replies = client.admin().info().await;
    assert_eq!(replies.len(), 2);
    assert_eq!(
        replies.get(&a.name()).unwrap().as_deref().unwrap(),
        "uptime_in_seconds:1"
    );
}
