//! Cluster-wide administrative commands.
//!
//! These are not keyed, so they bypass slot routing entirely: each runs
//! once against every known node and the replies come back per node.
//! One dead node does not void the others; its entry carries the error.

use std::collections::BTreeMap;

use bytes::Bytes;

use crate::client::ClusterClient;
use crate::error::Result;

/// Administrative broadcast interface.
#[derive(Clone)]
pub struct AdminCommands {
    client: ClusterClient,
}

impl AdminCommands {
    pub(crate) fn new(client: ClusterClient) -> Self {
        Self { client }
    }

    /// `CLUSTER INFO` from every node.
    pub async fn cluster_info(&self) -> BTreeMap<String, Result<String>> {
        self.text_broadcast(vec![
            Bytes::from_static(b"CLUSTER"),
            Bytes::from_static(b"INFO"),
        ])
        .await
    }

    /// `INFO` from every node.
    pub async fn info(&self) -> BTreeMap<String, Result<String>> {
        self.text_broadcast(vec![Bytes::from_static(b"INFO")]).await
    }

    /// Flushes the current database on every node.
    pub async fn flushdb(&self) -> BTreeMap<String, Result<()>> {
        let replies = self
            .client
            .broadcast(vec![Bytes::from_static(b"FLUSHDB")])
            .await;
        replies
            .into_iter()
            .map(|(name, reply)| (name, reply.and_then(|f| f.expect_ok())))
            .collect()
    }

    /// Pings every node, reporting which answered.
    pub async fn ping_all(&self) -> BTreeMap<String, bool> {
        let replies = self
            .client
            .broadcast(vec![Bytes::from_static(b"PING")])
            .await;
        replies
            .into_iter()
            .map(|(name, reply)| {
                let alive = matches!(
                    reply,
                    Ok(crate::frame::Frame::Simple(ref s)) if s == "PONG"
                );
                (name, alive)
            })
            .collect()
    }

    async fn text_broadcast(&self, args: Vec<Bytes>) -> BTreeMap<String, Result<String>> {
        let replies = self.client.broadcast(args).await;
        replies
            .into_iter()
            .map(|(name, reply)| (name, reply.and_then(|f| f.into_string())))
            .collect()
    }
}
