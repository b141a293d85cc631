//! Node identity and the seed-node registry.
//!
//! A node's stable identity is its `ip:port` name; hostnames only matter
//! at resolution time. The registry keeps the ordered, deduplicated union
//! of the user-supplied seeds and every node the cluster has reported.

use std::collections::HashSet;

use rand::seq::SliceRandom;

use crate::error::{ClusterError, Result};

/// A known cluster node.
#[derive(Debug, Clone)]
pub struct NodeDescriptor {
    /// Hostname the node was first known by (the resolved IP for nodes
    /// discovered from a topology refresh).
    pub host: String,
    /// Resolved IPv4/IPv6 address, as text.
    pub ip: String,
    /// TCP port.
    pub port: u16,
    /// Stable identity, always `"ip:port"`.
    pub name: String,
}

impl NodeDescriptor {
    /// Resolves `host` via DNS and builds the descriptor.
    pub async fn resolve(host: &str, port: u16) -> Result<Self> {
        let mut addrs = tokio::net::lookup_host((host, port))
            .await
            .map_err(|e| ClusterError::Dns(format!("{host}:{port}: {e}")))?;
        let addr = addrs
            .next()
            .ok_or_else(|| ClusterError::Dns(format!("{host}:{port}: no addresses")))?;
        let ip = addr.ip().to_string();
        let name = format!("{ip}:{port}");
        Ok(Self {
            host: host.to_string(),
            ip,
            port,
            name,
        })
    }

    /// Builds a descriptor from an already-resolved endpoint, as reported
    /// by a topology refresh or a redirection.
    pub fn from_endpoint(ip: &str, port: u16) -> Self {
        let name = format!("{ip}:{port}");
        Self {
            host: ip.to_string(),
            ip: ip.to_string(),
            port,
            name,
        }
    }

    /// Parses an `"ip:port"` node name back into a descriptor.
    pub fn from_name(name: &str) -> Result<Self> {
        let (ip, port) = name
            .rsplit_once(':')
            .ok_or_else(|| ClusterError::Protocol(format!("bad node address {name:?}")))?;
        let port: u16 = port
            .parse()
            .map_err(|_| ClusterError::Protocol(format!("bad node port in {name:?}")))?;
        Ok(Self::from_endpoint(ip, port))
    }
}

impl PartialEq for NodeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for NodeDescriptor {}

/// Ordered, deduplicated list of known nodes.
#[derive(Debug, Default)]
pub struct NodeRegistry {
    nodes: Vec<NodeDescriptor>,
}

impl NodeRegistry {
    pub fn new(seeds: Vec<NodeDescriptor>) -> Self {
        let mut registry = Self { nodes: seeds };
        registry.dedup();
        registry
    }

    /// All known nodes, first-seen order.
    pub fn nodes(&self) -> &[NodeDescriptor] {
        &self.nodes
    }

    /// Looks a node up by its `ip:port` name.
    pub fn get(&self, name: &str) -> Option<&NodeDescriptor> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Appends nodes discovered from a topology refresh and dedups by
    /// name, preserving first-seen order. The list always retains at
    /// least the caller-supplied seeds.
    pub fn merge(&mut self, discovered: Vec<NodeDescriptor>) {
        self.nodes.extend(discovered);
        self.dedup();
    }

    /// Known nodes in random order, for fallback candidate selection.
    /// Shuffling spreads many client instances across the seed list
    /// instead of piling them onto the first entry.
    pub fn shuffled(&self) -> Vec<NodeDescriptor> {
        let mut nodes = self.nodes.clone();
        nodes.shuffle(&mut rand::rng());
        nodes
    }

    fn dedup(&mut self) {
        let mut seen = HashSet::new();
        self.nodes.retain(|n| seen.insert(n.name.clone()));
    }
}
