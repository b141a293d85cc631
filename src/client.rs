//! Cluster client: construction, command dispatch, and broadcast.
//!
//! The client keeps the node registry, the slot map, and the connection
//! pool behind a single lock and drives the redirection-following retry
//! protocol around them. A dispatch call is
//! sequential: it suspends only on transport round-trips and on the
//! fixed backoff sleep; there are no background tasks.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::admin::AdminCommands;
use crate::connection::NodeConnection;
use crate::error::{ClusterError, Result};
use crate::frame::Frame;
use crate::kv::KvCommands;
use crate::list::ListCommands;
use crate::node::{NodeDescriptor, NodeRegistry};
use crate::pool::ConnectionPool;
use crate::redirect::{self, RedirectKind};
use crate::slot::key_slot;
use crate::topology::TopologyState;

/// Fixed backoff applied once past half the redirection budget.
const BACKOFF: Duration = Duration::from_millis(100);

/// Commands that carry no key and cannot be routed by slot.
const KEYLESS_COMMANDS: &[&str] = &[
    "ASKING", "AUTH", "CLUSTER", "CONFIG", "DBSIZE", "FLUSHALL", "FLUSHDB", "INFO", "PING",
    "SELECT", "SHUTDOWN",
];

/// Cluster client configuration.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// Startup nodes, as `(host, port)` pairs.
    pub seeds: Vec<(String, u16)>,
    /// Connection pool capacity.
    pub max_connections: usize,
    /// Per-connection connect and round-trip deadline.
    pub timeout: Duration,
    /// Redirection budget per dispatch call.
    pub max_redirections: u32,
}

impl ClusterConfig {
    /// Creates a configuration from startup nodes, with defaults of a
    /// 1 second transport timeout, 16 pooled connections, and a
    /// redirection budget of 16.
    pub fn new<H: Into<String>>(seeds: impl IntoIterator<Item = (H, u16)>) -> Self {
        Self {
            seeds: seeds.into_iter().map(|(h, p)| (h.into(), p)).collect(),
            max_connections: 16,
            timeout: Duration::from_secs(1),
            max_redirections: 16,
        }
    }

    /// Sets the transport timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the connection pool capacity.
    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }

    /// Sets the per-dispatch redirection budget.
    pub fn with_max_redirections(mut self, max_redirections: u32) -> Self {
        self.max_redirections = max_redirections;
        self
    }
}

/// Shared mutable state: registry, slot map, pool. One lock covers all
/// three so a dispatch observes them consistently.
#[derive(Debug)]
struct Inner {
    registry: NodeRegistry,
    topology: TopologyState,
    pool: ConnectionPool,
}

/// Topology-aware cluster client.
///
/// Cheap to clone; clones share state. Safe to use from multiple tasks,
/// with dispatches serialized on the internal lock.
#[derive(Debug, Clone)]
pub struct ClusterClient {
    inner: Arc<Mutex<Inner>>,
    config: Arc<ClusterConfig>,
}

impl ClusterClient {
    /// Resolves the startup nodes and bootstraps the slot map from the
    /// first seed that answers the topology query.
    pub async fn connect(config: ClusterConfig) -> Result<Self> {
        let mut seeds = Vec::new();
        for (host, port) in &config.seeds {
            match NodeDescriptor::resolve(host, *port).await {
                Ok(node) => seeds.push(node),
                Err(e) => warn!(%host, port, error = %e, "seed resolution failed"),
            }
        }
        if seeds.is_empty() {
            return Err(ClusterError::StartupNodesUnreachable);
        }

        let mut inner = Inner {
            registry: NodeRegistry::new(seeds),
            topology: TopologyState::new(),
            pool: ConnectionPool::new(config.max_connections),
        };
        rebuild(&mut inner, &config).await?;

        Ok(Self {
            inner: Arc::new(Mutex::new(inner)),
            config: Arc::new(config),
        })
    }

    /// Key-value command surface.
    pub fn kv(&self) -> KvCommands {
        KvCommands::new(self.clone())
    }

    /// List command surface.
    pub fn list(&self) -> ListCommands {
        ListCommands::new(self.clone())
    }

    /// Cluster-wide administrative command surface.
    pub fn admin(&self) -> AdminCommands {
        AdminCommands::new(self.clone())
    }

    /// Dispatches one command to the node owning its key's slot,
    /// following MOVED/ASK redirections and falling back to random
    /// nodes on transport failures, within the redirection budget.
    ///
    /// This is the generic entry point every typed wrapper calls.
    pub async fn dispatch(&self, args: Vec<Bytes>) -> Result<Frame> {
        let slot = key_slot(routing_key(&args)?);
        let cfg = &self.config;

        let mut inner = self.inner.lock().await;
        if inner.topology.is_stale() {
            rebuild(&mut inner, cfg).await?;
        }

        let mut ttl = cfg.max_redirections;
        let mut asking = false;
        let mut try_random = false;
        let mut next_target: Option<String> = None;
        let mut last_err = String::from("no attempt made");

        while ttl > 0 {
            ttl -= 1;

            let target = if let Some(addr) = next_target.take() {
                addr
            } else if try_random {
                try_random = false;
                random_node(&mut inner, cfg).await?
            } else {
                match inner.topology.owner(slot) {
                    Some(name) => name.to_string(),
                    None => random_node(&mut inner, cfg).await?,
                }
            };

            if let Err(e) = ensure_connection(&mut inner, cfg, &target).await {
                if !e.is_transient() {
                    return Err(e);
                }
                debug!(node = %target, error = %e, "connect failed, will retry on a random node");
                last_err = e.to_string();
                try_random = true;
                if ttl < cfg.max_redirections / 2 {
                    sleep(BACKOFF).await;
                }
                continue;
            }
            let Some(conn) = inner.pool.get_mut(&target) else {
                try_random = true;
                continue;
            };

            if asking {
                asking = false;
                // one-shot signal that we are deliberately following an
                // ASK redirect into a mid-migration slot
                if let Err(e) = conn.request(&[Bytes::from_static(b"ASKING")]).await {
                    last_err = e.to_string();
                    inner.pool.remove(&target).await;
                    try_random = true;
                    if ttl < cfg.max_redirections / 2 {
                        sleep(BACKOFF).await;
                    }
                    continue;
                }
            }

            match conn.request(&args).await {
                Ok(Frame::Error(message)) => {
                    let Some(redirection) = redirect::decode(&message) else {
                        return Err(ClusterError::Server(message));
                    };
                    debug!(%message, "following redirection");
                    match redirection.kind {
                        RedirectKind::Ask => {
                            asking = true;
                            next_target = Some(redirection.addr);
                        }
                        RedirectKind::Moved => {
                            // patch the one slot optimistically, but a
                            // MOVED usually means many slots moved, so
                            // schedule a full rebuild too
                            inner
                                .topology
                                .set_owner(redirection.slot, &redirection.addr);
                            inner.topology.mark_stale();
                        }
                    }
                    last_err = message;
                }
                Ok(frame) => return Ok(frame),
                Err(e) if e.is_transient() => {
                    warn!(node = %target, error = %e, "transport failure, retrying on a random node");
                    last_err = e.to_string();
                    inner.pool.remove(&target).await;
                    try_random = true;
                    if ttl < cfg.max_redirections / 2 {
                        sleep(BACKOFF).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Err(ClusterError::TooManyRedirections { last: last_err })
    }

    /// Runs one command against every known node independently and
    /// collects per-node replies. No routing, no retry protocol.
    pub async fn broadcast(&self, args: Vec<Bytes>) -> BTreeMap<String, Result<Frame>> {
        let mut inner = self.inner.lock().await;
        let nodes = inner.registry.nodes().to_vec();
        let mut replies = BTreeMap::new();

        for node in nodes {
            let reply = match ensure_connection(&mut inner, &self.config, &node.name).await {
                Ok(()) => match inner.pool.get_mut(&node.name) {
                    Some(conn) => conn.request(&args).await,
                    None => Err(ClusterError::NoReachableNode {
                        last: format!("{}: evicted before use", node.name),
                    }),
                },
                Err(e) => Err(e),
            };
            if reply.is_err() {
                inner.pool.remove(&node.name).await;
            }
            replies.insert(node.name, reply);
        }
        replies
    }

    /// Names of every known node, first-seen order.
    pub async fn known_nodes(&self) -> Vec<String> {
        let inner = self.inner.lock().await;
        inner.registry.nodes().iter().map(|n| n.name.clone()).collect()
    }

    /// Current owner of a slot, if known.
    pub async fn slot_owner(&self, slot: u16) -> Option<String> {
        let inner = self.inner.lock().await;
        inner.topology.owner(slot).map(str::to_owned)
    }

    /// Closes every pooled connection. The client can be used again
    /// afterwards; connections re-establish lazily.
    pub async fn shutdown(&self) {
        let mut inner = self.inner.lock().await;
        inner.pool.clear().await;
    }
}

/// Extracts the key a command routes on. Administrative commands have
/// no key and cannot go through slot dispatch.
fn routing_key(args: &[Bytes]) -> Result<&[u8]> {
    let name = args.first().ok_or(ClusterError::Unroutable)?;
    let name = std::str::from_utf8(name).map_err(|_| ClusterError::Unroutable)?;
    if KEYLESS_COMMANDS.contains(&name.to_ascii_uppercase().as_str()) {
        return Err(ClusterError::Unroutable);
    }
    args.get(1).map(|b| b.as_ref()).ok_or(ClusterError::Unroutable)
}

/// Rebuilds the slot map by walking the seed list in order; the first
/// node that answers the topology query wins. A single reachable node
/// is enough; the client always defers to what the cluster reports.
async fn rebuild(inner: &mut Inner, cfg: &ClusterConfig) -> Result<()> {
    let seeds = inner.registry.nodes().to_vec();
    for node in seeds {
        let mut conn = match NodeConnection::connect(&node.ip, node.port, cfg.timeout).await {
            Ok(conn) => conn,
            Err(e) => {
                debug!(node = %node.name, error = %e, "seed unreachable during topology rebuild");
                continue;
            }
        };
        let reply = match conn
            .request(&[Bytes::from_static(b"CLUSTER"), Bytes::from_static(b"SLOTS")])
            .await
        {
            Ok(Frame::Error(message)) => {
                debug!(node = %node.name, %message, "seed rejected topology query");
                continue;
            }
            Ok(reply) => reply,
            Err(e) => {
                debug!(node = %node.name, error = %e, "topology query failed");
                continue;
            }
        };
        match inner.topology.apply_slots_reply(&reply) {
            Ok(discovered) => {
                debug!(seed = %node.name, nodes = discovered.len(), "topology rebuilt");
                inner.registry.merge(discovered);
                inner.pool.put(&node.name, conn).await;
                return Ok(());
            }
            Err(e) => {
                debug!(node = %node.name, error = %e, "malformed topology reply");
            }
        }
    }
    Err(ClusterError::StartupNodesUnreachable)
}

/// Last line of defense when slot ownership is unknown or a targeted
/// node is unreachable: probe known nodes in shuffled order and return
/// the name of the first one with a live pooled connection.
async fn random_node(inner: &mut Inner, cfg: &ClusterConfig) -> Result<String> {
    let mut last = String::from("no candidate nodes");
    for node in inner.registry.shuffled() {
        if inner.pool.contains(&node.name) {
            let alive = match inner.pool.get_mut(&node.name) {
                Some(conn) => conn.ping().await.unwrap_or(false),
                None => false,
            };
            if alive {
                return Ok(node.name);
            }
            debug!(node = %node.name, "pooled connection failed liveness probe");
            last = format!("{}: liveness probe failed", node.name);
            inner.pool.remove(&node.name).await;
            continue;
        }
        match NodeConnection::connect(&node.ip, node.port, cfg.timeout).await {
            Ok(mut conn) => {
                if conn.ping().await.unwrap_or(false) {
                    inner.pool.put(&node.name, conn).await;
                    return Ok(node.name);
                }
                // never leave an unhealthy handle open
                let _ = conn.shutdown().await;
                last = format!("{}: liveness probe failed", node.name);
            }
            Err(e) => {
                debug!(node = %node.name, error = %e, "candidate unreachable");
                last = format!("{}: {e}", node.name);
            }
        }
    }
    Err(ClusterError::NoReachableNode { last })
}

/// Establishes a pooled connection for `name` if none exists. Targets
/// reported by redirections may not be in the registry yet; their
/// `ip:port` name carries enough to dial them directly.
async fn ensure_connection(inner: &mut Inner, cfg: &ClusterConfig, name: &str) -> Result<()> {
    if inner.pool.contains(name) {
        return Ok(());
    }
    let (ip, port) = match inner.registry.get(name) {
        Some(node) => (node.ip.clone(), node.port),
        None => {
            let node = NodeDescriptor::from_name(name)?;
            (node.ip, node.port)
        }
    };
    let conn = NodeConnection::connect(&ip, port, cfg.timeout).await?;
    inner.pool.put(name, conn).await;
    Ok(())
}
