//! Bounded cache of live node connections.
//!
//! Entries are keyed by node name. The pool never holds more than
//! `capacity` connections; inserting beyond capacity evicts the
//! oldest-inserted entry first. Eviction and removal close the
//! underlying transport best-effort, logging and ignoring close
//! failures.

use std::collections::{HashMap, VecDeque};

use tracing::{debug, warn};

use crate::connection::NodeConnection;

/// Outcome of a best-effort removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// Entry existed and its transport shut down cleanly.
    Closed,
    /// Entry existed but the close failed; the failure is ignored.
    CloseFailed,
    /// No entry under that name.
    NotPresent,
}

#[derive(Debug)]
pub struct ConnectionPool {
    entries: HashMap<String, NodeConnection>,
    /// Insertion order, for deterministic oldest-first eviction.
    order: VecDeque<String>,
    capacity: usize,
}

impl ConnectionPool {
    /// Creates a pool holding at most `capacity` connections (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut NodeConnection> {
        self.entries.get_mut(name)
    }

    /// Inserts a connection under `name`, evicting the oldest entry
    /// first if the pool is full. Re-inserting an existing name replaces
    /// the old connection (closed best-effort) without eviction.
    pub async fn put(&mut self, name: &str, conn: NodeConnection) {
        if let Some(mut old) = self.entries.remove(name) {
            self.order.retain(|n| n != name);
            if old.shutdown().await.is_err() {
                debug!(node = %name, "close of replaced connection failed");
            }
        } else if self.entries.len() >= self.capacity {
            self.evict_oldest().await;
        }
        self.entries.insert(name.to_string(), conn);
        self.order.push_back(name.to_string());
    }

    /// Removes and closes the entry under `name`, reporting the outcome.
    pub async fn remove(&mut self, name: &str) -> Removal {
        let Some(mut conn) = self.entries.remove(name) else {
            return Removal::NotPresent;
        };
        self.order.retain(|n| n != name);
        match conn.shutdown().await {
            Ok(()) => Removal::Closed,
            Err(e) => {
                warn!(node = %name, error = %e, "connection close failed, ignoring");
                Removal::CloseFailed
            }
        }
    }

    /// Closes every pooled connection. Used at client shutdown.
    pub async fn clear(&mut self) {
        for (name, mut conn) in self.entries.drain() {
            if conn.shutdown().await.is_err() {
                debug!(node = %name, "close during shutdown failed");
            }
        }
        self.order.clear();
    }

    async fn evict_oldest(&mut self) {
        while let Some(name) = self.order.pop_front() {
            if let Some(mut conn) = self.entries.remove(&name) {
                debug!(node = %name, "evicting oldest pooled connection");
                if conn.shutdown().await.is_err() {
                    debug!(node = %name, "close of evicted connection failed");
                }
                return;
            }
        }
    }
}
