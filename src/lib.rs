//! # slotline
//!
//! Cluster-aware client router for slot-sharded key-value stores.
//!
//! The keyspace is partitioned into 16384 hash slots spread across a
//! dynamic set of nodes. slotline locates the node owning a key's slot
//! without a central coordinator, routes commands there, and follows the
//! server's live migration signals:
//!
//! - **Slot routing**: CRC16-based slot computation with hash-tag support
//! - **Topology bootstrap**: the slot map is learned from any one
//!   reachable startup node and refreshed when the cluster reshards
//! - **Redirection protocol**: MOVED patches the map and schedules a
//!   rebuild; ASK is followed once without persisting
//! - **Bounded pooling**: at most `max_connections` live connections,
//!   oldest evicted first
//! - **Fallback**: transport failures retry against random known nodes
//!   within a fixed redirection budget
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use slotline::{ClusterClient, ClusterConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClusterConfig::new([("127.0.0.1", 7000), ("127.0.0.1", 7001)]);
//!     let client = ClusterClient::connect(config).await?;
//!
//!     client.kv().set("user:1", "ada").await?;
//!     let value = client.kv().get("user:1").await?;
//!     println!("value: {value:?}");
//!
//!     Ok(())
//! }
//! ```

pub mod admin;
pub mod client;
pub mod connection;
pub mod error;
pub mod frame;
pub mod kv;
pub mod list;
pub mod node;
pub mod pool;
pub mod redirect;
pub mod slot;
pub mod topology;

pub use admin::AdminCommands;
pub use client::{ClusterClient, ClusterConfig};
pub use error::{ClusterError, Result};
pub use frame::Frame;
pub use kv::KvCommands;
pub use list::{ListCommands, ListEnd};
pub use node::{NodeDescriptor, NodeRegistry};
pub use pool::{ConnectionPool, Removal};
pub use redirect::{RedirectKind, Redirection};
pub use slot::{SLOT_COUNT, ensure_same_slot, key_slot};
pub use topology::TopologyState;
