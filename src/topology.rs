//! The slot-to-node map and its staleness flag.
//!
//! The client holds no authority of its own: the map is whatever one
//! live node last reported via the cluster-slots query. A stale map is
//! rebuilt in full before the next dispatch, because a single MOVED
//! usually means many slots moved together.

use crate::error::{ClusterError, Result};
use crate::frame::Frame;
use crate::node::NodeDescriptor;
use crate::slot::SLOT_COUNT;

pub struct TopologyState {
    /// One owner name (`"ip:port"`) per slot; `None` means unknown,
    /// which falls back to random node selection.
    slots: Vec<Option<String>>,
    stale: bool,
}

impl TopologyState {
    /// An empty map, marked stale so the first dispatch rebuilds it.
    pub fn new() -> Self {
        Self {
            slots: vec![None; SLOT_COUNT as usize],
            stale: true,
        }
    }

    /// Owner of `slot`, or `None` when unknown or out of range.
    pub fn owner(&self, slot: u16) -> Option<&str> {
        self.slots.get(slot as usize)?.as_deref()
    }

    /// Patches a single slot's owner, as learned from a MOVED reply.
    /// Out-of-range slots are ignored.
    pub fn set_owner(&mut self, slot: u16, name: &str) {
        if let Some(entry) = self.slots.get_mut(slot as usize) {
            *entry = Some(name.to_string());
        }
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Schedules a full rebuild before the next dispatch.
    pub fn mark_stale(&mut self) {
        self.stale = true;
    }

    /// Number of slots with a known owner.
    pub fn assigned(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Replaces the whole map from a cluster-slots reply and clears the
    /// stale flag, returning one descriptor per unique endpoint. On a
    /// malformed reply the map is left untouched so the caller can try
    /// the next seed node.
    pub fn apply_slots_reply(&mut self, reply: &Frame) -> Result<Vec<NodeDescriptor>> {
        let ranges = match reply {
            Frame::Array(items) => items,
            other => {
                return Err(ClusterError::Protocol(format!(
                    "cluster slots reply is not an array: {other:?}"
                )));
            }
        };

        let mut slots: Vec<Option<String>> = vec![None; SLOT_COUNT as usize];
        let mut discovered: Vec<NodeDescriptor> = Vec::new();

        for range in ranges {
            let (start, end, node) = parse_range(range)?;
            for slot in start..=end {
                slots[slot as usize] = Some(node.name.clone());
            }
            if !discovered.contains(&node) {
                discovered.push(node);
            }
        }

        self.slots = slots;
        self.stale = false;
        Ok(discovered)
    }
}

impl Default for TopologyState {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TopologyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopologyState")
            .field("assigned", &self.assigned())
            .field("stale", &self.stale)
            .finish()
    }
}

/// One range entry: `[start, end, [ip, port, ...], ...replicas]`; only
/// the first endpoint (the owner) matters for routing.
fn parse_range(range: &Frame) -> Result<(u16, u16, NodeDescriptor)> {
    let items = match range {
        Frame::Array(items) if items.len() >= 3 => items,
        other => {
            return Err(ClusterError::Protocol(format!(
                "bad slot range entry: {other:?}"
            )));
        }
    };

    let start = range_bound(&items[0])?;
    let end = range_bound(&items[1])?;
    if start > end {
        return Err(ClusterError::Protocol(format!(
            "inverted slot range {start}..{end}"
        )));
    }

    let endpoint = match &items[2] {
        Frame::Array(parts) if parts.len() >= 2 => parts,
        other => {
            return Err(ClusterError::Protocol(format!(
                "bad slot range endpoint: {other:?}"
            )));
        }
    };
    let ip = match &endpoint[0] {
        Frame::Bulk(b) => std::str::from_utf8(b)
            .map_err(|_| ClusterError::Protocol("endpoint ip is not utf-8".into()))?,
        Frame::Simple(s) => s.as_str(),
        other => {
            return Err(ClusterError::Protocol(format!(
                "endpoint ip is not a string: {other:?}"
            )));
        }
    };
    let port = match &endpoint[1] {
        Frame::Integer(n) if (0..=u16::MAX as i64).contains(n) => *n as u16,
        other => {
            return Err(ClusterError::Protocol(format!(
                "endpoint port is not a valid integer: {other:?}"
            )));
        }
    };

    Ok((start, end, NodeDescriptor::from_endpoint(ip, port)))
}

fn range_bound(frame: &Frame) -> Result<u16> {
    match frame {
        Frame::Integer(n) if (0..SLOT_COUNT as i64).contains(n) => Ok(*n as u16),
        other => Err(ClusterError::Protocol(format!(
            "slot bound out of range: {other:?}"
        ))),
    }
}
