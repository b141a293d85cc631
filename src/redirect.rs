//! Decoding of server redirection replies.
//!
//! The server signals slot movement through error replies whose first
//! token is `MOVED` or `ASK`, followed by the slot and the owning
//! node's `host:port`. Keeping the decode separate from the dispatch
//! loop isolates wire-format parsing from control flow.

use crate::slot::SLOT_COUNT;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectKind {
    /// Permanent reassignment; patch the slot map and schedule a full
    /// topology rebuild.
    Moved,
    /// Mid-migration redirect for one slot; follow once, never persist.
    Ask,
}

/// A parsed redirection signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirection {
    pub kind: RedirectKind,
    pub slot: u16,
    /// Target node name (`"ip:port"`).
    pub addr: String,
}

/// Decodes an error reply into a redirection, or `None` for any other
/// application error.
pub fn decode(message: &str) -> Option<Redirection> {
    let mut tokens = message.split_whitespace();
    let kind = match tokens.next()? {
        "MOVED" => RedirectKind::Moved,
        "ASK" => RedirectKind::Ask,
        _ => return None,
    };
    let slot: u16 = tokens.next()?.parse().ok()?;
    if slot >= SLOT_COUNT {
        return None;
    }
    let addr = tokens.next()?;
    if !addr.contains(':') {
        return None;
    }
    Some(Redirection {
        kind,
        slot,
        addr: addr.to_string(),
    })
}
