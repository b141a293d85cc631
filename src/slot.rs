//! Hash-slot computation.
//!
//! The keyspace is partitioned into 16384 slots; a key's slot is
//! `CRC16(key) % 16384` using the CRC-16/XMODEM (CCITT) variant the wire
//! protocol mandates. A hash tag (`{...}` substring) forces related keys
//! into the same slot so multi-key commands can span them.

use crate::error::{ClusterError, Result};
use crc::{CRC_16_XMODEM, Crc};

/// Total number of hash slots in the cluster.
pub const SLOT_COUNT: u16 = 16384;

const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// Computes the hash slot for a key.
///
/// If the key contains `{` and a `}` follows with at least one byte in
/// between, only the bytes between the first such brace pair are hashed.
/// An empty (`{}`) or unterminated tag leaves the full key hashed.
pub fn key_slot(key: &[u8]) -> u16 {
    if let Some(open) = memchr::memchr(b'{', key) {
        if let Some(close) = memchr::memchr(b'}', &key[open + 1..]) {
            if close > 0 {
                return CRC16.checksum(&key[open + 1..open + 1 + close]) % SLOT_COUNT;
            }
        }
    }
    CRC16.checksum(key) % SLOT_COUNT
}

/// Validates that every key hashes to the same slot, returning that slot.
///
/// Multi-key commands cannot be served atomically across two owners, so
/// every multi-key wrapper calls this before dispatching anything.
pub fn ensure_same_slot<K: AsRef<[u8]>>(keys: &[K]) -> Result<u16> {
    let mut slots = keys.iter().map(|k| key_slot(k.as_ref()));
    let first = slots.next().ok_or(ClusterError::Unroutable)?;
    for other in slots {
        if other != first {
            return Err(ClusterError::CrossSlots { first, other });
        }
    }
    Ok(first)
}
