//! Per-miner telemetry registry
//!
//! Maps each sender IP to the most recent JSON document it broadcast.
//! Later documents replace earlier ones wholesale; there is no field-level
//! merge and no history. An address gains an entry only once at least one
//! of its datagrams parsed as JSON.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::net::IpAddr;

use chrono::{DateTime, Local};
use serde_json::Value;

/// Placeholder shown when a document carries no name field
pub const UNKNOWN_NAME: &str = "Unknown";

// ============================================================================
// Registry Structures
// ============================================================================

/// Latest state observed for one miner
pub struct MinerEntry {
    /// Most recent parsed document
    pub doc: Value,
    /// When the last parsed document arrived
    pub last_seen: DateTime<Local>,
    /// How many parsed documents this address has contributed
    pub updates: u64,
}

/// Registry of miners keyed by sender IP
///
/// Iteration follows first-seen order so the running summary stays stable
/// while miners keep broadcasting.
#[derive(Default)]
pub struct MinerRegistry {
    miners: HashMap<IpAddr, MinerEntry>,
    order: Vec<IpAddr>,
}

impl MinerRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a parsed document for a sender, replacing any previous entry
    pub fn record(&mut self, ip: IpAddr, doc: Value, seen_at: DateTime<Local>) {
        match self.miners.entry(ip) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                entry.doc = doc;
                entry.last_seen = seen_at;
                entry.updates += 1;
            }
            Entry::Vacant(vacant) => {
                self.order.push(ip);
                vacant.insert(MinerEntry {
                    doc,
                    last_seen: seen_at,
                    updates: 1,
                });
            }
        }
    }

    /// Number of distinct miner addresses seen so far
    pub fn count(&self) -> usize {
        self.miners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.miners.is_empty()
    }

    /// Entries in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&IpAddr, &MinerEntry)> {
        self.order
            .iter()
            .filter_map(move |ip| self.miners.get(ip).map(|entry| (ip, entry)))
    }
}

/// Best-effort display name for a miner document.
///
/// Firmware variants disagree on key case, so "Name" is tried before "name".
pub fn display_name(doc: &Value) -> String {
    for key in ["Name", "name"] {
        if let Some(value) = doc.get(key) {
            return match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
        }
    }
    UNKNOWN_NAME.to_string()
}
