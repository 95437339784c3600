// # Address Cache
//
// In-memory record of the last address known for each managed host.
//
// ## Crash Behavior
//
// - All state is lost on restart
// - The first pass after a restart re-seeds every host from DNS, once
// - Nothing is ever written to disk
//
// ## Entry States
//
// - No entry: the host has not been seen since the process started
// - `Some(None)`: seen, but DNS published no usable address
// - `Some(Some(ip))`: the last address updated to (or the DNS baseline)

use std::collections::HashMap;
use std::net::Ipv6Addr;

/// Last-known address per host name
///
/// Owned by the reconciliation engine, which guards it with a lock; the cache
/// itself does no synchronization.
#[derive(Debug, Clone, Default)]
pub struct AddressCache {
    entries: HashMap<String, Option<Ipv6Addr>>,
}

impl AddressCache {
    /// Create a new empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a host
    ///
    /// The outer `Option` is entry presence; the inner one is the address,
    /// which may be unknown.
    pub fn get(&self, host_name: &str) -> Option<Option<Ipv6Addr>> {
        self.entries.get(host_name).copied()
    }

    /// Whether the host has an entry
    pub fn contains(&self, host_name: &str) -> bool {
        self.entries.contains_key(host_name)
    }

    /// Insert or overwrite the entry for a host
    pub fn insert(&mut self, host_name: impl Into<String>, address: Option<Ipv6Addr>) {
        self.entries.insert(host_name.into(), address);
    }

    /// Get the number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
