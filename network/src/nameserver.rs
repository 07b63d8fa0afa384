//! Nameserver pool
//!
//! Fixed-capacity list of DNS servers, each with a lifetime. The most
//! recently updated entry is the primary one.

use heapless::Vec;
use smoltcp::wire::Ipv4Address;

/// Number of nameservers kept at once
pub const NAMESERVER_POOL_SIZE: usize = 2;

/// How long a nameserver entry stays valid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
    /// Never expires
    Infinite,
    /// Expires after the given number of seconds
    Seconds(u32),
}

impl Lifetime {
    fn remaining(&self) -> u64 {
        match self {
            Lifetime::Infinite => u64::MAX,
            Lifetime::Seconds(secs) => u64::from(*secs),
        }
    }
}

/// A nameserver and its remaining lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nameserver {
    pub addr: Ipv4Address,
    pub lifetime: Lifetime,
}

#[derive(Debug, Clone, Default)]
pub struct NameserverPool {
    entries: Vec<Nameserver, NAMESERVER_POOL_SIZE>,
}

impl NameserverPool {
    pub const fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Add, refresh or remove a nameserver
    ///
    /// A zero lifetime removes `addr`. Otherwise the entry is refreshed or
    /// added (evicting the shortest-lived entry when the pool is full) and
    /// moved to the front.
    pub fn update(&mut self, addr: Ipv4Address, lifetime: Lifetime) {
        if let Some(pos) = self.entries.iter().position(|ns| ns.addr == addr) {
            self.entries.remove(pos);
        }

        if lifetime == Lifetime::Seconds(0) {
            return;
        }

        if self.entries.is_full() {
            if let Some(pos) = self
                .entries
                .iter()
                .enumerate()
                .min_by_key(|(_, ns)| ns.lifetime.remaining())
                .map(|(pos, _)| pos)
            {
                self.entries.remove(pos);
            }
        }

        // Cannot fail: at least one slot was freed above
        let _ = self.entries.insert(0, Nameserver { addr, lifetime });
    }

    /// Count finite lifetimes down, dropping entries that run out
    pub fn age(&mut self, elapsed_secs: u32) {
        if elapsed_secs == 0 {
            return;
        }
        for ns in self.entries.iter_mut() {
            if let Lifetime::Seconds(secs) = &mut ns.lifetime {
                *secs = secs.saturating_sub(elapsed_secs);
            }
        }
        self.entries.retain(|ns| ns.lifetime != Lifetime::Seconds(0));
    }

    /// The nameserver queries should go to first
    pub fn primary(&self) -> Option<&Nameserver> {
        self.entries.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Nameserver> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
