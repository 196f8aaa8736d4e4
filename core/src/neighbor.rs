//! Neighbor cache: IPv6-to-MAC mapping populated by Neighbor Discovery,
//! aged by time since last confirmation.

use crate::addr::{Ipv6Address, MacAddress};
use crate::config::NEIGHBOR_AGING_MS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReachabilityState {
    Reachable,
    Stale,
    Probe,
}

#[derive(Debug, Clone, Copy)]
pub struct NeighborEntry {
    pub addr: Ipv6Address,
    pub mac: MacAddress,
    pub state: ReachabilityState,
    pub last_confirmed_ms: u32,
    pub valid: bool,
}

impl NeighborEntry {
    const fn empty() -> Self {
        Self {
            addr: Ipv6Address::UNSPECIFIED,
            mac: MacAddress::ZERO,
            state: ReachabilityState::Stale,
            last_confirmed_ms: 0,
            valid: false,
        }
    }
}

pub struct NeighborCache<const N: usize> {
    entries: [NeighborEntry; N],
}

impl<const N: usize> NeighborCache<N> {
    pub const fn new() -> Self {
        Self {
            entries: [NeighborEntry::empty(); N],
        }
    }

    /// Linear, constant-time-per-entry lookup; refreshes the stamp on hit.
    pub fn lookup(&mut self, addr: &Ipv6Address, now_ms: u32) -> Option<MacAddress> {
        for e in self.entries.iter_mut() {
            if e.valid && e.addr.const_eq(addr) {
                e.last_confirmed_ms = now_ms;
                return Some(e.mac);
            }
        }
        None
    }

    /// Inserts/overwrites, selecting a free slot if any, else evicting the
    /// entry with the oldest `last_confirmed_ms`.
    pub fn insert(
        &mut self,
        addr: Ipv6Address,
        mac: MacAddress,
        state: ReachabilityState,
        now_ms: u32,
    ) {
        if let Some(idx) = self.entries.iter().position(|e| e.valid && e.addr.const_eq(&addr)) {
            let e = &mut self.entries[idx];
            e.mac = mac;
            e.state = state;
            e.last_confirmed_ms = now_ms;
            return;
        }
        let idx = match self.entries.iter().position(|e| !e.valid) {
            Some(idx) => idx,
            None => self.oldest_index(),
        };
        self.entries[idx] = NeighborEntry {
            addr,
            mac,
            state,
            last_confirmed_ms: now_ms,
            valid: true,
        };
    }

    fn oldest_index(&self) -> usize {
        self.entries
            .iter()
            .enumerate()
            .min_by_key(|(_, e)| e.last_confirmed_ms)
            .map(|(idx, _)| idx)
            .unwrap_or(0)
    }

    /// Processes an externally-supplied Neighbor Advertisement: updates (or
    /// inserts) the entry and marks it reachable.
    pub fn on_advertisement(&mut self, addr: Ipv6Address, mac: MacAddress, now_ms: u32) {
        self.insert(addr, mac, ReachabilityState::Reachable, now_ms);
    }

    /// Invalidates entries unconfirmed for longer than `NEIGHBOR_AGING_MS`.
    pub fn age(&mut self, now_ms: u32) {
        for e in self.entries.iter_mut() {
            if e.valid && now_ms.wrapping_sub(e.last_confirmed_ms) > NEIGHBOR_AGING_MS {
                e.valid = false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(last: u8) -> Ipv6Address {
        Ipv6Address::new([0xfe, 0x80, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, last])
    }
    fn mac(last: u8) -> MacAddress {
        MacAddress::new([0, 0, 0, 0, 0, last])
    }

    #[test]
    fn insert_and_lookup() {
        let mut c: NeighborCache<4> = NeighborCache::new();
        c.insert(addr(1), mac(1), ReachabilityState::Reachable, 0);
        assert_eq!(c.lookup(&addr(1), 5), Some(mac(1)));
    }

    #[test]
    fn evicts_oldest_when_full() {
        let mut c: NeighborCache<2> = NeighborCache::new();
        c.insert(addr(1), mac(1), ReachabilityState::Reachable, 10);
        c.insert(addr(2), mac(2), ReachabilityState::Reachable, 20);
        c.insert(addr(3), mac(3), ReachabilityState::Reachable, 30);
        assert_eq!(c.lookup(&addr(1), 40), None);
        assert_eq!(c.lookup(&addr(2), 40), Some(mac(2)));
        assert_eq!(c.lookup(&addr(3), 40), Some(mac(3)));
    }

    #[test]
    fn ages_out_stale_entries() {
        let mut c: NeighborCache<4> = NeighborCache::new();
        c.insert(addr(1), mac(1), ReachabilityState::Reachable, 0);
        c.age(NEIGHBOR_AGING_MS + 1);
        assert_eq!(c.lookup(&addr(1), NEIGHBOR_AGING_MS + 1), None);
    }

    #[test]
    fn advertisement_refreshes_existing_entry() {
        let mut c: NeighborCache<4> = NeighborCache::new();
        c.insert(addr(1), mac(1), ReachabilityState::Stale, 0);
        c.on_advertisement(addr(1), mac(9), 100);
        assert_eq!(c.lookup(&addr(1), 100), Some(mac(9)));
    }
}
