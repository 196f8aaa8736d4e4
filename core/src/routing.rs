//! Routing table: longest-prefix match with metric tie-break, aged by
//! last-use.

use crate::addr::Ipv6Address;
use crate::config::ROUTE_AGING_MS;
use crate::error::{NetError, NetResult};

/// A single routing table entry.
#[derive(Debug, Clone, Copy)]
pub struct RouteEntry {
    pub prefix: Ipv6Address,
    pub prefix_len: u8,
    /// Absent means directly connected.
    pub next_hop: Option<Ipv6Address>,
    pub metric: u16,
    pub last_used_ms: u32,
    pub valid: bool,
    /// The always-present link-local default route is never aged.
    pub permanent: bool,
}

impl RouteEntry {
    const fn empty() -> Self {
        Self {
            prefix: Ipv6Address::UNSPECIFIED,
            prefix_len: 0,
            next_hop: None,
            metric: 0,
            last_used_ms: 0,
            valid: false,
            permanent: false,
        }
    }
}

pub struct RoutingTable<const N: usize> {
    entries: [RouteEntry; N],
}

impl<const N: usize> RoutingTable<N> {
    pub const fn new() -> Self {
        Self {
            entries: [RouteEntry::empty(); N],
        }
    }

    /// Always inserts the link-local default route `fe80::/10`, next-hop
    /// absent, metric 1, permanent (never aged).
    pub fn init_defaults(&mut self, now_ms: u32) {
        let link_local = Ipv6Address::new([0xfe, 0x80, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        let idx = 0;
        self.entries[idx] = RouteEntry {
            prefix: link_local,
            prefix_len: Ipv6Address::LINK_LOCAL_PREFIX_LEN,
            next_hop: None,
            metric: 1,
            last_used_ms: now_ms,
            valid: true,
            permanent: true,
        };
    }

    /// Linear scan for the first invalid slot.
    pub fn add(
        &mut self,
        dst_prefix: Ipv6Address,
        prefix_len: u8,
        next_hop: Option<Ipv6Address>,
        metric: u16,
        now_ms: u32,
    ) -> NetResult<()> {
        if prefix_len > 128 {
            return Err(NetError::InvalidParam);
        }
        let slot = self.entries.iter().position(|e| !e.valid);
        match slot {
            Some(idx) => {
                self.entries[idx] = RouteEntry {
                    prefix: dst_prefix,
                    prefix_len,
                    next_hop,
                    metric,
                    last_used_ms: now_ms,
                    valid: true,
                    permanent: false,
                };
                Ok(())
            }
            None => Err(NetError::Overflow),
        }
    }

    /// Single pass over valid entries; retains the strictly-longer-prefix
    /// match, breaking ties by strictly lower metric. Refreshes the
    /// winner's last-used stamp.
    pub fn find(&mut self, dst: &Ipv6Address, now_ms: u32) -> Option<RouteEntry> {
        let mut best: Option<usize> = None;
        for (idx, e) in self.entries.iter().enumerate() {
            if !e.valid || !dst.matches_prefix(&e.prefix, e.prefix_len) {
                continue;
            }
            best = match best {
                None => Some(idx),
                Some(b) => {
                    let cur = &self.entries[b];
                    if e.prefix_len > cur.prefix_len
                        || (e.prefix_len == cur.prefix_len && e.metric < cur.metric)
                    {
                        Some(idx)
                    } else {
                        Some(b)
                    }
                }
            };
        }
        if let Some(idx) = best {
            self.entries[idx].last_used_ms = now_ms;
            Some(self.entries[idx])
        } else {
            None
        }
    }

    pub fn invalidate(&mut self, dst_prefix: &Ipv6Address, prefix_len: u8) {
        for e in self.entries.iter_mut() {
            if e.valid && !e.permanent && e.prefix_len == prefix_len && e.prefix.const_eq(dst_prefix) {
                e.valid = false;
            }
        }
    }

    /// Invalidates any non-permanent entry unused for longer than
    /// `ROUTE_AGING_MS`.
    pub fn age(&mut self, now_ms: u32) {
        for e in self.entries.iter_mut() {
            if e.valid && !e.permanent && now_ms.wrapping_sub(e.last_used_ms) > ROUTE_AGING_MS {
                e.valid = false;
            }
        }
    }

    pub fn capacity(&self) -> usize {
        N
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(last: u8) -> Ipv6Address {
        Ipv6Address::new([0x20, 0x01, 0x0d, 0xb8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, last])
    }

    #[test]
    fn longest_prefix_wins() {
        let mut t: RoutingTable<8> = RoutingTable::new();
        t.init_defaults(0);
        t.add(addr(0), 112, None, 5, 0).unwrap();
        t.add(addr(1), 128, None, 5, 0).unwrap();
        let found = t.find(&addr(1), 10).unwrap();
        assert_eq!(found.prefix_len, 128);
    }

    #[test]
    fn metric_breaks_tie() {
        let mut t: RoutingTable<8> = RoutingTable::new();
        t.init_defaults(0);
        t.add(addr(0), 112, None, 10, 0).unwrap();
        t.add(addr(0), 112, Some(addr(9)), 3, 0).unwrap();
        let found = t.find(&addr(1), 10).unwrap();
        assert_eq!(found.metric, 3);
    }

    #[test]
    fn overflow_after_capacity() {
        let mut t: RoutingTable<2> = RoutingTable::new();
        t.init_defaults(0);
        t.add(addr(1), 128, None, 1, 0).unwrap();
        assert_eq!(t.add(addr(2), 128, None, 1, 0), Err(NetError::Overflow));
    }

    #[test]
    fn link_local_survives_aging() {
        let mut t: RoutingTable<4> = RoutingTable::new();
        t.init_defaults(0);
        t.age(1_000_000);
        let ll = Ipv6Address::new([0xfe, 0x80, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]);
        assert!(t.find(&ll, 1_000_000).is_some());
    }

    #[test]
    fn fresh_entry_not_aged_before_horizon() {
        let mut t: RoutingTable<4> = RoutingTable::new();
        t.init_defaults(0);
        t.add(addr(1), 128, None, 1, 1_000).unwrap();
        t.age(1_000 + ROUTE_AGING_MS - 1);
        assert!(t.find(&addr(1), 1_000).is_some());
    }
}
