//! mDNS service-discovery façade: a TTL-indexed record cache.
//!
//! The façade is deliberately a pure cache. Parsing an actual DNS-SD
//! response off the wire is an external collaborator's job (the real mDNS
//! responder, out of scope per the top-level purpose); [`MdnsCache::learn`]
//! is the seam that responder calls through once it has done that parsing.
//! Without that seam `query` could never return anything but a timeout in
//! any deployment, hosted or embedded.

use crate::error::{NetError, NetResult};
use crate::addr::Ipv6Address;

/// Maximum service name length.
pub const MAX_NAME_LEN: usize = 63;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServiceName {
    len: usize,
    bytes: [u8; MAX_NAME_LEN],
}

impl ServiceName {
    pub fn new(name: &str) -> NetResult<Self> {
        let bytes_in = name.as_bytes();
        if bytes_in.is_empty() || bytes_in.len() > MAX_NAME_LEN {
            return Err(NetError::InvalidParam);
        }
        let mut bytes = [0u8; MAX_NAME_LEN];
        bytes[..bytes_in.len()].copy_from_slice(bytes_in);
        Ok(Self { len: bytes_in.len(), bytes })
    }

    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.bytes[..self.len]).unwrap_or("")
    }

    fn matches(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MdnsRecord {
    pub name: ServiceName,
    pub addr: Ipv6Address,
    pub port: u16,
    pub ttl_ms: u32,
    pub last_seen_ms: u32,
    pub valid: bool,
}

impl MdnsRecord {
    const fn empty() -> Self {
        Self {
            name: ServiceName { len: 0, bytes: [0u8; MAX_NAME_LEN] },
            addr: Ipv6Address::UNSPECIFIED,
            port: 0,
            ttl_ms: 0,
            last_seen_ms: 0,
            valid: false,
        }
    }
}

/// An announcement this stack has registered for periodic re-advertisement.
/// Emitting the actual multicast packet is the caller's (`Stack`'s) job.
#[derive(Clone, Copy)]
pub struct Announcement {
    pub name: ServiceName,
    pub port: u16,
    pub ttl_ms: u32,
    pub last_announced_ms: u32,
    pub valid: bool,
}

impl Announcement {
    const fn empty() -> Self {
        Self {
            name: ServiceName { len: 0, bytes: [0u8; MAX_NAME_LEN] },
            port: 0,
            ttl_ms: 0,
            last_announced_ms: 0,
            valid: false,
        }
    }
}

pub struct MdnsCache<const N: usize> {
    records: [MdnsRecord; N],
    announcements: [Announcement; N],
}

impl<const N: usize> MdnsCache<N> {
    pub const fn new() -> Self {
        Self {
            records: [const { MdnsRecord::empty() }; N],
            announcements: [const { Announcement::empty() }; N],
        }
    }

    /// Exact name match among valid records.
    pub fn query(&self, name: &str) -> NetResult<MdnsRecord> {
        if name.is_empty() {
            return Err(NetError::InvalidParam);
        }
        self.records
            .iter()
            .find(|r| r.valid && r.name.matches(name))
            .copied()
            .ok_or(NetError::Timeout)
    }

    /// The injection point an external mDNS responder calls once it has
    /// parsed a DNS-SD response, populating/refreshing the cache entry
    /// `query` reads from.
    pub fn learn(&mut self, name: &str, addr: Ipv6Address, port: u16, ttl_sec: u32, now_ms: u32) -> NetResult<()> {
        if port == 0 || ttl_sec == 0 {
            return Err(NetError::InvalidParam);
        }
        let sname = ServiceName::new(name)?;
        if let Some(r) = self.records.iter_mut().find(|r| r.valid && r.name.matches(name)) {
            r.addr = addr;
            r.port = port;
            r.ttl_ms = ttl_sec * 1000;
            r.last_seen_ms = now_ms;
            return Ok(());
        }
        match self.records.iter().position(|r| !r.valid) {
            Some(idx) => {
                self.records[idx] = MdnsRecord {
                    name: sname,
                    addr,
                    port,
                    ttl_ms: ttl_sec * 1000,
                    last_seen_ms: now_ms,
                    valid: true,
                };
                Ok(())
            }
            None => Err(NetError::Overflow),
        }
    }

    /// Registers the local service for periodic multicast advertisement.
    pub fn announce(&mut self, name: &str, port: u16, ttl_sec: u32, now_ms: u32) -> NetResult<()> {
        if port == 0 || ttl_sec == 0 {
            return Err(NetError::InvalidParam);
        }
        let sname = ServiceName::new(name)?;
        if let Some(a) = self.announcements.iter_mut().find(|a| a.valid && a.name.matches(name)) {
            a.port = port;
            a.ttl_ms = ttl_sec * 1000;
            a.last_announced_ms = now_ms;
            return Ok(());
        }
        match self.announcements.iter().position(|a| !a.valid) {
            Some(idx) => {
                self.announcements[idx] = Announcement {
                    name: sname,
                    port,
                    ttl_ms: ttl_sec * 1000,
                    last_announced_ms: now_ms,
                    valid: true,
                };
                Ok(())
            }
            None => Err(NetError::Overflow),
        }
    }

    pub fn age_records(&mut self, now_ms: u32) {
        for r in self.records.iter_mut() {
            if r.valid && now_ms.wrapping_sub(r.last_seen_ms) > r.ttl_ms {
                r.valid = false;
            }
        }
    }

    /// Returns announcements due for re-transmission (one TTL interval
    /// elapsed since the last), stamping them as freshly announced.
    pub fn due_announcements(&mut self, now_ms: u32) -> impl Iterator<Item = Announcement> + '_ {
        self.announcements.iter_mut().filter_map(move |a| {
            if a.valid && now_ms.wrapping_sub(a.last_announced_ms) >= a.ttl_ms {
                a.last_announced_ms = now_ms;
                Some(*a)
            } else {
                None
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_miss_is_timeout() {
        let c: MdnsCache<4> = MdnsCache::new();
        assert_eq!(c.query("printer.local"), Err(NetError::Timeout));
    }

    #[test]
    fn learn_then_query_hits() {
        let mut c: MdnsCache<4> = MdnsCache::new();
        c.learn("printer.local", Ipv6Address::new([1; 16]), 631, 120, 0).unwrap();
        let rec = c.query("printer.local").unwrap();
        assert_eq!(rec.port, 631);
        assert_eq!(rec.ttl_ms, 120_000);
    }

    #[test]
    fn announce_rejects_zero_port_or_ttl() {
        let mut c: MdnsCache<4> = MdnsCache::new();
        assert_eq!(c.announce("svc.local", 0, 10, 0), Err(NetError::InvalidParam));
        assert_eq!(c.announce("svc.local", 80, 0, 0), Err(NetError::InvalidParam));
    }

    #[test]
    fn records_age_out_by_ttl() {
        let mut c: MdnsCache<4> = MdnsCache::new();
        c.learn("svc.local", Ipv6Address::new([1; 16]), 80, 1, 0).unwrap();
        c.age_records(1001);
        assert_eq!(c.query("svc.local"), Err(NetError::Timeout));
    }
}
