//! Compile-time capacity and timing knobs.
//!
//! All resource tables in the core are fixed-size; these constants are the
//! single place that size is decided. Enable the `small` feature to shrink
//! every table for memory-constrained targets without touching call sites.

/// Maximum transmission unit: the largest link-layer payload.
pub const MTU: usize = 1500;

/// Ethernet header size (dest MAC + src MAC + EtherType).
pub const ETHERNET_HEADER_LEN: usize = 14;

/// Fixed IPv6 header size.
pub const IPV6_HEADER_LEN: usize = 40;

/// TX/RX buffer capacity: Ethernet + IPv6 + UDP headers plus a full MTU of
/// payload, so a boundary-case `payload.len() == MTU` send never overruns
/// the backing array.
pub const BUFFER_CAPACITY: usize = ETHERNET_HEADER_LEN + IPV6_HEADER_LEN + 8 + MTU;

/// TCP maximum segment size (IPv6 minimum MTU minus headers).
pub const TCP_MSS: usize = 1280;

/// Hard retry cap for a single outstanding TCP-Lite segment.
pub const RTNET_TCP_MAX_RETRIES: u8 = 3;

/// Idle timeout driving both retransmission and forced connection close.
pub const RTNET_TCP_TIMEOUT_MS: u32 = 5_000;

/// First ephemeral port handed out by the allocator.
pub const EPHEMERAL_PORT_BASE: u16 = 49_152;

/// Neighbor cache entry reachability horizon.
pub const NEIGHBOR_AGING_MS: u32 = 30_000;

/// Routing table entry aging horizon (not applied to the link-local default).
pub const ROUTE_AGING_MS: u32 = 300_000;

#[cfg(not(feature = "small"))]
mod capacities {
    /// RX buffer pool size.
    pub const RX_POOL_SIZE: usize = 8;
    /// TX buffer pool size.
    pub const TX_POOL_SIZE: usize = 8;
    /// Routing table capacity.
    pub const MAX_ROUTING_ENTRIES: usize = 32;
    /// Neighbor cache capacity.
    pub const MAX_NEIGHBOR_ENTRIES: usize = 16;
    /// TCP-Lite connection table capacity.
    pub const MAX_TCP_CONNECTIONS: usize = 4;
    /// mDNS record cache capacity.
    pub const MDNS_CACHE_SIZE: usize = 8;
    /// UDP port-listener registry capacity.
    pub const MAX_UDP_LISTENERS: usize = 8;
    /// Outstanding unacknowledged TCP-Lite segments tracked per connection.
    pub const TCP_SEND_LOG_CAPACITY: usize = 4;
}

#[cfg(feature = "small")]
mod capacities {
    pub const RX_POOL_SIZE: usize = 2;
    pub const TX_POOL_SIZE: usize = 2;
    pub const MAX_ROUTING_ENTRIES: usize = 8;
    pub const MAX_NEIGHBOR_ENTRIES: usize = 4;
    pub const MAX_TCP_CONNECTIONS: usize = 2;
    pub const MDNS_CACHE_SIZE: usize = 2;
    pub const MAX_UDP_LISTENERS: usize = 2;
    pub const TCP_SEND_LOG_CAPACITY: usize = 2;
}

pub use capacities::*;
