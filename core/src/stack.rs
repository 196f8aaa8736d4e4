//! The orchestrator: owns the Context (all tables and pools) and exposes
//! the public operations as inherent methods on `Stack<P>`.
//!
//! Resolves the "shared mutable singleton" redesign flag: the reference
//! treats this as a process-wide global. Here it is an explicit,
//! caller-owned value — typically placed by the integration layer inside
//! their own `static X: Mutex<Stack<P>> = Mutex::new(Stack::new(...))`,
//! mirroring the teacher's own `static FOO: Mutex<T> = Mutex::new(...)`
//! singleton convention — rather than a global baked into this crate.
//!
//! Per-operation logic past the public entry points is free functions
//! rather than private methods: each takes the specific tables it touches
//! by reference, so a `let _cs = self.platform.enter();` borrow held for
//! an operation's duration never conflicts with accessing the rest of the
//! struct — the borrow checker sees disjoint fields, not a re-borrow of
//! `self`.

use crate::addr::{Ipv6Address, MacAddress};
use crate::buffer::{Buffer, BufferPool, QosClass};
use crate::checksum::pseudo_header_checksum;
use crate::config::*;
use crate::error::{NetError, NetResult};
use crate::mdns::{MdnsCache, MdnsRecord};
use crate::neighbor::NeighborCache;
use crate::platform::Platform;
use crate::routing::RoutingTable;
use crate::stats::Statistics;
use crate::tcp::{TcpHandle, TcpState, TcpTable};
use crate::udp::{UdpCallback, UdpListeners};
use crate::wire::ethernet::{EthernetHeader, ETHERTYPE_IPV6};
use crate::wire::icmpv6::Icmpv6Message;
use crate::wire::ipv6::{self, Ipv6Header};
use crate::wire::tcp::{self as tcp_wire, TcpHeader};
use crate::wire::udp::UdpHeader;

/// Run-time configuration, orthogonal to the compile-time table
/// capacities in [`crate::config`].
#[derive(Debug, Clone, Copy)]
pub struct StackConfig {
    /// Whether a frame addressed to a non-local, non-multicast destination
    /// with a matching route is re-transmitted rather than dropped.
    /// Defaults to `false`.
    pub forwarding: bool,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self { forwarding: false }
    }
}

/// The process-wide aggregate: TX pool, routing table, neighbor cache,
/// TCP table, mDNS cache, local identity, statistics, ephemeral-port
/// counter, sequence seed, and initialized flag.
pub struct Stack<P: Platform> {
    platform: P,
    config: StackConfig,
    local_ipv6: Ipv6Address,
    local_mac: MacAddress,
    initialized: bool,
    tx_pool: BufferPool<TX_POOL_SIZE>,
    routes: RoutingTable<MAX_ROUTING_ENTRIES>,
    neighbors: NeighborCache<MAX_NEIGHBOR_ENTRIES>,
    tcp: TcpTable<MAX_TCP_CONNECTIONS>,
    mdns: MdnsCache<MDNS_CACHE_SIZE>,
    udp_listeners: UdpListeners<MAX_UDP_LISTENERS>,
    stats: Statistics,
    next_ephemeral_port: u16,
    seq_seed: u32,
}

impl<P: Platform> Stack<P> {
    /// Constructs an un-initialized stack. Call [`Self::initialize`] before
    /// any other operation.
    pub const fn new(platform: P, config: StackConfig) -> Self {
        Self {
            platform,
            config,
            local_ipv6: Ipv6Address::UNSPECIFIED,
            local_mac: MacAddress::ZERO,
            initialized: false,
            tx_pool: BufferPool::new(),
            routes: RoutingTable::new(),
            neighbors: NeighborCache::new(),
            tcp: TcpTable::new(),
            mdns: MdnsCache::new(),
            udp_listeners: UdpListeners::new(),
            stats: Statistics::new(),
            next_ephemeral_port: EPHEMERAL_PORT_BASE,
            seq_seed: 0,
        }
    }

    fn now_ms(&self) -> u32 {
        self.platform.now_ms()
    }

    // ---------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------

    /// Resets every table, installs the local identity, and inserts the
    /// link-local default route. Statistics are monotonic only within a
    /// single `initialize` epoch.
    pub fn initialize(&mut self, local_ipv6: Ipv6Address, local_mac: MacAddress) -> NetResult<()> {
        let _cs = self.platform.enter();
        if local_ipv6.is_unspecified() || local_mac == MacAddress::ZERO {
            return Err(NetError::InvalidParam);
        }
        let now = self.platform.now_ms();
        self.local_ipv6 = local_ipv6;
        self.local_mac = local_mac;
        self.tx_pool = BufferPool::new();
        self.routes = RoutingTable::new();
        self.neighbors = NeighborCache::new();
        self.tcp = TcpTable::new();
        self.mdns = MdnsCache::new();
        self.udp_listeners = UdpListeners::new();
        self.stats = Statistics::new();
        self.next_ephemeral_port = EPHEMERAL_PORT_BASE;
        self.seq_seed = now;
        self.routes.init_defaults(now);
        self.initialized = true;
        Ok(())
    }

    pub fn get_statistics(&self) -> Statistics {
        self.stats
    }

    // ---------------------------------------------------------------
    // Routing
    // ---------------------------------------------------------------

    pub fn add_route(
        &mut self,
        dst_prefix: Ipv6Address,
        prefix_len: u8,
        next_hop: Option<Ipv6Address>,
        metric: u16,
    ) -> NetResult<()> {
        let _cs = self.platform.enter();
        let now = self.now_ms();
        let result = self.routes.add(dst_prefix, prefix_len, next_hop, metric, now);
        if result.is_err() {
            log::warn!("add_route: routing table overflow");
        }
        result
    }

    // ---------------------------------------------------------------
    // Neighbor discovery
    // ---------------------------------------------------------------

    pub fn on_neighbor_advertisement(&mut self, src: Ipv6Address, mac: MacAddress) -> NetResult<()> {
        let _cs = self.platform.enter();
        if src.is_unspecified() {
            return Err(NetError::InvalidParam);
        }
        let now = self.now_ms();
        self.neighbors.on_advertisement(src, mac, now);
        Ok(())
    }

    // ---------------------------------------------------------------
    // RX dispatch
    // ---------------------------------------------------------------

    /// Validates and demultiplexes a raw Ethernet frame. Every failure is
    /// bounded, classified, and paired with exactly one counter increment.
    pub fn process_rx(&mut self, frame: &[u8]) -> NetResult<()> {
        let _cs = self.platform.enter();
        if !self.initialized {
            return Err(NetError::InvalidParam);
        }
        if frame.len() < EthernetHeader::SIZE + Ipv6Header::SIZE {
            self.stats.rx_errors += 1;
            return Err(NetError::InvalidParam);
        }
        let eth = match EthernetHeader::parse(frame) {
            Some(h) => h,
            None => {
                self.stats.rx_errors += 1;
                return Err(NetError::InvalidParam);
            }
        };
        if eth.ethertype != ETHERTYPE_IPV6 {
            self.stats.rx_errors += 1;
            return Err(NetError::InvalidParam);
        }
        let ip_bytes = &frame[EthernetHeader::SIZE..];
        let ip = match Ipv6Header::parse(ip_bytes) {
            Some(h) => h,
            None => {
                self.stats.rx_errors += 1;
                log::warn!("process_rx: malformed IPv6 header or wrong version");
                return Err(NetError::InvalidParam);
            }
        };
        if ip.hop_limit == 0 {
            self.stats.rx_errors += 1;
            log::warn!("process_rx: hop limit exhausted, dropping");
            return Err(NetError::InvalidParam);
        }
        if !ipv6::validate_frame_length(frame.len(), ip.payload_length) {
            self.stats.rx_errors += 1;
            log::warn!("process_rx: payload length disagrees with frame length");
            return Err(NetError::InvalidParam);
        }

        let now = self.now_ms();
        let for_us = ip.dst.const_eq(&self.local_ipv6)
            || ip.dst.const_eq(&Ipv6Address::ALL_NODES)
            || ip.dst.const_eq(&self.local_ipv6.solicited_node());
        if !for_us {
            if self.config.forwarding && self.routes.find(&ip.dst, now).is_some() {
                // A full forwarding path would decrement hop_limit and
                // re-enter the TX pipeline with the original payload;
                // forwarding is off by default and this only counts the
                // packet as handled rather than actually relaying it.
                self.stats.rx_packets += 1;
                return Ok(());
            }
            self.stats.rx_dropped += 1;
            return Err(NetError::InvalidParam);
        }
        self.stats.rx_packets += 1;

        let payload_start = EthernetHeader::SIZE + Ipv6Header::SIZE;
        let upper = &frame[payload_start..payload_start + ip.payload_length as usize];

        match ip.next_header {
            ipv6::NEXT_HEADER_ICMPV6 => rx_icmpv6(
                &self.platform,
                &mut self.routes,
                &mut self.neighbors,
                &mut self.tx_pool,
                &mut self.stats,
                self.local_ipv6,
                self.local_mac,
                &ip,
                upper,
                now,
            ),
            ipv6::NEXT_HEADER_UDP => rx_udp(&self.udp_listeners, &mut self.stats, &ip, upper),
            ipv6::NEXT_HEADER_TCP => rx_tcp(
                &mut self.tcp,
                &mut self.seq_seed,
                &mut self.stats,
                self.local_ipv6,
                &ip,
                upper,
                now,
            ),
            _ => {
                self.stats.rx_errors += 1;
                Err(NetError::InvalidParam)
            }
        }
    }

    // ---------------------------------------------------------------
    // UDP
    // ---------------------------------------------------------------

    pub fn udp_bind(&mut self, port: u16, callback: UdpCallback) -> NetResult<()> {
        let _cs = self.platform.enter();
        self.udp_listeners.bind(port, callback)
    }

    pub fn udp_unbind(&mut self, port: u16) {
        let _cs = self.platform.enter();
        self.udp_listeners.unbind(port);
    }

    pub fn udp_send(
        &mut self,
        dst: Ipv6Address,
        dport: u16,
        sport: u16,
        payload: &[u8],
        qos: QosClass,
    ) -> NetResult<()> {
        let _cs = self.platform.enter();
        if !self.initialized || dport == 0 || payload.is_empty() || payload.len() > MTU {
            return Err(NetError::InvalidParam);
        }
        let sport = if sport == 0 { allocate_ephemeral_port(&mut self.next_ephemeral_port) } else { sport };
        let now = self.now_ms();

        let route = match self.routes.find(&dst, now) {
            Some(r) => r,
            None => {
                self.stats.routing_errors += 1;
                log::warn!("udp_send: no route to destination");
                return Err(NetError::NoRoute);
            }
        };
        let next_hop = route.next_hop.unwrap_or(dst);
        let next_hop_mac = resolve_next_hop(&mut self.neighbors, &next_hop, now);

        let handle = match self.tx_pool.allocate(qos, now) {
            Ok(h) => h,
            Err(e) => {
                self.stats.tx_dropped += 1;
                log::warn!("udp_send: no TX buffer available");
                return Err(e);
            }
        };

        let body_off = EthernetHeader::SIZE + Ipv6Header::SIZE;
        let udp_len = UdpHeader::SIZE + payload.len();
        {
            let buf = self.tx_pool.get_mut(handle).expect("just allocated");
            write_udp_segment(buf, &self.local_ipv6, &dst, sport, dport, payload);
        }
        let checksum = {
            let buf = self.tx_pool.get(handle).expect("just allocated");
            pseudo_header_checksum(
                &self.local_ipv6,
                &dst,
                udp_len as u32,
                ipv6::NEXT_HEADER_UDP,
                &buf.data[body_off..body_off + udp_len],
            )
        };
        {
            let buf = self.tx_pool.get_mut(handle).expect("just allocated");
            buf.data[body_off + 6..body_off + 8].copy_from_slice(&checksum.to_be_bytes());
            EthernetHeader { dst: next_hop_mac, src: self.local_mac, ethertype: ETHERTYPE_IPV6 }
                .write(&mut buf.data[..EthernetHeader::SIZE])
                .expect("buffer large enough");
            buf.len = body_off + udp_len;
        }
        let buf = self.tx_pool.get(handle).expect("just allocated");
        self.platform.transmit(buf.as_slice());
        self.tx_pool.free(handle);
        self.stats.tx_packets += 1;
        Ok(())
    }

    // ---------------------------------------------------------------
    // TCP-Lite
    // ---------------------------------------------------------------

    pub fn tcp_connect(&mut self, dst: Ipv6Address, dport: u16) -> NetResult<TcpHandle> {
        let _cs = self.platform.enter();
        if !self.initialized || dst.is_unspecified() || dport == 0 {
            return Err(NetError::InvalidParam);
        }
        let now = self.now_ms();
        if self.routes.find(&dst, now).is_none() {
            self.stats.routing_errors += 1;
            return Err(NetError::NoRoute);
        }
        let sport = allocate_ephemeral_port(&mut self.next_ephemeral_port);
        self.seq_seed = self.seq_seed.wrapping_add(0x0001_0000);
        let seq = self.seq_seed;
        let handle = self.tcp.connect(self.local_ipv6, sport, dst, dport, seq, now).map_err(|e| {
            self.stats.tcp_errors += 1;
            e
        })?;
        emit_tcp_segment(
            &self.platform,
            &mut self.tcp,
            &mut self.tx_pool,
            &mut self.routes,
            &mut self.neighbors,
            &mut self.stats,
            self.local_ipv6,
            self.local_mac,
            handle,
            tcp_wire::flags::SYN,
            &[],
            now,
        );
        Ok(handle)
    }

    pub fn tcp_listen(&mut self, local_port: u16) -> NetResult<TcpHandle> {
        let _cs = self.platform.enter();
        if !self.initialized || local_port == 0 {
            return Err(NetError::InvalidParam);
        }
        let now = self.now_ms();
        self.tcp.listen(self.local_ipv6, local_port, now)
    }

    pub fn tcp_send(&mut self, handle: TcpHandle, data: &[u8]) -> NetResult<()> {
        let _cs = self.platform.enter();
        if data.is_empty() {
            return Err(NetError::InvalidParam);
        }
        {
            let conn = self.tcp.get(handle)?;
            if !matches!(conn.state, TcpState::Established | TcpState::CloseWait) {
                return Err(NetError::Connection);
            }
        }
        let now = self.now_ms();
        for chunk in data.chunks(TCP_MSS) {
            emit_tcp_segment(
                &self.platform,
                &mut self.tcp,
                &mut self.tx_pool,
                &mut self.routes,
                &mut self.neighbors,
                &mut self.stats,
                self.local_ipv6,
                self.local_mac,
                handle,
                tcp_wire::flags::ACK | tcp_wire::flags::PSH,
                chunk,
                now,
            );
        }
        if let Ok(conn) = self.tcp.get_mut(handle) {
            conn.last_activity_ms = now;
        }
        Ok(())
    }

    pub fn tcp_close(&mut self, handle: TcpHandle) -> NetResult<()> {
        let _cs = self.platform.enter();
        let should_emit_fin =
            matches!(self.tcp.get(handle)?.state, TcpState::Established | TcpState::CloseWait);
        self.tcp.close(handle)?;
        if should_emit_fin {
            let now = self.now_ms();
            emit_tcp_segment(
                &self.platform,
                &mut self.tcp,
                &mut self.tx_pool,
                &mut self.routes,
                &mut self.neighbors,
                &mut self.stats,
                self.local_ipv6,
                self.local_mac,
                handle,
                tcp_wire::flags::FIN | tcp_wire::flags::ACK,
                &[],
                now,
            );
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // mDNS façade
    // ---------------------------------------------------------------

    pub fn mdns_query(&mut self, name: &str) -> NetResult<MdnsRecord> {
        let _cs = self.platform.enter();
        self.mdns.query(name)
    }

    pub fn mdns_announce(&mut self, name: &str, port: u16, ttl_sec: u32) -> NetResult<()> {
        let _cs = self.platform.enter();
        let now = self.now_ms();
        self.mdns.announce(name, port, ttl_sec, now)
    }

    pub fn mdns_learn(&mut self, name: &str, addr: Ipv6Address, port: u16, ttl_sec: u32) -> NetResult<()> {
        let _cs = self.platform.enter();
        let now = self.now_ms();
        self.mdns.learn(name, addr, port, ttl_sec, now)
    }

    // ---------------------------------------------------------------
    // Periodic ager
    // ---------------------------------------------------------------

    /// Invoked externally roughly every 100 ms. Completes in time
    /// proportional to the sum of table sizes; no unbounded work.
    pub fn periodic_task(&mut self) {
        let _cs = self.platform.enter();
        let now = self.now_ms();
        self.neighbors.age(now);
        self.routes.age(now);
        self.mdns.age_records(now);

        let mut handles = [None; MAX_TCP_CONNECTIONS];
        for (slot, h) in handles.iter_mut().zip(self.tcp.iter_handles()) {
            *slot = Some(h);
        }
        for handle in handles.into_iter().flatten() {
            let timed_out = match self.tcp.get(handle) {
                Ok(conn) => now.wrapping_sub(conn.last_activity_ms) > RTNET_TCP_TIMEOUT_MS,
                Err(_) => false,
            };
            if timed_out {
                self.tcp.force_close(handle);
                self.stats.tcp_errors += 1;
                log::warn!("tcp: connection idle-timed-out, forcing CLOSED");
                continue;
            }
            retransmit_due(
                &self.platform,
                &mut self.tcp,
                &mut self.tx_pool,
                &mut self.routes,
                &mut self.neighbors,
                &mut self.stats,
                self.local_ipv6,
                self.local_mac,
                handle,
                now,
            );
        }

        for ann in self.mdns.due_announcements(now) {
            log::trace!("mdns: periodic re-announce of {}", ann.name.as_str());
            self.platform.transmit(&[]);
        }
    }
}

// ---------------------------------------------------------------------
// Free functions: each borrows only the specific tables it needs, so a
// `let _cs = self.platform.enter();` guard held by the caller is never
// invalidated by a conflicting whole-`self` borrow.
// ---------------------------------------------------------------------

fn allocate_ephemeral_port(next: &mut u16) -> u16 {
    let port = *next;
    *next = if *next == u16::MAX { EPHEMERAL_PORT_BASE } else { *next + 1 };
    port
}

/// A cache hit refreshes reachability as usual. A miss is not fatal to the
/// send in progress (4.4: "a transient error that can be retried"); this
/// falls back to the destination's solicited-node multicast MAC, mirroring
/// how a real Neighbor Solicitation would be addressed while resolution is
/// still outstanding.
fn resolve_next_hop(
    neighbors: &mut NeighborCache<MAX_NEIGHBOR_ENTRIES>,
    next_hop: &Ipv6Address,
    now_ms: u32,
) -> MacAddress {
    neighbors
        .lookup(next_hop, now_ms)
        .unwrap_or_else(|| MacAddress::multicast_from_ipv6(next_hop))
}

fn verify_checksum(stats: &mut Statistics, ip: &Ipv6Header, upper: &[u8]) -> NetResult<()> {
    let sum = pseudo_header_checksum(&ip.src, &ip.dst, ip.payload_length as u32, ip.next_header, upper);
    if sum != 0 {
        stats.checksum_errors += 1;
        log::warn!("checksum mismatch on inbound segment");
        return Err(NetError::Checksum);
    }
    Ok(())
}

fn write_udp_segment(
    buf: &mut Buffer,
    src: &Ipv6Address,
    dst: &Ipv6Address,
    sport: u16,
    dport: u16,
    payload: &[u8],
) {
    let body_off = EthernetHeader::SIZE + Ipv6Header::SIZE;
    let udp_len = UdpHeader::SIZE + payload.len();
    UdpHeader::new(sport, dport, payload.len())
        .write(&mut buf.data[body_off..body_off + UdpHeader::SIZE])
        .expect("buffer large enough");
    buf.data[body_off + UdpHeader::SIZE..body_off + udp_len].copy_from_slice(payload);
    Ipv6Header::new(ipv6::NEXT_HEADER_UDP, udp_len as u16, *src, *dst)
        .write(&mut buf.data[EthernetHeader::SIZE..body_off])
        .expect("buffer large enough");
}

#[allow(clippy::too_many_arguments)]
fn rx_icmpv6<P: Platform>(
    platform: &P,
    routes: &mut RoutingTable<MAX_ROUTING_ENTRIES>,
    neighbors: &mut NeighborCache<MAX_NEIGHBOR_ENTRIES>,
    tx_pool: &mut BufferPool<TX_POOL_SIZE>,
    stats: &mut Statistics,
    local_ipv6: Ipv6Address,
    local_mac: MacAddress,
    ip: &Ipv6Header,
    upper: &[u8],
    now: u32,
) -> NetResult<()> {
    verify_checksum(stats, ip, upper)?;
    let msg = match Icmpv6Message::parse(upper) {
        Some(m) => m,
        None => {
            stats.rx_errors += 1;
            return Err(NetError::InvalidParam);
        }
    };
    match msg {
        Icmpv6Message::NeighborAdvertisement { target, target_ll_addr: Some(mac), .. } => {
            neighbors.on_advertisement(target, mac, now);
            Ok(())
        }
        Icmpv6Message::NeighborAdvertisement { .. } => Ok(()),
        Icmpv6Message::NeighborSolicitation { source_ll_addr: Some(mac), .. } => {
            neighbors.on_advertisement(ip.src, mac, now);
            Ok(())
        }
        Icmpv6Message::NeighborSolicitation { .. } => Ok(()),
        Icmpv6Message::EchoRequest { identifier, sequence, data } => {
            let reply = Icmpv6Message::EchoReply { identifier, sequence, data };
            send_icmpv6(platform, routes, neighbors, tx_pool, stats, local_ipv6, local_mac, ip.src, reply, now)
        }
        Icmpv6Message::EchoReply { .. } => Ok(()),
    }
}

fn rx_udp(
    udp_listeners: &UdpListeners<MAX_UDP_LISTENERS>,
    stats: &mut Statistics,
    ip: &Ipv6Header,
    upper: &[u8],
) -> NetResult<()> {
    verify_checksum(stats, ip, upper)?;
    let hdr = match UdpHeader::parse(upper) {
        Some(h) => h,
        None => {
            stats.rx_errors += 1;
            return Err(NetError::InvalidParam);
        }
    };
    let payload = &upper[UdpHeader::SIZE..];
    if udp_listeners.deliver(hdr.dst_port, &ip.src, hdr.src_port, payload) {
        Ok(())
    } else {
        stats.rx_dropped += 1;
        Ok(())
    }
}

fn rx_tcp(
    tcp: &mut TcpTable<MAX_TCP_CONNECTIONS>,
    seq_seed: &mut u32,
    stats: &mut Statistics,
    local_ipv6: Ipv6Address,
    ip: &Ipv6Header,
    upper: &[u8],
    now: u32,
) -> NetResult<()> {
    let sum = pseudo_header_checksum(&ip.src, &ip.dst, ip.payload_length as u32, ip.next_header, upper);
    if sum != 0 {
        stats.checksum_errors += 1;
        return Err(NetError::Checksum);
    }
    let hdr = match TcpHeader::parse(upper) {
        Some(h) => h,
        None => {
            stats.rx_errors += 1;
            return Err(NetError::InvalidParam);
        }
    };

    if let Some(handle) = tcp.find_by_4tuple(&local_ipv6, hdr.dst_port, &ip.src, hdr.src_port) {
        let conn = tcp.get_mut(handle)?;
        conn.last_activity_ms = now;
        if hdr.flags & tcp_wire::flags::ACK != 0 {
            conn.ack_up_to(hdr.ack_num);
            if matches!(conn.state, TcpState::SynSent | TcpState::SynRcvd) {
                conn.state = TcpState::Established;
            }
        }
        if hdr.flags & tcp_wire::flags::FIN != 0 {
            conn.state = match conn.state {
                TcpState::Established => TcpState::CloseWait,
                TcpState::FinWait => TcpState::Closing,
                other => other,
            };
        }
        return Ok(());
    }

    if hdr.flags & tcp_wire::flags::SYN != 0
        && hdr.flags & tcp_wire::flags::ACK == 0
        && tcp.find_listener(hdr.dst_port).is_some()
    {
        *seq_seed = seq_seed.wrapping_add(0x0001_0000);
        let seq = *seq_seed;
        if tcp.accept(local_ipv6, hdr.dst_port, ip.src, hdr.src_port, hdr.seq_num, seq, now).is_err() {
            stats.tcp_errors += 1;
            return Err(NetError::NoBuffer);
        }
    }
    Ok(())
}

fn seq_consumed(flags: u8, data_len: usize) -> u32 {
    let mut n = data_len as u32;
    if flags & tcp_wire::flags::SYN != 0 {
        n += 1;
    }
    if flags & tcp_wire::flags::FIN != 0 {
        n += 1;
    }
    n
}

#[allow(clippy::too_many_arguments)]
fn send_icmpv6<P: Platform>(
    platform: &P,
    routes: &mut RoutingTable<MAX_ROUTING_ENTRIES>,
    neighbors: &mut NeighborCache<MAX_NEIGHBOR_ENTRIES>,
    tx_pool: &mut BufferPool<TX_POOL_SIZE>,
    stats: &mut Statistics,
    local_ipv6: Ipv6Address,
    local_mac: MacAddress,
    dst: Ipv6Address,
    msg: Icmpv6Message,
    now: u32,
) -> NetResult<()> {
    let route = routes.find(&dst, now).ok_or(NetError::NoRoute)?;
    let next_hop = route.next_hop.unwrap_or(dst);
    let next_hop_mac = resolve_next_hop(neighbors, &next_hop, now);
    let handle = tx_pool.allocate(QosClass::High, now)?;
    let body_off = EthernetHeader::SIZE + Ipv6Header::SIZE;
    let written = {
        let buf = tx_pool.get_mut(handle).expect("just allocated");
        msg.write(&mut buf.data[body_off..]).ok_or(NetError::InvalidParam)?
    };
    let checksum = {
        let buf = tx_pool.get(handle).expect("just allocated");
        pseudo_header_checksum(
            &local_ipv6,
            &dst,
            written as u32,
            ipv6::NEXT_HEADER_ICMPV6,
            &buf.data[body_off..body_off + written],
        )
    };
    {
        let buf = tx_pool.get_mut(handle).expect("just allocated");
        buf.data[body_off + 2..body_off + 4].copy_from_slice(&checksum.to_be_bytes());
        Ipv6Header::new(ipv6::NEXT_HEADER_ICMPV6, written as u16, local_ipv6, dst)
            .write(&mut buf.data[EthernetHeader::SIZE..body_off])
            .expect("buffer large enough");
        EthernetHeader { dst: next_hop_mac, src: local_mac, ethertype: ETHERTYPE_IPV6 }
            .write(&mut buf.data[..EthernetHeader::SIZE])
            .expect("buffer large enough");
        buf.len = body_off + written;
    }
    let buf = tx_pool.get(handle).expect("just allocated");
    platform.transmit(buf.as_slice());
    tx_pool.free(handle);
    stats.tx_packets += 1;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn emit_tcp_segment<P: Platform>(
    platform: &P,
    tcp: &mut TcpTable<MAX_TCP_CONNECTIONS>,
    tx_pool: &mut BufferPool<TX_POOL_SIZE>,
    routes: &mut RoutingTable<MAX_ROUTING_ENTRIES>,
    neighbors: &mut NeighborCache<MAX_NEIGHBOR_ENTRIES>,
    stats: &mut Statistics,
    local_ipv6: Ipv6Address,
    local_mac: MacAddress,
    handle: TcpHandle,
    flags: u8,
    data: &[u8],
    now: u32,
) {
    let (local_port, remote, remote_port, seq, ack, window) = {
        let conn = match tcp.get(handle) {
            Ok(c) => c,
            Err(_) => return,
        };
        (conn.local_port, conn.remote, conn.remote_port, conn.send_next, conn.recv_next, conn.send_window)
    };

    let route = match routes.find(&remote, now) {
        Some(r) => r,
        None => {
            stats.routing_errors += 1;
            return;
        }
    };
    let next_hop = route.next_hop.unwrap_or(remote);
    let next_hop_mac = resolve_next_hop(neighbors, &next_hop, now);
    let handle_buf = match tx_pool.allocate(QosClass::Normal, now) {
        Ok(h) => h,
        Err(_) => {
            stats.tx_dropped += 1;
            return;
        }
    };

    let body_off = EthernetHeader::SIZE + Ipv6Header::SIZE;
    let seg_len = TcpHeader::SIZE + data.len();
    {
        let buf = tx_pool.get_mut(handle_buf).expect("just allocated");
        TcpHeader::new(local_port, remote_port, seq, ack, flags, window)
            .write(&mut buf.data[body_off..body_off + TcpHeader::SIZE])
            .expect("buffer large enough");
        buf.data[body_off + TcpHeader::SIZE..body_off + seg_len].copy_from_slice(data);
    }
    let checksum = {
        let buf = tx_pool.get(handle_buf).expect("just allocated");
        pseudo_header_checksum(
            &local_ipv6,
            &remote,
            seg_len as u32,
            ipv6::NEXT_HEADER_TCP,
            &buf.data[body_off..body_off + seg_len],
        )
    };
    {
        let buf = tx_pool.get_mut(handle_buf).expect("just allocated");
        buf.data[body_off + 16..body_off + 18].copy_from_slice(&checksum.to_be_bytes());
        Ipv6Header::new(ipv6::NEXT_HEADER_TCP, seg_len as u16, local_ipv6, remote)
            .write(&mut buf.data[EthernetHeader::SIZE..body_off])
            .expect("buffer large enough");
        EthernetHeader { dst: next_hop_mac, src: local_mac, ethertype: ETHERTYPE_IPV6 }
            .write(&mut buf.data[..EthernetHeader::SIZE])
            .expect("buffer large enough");
        buf.len = body_off + seg_len;
    }
    let buf = tx_pool.get(handle_buf).expect("just allocated");
    platform.transmit(buf.as_slice());
    tx_pool.free(handle_buf);
    stats.tx_packets += 1;

    let consumed = seq_consumed(flags, data.len());
    if consumed > 0 {
        if let Ok(conn) = tcp.get_mut(handle) {
            if conn.log_segment(seq, consumed, now).is_err() {
                log::warn!("tcp: send log full, caller must back off");
            }
            conn.send_next = conn.send_next.wrapping_add(consumed);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn retransmit_due<P: Platform>(
    platform: &P,
    tcp: &mut TcpTable<MAX_TCP_CONNECTIONS>,
    tx_pool: &mut BufferPool<TX_POOL_SIZE>,
    routes: &mut RoutingTable<MAX_ROUTING_ENTRIES>,
    neighbors: &mut NeighborCache<MAX_NEIGHBOR_ENTRIES>,
    stats: &mut Statistics,
    local_ipv6: Ipv6Address,
    local_mac: MacAddress,
    handle: TcpHandle,
    now: u32,
) {
    let due = match tcp.get_mut(handle) {
        Ok(conn) => conn.due_retransmits(now, RTNET_TCP_TIMEOUT_MS),
        Err(_) => return,
    };
    let exhausted = tcp.get(handle).map(|c| c.retry_exhausted()).unwrap_or(false);
    if exhausted {
        tcp.force_close(handle);
        stats.tcp_errors += 1;
        log::warn!("tcp: retransmit limit exceeded, forcing CLOSED");
        return;
    }
    // The bounded send log retains only sequence/length/timestamp, not the
    // original bytes, so a genuine resend isn't possible here; re-emitting
    // a bare ACK keeps the peer's idle timer from firing without assuming
    // payload bytes the core never stored.
    for _seg in due.into_iter().flatten() {
        emit_tcp_segment(
            platform, tcp, tx_pool, routes, neighbors, stats, local_ipv6, local_mac, handle, tcp_wire::flags::ACK, &[], now,
        );
    }
}
