//! TCP-Lite connection table and state machine.
//!
//! Follows RFC 793's reduced graph with no window scaling, no SACK, no
//! delayed ACK, a single retransmission timer per connection capped at
//! [`RTNET_TCP_MAX_RETRIES`](crate::config::RTNET_TCP_MAX_RETRIES), and
//! TIME_WAIT collapsed into the same idle timeout the periodic ager already
//! enforces on every other connection.
//!
//! This module owns the connection table and its transitions. Emitting the
//! SYN/ACK/FIN segments those transitions imply is the caller's (`Stack`'s)
//! job, since that requires the routing table, neighbor cache, buffer pool
//! and platform transmit hook — none of which this module touches.

use crate::addr::Ipv6Address;
use crate::config::{RTNET_TCP_MAX_RETRIES, TCP_SEND_LOG_CAPACITY};
use crate::error::{NetError, NetResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TcpState {
    Closed,
    Listen,
    SynSent,
    SynRcvd,
    Established,
    FinWait,
    CloseWait,
    Closing,
    TimeWait,
}

/// A handle into the connection table. Stable for the connection's
/// lifetime; the same index may be reused only after the prior occupant
/// reaches `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpHandle(pub u16);

/// Bookkeeping for one outstanding, unacknowledged segment.
#[derive(Debug, Clone, Copy)]
pub struct PendingSegment {
    pub seq: u32,
    pub len: u32,
    pub timestamp_ms: u32,
    pub retries: u8,
}

pub struct TcpConnection {
    pub local: Ipv6Address,
    pub local_port: u16,
    pub remote: Ipv6Address,
    pub remote_port: u16,
    pub state: TcpState,
    pub send_next: u32,
    pub send_unacked: u32,
    pub recv_next: u32,
    pub send_window: u16,
    pub recv_window: u16,
    pub last_activity_ms: u32,
    pub in_use: bool,
    pending: [Option<PendingSegment>; TCP_SEND_LOG_CAPACITY],
}

impl TcpConnection {
    const fn empty() -> Self {
        Self {
            local: Ipv6Address::UNSPECIFIED,
            local_port: 0,
            remote: Ipv6Address::UNSPECIFIED,
            remote_port: 0,
            state: TcpState::Closed,
            send_next: 0,
            send_unacked: 0,
            recv_next: 0,
            send_window: 0,
            recv_window: 0,
            last_activity_ms: 0,
            in_use: false,
            pending: [None; TCP_SEND_LOG_CAPACITY],
        }
    }

    /// Records a freshly-sent, as-yet-unacknowledged chunk. `TcpSend`
    /// rejects a caller once this bounded log is full rather than growing
    /// it ("no unbounded data structures").
    pub fn log_segment(&mut self, seq: u32, len: u32, now_ms: u32) -> NetResult<()> {
        match self.pending.iter().position(|p| p.is_none()) {
            Some(idx) => {
                self.pending[idx] = Some(PendingSegment { seq, len, timestamp_ms: now_ms, retries: 0 });
                Ok(())
            }
            None => Err(NetError::NoBuffer),
        }
    }

    pub fn ack_up_to(&mut self, ack: u32) {
        for p in self.pending.iter_mut() {
            if let Some(seg) = p {
                if seg.seq.wrapping_add(seg.len) <= ack {
                    *p = None;
                }
            }
        }
        if ack > self.send_unacked {
            self.send_unacked = ack;
        }
    }

    /// Returns segments due for retransmission (older than `timeout_ms`),
    /// incrementing their retry counters. A segment whose retries exceed
    /// the cap is dropped from the log; the caller is responsible for
    /// tearing the connection down when retries are exhausted.
    pub fn due_retransmits(&mut self, now_ms: u32, timeout_ms: u32) -> [Option<PendingSegment>; TCP_SEND_LOG_CAPACITY] {
        let mut due = [None; TCP_SEND_LOG_CAPACITY];
        for (i, p) in self.pending.iter_mut().enumerate() {
            if let Some(seg) = p {
                if now_ms.wrapping_sub(seg.timestamp_ms) > timeout_ms {
                    seg.retries += 1;
                    seg.timestamp_ms = now_ms;
                    if seg.retries > RTNET_TCP_MAX_RETRIES {
                        due[i] = Some(*seg);
                        *p = None;
                    } else {
                        due[i] = Some(*seg);
                    }
                }
            }
        }
        due
    }

    pub fn retry_exhausted(&self) -> bool {
        self.pending
            .iter()
            .flatten()
            .any(|p| p.retries > RTNET_TCP_MAX_RETRIES)
    }
}

pub struct TcpTable<const N: usize> {
    connections: [TcpConnection; N],
}

impl<const N: usize> TcpTable<N> {
    pub const fn new() -> Self {
        Self { connections: [const { TcpConnection::empty() }; N] }
    }

    fn free_slot(&self) -> Option<usize> {
        self.connections.iter().position(|c| !c.in_use)
    }

    /// Active open: allocates a slot, populates fields, transitions
    /// `CLOSED -> SYN_SENT`. Caller emits the SYN.
    pub fn connect(
        &mut self,
        local: Ipv6Address,
        local_port: u16,
        remote: Ipv6Address,
        remote_port: u16,
        initial_seq: u32,
        now_ms: u32,
    ) -> NetResult<TcpHandle> {
        let idx = self.free_slot().ok_or(NetError::NoBuffer)?;
        self.connections[idx] = TcpConnection {
            local,
            local_port,
            remote,
            remote_port,
            state: TcpState::SynSent,
            send_next: initial_seq,
            send_unacked: initial_seq,
            recv_next: 0,
            send_window: u16::MAX,
            recv_window: u16::MAX,
            last_activity_ms: now_ms,
            in_use: true,
            pending: [None; TCP_SEND_LOG_CAPACITY],
        };
        Ok(TcpHandle(idx as u16))
    }

    /// Passive open: allocates a slot, transitions `CLOSED -> LISTEN`.
    pub fn listen(&mut self, local: Ipv6Address, local_port: u16, now_ms: u32) -> NetResult<TcpHandle> {
        let idx = self.free_slot().ok_or(NetError::NoBuffer)?;
        self.connections[idx] = TcpConnection {
            local,
            local_port,
            state: TcpState::Listen,
            last_activity_ms: now_ms,
            in_use: true,
            ..TcpConnection::empty()
        };
        Ok(TcpHandle(idx as u16))
    }

    /// Allocates a new slot for an incoming SYN against a LISTEN-ing
    /// connection, transitioning the new slot `CLOSED -> SYN_RCVD`.
    pub fn accept(
        &mut self,
        local: Ipv6Address,
        local_port: u16,
        remote: Ipv6Address,
        remote_port: u16,
        peer_seq: u32,
        initial_seq: u32,
        now_ms: u32,
    ) -> NetResult<TcpHandle> {
        let idx = self.free_slot().ok_or(NetError::NoBuffer)?;
        self.connections[idx] = TcpConnection {
            local,
            local_port,
            remote,
            remote_port,
            state: TcpState::SynRcvd,
            send_next: initial_seq,
            send_unacked: initial_seq,
            recv_next: peer_seq.wrapping_add(1),
            send_window: u16::MAX,
            recv_window: u16::MAX,
            last_activity_ms: now_ms,
            in_use: true,
            pending: [None; TCP_SEND_LOG_CAPACITY],
        };
        Ok(TcpHandle(idx as u16))
    }

    pub fn get(&self, handle: TcpHandle) -> NetResult<&TcpConnection> {
        self.connections
            .get(handle.0 as usize)
            .filter(|c| c.in_use)
            .ok_or(NetError::InvalidParam)
    }

    pub fn get_mut(&mut self, handle: TcpHandle) -> NetResult<&mut TcpConnection> {
        self.connections
            .get_mut(handle.0 as usize)
            .filter(|c| c.in_use)
            .ok_or(NetError::InvalidParam)
    }

    pub fn find_by_4tuple(
        &self,
        local: &Ipv6Address,
        local_port: u16,
        remote: &Ipv6Address,
        remote_port: u16,
    ) -> Option<TcpHandle> {
        self.connections.iter().position(|c| {
            c.in_use
                && c.local_port == local_port
                && c.remote_port == remote_port
                && c.local.const_eq(local)
                && c.remote.const_eq(remote)
        }).map(|idx| TcpHandle(idx as u16))
    }

    pub fn find_listener(&self, local_port: u16) -> Option<TcpHandle> {
        self.connections
            .iter()
            .position(|c| c.in_use && c.state == TcpState::Listen && c.local_port == local_port)
            .map(|idx| TcpHandle(idx as u16))
    }

    /// Marks a handle available for reuse. Only valid once the connection
    /// has reached `CLOSED`.
    fn release(&mut self, handle: TcpHandle) {
        if let Some(c) = self.connections.get_mut(handle.0 as usize) {
            if c.state == TcpState::Closed {
                c.in_use = false;
            }
        }
    }

    /// Validates the handle and current state accepts `send`/`close`,
    /// transitions on close, and releases the slot once `CLOSED` is
    /// reached.
    pub fn close(&mut self, handle: TcpHandle) -> NetResult<()> {
        let c = self.get_mut(handle)?;
        c.state = match c.state {
            TcpState::Established => TcpState::FinWait,
            TcpState::CloseWait => TcpState::Closing,
            TcpState::Closed => return Err(NetError::Connection),
            _ => TcpState::Closed,
        };
        if c.state == TcpState::Closed {
            self.release(handle);
        }
        Ok(())
    }

    /// Forces `CLOSED` from the periodic ager on timeout, regardless of
    /// current state.
    pub fn force_close(&mut self, handle: TcpHandle) {
        if let Some(c) = self.connections.get_mut(handle.0 as usize) {
            c.state = TcpState::Closed;
            c.in_use = false;
        }
    }

    pub fn iter_handles(&self) -> impl Iterator<Item = TcpHandle> + '_ {
        self.connections
            .iter()
            .enumerate()
            .filter(|(_, c)| c.in_use)
            .map(|(idx, _)| TcpHandle(idx as u16))
    }

    pub fn capacity(&self) -> usize {
        N
    }
}
