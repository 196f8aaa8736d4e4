//! Process-wide statistics counters. Monotonic; reset only on explicit
//! re-init.

/// A snapshot of the stack's counters, cheap to copy out from under the
/// critical section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Statistics {
    pub rx_packets: u64,
    pub tx_packets: u64,
    pub rx_errors: u64,
    pub tx_errors: u64,
    pub rx_dropped: u64,
    pub tx_dropped: u64,
    pub checksum_errors: u64,
    pub routing_errors: u64,
    pub tcp_errors: u64,
}

impl Statistics {
    pub const fn new() -> Self {
        Self {
            rx_packets: 0,
            tx_packets: 0,
            rx_errors: 0,
            tx_errors: 0,
            rx_dropped: 0,
            tx_dropped: 0,
            checksum_errors: 0,
            routing_errors: 0,
            tcp_errors: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
