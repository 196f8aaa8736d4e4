//! Classified error kinds returned by every fallible core operation.

use core::fmt;

/// Terminal return value for a fallible operation. There is no exception
/// channel: every caller observes one of these and is expected to react
/// (usually by backing off and retrying, never by the core retrying on
/// their behalf, except for TCP-Lite's own segment retransmission).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetError {
    /// An argument was absent, zero where non-zero is required, or out of range.
    InvalidParam,
    /// No free buffer was available in the pool.
    NoBuffer,
    /// No routing table entry matched the destination.
    NoRoute,
    /// A pseudo-header checksum failed to verify.
    Checksum,
    /// No cached result exists yet for a bounded-wait lookup.
    Timeout,
    /// The handle's connection is not in a state that accepts the operation.
    Connection,
    /// A fixed-size table had no free slot.
    Overflow,
}

impl fmt::Display for NetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NetError::InvalidParam => "invalid parameter",
            NetError::NoBuffer => "no buffer available",
            NetError::NoRoute => "no route to destination",
            NetError::Checksum => "checksum mismatch",
            NetError::Timeout => "timed out",
            NetError::Connection => "connection not in a valid state",
            NetError::Overflow => "table overflow",
        };
        f.write_str(s)
    }
}

impl core::error::Error for NetError {}

pub type NetResult<T> = Result<T, NetError>;
