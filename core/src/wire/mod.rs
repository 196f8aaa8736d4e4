//! Wire codec: parse/emit Ethernet, IPv6, ICMPv6, UDP and TCP headers.
//!
//! Every header type exposes a `parse(&[u8]) -> Option<Self>` /
//! `write(&self, &mut [u8]) -> Option<()>` pair keyed to explicit byte
//! offsets and big-endian conversions. There are no `#[repr(C)]` overlays:
//! behavior is identical on misaligned input because nothing is ever cast
//! onto frame memory.

pub mod ethernet;
pub mod icmpv6;
pub mod ipv6;
pub mod tcp;
pub mod udp;
