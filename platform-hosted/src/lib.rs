//! A std-backed [`rtnet_core::platform::Platform`] implementation.
//!
//! Stands in for real hardware in tests and hosted tools: the critical
//! section is a `spin::Mutex<()>` rather than a disable/restore-interrupts
//! pair, the clock is `std::time::Instant`, and transmit appends to an
//! in-memory loopback log instead of handing a frame to a DMA ring.

use std::time::Instant;

use rtnet_core::platform::{Clock, CriticalSection, CsGuard, Transmit};

/// Scope guard released when dropped, pairing with [`HostedPlatform::enter`].
pub struct HostedGuard<'a>(spin::MutexGuard<'a, ()>);

impl<'a> CsGuard for HostedGuard<'a> {}

/// A `Platform` usable from ordinary `std` code: any number of threads may
/// hold a `&HostedPlatform`, but only one may be inside a critical section
/// at a time.
pub struct HostedPlatform {
    lock: spin::Mutex<()>,
    start: Instant,
    transmitted: spin::Mutex<Vec<Vec<u8>>>,
}

impl HostedPlatform {
    pub fn new() -> Self {
        Self {
            lock: spin::Mutex::new(()),
            start: Instant::now(),
            transmitted: spin::Mutex::new(Vec::new()),
        }
    }

    /// Drains every frame handed to [`Transmit::transmit`] since the last
    /// call. Intended for test assertions, not production use.
    pub fn drain_transmitted(&self) -> Vec<Vec<u8>> {
        core::mem::take(&mut self.transmitted.lock())
    }
}

impl Default for HostedPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl CriticalSection for HostedPlatform {
    type Guard<'a>
        = HostedGuard<'a>
    where
        Self: 'a;

    fn enter(&self) -> Self::Guard<'_> {
        HostedGuard(self.lock.lock())
    }
}

impl Clock for HostedPlatform {
    fn now_ms(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }
}

impl Transmit for HostedPlatform {
    fn transmit(&self, frame: &[u8]) {
        self.transmitted.lock().push(frame.to_vec());
        log::trace!("hosted platform transmit: {} bytes", frame.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transmit_appends_to_loopback_log() {
        let p = HostedPlatform::new();
        p.transmit(&[1, 2, 3]);
        p.transmit(&[4, 5]);
        let frames = p.drain_transmitted();
        assert_eq!(frames, vec![vec![1, 2, 3], vec![4, 5]]);
        assert!(p.drain_transmitted().is_empty());
    }

    #[test]
    fn critical_section_guard_releases_on_drop() {
        let p = HostedPlatform::new();
        {
            let _g = p.enter();
        }
        let _g2 = p.enter();
    }

    #[test]
    fn clock_is_monotonic() {
        let p = HostedPlatform::new();
        let a = p.now_ms();
        let b = p.now_ms();
        assert!(b >= a);
    }
}
