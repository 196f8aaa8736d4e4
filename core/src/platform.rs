//! Platform hooks: the external collaborator every `Stack<P>` is
//! monomorphized over.
//!
//! The reference implementation relies on an ambient, implicit
//! disable-interrupts call around every mutation of shared state. Here that
//! authority is made explicit: [`CriticalSection::enter`] returns a scope
//! guard whose `Drop` releases the section, so acquisition and release are
//! lexically paired and cannot leak across an early return (the "critical
//! section as ambient authority" redesign).
//!
//! `Clock` and `Transmit` are the other two required collaborators: a
//! monotonic millisecond clock and a fire-and-forget hardware transmit.
//! None of the three are implemented by this crate — `platform-hosted`
//! provides a concrete, std-backed implementation for tests and the
//! `HostedPlatform` in this workspace; a real target implements them with
//! disable/restore-interrupts, a hardware timer, and a DMA ring.

/// A scope guard pairing 1:1 with a `CriticalSection::enter()` call. The
/// section is released when the guard is dropped.
pub trait CsGuard {}

/// Enter/exit of a reentrant critical section guarding the Context's
/// mutable regions (statistics, buffer occupancy, table validity/stamps,
/// TCP state) from concurrent thread-context and interrupt-context access.
pub trait CriticalSection {
    type Guard<'a>: CsGuard + 'a
    where
        Self: 'a;

    /// Disables preemption/IRQs (or increments a nesting counter on a
    /// reentrant implementation) and returns a guard that restores the
    /// prior state on drop.
    fn enter(&self) -> Self::Guard<'_>;
}

/// Monotonic millisecond clock, wrapping at 32 bits.
pub trait Clock {
    fn now_ms(&self) -> u32;
}

/// Fire-and-forget hardware transmit. The hook is expected to enqueue the
/// frame and return promptly; it never blocks on completion.
pub trait Transmit {
    fn transmit(&self, frame: &[u8]);
}

/// The combined platform contract a `Stack<P>` is generic over.
pub trait Platform: CriticalSection + Clock + Transmit {}

impl<P: CriticalSection + Clock + Transmit> Platform for P {}
