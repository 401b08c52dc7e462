//! Lock-free event mailbox (interrupt context -> WSPR task).
//!
//! # Architecture
//!
//! ```text
//! RTC alarm ISR ──┐
//! timer ISR ──────┼──▶ [GpsLock][...][Alarm][Tick] ──▶ WsprTask
//! GPS / console ──┘     one slot per EventKind          (single consumer)
//! ```
//!
//! # Rules
//!
//! - Posting never blocks and never allocates
//! - At most one pending notification per event class; a second post of a
//!   pending class is coalesced (dropped and counted)
//! - Exactly one consumer takes notifications, in `EventKind` order

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicU32, AtomicU8, Ordering};

use crate::event::{Event, EventKind, Notification};

const FREE: u8 = 0;
const WRITING: u8 = 1;
const READY: u8 = 2;

struct Slot {
    state: AtomicU8,
    notification: UnsafeCell<Option<Notification>>,
}

impl Slot {
    const fn new() -> Self {
        Self {
            state: AtomicU8::new(FREE),
            notification: UnsafeCell::new(None),
        }
    }
}

/// Per-class single-slot mailbox.
///
/// # Safety
///
/// This type uses `UnsafeCell` internally but is safe to use because:
/// - A producer only writes a slot after winning the `FREE -> WRITING` CAS,
///   so no two producers write the same slot
/// - The consumer only touches a slot in state `READY`, which producers
///   never write
/// - Single consumer: only the WSPR task calls `take`
///
/// # Memory Ordering
///
/// - Producer publishes with `Release` store of `READY`
/// - Consumer observes with `Acquire` load, releases the slot with `Release`
pub struct EventMailbox {
    slots: [Slot; EventKind::COUNT],
    coalesced: AtomicU32,
}

// SAFETY: slot ownership is handed over through the per-slot state atomic.
unsafe impl Sync for EventMailbox {}
unsafe impl Send for EventMailbox {}

impl EventMailbox {
    /// Create an empty mailbox.
    pub const fn new() -> Self {
        const EMPTY: Slot = Slot::new();
        Self {
            slots: [EMPTY; EventKind::COUNT],
            coalesced: AtomicU32::new(0),
        }
    }

    /// Post an event (ISR-safe, never blocks).
    ///
    /// Returns `false` if an event of the same class was already pending;
    /// the new one is dropped.
    #[inline]
    pub fn post(&self, event: Event, timestamp_us: i64) -> bool {
        let slot = &self.slots[event.kind() as usize];

        if slot
            .state
            .compare_exchange(FREE, WRITING, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            self.coalesced.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        // SAFETY: we own the slot until READY is published
        unsafe {
            *slot.notification.get() = Some(Notification { event, timestamp_us });
        }
        slot.state.store(READY, Ordering::Release);
        true
    }

    /// Take the highest-priority pending notification (consumer only).
    #[inline]
    pub fn take(&self) -> Option<Notification> {
        for slot in &self.slots {
            if slot.state.load(Ordering::Acquire) != READY {
                continue;
            }
            // SAFETY: READY slots belong to the single consumer
            let notification = unsafe { (*slot.notification.get()).take() };
            slot.state.store(FREE, Ordering::Release);
            if notification.is_some() {
                return notification;
            }
        }
        None
    }

    /// Check whether an event class is pending.
    #[inline]
    pub fn is_pending(&self, kind: EventKind) -> bool {
        self.slots[kind as usize].state.load(Ordering::Acquire) != FREE
    }

    /// Check if anything is pending.
    #[inline]
    pub fn has_pending(&self) -> bool {
        self.slots
            .iter()
            .any(|slot| slot.state.load(Ordering::Acquire) == READY)
    }

    /// Number of posts dropped because their class was already pending.
    #[inline]
    pub fn coalesced(&self) -> u32 {
        self.coalesced.load(Ordering::Relaxed)
    }

    /// Reset coalesced counter (e.g., after reporting).
    #[inline]
    pub fn reset_coalesced(&self) {
        self.coalesced.store(0, Ordering::Relaxed);
    }
}

impl Default for EventMailbox {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mailbox_post_take() {
        let mailbox = EventMailbox::new();
        assert!(mailbox.post(Event::AlarmFired, 10));
        assert!(mailbox.is_pending(EventKind::AlarmFired));

        let n = mailbox.take().unwrap();
        assert_eq!(n.event, Event::AlarmFired);
        assert_eq!(n.timestamp_us, 10);
        assert!(mailbox.take().is_none());
        assert!(!mailbox.has_pending());
    }

    #[test]
    fn test_mailbox_coalesces_same_class() {
        let mailbox = EventMailbox::new();
        assert!(mailbox.post(Event::SymbolTick, 1));
        assert!(!mailbox.post(Event::SymbolTick, 2));
        assert_eq!(mailbox.coalesced(), 1);

        // first post wins
        assert_eq!(mailbox.take().unwrap().timestamp_us, 1);
        assert!(mailbox.take().is_none());
    }
}
