//! Event mailbox tests
//!
//! Coalescing, priority order, and concurrent producers.

use std::sync::Arc;
use std::thread;

use wspr_beacon::{Calendar, Event, EventKind, EventMailbox, GpsFix};

fn drain_kinds(mailbox: &EventMailbox) -> Vec<EventKind> {
    std::iter::from_fn(|| mailbox.take())
        .map(|n| n.event.kind())
        .collect()
}

#[test]
fn test_mailbox_starts_empty() {
    let mailbox = EventMailbox::new();

    assert!(!mailbox.has_pending());
    assert!(mailbox.take().is_none());
    assert_eq!(mailbox.coalesced(), 0);
}

#[test]
fn test_mailbox_priority_order() {
    let mailbox = EventMailbox::new();
    let fix = GpsFix::from_position(Calendar::EPOCH_2000, 0.0, 0.0).unwrap();

    // posted lowest priority first
    mailbox.post(Event::SymbolTick, 1);
    mailbox.post(Event::AlarmFired, 2);
    mailbox.post(Event::StartReference { freq_hz: 10_000_000 }, 3);
    mailbox.post(Event::StartWspr, 4);
    mailbox.post(Event::StopReference, 5);
    mailbox.post(Event::StopWspr, 6);
    mailbox.post(Event::SettingsChanged, 7);
    mailbox.post(Event::GpsLockLost, 8);
    mailbox.post(Event::GpsLockAcquired(fix), 9);

    assert_eq!(
        drain_kinds(&mailbox),
        vec![
            EventKind::GpsLockAcquired,
            EventKind::GpsLockLost,
            EventKind::SettingsChanged,
            EventKind::StopWspr,
            EventKind::StopReference,
            EventKind::StartWspr,
            EventKind::StartReference,
            EventKind::AlarmFired,
            EventKind::SymbolTick,
        ]
    );
}

#[test]
fn test_mailbox_coalesces_per_class() {
    let mailbox = EventMailbox::new();

    assert!(mailbox.post(Event::SymbolTick, 1));
    assert!(!mailbox.post(Event::SymbolTick, 2));
    assert!(!mailbox.post(Event::SymbolTick, 3));
    assert!(mailbox.post(Event::AlarmFired, 4));

    assert_eq!(mailbox.coalesced(), 2);
    assert!(mailbox.is_pending(EventKind::SymbolTick));
    assert!(!mailbox.is_pending(EventKind::StopWspr));

    let alarm = mailbox.take().unwrap();
    assert_eq!(alarm.event, Event::AlarmFired);
    let tick = mailbox.take().unwrap();
    assert_eq!(tick.timestamp_us, 1, "first post of a class is kept");
    assert!(mailbox.take().is_none());

    mailbox.reset_coalesced();
    assert_eq!(mailbox.coalesced(), 0);
}

#[test]
fn test_mailbox_keeps_payload() {
    let mailbox = EventMailbox::new();

    mailbox.post(Event::StartReference { freq_hz: 7_040_100 }, 10);

    assert_eq!(
        mailbox.take().unwrap().event,
        Event::StartReference { freq_hz: 7_040_100 }
    );
}

#[test]
fn test_mailbox_slot_reusable_after_take() {
    let mailbox = EventMailbox::new();

    for t in 0..10 {
        assert!(mailbox.post(Event::SymbolTick, t));
        assert_eq!(mailbox.take().unwrap().timestamp_us, t);
    }
    assert_eq!(mailbox.coalesced(), 0);
}

#[test]
fn test_mailbox_concurrent_producers() {
    let mailbox = Arc::new(EventMailbox::new());
    let mut handles = vec![];

    for i in 0..4 {
        let mailbox = Arc::clone(&mailbox);
        handles.push(thread::spawn(move || {
            for j in 0..100 {
                let event = if i % 2 == 0 {
                    Event::SymbolTick
                } else {
                    Event::AlarmFired
                };
                mailbox.post(event, (i * 100 + j) as i64);
            }
        }));
    }

    let mut taken = 0u32;
    for _ in 0..1000 {
        if mailbox.take().is_some() {
            taken += 1;
        }
    }

    for handle in handles {
        handle.join().unwrap();
    }
    while mailbox.take().is_some() {
        taken += 1;
    }

    // every post is either delivered or counted as coalesced
    assert_eq!(taken + mailbox.coalesced(), 400);
}
