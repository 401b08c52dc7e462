//! Typed notifications delivered to the WSPR task.
//!
//! Interrupt handlers, the GPS collaborator and the operator console never
//! call the scheduler directly; they post one of these into the
//! [`EventMailbox`](crate::mailbox::EventMailbox).

use heapless::String;

use crate::clock::Calendar;
use crate::maidenhead::{to_maidenhead, MaidenheadError};
use crate::wspr::identity::{LOCATOR_LEN, LOCATOR_MAX_LEN};

/// Position and time from a GPS lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpsFix {
    /// UTC time of the fix.
    pub time: Calendar,
    /// Grid square of the fix.
    pub locator: String<LOCATOR_MAX_LEN>,
}

impl GpsFix {
    /// Build a fix from raw coordinates (north/east positive).
    pub fn from_position(time: Calendar, lat: f32, lon: f32) -> Result<Self, MaidenheadError> {
        let grid = to_maidenhead(lat, lon, LOCATOR_LEN)?;
        let mut locator = String::new();
        locator
            .push_str(&grid)
            .map_err(|_| MaidenheadError::InvalidLength)?;
        Ok(Self { time, locator })
    }
}

/// Something the scheduler must react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// GPS acquired a lock.
    GpsLockAcquired(GpsFix),
    /// GPS lost its lock.
    GpsLockLost,
    /// Identity fields in the settings store changed.
    SettingsChanged,
    /// Operator: stop WSPR.
    StopWspr,
    /// Operator: stop the reference tone.
    StopReference,
    /// Operator: start WSPR.
    StartWspr,
    /// Operator: start a reference tone at `freq_hz`.
    StartReference { freq_hz: u32 },
    /// RTC alarm: a transmit window starts now.
    AlarmFired,
    /// Symbol timer period elapsed.
    SymbolTick,
}

/// Event class. Discriminants give the order the WSPR task handles
/// simultaneously pending events in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum EventKind {
    GpsLockAcquired = 0,
    GpsLockLost = 1,
    SettingsChanged = 2,
    StopWspr = 3,
    StopReference = 4,
    StartWspr = 5,
    StartReference = 6,
    AlarmFired = 7,
    SymbolTick = 8,
}

impl EventKind {
    /// Number of event classes.
    pub const COUNT: usize = 9;
}

impl Event {
    #[inline]
    pub fn kind(&self) -> EventKind {
        match self {
            Event::GpsLockAcquired(_) => EventKind::GpsLockAcquired,
            Event::GpsLockLost => EventKind::GpsLockLost,
            Event::SettingsChanged => EventKind::SettingsChanged,
            Event::StopWspr => EventKind::StopWspr,
            Event::StopReference => EventKind::StopReference,
            Event::StartWspr => EventKind::StartWspr,
            Event::StartReference { .. } => EventKind::StartReference,
            Event::AlarmFired => EventKind::AlarmFired,
            Event::SymbolTick => EventKind::SymbolTick,
        }
    }
}

/// An event plus the time it was raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub event: Event,
    /// Producer timestamp in microseconds since boot.
    pub timestamp_us: i64,
}
