//! Transmission session state.
//!
//! One process-lifetime instance, written only by the scheduler (on the
//! consumer task) and read lock-free by status queries from any context.
//! The mode is a single tagged value, so "reference and WSPR at once"
//! cannot be represented.

use core::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, AtomicU8, Ordering};

/// Scheduler state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Mode {
    /// Nothing scheduled, output off.
    Idle = 0,
    /// Continuous calibration carrier.
    ReferenceTone = 1,
    /// Alarm armed for the next even minute.
    WsprArmed = 2,
    /// Symbols being clocked out.
    WsprTransmitting = 3,
}

impl Mode {
    /// Convert from raw u8 value.
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Mode::ReferenceTone,
            2 => Mode::WsprArmed,
            3 => Mode::WsprTransmitting,
            _ => Mode::Idle,
        }
    }

    #[inline]
    pub fn is_wspr(self) -> bool {
        matches!(self, Mode::WsprArmed | Mode::WsprTransmitting)
    }
}

/// Shared session state.
///
/// # Usage
///
/// ```ignore
/// static SESSION: TransmissionSession = TransmissionSession::new();
///
/// // console task:
/// if SESSION.is_transmitting_now() { ... }
/// ```
pub struct TransmissionSession {
    mode: AtomicU8,
    message_stale: AtomicBool,
    symbol_cursor: AtomicU8,
    base_frequency_hz: AtomicU32,
    ppm_correction: AtomicI32,
    clock_synced: AtomicBool,
}

impl TransmissionSession {
    /// Initial state: `Idle`, message stale.
    pub const fn new() -> Self {
        Self {
            mode: AtomicU8::new(Mode::Idle as u8),
            message_stale: AtomicBool::new(true),
            symbol_cursor: AtomicU8::new(0),
            base_frequency_hz: AtomicU32::new(0),
            ppm_correction: AtomicI32::new(0),
            clock_synced: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn mode(&self) -> Mode {
        Mode::from_u8(self.mode.load(Ordering::Acquire))
    }

    #[inline]
    pub(crate) fn set_mode(&self, mode: Mode) {
        self.mode.store(mode as u8, Ordering::Release);
    }

    /// WSPR armed or transmitting.
    #[inline]
    pub fn is_wspr_active(&self) -> bool {
        self.mode().is_wspr()
    }

    #[inline]
    pub fn is_reference_active(&self) -> bool {
        self.mode() == Mode::ReferenceTone
    }

    /// RF output is on right now (reference tone or a WSPR transmission).
    #[inline]
    pub fn is_transmitting_now(&self) -> bool {
        matches!(self.mode(), Mode::ReferenceTone | Mode::WsprTransmitting)
    }

    /// Flag the encoded message as out of date. Safe from any context.
    #[inline]
    pub fn mark_stale(&self) {
        self.message_stale.store(true, Ordering::Release);
    }

    /// Test-and-clear the stale flag.
    #[inline]
    pub(crate) fn take_stale(&self) -> bool {
        self.message_stale.swap(false, Ordering::AcqRel)
    }

    #[inline]
    pub fn is_message_stale(&self) -> bool {
        self.message_stale.load(Ordering::Acquire)
    }

    /// Next symbol to send, 0..=162.
    #[inline]
    pub fn symbol_cursor(&self) -> u8 {
        self.symbol_cursor.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn set_symbol_cursor(&self, cursor: u8) {
        self.symbol_cursor.store(cursor, Ordering::Release);
    }

    /// Sub-band base (WSPR) or carrier (reference) frequency in Hz.
    #[inline]
    pub fn base_frequency_hz(&self) -> u32 {
        self.base_frequency_hz.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn set_base_frequency_hz(&self, hz: u32) {
        self.base_frequency_hz.store(hz, Ordering::Release);
    }

    /// Correction applied to the most recent synthesizer write.
    #[inline]
    pub fn ppm_correction(&self) -> i32 {
        self.ppm_correction.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn set_ppm_correction(&self, ppm: i32) {
        self.ppm_correction.store(ppm, Ordering::Release);
    }

    /// RTC has been set from GPS at least once since boot.
    #[inline]
    pub fn is_clock_synced(&self) -> bool {
        self.clock_synced.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn set_clock_synced(&self) {
        self.clock_synced.store(true, Ordering::Release);
    }

    /// Back to `Idle`, cursor 0. The stale flag is left alone.
    pub(crate) fn reset(&self) {
        self.set_symbol_cursor(0);
        self.set_mode(Mode::Idle);
    }

    /// Get a snapshot of the current session state.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            mode: self.mode(),
            message_stale: self.is_message_stale(),
            symbol_cursor: self.symbol_cursor(),
            base_frequency_hz: self.base_frequency_hz(),
            ppm_correction: self.ppm_correction(),
            clock_synced: self.is_clock_synced(),
        }
    }
}

impl Default for TransmissionSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of session state at a point in time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub mode: Mode,
    pub message_stale: bool,
    pub symbol_cursor: u8,
    pub base_frequency_hz: u32,
    pub ppm_correction: i32,
    pub clock_synced: bool,
}
