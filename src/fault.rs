//! Fault state for the beacon.
//!
//! A beacon that keys the wrong frequency is broken.
//! A beacon that stays silent is safe.
//!
//! The WSPR task records why it stopped here; the main loop and the status
//! console only read it.

use core::fmt;
use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

/// Fault codes indicating why the beacon stopped or skipped a window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum FaultCode {
    /// No fault (normal operation).
    None = 0,

    /// Synthesizer rejected a frequency or output command.
    /// Data: device error code.
    SynthesizerFault = 1,

    /// RTC read, write or alarm programming failed.
    /// Data: device error code.
    ClockFault = 2,

    /// The station identity could not be encoded; windows are skipped
    /// until the settings are fixed.
    EncodeFailed = 3,
}

impl FaultCode {
    /// Convert from raw u8 value.
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => FaultCode::SynthesizerFault,
            2 => FaultCode::ClockFault,
            3 => FaultCode::EncodeFailed,
            _ => FaultCode::None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FaultCode::None => "none",
            FaultCode::SynthesizerFault => "synthesizer fault",
            FaultCode::ClockFault => "clock fault",
            FaultCode::EncodeFailed => "encode failed",
        }
    }
}

impl fmt::Display for FaultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Thread-safe fault state.
///
/// # Usage
///
/// ```ignore
/// static FAULT: FaultState = FaultState::new();
///
/// // In the WSPR task:
/// if let Err(e) = scheduler.dispatch(notification) {
///     FAULT.set(e.fault_code(), e.device_code());
/// }
///
/// // In main loop:
/// if FAULT.is_active() {
///     signal_fault_led();
/// }
/// ```
pub struct FaultState {
    /// True if fault is active.
    active: AtomicBool,

    /// Fault code (reason for fault).
    code: AtomicU8,

    /// Additional data (device error code).
    data: AtomicU32,

    /// Total fault count since boot (never cleared).
    count: AtomicU32,
}

impl FaultState {
    /// Create new fault state (no fault).
    pub const fn new() -> Self {
        Self {
            active: AtomicBool::new(false),
            code: AtomicU8::new(0),
            data: AtomicU32::new(0),
            count: AtomicU32::new(0),
        }
    }

    /// Set fault state and bump the fault counter.
    #[inline]
    pub fn set(&self, code: FaultCode, data: u32) {
        self.code.store(code as u8, Ordering::Release);
        self.data.store(data, Ordering::Release);
        self.count.fetch_add(1, Ordering::Relaxed);
        self.active.store(true, Ordering::Release);
    }

    /// Check if fault is currently active.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Get fault code (only meaningful if `is_active()` is true).
    #[inline]
    pub fn code(&self) -> FaultCode {
        FaultCode::from_u8(self.code.load(Ordering::Acquire))
    }

    /// Get fault data (meaning depends on fault code).
    #[inline]
    pub fn data(&self) -> u32 {
        self.data.load(Ordering::Acquire)
    }

    /// Get total fault count since boot.
    #[inline]
    pub fn count(&self) -> u32 {
        self.count.load(Ordering::Relaxed)
    }

    /// Clear fault state (after recovery).
    ///
    /// Fault history (the counter) is preserved.
    #[inline]
    pub fn clear(&self) {
        self.active.store(false, Ordering::Release);
    }

    /// Clear only if the active fault has the given code.
    #[inline]
    pub fn clear_if(&self, code: FaultCode) -> bool {
        if self.is_active() && self.code() == code {
            self.clear();
            true
        } else {
            false
        }
    }

    /// Get a snapshot of the current fault state.
    #[inline]
    pub fn snapshot(&self) -> FaultSnapshot {
        FaultSnapshot {
            active: self.is_active(),
            code: self.code(),
            data: self.data(),
            count: self.count(),
        }
    }
}

impl Default for FaultState {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of fault state at a point in time.
#[derive(Clone, Copy, Debug)]
pub struct FaultSnapshot {
    pub active: bool,
    pub code: FaultCode,
    pub data: u32,
    pub count: u32,
}
