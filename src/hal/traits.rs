//! Hardware capability traits consumed by the scheduler.
//!
//! Each backend (real peripherals or a test double) implements the subset
//! it provides. Interrupt delivery is not part of these traits: backends
//! post [`Event::AlarmFired`](crate::event::Event::AlarmFired) and
//! [`Event::SymbolTick`](crate::event::Event::SymbolTick) into the
//! [`EventMailbox`](crate::mailbox::EventMailbox) they were built with.

use crate::clock::Calendar;

/// Backend failure code (bus error, driver status, etc.).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceError(pub i32);

impl core::fmt::Display for DeviceError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "device error {}", self.0)
    }
}

/// RF frequency synthesizer output.
pub trait Synthesizer {
    /// Program the output to `centihertz`, trimmed by `ppm_correction`.
    ///
    /// `reset_phase` restarts the PLL; it is only requested on the first
    /// symbol of a transmission and when a reference tone starts.
    fn set_frequency(&mut self, centihertz: u64, ppm_correction: i32, reset_phase: bool) -> Result<(), DeviceError>;

    /// Disable the RF output.
    fn output_off(&mut self) -> Result<(), DeviceError>;
}

/// Battery-backed real-time clock with one alarm.
pub trait RealTimeClock {
    fn get_time(&mut self) -> Result<Calendar, DeviceError>;

    fn set_time(&mut self, time: Calendar) -> Result<(), DeviceError>;

    /// Arm the alarm; a previously armed alarm is replaced.
    fn set_alarm(&mut self, at: Calendar) -> Result<(), DeviceError>;

    fn cancel_alarm(&mut self) -> Result<(), DeviceError>;
}

/// Periodic symbol-rate timer.
pub trait SymbolTimer {
    /// Start ticking every `period_us`, first tick one period from now.
    fn start(&mut self, period_us: u32) -> Result<(), DeviceError>;

    fn stop(&mut self) -> Result<(), DeviceError>;
}

/// Transmit indicator lamp.
///
/// Lit for the whole transmission and toggled on every symbol, so a
/// stuck symbol clock shows up as a steady lamp.
pub trait StatusLamp {
    fn on(&mut self) -> Result<(), DeviceError>;

    fn toggle(&mut self) -> Result<(), DeviceError>;

    fn off(&mut self) -> Result<(), DeviceError>;
}
