//! # WsprBeacon
//!
//! Transmit core of a stand-alone WSPR beacon.
//!
//! ## Architecture
//!
//! ```text
//! RTC alarm ─┐                                   ┌─▶ Synthesizer
//! timer ─────┼─▶ EventMailbox ─▶ WsprTask ─▶ Scheduler ─▶ RTC alarm
//! GPS ───────┤   (lock-free)     (single      │    └─▶ Symbol timer
//! console ───┘                   consumer)    ▼
//!                                    TransmissionSession ◀── status queries
//! ```
//!
//! - The encoder (`wspr`) is a pure function of the station identity
//! - Interrupt context only posts events; all transitions run on one task
//! - Hardware sits behind the `hal` traits, so every module runs on the host

#![cfg_attr(not(test), no_std)]

pub mod clock;
pub mod config;
pub mod event;
pub mod fault;
pub mod hal;
pub mod log_globals;
pub mod logging;
pub mod maidenhead;
pub mod mailbox;
pub mod scheduler;
pub mod session;
pub mod task;
pub mod uart_logger;
pub mod wspr;

pub use clock::Calendar;
pub use config::{BeaconConfig, ConfigError, SettingsStore};
pub use event::{Event, EventKind, GpsFix, Notification};
pub use fault::{FaultCode, FaultState};
pub use hal::{DeviceError, RealTimeClock, StatusLamp, SymbolTimer, Synthesizer};
pub use log_globals::{ISR_LOG_STREAM, TASK_LOG_STREAM};
pub use mailbox::EventMailbox;
pub use scheduler::{Scheduler, SchedulerError, Shared};
pub use session::{Mode, TransmissionSession};
pub use task::WsprTask;
pub use wspr::{encode, EncodeError, StationIdentity, SymbolSequence};
