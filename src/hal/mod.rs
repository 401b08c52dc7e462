//! Hardware Abstraction Layer for WsprBeacon.
//!
//! Capability traits only. Business logic stays in core modules, HAL is
//! just I/O; ESP-IDF backends live in the firmware binary.

pub mod traits;

pub use traits::{DeviceError, RealTimeClock, StatusLamp, Synthesizer, SymbolTimer};
