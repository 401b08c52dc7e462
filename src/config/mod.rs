//! Module: config
//!
//! Purpose: Beacon settings read by the transmit core.
//!
//! Architecture:
//! - `BeaconConfig`: in-RAM settings with out-of-box defaults
//! - `SettingsStore`: the read interface the scheduler depends on
//! - Persistence to flash is owned by the settings collaborator, not here
//!
//! Identity fields (callsign, locator, power) feed the encoder; changing
//! them must be followed by `Scheduler::settings_changed()`, which
//! `Scheduler::update_settings()` does automatically.

use heapless::String;

use crate::wspr::identity::{StationIdentity, CALLSIGN_LEN, LOCATOR_MAX_LEN};
use crate::wspr::tables::SUB_BAND_COUNT;

/// Conventional 20 m WSPR dial frequency.
pub const DEFAULT_DIAL_FREQ_HZ: u32 = 14_095_600;

/// Default transmit probability per window.
pub const DEFAULT_DUTY_PCT: u8 = 20;

/// Default power: 10 dBm (10 mW).
pub const DEFAULT_POWER_DBM: u8 = 10;

/// Setting rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Text does not fit its field.
    TooLong,
    /// Numeric value outside its allowed range.
    OutOfRange,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::TooLong => write!(f, "value too long"),
            Self::OutOfRange => write!(f, "out of range"),
        }
    }
}

/// Read side of the settings collaborator.
pub trait SettingsStore {
    fn get_identity(&self) -> StationIdentity;

    /// Transmit probability per window, 0-100.
    fn get_duty_cycle_percent(&self) -> u8;

    /// Fixed sub-band 0-32, or `None` to pick one at random per window.
    fn get_sub_band(&self) -> Option<u8>;

    /// Whether GPS fixes update the locator and auto-start WSPR.
    fn get_gps_enabled(&self) -> bool;

    fn get_ppm_correction(&self) -> i32;

    /// USB dial frequency; the WSPR window is centred 1500 Hz above it.
    fn get_dial_frequency_hz(&self) -> u32;

    /// Replace the locator (GPS-derived).
    fn set_locator(&mut self, locator: &str) -> Result<(), ConfigError>;
}

/// Beacon settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeaconConfig {
    dial_freq_hz: u32,
    sub_band: Option<u8>,
    duty_pct: u8,
    callsign: String<CALLSIGN_LEN>,
    locator: String<LOCATOR_MAX_LEN>,
    power_dbm: u8,
    use_gps: bool,
    ppm_correction: i32,
}

impl Default for BeaconConfig {
    fn default() -> Self {
        Self {
            dial_freq_hz: DEFAULT_DIAL_FREQ_HZ,
            sub_band: None,
            duty_pct: DEFAULT_DUTY_PCT,
            callsign: String::new(),
            locator: String::new(),
            power_dbm: DEFAULT_POWER_DBM,
            use_gps: true,
            ppm_correction: 0,
        }
    }
}

impl BeaconConfig {
    /// Out-of-box defaults. Callsign and locator are empty and must be set.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_callsign(&mut self, callsign: &str) -> Result<(), ConfigError> {
        self.callsign = copy_str(callsign)?;
        Ok(())
    }

    pub fn set_power_dbm(&mut self, power_dbm: u8) -> Result<(), ConfigError> {
        if power_dbm > crate::wspr::identity::MAX_POWER_DBM {
            return Err(ConfigError::OutOfRange);
        }
        self.power_dbm = power_dbm;
        Ok(())
    }

    pub fn set_duty_cycle_percent(&mut self, duty_pct: u8) -> Result<(), ConfigError> {
        if duty_pct > 100 {
            return Err(ConfigError::OutOfRange);
        }
        self.duty_pct = duty_pct;
        Ok(())
    }

    pub fn set_sub_band(&mut self, sub_band: Option<u8>) -> Result<(), ConfigError> {
        if matches!(sub_band, Some(idx) if idx >= SUB_BAND_COUNT) {
            return Err(ConfigError::OutOfRange);
        }
        self.sub_band = sub_band;
        Ok(())
    }

    pub fn set_dial_frequency_hz(&mut self, dial_freq_hz: u32) {
        self.dial_freq_hz = dial_freq_hz;
    }

    pub fn set_gps_enabled(&mut self, use_gps: bool) {
        self.use_gps = use_gps;
    }

    pub fn set_ppm_correction(&mut self, ppm: i32) {
        self.ppm_correction = ppm;
    }

    pub fn callsign(&self) -> &str {
        &self.callsign
    }

    pub fn locator(&self) -> &str {
        &self.locator
    }

    pub fn power_dbm(&self) -> u8 {
        self.power_dbm
    }
}

impl SettingsStore for BeaconConfig {
    fn get_identity(&self) -> StationIdentity {
        StationIdentity {
            callsign: self.callsign.clone(),
            locator: self.locator.clone(),
            power_dbm: self.power_dbm,
        }
    }

    fn get_duty_cycle_percent(&self) -> u8 {
        self.duty_pct
    }

    fn get_sub_band(&self) -> Option<u8> {
        self.sub_band
    }

    fn get_gps_enabled(&self) -> bool {
        self.use_gps
    }

    fn get_ppm_correction(&self) -> i32 {
        self.ppm_correction
    }

    fn get_dial_frequency_hz(&self) -> u32 {
        self.dial_freq_hz
    }

    fn set_locator(&mut self, locator: &str) -> Result<(), ConfigError> {
        self.locator = copy_str(locator)?;
        Ok(())
    }
}

fn copy_str<const N: usize>(value: &str) -> Result<String<N>, ConfigError> {
    let mut out = String::new();
    out.push_str(value.trim()).map_err(|_| ConfigError::TooLong)?;
    Ok(out)
}
