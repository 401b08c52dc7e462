//! WSPR transmission scheduler.
//!
//! Owns the hardware behind the `hal` traits and drives the
//! [`TransmissionSession`] through its modes:
//!
//! ```text
//!            start_wspr              alarm_fired (duty roll won)
//!   Idle ─────────────────▶ WsprArmed ─────────────────────▶ WsprTransmitting
//!    ▲ ▲                      ▲  ▲ │ alarm_fired (roll lost)         │
//!    │ │      stop_wspr       │  │ └──────────┘                     │
//!    │ └──────────────────────┘  └───────── 162nd symbol_tick ──────┘
//!    │
//!    └──── stop_reference ──── ReferenceTone ◀──── start_reference
//! ```
//!
//! Every handler runs on the single WSPR task, so transitions never race
//! each other. Interrupt-side code only posts to the mailbox.

use core::fmt;

use rand::{Rng, RngCore};

use crate::clock::Calendar;
use crate::config::SettingsStore;
use crate::event::{Event, GpsFix, Notification};
use crate::fault::{FaultCode, FaultState};
use crate::hal::{DeviceError, RealTimeClock, StatusLamp, SymbolTimer, Synthesizer};
use crate::logging::LogStream;
use crate::session::{Mode, TransmissionSession};
use crate::wspr::tables::SUB_BAND_COUNT;
use crate::wspr::{encode, SymbolSequence, SYMBOL_COUNT, SYMBOL_PERIOD_US, TONE_STEP_CENTIHZ};
use crate::{rt_debug, rt_error, rt_info, rt_trace, rt_warn};

/// Audio offset of the WSPR window above the dial, minus the lower guard.
/// Sub-band 0 starts here.
pub const SUB_BAND_ORIGIN_HZ: u32 = 1500 - 99;

/// Width of one sub-band.
pub const SUB_BAND_SPACING_HZ: u32 = 6;

/// Hardware failure surfaced by a scheduler operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerError {
    /// Synthesizer command failed.
    SynthesizerFault(DeviceError),
    /// RTC or symbol timer command failed.
    ClockFault(DeviceError),
}

impl SchedulerError {
    /// Fault code to record for this error.
    pub fn fault_code(&self) -> FaultCode {
        match self {
            SchedulerError::SynthesizerFault(_) => FaultCode::SynthesizerFault,
            SchedulerError::ClockFault(_) => FaultCode::ClockFault,
        }
    }

    /// Backend error code.
    pub fn device_code(&self) -> i32 {
        match self {
            SchedulerError::SynthesizerFault(e) | SchedulerError::ClockFault(e) => e.0,
        }
    }
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerError::SynthesizerFault(e) => write!(f, "synthesizer fault: {}", e),
            SchedulerError::ClockFault(e) => write!(f, "clock fault: {}", e),
        }
    }
}

/// Remember the first error of a best-effort sequence.
fn keep_first(first: &mut Option<SchedulerError>, result: Result<(), SchedulerError>) {
    if let Err(e) = result {
        first.get_or_insert(e);
    }
}

fn first_or_ok(first: Option<SchedulerError>) -> Result<(), SchedulerError> {
    match first {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// State shared between the scheduler and the rest of the firmware.
#[derive(Clone, Copy)]
pub struct Shared<'a> {
    pub session: &'a TransmissionSession,
    pub fault: &'a FaultState,
    pub log: &'a LogStream,
}

/// The transmission scheduler.
///
/// # Example
///
/// ```ignore
/// static SESSION: TransmissionSession = TransmissionSession::new();
/// static FAULT: FaultState = FaultState::new();
///
/// let shared = Shared { session: &SESSION, fault: &FAULT, log: &TASK_LOG_STREAM };
/// let mut scheduler =
///     Scheduler::new(synth, rtc, timer, lamp, BeaconConfig::new(), rng, shared);
/// scheduler.init()?;
/// scheduler.start_wspr()?;
/// ```
pub struct Scheduler<'a, Y, C, T, L, S, R> {
    synth: Y,
    rtc: C,
    timer: T,
    lamp: L,
    settings: S,
    rng: R,
    shared: Shared<'a>,
    symbols: Option<SymbolSequence>,
    now_us: i64,
}

impl<'a, Y, C, T, L, S, R> Scheduler<'a, Y, C, T, L, S, R>
where
    Y: Synthesizer,
    C: RealTimeClock,
    T: SymbolTimer,
    L: StatusLamp,
    S: SettingsStore,
    R: RngCore,
{
    pub fn new(
        synth: Y,
        rtc: C,
        timer: T,
        lamp: L,
        settings: S,
        rng: R,
        shared: Shared<'a>,
    ) -> Self {
        Self {
            synth,
            rtc,
            timer,
            lamp,
            settings,
            rng,
            shared,
            symbols: None,
            now_us: 0,
        }
    }

    /// Put the hardware in a known quiet state.
    ///
    /// Every step is attempted; the first failure is returned. The session
    /// always ends `Idle` with the message marked stale.
    pub fn init(&mut self) -> Result<(), SchedulerError> {
        let mut first = None;
        keep_first(&mut first, self.synth_off());
        keep_first(&mut first, self.timer_stop());
        keep_first(&mut first, self.rtc.cancel_alarm().map_err(SchedulerError::ClockFault));
        self.lamp_off();

        self.session().reset();
        self.session().mark_stale();
        self.symbols = None;

        rt_info!(self.shared.log, self.now_us, "scheduler init");
        first_or_ok(first)
    }

    /// Arm WSPR for the next even minute.
    ///
    /// No-op if already armed or transmitting. A running reference tone is
    /// stopped first, and keyed again if arming fails.
    pub fn start_wspr(&mut self) -> Result<(), SchedulerError> {
        let mode = self.session().mode();
        if mode.is_wspr() {
            return Ok(());
        }

        let armed = if mode == Mode::ReferenceTone {
            let freq_hz = self.session().base_frequency_hz();
            let armed = self
                .stop_reference()
                .and_then(|()| self.schedule_next_window());
            if armed.is_err() {
                self.resume_reference(freq_hz);
            }
            armed
        } else {
            self.schedule_next_window()
        };

        let at = armed?;
        self.transition(Mode::WsprArmed);
        rt_info!(self.shared.log, self.now_us, "next window {}", at);
        Ok(())
    }

    /// Disarm WSPR and abandon any transmission in progress.
    ///
    /// Leaves a reference tone untouched.
    pub fn stop_wspr(&mut self) -> Result<(), SchedulerError> {
        let mode = self.session().mode();
        let mut first = None;

        keep_first(&mut first, self.rtc.cancel_alarm().map_err(SchedulerError::ClockFault));
        if mode == Mode::ReferenceTone {
            return first_or_ok(first);
        }

        if mode == Mode::WsprTransmitting {
            keep_first(&mut first, self.synth_off());
            self.lamp_off();
        }
        keep_first(&mut first, self.timer_stop());

        self.session().set_symbol_cursor(0);
        self.transition(Mode::Idle);
        first_or_ok(first)
    }

    /// Emit a continuous carrier at `freq_hz`, re-applied on every symbol
    /// tick with the current PPM correction.
    ///
    /// WSPR is stopped first, and re-armed if the carrier cannot be keyed.
    pub fn start_reference(&mut self, freq_hz: u32) -> Result<(), SchedulerError> {
        let mode = self.session().mode();
        if mode == Mode::ReferenceTone {
            return Ok(());
        }
        if !mode.is_wspr() {
            return self.key_reference(freq_hz);
        }

        let keyed = self
            .stop_wspr()
            .and_then(|()| self.key_reference(freq_hz));
        if keyed.is_err() {
            self.resume_wspr();
        }
        keyed
    }

    /// Stop the reference carrier. No-op unless a reference tone is on.
    pub fn stop_reference(&mut self) -> Result<(), SchedulerError> {
        if self.session().mode() != Mode::ReferenceTone {
            return Ok(());
        }

        let mut first = None;
        keep_first(&mut first, self.timer_stop());
        keep_first(&mut first, self.synth_off());

        self.transition(Mode::Idle);
        first_or_ok(first)
    }

    fn key_reference(&mut self, freq_hz: u32) -> Result<(), SchedulerError> {
        let ppm = self.settings.get_ppm_correction();
        self.synth
            .set_frequency(u64::from(freq_hz) * 100, ppm, true)
            .map_err(SchedulerError::SynthesizerFault)?;

        if let Err(e) = self.timer_start() {
            let _ = self.synth.output_off();
            return Err(e);
        }

        let session = self.session();
        session.set_symbol_cursor(0);
        session.set_base_frequency_hz(freq_hz);
        session.set_ppm_correction(ppm);
        self.transition(Mode::ReferenceTone);
        rt_info!(self.shared.log, self.now_us, "reference {} Hz ppm {}", freq_hz, ppm);
        Ok(())
    }

    /// Put a reference tone back after a failed switch to WSPR.
    fn resume_reference(&mut self, freq_hz: u32) {
        match self.key_reference(freq_hz) {
            Ok(()) => rt_warn!(self.shared.log, self.now_us, "wspr not armed, reference restored"),
            Err(e) => rt_error!(self.shared.log, self.now_us, "reference not restored: {}", e),
        }
    }

    /// Re-arm WSPR after a failed switch to a reference tone.
    fn resume_wspr(&mut self) {
        match self.start_wspr() {
            Ok(()) => rt_warn!(self.shared.log, self.now_us, "reference not keyed, wspr re-armed"),
            Err(e) => rt_error!(self.shared.log, self.now_us, "wspr not re-armed: {}", e),
        }
    }

    /// Start-of-window alarm.
    ///
    /// Re-encodes a stale message, rolls the duty cycle, starts the
    /// transmission if the roll wins, and always re-arms for the next
    /// window while WSPR is active.
    pub fn alarm_fired(&mut self) -> Result<(), SchedulerError> {
        match self.session().mode() {
            Mode::WsprArmed => {}
            Mode::WsprTransmitting => {
                rt_debug!(self.shared.log, self.now_us, "alarm during transmission, re-arming");
                return self.schedule_next_window().map(|_| ());
            }
            Mode::Idle | Mode::ReferenceTone => return Ok(()),
        }

        let mut first = None;
        if self.refresh_message() {
            keep_first(&mut first, self.maybe_transmit());
        }
        keep_first(&mut first, self.schedule_next_window().map(|_| ()));
        first_or_ok(first)
    }

    /// Symbol timer period elapsed.
    pub fn symbol_tick(&mut self) -> Result<(), SchedulerError> {
        match self.session().mode() {
            Mode::WsprTransmitting => self.next_symbol(),
            Mode::ReferenceTone => self.refresh_reference(),
            Mode::Idle | Mode::WsprArmed => Ok(()),
        }
    }

    /// GPS lock: set the RTC, re-arm a pending window, and if GPS use is
    /// enabled adopt the fix's locator and (re)start WSPR.
    pub fn gps_lock_acquired(&mut self, fix: &GpsFix) -> Result<(), SchedulerError> {
        self.rtc
            .set_time(fix.time)
            .map_err(SchedulerError::ClockFault)?;
        self.session().set_clock_synced();
        rt_info!(self.shared.log, self.now_us, "gps lock {} {}", fix.time, fix.locator);

        // setting the clock invalidates any pending alarm
        if self.session().is_wspr_active() {
            self.schedule_next_window()?;
        }

        if self.settings.get_gps_enabled() {
            match self.settings.set_locator(&fix.locator) {
                Ok(()) => self.session().mark_stale(),
                Err(e) => rt_warn!(self.shared.log, self.now_us, "gps locator rejected: {}", e),
            }
            self.start_wspr()?;
        }
        Ok(())
    }

    /// GPS lost its lock. The last fix and RTC time stay in use.
    pub fn gps_lock_lost(&mut self) -> Result<(), SchedulerError> {
        rt_info!(self.shared.log, self.now_us, "gps lock lost");
        Ok(())
    }

    /// Identity fields changed; re-encode before the next transmission.
    pub fn settings_changed(&mut self) {
        self.session().mark_stale();
        rt_debug!(self.shared.log, self.now_us, "message stale");
    }

    /// Mutate the settings, marking the message stale if the station
    /// identity changed.
    pub fn update_settings<F>(&mut self, f: F)
    where
        F: FnOnce(&mut S),
    {
        let before = self.settings.get_identity();
        f(&mut self.settings);
        if self.settings.get_identity() != before {
            self.settings_changed();
        }
    }

    /// Handle one mailbox notification.
    pub fn dispatch(&mut self, notification: Notification) -> Result<(), SchedulerError> {
        self.now_us = notification.timestamp_us;
        match notification.event {
            Event::GpsLockAcquired(fix) => self.gps_lock_acquired(&fix),
            Event::GpsLockLost => self.gps_lock_lost(),
            Event::SettingsChanged => {
                self.settings_changed();
                Ok(())
            }
            Event::StopWspr => self.stop_wspr(),
            Event::StopReference => self.stop_reference(),
            Event::StartWspr => self.start_wspr(),
            Event::StartReference { freq_hz } => self.start_reference(freq_hz),
            Event::AlarmFired => self.alarm_fired(),
            Event::SymbolTick => self.symbol_tick(),
        }
    }

    /// Timestamp used for log entries from direct calls.
    pub fn set_time_us(&mut self, now_us: i64) {
        self.now_us = now_us;
    }

    #[inline]
    pub fn session(&self) -> &'a TransmissionSession {
        self.shared.session
    }

    #[inline]
    pub fn shared(&self) -> Shared<'a> {
        self.shared
    }

    /// Timestamp of the notification being handled.
    #[inline]
    pub fn now_us(&self) -> i64 {
        self.now_us
    }

    /// Last successfully encoded message.
    pub fn symbols(&self) -> Option<&SymbolSequence> {
        self.symbols.as_ref()
    }

    pub fn settings(&self) -> &S {
        &self.settings
    }

    pub fn synth(&self) -> &Y {
        &self.synth
    }

    pub fn rtc(&self) -> &C {
        &self.rtc
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn lamp(&self) -> &L {
        &self.lamp
    }

    // ---------------------------------------------------------------------

    fn transition(&self, to: Mode) {
        let from = self.session().mode();
        self.session().set_mode(to);
        if from != to {
            rt_info!(self.shared.log, self.now_us, "{:?} -> {:?}", from, to);
        }
    }

    fn synth_off(&mut self) -> Result<(), SchedulerError> {
        self.synth.output_off().map_err(SchedulerError::SynthesizerFault)
    }

    /// Lamp failures never abort a transmission.
    fn lamp_off(&mut self) {
        if let Err(e) = self.lamp.off() {
            rt_warn!(self.shared.log, self.now_us, "lamp: {}", e);
        }
    }

    fn timer_start(&mut self) -> Result<(), SchedulerError> {
        self.timer
            .start(SYMBOL_PERIOD_US)
            .map_err(SchedulerError::ClockFault)
    }

    fn timer_stop(&mut self) -> Result<(), SchedulerError> {
        self.timer.stop().map_err(SchedulerError::ClockFault)
    }

    /// Program the RTC alarm for the next even minute.
    fn schedule_next_window(&mut self) -> Result<Calendar, SchedulerError> {
        let now = self.rtc.get_time().map_err(SchedulerError::ClockFault)?;
        let at = now.next_transmit_window();
        self.rtc.set_alarm(at).map_err(SchedulerError::ClockFault)?;
        Ok(at)
    }

    /// Re-encode if stale. Returns false if there is no usable message.
    fn refresh_message(&mut self) -> bool {
        let session = self.session();
        if !session.take_stale() && self.symbols.is_some() {
            return true;
        }

        let identity = self.settings.get_identity();
        match encode(&identity) {
            Ok(symbols) => {
                self.symbols = Some(symbols);
                self.shared.fault.clear_if(FaultCode::EncodeFailed);
                rt_debug!(
                    self.shared.log,
                    self.now_us,
                    "encoded {} {} {}",
                    identity.callsign,
                    identity.locator,
                    identity.power_dbm
                );
                true
            }
            Err(e) => {
                // retry at the next window
                session.mark_stale();
                self.shared.fault.set(FaultCode::EncodeFailed, 0);
                rt_warn!(self.shared.log, self.now_us, "encode failed: {}, skipping window", e);
                false
            }
        }
    }

    /// Roll the duty cycle and start the transmission on a win.
    fn maybe_transmit(&mut self) -> Result<(), SchedulerError> {
        let duty = self.settings.get_duty_cycle_percent();
        let roll: u8 = self.rng.gen_range(0..100);
        if roll >= duty {
            rt_info!(self.shared.log, self.now_us, "duty roll {} >= {}, idle window", roll, duty);
            return Ok(());
        }

        let sub_band = match self.settings.get_sub_band() {
            Some(idx) => idx.min(SUB_BAND_COUNT - 1),
            None => self.rng.gen_range(0..SUB_BAND_COUNT),
        };
        let base_hz = self
            .settings
            .get_dial_frequency_hz()
            .saturating_add(SUB_BAND_ORIGIN_HZ)
            .saturating_add(u32::from(sub_band) * SUB_BAND_SPACING_HZ);
        let ppm = self.settings.get_ppm_correction();

        let session = self.session();
        session.set_base_frequency_hz(base_hz);
        session.set_ppm_correction(ppm);
        session.set_symbol_cursor(0);

        let first_tone = self.tone_centihz(0);
        self.synth
            .set_frequency(first_tone, ppm, true)
            .map_err(SchedulerError::SynthesizerFault)?;

        if let Err(e) = self.timer_start() {
            let _ = self.synth.output_off();
            return Err(e);
        }

        session.set_symbol_cursor(1);
        if let Err(e) = self.lamp.on() {
            rt_warn!(self.shared.log, self.now_us, "lamp: {}", e);
        }
        self.transition(Mode::WsprTransmitting);
        rt_info!(
            self.shared.log,
            self.now_us,
            "tx sub-band {} base {} Hz (roll {} < {})",
            sub_band,
            base_hz,
            roll,
            duty
        );
        Ok(())
    }

    fn tone_centihz(&self, idx: usize) -> u64 {
        let symbol = self
            .symbols
            .as_ref()
            .and_then(|s| s.get(idx))
            .unwrap_or(0);
        u64::from(self.session().base_frequency_hz()) * 100
            + u64::from(symbol) * TONE_STEP_CENTIHZ
    }

    fn next_symbol(&mut self) -> Result<(), SchedulerError> {
        let cursor = self.session().symbol_cursor() as usize;

        if cursor >= SYMBOL_COUNT {
            return self.finish_transmission();
        }

        let tone = self.tone_centihz(cursor);
        let ppm = self.session().ppm_correction();
        if let Err(e) = self.synth.set_frequency(tone, ppm, false) {
            // a wrong tone corrupts the whole message: stop now
            rt_error!(self.shared.log, self.now_us, "symbol {} failed: {}", cursor, e);
            let _ = self.finish_transmission();
            return Err(SchedulerError::SynthesizerFault(e));
        }

        if let Err(e) = self.lamp.toggle() {
            rt_warn!(self.shared.log, self.now_us, "lamp: {}", e);
        }
        rt_trace!(self.shared.log, self.now_us, "symbol {} tone {} cHz", cursor, tone);
        self.session().set_symbol_cursor(cursor as u8 + 1);
        Ok(())
    }

    fn finish_transmission(&mut self) -> Result<(), SchedulerError> {
        let mut first = None;
        self.lamp_off();
        keep_first(&mut first, self.synth_off());
        keep_first(&mut first, self.timer_stop());
        self.session().set_symbol_cursor(0);
        self.transition(Mode::WsprArmed);
        first_or_ok(first)
    }

    fn refresh_reference(&mut self) -> Result<(), SchedulerError> {
        let ppm = self.settings.get_ppm_correction();
        let freq_hz = self.session().base_frequency_hz();
        self.synth
            .set_frequency(u64::from(freq_hz) * 100, ppm, false)
            .map_err(SchedulerError::SynthesizerFault)?;
        self.session().set_ppm_correction(ppm);
        Ok(())
    }
}
