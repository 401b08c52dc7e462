//! Recording test doubles for the hardware traits.
//!
//! Each mock is a cheap handle over shared state, so a test keeps a clone
//! to inspect calls and inject failures after the scheduler owns the
//! original.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use wspr_beacon::config::BeaconConfig;
use wspr_beacon::logging::LogStream;
use wspr_beacon::{
    Calendar, DeviceError, FaultState, RealTimeClock, Scheduler, Shared, StatusLamp,
    SymbolTimer, Synthesizer, TransmissionSession,
};

// --- Synthesizer ---------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthCall {
    SetFrequency {
        centihertz: u64,
        ppm: i32,
        reset_phase: bool,
    },
    OutputOff,
}

#[derive(Default)]
pub struct SynthState {
    pub calls: Vec<SynthCall>,
    pub fail_set_frequency: Option<i32>,
    pub fail_output_off: Option<i32>,
}

#[derive(Clone, Default)]
pub struct MockSynth(pub Rc<RefCell<SynthState>>);

impl MockSynth {
    pub fn calls(&self) -> Vec<SynthCall> {
        self.0.borrow().calls.clone()
    }

    pub fn output_off_count(&self) -> usize {
        self.0
            .borrow()
            .calls
            .iter()
            .filter(|c| **c == SynthCall::OutputOff)
            .count()
    }

    /// Every programmed frequency, in order.
    pub fn tones(&self) -> Vec<u64> {
        self.0
            .borrow()
            .calls
            .iter()
            .filter_map(|c| match c {
                SynthCall::SetFrequency { centihertz, .. } => Some(*centihertz),
                SynthCall::OutputOff => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().calls.clear();
    }

    pub fn fail_set_frequency(&self, code: Option<i32>) {
        self.0.borrow_mut().fail_set_frequency = code;
    }

    pub fn fail_output_off(&self, code: Option<i32>) {
        self.0.borrow_mut().fail_output_off = code;
    }
}

impl Synthesizer for MockSynth {
    fn set_frequency(
        &mut self,
        centihertz: u64,
        ppm_correction: i32,
        reset_phase: bool,
    ) -> Result<(), DeviceError> {
        let mut state = self.0.borrow_mut();
        if let Some(code) = state.fail_set_frequency {
            return Err(DeviceError(code));
        }
        state.calls.push(SynthCall::SetFrequency {
            centihertz,
            ppm: ppm_correction,
            reset_phase,
        });
        Ok(())
    }

    fn output_off(&mut self) -> Result<(), DeviceError> {
        let mut state = self.0.borrow_mut();
        state.calls.push(SynthCall::OutputOff);
        match state.fail_output_off {
            Some(code) => Err(DeviceError(code)),
            None => Ok(()),
        }
    }
}

// --- RTC -----------------------------------------------------------------

pub struct RtcState {
    pub now: Calendar,
    pub alarm: Option<Calendar>,
    pub alarms_set: Vec<Calendar>,
    pub times_set: Vec<Calendar>,
    pub cancels: usize,
    pub fail_get_time: Option<i32>,
    pub fail_set_alarm: Option<i32>,
    pub fail_set_time: Option<i32>,
}

#[derive(Clone)]
pub struct MockRtc(pub Rc<RefCell<RtcState>>);

impl MockRtc {
    pub fn new(now: Calendar) -> Self {
        Self(Rc::new(RefCell::new(RtcState {
            now,
            alarm: None,
            alarms_set: Vec::new(),
            times_set: Vec::new(),
            cancels: 0,
            fail_get_time: None,
            fail_set_alarm: None,
            fail_set_time: None,
        })))
    }

    pub fn set_now(&self, now: Calendar) {
        self.0.borrow_mut().now = now;
    }

    pub fn alarm(&self) -> Option<Calendar> {
        self.0.borrow().alarm
    }

    pub fn alarms_set(&self) -> usize {
        self.0.borrow().alarms_set.len()
    }

    pub fn cancels(&self) -> usize {
        self.0.borrow().cancels
    }

    pub fn times_set(&self) -> Vec<Calendar> {
        self.0.borrow().times_set.clone()
    }

    pub fn fail_get_time(&self, code: Option<i32>) {
        self.0.borrow_mut().fail_get_time = code;
    }

    pub fn fail_set_time(&self, code: Option<i32>) {
        self.0.borrow_mut().fail_set_time = code;
    }
}

impl RealTimeClock for MockRtc {
    fn get_time(&mut self) -> Result<Calendar, DeviceError> {
        let state = self.0.borrow();
        match state.fail_get_time {
            Some(code) => Err(DeviceError(code)),
            None => Ok(state.now),
        }
    }

    fn set_time(&mut self, time: Calendar) -> Result<(), DeviceError> {
        let mut state = self.0.borrow_mut();
        if let Some(code) = state.fail_set_time {
            return Err(DeviceError(code));
        }
        state.now = time;
        state.times_set.push(time);
        Ok(())
    }

    fn set_alarm(&mut self, at: Calendar) -> Result<(), DeviceError> {
        let mut state = self.0.borrow_mut();
        if let Some(code) = state.fail_set_alarm {
            return Err(DeviceError(code));
        }
        state.alarm = Some(at);
        state.alarms_set.push(at);
        Ok(())
    }

    fn cancel_alarm(&mut self) -> Result<(), DeviceError> {
        let mut state = self.0.borrow_mut();
        state.alarm = None;
        state.cancels += 1;
        Ok(())
    }
}

// --- Symbol timer --------------------------------------------------------

#[derive(Default)]
pub struct TimerState {
    pub period_us: Option<u32>,
    pub starts: usize,
    pub stops: usize,
    pub fail_start: Option<i32>,
}

#[derive(Clone, Default)]
pub struct MockTimer(pub Rc<RefCell<TimerState>>);

impl MockTimer {
    pub fn is_running(&self) -> bool {
        self.0.borrow().period_us.is_some()
    }

    pub fn period_us(&self) -> Option<u32> {
        self.0.borrow().period_us
    }

    pub fn starts(&self) -> usize {
        self.0.borrow().starts
    }

    pub fn stops(&self) -> usize {
        self.0.borrow().stops
    }

    pub fn fail_start(&self, code: Option<i32>) {
        self.0.borrow_mut().fail_start = code;
    }
}

impl SymbolTimer for MockTimer {
    fn start(&mut self, period_us: u32) -> Result<(), DeviceError> {
        let mut state = self.0.borrow_mut();
        if let Some(code) = state.fail_start {
            return Err(DeviceError(code));
        }
        state.period_us = Some(period_us);
        state.starts += 1;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), DeviceError> {
        let mut state = self.0.borrow_mut();
        state.period_us = None;
        state.stops += 1;
        Ok(())
    }
}

// --- Status lamp ---------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LampCall {
    On,
    Toggle,
    Off,
}

#[derive(Default)]
pub struct LampState {
    pub calls: Vec<LampCall>,
    pub fail: Option<i32>,
}

#[derive(Clone, Default)]
pub struct MockLamp(pub Rc<RefCell<LampState>>);

impl MockLamp {
    pub fn calls(&self) -> Vec<LampCall> {
        self.0.borrow().calls.clone()
    }

    pub fn count(&self, call: LampCall) -> usize {
        self.0.borrow().calls.iter().filter(|c| **c == call).count()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().calls.clear();
    }

    /// Every lamp command fails with `code` (still recorded).
    pub fn fail(&self, code: Option<i32>) {
        self.0.borrow_mut().fail = code;
    }

    fn record(&self, call: LampCall) -> Result<(), DeviceError> {
        let mut state = self.0.borrow_mut();
        state.calls.push(call);
        match state.fail {
            Some(code) => Err(DeviceError(code)),
            None => Ok(()),
        }
    }
}

impl StatusLamp for MockLamp {
    fn on(&mut self) -> Result<(), DeviceError> {
        self.record(LampCall::On)
    }

    fn toggle(&mut self) -> Result<(), DeviceError> {
        self.record(LampCall::Toggle)
    }

    fn off(&mut self) -> Result<(), DeviceError> {
        self.record(LampCall::Off)
    }
}

// --- Harness -------------------------------------------------------------

pub type TestScheduler =
    Scheduler<'static, MockSynth, MockRtc, MockTimer, MockLamp, BeaconConfig, ChaCha8Rng>;

/// Handles to everything a test scheduler touches.
pub struct Rig {
    pub synth: MockSynth,
    pub rtc: MockRtc,
    pub timer: MockTimer,
    pub lamp: MockLamp,
    pub session: &'static TransmissionSession,
    pub fault: &'static FaultState,
    pub log: &'static LogStream,
}

pub fn calendar(hour: u8, minute: u8, second: u8) -> Calendar {
    Calendar {
        year: 2024,
        month: 3,
        day: 10,
        hour,
        minute,
        second,
    }
}

/// K1JT / FN20 / 30 dBm on 20 m, fixed sub-band 0.
pub fn k1jt_config(duty_pct: u8) -> BeaconConfig {
    let mut config = BeaconConfig::new();
    config.set_callsign("K1JT").unwrap();
    wspr_beacon::SettingsStore::set_locator(&mut config, "FN20").unwrap();
    config.set_power_dbm(30).unwrap();
    config.set_duty_cycle_percent(duty_pct).unwrap();
    config.set_sub_band(Some(0)).unwrap();
    config
}

pub fn rig_with(config: BeaconConfig, now: Calendar, seed: u64) -> (TestScheduler, Rig) {
    let rig = Rig {
        synth: MockSynth::default(),
        rtc: MockRtc::new(now),
        timer: MockTimer::default(),
        lamp: MockLamp::default(),
        session: Box::leak(Box::new(TransmissionSession::new())),
        fault: Box::leak(Box::new(FaultState::new())),
        log: Box::leak(Box::new(LogStream::new())),
    };
    let scheduler = Scheduler::new(
        rig.synth.clone(),
        rig.rtc.clone(),
        rig.timer.clone(),
        rig.lamp.clone(),
        config,
        ChaCha8Rng::seed_from_u64(seed),
        Shared {
            session: rig.session,
            fault: rig.fault,
            log: rig.log,
        },
    );
    (scheduler, rig)
}

pub fn rig(config: BeaconConfig) -> (TestScheduler, Rig) {
    rig_with(config, calendar(12, 31, 45), 0x5EED)
}

/// Drain a log stream into strings.
pub fn log_lines(log: &LogStream) -> Vec<String> {
    std::iter::from_fn(|| log.drain())
        .map(|e| e.message().to_string())
        .collect()
}
