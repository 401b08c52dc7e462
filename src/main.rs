//! WsprBeacon - Main entry point
//!
//! On the ESP32 this wires the transmit core to the hardware:
//! 1. Timer service callbacks post alarm and symbol events to the mailbox
//!    and wake the main task with a FreeRTOS task notification
//! 2. The WSPR task drains the mailbox on the main thread
//! 3. A background thread drains the log streams to UART1
//! 4. The transmit lamp on GPIO2 follows the symbol clock
//!
//! On any other target the binary is an offline encoder:
//!
//! ```text
//! beacon K1JT FN20 30
//! ```

#[cfg(target_os = "espidf")]
fn main() {
    firmware::run();
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    std::process::exit(host::run(std::env::args().skip(1)));
}

#[cfg(target_os = "espidf")]
mod firmware {
    use core::num::NonZeroU32;
    use core::time::Duration;
    use std::sync::Arc;
    use std::time::{SystemTime, UNIX_EPOCH};

    use esp_idf_svc::hal::delay::BLOCK;
    use esp_idf_svc::hal::gpio::{Gpio2, Output, PinDriver};
    use esp_idf_svc::hal::peripherals::Peripherals;
    use esp_idf_svc::hal::task::notification::{Notification, Notifier};
    use esp_idf_svc::sys::{self as esp_idf_sys, EspError};
    use esp_idf_svc::timer::{EspTaskTimerService, EspTimer};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use wspr_beacon::config::BeaconConfig;
    use wspr_beacon::uart_logger::{init_uart_logger, uart_logger_task, UartLoggerConfig};
    use wspr_beacon::{
        rt_error, rt_info, Calendar, DeviceError, Event, EventMailbox, FaultState,
        RealTimeClock, Scheduler, SettingsStore, Shared, StatusLamp, SymbolTimer, Synthesizer,
        TransmissionSession, WsprTask, ISR_LOG_STREAM, TASK_LOG_STREAM,
    };

    static MAILBOX: EventMailbox = EventMailbox::new();
    static SESSION: TransmissionSession = TransmissionSession::new();
    static FAULT_STATE: FaultState = FaultState::new();

    fn timestamp_us() -> i64 {
        // SAFETY: esp_timer_get_time has no preconditions
        unsafe { esp_idf_sys::esp_timer_get_time() }
    }

    fn device_error(e: EspError) -> DeviceError {
        DeviceError(e.code())
    }

    /// Post from a timer callback and wake the WSPR task.
    fn post_and_wake(event: Event, waker: &Notifier) -> bool {
        let posted = MAILBOX.post(event, timestamp_us());
        // SAFETY: the notification outlives every timer; `run` never returns
        unsafe {
            let _ = waker.notify(NonZeroU32::MIN);
        }
        posted
    }

    /// Transmit lamp on a plain GPIO.
    struct GpioLamp {
        pin: PinDriver<'static, Gpio2, Output>,
    }

    impl StatusLamp for GpioLamp {
        fn on(&mut self) -> Result<(), DeviceError> {
            self.pin.set_high().map_err(device_error)
        }

        fn toggle(&mut self) -> Result<(), DeviceError> {
            self.pin.toggle().map_err(device_error)
        }

        fn off(&mut self) -> Result<(), DeviceError> {
            self.pin.set_low().map_err(device_error)
        }
    }

    /// Periodic symbol clock on the esp_timer service.
    struct EspSymbolTimer {
        timer: EspTimer<'static>,
    }

    impl SymbolTimer for EspSymbolTimer {
        fn start(&mut self, period_us: u32) -> Result<(), DeviceError> {
            self.timer
                .every(Duration::from_micros(u64::from(period_us)))
                .map_err(device_error)
        }

        fn stop(&mut self) -> Result<(), DeviceError> {
            self.timer.cancel().map(|_| ()).map_err(device_error)
        }
    }

    /// System time as the RTC, with a one-shot timer as the alarm.
    struct SystemClock {
        alarm: EspTimer<'static>,
    }

    impl RealTimeClock for SystemClock {
        fn get_time(&mut self) -> Result<Calendar, DeviceError> {
            let since_epoch = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_err(|_| DeviceError(esp_idf_sys::ESP_ERR_INVALID_STATE))?;
            Ok(Calendar::from_unix_seconds(since_epoch.as_secs() as i64))
        }

        fn set_time(&mut self, time: Calendar) -> Result<(), DeviceError> {
            let tv = esp_idf_sys::timeval {
                tv_sec: time.to_unix_seconds() as _,
                tv_usec: 0,
            };
            // SAFETY: tv outlives the call, null timezone is allowed
            let ret = unsafe { esp_idf_sys::settimeofday(&tv, core::ptr::null()) };
            if ret == 0 {
                Ok(())
            } else {
                Err(DeviceError(ret))
            }
        }

        fn set_alarm(&mut self, at: Calendar) -> Result<(), DeviceError> {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_err(|_| DeviceError(esp_idf_sys::ESP_ERR_INVALID_STATE))?;
            let target = Duration::from_secs(at.to_unix_seconds().max(0) as u64);
            let delay = target.saturating_sub(now);
            self.alarm.after(delay).map_err(device_error)
        }

        fn cancel_alarm(&mut self) -> Result<(), DeviceError> {
            self.alarm.cancel().map(|_| ()).map_err(device_error)
        }
    }

    /// Frequency commands go to the log until the Si5351 driver is wired in.
    // TODO: replace with the Si5351 I2C driver on CLK0
    struct LoggedSynthesizer;

    impl Synthesizer for LoggedSynthesizer {
        fn set_frequency(
            &mut self,
            centihertz: u64,
            ppm_correction: i32,
            reset_phase: bool,
        ) -> Result<(), DeviceError> {
            if reset_phase {
                rt_info!(
                    TASK_LOG_STREAM,
                    timestamp_us(),
                    "synth {} cHz ppm {} (phase reset)",
                    centihertz,
                    ppm_correction
                );
            }
            Ok(())
        }

        fn output_off(&mut self) -> Result<(), DeviceError> {
            rt_info!(TASK_LOG_STREAM, timestamp_us(), "synth off");
            Ok(())
        }
    }

    fn beacon_config() -> BeaconConfig {
        let mut config = BeaconConfig::new();
        if let Some(callsign) = option_env!("WSPR_CALLSIGN") {
            if config.set_callsign(callsign).is_err() {
                rt_error!(TASK_LOG_STREAM, timestamp_us(), "WSPR_CALLSIGN too long");
            }
        }
        if let Some(locator) = option_env!("WSPR_LOCATOR") {
            if config.set_locator(locator).is_err() {
                rt_error!(TASK_LOG_STREAM, timestamp_us(), "WSPR_LOCATOR too long");
            }
        }
        config
    }

    pub fn run() {
        esp_idf_sys::link_patches();

        if let Err(e) = start() {
            rt_error!(TASK_LOG_STREAM, timestamp_us(), "startup failed: {}", e);
        }

        // Nothing left to drive; keep the log drain alive.
        loop {
            // SAFETY: plain FreeRTOS delay
            unsafe {
                esp_idf_sys::vTaskDelay(1000);
            }
        }
    }

    fn start() -> Result<(), EspError> {
        let peripherals = Peripherals::take()?;

        let log_config = UartLoggerConfig::default();
        let mut uart = init_uart_logger(peripherals.uart1, peripherals.pins.gpio17, &log_config)?;
        std::thread::Builder::new()
            .name("log-drain".into())
            .stack_size(4096)
            .spawn(move || uart_logger_task(&mut uart))
            .map_err(|_| EspError::from_infallible::<{ esp_idf_sys::ESP_ERR_NO_MEM }>())?;

        let lamp = GpioLamp {
            pin: PinDriver::output(peripherals.pins.gpio2)?,
        };

        let notification = Notification::new();
        let tick_waker: Arc<Notifier> = notification.notifier();
        let alarm_waker = Arc::clone(&tick_waker);

        let timer_service = EspTaskTimerService::new()?;
        let symbol_timer = timer_service.timer(move || {
            post_and_wake(Event::SymbolTick, &tick_waker);
        })?;
        let alarm_timer = timer_service.timer(move || {
            if !post_and_wake(Event::AlarmFired, &alarm_waker) {
                rt_error!(ISR_LOG_STREAM, timestamp_us(), "alarm coalesced");
            }
        })?;

        // SAFETY: esp_random has no preconditions
        let seed = unsafe {
            (u64::from(esp_idf_sys::esp_random()) << 32) | u64::from(esp_idf_sys::esp_random())
        };

        let shared = Shared {
            session: &SESSION,
            fault: &FAULT_STATE,
            log: &TASK_LOG_STREAM,
        };
        let scheduler = Scheduler::new(
            LoggedSynthesizer,
            SystemClock { alarm: alarm_timer },
            EspSymbolTimer { timer: symbol_timer },
            lamp,
            beacon_config(),
            ChaCha8Rng::seed_from_u64(seed),
            shared,
        );
        let mut task = WsprTask::new(&MAILBOX, scheduler);

        if let Err(e) = task.scheduler_mut().init() {
            rt_error!(TASK_LOG_STREAM, timestamp_us(), "init: {}", e);
        }
        MAILBOX.post(Event::StartWspr, timestamp_us());

        rt_info!(
            TASK_LOG_STREAM,
            timestamp_us(),
            "{} started",
            env!("VERSION_STRING")
        );

        // posts that land between run_pending and wait stay latched
        loop {
            task.run_pending();
            notification.wait(BLOCK);
        }
    }
}

#[cfg(not(target_os = "espidf"))]
mod host {
    use wspr_beacon::wspr::encoder::pack;
    use wspr_beacon::wspr::identity::condition;
    use wspr_beacon::{encode, StationIdentity};

    const USAGE: &str = "usage: beacon <callsign> <locator> <power_dbm>";

    /// Returns the process exit code.
    pub fn run(mut args: impl Iterator<Item = String>) -> i32 {
        let (Some(callsign), Some(locator), Some(power), None) =
            (args.next(), args.next(), args.next(), args.next())
        else {
            eprintln!("{}", USAGE);
            return 2;
        };

        let Ok(power_dbm) = power.parse::<u8>() else {
            eprintln!("invalid power '{}'\n{}", power, USAGE);
            return 2;
        };

        let identity = match StationIdentity::new(&callsign, &locator, power_dbm) {
            Ok(identity) => identity,
            Err(e) => {
                eprintln!("{}", e);
                return 1;
            }
        };

        let symbols = match encode(&identity) {
            Ok(symbols) => symbols,
            Err(e) => {
                eprintln!("{}", e);
                return 1;
            }
        };

        if let Ok(conditioned) = condition(&identity) {
            let packed = pack(&conditioned);
            println!(
                "# {} {} {} dBm  N={} M={}  {}",
                core::str::from_utf8(&conditioned.callsign).unwrap_or("?"),
                core::str::from_utf8(&conditioned.locator).unwrap_or("?"),
                conditioned.power_dbm,
                packed.n,
                packed.m,
                env!("VERSION_STRING")
            );
        }

        for row in symbols.as_slice().chunks(16) {
            let line: Vec<String> = row.iter().map(|s| s.to_string()).collect();
            println!("{}", line.join(","));
        }
        0
    }

    #[cfg(test)]
    mod tests {
        use super::run;

        fn args(list: &[&str]) -> impl Iterator<Item = String> {
            list.iter().map(|s| s.to_string()).collect::<Vec<_>>().into_iter()
        }

        #[test]
        fn test_encodes_valid_identity() {
            assert_eq!(run(args(&["K1JT", "FN20", "30"])), 0);
        }

        #[test]
        fn test_usage_errors() {
            assert_eq!(run(args(&[])), 2);
            assert_eq!(run(args(&["K1JT", "FN20"])), 2);
            assert_eq!(run(args(&["K1JT", "FN20", "loud"])), 2);
            assert_eq!(run(args(&["K1JT", "FN20", "30", "extra"])), 2);
        }

        #[test]
        fn test_encode_errors() {
            assert_eq!(run(args(&["K1JT", "FN2X", "30"])), 1);
            assert_eq!(run(args(&["TOOLONG1", "FN20", "30"])), 1);
        }
    }
}
