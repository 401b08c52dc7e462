//! Log drain: formats entries from the log streams and hands them to a
//! byte sink (UART1 on the board, stdout on the host).
//!
//! # Hardware Setup
//!
//! ```text
//! ESP32 GPIO17 (UART1 TX) ──────▶ USB-UART RX
//!                                  └─▶ PC Serial Monitor
//! ```

use core::fmt::Write;

use crate::logging::{BufWriter, LogEntry, LogStream};

/// Size of the formatting buffer for one line.
pub const LINE_BUF_LEN: usize = 256;

/// Interval between dropped-message reports.
pub const DROPPED_REPORT_INTERVAL_US: i64 = 10_000_000;

/// UART configuration for logging.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UartLoggerConfig {
    pub baud_rate: u32,
    pub tx_pin: u8,
}

impl Default for UartLoggerConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115200,
            tx_pin: 17, // UART1 TX, leaves UART0 to the IDF console
        }
    }
}

/// Format log entry to a line.
///
/// Format: `[timestamp_us] LEVEL: message\n`
pub fn format_log_entry(entry: &LogEntry, buf: &mut [u8]) -> usize {
    let mut writer = BufWriter::new(buf);

    let _ = write!(
        writer,
        "[{:10}] {}: {}\n",
        entry.timestamp_us,
        entry.level.as_str(),
        entry.message()
    );

    writer.len()
}

/// Drain every stream in order, writing one formatted line per entry.
///
/// Returns the number of entries written.
pub fn drain_streams<const N: usize>(
    streams: &[&LogStream<N>],
    mut sink: impl FnMut(&[u8]),
) -> usize {
    let mut buf = [0u8; LINE_BUF_LEN];
    let mut written = 0;

    for stream in streams {
        while let Some(entry) = stream.drain() {
            let len = format_log_entry(&entry, &mut buf);
            sink(&buf[..len]);
            written += 1;
        }
    }

    written
}

/// Emit one summary line if any stream dropped messages, then reset the
/// counters.
pub fn report_dropped<const N: usize>(
    task: &LogStream<N>,
    isr: &LogStream<N>,
    mut sink: impl FnMut(&[u8]),
) -> bool {
    let task_dropped = task.dropped();
    let isr_dropped = isr.dropped();

    if task_dropped == 0 && isr_dropped == 0 {
        return false;
    }

    let mut msg = [0u8; 64];
    let mut writer = BufWriter::new(&mut msg);
    let _ = write!(writer, "[WARN] Dropped: TASK={}, ISR={}\n", task_dropped, isr_dropped);
    let len = writer.len();
    sink(&msg[..len]);

    task.reset_dropped();
    isr.reset_dropped();
    true
}

#[cfg(target_os = "espidf")]
mod esp {
    use super::*;
    use crate::{ISR_LOG_STREAM, TASK_LOG_STREAM};

    use esp_idf_svc::hal::gpio;
    use esp_idf_svc::hal::peripheral::Peripheral;
    use esp_idf_svc::hal::uart::{self, UartTxDriver};

    /// Initialize a TX-only UART for logging output.
    pub fn init_uart_logger<'d, U: uart::Uart>(
        uart: impl Peripheral<P = U> + 'd,
        tx_pin: impl Peripheral<P = impl gpio::OutputPin> + 'd,
        config: &UartLoggerConfig,
    ) -> Result<UartTxDriver<'d>, esp_idf_svc::sys::EspError> {
        let uart_config = uart::config::Config::default()
            .baudrate(esp_idf_svc::hal::units::Hertz(config.baud_rate));

        UartTxDriver::new(
            uart,
            tx_pin,
            Option::<gpio::AnyIOPin>::None, // CTS
            Option::<gpio::AnyIOPin>::None, // RTS
            &uart_config,
        )
    }

    /// UART log consumer task.
    ///
    /// Drains TASK_LOG_STREAM then ISR_LOG_STREAM, writes to UART.
    pub fn uart_logger_task(uart: &mut UartTxDriver<'_>) -> ! {
        let mut last_dropped_report = 0i64;

        loop {
            let written = drain_streams(&[&TASK_LOG_STREAM, &ISR_LOG_STREAM], |line| {
                let _ = uart.write(line);
            });

            // SAFETY: esp_timer_get_time has no preconditions
            let now = unsafe { esp_idf_svc::sys::esp_timer_get_time() };
            if now - last_dropped_report > DROPPED_REPORT_INTERVAL_US {
                report_dropped(&TASK_LOG_STREAM, &ISR_LOG_STREAM, |line| {
                    let _ = uart.write(line);
                });
                last_dropped_report = now;
            }

            if written == 0 {
                // SAFETY: plain FreeRTOS delay
                unsafe {
                    esp_idf_svc::sys::vTaskDelay(10);
                }
            }
        }
    }
}

#[cfg(target_os = "espidf")]
pub use esp::{init_uart_logger, uart_logger_task};
