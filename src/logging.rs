//! Non-blocking logging for the beacon.
//!
//! # Architecture
//!
//! ```text
//! WSPR task / ISR        LogStream            Log drain
//! ───────────────        ─────────            ─────────
//!
//! rt_info!() ─────────▶ [L0][L1][L2] ──────▶ UART / stdout
//! never blocks            lock-free           blocking ok
//!                         ring buffer
//! ```
//!
//! # Rules
//!
//! - Symbol timing paths never call blocking log functions
//! - `println!` and `ESP_LOGx` are not used from the WSPR task; use `rt_log!()`
//! - Messages may be dropped if the ring is full, never delayed
//! - Entries above the stream's max level are discarded at push time

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicU32, AtomicU8, Ordering};

/// Maximum message length.
pub const MAX_MSG_LEN: usize = 120;

/// Log buffer size (number of entries).
pub const LOG_BUFFER_SIZE: usize = 256;

/// Log level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl LogLevel {
    /// Convert to string for output.
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => LogLevel::Error,
            1 => LogLevel::Warn,
            2 => LogLevel::Info,
            3 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }
}

/// A single log entry.
#[derive(Clone, Copy)]
#[repr(C)]
pub struct LogEntry {
    /// Timestamp in microseconds.
    pub timestamp_us: i64,
    /// Log level.
    pub level: LogLevel,
    /// Message length.
    pub len: u8,
    /// Message bytes (not null-terminated).
    pub msg: [u8; MAX_MSG_LEN],
}

impl LogEntry {
    const EMPTY: LogEntry = LogEntry {
        timestamp_us: 0,
        level: LogLevel::Info,
        len: 0,
        msg: [0; MAX_MSG_LEN],
    };

    /// Message text, or a marker if the bytes are not UTF-8.
    pub fn message(&self) -> &str {
        core::str::from_utf8(&self.msg[..self.len as usize]).unwrap_or("<invalid utf8>")
    }
}

impl Default for LogEntry {
    fn default() -> Self {
        Self::EMPTY
    }
}

const SLOT_FREE: u8 = 0;
const SLOT_WRITING: u8 = 1;
const SLOT_READY: u8 = 2;

struct LogSlot {
    state: AtomicU8,
    entry: UnsafeCell<LogEntry>,
}

impl LogSlot {
    const fn new() -> Self {
        Self {
            state: AtomicU8::new(SLOT_FREE),
            entry: UnsafeCell::new(LogEntry::EMPTY),
        }
    }
}

/// Lock-free log stream (single consumer).
///
/// - Producers reserve a slot with a CAS on the write index
/// - A slot is handed to the drain only once its entry is committed
/// - Push never blocks (drops message if full)
/// - Drain runs in a separate task at leisure
///
/// # Memory Ordering
///
/// - Producer commits with a `Release` store of `READY` on the slot
/// - Drain observes with `Acquire`, frees the slot, then advances the read
///   index with `Release` so a producer lapping the ring sees a free slot
pub struct LogStream<const N: usize = LOG_BUFFER_SIZE> {
    slots: [LogSlot; N],
    write_idx: AtomicU32,
    read_idx: AtomicU32,
    dropped: AtomicU32,
    max_level: AtomicU8,
}

// SAFETY: producers get unique slots through the write index CAS and only
// the single consumer (log drain) reads a slot, after it is marked READY.
unsafe impl<const N: usize> Sync for LogStream<N> {}
unsafe impl<const N: usize> Send for LogStream<N> {}

impl<const N: usize> LogStream<N> {
    const MASK: usize = N - 1;

    /// Create a new empty log stream that accepts every level.
    pub const fn new() -> Self {
        assert!(N.is_power_of_two(), "Log buffer size must be power of 2");
        const EMPTY: LogSlot = LogSlot::new();

        Self {
            slots: [EMPTY; N],
            write_idx: AtomicU32::new(0),
            read_idx: AtomicU32::new(0),
            dropped: AtomicU32::new(0),
            max_level: AtomicU8::new(LogLevel::Trace as u8),
        }
    }

    /// Push a log entry (never blocks).
    ///
    /// Returns `true` if message was queued, `false` if filtered out or
    /// dropped (ring full).
    #[inline]
    pub fn push(&self, timestamp_us: i64, level: LogLevel, msg: &[u8]) -> bool {
        if level as u8 > self.max_level.load(Ordering::Relaxed) {
            return false;
        }

        let mut write = self.write_idx.load(Ordering::Relaxed);
        loop {
            let read = self.read_idx.load(Ordering::Acquire);
            if write.wrapping_sub(read) >= N as u32 {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                return false;
            }
            match self.write_idx.compare_exchange_weak(
                write,
                write.wrapping_add(1),
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(current) => write = current,
            }
        }

        let slot = &self.slots[(write as usize) & Self::MASK];
        slot.state.store(SLOT_WRITING, Ordering::Relaxed);

        // SAFETY: the CAS above handed this slot to us alone, and the drain
        // freed it before advancing the read index we checked.
        unsafe {
            let entry = &mut *slot.entry.get();
            entry.timestamp_us = timestamp_us;
            entry.level = level;
            entry.len = msg.len().min(MAX_MSG_LEN) as u8;
            entry.msg[..entry.len as usize].copy_from_slice(&msg[..entry.len as usize]);
        }

        slot.state.store(SLOT_READY, Ordering::Release);
        true
    }

    /// Drain next log entry.
    ///
    /// Returns `None` if no entries available, or if the oldest reserved
    /// entry is still being written.
    #[inline]
    pub fn drain(&self) -> Option<LogEntry> {
        let read = self.read_idx.load(Ordering::Relaxed);
        let write = self.write_idx.load(Ordering::Acquire);

        if read == write {
            return None;
        }

        let slot = &self.slots[(read as usize) & Self::MASK];
        if slot.state.load(Ordering::Acquire) != SLOT_READY {
            return None;
        }

        // SAFETY: READY slots belong to the single consumer
        let entry = unsafe { *slot.entry.get() };

        slot.state.store(SLOT_FREE, Ordering::Release);
        self.read_idx.store(read.wrapping_add(1), Ordering::Release);
        Some(entry)
    }

    /// Only accept entries at `level` or more severe.
    #[inline]
    pub fn set_max_level(&self, level: LogLevel) {
        self.max_level.store(level as u8, Ordering::Relaxed);
    }

    /// Most verbose level currently accepted.
    #[inline]
    pub fn max_level(&self) -> LogLevel {
        LogLevel::from_u8(self.max_level.load(Ordering::Relaxed))
    }

    /// Get count of dropped messages.
    #[inline]
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Reset dropped counter (e.g., after reporting).
    #[inline]
    pub fn reset_dropped(&self) {
        self.dropped.store(0, Ordering::Relaxed);
    }

    /// Check if there are entries to drain.
    #[inline]
    pub fn has_entries(&self) -> bool {
        self.pending() != 0
    }

    /// Get number of entries waiting to be drained.
    #[inline]
    pub fn pending(&self) -> u32 {
        let read = self.read_idx.load(Ordering::Relaxed);
        let write = self.write_idx.load(Ordering::Acquire);
        write.wrapping_sub(read)
    }
}

impl<const N: usize> Default for LogStream<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// `core::fmt::Write` into a fixed byte buffer, truncating on overflow.
pub struct BufWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> BufWriter<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos == 0
    }
}

impl core::fmt::Write for BufWriter<'_> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        let bytes = s.as_bytes();
        let remaining = self.buf.len() - self.pos;
        let to_write = bytes.len().min(remaining);
        self.buf[self.pos..self.pos + to_write].copy_from_slice(&bytes[..to_write]);
        self.pos += to_write;
        Ok(())
    }
}

/// Format a message into a buffer.
///
/// Returns the number of bytes written.
#[inline]
pub fn format_to_buffer(buf: &mut [u8], args: core::fmt::Arguments<'_>) -> usize {
    let mut writer = BufWriter::new(buf);
    let _ = core::fmt::write(&mut writer, args);
    writer.len()
}

/// Non-blocking log macro.
///
/// # Example
///
/// ```ignore
/// rt_log!(LogLevel::Info, TASK_LOG_STREAM, timestamp, "symbol {} tone {}", idx, tone);
/// ```
#[macro_export]
macro_rules! rt_log {
    ($level:expr, $stream:expr, $timestamp:expr, $($arg:tt)*) => {{
        let mut buf = [0u8; $crate::logging::MAX_MSG_LEN];
        let len = $crate::logging::format_to_buffer(&mut buf, format_args!($($arg)*));
        $stream.push($timestamp, $level, &buf[..len]);
    }};
}

/// Info log.
#[macro_export]
macro_rules! rt_info {
    ($stream:expr, $timestamp:expr, $($arg:tt)*) => {
        $crate::rt_log!($crate::logging::LogLevel::Info, $stream, $timestamp, $($arg)*)
    };
}

/// Warning log.
#[macro_export]
macro_rules! rt_warn {
    ($stream:expr, $timestamp:expr, $($arg:tt)*) => {
        $crate::rt_log!($crate::logging::LogLevel::Warn, $stream, $timestamp, $($arg)*)
    };
}

/// Error log.
#[macro_export]
macro_rules! rt_error {
    ($stream:expr, $timestamp:expr, $($arg:tt)*) => {
        $crate::rt_log!($crate::logging::LogLevel::Error, $stream, $timestamp, $($arg)*)
    };
}

/// Debug log.
#[macro_export]
macro_rules! rt_debug {
    ($stream:expr, $timestamp:expr, $($arg:tt)*) => {
        $crate::rt_log!($crate::logging::LogLevel::Debug, $stream, $timestamp, $($arg)*)
    };
}

/// Trace log (maximum verbosity).
#[macro_export]
macro_rules! rt_trace {
    ($stream:expr, $timestamp:expr, $($arg:tt)*) => {
        $crate::rt_log!($crate::logging::LogLevel::Trace, $stream, $timestamp, $($arg)*)
    };
}
