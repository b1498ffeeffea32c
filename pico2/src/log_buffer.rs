//! Global log buffer and the `log_*!` macros.
//!
//! Every macro formats its message once into the ring buffer shown on the
//! Logs page and passes the same arguments to `defmt`. Format strings must
//! therefore stay in the subset both understand: plain `{}` with values that
//! implement `Display` and `defmt::Format`.
//!
//! ```ignore
//! log_info!("bus up at {}", speed.name());
//! log_warn!("config not saved: {}", err);
//! ```

use ecu_dash_pico2::logs::{LogBuffer, LogEntry, LogLevel};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;

pub use ecu_dash_pico2::logs::LOG_MSG_LEN;

pub static LOG_BUFFER: Mutex<CriticalSectionRawMutex, LogBuffer> = Mutex::new(LogBuffer::new());

#[inline]
pub fn current_timestamp_ms() -> u32 { embassy_time::Instant::now().as_millis() as u32 }

/// Push an entry without blocking; the line is dropped if the page is being
/// drawn at that moment.
pub fn push_log(
    level: LogLevel,
    message: &str,
) {
    let entry = LogEntry::new(level, message, current_timestamp_ms());
    if let Ok(mut buffer) = LOG_BUFFER.try_lock() {
        buffer.push(entry);
    }
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {{
        use core::fmt::Write;
        let mut buf: heapless::String<{ $crate::log_buffer::LOG_MSG_LEN }> = heapless::String::new();
        let _ = write!(buf, $($arg)*);
        $crate::log_buffer::push_log(ecu_dash_pico2::logs::LogLevel::Info, buf.as_str());
        defmt::info!($($arg)*);
    }};
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {{
        use core::fmt::Write;
        let mut buf: heapless::String<{ $crate::log_buffer::LOG_MSG_LEN }> = heapless::String::new();
        let _ = write!(buf, $($arg)*);
        $crate::log_buffer::push_log(ecu_dash_pico2::logs::LogLevel::Warn, buf.as_str());
        defmt::warn!($($arg)*);
    }};
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {{
        use core::fmt::Write;
        let mut buf: heapless::String<{ $crate::log_buffer::LOG_MSG_LEN }> = heapless::String::new();
        let _ = write!(buf, $($arg)*);
        $crate::log_buffer::push_log(ecu_dash_pico2::logs::LogLevel::Error, buf.as_str());
        defmt::error!($($arg)*);
    }};
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {{
        use core::fmt::Write;
        let mut buf: heapless::String<{ $crate::log_buffer::LOG_MSG_LEN }> = heapless::String::new();
        let _ = write!(buf, $($arg)*);
        $crate::log_buffer::push_log(ecu_dash_pico2::logs::LogLevel::Debug, buf.as_str());
        defmt::debug!($($arg)*);
    }};
}
