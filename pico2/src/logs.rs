//! Log entries and the ring buffer behind the Logs page.
//!
//! The firmware keeps one [`LogBuffer`] behind a mutex and fills it from the
//! `log_*!` macros; this module is the storage and formatting part, kept
//! free of target dependencies so it can be tested on the host.

use embedded_graphics::pixelcolor::Rgb565;
use heapless::String;

use crate::colors::{GRAY, GREEN, RED, WHITE, YELLOW};

/// Entries kept; matches the rows the Logs page can show.
pub const LOG_ENTRIES: usize = 14;

/// Maximum characters per log message.
pub const LOG_MSG_LEN: usize = 40;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    #[default]
    Info = 2,
    Warn = 3,
    Error = 4,
}

impl LogLevel {
    pub const fn color(self) -> Rgb565 {
        match self {
            Self::Trace | Self::Debug => GRAY,
            Self::Info => GREEN,
            Self::Warn => YELLOW,
            Self::Error => RED,
        }
    }

    /// Single-character tag shown in the `[L]` column.
    pub const fn prefix(self) -> char {
        match self {
            Self::Trace => 'T',
            Self::Debug => 'D',
            Self::Info => 'I',
            Self::Warn => 'W',
            Self::Error => 'E',
        }
    }
}

/// Color for message text; only errors are highlighted.
pub const fn message_color(level: LogLevel) -> Rgb565 {
    match level {
        LogLevel::Error => RED,
        _ => WHITE,
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEntry {
    pub level: LogLevel,
    /// Truncated to fit `LOG_MSG_LEN`.
    pub message: String<LOG_MSG_LEN>,
    /// Milliseconds since boot.
    pub timestamp_ms: u32,
}

impl LogEntry {
    pub fn new(
        level: LogLevel,
        message: &str,
        timestamp_ms: u32,
    ) -> Self {
        let mut text: String<LOG_MSG_LEN> = String::new();
        for c in message.chars() {
            if text.push(c).is_err() {
                break;
            }
        }
        Self {
            level,
            message: text,
            timestamp_ms,
        }
    }

    /// Five-digit timestamp column (wraps every 100 s).
    #[inline]
    pub const fn short_timestamp(&self) -> u32 { self.timestamp_ms % 100_000 }
}

/// Fixed-size ring of log entries; the oldest is dropped when full.
pub struct LogBuffer {
    entries: [LogEntry; LOG_ENTRIES],
    head: usize,
    count: usize,
    dropped: u32,
}

impl LogBuffer {
    pub const fn new() -> Self {
        Self {
            entries: [const {
                LogEntry {
                    level: LogLevel::Info,
                    message: String::new(),
                    timestamp_ms: 0,
                }
            }; LOG_ENTRIES],
            head: 0,
            count: 0,
            dropped: 0,
        }
    }

    pub fn push(
        &mut self,
        entry: LogEntry,
    ) {
        if self.count == LOG_ENTRIES {
            self.dropped = self.dropped.wrapping_add(1);
        }
        self.entries[self.head] = entry;
        self.head = (self.head + 1) % LOG_ENTRIES;
        if self.count < LOG_ENTRIES {
            self.count += 1;
        }
    }

    #[inline]
    pub const fn len(&self) -> usize { self.count }

    #[inline]
    pub const fn is_empty(&self) -> bool { self.count == 0 }

    /// Entries overwritten since boot.
    #[inline]
    pub const fn dropped(&self) -> u32 { self.dropped }

    /// Entries from oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &LogEntry> + ExactSizeIterator {
        let start = if self.count < LOG_ENTRIES { 0 } else { self.head };
        (0..self.count).map(move |i| &self.entries[(start + i) % LOG_ENTRIES])
    }
}

impl Default for LogBuffer {
    fn default() -> Self { Self::new() }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::format;
    use std::vec::Vec;

    use super::*;

    fn messages(buffer: &LogBuffer) -> Vec<&str> { buffer.iter().map(|e| e.message.as_str()).collect() }

    #[test]
    fn test_empty_buffer() {
        let buffer = LogBuffer::new();
        assert!(buffer.is_empty());
        assert_eq!(buffer.iter().count(), 0);
    }

    #[test]
    fn test_order_before_wrap() {
        let mut buffer = LogBuffer::new();
        buffer.push(LogEntry::new(LogLevel::Info, "bus up", 10));
        buffer.push(LogEntry::new(LogLevel::Warn, "stalled", 20));
        assert_eq!(messages(&buffer), ["bus up", "stalled"]);
        assert_eq!(buffer.iter().next_back().map(|e| e.level), Some(LogLevel::Warn));
    }

    #[test]
    fn test_oldest_dropped_when_full() {
        let mut buffer = LogBuffer::new();
        for i in 0..LOG_ENTRIES + 3 {
            buffer.push(LogEntry::new(LogLevel::Debug, &format!("m{i}"), i as u32));
        }
        assert_eq!(buffer.len(), LOG_ENTRIES);
        assert_eq!(buffer.dropped(), 3);
        let got = messages(&buffer);
        assert_eq!(got.first(), Some(&"m3"));
        assert_eq!(got.last(), Some(&format!("m{}", LOG_ENTRIES + 2).as_str()));
    }

    #[test]
    fn test_long_message_truncated() {
        let entry = LogEntry::new(LogLevel::Error, &"x".repeat(100), 123_456);
        assert_eq!(entry.message.len(), LOG_MSG_LEN);
        assert_eq!(entry.short_timestamp(), 23_456);
    }

    #[test]
    fn test_level_presentation() {
        assert_eq!(LogLevel::Warn.prefix(), 'W');
        assert_eq!(LogLevel::Error.color(), RED);
        assert_eq!(message_color(LogLevel::Info), WHITE);
        assert!(LogLevel::Warn > LogLevel::Info);
    }
}
