//! Bus driver contract.
//!
//! The core never touches a controller directly. A board crate implements
//! [`BusDriver`] for whatever hardware carries the engine controller's frames
//! (an on-chip controller, a serial adapter, a replay file) and hands it to
//! [`crate::Dashboard`].

use core::fmt;

use crate::config::CanSpeed;
use crate::frame::RawFrame;

/// Bus bring-up failure. Always recoverable: the dashboard falls back to
/// simulated telemetry.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError {
    /// No transceiver or adapter answered.
    NotPresent,
    /// The hardware cannot run at the requested bit rate.
    UnsupportedSpeed,
    /// The hardware answered but refused the configuration.
    Rejected,
}

impl fmt::Display for BusError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let text = match self {
            Self::NotPresent => "bus adapter not present",
            Self::UnsupportedSpeed => "bit rate not supported",
            Self::Rejected => "bus adapter rejected configuration",
        };
        f.write_str(text)
    }
}

/// Receive side of a CAN controller.
pub trait BusDriver {
    /// Bring the bus up at `speed`. Calling it again re-initialises.
    fn initialize(
        &mut self,
        speed: CanSpeed,
    ) -> Result<(), BusError>;

    /// Return the next received frame, waiting at most `timeout_ms`.
    fn poll_frame(
        &mut self,
        timeout_ms: u32,
    ) -> Option<RawFrame>;

    /// Take the bus offline. Frames arriving afterwards are discarded.
    fn shutdown(&mut self) {}
}

/// Receive counters for the diagnostics page.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusStats {
    /// Frames handed over by the driver.
    pub received: u32,
    /// Frames that updated telemetry.
    pub decoded: u32,
    /// Frames dropped (wrong length, extended, not in the protocol).
    pub ignored: u32,
    /// Timestamp of the most recent frame of any kind, ms.
    pub last_frame_ms: Option<u64>,
}

impl BusStats {
    pub const fn new() -> Self {
        Self {
            received: 0,
            decoded: 0,
            ignored: 0,
            last_frame_ms: None,
        }
    }

    pub fn record(
        &mut self,
        now_ms: u64,
        decoded: bool,
    ) {
        self.received = self.received.wrapping_add(1);
        if decoded {
            self.decoded = self.decoded.wrapping_add(1);
        } else {
            self.ignored = self.ignored.wrapping_add(1);
        }
        self.last_frame_ms = Some(now_ms);
    }
}

/// Driver for boards without a bus. Initialisation always fails, so the
/// dashboard runs on simulated telemetry.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoBus;

impl BusDriver for NoBus {
    fn initialize(
        &mut self,
        _speed: CanSpeed,
    ) -> Result<(), BusError> {
        Err(BusError::NotPresent)
    }

    fn poll_frame(
        &mut self,
        _timeout_ms: u32,
    ) -> Option<RawFrame> {
        None
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
