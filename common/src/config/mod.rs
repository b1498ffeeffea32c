//! Persisted operator settings.
//!
//! [`Config`] is the in-memory record; [`ConfigStore`] maps it onto a
//! namespaced key-value store and migrates records written by older
//! firmware. The key names and defaults are part of the on-device format and
//! must not change.

mod memory;
mod store;

use core::fmt;

pub use memory::MemoryStore;
pub use store::{ConfigStore, KeyValueStore, MAX_KEY_LEN, MAX_STR_LEN, StoreError, StoredValue};

use crate::frame::MAX_STANDARD_ID;
use crate::protocol::Protocol;
use crate::units::UnitSystem;

// =============================================================================
// Persisted Keys
// =============================================================================

/// Namespace all dashboard keys live under.
pub const NAMESPACE: &str = "dashboard";

pub mod keys {
    //! Key names as written to flash.

    pub const BASE_CAN_ID: &str = "can_id_base";
    pub const CAN_SPEED: &str = "can_speed";
    pub const UNITS: &str = "units";
    pub const SIMULATION: &str = "simulation";
    pub const PROTOCOL: &str = "protocol";
    pub const REVISION: &str = "revision";
    pub const LOG_MODE: &str = "log_mode";
    pub const LOG_DETAIL: &str = "log_detail";
    pub const LOG_BUFFER_KB: &str = "log_buf_kb";
    pub const LOG_ROTATION: &str = "log_rotate";

    // Written in sync with `units` for older readers.
    pub const LEGACY_FAHRENHEIT: &str = "fahrenheit";
    pub const LEGACY_PSI: &str = "psi";
    pub const LEGACY_MPH: &str = "mph";

    /// Pre-base single identifier. Read during migration only.
    pub const LEGACY_CAN_ID: &str = "can_id";
}

/// Base identifier used when nothing usable is stored.
pub const DEFAULT_BASE_CAN_ID: u32 = 1000;

/// Legacy single identifier that survives migration unchanged.
pub const LEGACY_OEM_CAN_ID: u32 = 0x360;

// =============================================================================
// Bus Speed
// =============================================================================

/// Bus bit rate.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CanSpeed {
    Kbps125,
    Kbps250,
    Kbps500,
    #[default]
    Mbps1,
}

impl CanSpeed {
    pub const ALL: [Self; 4] = [Self::Kbps125, Self::Kbps250, Self::Kbps500, Self::Mbps1];

    pub const fn as_raw(self) -> u32 {
        match self {
            Self::Kbps125 => 0,
            Self::Kbps250 => 1,
            Self::Kbps500 => 2,
            Self::Mbps1 => 3,
        }
    }

    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::Kbps125),
            1 => Some(Self::Kbps250),
            2 => Some(Self::Kbps500),
            3 => Some(Self::Mbps1),
            _ => None,
        }
    }

    /// Bits per second.
    pub const fn bit_rate(self) -> u32 {
        match self {
            Self::Kbps125 => 125_000,
            Self::Kbps250 => 250_000,
            Self::Kbps500 => 500_000,
            Self::Mbps1 => 1_000_000,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Kbps125 => "125 kbps",
            Self::Kbps250 => "250 kbps",
            Self::Kbps500 => "500 kbps",
            Self::Mbps1 => "1 Mbps",
        }
    }

    /// Next speed, wrapping. Used by the settings screen's cycle button.
    pub const fn next(self) -> Self {
        match self {
            Self::Kbps125 => Self::Kbps250,
            Self::Kbps250 => Self::Kbps500,
            Self::Kbps500 => Self::Mbps1,
            Self::Mbps1 => Self::Kbps125,
        }
    }
}

// =============================================================================
// Logging Policy
// =============================================================================
//
// Consumed by the data logger only; nothing in the decode path reads it.

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LogMode {
    #[default]
    Off,
    Continuous,
    /// Record only while a trigger condition holds.
    Triggered,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LogDetail {
    Minimal,
    #[default]
    Standard,
    Verbose,
}

/// What the logger does when its buffer is full.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Rotation {
    #[default]
    Overwrite,
    Stop,
    NewFile,
}

macro_rules! raw_enum {
    ($ty:ty { $($variant:ident = $raw:literal),+ $(,)? }) => {
        impl $ty {
            pub const fn as_raw(self) -> u32 {
                match self {
                    $(Self::$variant => $raw,)+
                }
            }

            pub const fn from_raw(raw: u32) -> Option<Self> {
                match raw {
                    $($raw => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

raw_enum!(LogMode { Off = 0, Continuous = 1, Triggered = 2 });
raw_enum!(LogDetail { Minimal = 0, Standard = 1, Verbose = 2 });
raw_enum!(Rotation { Overwrite = 0, Stop = 1, NewFile = 2 });

/// Smallest accepted logger buffer, KiB.
pub const MIN_LOG_BUFFER_KB: u16 = 4;
/// Largest accepted logger buffer, KiB.
pub const MAX_LOG_BUFFER_KB: u16 = 64;
pub const DEFAULT_LOG_BUFFER_KB: u16 = 16;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LoggingPolicy {
    pub mode: LogMode,
    pub detail: LogDetail,
    /// Buffer size, KiB. Clamped to the accepted range on every write.
    pub buffer_kb: u16,
    pub rotation: Rotation,
}

impl LoggingPolicy {
    pub const fn new() -> Self {
        Self {
            mode: LogMode::Off,
            detail: LogDetail::Standard,
            buffer_kb: DEFAULT_LOG_BUFFER_KB,
            rotation: Rotation::Overwrite,
        }
    }

    /// Copy with the buffer size forced into the accepted range.
    pub fn clamped(mut self) -> Self {
        self.buffer_kb = self.buffer_kb.clamp(MIN_LOG_BUFFER_KB, MAX_LOG_BUFFER_KB);
        self
    }
}

impl Default for LoggingPolicy {
    fn default() -> Self { Self::new() }
}

// =============================================================================
// Errors
// =============================================================================

/// Rejected configuration change.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Base identifier outside the 11-bit identifier space.
    BaseIdOutOfRange(u32),
    /// The change was applied in memory but could not be persisted.
    Store(StoreError),
}

impl From<StoreError> for ConfigError {
    fn from(err: StoreError) -> Self { Self::Store(err) }
}

impl fmt::Display for ConfigError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Self::BaseIdOutOfRange(id) => write!(f, "base identifier {id} outside 0..={MAX_STANDARD_ID}"),
            Self::Store(err) => write!(f, "config not persisted: {err}"),
        }
    }
}

// =============================================================================
// Config Record
// =============================================================================

/// Operator settings.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// First identifier of the protocol's frame block (0..=2047).
    pub base_can_id: u32,
    pub can_speed: CanSpeed,
    pub unit_system: UnitSystem,
    /// Show simulated telemetry. Cleared automatically the first time the
    /// engine controller is heard.
    pub simulation_mode: bool,
    pub protocol: Protocol,
    pub logging: LoggingPolicy,
}

impl Config {
    /// First-boot settings.
    pub const fn new() -> Self {
        Self {
            base_can_id: DEFAULT_BASE_CAN_ID,
            can_speed: CanSpeed::Mbps1,
            unit_system: UnitSystem::Metric,
            simulation_mode: false,
            protocol: Protocol::Oem(crate::protocol::Revision::Packed),
            logging: LoggingPolicy::new(),
        }
    }

    /// Whether `id` can be used as a base identifier.
    #[inline]
    pub const fn is_valid_base_id(id: u32) -> bool { id <= MAX_STANDARD_ID }

    /// Set the base identifier, rejecting values outside the 11-bit space.
    pub fn set_base_can_id(
        &mut self,
        id: u32,
    ) -> Result<(), ConfigError> {
        if !Self::is_valid_base_id(id) {
            return Err(ConfigError::BaseIdOutOfRange(id));
        }
        self.base_can_id = id;
        Ok(())
    }

    /// Switch protocol and move the base identifier to that protocol's
    /// default.
    pub fn set_protocol(
        &mut self,
        protocol: Protocol,
    ) {
        self.protocol = protocol;
        self.base_can_id = protocol.default_base_id();
    }
}

impl Default for Config {
    fn default() -> Self { Self::new() }
}

// =============================================================================
// Unit Tests
// =============================================================================
