//! Platform-agnostic core of the ECU dashboard.
//!
//! Everything between "a frame arrived" and "the renderer reads a number"
//! lives here, with no hardware dependencies:
//!
//! - [`frame`]: raw bus frames and byte-field helpers
//! - [`telemetry`]: the decoded engine record
//! - [`units`]: metric/imperial display conversion
//! - [`filter`]: per-channel plausibility windows and smoothing
//! - [`protocol`]: wire protocol selection
//! - [`decoder`]: frame classification and calibrated decoding
//! - [`config`]: persisted settings, key-value store contract, migration
//! - [`bus`]: bus driver contract
//! - [`arbiter`]: live bus vs. simulation state machine
//! - [`simulator`]: procedural bench telemetry
//! - [`dashboard`]: the control-loop context tying it together
//!
//! # no_std Compatibility
//!
//! The crate is `no_std` and allocation-free. Enable the `defmt` feature on
//! targets with a defmt logger to get diagnostics from the core.

#![cfg_attr(not(test), no_std)]
// Crate-level lints
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]

// Must come first so the logging macros are visible to every module below.
mod fmt;

pub mod arbiter;
pub mod bus;
pub mod config;
pub mod dashboard;
pub mod decoder;
pub mod filter;
pub mod frame;
pub mod protocol;
pub mod simulator;
pub mod telemetry;
pub mod units;

// Re-export commonly used items
pub use arbiter::{ArbiterState, ModeArbiter};
pub use bus::{BusDriver, BusError, BusStats};
pub use config::{CanSpeed, Config, ConfigError, ConfigStore, KeyValueStore, MemoryStore, StoreError, StoredValue};
pub use dashboard::{ActionError, Dashboard};
pub use decoder::{DecodeOutcome, FrameDecoder};
pub use frame::RawFrame;
pub use protocol::{Protocol, Revision};
pub use telemetry::Telemetry;
pub use units::{UnitConverter, UnitSystem};
