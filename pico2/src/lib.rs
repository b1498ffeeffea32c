//! Board library for the RP2350 ECU dashboard - host-testable modules.
//!
//! Everything here is free of embassy and HAL types: the SLCAN codec and
//! bus driver, the flash image codec and store, button debounce, the log
//! ring buffer and the status pages. The binary (`main.rs`) wires them to
//! the UART, flash, buttons and display.
//!
//! # Testing
//!
//! ```bash
//! cargo test -p ecu-dash-pico2 --lib --target x86_64-unknown-linux-gnu
//! ```

#![cfg_attr(not(test), no_std)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]

// Bus
pub mod serial_bus;
pub mod slcan;

// Persistence
pub mod image;
pub mod storage;

// Input and logging
pub mod button;
pub mod logs;
pub mod pages;

// Rendering
pub mod colors;
pub mod screens;
pub mod styles;
pub mod thresholds;
