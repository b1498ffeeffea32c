//! Color constants for the status pages.
//!
//! Standard colors come from the `RgbColor` trait constants; the rest are
//! hand-picked Rgb565 values (5 bits red, 6 bits green, 5 bits blue).

use ecu_dash_common::ArbiterState;
use embedded_graphics::pixelcolor::{Rgb565, RgbColor};

// =============================================================================
// Standard Colors
// =============================================================================

pub const BLACK: Rgb565 = Rgb565::BLACK;
pub const WHITE: Rgb565 = Rgb565::WHITE;

/// Critical values and bus errors.
pub const RED: Rgb565 = Rgb565::RED;

/// Normal range and live bus.
pub const GREEN: Rgb565 = Rgb565::GREEN;

/// Warnings.
pub const YELLOW: Rgb565 = Rgb565::YELLOW;

pub const CYAN: Rgb565 = Rgb565::CYAN;

// =============================================================================
// Custom Colors
// =============================================================================

/// Elevated values, one step below critical.
/// RGB565: (31, 32, 0).
pub const ORANGE: Rgb565 = Rgb565::new(31, 32, 0);

/// Divider lines and low-priority log levels.
/// RGB565: (8, 16, 8).
pub const GRAY: Rgb565 = Rgb565::new(8, 16, 8);

/// Cold engine (coolant below operating temperature).
/// RGB565: (0, 20, 10).
pub const DARK_TEAL: Rgb565 = Rgb565::new(0, 20, 10);

/// Header badge color for each telemetry source state.
pub const fn state_color(state: ArbiterState) -> Rgb565 {
    match state {
        ArbiterState::Uninitialized => GRAY,
        ArbiterState::LiveBus => GREEN,
        ArbiterState::Simulation => CYAN,
        ArbiterState::LiveBusStalled => RED,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
