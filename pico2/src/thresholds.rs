//! Gauge color thresholds.
//!
//! Thresholds are in metric units (the telemetry record's units); colors are
//! picked before unit conversion so switching to imperial never changes
//! what turns red. Ordering is checked at compile time.

use embedded_graphics::pixelcolor::Rgb565;

use crate::colors::{BLACK, DARK_TEAL, ORANGE, RED, YELLOW};

// =============================================================================
// Coolant Temperature (°C)
// =============================================================================

/// Below this the engine is still warming up.
pub const COOLANT_COLD_MAX: f32 = 70.0;

pub const COOLANT_HOT: f32 = 105.0;

pub const COOLANT_CRITICAL: f32 = 115.0;

const _: () = assert!(COOLANT_COLD_MAX < COOLANT_HOT);
const _: () = assert!(COOLANT_HOT < COOLANT_CRITICAL);

// =============================================================================
// Oil Temperature (°C)
// =============================================================================

pub const OIL_ELEVATED: f32 = 120.0;

pub const OIL_CRITICAL: f32 = 135.0;

const _: () = assert!(OIL_ELEVATED < OIL_CRITICAL);

// =============================================================================
// Battery Voltage (V)
// =============================================================================

/// Alternator not charging.
pub const BATT_WARNING: f32 = 12.5;

pub const BATT_CRITICAL: f32 = 11.8;

/// Regulator fault.
pub const BATT_OVERVOLTAGE: f32 = 15.2;

const _: () = assert!(BATT_CRITICAL < BATT_WARNING);
const _: () = assert!(BATT_WARNING < BATT_OVERVOLTAGE);

// =============================================================================
// Lambda
// =============================================================================

pub const LAMBDA_RICH: f32 = 0.85;

pub const LAMBDA_LEAN: f32 = 1.05;

/// Lean enough to risk detonation under load.
pub const LAMBDA_LEAN_CRITICAL: f32 = 1.15;

const _: () = assert!(LAMBDA_RICH < LAMBDA_LEAN);
const _: () = assert!(LAMBDA_LEAN < LAMBDA_LEAN_CRITICAL);

// =============================================================================
// Knock and Exhaust Gas Temperature
// =============================================================================

pub const KNOCK_WARNING: f32 = 5.0;

pub const KNOCK_CRITICAL: f32 = 10.0;

const _: () = assert!(KNOCK_WARNING < KNOCK_CRITICAL);

pub const EGT_HIGH: f32 = 900.0;

pub const EGT_CRITICAL: f32 = 950.0;

const _: () = assert!(EGT_HIGH < EGT_CRITICAL);

// =============================================================================
// Color Selection
// =============================================================================

pub fn coolant_color(celsius: f32) -> Rgb565 {
    if celsius >= COOLANT_CRITICAL {
        RED
    } else if celsius >= COOLANT_HOT {
        ORANGE
    } else if celsius < COOLANT_COLD_MAX {
        DARK_TEAL
    } else {
        BLACK
    }
}

pub fn oil_color(celsius: f32) -> Rgb565 {
    if celsius >= OIL_CRITICAL {
        RED
    } else if celsius >= OIL_ELEVATED {
        YELLOW
    } else {
        BLACK
    }
}

pub fn battery_color(volts: f32) -> Rgb565 {
    if volts < BATT_CRITICAL || volts > BATT_OVERVOLTAGE {
        RED
    } else if volts < BATT_WARNING {
        YELLOW
    } else {
        BLACK
    }
}

pub fn lambda_color(lambda: f32) -> Rgb565 {
    if lambda >= LAMBDA_LEAN_CRITICAL {
        RED
    } else if lambda > LAMBDA_LEAN {
        ORANGE
    } else if lambda < LAMBDA_RICH {
        DARK_TEAL
    } else {
        BLACK
    }
}

pub fn knock_color(level: f32) -> Rgb565 {
    if level >= KNOCK_CRITICAL {
        RED
    } else if level >= KNOCK_WARNING {
        YELLOW
    } else {
        BLACK
    }
}

pub fn egt_color(celsius: f32) -> Rgb565 {
    if celsius >= EGT_CRITICAL {
        RED
    } else if celsius >= EGT_HIGH {
        ORANGE
    } else {
        BLACK
    }
}

/// Whether any channel is in its critical band. Drives the red status LED.
pub fn any_critical(telemetry: &ecu_dash_common::Telemetry) -> bool {
    telemetry.coolant_temp >= COOLANT_CRITICAL
        || telemetry.oil_temp >= OIL_CRITICAL
        || telemetry.battery_voltage < BATT_CRITICAL
        || telemetry.lambda >= LAMBDA_LEAN_CRITICAL
        || telemetry.knock_level >= KNOCK_CRITICAL
        || telemetry.egt_1.max(telemetry.egt_2) >= EGT_CRITICAL
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use ecu_dash_common::Telemetry;

    use super::*;

    #[test]
    fn test_coolant_bands() {
        assert_eq!(coolant_color(40.0), DARK_TEAL);
        assert_eq!(coolant_color(90.0), BLACK);
        assert_eq!(coolant_color(COOLANT_HOT), ORANGE);
        assert_eq!(coolant_color(120.0), RED);
    }

    #[test]
    fn test_battery_bands() {
        assert_eq!(battery_color(13.8), BLACK);
        assert_eq!(battery_color(12.2), YELLOW);
        assert_eq!(battery_color(11.0), RED);
        assert_eq!(battery_color(16.0), RED);
    }

    #[test]
    fn test_lambda_bands() {
        assert_eq!(lambda_color(1.0), BLACK);
        assert_eq!(lambda_color(0.80), DARK_TEAL);
        assert_eq!(lambda_color(1.10), ORANGE);
        assert_eq!(lambda_color(1.20), RED);
    }

    #[test]
    fn test_other_bands() {
        assert_eq!(oil_color(95.0), BLACK);
        assert_eq!(oil_color(125.0), YELLOW);
        assert_eq!(knock_color(2.5), BLACK);
        assert_eq!(knock_color(12.0), RED);
        assert_eq!(egt_color(850.0), BLACK);
        assert_eq!(egt_color(920.0), ORANGE);
    }

    #[test]
    fn test_demo_record_is_not_critical() {
        let mut telemetry = Telemetry::new();
        assert!(!any_critical(&telemetry));
        telemetry.egt_2 = 1000.0;
        assert!(any_critical(&telemetry));
    }
}
