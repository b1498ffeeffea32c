//! Custom three-frame stream (little-endian, least significant byte first).
//!
//! | offset | layout                                                                      |
//! |--------|-----------------------------------------------------------------------------|
//! | +0     | RPM 0.1 (0-1), TPS 0.5 % (2), pedal 0.5 % (3), MAP 0.1-100 kPa (4-5), ECT-40 (6), IAT-40 (7) |
//! | +1     | lambda 0.001 (0-1), target 0.001 (2-3), inj duty 0.5 % (4), ethanol % (5), battery 0.01 V (6-7) |
//! | +2     | oil 0.1 kPa (0-1), fuel 0.1 kPa (2-3), boost map (4), throttle map (5), status bits (6) |
//!
//! Values pass through with no smoothing or plausibility window.

use crate::filter::FilterState;
use crate::frame::{MAX_DATA_LEN, le_u16};
use crate::telemetry::Telemetry;

type Payload = [u8; MAX_DATA_LEN];

/// Status byte: launch control armed.
pub const STATUS_LAUNCH_CONTROL: u8 = 1 << 0;
/// Status byte: anti-lag active.
pub const STATUS_ANTI_LAG: u8 = 1 << 1;

pub(crate) fn decode_engine(
    data: &Payload,
    telemetry: &mut Telemetry,
    _filters: &mut FilterState,
) {
    telemetry.rpm = f32::from(le_u16(data, 0)) * 0.1;
    telemetry.throttle_position = f32::from(data[2]) * 0.5;
    telemetry.pedal_position = f32::from(data[3]) * 0.5;
    telemetry.manifold_pressure = f32::from(le_u16(data, 4)) * 0.1 - 100.0;
    telemetry.coolant_temp = f32::from(data[6]) - 40.0;
    telemetry.intake_air_temp = f32::from(data[7]) - 40.0;
}

pub(crate) fn decode_mixture(
    data: &Payload,
    telemetry: &mut Telemetry,
    _filters: &mut FilterState,
) {
    telemetry.lambda = f32::from(le_u16(data, 0)) * 0.001;
    telemetry.lambda_target = f32::from(le_u16(data, 2)) * 0.001;
    telemetry.injector_duty = f32::from(data[4]) * 0.5;
    telemetry.ethanol_percent = f32::from(data[5]);
    telemetry.battery_voltage = f32::from(le_u16(data, 6)) * 0.01;
}

pub(crate) fn decode_pressures(
    data: &Payload,
    telemetry: &mut Telemetry,
    _filters: &mut FilterState,
) {
    telemetry.oil_pressure = f32::from(le_u16(data, 0)) * 0.1;
    telemetry.fuel_pressure = f32::from(le_u16(data, 2)) * 0.1;
    telemetry.boost_map_index = data[4];
    telemetry.throttle_map_index = data[5];
    telemetry.launch_control_active = data[6] & STATUS_LAUNCH_CONTROL != 0;
    telemetry.anti_lag_active = data[6] & STATUS_ANTI_LAG != 0;
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_little_endian() {
        let mut t = Telemetry::new();
        let mut f = FilterState::new();
        let [m0, m1] = 2000u16.to_le_bytes();
        decode_engine(&[0x20, 0x1C, 100, 50, m0, m1, 130, 65], &mut t, &mut f);
        assert!((t.rpm - 720.0).abs() < 1e-3);
        assert_eq!(t.throttle_position, 50.0);
        assert_eq!(t.pedal_position, 25.0);
        assert!((t.manifold_pressure - 100.0).abs() < 1e-3);
        assert_eq!(t.coolant_temp, 90.0);
        assert_eq!(t.intake_air_temp, 25.0);
    }

    #[test]
    fn test_engine_extremes_pass_through() {
        let mut t = Telemetry::new();
        let mut f = FilterState::new();
        decode_engine(&[0, 0, 0, 0, 0, 0, 0, 0], &mut t, &mut f);
        assert_eq!(t.coolant_temp, -40.0);
        assert_eq!(t.manifold_pressure, -100.0);
        assert_eq!(f, FilterState::new());
    }

    #[test]
    fn test_mixture_frame() {
        let mut t = Telemetry::new();
        let mut f = FilterState::new();
        let [l0, l1] = 980u16.to_le_bytes();
        let [t0, t1] = 1000u16.to_le_bytes();
        let [b0, b1] = 1385u16.to_le_bytes();
        decode_mixture(&[l0, l1, t0, t1, 90, 85, b0, b1], &mut t, &mut f);
        assert!((t.lambda - 0.98).abs() < 1e-4);
        assert!((t.lambda_target - 1.0).abs() < 1e-4);
        assert_eq!(t.injector_duty, 45.0);
        assert_eq!(t.ethanol_percent, 85.0);
        assert!((t.battery_voltage - 13.85).abs() < 1e-4);
    }

    #[test]
    fn test_pressure_frame_and_status_bits() {
        let mut t = Telemetry::new();
        let mut f = FilterState::new();
        let [o0, o1] = 3200u16.to_le_bytes();
        let [f0, f1] = 3500u16.to_le_bytes();
        decode_pressures(&[o0, o1, f0, f1, 2, 3, STATUS_ANTI_LAG, 0], &mut t, &mut f);
        assert!((t.oil_pressure - 320.0).abs() < 1e-3);
        assert!((t.fuel_pressure - 350.0).abs() < 1e-3);
        assert_eq!(t.boost_map_index, 2);
        assert_eq!(t.throttle_map_index, 3);
        assert!(!t.launch_control_active);
        assert!(t.anti_lag_active);

        decode_pressures(&[0, 0, 0, 0, 0, 0, STATUS_LAUNCH_CONTROL | STATUS_ANTI_LAG | 0xF0, 0], &mut t, &mut f);
        assert!(t.launch_control_active);
        assert!(t.anti_lag_active);
    }
}
