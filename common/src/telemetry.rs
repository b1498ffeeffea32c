//! Decoded engine state shared between the decoder, the simulator and the
//! renderer.
//!
//! Every field always holds the most recently decoded value. Channels a
//! protocol does not carry keep their last value, starting from the demo
//! defaults below, so the renderer never sees an uninitialised reading.
//!
//! All values are stored in metric units; see [`crate::units`] for display
//! conversion.

use micromath::F32Ext;

/// Standard gravity, used to turn accelerometer readings into g.
pub const STANDARD_GRAVITY: f32 = 9.81;

/// Weight of a new accelerometer sample in the G-force low-pass filter.
pub const G_FORCE_ALPHA: f32 = 0.3;

/// Decoded engine parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Telemetry {
    /// Engine speed, rev/min (0..15000).
    pub rpm: f32,
    /// Throttle position, % (0..100).
    pub throttle_position: f32,
    /// Accelerator pedal position, % (0..100).
    pub pedal_position: f32,
    /// Manifold pressure, kPa (-100..550).
    pub manifold_pressure: f32,
    /// Engine coolant temperature, °C.
    pub coolant_temp: f32,
    /// Intake air temperature, °C.
    pub intake_air_temp: f32,
    /// Oil temperature, °C.
    pub oil_temp: f32,
    /// Fuel temperature, °C.
    pub fuel_temp: f32,
    /// ECU internal temperature, °C.
    pub ecu_temp: f32,
    /// Battery / ECU supply voltage, V (0..30).
    pub battery_voltage: f32,
    /// Lambda sensor 1 (1.0 = stoichiometric).
    pub lambda: f32,
    /// Lambda sensor 2.
    pub lambda_2: f32,
    /// Lambda target requested by the ECU.
    pub lambda_target: f32,
    /// Oil pressure, kPa.
    pub oil_pressure: f32,
    /// Fuel pressure, kPa.
    pub fuel_pressure: f32,
    /// Vehicle speed, km/h.
    pub vehicle_speed: f32,
    /// Selected gear: -1 reverse, 0 neutral, 1..6.
    pub gear_position: i8,
    /// Primary injector duty cycle, %.
    pub injector_duty: f32,
    /// Ignition advance, degrees.
    pub ignition_timing: f32,
    /// Fuel level, %.
    pub fuel_level: f32,
    /// Ethanol content, %.
    pub ethanol_percent: f32,
    /// Exhaust gas temperature 1, °C.
    pub egt_1: f32,
    /// Exhaust gas temperature 2, °C.
    pub egt_2: f32,
    /// Knock level (0..10 scale).
    pub knock_level: f32,
    /// Boost control solenoid duty, %.
    pub boost_duty: f32,
    /// Active boost map index.
    pub boost_map_index: u8,
    /// Active electronic throttle map index.
    pub throttle_map_index: u8,
    pub launch_control_active: bool,
    pub anti_lag_active: bool,
    /// Lateral acceleration, g (positive = right turn).
    pub g_force_lateral: f32,
    /// Longitudinal acceleration, g (positive = accelerating).
    pub g_force_longitudinal: f32,
    /// Planar acceleration magnitude, g.
    pub g_force_total: f32,
}

impl Telemetry {
    /// Startup values shown before the first frame or simulator tick.
    pub const fn new() -> Self {
        Self {
            rpm: 2150.0,
            throttle_position: 35.5,
            pedal_position: 35.5,
            manifold_pressure: 15.2,
            coolant_temp: 87.5,
            intake_air_temp: 28.5,
            oil_temp: 95.2,
            fuel_temp: 30.0,
            ecu_temp: 45.0,
            battery_voltage: 13.8,
            lambda: 0.98,
            lambda_2: 0.99,
            lambda_target: 1.00,
            oil_pressure: 320.0,
            fuel_pressure: 350.0,
            vehicle_speed: 65.0,
            gear_position: 3,
            injector_duty: 20.0,
            ignition_timing: 18.5,
            fuel_level: 75.0,
            ethanol_percent: 0.0,
            egt_1: 850.0,
            egt_2: 860.0,
            knock_level: 2.5,
            boost_duty: 45.0,
            boost_map_index: 0,
            throttle_map_index: 0,
            launch_control_active: false,
            anti_lag_active: false,
            g_force_lateral: 0.0,
            g_force_longitudinal: 0.0,
            g_force_total: 0.0,
        }
    }

    /// Fold one accelerometer sample (m/s², device X = lateral, Y =
    /// longitudinal) into the smoothed G-force channels.
    ///
    /// Gravity is on the Z axis and is ignored, so `g_force_total` is the
    /// planar magnitude only.
    pub fn apply_acceleration(
        &mut self,
        lateral_ms2: f32,
        longitudinal_ms2: f32,
    ) {
        let lateral = lateral_ms2 / STANDARD_GRAVITY;
        let longitudinal = longitudinal_ms2 / STANDARD_GRAVITY;

        self.g_force_lateral = G_FORCE_ALPHA * lateral + (1.0 - G_FORCE_ALPHA) * self.g_force_lateral;
        self.g_force_longitudinal = G_FORCE_ALPHA * longitudinal + (1.0 - G_FORCE_ALPHA) * self.g_force_longitudinal;
        self.g_force_total = F32Ext::sqrt(
            self.g_force_lateral * self.g_force_lateral + self.g_force_longitudinal * self.g_force_longitudinal,
        );
    }
}

impl Default for Telemetry {
    fn default() -> Self { Self::new() }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_in_range() {
        let t = Telemetry::default();
        assert!((0.0..=15000.0).contains(&t.rpm));
        assert!((0.0..=100.0).contains(&t.throttle_position));
        assert!((-40.0..=205.0).contains(&t.coolant_temp));
        assert!((0.6..=1.4).contains(&t.lambda));
        assert!((-1..=6).contains(&t.gear_position));
        assert_eq!(t.g_force_total, 0.0);
    }

    #[test]
    fn test_acceleration_is_smoothed() {
        let mut t = Telemetry::new();
        t.apply_acceleration(STANDARD_GRAVITY, 0.0);
        assert!((t.g_force_lateral - G_FORCE_ALPHA).abs() < 1e-5);
        assert_eq!(t.g_force_longitudinal, 0.0);
    }

    #[test]
    fn test_acceleration_converges_and_total_is_magnitude() {
        let mut t = Telemetry::new();
        for _ in 0..100 {
            t.apply_acceleration(0.6 * STANDARD_GRAVITY, 0.8 * STANDARD_GRAVITY);
        }
        assert!((t.g_force_lateral - 0.6).abs() < 1e-3);
        assert!((t.g_force_longitudinal - 0.8).abs() < 1e-3);
        assert!((t.g_force_total - 1.0).abs() < 0.01);
    }
}
