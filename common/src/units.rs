//! Display unit conversion.
//!
//! Telemetry is always stored in metric units (°C, kPa, km/h). The renderer
//! converts on the way out through a [`UnitConverter`] built from the active
//! [`UnitSystem`]. All conversions are total over finite floats.

/// Kilopascal to PSI conversion factor.
pub const KPA_TO_PSI: f32 = 0.145_038;

/// Kilometres per hour to miles per hour conversion factor.
pub const KMH_TO_MPH: f32 = 0.621_371;

/// Display unit system selected by the operator.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UnitSystem {
    /// °C, kPa, km/h.
    #[default]
    Metric,
    /// °F, PSI, mph.
    Imperial,
}

impl UnitSystem {
    /// Persisted representation.
    #[inline]
    pub const fn as_raw(self) -> u32 {
        match self {
            Self::Metric => 0,
            Self::Imperial => 1,
        }
    }

    /// Parse the persisted representation.
    #[inline]
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::Metric),
            1 => Some(Self::Imperial),
            _ => None,
        }
    }

    /// Switch to the other system.
    #[inline]
    pub const fn toggle(self) -> Self {
        match self {
            Self::Metric => Self::Imperial,
            Self::Imperial => Self::Metric,
        }
    }

    #[inline]
    pub const fn is_imperial(self) -> bool { matches!(self, Self::Imperial) }

    /// Human readable name for status screens.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Metric => "Metric",
            Self::Imperial => "Imperial",
        }
    }
}

// =============================================================================
// Raw Conversions
// =============================================================================

#[inline]
pub fn celsius_to_fahrenheit(celsius: f32) -> f32 { celsius * 9.0 / 5.0 + 32.0 }

#[inline]
pub fn fahrenheit_to_celsius(fahrenheit: f32) -> f32 { (fahrenheit - 32.0) * 5.0 / 9.0 }

#[inline]
pub fn kpa_to_psi(kpa: f32) -> f32 { kpa * KPA_TO_PSI }

#[inline]
pub fn psi_to_kpa(psi: f32) -> f32 { psi / KPA_TO_PSI }

#[inline]
pub fn kmh_to_mph(kmh: f32) -> f32 { kmh * KMH_TO_MPH }

#[inline]
pub fn mph_to_kmh(mph: f32) -> f32 { mph / KMH_TO_MPH }

// =============================================================================
// Converter
// =============================================================================

/// Converts stored metric values into the selected display units.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct UnitConverter {
    system: UnitSystem,
}

impl UnitConverter {
    pub const fn new(system: UnitSystem) -> Self { Self { system } }

    #[inline]
    pub const fn system(&self) -> UnitSystem { self.system }

    /// Temperature for display (input in °C).
    pub fn temperature(
        &self,
        celsius: f32,
    ) -> f32 {
        match self.system {
            UnitSystem::Metric => celsius,
            UnitSystem::Imperial => celsius_to_fahrenheit(celsius),
        }
    }

    /// Inverse of [`Self::temperature`]: a displayed temperature back to °C.
    pub fn temperature_to_metric(
        &self,
        displayed: f32,
    ) -> f32 {
        match self.system {
            UnitSystem::Metric => displayed,
            UnitSystem::Imperial => fahrenheit_to_celsius(displayed),
        }
    }

    /// Pressure for display (input in kPa).
    pub fn pressure(
        &self,
        kpa: f32,
    ) -> f32 {
        match self.system {
            UnitSystem::Metric => kpa,
            UnitSystem::Imperial => kpa_to_psi(kpa),
        }
    }

    /// Inverse of [`Self::pressure`].
    pub fn pressure_to_metric(
        &self,
        displayed: f32,
    ) -> f32 {
        match self.system {
            UnitSystem::Metric => displayed,
            UnitSystem::Imperial => psi_to_kpa(displayed),
        }
    }

    /// Speed for display (input in km/h).
    pub fn speed(
        &self,
        kmh: f32,
    ) -> f32 {
        match self.system {
            UnitSystem::Metric => kmh,
            UnitSystem::Imperial => kmh_to_mph(kmh),
        }
    }

    /// Inverse of [`Self::speed`].
    pub fn speed_to_metric(
        &self,
        displayed: f32,
    ) -> f32 {
        match self.system {
            UnitSystem::Metric => displayed,
            UnitSystem::Imperial => mph_to_kmh(displayed),
        }
    }

    pub const fn temperature_unit(&self) -> &'static str {
        match self.system {
            UnitSystem::Metric => "C",
            UnitSystem::Imperial => "F",
        }
    }

    pub const fn pressure_unit(&self) -> &'static str {
        match self.system {
            UnitSystem::Metric => "kPa",
            UnitSystem::Imperial => "psi",
        }
    }

    pub const fn speed_unit(&self) -> &'static str {
        match self.system {
            UnitSystem::Metric => "km/h",
            UnitSystem::Imperial => "mph",
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn close(
        a: f32,
        b: f32,
        tol: f32,
    ) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn test_known_temperature_points() {
        assert!(close(celsius_to_fahrenheit(0.0), 32.0, 1e-4));
        assert!(close(celsius_to_fahrenheit(100.0), 212.0, 1e-4));
        assert!(close(celsius_to_fahrenheit(-40.0), -40.0, 1e-4));
    }

    #[test]
    fn test_pressure_and_speed_factors() {
        assert!(close(kpa_to_psi(100.0), 14.5038, 1e-3));
        assert!(close(kmh_to_mph(100.0), 62.1371, 1e-3));
    }

    #[test]
    fn test_metric_is_identity() {
        let conv = UnitConverter::new(UnitSystem::Metric);
        assert_eq!(conv.temperature(87.5), 87.5);
        assert_eq!(conv.pressure(320.0), 320.0);
        assert_eq!(conv.speed(65.0), 65.0);
        assert_eq!(conv.temperature_unit(), "C");
    }

    #[test]
    fn test_temperature_round_trip_across_toggle() {
        let mut system = UnitSystem::Metric;
        for c in [-40.0f32, -12.3, 0.0, 21.7, 87.5, 150.0, 205.0, 1234.5] {
            system = system.toggle();
            let out = UnitConverter::new(system);
            let displayed = out.temperature(c);
            system = system.toggle();
            assert_eq!(system, UnitSystem::Metric);
            let back = out.temperature_to_metric(displayed);
            assert!(close(back, c, 1e-3 * c.abs().max(1.0)), "{c} -> {displayed} -> {back}");
        }
    }

    #[test]
    fn test_pressure_and_speed_round_trip() {
        let conv = UnitConverter::new(UnitSystem::Imperial);
        for v in [0.0f32, 15.2, 101.3, 350.0, 550.0] {
            assert!(close(conv.pressure_to_metric(conv.pressure(v)), v, 1e-3));
            assert!(close(conv.speed_to_metric(conv.speed(v)), v, 1e-3));
        }
    }

    #[test]
    fn test_unit_system_raw_values() {
        assert_eq!(UnitSystem::from_raw(UnitSystem::Imperial.as_raw()), Some(UnitSystem::Imperial));
        assert_eq!(UnitSystem::from_raw(7), None);
        assert_eq!(UnitSystem::default(), UnitSystem::Metric);
    }
}
