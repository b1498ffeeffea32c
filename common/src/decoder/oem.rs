//! OEM stream layouts (big-endian, most significant byte first).
//!
//! | offset | rate  | bytes 0-1      | bytes 2-3        | bytes 4-5       | bytes 6-7   |
//! |--------|-------|----------------|------------------|-----------------|-------------|
//! | +0     | 50 Hz | RPM            | MAP 0.1 kPa      | TPS 0.1 %       | reserved    |
//! | +1     | 50 Hz | fuel 0.1 kPa   | oil 0.1 kPa      | reserved        | reserved    |
//! | +2     | 50 Hz | inj duty 0.1 % | inj duty 2       | ign 0.1° signed | ign trail   |
//! | +8     | 20 Hz | lambda 1 0.001 | lambda 2 0.001   | reserved        | reserved    |
//! | +3     | 5 Hz  | ECT 0.1 K      | IAT 0.1 K        | fuel temp 0.1 K | oil 0.1 K   |
//!
//! Some controllers send the temperature frame at +0x80 instead of +3.
//!
//! The packed revision replaces the +0 frame with a single frame carrying
//! the engine and temperature fields together:
//!
//! | bytes 0-1 | bytes 2-3     | byte 4  | byte 5  | byte 6     | byte 7       |
//! |-----------|---------------|---------|---------|------------|--------------|
//! | RPM       | MAP kPa - 100 | ECT -50 | IAT -50 | batt 0.1 V | oil temp -50 |

use crate::filter::{Channel, FilterState};
use crate::frame::{MAX_DATA_LEN, be_i16, be_u16};
use crate::telemetry::Telemetry;

type Payload = [u8; MAX_DATA_LEN];

/// Offset between 0 °C and absolute zero.
const KELVIN_OFFSET: f32 = 273.15;

#[inline]
fn tenths(raw: u16) -> f32 { f32::from(raw) * 0.1 }

/// 0.1 K raw reading to °C.
#[inline]
pub(crate) fn decikelvin_to_celsius(raw: u16) -> f32 { tenths(raw) - KELVIN_OFFSET }

/// Primary frame, multi-frame revision: engine speed, MAP, throttle.
pub(crate) fn decode_engine(
    data: &Payload,
    telemetry: &mut Telemetry,
    _filters: &mut FilterState,
) {
    telemetry.rpm = f32::from(be_u16(data, 0));
    telemetry.manifold_pressure = tenths(be_u16(data, 2));
    telemetry.throttle_position = tenths(be_u16(data, 4));
}

/// Primary frame, packed revision. Values are written directly, with no
/// blending or plausibility window.
pub(crate) fn decode_packed_engine(
    data: &Payload,
    telemetry: &mut Telemetry,
    _filters: &mut FilterState,
) {
    telemetry.rpm = f32::from(be_u16(data, 0));
    telemetry.manifold_pressure = f32::from(be_u16(data, 2)) - 100.0;
    telemetry.coolant_temp = f32::from(data[4]) - 50.0;
    telemetry.intake_air_temp = f32::from(data[5]) - 50.0;
    telemetry.battery_voltage = f32::from(data[6]) * 0.1;
    telemetry.oil_temp = f32::from(data[7]) - 50.0;
}

/// Fuel and oil pressure.
pub(crate) fn decode_pressures(
    data: &Payload,
    telemetry: &mut Telemetry,
    _filters: &mut FilterState,
) {
    telemetry.fuel_pressure = tenths(be_u16(data, 0));
    telemetry.oil_pressure = tenths(be_u16(data, 2));
}

/// Injector duty and leading ignition angle. The secondary injector duty
/// and trailing angle are not tracked.
pub(crate) fn decode_ignition(
    data: &Payload,
    telemetry: &mut Telemetry,
    _filters: &mut FilterState,
) {
    telemetry.injector_duty = tenths(be_u16(data, 0));
    telemetry.ignition_timing = f32::from(be_i16(data, 4)) * 0.1;
}

/// Dual wideband lambda.
pub(crate) fn decode_lambda(
    data: &Payload,
    telemetry: &mut Telemetry,
    _filters: &mut FilterState,
) {
    telemetry.lambda = f32::from(be_u16(data, 0)) * 0.001;
    telemetry.lambda_2 = f32::from(be_u16(data, 2)) * 0.001;
}

/// Temperatures in 0.1 K. Coolant, intake air and oil are checked for
/// plausibility and smoothed; each channel is rejected independently.
pub(crate) fn decode_temperatures(
    data: &Payload,
    telemetry: &mut Telemetry,
    filters: &mut FilterState,
) {
    let coolant = decikelvin_to_celsius(be_u16(data, 0));
    let intake = decikelvin_to_celsius(be_u16(data, 2));
    let fuel = decikelvin_to_celsius(be_u16(data, 4));
    let oil = decikelvin_to_celsius(be_u16(data, 6));

    if let Some(value) = filters.apply(Channel::IntakeAirTemp, telemetry.intake_air_temp, intake) {
        telemetry.intake_air_temp = value;
    }
    if let Some(value) = filters.apply(Channel::CoolantTemp, telemetry.coolant_temp, coolant) {
        telemetry.coolant_temp = value;
    }
    if let Some(value) = filters.apply(Channel::OilTemp, telemetry.oil_temp, oil) {
        telemetry.oil_temp = value;
    }
    telemetry.fuel_temp = fuel;
}

// =============================================================================
// Unit Tests
// =============================================================================
