//! Procedural telemetry for bench use.
//!
//! Replays an engine start (cranking, catching, then a slow driving cycle)
//! from smooth sine waves of elapsed time, so the output depends only on the
//! clock and not on how often the loop runs. Every channel is clamped to a
//! plausible range. G-force channels are left alone: they always come from
//! the IMU.

use micromath::F32;

use crate::telemetry::Telemetry;

/// Minimum interval between simulator updates.
pub const UPDATE_INTERVAL_MS: u64 = 50;

/// End of the cranking phase, measured from simulator start.
pub const CRANKING_END_MS: u64 = 5_000;

/// End of the starting phase.
pub const STARTING_END_MS: u64 = 10_000;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EnginePhase {
    Cranking,
    Starting,
    Running,
}

impl EnginePhase {
    pub const fn at(runtime_ms: u64) -> Self {
        if runtime_ms < CRANKING_END_MS {
            Self::Cranking
        } else if runtime_ms < STARTING_END_MS {
            Self::Starting
        } else {
            Self::Running
        }
    }
}

#[inline]
fn wave(
    t: f32,
    freq: f32,
) -> f32 {
    F32(t * freq).sin().0
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Simulator {
    started_ms: Option<u64>,
    last_update_ms: Option<u64>,
}

impl Simulator {
    pub const fn new() -> Self {
        Self {
            started_ms: None,
            last_update_ms: None,
        }
    }

    /// Start the engine sequence over at the next update.
    pub fn restart(&mut self) { *self = Self::new(); }

    /// Phase the simulated engine is in at `now_ms`.
    pub fn phase(
        &self,
        now_ms: u64,
    ) -> EnginePhase {
        EnginePhase::at(self.started_ms.map_or(0, |start| now_ms.saturating_sub(start)))
    }

    /// Advance the simulation. Returns `true` if telemetry was written.
    pub fn update(
        &mut self,
        now_ms: u64,
        telemetry: &mut Telemetry,
    ) -> bool {
        if let Some(last) = self.last_update_ms
            && now_ms.saturating_sub(last) < UPDATE_INTERVAL_MS
        {
            return false;
        }
        let start = *self.started_ms.get_or_insert(now_ms);
        self.last_update_ms = Some(now_ms);

        let runtime_ms = now_ms.saturating_sub(start);
        fill(EnginePhase::at(runtime_ms), runtime_ms, telemetry);
        true
    }
}

/// Write every simulated channel for one instant.
fn fill(
    phase: EnginePhase,
    runtime_ms: u64,
    t: &mut Telemetry,
) {
    let secs = runtime_ms as f32 / 1000.0;

    let (rpm, tps) = match phase {
        EnginePhase::Cranking => ((250.0 + 50.0 * wave(secs, 7.0)).clamp(200.0, 300.0), 0.0),
        EnginePhase::Starting => (800.0 + 50.0 * wave(secs, 3.0), 10.0 + 10.0 * wave(secs, 0.9)),
        EnginePhase::Running => {
            let cycle = (runtime_ms - STARTING_END_MS) as f32 / 1000.0;
            (
                (1500.0 + 2000.0 * wave(cycle, 0.1)).clamp(800.0, 7000.0),
                (20.0 + 30.0 * wave(cycle, 0.15)).clamp(0.0, 100.0),
            )
        }
    };
    let running = phase != EnginePhase::Cranking;

    t.rpm = rpm;
    t.throttle_position = tps;
    t.pedal_position = tps;
    t.manifold_pressure = (tps * 2.0 - 10.0).clamp(-10.0, 200.0);
    t.injector_duty = (tps * 0.8).clamp(0.0, 100.0);
    t.ignition_timing = (15.0 + rpm * 0.005).clamp(10.0, 30.0);

    t.coolant_temp = (85.0 + 5.0 * wave(secs, 0.05)).clamp(70.0, 105.0);
    t.intake_air_temp = (27.0 + 7.0 * wave(secs, 0.07)).clamp(20.0, 50.0);
    t.oil_temp = (95.0 + 15.0 * wave(secs, 0.03)).clamp(80.0, 130.0);
    t.ecu_temp = (45.0 + 10.0 * wave(secs, 0.02)).clamp(30.0, 80.0);

    t.battery_voltage = if running {
        (13.8 + 0.3 * wave(secs, 0.5)).clamp(11.5, 14.8)
    } else {
        11.8
    };
    t.oil_pressure = (if running { 150.0 + rpm * 0.05 } else { 100.0 }).clamp(100.0, 400.0);
    t.fuel_pressure = (350.0 + 20.0 * wave(secs, 0.4)).clamp(250.0, 400.0);

    t.lambda = (0.95 + 0.1 * wave(secs, 0.6)).clamp(0.7, 1.3);
    t.lambda_2 = (0.96 + 0.1 * wave(secs, 0.55)).clamp(0.7, 1.3);
    t.lambda_target = (1.0 + 0.05 * wave(secs, 0.2)).clamp(0.8, 1.2);

    let speed = if phase == EnginePhase::Running {
        let cycle = (runtime_ms - STARTING_END_MS) as f32 / 1000.0;
        (60.0 + 60.0 * wave(cycle, 0.1)).clamp(0.0, 200.0)
    } else {
        0.0
    };
    t.vehicle_speed = speed;
    t.gear_position = if speed < 1.0 { 0 } else { ((speed / 30.0) as i8 + 1).clamp(1, 6) };

    t.fuel_level = (75.0 + 5.0 * wave(secs, 0.01)).clamp(0.0, 100.0);
    t.egt_1 = (650.0 + 250.0 * wave(secs, 0.08)).clamp(400.0, 1000.0);
    t.egt_2 = (660.0 + 250.0 * wave(secs, 0.085)).clamp(400.0, 1000.0);
    t.knock_level = (2.5 + 2.0 * wave(secs, 0.3)).clamp(0.0, 10.0);
    t.boost_duty = (45.0 + 30.0 * wave(secs, 0.25)).clamp(0.0, 100.0);
}

// =============================================================================
// Unit Tests
// =============================================================================
