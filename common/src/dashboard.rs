//! The control-loop context.
//!
//! [`Dashboard`] owns the telemetry record, the configuration and every
//! stateful component, and is the single writer of both. The board's main
//! loop calls [`Dashboard::tick`] at a fixed cadence and redraws when
//! [`Dashboard::needs_refresh`] says so; the settings UI calls the operator
//! methods. Nothing here blocks beyond the driver's poll timeout and the
//! store's commit.

use core::fmt;

use crate::arbiter::{ArbiterState, MAX_FRAMES_PER_TICK, ModeArbiter, POLL_TIMEOUT_MS, Transition};
use crate::bus::{BusDriver, BusError, BusStats};
use crate::config::{CanSpeed, Config, ConfigError, ConfigStore, KeyValueStore, LoggingPolicy};
use crate::decoder::{DecodeOutcome, FrameDecoder};
use crate::frame::RawFrame;
use crate::protocol::Protocol;
use crate::simulator::Simulator;
use crate::telemetry::Telemetry;
use crate::units::{UnitConverter, UnitSystem};

/// Longest the display may go without a redraw, ms.
pub const DISPLAY_REFRESH_MS: u64 = 100;

/// Failure of an operator action that touches the bus.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ActionError {
    Config(ConfigError),
    Bus(BusError),
}

impl From<ConfigError> for ActionError {
    fn from(err: ConfigError) -> Self { Self::Config(err) }
}

impl From<BusError> for ActionError {
    fn from(err: BusError) -> Self { Self::Bus(err) }
}

impl fmt::Display for ActionError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Self::Config(err) => err.fmt(f),
            Self::Bus(err) => err.fmt(f),
        }
    }
}

pub struct Dashboard<B, S> {
    bus: B,
    config_store: ConfigStore<S>,
    config: Config,
    telemetry: Telemetry,
    decoder: FrameDecoder,
    arbiter: ModeArbiter,
    simulator: Simulator,
    stats: BusStats,
    display_dirty: bool,
    last_refresh_ms: Option<u64>,
}

impl<B: BusDriver, S: KeyValueStore> Dashboard<B, S> {
    /// Build with default configuration. Nothing is read or initialised
    /// until [`start`](Self::start).
    pub fn new(
        bus: B,
        store: S,
    ) -> Self {
        Self {
            bus,
            config_store: ConfigStore::new(store),
            config: Config::new(),
            telemetry: Telemetry::new(),
            decoder: FrameDecoder::new(),
            arbiter: ModeArbiter::new(),
            simulator: Simulator::new(),
            stats: BusStats::new(),
            display_dirty: true,
            last_refresh_ms: None,
        }
    }

    /// Replace the stall deadline (bench setups with slow replay files).
    pub fn with_stall_deadline(
        mut self,
        deadline_ms: u64,
    ) -> Self {
        self.arbiter = ModeArbiter::with_stall_deadline(deadline_ms);
        self
    }

    /// Load the configuration and pick the telemetry source.
    pub fn start(
        &mut self,
        now_ms: u64,
    ) -> ArbiterState {
        self.config = self.config_store.load();
        self.arbiter.start(&self.config, &mut self.bus, now_ms)
    }

    /// One loop iteration: drain the bus, run the simulator if it is the
    /// active source, then check for a stall.
    pub fn tick(
        &mut self,
        now_ms: u64,
    ) -> ArbiterState {
        if self.arbiter.state() == ArbiterState::Uninitialized {
            self.start(now_ms);
        }

        if self.arbiter.bus_open() {
            for _ in 0..MAX_FRAMES_PER_TICK {
                let Some(frame) = self.bus.poll_frame(POLL_TIMEOUT_MS) else {
                    break;
                };
                self.handle_frame(&frame, now_ms);
            }
        }

        if self.arbiter.is_simulating() && self.simulator.update(now_ms, &mut self.telemetry) {
            self.display_dirty = true;
        }

        if self.arbiter.check_stall(now_ms) == Transition::Stalled {
            self.display_dirty = true;
        }
        self.arbiter.state()
    }

    /// Decode one frame and account for it.
    pub fn handle_frame(
        &mut self,
        frame: &RawFrame,
        now_ms: u64,
    ) -> DecodeOutcome {
        let outcome = self.decoder.decode(frame, &self.config, &mut self.telemetry);
        self.stats.record(now_ms, outcome.is_update());
        if !outcome.is_update() {
            return outcome;
        }
        self.display_dirty = true;

        if outcome.is_primary() && self.arbiter.on_primary_frame(&mut self.config, now_ms).needs_save() {
            // Failure is logged by persist; live data keeps flowing.
            let _ = self.persist();
        }
        outcome
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn telemetry(&self) -> &Telemetry { &self.telemetry }

    pub fn config(&self) -> &Config { &self.config }

    pub fn state(&self) -> ArbiterState { self.arbiter.state() }

    pub fn stats(&self) -> &BusStats { &self.stats }

    pub fn units(&self) -> UnitConverter { UnitConverter::new(self.config.unit_system) }

    pub fn bus(&self) -> &B { &self.bus }

    pub fn bus_mut(&mut self) -> &mut B { &mut self.bus }

    pub fn config_store(&self) -> &ConfigStore<S> { &self.config_store }

    /// Whether telemetry changed since the last call; clears the flag.
    pub fn take_display_dirty(&mut self) -> bool { core::mem::take(&mut self.display_dirty) }

    /// Whether the display should redraw now: something changed or the
    /// refresh interval elapsed. Marks the display refreshed when it returns
    /// `true`.
    pub fn needs_refresh(
        &mut self,
        now_ms: u64,
    ) -> bool {
        let due = self
            .last_refresh_ms
            .is_none_or(|last| now_ms.saturating_sub(last) >= DISPLAY_REFRESH_MS);
        if self.take_display_dirty() || due {
            self.last_refresh_ms = Some(now_ms);
            return true;
        }
        false
    }

    // =========================================================================
    // Operator Actions
    // =========================================================================

    /// Switch to the live bus and re-initialise it. The choice is persisted
    /// even if the bus does not come up, so the next boot retries.
    pub fn select_live_bus(
        &mut self,
        now_ms: u64,
    ) -> Result<(), ActionError> {
        let bus_result = self.arbiter.select_live_bus(&mut self.config, &mut self.bus, now_ms);
        self.display_dirty = true;
        self.persist()?;
        bus_result.map_err(ActionError::from)
    }

    /// Switch to simulated telemetry until the operator selects the bus or
    /// the next boot hears the engine controller.
    pub fn select_simulation(&mut self) -> Result<(), ConfigError> {
        self.arbiter.select_simulation(&mut self.config, &mut self.bus);
        self.simulator.restart();
        self.display_dirty = true;
        self.persist()
    }

    pub fn set_base_can_id(
        &mut self,
        id: u32,
    ) -> Result<(), ConfigError> {
        self.config.set_base_can_id(id)?;
        self.persist()
    }

    /// Change bit rate; re-initialises the bus if it is in use.
    pub fn set_can_speed(
        &mut self,
        speed: CanSpeed,
        now_ms: u64,
    ) -> Result<(), ActionError> {
        self.config.can_speed = speed;
        self.persist()?;
        self.arbiter.apply_speed(&self.config, &mut self.bus, now_ms)?;
        Ok(())
    }

    pub fn set_unit_system(
        &mut self,
        units: UnitSystem,
    ) -> Result<(), ConfigError> {
        self.config.unit_system = units;
        self.display_dirty = true;
        self.persist()
    }

    /// Switch protocol; the base identifier moves to the protocol default.
    pub fn set_protocol(
        &mut self,
        protocol: Protocol,
    ) -> Result<(), ConfigError> {
        self.config.set_protocol(protocol);
        self.persist()
    }

    pub fn set_logging_policy(
        &mut self,
        policy: LoggingPolicy,
    ) -> Result<(), ConfigError> {
        self.config.logging = policy.clamped();
        self.persist()
    }

    /// Feed one IMU sample (m/s²).
    pub fn apply_acceleration(
        &mut self,
        lateral_ms2: f32,
        longitudinal_ms2: f32,
    ) {
        self.telemetry.apply_acceleration(lateral_ms2, longitudinal_ms2);
        self.display_dirty = true;
    }

    fn persist(&mut self) -> Result<(), ConfigError> {
        self.config_store.save(&self.config).map_err(|err| {
            warn!("dashboard: config not saved: {}", err);
            ConfigError::Store(err)
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::config::{MemoryStore, NAMESPACE, StoreError};
    use crate::protocol::Revision;

    #[derive(Default)]
    struct QueueBus {
        fail_init: bool,
        frames: VecDeque<RawFrame>,
        inits: u32,
        polls: u32,
    }

    impl BusDriver for QueueBus {
        fn initialize(
            &mut self,
            _speed: CanSpeed,
        ) -> Result<(), BusError> {
            self.inits += 1;
            if self.fail_init { Err(BusError::NotPresent) } else { Ok(()) }
        }

        fn poll_frame(
            &mut self,
            _timeout_ms: u32,
        ) -> Option<RawFrame> {
            self.polls += 1;
            self.frames.pop_front()
        }
    }

    // 7200 rpm, MAP 100 kPa, ECT 90, IAT 25, 13.8 V, oil 100.
    const RPM_7200: [u8; 8] = [0x1C, 0x20, 0x00, 0xC8, 140, 75, 138, 150];

    /// Packed-revision temperature frame (base + 3) with every channel at
    /// `celsius`, in 0.1 K.
    fn temperature_frame(celsius: f32) -> RawFrame {
        let [hi, lo] = (((celsius + 273.15) * 10.0).round() as u16).to_be_bytes();
        RawFrame::new(1003, &[hi, lo, hi, lo, hi, lo, hi, lo]).unwrap()
    }

    fn store_with(config: &Config) -> MemoryStore {
        let mut cs = ConfigStore::new(<MemoryStore>::new());
        cs.save(config).unwrap();
        cs.into_inner()
    }

    fn dashboard(
        config: &Config,
        bus: QueueBus,
    ) -> Dashboard<QueueBus, MemoryStore> {
        Dashboard::new(bus, store_with(config))
    }

    fn sim_config() -> Config {
        Config {
            simulation_mode: true,
            ..Config::default()
        }
    }

    fn persisted(dash: &Dashboard<QueueBus, MemoryStore>) -> Config {
        let mut cs = ConfigStore::new(dash.config_store().store().clone());
        cs.read().unwrap().config
    }

    #[test]
    fn test_promotion_persists_exactly_once() {
        let mut dash = dashboard(&sim_config(), QueueBus::default());
        assert_eq!(dash.start(0), ArbiterState::Simulation);
        let commits = dash.config_store().store().commit_count();

        let primary = RawFrame::new(1000, &RPM_7200).unwrap();
        assert_eq!(dash.handle_frame(&primary, 10), DecodeOutcome::UpdatedPrimary);
        assert_eq!(dash.state(), ArbiterState::LiveBus);
        assert!(!dash.config().simulation_mode);
        assert_eq!(dash.config_store().store().commit_count(), commits + 1);

        dash.handle_frame(&primary, 20);
        dash.handle_frame(&primary, 30);
        assert_eq!(dash.config_store().store().commit_count(), commits + 1);
        assert!(!persisted(&dash).simulation_mode);
    }

    #[test]
    fn test_wrong_length_frames_change_nothing() {
        let mut dash = dashboard(&sim_config(), QueueBus::default());
        dash.start(0);
        let telemetry = *dash.telemetry();
        let config = *dash.config();
        let commits = dash.config_store().store().commit_count();

        for id in 0..=0x7FF {
            for len in [0usize, 3, 7] {
                let frame = RawFrame::new(id, &RPM_7200[..len]).unwrap();
                assert_eq!(dash.handle_frame(&frame, 5), DecodeOutcome::Ignored);
            }
        }
        assert_eq!(*dash.telemetry(), telemetry);
        assert_eq!(*dash.config(), config);
        assert_eq!(dash.config_store().store().commit_count(), commits);
        assert_eq!(dash.state(), ArbiterState::Simulation);
        assert_eq!(dash.stats().decoded, 0);
    }

    #[test]
    fn test_tick_drains_bounded_batch() {
        let mut bus = QueueBus::default();
        for _ in 0..40 {
            bus.frames.push_back(RawFrame::new(1001, &[0; 8]).unwrap());
        }
        let mut dash = dashboard(&Config::default(), bus);
        dash.start(0);
        dash.tick(10);
        assert_eq!(dash.stats().received, MAX_FRAMES_PER_TICK as u32);
        dash.tick(20);
        assert_eq!(dash.stats().received, 40);
        assert_eq!(dash.bus().frames.len(), 0);
    }

    #[test]
    fn test_init_failure_keeps_live_intent() {
        let bus = QueueBus {
            fail_init: true,
            ..QueueBus::default()
        };
        let mut dash = dashboard(&Config::default(), bus);
        assert_eq!(dash.start(0), ArbiterState::Simulation);
        assert!(!persisted(&dash).simulation_mode);

        // Simulator drives telemetry; the bus is never polled.
        assert!(dash.take_display_dirty());
        dash.tick(0);
        assert!(dash.take_display_dirty());
        assert_eq!(dash.bus().polls, 0);
    }

    #[test]
    fn test_stall_then_recovery_without_persisting() {
        let mut dash = dashboard(&Config::default(), QueueBus::default());
        dash.start(0);
        let commits = dash.config_store().store().commit_count();

        assert_eq!(dash.tick(4_000), ArbiterState::LiveBus);
        assert_eq!(dash.tick(5_000), ArbiterState::LiveBusStalled);
        let rpm_before = dash.telemetry().rpm;
        assert_eq!(dash.tick(6_000), ArbiterState::LiveBusStalled);
        // No simulator while stalled.
        assert_eq!(dash.telemetry().rpm, rpm_before);

        dash.bus_mut().frames.push_back(RawFrame::new(1000, &RPM_7200).unwrap());
        assert_eq!(dash.tick(7_000), ArbiterState::LiveBus);
        assert_eq!(dash.telemetry().rpm, 7200.0);
        assert_eq!(dash.telemetry().manifold_pressure, 100.0);
        assert_eq!(dash.telemetry().coolant_temp, 90.0);
        assert_eq!(dash.config_store().store().commit_count(), commits);
    }

    #[test]
    fn test_operator_actions_persist() {
        let mut dash = dashboard(&Config::default(), QueueBus::default());
        dash.start(0);

        dash.set_unit_system(UnitSystem::Imperial).unwrap();
        dash.set_protocol(Protocol::Oem(Revision::MultiFrame)).unwrap();
        dash.set_can_speed(CanSpeed::Kbps500, 10).unwrap();
        assert_eq!(dash.bus().inits, 2);
        assert_eq!(dash.set_base_can_id(4096), Err(ConfigError::BaseIdOutOfRange(4096)));
        dash.set_base_can_id(0x370).unwrap();

        let saved = persisted(&dash);
        assert_eq!(saved.unit_system, UnitSystem::Imperial);
        assert_eq!(saved.protocol, Protocol::Oem(Revision::MultiFrame));
        assert_eq!(saved.can_speed, CanSpeed::Kbps500);
        assert_eq!(saved.base_can_id, 0x370);
        assert_eq!(dash.units().temperature(100.0), 212.0);
    }

    #[test]
    fn test_select_simulation_then_live() {
        let mut dash = dashboard(&Config::default(), QueueBus::default());
        dash.start(0);
        dash.select_simulation().unwrap();
        assert!(persisted(&dash).simulation_mode);
        assert_eq!(dash.state(), ArbiterState::Simulation);

        // Bus is closed: queued frames stay queued.
        dash.bus_mut().frames.push_back(RawFrame::new(1000, &RPM_7200).unwrap());
        dash.tick(100);
        assert_eq!(dash.bus().frames.len(), 1);

        dash.select_live_bus(200).unwrap();
        assert!(!persisted(&dash).simulation_mode);
        dash.tick(210);
        assert_eq!(dash.state(), ArbiterState::LiveBus);
        assert_eq!(dash.telemetry().rpm, 7200.0);
    }

    #[test]
    fn test_temperature_after_simulation_blends_from_shown_value() {
        let mut dash = dashboard(&Config::default(), QueueBus::default());
        assert_eq!(dash.start(0), ArbiterState::LiveBus);
        for _ in 0..30 {
            dash.bus_mut().frames.push_back(temperature_frame(50.0));
        }
        dash.tick(10);
        assert!((dash.telemetry().coolant_temp - 50.0).abs() < 0.1);

        dash.select_simulation().unwrap();
        dash.tick(20);
        let shown = dash.telemetry().coolant_temp;
        assert!(shown >= 70.0);

        dash.select_live_bus(30).unwrap();
        dash.bus_mut().frames.push_back(temperature_frame(90.0));
        dash.tick(40);
        let expected = shown * 0.5 + 90.0 * 0.5;
        assert!((dash.telemetry().coolant_temp - expected).abs() < 0.1);
    }

    #[test]
    fn test_select_live_bus_reports_both_failures() {
        let bus = QueueBus {
            fail_init: true,
            ..QueueBus::default()
        };
        let mut dash = dashboard(&sim_config(), bus);
        dash.start(0);
        assert_eq!(dash.select_live_bus(5), Err(ActionError::Bus(BusError::NotPresent)));
        assert!(!persisted(&dash).simulation_mode);
        assert_eq!(dash.state(), ArbiterState::Simulation);
    }

    #[test]
    fn test_store_failure_surfaces_but_applies() {
        let mut dash = dashboard(&Config::default(), QueueBus::default());
        dash.start(0);
        let mut store = dash.config_store().store().clone();
        store.begin(NAMESPACE, true).unwrap();
        let mut jammed = Dashboard::new(QueueBus::default(), store);
        assert_eq!(
            jammed.set_unit_system(UnitSystem::Imperial),
            Err(ConfigError::Store(StoreError::Busy))
        );
        assert_eq!(jammed.config().unit_system, UnitSystem::Imperial);
    }

    #[test]
    fn test_refresh_cadence() {
        let mut dash = dashboard(&Config::default(), QueueBus::default());
        dash.start(0);
        assert!(dash.needs_refresh(0));
        assert!(!dash.needs_refresh(50));
        assert!(dash.needs_refresh(100));
        dash.apply_acceleration(0.0, 9.81);
        assert!(dash.needs_refresh(110));
        assert!(dash.telemetry().g_force_longitudinal > 0.0);
    }
}
