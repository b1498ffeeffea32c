//! Telemetry source arbitration: live bus or simulator.
//!
//! ```text
//!                 sim flag set / init failed
//!  Uninitialized ─────────────────────────────▶ Simulation
//!       │                                          │
//!       │ init ok                  primary frame   │ (flag cleared and
//!       ▼                       ◀──────────────────┘  persisted once)
//!    LiveBus ──── no primary frame for deadline ───▶ LiveBusStalled
//!       ▲                                              │
//!       └──────────────── primary frame ───────────────┘
//! ```
//!
//! The arbiter owns no hardware. The caller passes the bus driver and the
//! configuration in, and persists the configuration when a transition says
//! so.

use crate::bus::{BusDriver, BusError};
use crate::config::Config;

/// Time without a primary frame before the bus counts as stalled.
pub const STALL_DEADLINE_MS: u64 = 5_000;

/// Driver poll timeout per frame.
pub const POLL_TIMEOUT_MS: u32 = 1;

/// Frames drained per tick at most; matches the receive queue depth so a
/// flooded bus cannot starve the rest of the loop.
pub const MAX_FRAMES_PER_TICK: usize = 32;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ArbiterState {
    #[default]
    Uninitialized,
    LiveBus,
    Simulation,
    /// Live mode, but the engine controller has gone quiet. Telemetry keeps
    /// its last values; nothing is persisted.
    LiveBusStalled,
}

impl ArbiterState {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Uninitialized => "INIT",
            Self::LiveBus => "LIVE",
            Self::Simulation => "SIM",
            Self::LiveBusStalled => "STALLED",
        }
    }
}

/// What an arbiter event changed.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Transition {
    None,
    /// Simulation handed over to the live bus and the simulation flag was
    /// cleared. The caller must persist the configuration.
    Promoted,
    Stalled,
    Recovered,
}

impl Transition {
    #[inline]
    pub const fn needs_save(self) -> bool { matches!(self, Self::Promoted) }
}

#[derive(Debug)]
pub struct ModeArbiter {
    state: ArbiterState,
    bus_open: bool,
    /// Set once simulation has been handed over for this bus acquisition.
    promoted: bool,
    last_primary_ms: u64,
    stall_deadline_ms: u64,
}

impl Default for ModeArbiter {
    fn default() -> Self { Self::new() }
}

impl ModeArbiter {
    pub const fn new() -> Self { Self::with_stall_deadline(STALL_DEADLINE_MS) }

    pub const fn with_stall_deadline(stall_deadline_ms: u64) -> Self {
        Self {
            state: ArbiterState::Uninitialized,
            bus_open: false,
            promoted: false,
            last_primary_ms: 0,
            stall_deadline_ms,
        }
    }

    #[inline]
    pub const fn state(&self) -> ArbiterState { self.state }

    /// Whether the bus driver should be polled this tick.
    #[inline]
    pub const fn bus_open(&self) -> bool { self.bus_open }

    /// Whether the simulator feeds telemetry this tick.
    #[inline]
    pub const fn is_simulating(&self) -> bool { matches!(self.state, ArbiterState::Simulation) }

    /// Timestamp of the last primary frame (or of entering live mode).
    #[inline]
    pub const fn last_primary_ms(&self) -> u64 { self.last_primary_ms }

    /// Pick the initial source.
    ///
    /// The bus is brought up even when the simulation flag is set so the
    /// dashboard can promote itself the moment the engine controller is
    /// heard. A failed bring-up falls back to simulation but leaves the
    /// flag alone, so the next boot retries the bus.
    pub fn start<B: BusDriver>(
        &mut self,
        config: &Config,
        bus: &mut B,
        now_ms: u64,
    ) -> ArbiterState {
        if self.state != ArbiterState::Uninitialized {
            return self.state;
        }

        let bus_result = self.bring_up(config, bus, now_ms);
        self.state = match (config.simulation_mode, bus_result) {
            (true, _) => {
                info!("arbiter: simulation mode, bus open={}", self.bus_open);
                ArbiterState::Simulation
            }
            (false, Ok(())) => {
                info!("arbiter: live bus at {}", config.can_speed.name());
                ArbiterState::LiveBus
            }
            (false, Err(err)) => {
                warn!("arbiter: bus init failed ({}), simulating", err);
                ArbiterState::Simulation
            }
        };
        self.state
    }

    /// Account for a decoded primary frame.
    ///
    /// While simulating, the first primary frame clears the simulation flag
    /// and asks the caller to persist it. Further frames never ask again.
    pub fn on_primary_frame(
        &mut self,
        config: &mut Config,
        now_ms: u64,
    ) -> Transition {
        self.last_primary_ms = now_ms;

        match self.state {
            ArbiterState::Simulation => {
                self.state = ArbiterState::LiveBus;
                if config.simulation_mode && !self.promoted {
                    self.promoted = true;
                    config.simulation_mode = false;
                    info!("arbiter: engine controller detected, leaving simulation");
                    return Transition::Promoted;
                }
                Transition::None
            }
            ArbiterState::LiveBusStalled => {
                self.state = ArbiterState::LiveBus;
                info!("arbiter: bus traffic resumed");
                Transition::Recovered
            }
            ArbiterState::Uninitialized | ArbiterState::LiveBus => Transition::None,
        }
    }

    /// Flag a stall once the deadline passes without a primary frame.
    pub fn check_stall(
        &mut self,
        now_ms: u64,
    ) -> Transition {
        if self.state == ArbiterState::LiveBus && now_ms.saturating_sub(self.last_primary_ms) >= self.stall_deadline_ms {
            self.state = ArbiterState::LiveBusStalled;
            warn!("arbiter: no engine frames for {} ms", now_ms.saturating_sub(self.last_primary_ms));
            return Transition::Stalled;
        }
        Transition::None
    }

    /// Operator asked for the live bus. Clears the simulation flag and
    /// re-initialises the bus; the caller persists the configuration either
    /// way.
    pub fn select_live_bus<B: BusDriver>(
        &mut self,
        config: &mut Config,
        bus: &mut B,
        now_ms: u64,
    ) -> Result<(), BusError> {
        config.simulation_mode = false;
        match self.bring_up(config, bus, now_ms) {
            Ok(()) => {
                self.state = ArbiterState::LiveBus;
                info!("arbiter: live bus selected");
                Ok(())
            }
            Err(err) => {
                self.state = ArbiterState::Simulation;
                warn!("arbiter: bus init failed ({}), simulating", err);
                Err(err)
            }
        }
    }

    /// Operator asked for simulated telemetry. The bus is closed so live
    /// traffic cannot promote the dashboard straight back.
    pub fn select_simulation<B: BusDriver>(
        &mut self,
        config: &mut Config,
        bus: &mut B,
    ) {
        config.simulation_mode = true;
        if self.bus_open {
            bus.shutdown();
            self.bus_open = false;
        }
        self.promoted = false;
        self.state = ArbiterState::Simulation;
        info!("arbiter: simulation selected");
    }

    /// Apply a new bit rate. Only re-initialises when the bus is in use.
    pub fn apply_speed<B: BusDriver>(
        &mut self,
        config: &Config,
        bus: &mut B,
        now_ms: u64,
    ) -> Result<(), BusError> {
        if !self.bus_open {
            return Ok(());
        }
        match self.bring_up(config, bus, now_ms) {
            Ok(()) => Ok(()),
            Err(err) => {
                self.state = ArbiterState::Simulation;
                warn!("arbiter: bus re-init at {} failed ({})", config.can_speed.name(), err);
                Err(err)
            }
        }
    }

    fn bring_up<B: BusDriver>(
        &mut self,
        config: &Config,
        bus: &mut B,
        now_ms: u64,
    ) -> Result<(), BusError> {
        match bus.initialize(config.can_speed) {
            Ok(()) => {
                self.bus_open = true;
                self.promoted = false;
                self.last_primary_ms = now_ms;
                Ok(())
            }
            Err(err) => {
                self.bus_open = false;
                Err(err)
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CanSpeed;
    use crate::frame::RawFrame;

    #[derive(Default)]
    struct ScriptedBus {
        fail_init: bool,
        inits: u32,
        shutdowns: u32,
        last_speed: Option<CanSpeed>,
    }

    impl BusDriver for ScriptedBus {
        fn initialize(
            &mut self,
            speed: CanSpeed,
        ) -> Result<(), BusError> {
            self.inits += 1;
            self.last_speed = Some(speed);
            if self.fail_init { Err(BusError::NotPresent) } else { Ok(()) }
        }

        fn poll_frame(
            &mut self,
            _timeout_ms: u32,
        ) -> Option<RawFrame> {
            None
        }

        fn shutdown(&mut self) { self.shutdowns += 1; }
    }

    fn sim_config() -> Config {
        Config {
            simulation_mode: true,
            ..Config::default()
        }
    }

    #[test]
    fn test_start_live() {
        let mut arbiter = ModeArbiter::new();
        let mut bus = ScriptedBus::default();
        assert_eq!(arbiter.start(&Config::default(), &mut bus, 0), ArbiterState::LiveBus);
        assert!(arbiter.bus_open());
        assert_eq!(bus.last_speed, Some(CanSpeed::Mbps1));
        // A second start is a no-op.
        arbiter.start(&Config::default(), &mut bus, 0);
        assert_eq!(bus.inits, 1);
    }

    #[test]
    fn test_start_simulation_keeps_bus_open() {
        let mut arbiter = ModeArbiter::new();
        let mut bus = ScriptedBus::default();
        assert_eq!(arbiter.start(&sim_config(), &mut bus, 0), ArbiterState::Simulation);
        assert!(arbiter.bus_open());
        assert!(arbiter.is_simulating());
    }

    #[test]
    fn test_init_failure_falls_back_without_touching_flag() {
        let mut arbiter = ModeArbiter::new();
        let mut bus = ScriptedBus {
            fail_init: true,
            ..ScriptedBus::default()
        };
        let config = Config::default();
        assert_eq!(arbiter.start(&config, &mut bus, 0), ArbiterState::Simulation);
        assert!(!arbiter.bus_open());
        assert!(!config.simulation_mode);
    }

    #[test]
    fn test_promotion_happens_once() {
        let mut arbiter = ModeArbiter::new();
        let mut bus = ScriptedBus::default();
        let mut config = sim_config();
        arbiter.start(&config, &mut bus, 0);

        assert_eq!(arbiter.on_primary_frame(&mut config, 100), Transition::Promoted);
        assert!(!config.simulation_mode);
        assert_eq!(arbiter.state(), ArbiterState::LiveBus);
        assert_eq!(arbiter.on_primary_frame(&mut config, 120), Transition::None);
        assert_eq!(arbiter.on_primary_frame(&mut config, 140), Transition::None);
    }

    #[test]
    fn test_stall_and_recovery() {
        let mut arbiter = ModeArbiter::new();
        let mut bus = ScriptedBus::default();
        let mut config = Config::default();
        arbiter.start(&config, &mut bus, 1_000);

        assert_eq!(arbiter.check_stall(1_000 + STALL_DEADLINE_MS - 1), Transition::None);
        assert_eq!(arbiter.check_stall(1_000 + STALL_DEADLINE_MS), Transition::Stalled);
        assert_eq!(arbiter.state(), ArbiterState::LiveBusStalled);
        assert_eq!(arbiter.check_stall(1_000 + STALL_DEADLINE_MS + 500), Transition::None);

        let before = config;
        assert_eq!(arbiter.on_primary_frame(&mut config, 9_000), Transition::Recovered);
        assert_eq!(arbiter.state(), ArbiterState::LiveBus);
        assert_eq!(config, before);
        assert_eq!(arbiter.check_stall(9_000 + STALL_DEADLINE_MS - 1), Transition::None);
    }

    #[test]
    fn test_frames_hold_off_stall() {
        let mut arbiter = ModeArbiter::with_stall_deadline(100);
        let mut bus = ScriptedBus::default();
        let mut config = Config::default();
        arbiter.start(&config, &mut bus, 0);
        for now in (0..1_000).step_by(50) {
            arbiter.on_primary_frame(&mut config, now);
            assert_eq!(arbiter.check_stall(now + 20), Transition::None);
        }
    }

    #[test]
    fn test_simulation_never_stalls() {
        let mut arbiter = ModeArbiter::new();
        let mut bus = ScriptedBus::default();
        arbiter.start(&sim_config(), &mut bus, 0);
        assert_eq!(arbiter.check_stall(60_000), Transition::None);
        assert_eq!(arbiter.state(), ArbiterState::Simulation);
    }

    #[test]
    fn test_operator_mode_switches() {
        let mut arbiter = ModeArbiter::new();
        let mut bus = ScriptedBus::default();
        let mut config = Config::default();
        arbiter.start(&config, &mut bus, 0);

        arbiter.select_simulation(&mut config, &mut bus);
        assert!(config.simulation_mode);
        assert!(!arbiter.bus_open());
        assert_eq!(bus.shutdowns, 1);
        assert_eq!(arbiter.state(), ArbiterState::Simulation);

        assert_eq!(arbiter.select_live_bus(&mut config, &mut bus, 10), Ok(()));
        assert!(!config.simulation_mode);
        assert_eq!(arbiter.state(), ArbiterState::LiveBus);
        assert_eq!(bus.inits, 2);

        bus.fail_init = true;
        assert_eq!(arbiter.select_live_bus(&mut config, &mut bus, 20), Err(BusError::NotPresent));
        assert_eq!(arbiter.state(), ArbiterState::Simulation);
        assert!(!config.simulation_mode);
    }

    #[test]
    fn test_speed_change_reinitialises_open_bus_only() {
        let mut arbiter = ModeArbiter::new();
        let mut bus = ScriptedBus::default();
        let mut config = Config::default();
        arbiter.start(&config, &mut bus, 0);

        config.can_speed = CanSpeed::Kbps500;
        assert_eq!(arbiter.apply_speed(&config, &mut bus, 5), Ok(()));
        assert_eq!(bus.last_speed, Some(CanSpeed::Kbps500));
        assert_eq!(bus.inits, 2);

        arbiter.select_simulation(&mut config, &mut bus);
        config.can_speed = CanSpeed::Kbps250;
        assert_eq!(arbiter.apply_speed(&config, &mut bus, 10), Ok(()));
        assert_eq!(bus.inits, 2);
    }
}
