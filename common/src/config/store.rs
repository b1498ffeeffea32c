//! Key-value persistence contract and the configuration schema on top of it.

use core::fmt;

use heapless::String;

use super::{
    CanSpeed, Config, DEFAULT_BASE_CAN_ID, LEGACY_OEM_CAN_ID, LogDetail, LogMode, LoggingPolicy, NAMESPACE, Rotation,
    keys,
};
use crate::protocol::{Protocol, Revision};
use crate::units::UnitSystem;

/// Longest key or namespace the store accepts.
pub const MAX_KEY_LEN: usize = 15;

/// Longest string value the store accepts.
pub const MAX_STR_LEN: usize = 32;

// =============================================================================
// Errors
// =============================================================================

/// Persistence failure.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreError {
    /// A session is already open.
    Busy,
    /// No session open.
    NotOpen,
    /// Write attempted in a read-only session.
    ReadOnly,
    /// No room for another entry, or a key or value is too long.
    Full,
    /// Backing medium failed.
    Io,
}

impl fmt::Display for StoreError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let text = match self {
            Self::Busy => "session already open",
            Self::NotOpen => "no session open",
            Self::ReadOnly => "session is read-only",
            Self::Full => "store full",
            Self::Io => "storage I/O failure",
        };
        f.write_str(text)
    }
}

// =============================================================================
// Store Contract
// =============================================================================

/// A typed stored value.
#[derive(Clone, Debug, PartialEq)]
pub enum StoredValue {
    U32(u32),
    Bool(bool),
    F32(f32),
    Str(String<MAX_STR_LEN>),
}

impl StoredValue {
    /// Build a string value, failing if it does not fit.
    pub fn text(value: &str) -> Result<Self, StoreError> {
        String::try_from(value).map(Self::Str).map_err(|_| StoreError::Full)
    }
}

/// Namespaced key-value storage with explicit sessions.
///
/// Writes made between `begin(_, false)` and `end()` become visible to the
/// next session atomically at `end()`; `abort()` throws them away. A reset
/// before `end()` must leave the previous contents intact.
pub trait KeyValueStore {
    /// Open a session on `namespace`.
    fn begin(
        &mut self,
        namespace: &str,
        read_only: bool,
    ) -> Result<(), StoreError>;

    /// Close the session, committing staged writes.
    fn end(&mut self) -> Result<(), StoreError>;

    /// Close the session, discarding staged writes.
    fn abort(&mut self);

    fn contains_key(
        &self,
        key: &str,
    ) -> bool;

    fn get(
        &self,
        key: &str,
    ) -> Option<StoredValue>;

    fn put(
        &mut self,
        key: &str,
        value: StoredValue,
    ) -> Result<(), StoreError>;

    fn get_u32(
        &self,
        key: &str,
    ) -> Option<u32> {
        match self.get(key) {
            Some(StoredValue::U32(v)) => Some(v),
            _ => None,
        }
    }

    fn get_bool(
        &self,
        key: &str,
    ) -> Option<bool> {
        match self.get(key) {
            Some(StoredValue::Bool(v)) => Some(v),
            _ => None,
        }
    }

    fn get_f32(
        &self,
        key: &str,
    ) -> Option<f32> {
        match self.get(key) {
            Some(StoredValue::F32(v)) => Some(v),
            _ => None,
        }
    }

    fn put_u32(
        &mut self,
        key: &str,
        value: u32,
    ) -> Result<(), StoreError> {
        self.put(key, StoredValue::U32(value))
    }

    fn put_bool(
        &mut self,
        key: &str,
        value: bool,
    ) -> Result<(), StoreError> {
        self.put(key, StoredValue::Bool(value))
    }
}

// =============================================================================
// Config Schema
// =============================================================================

/// What loading found.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LoadReport {
    pub config: Config,
    /// At least one current key was missing and had to be derived.
    pub migrated: bool,
}

/// Loads and saves [`Config`] through a [`KeyValueStore`].
pub struct ConfigStore<S> {
    store: S,
    saves: u32,
}

impl<S: KeyValueStore> ConfigStore<S> {
    pub const fn new(store: S) -> Self { Self { store, saves: 0 } }

    pub fn store(&self) -> &S { &self.store }

    pub fn store_mut(&mut self) -> &mut S { &mut self.store }

    pub fn into_inner(self) -> S { self.store }

    /// Successful saves since construction.
    pub const fn save_count(&self) -> u32 { self.saves }

    /// Load the persisted configuration.
    ///
    /// Never fails: an unreadable store yields first-boot defaults. A record
    /// written by older firmware is migrated and written back so the next
    /// boot reads current keys.
    pub fn load(&mut self) -> Config {
        let report = match self.read() {
            Ok(report) => report,
            Err(err) => {
                warn!("config: store unreadable ({}), using defaults", err);
                return Config::new();
            }
        };

        if report.migrated {
            info!("config: migrated legacy keys");
            if let Err(err) = self.save(&report.config) {
                warn!("config: write-back after migration failed: {}", err);
            }
        }
        debug!(
            "config: base={} speed={} sim={}",
            report.config.base_can_id,
            report.config.can_speed.name(),
            report.config.simulation_mode
        );
        report.config
    }

    /// Read the record without writing anything back.
    pub fn read(&mut self) -> Result<LoadReport, StoreError> {
        self.store.begin(NAMESPACE, true)?;
        let report = decode(&self.store);
        self.store.end()?;
        Ok(report)
    }

    /// Persist every field in one transaction.
    pub fn save(
        &mut self,
        config: &Config,
    ) -> Result<(), StoreError> {
        self.store.begin(NAMESPACE, false)?;
        if let Err(err) = encode(&mut self.store, config) {
            self.store.abort();
            warn!("config: save aborted: {}", err);
            return Err(err);
        }
        self.store.end()?;
        self.saves = self.saves.wrapping_add(1);
        Ok(())
    }
}

fn decode<S: KeyValueStore>(store: &S) -> LoadReport {
    let mut migrated = false;

    let unit_system = match store.get_u32(keys::UNITS) {
        Some(raw) => UnitSystem::from_raw(raw).unwrap_or_default(),
        None => {
            migrated = true;
            let any_imperial = [keys::LEGACY_FAHRENHEIT, keys::LEGACY_PSI, keys::LEGACY_MPH]
                .iter()
                .any(|key| store.get_bool(key).unwrap_or(false));
            if any_imperial { UnitSystem::Imperial } else { UnitSystem::Metric }
        }
    };

    let base_can_id = match store.get_u32(keys::BASE_CAN_ID) {
        Some(id) if Config::is_valid_base_id(id) => id,
        Some(_) => DEFAULT_BASE_CAN_ID,
        None => {
            migrated = true;
            match store.get_u32(keys::LEGACY_CAN_ID) {
                Some(LEGACY_OEM_CAN_ID) => LEGACY_OEM_CAN_ID,
                _ => DEFAULT_BASE_CAN_ID,
            }
        }
    };

    let can_speed = store.get_u32(keys::CAN_SPEED).and_then(CanSpeed::from_raw).unwrap_or_default();
    let simulation_mode = store.get_bool(keys::SIMULATION).unwrap_or(false);

    let protocol = Protocol::from_raw(
        store.get_u32(keys::PROTOCOL).unwrap_or(0),
        store.get_u32(keys::REVISION).unwrap_or(Revision::Packed.as_raw()),
    )
    .unwrap_or_default();

    let logging = LoggingPolicy {
        mode: store.get_u32(keys::LOG_MODE).and_then(LogMode::from_raw).unwrap_or_default(),
        detail: store.get_u32(keys::LOG_DETAIL).and_then(LogDetail::from_raw).unwrap_or_default(),
        buffer_kb: store
            .get_u32(keys::LOG_BUFFER_KB)
            .map_or(LoggingPolicy::new().buffer_kb, |kb| kb.min(u32::from(u16::MAX)) as u16),
        rotation: store.get_u32(keys::LOG_ROTATION).and_then(Rotation::from_raw).unwrap_or_default(),
    }
    .clamped();

    LoadReport {
        config: Config {
            base_can_id,
            can_speed,
            unit_system,
            simulation_mode,
            protocol,
            logging,
        },
        migrated,
    }
}

fn encode<S: KeyValueStore>(
    store: &mut S,
    config: &Config,
) -> Result<(), StoreError> {
    let imperial = config.unit_system.is_imperial();
    let logging = config.logging.clamped();

    store.put_u32(keys::BASE_CAN_ID, config.base_can_id)?;
    store.put_u32(keys::CAN_SPEED, config.can_speed.as_raw())?;
    store.put_u32(keys::UNITS, config.unit_system.as_raw())?;
    store.put_bool(keys::LEGACY_FAHRENHEIT, imperial)?;
    store.put_bool(keys::LEGACY_PSI, imperial)?;
    store.put_bool(keys::LEGACY_MPH, imperial)?;
    store.put_bool(keys::SIMULATION, config.simulation_mode)?;
    store.put_u32(keys::PROTOCOL, config.protocol.variant_raw())?;
    store.put_u32(keys::REVISION, config.protocol.revision_raw())?;
    store.put_u32(keys::LOG_MODE, logging.mode.as_raw())?;
    store.put_u32(keys::LOG_DETAIL, logging.detail.as_raw())?;
    store.put_u32(keys::LOG_BUFFER_KB, u32::from(logging.buffer_kb))?;
    store.put_u32(keys::LOG_ROTATION, logging.rotation.as_raw())?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
