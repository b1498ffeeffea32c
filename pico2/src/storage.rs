//! Flash-backed [`KeyValueStore`].
//!
//! Entries live in a [`MemoryStore`]; every committed write session is
//! serialized with [`crate::image`] into the older of two flash sectors, so
//! the newest valid image always survives a reset during a save.

use ecu_dash_common::config::{KeyValueStore, MemoryStore, StoreError, StoredValue};

use crate::image::{self, HEADER_LEN};

/// Flash erase granularity on the RP2350.
pub const SECTOR_SIZE: usize = 4096;

/// Sector-level access to a reserved flash region.
pub trait SectorFlash {
    /// Number of sectors in the region. The store uses the first two.
    fn sector_count(&self) -> usize;

    fn read(
        &mut self,
        sector: usize,
        buf: &mut [u8; SECTOR_SIZE],
    ) -> Result<(), StoreError>;

    /// Erase then program one sector.
    fn write(
        &mut self,
        sector: usize,
        data: &[u8; SECTOR_SIZE],
    ) -> Result<(), StoreError>;
}

/// How the store came up.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub enum Mount {
    /// Image found in `slot`.
    Restored { slot: usize, sequence: u32 },
    /// No valid image (first boot or both sectors corrupt).
    Blank,
}

pub struct FlashStore<F> {
    flash: F,
    entries: MemoryStore,
    /// Slot holding the current image, if any.
    active: Option<usize>,
    sequence: u32,
    persisted_commits: u32,
    scratch: [u8; SECTOR_SIZE],
}

impl<F: SectorFlash> FlashStore<F> {
    /// Read both sectors and keep the newest valid image.
    pub fn mount(mut flash: F) -> Result<(Self, Mount), StoreError> {
        if flash.sector_count() < 2 {
            return Err(StoreError::Io);
        }
        let mut scratch = [0u8; SECTOR_SIZE];
        let mut sequences = [None, None];
        for (slot, seq) in sequences.iter_mut().enumerate() {
            flash.read(slot, &mut scratch)?;
            *seq = image::read_header(&scratch).ok().map(|h| h.sequence);
        }

        let mut store = Self {
            flash,
            entries: MemoryStore::new(),
            active: None,
            sequence: 0,
            persisted_commits: 0,
            scratch,
        };
        // A newer image that fails to decode falls back to the other slot.
        let mut order = [0usize, 1];
        if image::newest(sequences) == Some(1) {
            order.swap(0, 1);
        }
        for slot in order {
            if sequences[slot].is_none() {
                continue;
            }
            store.flash.read(slot, &mut store.scratch)?;
            if let Ok((entries, header)) = image::decode(&store.scratch) {
                store.entries = entries;
                store.active = Some(slot);
                store.sequence = header.sequence;
                store.persisted_commits = store.entries.commit_count();
                return Ok((
                    store,
                    Mount::Restored {
                        slot,
                        sequence: header.sequence,
                    },
                ));
            }
        }
        Ok((store, Mount::Blank))
    }

    /// Sequence number of the last image written or restored.
    pub const fn sequence(&self) -> u32 { self.sequence }

    pub const fn active_slot(&self) -> Option<usize> { self.active }

    pub fn flash(&self) -> &F { &self.flash }

    /// Write the committed entries to the inactive sector.
    fn persist(&mut self) -> Result<(), StoreError> {
        let next = self.sequence.wrapping_add(1);
        self.scratch.fill(0xFF);
        let len = image::encode(&self.entries, next, &mut self.scratch).map_err(|_| StoreError::Full)?;
        debug_assert!(len >= HEADER_LEN);

        let target = match self.active {
            Some(slot) => 1 - slot,
            None => 0,
        };
        self.flash.write(target, &self.scratch)?;
        self.active = Some(target);
        self.sequence = next;
        self.persisted_commits = self.entries.commit_count();
        Ok(())
    }
}

impl<F: SectorFlash> KeyValueStore for FlashStore<F> {
    fn begin(
        &mut self,
        namespace: &str,
        read_only: bool,
    ) -> Result<(), StoreError> {
        self.entries.begin(namespace, read_only)
    }

    fn end(&mut self) -> Result<(), StoreError> {
        self.entries.end()?;
        if image::has_new_commits(&self.entries, self.persisted_commits) {
            self.persist()?;
        }
        Ok(())
    }

    fn abort(&mut self) { self.entries.abort(); }

    fn contains_key(
        &self,
        key: &str,
    ) -> bool {
        self.entries.contains_key(key)
    }

    fn get(
        &self,
        key: &str,
    ) -> Option<StoredValue> {
        self.entries.get(key)
    }

    fn put(
        &mut self,
        key: &str,
        value: StoredValue,
    ) -> Result<(), StoreError> {
        self.entries.put(key, value)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::boxed::Box;
    use std::vec;
    use std::vec::Vec;

    use ecu_dash_common::config::{ConfigStore, keys};
    use ecu_dash_common::{Config, UnitSystem};

    use super::*;

    /// RAM stand-in for the reserved flash region.
    struct RamFlash {
        sectors: Vec<Box<[u8; SECTOR_SIZE]>>,
        writes: Vec<usize>,
        fail_writes: bool,
    }

    impl RamFlash {
        fn erased() -> Self {
            Self {
                sectors: vec![Box::new([0xFF; SECTOR_SIZE]), Box::new([0xFF; SECTOR_SIZE])],
                writes: Vec::new(),
                fail_writes: false,
            }
        }
    }

    impl SectorFlash for RamFlash {
        fn sector_count(&self) -> usize { self.sectors.len() }

        fn read(
            &mut self,
            sector: usize,
            buf: &mut [u8; SECTOR_SIZE],
        ) -> Result<(), StoreError> {
            buf.copy_from_slice(&self.sectors[sector][..]);
            Ok(())
        }

        fn write(
            &mut self,
            sector: usize,
            data: &[u8; SECTOR_SIZE],
        ) -> Result<(), StoreError> {
            if self.fail_writes {
                return Err(StoreError::Io);
            }
            self.sectors[sector].copy_from_slice(data);
            self.writes.push(sector);
            Ok(())
        }
    }

    fn save_units(
        store: FlashStore<RamFlash>,
        units: UnitSystem,
    ) -> FlashStore<RamFlash> {
        let mut config_store = ConfigStore::new(store);
        let mut config = Config::new();
        config.unit_system = units;
        config_store.save(&config).unwrap();
        config_store.into_inner()
    }

    #[test]
    fn test_blank_flash_mounts_empty() {
        let (store, mount) = FlashStore::mount(RamFlash::erased()).unwrap();
        assert_eq!(mount, Mount::Blank);
        assert_eq!(store.active_slot(), None);
    }

    #[test]
    fn test_saves_alternate_sectors() {
        let (store, _) = FlashStore::mount(RamFlash::erased()).unwrap();
        let store = save_units(store, UnitSystem::Imperial);
        let store = save_units(store, UnitSystem::Metric);
        let store = save_units(store, UnitSystem::Imperial);
        assert_eq!(store.flash().writes, [0, 1, 0]);
        assert_eq!(store.sequence(), 3);
    }

    #[test]
    fn test_config_survives_remount() {
        let (store, _) = FlashStore::mount(RamFlash::erased()).unwrap();
        let store = save_units(store, UnitSystem::Imperial);
        let flash = store.flash;

        let (store, mount) = FlashStore::mount(flash).unwrap();
        assert_eq!(mount, Mount::Restored { slot: 0, sequence: 1 });
        let mut config_store = ConfigStore::new(store);
        assert_eq!(config_store.load().unit_system, UnitSystem::Imperial);
    }

    #[test]
    fn test_torn_write_falls_back_to_previous_image() {
        let (store, _) = FlashStore::mount(RamFlash::erased()).unwrap();
        let store = save_units(store, UnitSystem::Imperial);
        let store = save_units(store, UnitSystem::Metric);
        let mut flash = store.flash;
        // Reset halfway through programming sector 1.
        flash.sectors[1][HEADER_LEN + 4..].fill(0xFF);

        let (store, mount) = FlashStore::mount(flash).unwrap();
        assert_eq!(mount, Mount::Restored { slot: 0, sequence: 1 });
        let mut config_store = ConfigStore::new(store);
        assert_eq!(config_store.load().unit_system, UnitSystem::Imperial);
    }

    #[test]
    fn test_read_only_sessions_do_not_write() {
        let (mut store, _) = FlashStore::mount(RamFlash::erased()).unwrap();
        store.begin("dashboard", true).unwrap();
        assert!(!store.contains_key(keys::UNITS));
        store.end().unwrap();
        assert!(store.flash().writes.is_empty());
    }

    #[test]
    fn test_flash_failure_is_reported() {
        let mut flash = RamFlash::erased();
        flash.fail_writes = true;
        let (store, _) = FlashStore::mount(flash).unwrap();
        let mut config_store = ConfigStore::new(store);
        assert_eq!(config_store.save(&Config::new()), Err(StoreError::Io));
    }

    #[test]
    fn test_region_too_small() {
        let mut flash = RamFlash::erased();
        flash.sectors.truncate(1);
        assert!(matches!(FlashStore::mount(flash), Err(StoreError::Io)));
    }
}
