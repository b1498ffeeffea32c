//! Reserved flash region for the configuration store.
//!
//! The last two 4 KiB sectors of the Pico 2's 4 MiB flash, well above the
//! end of the program image.

use ecu_dash_common::StoreError;
use ecu_dash_pico2::storage::{SECTOR_SIZE, SectorFlash};
use embassy_rp::flash::{Blocking, ERASE_SIZE, Flash};
use embassy_rp::peripherals::FLASH;

pub const FLASH_SIZE: usize = 4 * 1024 * 1024;

const REGION_SECTORS: usize = 2;

const REGION_START: u32 = (FLASH_SIZE - REGION_SECTORS * SECTOR_SIZE) as u32;

const _: () = assert!(ERASE_SIZE == SECTOR_SIZE);

pub struct ConfigRegion<'d> {
    flash: Flash<'d, FLASH, Blocking, FLASH_SIZE>,
}

impl<'d> ConfigRegion<'d> {
    pub fn new(flash: Flash<'d, FLASH, Blocking, FLASH_SIZE>) -> Self { Self { flash } }

    const fn offset(sector: usize) -> u32 { REGION_START + (sector * SECTOR_SIZE) as u32 }
}

impl SectorFlash for ConfigRegion<'_> {
    fn sector_count(&self) -> usize { REGION_SECTORS }

    fn read(
        &mut self,
        sector: usize,
        buf: &mut [u8; SECTOR_SIZE],
    ) -> Result<(), StoreError> {
        self.flash
            .blocking_read(Self::offset(sector), buf)
            .map_err(|_| StoreError::Io)
    }

    fn write(
        &mut self,
        sector: usize,
        data: &[u8; SECTOR_SIZE],
    ) -> Result<(), StoreError> {
        let start = Self::offset(sector);
        self.flash
            .blocking_erase(start, start + SECTOR_SIZE as u32)
            .map_err(|_| StoreError::Io)?;
        self.flash.blocking_write(start, data).map_err(|_| StoreError::Io)
    }
}
