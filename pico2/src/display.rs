//! Dashboard panel bring-up.
//!
//! The PIM715 pack carries a 240x320 ST7789 mounted portrait. The dashboard
//! screens are laid out landscape, so the panel is driven rotated a quarter
//! turn and its native size comes from the screen layout.
//!
//! Wiring: CS=GPIO17, DC=GPIO16, SCK=GPIO18, MOSI=GPIO19 on SPI0, backlight
//! on GPIO20. The panel reset line follows the board's RUN pin.

use ecu_dash_pico2::colors::BLACK;
use ecu_dash_pico2::screens::{SCREEN_HEIGHT, SCREEN_WIDTH};
use embassy_rp::gpio::Output;
use embassy_rp::peripherals::SPI0;
use embassy_rp::spi::{Blocking, Config as SpiConfig, Spi};
use embedded_graphics::prelude::*;
use embedded_hal_bus::spi::{ExclusiveDevice, NoDelay};
use mipidsi::interface::SpiInterface;
use mipidsi::models::ST7789;
use mipidsi::options::{ColorInversion, Orientation, Rotation};
use mipidsi::{Builder, NoResetPin};

/// Panel width in its own (portrait) orientation.
pub const PANEL_WIDTH: u16 = SCREEN_HEIGHT as u16;

/// Panel height in its own (portrait) orientation.
pub const PANEL_HEIGHT: u16 = SCREEN_WIDTH as u16;

/// Quarter turn from the panel's portrait scan to the landscape layout.
pub const ROTATION: Rotation = Rotation::Deg90;

/// SCK rate. The ST7789 write cycle tops out near 62.5 MHz.
pub const SPI_FREQUENCY_HZ: u32 = 40_000_000;

/// Pixel bytes batched per SPI transfer. A full gauge row at RGB565 is
/// larger, so redraws stream in chunks of this size.
pub const SPI_BUFFER_LEN: usize = 512;

type PanelSpi<'d> = ExclusiveDevice<Spi<'d, SPI0, Blocking>, Output<'d>, NoDelay>;

/// The dashboard's draw target.
pub type DashDisplay<'d> = mipidsi::Display<SpiInterface<'d, PanelSpi<'d>, Output<'d>>, ST7789, NoResetPin>;

/// SPI0 settings for the panel.
pub fn spi_config() -> SpiConfig {
    let mut config = SpiConfig::default();
    config.frequency = SPI_FREQUENCY_HZ;
    config
}

/// Initialise the panel, light the backlight and clear to black.
///
/// Panics if the controller does not accept the init sequence; there is
/// nothing to show without it.
pub fn bring_up<'d>(
    spi: Spi<'d, SPI0, Blocking>,
    cs: Output<'d>,
    dc: Output<'d>,
    backlight: &mut Output<'d>,
    buffer: &'d mut [u8],
) -> DashDisplay<'d> {
    let device = match ExclusiveDevice::new_no_delay(spi, cs) {
        Ok(device) => device,
        Err(never) => match never {},
    };
    let interface = SpiInterface::new(device, dc, buffer);

    let mut display = Builder::new(ST7789, interface)
        .display_size(PANEL_WIDTH, PANEL_HEIGHT)
        .orientation(Orientation::new().rotate(ROTATION))
        .invert_colors(ColorInversion::Inverted)
        .init(&mut embassy_time::Delay)
        .expect("ST7789 init");

    display.clear(BLACK).ok();
    backlight.set_high();
    display
}
