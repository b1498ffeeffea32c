//! Status pages drawn on the PIM715 (320x240).
//!
//! Every page is a plain function generic over `DrawTarget<Color = Rgb565>`,
//! so the same code draws to the ST7789 and to a RAM framebuffer in tests.
//! Pages only read state; they never touch the bus or the store.

mod diagnostics;
mod gauges;
mod logs;

use core::fmt::Write;

use ecu_dash_common::ArbiterState;
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use embedded_graphics::text::Text;
use heapless::String;

pub use diagnostics::{DiagnosticsView, draw_diagnostics_page};
pub use gauges::{GAUGE_COUNT, draw_gauges_page};
pub use logs::draw_logs_page;

use crate::colors::{BLACK, GRAY, state_color};
use crate::pages::Page;
use crate::styles::{LABEL_FONT, LABEL_STYLE_BLACK, RIGHT_ALIGNED, TITLE_STYLE_WHITE};

// =============================================================================
// Layout
// =============================================================================

pub const SCREEN_WIDTH: u32 = 320;

pub const SCREEN_HEIGHT: u32 = 240;

pub const HEADER_HEIGHT: u32 = 26;

/// Gauge grid: 4 columns, 2 rows below the header.
pub const COL_WIDTH: u32 = SCREEN_WIDTH / 4;

pub const ROW_HEIGHT: u32 = (SCREEN_HEIGHT - HEADER_HEIGHT) / 2;

/// Baseline of the footer hint line.
pub const FOOTER_Y: i32 = SCREEN_HEIGHT as i32 - 6;

/// Text line pitch on the list pages.
pub const LINE_HEIGHT: i32 = 14;

/// Page header: title on the left, telemetry source badge on the right.
pub fn draw_header<D>(
    display: &mut D,
    page: Page,
    state: ArbiterState,
) where
    D: DrawTarget<Color = Rgb565>,
{
    Rectangle::new(Point::zero(), Size::new(SCREEN_WIDTH, HEADER_HEIGHT))
        .into_styled(PrimitiveStyle::with_fill(BLACK))
        .draw(display)
        .ok();
    Text::new(page.title(), Point::new(4, 19), TITLE_STYLE_WHITE).draw(display).ok();

    let badge = Rectangle::new(Point::new(SCREEN_WIDTH as i32 - 66, 4), Size::new(62, 18));
    badge.into_styled(PrimitiveStyle::with_fill(state_color(state))).draw(display).ok();
    Text::with_text_style(
        state.name(),
        Point::new(SCREEN_WIDTH as i32 - 10, 17),
        LABEL_STYLE_BLACK,
        RIGHT_ALIGNED,
    )
    .draw(display)
    .ok();

    Rectangle::new(Point::new(0, HEADER_HEIGHT as i32 - 1), Size::new(SCREEN_WIDTH, 1))
        .into_styled(PrimitiveStyle::with_fill(GRAY))
        .draw(display)
        .ok();
}

/// Button hint at the bottom of the list pages.
pub fn draw_footer<D>(
    display: &mut D,
    hint: &str,
) where
    D: DrawTarget<Color = Rgb565>,
{
    Text::new(hint, Point::new(4, FOOTER_Y), MonoTextStyle::new(LABEL_FONT, GRAY))
        .draw(display)
        .ok();
}

/// Format into a fixed buffer; overflow truncates.
pub(crate) fn format<const N: usize>(args: core::fmt::Arguments<'_>) -> String<N> {
    let mut text = String::new();
    let _ = text.write_fmt(args);
    text
}

// =============================================================================
// Test Display
// =============================================================================

#[cfg(test)]
pub(crate) mod test_display {
    use std::vec;
    use std::vec::Vec;

    use embedded_graphics::Pixel;
    use embedded_graphics::pixelcolor::Rgb565;
    use embedded_graphics::prelude::*;

    use super::{SCREEN_HEIGHT, SCREEN_WIDTH};

    /// RAM framebuffer the size of the panel.
    pub struct FrameBuffer {
        pub pixels: Vec<Rgb565>,
    }

    impl FrameBuffer {
        pub fn new() -> Self {
            Self {
                pixels: vec![Rgb565::new(1, 2, 3); (SCREEN_WIDTH * SCREEN_HEIGHT) as usize],
            }
        }

        pub fn at(
            &self,
            x: u32,
            y: u32,
        ) -> Rgb565 {
            self.pixels[(y * SCREEN_WIDTH + x) as usize]
        }

        pub fn count(
            &self,
            color: Rgb565,
        ) -> usize {
            self.pixels.iter().filter(|&&p| p == color).count()
        }

        /// Pixels in a region that differ from `background`.
        pub fn ink(
            &self,
            x: core::ops::Range<u32>,
            y: core::ops::Range<u32>,
            background: Rgb565,
        ) -> usize {
            y.flat_map(|row| x.clone().map(move |col| (col, row)))
                .filter(|&(col, row)| self.at(col, row) != background)
                .count()
        }
    }

    impl OriginDimensions for FrameBuffer {
        fn size(&self) -> Size { Size::new(SCREEN_WIDTH, SCREEN_HEIGHT) }
    }

    impl DrawTarget for FrameBuffer {
        type Color = Rgb565;
        type Error = core::convert::Infallible;

        fn draw_iter<I>(
            &mut self,
            pixels: I,
        ) -> Result<(), Self::Error>
        where
            I: IntoIterator<Item = Pixel<Self::Color>>,
        {
            for Pixel(point, color) in pixels {
                if point.x >= 0 && point.y >= 0 && (point.x as u32) < SCREEN_WIDTH && (point.y as u32) < SCREEN_HEIGHT
                {
                    self.pixels[(point.y as u32 * SCREEN_WIDTH + point.x as u32) as usize] = color;
                }
            }
            Ok(())
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
