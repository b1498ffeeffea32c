//! Logs page: the newest log lines, color-coded by level.
//!
//! ```text
//! LOGS                              (header)
//! [I] 12345 bus up at 1 Mbps        (entries)
//! [W] 17350 bus stalled
//! ...
//! Y: next page                      (footer)
//! ```

use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::text::Text;
use heapless::String;

use super::{FOOTER_Y, HEADER_HEIGHT, LINE_HEIGHT, draw_footer, draw_header, format};
use crate::colors::BLACK;
use crate::logs::{LogBuffer, LogEntry, message_color};
use crate::pages::Page;
use crate::styles::{LABEL_FONT, LABEL_STYLE_WHITE};

/// Rows between header and footer.
pub const VISIBLE_ROWS: usize = ((FOOTER_Y - LINE_HEIGHT - HEADER_HEIGHT as i32) / LINE_HEIGHT) as usize;

/// `[L] TTTTT` column is 12 characters of 6 px.
const MESSAGE_X: i32 = 84;

pub fn draw_logs_page<D>(
    display: &mut D,
    buffer: &LogBuffer,
    state: ecu_dash_common::ArbiterState,
) where
    D: DrawTarget<Color = Rgb565>,
{
    display.clear(BLACK).ok();
    draw_header(display, Page::Logs, state);

    if buffer.is_empty() {
        Text::new("No log entries", Point::new(4, 120), LABEL_STYLE_WHITE)
            .draw(display)
            .ok();
    } else {
        let skip = buffer.len().saturating_sub(VISIBLE_ROWS);
        let mut y = HEADER_HEIGHT as i32 + LINE_HEIGHT;
        for entry in buffer.iter().skip(skip) {
            draw_entry(display, entry, y);
            y += LINE_HEIGHT;
        }
    }

    draw_footer(display, "Y: next page");
}

fn draw_entry<D>(
    display: &mut D,
    entry: &LogEntry,
    y: i32,
) where
    D: DrawTarget<Color = Rgb565>,
{
    let prefix: String<16> = format(format_args!("[{}] {:05}", entry.level.prefix(), entry.short_timestamp()));
    Text::new(&prefix, Point::new(4, y), MonoTextStyle::new(LABEL_FONT, entry.level.color()))
        .draw(display)
        .ok();
    Text::new(
        entry.message.as_str(),
        Point::new(MESSAGE_X, y),
        MonoTextStyle::new(LABEL_FONT, message_color(entry.level)),
    )
    .draw(display)
    .ok();
}

// =============================================================================
// Unit Tests
// =============================================================================
