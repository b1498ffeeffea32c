//! Diagnostics page: where telemetry comes from and how the bus is doing.

use ecu_dash_common::{ArbiterState, BusStats, Config, Telemetry};
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::text::Text;
use heapless::String;

use super::{HEADER_HEIGHT, LINE_HEIGHT, draw_footer, draw_header, format};
use crate::colors::{BLACK, WHITE, state_color};
use crate::pages::Page;
use crate::styles::{LABEL_FONT, LABEL_STYLE_GRAY};

/// Everything the page shows, borrowed from the control loop.
pub struct DiagnosticsView<'a> {
    pub state: ArbiterState,
    pub config: &'a Config,
    pub stats: &'a BusStats,
    pub telemetry: &'a Telemetry,
    pub now_ms: u64,
}

const VALUE_X: i32 = 120;

type Line = String<32>;

fn lines(view: &DiagnosticsView<'_>) -> [(&'static str, Line); 9] {
    let config = view.config;
    let stats = view.stats;
    let last_frame: Line = match stats.last_frame_ms {
        Some(at) => format(format_args!("{} ms ago", view.now_ms.saturating_sub(at))),
        None => format(format_args!("never")),
    };
    [
        ("SOURCE", format(format_args!("{}", view.state.name()))),
        ("PROTOCOL", format(format_args!("{}", config.protocol.name()))),
        (
            "BASE ID",
            format(format_args!("{} (0x{:03X})", config.base_can_id, config.base_can_id)),
        ),
        ("BUS SPEED", format(format_args!("{}", config.can_speed.name()))),
        ("UNITS", format(format_args!("{}", config.unit_system.name()))),
        (
            "FRAMES",
            format(format_args!("{} rx {} ok {} skip", stats.received, stats.decoded, stats.ignored)),
        ),
        ("LAST FRAME", last_frame),
        (
            "G LAT/LON",
            format(format_args!(
                "{:+.2} / {:+.2}",
                view.telemetry.g_force_lateral, view.telemetry.g_force_longitudinal
            )),
        ),
        ("SIM AT BOOT", format(format_args!("{}", if config.simulation_mode { "yes" } else { "no" }))),
    ]
}

pub fn draw_diagnostics_page<D>(
    display: &mut D,
    view: &DiagnosticsView<'_>,
) where
    D: DrawTarget<Color = Rgb565>,
{
    display.clear(BLACK).ok();
    draw_header(display, Page::Diagnostics, view.state);

    let mut y = HEADER_HEIGHT as i32 + 16;
    for (index, (label, value)) in lines(view).iter().enumerate() {
        Text::new(label, Point::new(4, y), LABEL_STYLE_GRAY).draw(display).ok();
        // The source line takes the badge color.
        let color = if index == 0 { state_color(view.state) } else { WHITE };
        Text::new(value.as_str(), Point::new(VALUE_X, y), MonoTextStyle::new(LABEL_FONT, color))
            .draw(display)
            .ok();
        y += LINE_HEIGHT + 4;
    }

    draw_footer(display, "A units  B sim/live  X speed  Y page");
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use ecu_dash_common::UnitSystem;

    use super::super::test_display::FrameBuffer;
    use super::*;

    fn view<'a>(
        config: &'a Config,
        stats: &'a BusStats,
        telemetry: &'a Telemetry,
    ) -> DiagnosticsView<'a> {
        DiagnosticsView {
            state: ArbiterState::LiveBus,
            config,
            stats,
            telemetry,
            now_ms: 10_000,
        }
    }

    #[test]
    fn test_lines_describe_bus() {
        let mut config = Config::new();
        config.unit_system = UnitSystem::Imperial;
        let mut stats = BusStats::new();
        stats.record(9_750, true);
        stats.record(9_800, false);
        let telemetry = Telemetry::new();

        let lines = lines(&view(&config, &stats, &telemetry));
        assert_eq!(lines[0].1, "LIVE");
        assert_eq!(lines[2].1, "1000 (0x3E8)");
        assert_eq!(lines[3].1, "1 Mbps");
        assert_eq!(lines[4].1, "Imperial");
        assert_eq!(lines[5].1, "2 rx 1 ok 1 skip");
        assert_eq!(lines[6].1, "200 ms ago");
        assert_eq!(lines[7].1, "+0.00 / +0.00");
    }

    #[test]
    fn test_no_frames_yet() {
        let config = Config::new();
        let stats = BusStats::new();
        let telemetry = Telemetry::new();
        assert_eq!(lines(&view(&config, &stats, &telemetry))[6].1, "never");
    }

    #[test]
    fn test_page_draws_values() {
        let config = Config::new();
        let stats = BusStats::new();
        let telemetry = Telemetry::new();
        let mut fb = FrameBuffer::new();
        draw_diagnostics_page(&mut fb, &view(&config, &stats, &telemetry));
        assert!(fb.count(WHITE) > 0);
        assert!(fb.ink(VALUE_X as u32..300, HEADER_HEIGHT..200, BLACK) > 0);
    }
}
