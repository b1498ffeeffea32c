//! Gauges page: 4x2 grid of the main engine channels.
//!
//! ```text
//! +--------+--------+--------+--------+
//! |  RPM   | SPEED  |  MAP   |  ECT   |
//! +--------+--------+--------+--------+
//! |  OIL   |  BATT  | LAMBDA | KNOCK  |
//! +--------+--------+--------+--------+
//! ```
//!
//! Values are converted to the operator's unit system; cell colors come from
//! the metric thresholds.

use ecu_dash_common::{ArbiterState, Telemetry, UnitConverter};
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use embedded_graphics::text::Text;
use heapless::String;

use super::{COL_WIDTH, HEADER_HEIGHT, ROW_HEIGHT, SCREEN_HEIGHT, SCREEN_WIDTH, draw_header, format};
use crate::colors::{BLACK, DARK_TEAL, GRAY, RED, WHITE};
use crate::pages::Page;
use crate::styles::{CENTERED, LABEL_FONT, VALUE_FONT, VALUE_FONT_MEDIUM};
use crate::thresholds::{battery_color, coolant_color, knock_color, lambda_color, oil_color};

pub const GAUGE_COUNT: usize = 8;

struct Gauge {
    label: &'static str,
    value: String<8>,
    unit: &'static str,
    background: Rgb565,
}

fn gauges(
    telemetry: &Telemetry,
    units: UnitConverter,
) -> [Gauge; GAUGE_COUNT] {
    let temp_unit = units.temperature_unit();
    [
        Gauge {
            label: "RPM",
            value: format(format_args!("{:.0}", telemetry.rpm)),
            unit: "",
            background: BLACK,
        },
        Gauge {
            label: "SPEED",
            value: format(format_args!("{:.0}", units.speed(telemetry.vehicle_speed))),
            unit: units.speed_unit(),
            background: BLACK,
        },
        Gauge {
            label: "MAP",
            value: format(format_args!("{:.1}", units.pressure(telemetry.manifold_pressure))),
            unit: units.pressure_unit(),
            background: BLACK,
        },
        Gauge {
            label: "ECT",
            value: format(format_args!("{:.0}", units.temperature(telemetry.coolant_temp))),
            unit: temp_unit,
            background: coolant_color(telemetry.coolant_temp),
        },
        Gauge {
            label: "OIL",
            value: format(format_args!("{:.0}", units.temperature(telemetry.oil_temp))),
            unit: temp_unit,
            background: oil_color(telemetry.oil_temp),
        },
        Gauge {
            label: "BATT",
            value: format(format_args!("{:.1}", telemetry.battery_voltage)),
            unit: "V",
            background: battery_color(telemetry.battery_voltage),
        },
        Gauge {
            label: "LAMBDA",
            value: format(format_args!("{:.2}", telemetry.lambda)),
            unit: "",
            background: lambda_color(telemetry.lambda),
        },
        Gauge {
            label: "KNOCK",
            value: format(format_args!("{:.1}", telemetry.knock_level)),
            unit: "",
            background: knock_color(telemetry.knock_level),
        },
    ]
}

/// Text color readable on a cell background.
fn text_color(background: Rgb565) -> Rgb565 {
    if [BLACK, DARK_TEAL, RED].contains(&background) { WHITE } else { BLACK }
}

fn draw_cell<D>(
    display: &mut D,
    index: usize,
    gauge: &Gauge,
) where
    D: DrawTarget<Color = Rgb565>,
{
    let col = (index % 4) as u32;
    let row = (index / 4) as u32;
    let x = (col * COL_WIDTH) as i32;
    let y = (HEADER_HEIGHT + row * ROW_HEIGHT) as i32;
    let center_x = x + COL_WIDTH as i32 / 2;

    Rectangle::new(Point::new(x, y), Size::new(COL_WIDTH, ROW_HEIGHT))
        .into_styled(PrimitiveStyle::with_fill(gauge.background))
        .draw(display)
        .ok();

    let color = text_color(gauge.background);
    let label_style = MonoTextStyle::new(LABEL_FONT, color);
    Text::with_text_style(gauge.label, Point::new(center_x, y + 16), label_style, CENTERED)
        .draw(display)
        .ok();

    // ProFont 24 fits four digits in a cell; longer values step down.
    let font = if gauge.value.len() > 4 { VALUE_FONT_MEDIUM } else { VALUE_FONT };
    Text::with_text_style(
        gauge.value.as_str(),
        Point::new(center_x, y + ROW_HEIGHT as i32 / 2 + 10),
        MonoTextStyle::new(font, color),
        CENTERED,
    )
    .draw(display)
    .ok();

    if !gauge.unit.is_empty() {
        Text::with_text_style(gauge.unit, Point::new(center_x, y + ROW_HEIGHT as i32 - 10), label_style, CENTERED)
            .draw(display)
            .ok();
    }
}

fn draw_dividers<D>(display: &mut D)
where
    D: DrawTarget<Color = Rgb565>,
{
    let style = PrimitiveStyle::with_fill(GRAY);
    for col in 1..4 {
        Rectangle::new(
            Point::new((col * COL_WIDTH) as i32, HEADER_HEIGHT as i32),
            Size::new(1, SCREEN_HEIGHT - HEADER_HEIGHT),
        )
        .into_styled(style)
        .draw(display)
        .ok();
    }
    Rectangle::new(
        Point::new(0, (HEADER_HEIGHT + ROW_HEIGHT) as i32),
        Size::new(SCREEN_WIDTH, 1),
    )
    .into_styled(style)
    .draw(display)
    .ok();
}

pub fn draw_gauges_page<D>(
    display: &mut D,
    telemetry: &Telemetry,
    units: UnitConverter,
    state: ArbiterState,
) where
    D: DrawTarget<Color = Rgb565>,
{
    draw_header(display, Page::Gauges, state);
    for (index, gauge) in gauges(telemetry, units).iter().enumerate() {
        draw_cell(display, index, gauge);
    }
    draw_dividers(display);
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use ecu_dash_common::UnitSystem;

    use super::super::test_display::FrameBuffer;
    use super::*;
    use crate::colors::ORANGE;

    const METRIC: UnitConverter = UnitConverter::new(UnitSystem::Metric);
    const IMPERIAL: UnitConverter = UnitConverter::new(UnitSystem::Imperial);

    /// Top-left pixel inside a cell, clear of dividers and text.
    fn cell_corner(index: u32) -> (u32, u32) { ((index % 4) * COL_WIDTH + 2, HEADER_HEIGHT + (index / 4) * ROW_HEIGHT + 2) }

    #[test]
    fn test_values_follow_unit_system() {
        let telemetry = Telemetry::new();
        let metric = gauges(&telemetry, METRIC);
        let imperial = gauges(&telemetry, IMPERIAL);

        assert_eq!(metric[0].value, imperial[0].value);
        assert_eq!(metric[1].value, "65");
        assert_eq!(imperial[1].value, "40");
        assert_eq!(imperial[1].unit, "mph");
        assert_eq!(metric[3].unit, "C");
        assert_eq!(imperial[3].value, "190");
    }

    #[test]
    fn test_critical_cell_turns_red() {
        let mut telemetry = Telemetry::new();
        telemetry.coolant_temp = 120.0;
        let mut fb = FrameBuffer::new();
        draw_gauges_page(&mut fb, &telemetry, METRIC, ArbiterState::LiveBus);

        let (x, y) = cell_corner(3);
        assert_eq!(fb.at(x, y), RED);
        let (x, y) = cell_corner(0);
        assert_eq!(fb.at(x, y), BLACK);
    }

    #[test]
    fn test_colors_ignore_unit_system() {
        let mut telemetry = Telemetry::new();
        telemetry.coolant_temp = 108.0;
        let metric = gauges(&telemetry, METRIC);
        let imperial = gauges(&telemetry, IMPERIAL);
        assert_eq!(metric[3].background, ORANGE);
        assert_eq!(imperial[3].background, ORANGE);
    }

    #[test]
    fn test_every_cell_has_a_value() {
        let mut fb = FrameBuffer::new();
        draw_gauges_page(&mut fb, &Telemetry::new(), METRIC, ArbiterState::Simulation);
        for index in 0..GAUGE_COUNT as u32 {
            let (x, y) = cell_corner(index);
            let background = fb.at(x, y);
            let value_band = (y + ROW_HEIGHT / 2 - 20)..(y + ROW_HEIGHT / 2 + 12);
            assert!(fb.ink(x..x + COL_WIDTH - 4, value_band, background) > 0, "cell {index} is blank");
        }
    }

    #[test]
    fn test_readable_text_colors() {
        assert_eq!(text_color(BLACK), WHITE);
        assert_eq!(text_color(RED), WHITE);
        assert_eq!(text_color(ORANGE), BLACK);
    }
}
