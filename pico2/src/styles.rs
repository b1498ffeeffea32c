//! Pre-computed static text styles.
//!
//! Styles are `const` so drawing code never rebuilds them per frame. Callers
//! that need a dynamic color use `MonoTextStyle::new(LABEL_FONT, color)`.

use embedded_graphics::mono_font::ascii::{FONT_6X10, FONT_10X20};
use embedded_graphics::mono_font::{MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::text::{Alignment, TextStyle, TextStyleBuilder};
use profont::{PROFONT_18_POINT, PROFONT_24_POINT};

use crate::colors::{BLACK, GRAY, WHITE};

// =============================================================================
// Text Alignment
// =============================================================================

pub const CENTERED: TextStyle = TextStyleBuilder::new().alignment(Alignment::Center).build();

pub const RIGHT_ALIGNED: TextStyle = TextStyleBuilder::new().alignment(Alignment::Right).build();

// =============================================================================
// Fonts
// =============================================================================

/// Small label font (6x10 pixels).
pub const LABEL_FONT: &MonoFont = &FONT_6X10;

/// Gauge value font.
pub const VALUE_FONT: &MonoFont = &PROFONT_24_POINT;

/// Gauge value font for cells with longer values.
pub const VALUE_FONT_MEDIUM: &MonoFont = &PROFONT_18_POINT;

// =============================================================================
// Text Styles
// =============================================================================

pub const LABEL_STYLE_WHITE: MonoTextStyle<'static, Rgb565> = MonoTextStyle::new(&FONT_6X10, WHITE);

pub const LABEL_STYLE_BLACK: MonoTextStyle<'static, Rgb565> = MonoTextStyle::new(&FONT_6X10, BLACK);

/// Units and footers.
pub const LABEL_STYLE_GRAY: MonoTextStyle<'static, Rgb565> = MonoTextStyle::new(&FONT_6X10, GRAY);

/// Page titles (10x20 pixels).
pub const TITLE_STYLE_WHITE: MonoTextStyle<'static, Rgb565> = MonoTextStyle::new(&FONT_10X20, WHITE);
