//! Button debounce handling.
//!
//! Time-based edge detection so contact bounce on the PIM715 buttons does
//! not trigger an operator action twice. Time is passed in so the logic runs
//! on the host.

/// Debounce duration in milliseconds.
pub const DEBOUNCE_MS: u64 = 50;

/// Debounce state for one active-low button.
pub struct ButtonState {
    was_pressed: bool,
    last_change_ms: Option<u64>,
}

impl ButtonState {
    pub const fn new() -> Self {
        Self {
            was_pressed: false,
            last_change_ms: None,
        }
    }

    /// True only on the press edge. `is_low` is the raw pin level (low means
    /// pressed).
    pub fn just_pressed(
        &mut self,
        is_low: bool,
        now_ms: u64,
    ) -> bool {
        if is_low == self.was_pressed {
            return false;
        }
        if let Some(last) = self.last_change_ms
            && now_ms.saturating_sub(last) < DEBOUNCE_MS
        {
            return false;
        }

        self.was_pressed = is_low;
        self.last_change_ms = Some(now_ms);
        is_low
    }
}

impl Default for ButtonState {
    fn default() -> Self { Self::new() }
}

// =============================================================================
// Unit Tests
// =============================================================================
