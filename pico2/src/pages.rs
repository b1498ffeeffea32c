//! Page navigation for the status screen.
//!
//! The `Y` button cycles through the pages.

/// Available status pages.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub enum Page {
    /// 4x2 grid of the main engine channels.
    #[default]
    Gauges,

    /// Telemetry source, bus settings and frame counters.
    Diagnostics,

    /// On-device log viewer.
    Logs,
}

impl Page {
    /// Next page (Gauges → Diagnostics → Logs → Gauges).
    #[inline]
    pub const fn toggle(self) -> Self {
        match self {
            Self::Gauges => Self::Diagnostics,
            Self::Diagnostics => Self::Logs,
            Self::Logs => Self::Gauges,
        }
    }

    pub const fn title(self) -> &'static str {
        match self {
            Self::Gauges => "GAUGES",
            Self::Diagnostics => "DIAGNOSTICS",
            Self::Logs => "LOGS",
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
