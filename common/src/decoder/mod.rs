//! Frame classification and dispatch.
//!
//! Each protocol variant is a table of [`Route`]s: an identifier offset from
//! the configured base, whether that frame is the primary (engine speed)
//! frame, and the function that decodes its payload. The table is chosen
//! from the configuration on every call, so a protocol change takes effect
//! on the next frame.
//!
//! Decoding is total. Frames that are not exactly eight bytes, extended
//! frames and identifiers the active table does not list are ignored without
//! touching the telemetry record.

mod custom;
mod oem;

pub use custom::{STATUS_ANTI_LAG, STATUS_LAUNCH_CONTROL};

use crate::config::Config;
use crate::filter::FilterState;
use crate::frame::{MAX_DATA_LEN, RawFrame};
use crate::protocol::{Protocol, Revision};
use crate::telemetry::Telemetry;

/// Payload decoder for one frame layout.
pub type DecodeFn = fn(&[u8; MAX_DATA_LEN], &mut Telemetry, &mut FilterState);

/// One expected frame of a protocol variant.
#[derive(Clone, Copy)]
pub struct Route {
    /// Identifier offset from the configured base.
    pub offset: u32,
    /// Engine-speed frame; drives live detection and stall tracking.
    pub primary: bool,
    pub decode: DecodeFn,
}

/// Offset of the OEM lambda frame.
pub const OEM_LAMBDA_OFFSET: u32 = 0x08;

/// Offset of the OEM 5 Hz temperature frame in the contiguous block.
pub const OEM_TEMPERATURE_OFFSET: u32 = 3;

/// Offset some controller firmware uses for the same temperature frame
/// (0x3E0 on a 0x360 base). Both are accepted.
pub const OEM_TEMPERATURE_ALT_OFFSET: u32 = 0x80;

static OEM_MULTI_FRAME_ROUTES: [Route; 6] = [
    Route {
        offset: 0,
        primary: true,
        decode: oem::decode_engine,
    },
    Route {
        offset: 1,
        primary: false,
        decode: oem::decode_pressures,
    },
    Route {
        offset: 2,
        primary: false,
        decode: oem::decode_ignition,
    },
    Route {
        offset: OEM_LAMBDA_OFFSET,
        primary: false,
        decode: oem::decode_lambda,
    },
    Route {
        offset: OEM_TEMPERATURE_OFFSET,
        primary: false,
        decode: oem::decode_temperatures,
    },
    Route {
        offset: OEM_TEMPERATURE_ALT_OFFSET,
        primary: false,
        decode: oem::decode_temperatures,
    },
];

// The packed primary frame takes the place of the split one; the remaining
// frames are shared with the multi-frame revision.
static OEM_PACKED_ROUTES: [Route; 6] = [
    Route {
        offset: 0,
        primary: true,
        decode: oem::decode_packed_engine,
    },
    Route {
        offset: 1,
        primary: false,
        decode: oem::decode_pressures,
    },
    Route {
        offset: 2,
        primary: false,
        decode: oem::decode_ignition,
    },
    Route {
        offset: OEM_LAMBDA_OFFSET,
        primary: false,
        decode: oem::decode_lambda,
    },
    Route {
        offset: OEM_TEMPERATURE_OFFSET,
        primary: false,
        decode: oem::decode_temperatures,
    },
    Route {
        offset: OEM_TEMPERATURE_ALT_OFFSET,
        primary: false,
        decode: oem::decode_temperatures,
    },
];

static CUSTOM_ROUTES: [Route; 3] = [
    Route {
        offset: 0,
        primary: true,
        decode: custom::decode_engine,
    },
    Route {
        offset: 1,
        primary: false,
        decode: custom::decode_mixture,
    },
    Route {
        offset: 2,
        primary: false,
        decode: custom::decode_pressures,
    },
];

/// Route table for a protocol variant.
pub fn routes(protocol: Protocol) -> &'static [Route] {
    match protocol {
        Protocol::Oem(Revision::MultiFrame) => &OEM_MULTI_FRAME_ROUTES,
        Protocol::Oem(Revision::Packed) => &OEM_PACKED_ROUTES,
        Protocol::Custom => &CUSTOM_ROUTES,
    }
}

/// Find the route for an identifier. Later entries win if two offsets ever
/// collide.
pub fn route_for(
    protocol: Protocol,
    base_id: u32,
    id: u32,
) -> Option<&'static Route> {
    let offset = id.checked_sub(base_id)?;
    routes(protocol).iter().rev().find(|route| route.offset == offset)
}

/// Result of offering one frame to the decoder.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeOutcome {
    /// Wrong length, extended identifier or not part of the active protocol.
    Ignored,
    /// A secondary frame updated the record.
    Updated,
    /// The primary frame updated the record.
    UpdatedPrimary,
}

impl DecodeOutcome {
    /// The record changed and the display should refresh.
    #[inline]
    pub const fn is_update(self) -> bool { !matches!(self, Self::Ignored) }

    #[inline]
    pub const fn is_primary(self) -> bool { matches!(self, Self::UpdatedPrimary) }
}

/// Stateful frame decoder. Owns the smoothing history of filtered channels.
#[derive(Default)]
pub struct FrameDecoder {
    filters: FilterState,
    last_protocol: Option<Protocol>,
}

impl FrameDecoder {
    pub const fn new() -> Self {
        Self {
            filters: FilterState::new(),
            last_protocol: None,
        }
    }

    /// Decode one frame against the configured protocol and base identifier.
    pub fn decode(
        &mut self,
        frame: &RawFrame,
        config: &Config,
        telemetry: &mut Telemetry,
    ) -> DecodeOutcome {
        self.decode_for(frame, config.protocol, config.base_can_id, telemetry)
    }

    /// Decode one frame against an explicit protocol and base identifier.
    pub fn decode_for(
        &mut self,
        frame: &RawFrame,
        protocol: Protocol,
        base_id: u32,
        telemetry: &mut Telemetry,
    ) -> DecodeOutcome {
        let Some(payload) = frame.full_payload() else {
            return DecodeOutcome::Ignored;
        };
        if frame.is_extended() {
            return DecodeOutcome::Ignored;
        }
        let Some(route) = route_for(protocol, base_id, frame.id()) else {
            return DecodeOutcome::Ignored;
        };

        // Smoothing history from another layout means nothing here.
        if self.last_protocol != Some(protocol) {
            if self.last_protocol.is_some() {
                debug!("decoder: protocol changed, filter history cleared");
            }
            self.filters.reset();
            self.last_protocol = Some(protocol);
        }

        (route.decode)(payload, telemetry, &mut self.filters);

        if route.primary {
            DecodeOutcome::UpdatedPrimary
        } else {
            DecodeOutcome::Updated
        }
    }

    /// Drop smoothing history.
    pub fn reset_filters(&mut self) { self.filters.reset(); }
}

// =============================================================================
// Unit Tests
// =============================================================================
