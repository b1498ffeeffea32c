//! Raw bus frames and byte-field extraction.
//!
//! A [`RawFrame`] is what the bus driver hands to the decoder: an identifier,
//! a data length code and up to eight payload bytes. Frames are immutable once
//! received; the decoder only reads them.

use embedded_can::{Frame, Id};

/// Maximum payload bytes in a classic CAN frame.
pub const MAX_DATA_LEN: usize = 8;

/// Highest 11-bit (standard) identifier.
pub const MAX_STANDARD_ID: u32 = 0x7FF;

/// Highest 29-bit (extended) identifier.
pub const MAX_EXTENDED_ID: u32 = 0x1FFF_FFFF;

/// One received bus frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawFrame {
    id: u32,
    extended: bool,
    dlc: u8,
    data: [u8; MAX_DATA_LEN],
}

impl RawFrame {
    /// Build a standard-identifier frame from a payload slice.
    ///
    /// Returns `None` if the identifier does not fit in 11 bits or the payload
    /// is longer than eight bytes.
    pub fn new(
        id: u32,
        payload: &[u8],
    ) -> Option<Self> {
        if id > MAX_STANDARD_ID {
            return None;
        }
        Self::with_payload(id, false, payload)
    }

    /// Build an extended-identifier frame from a payload slice.
    pub fn new_extended(
        id: u32,
        payload: &[u8],
    ) -> Option<Self> {
        if id > MAX_EXTENDED_ID {
            return None;
        }
        Self::with_payload(id, true, payload)
    }

    fn with_payload(
        id: u32,
        extended: bool,
        payload: &[u8],
    ) -> Option<Self> {
        if payload.len() > MAX_DATA_LEN {
            return None;
        }
        let mut data = [0u8; MAX_DATA_LEN];
        data[..payload.len()].copy_from_slice(payload);
        Some(Self {
            id,
            extended,
            dlc: payload.len() as u8,
            data,
        })
    }

    /// Build a frame exactly as a controller reported it.
    ///
    /// The data length code is kept verbatim, so a driver that reports a
    /// nonsensical DLC produces a frame the decoder will drop.
    pub const fn from_parts(
        id: u32,
        extended: bool,
        dlc: u8,
        data: [u8; MAX_DATA_LEN],
    ) -> Self {
        Self { id, extended, dlc, data }
    }

    /// Convert any `embedded-can` frame. Remote frames carry no data and are
    /// rejected.
    pub fn from_can<F: Frame>(frame: &F) -> Option<Self> {
        if frame.is_remote_frame() {
            return None;
        }
        let (id, extended) = match frame.id() {
            Id::Standard(id) => (u32::from(id.as_raw()), false),
            Id::Extended(id) => (id.as_raw(), true),
        };
        Self::with_payload(id, extended, frame.data())
    }

    /// Frame identifier (11 or 29 bits).
    #[inline]
    pub const fn id(&self) -> u32 { self.id }

    /// Whether the identifier is a 29-bit extended one.
    #[inline]
    pub const fn is_extended(&self) -> bool { self.extended }

    /// Data length code as received.
    #[inline]
    pub const fn dlc(&self) -> u8 { self.dlc }

    /// Valid payload bytes (at most eight).
    pub fn data(&self) -> &[u8] {
        let len = (self.dlc as usize).min(MAX_DATA_LEN);
        &self.data[..len]
    }

    /// The full eight-byte payload, only if this is a full-length frame.
    #[inline]
    pub const fn full_payload(&self) -> Option<&[u8; MAX_DATA_LEN]> {
        if self.dlc as usize == MAX_DATA_LEN {
            Some(&self.data)
        } else {
            None
        }
    }
}

// =============================================================================
// Byte Field Extraction
// =============================================================================

/// Unsigned 16-bit field, most significant byte first.
#[inline]
pub const fn be_u16(
    data: &[u8; MAX_DATA_LEN],
    offset: usize,
) -> u16 {
    u16::from_be_bytes([data[offset], data[offset + 1]])
}

/// Signed 16-bit field, most significant byte first.
#[inline]
pub const fn be_i16(
    data: &[u8; MAX_DATA_LEN],
    offset: usize,
) -> i16 {
    i16::from_be_bytes([data[offset], data[offset + 1]])
}

/// Unsigned 16-bit field, least significant byte first.
#[inline]
pub const fn le_u16(
    data: &[u8; MAX_DATA_LEN],
    offset: usize,
) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

// =============================================================================
// Unit Tests
// =============================================================================
