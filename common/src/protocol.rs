//! Wire protocol selection.
//!
//! The engine controller can speak one of two incompatible frame layouts,
//! and the OEM layout exists in two revisions that disagree about the
//! primary frame. The active choice is part of the persisted configuration;
//! the decoder reads it on every dispatch.

/// Revision of the OEM stream.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Revision {
    /// Primary channels split across several big-endian frames, temperatures
    /// in 0.1 K on a slower frame, smoothed on the way in.
    MultiFrame,
    /// Engine speed, MAP, coolant, intake air, battery and oil temperature
    /// packed into the primary frame. Canonical layout ("Generic Dash").
    #[default]
    Packed,
}

impl Revision {
    #[inline]
    pub const fn as_raw(self) -> u32 {
        match self {
            Self::MultiFrame => 0,
            Self::Packed => 1,
        }
    }

    #[inline]
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::MultiFrame),
            1 => Some(Self::Packed),
            _ => None,
        }
    }
}

/// Protocol variant the decoder dispatches on.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Protocol {
    /// OEM stream: big-endian fields, frames at base, base+1, base+2, the
    /// lambda frame at base+8 and the temperature frame at base+3
    /// (or base+0x80).
    Oem(Revision),
    /// Custom three-frame stream: little-endian fields at base..base+2.
    Custom,
}

impl Default for Protocol {
    fn default() -> Self { Self::Oem(Revision::Packed) }
}

impl Protocol {
    /// Base identifier the controller uses out of the box for this variant.
    pub const fn default_base_id(self) -> u32 {
        match self {
            Self::Oem(Revision::Packed) => 1000,
            Self::Oem(Revision::MultiFrame) => 0x360,
            Self::Custom => 0x600,
        }
    }

    /// Persisted `protocol` value.
    #[inline]
    pub const fn variant_raw(self) -> u32 {
        match self {
            Self::Oem(_) => 0,
            Self::Custom => 1,
        }
    }

    /// Persisted `revision` value. The custom stream has a single revision
    /// and stores the default so reading it back stays stable.
    #[inline]
    pub const fn revision_raw(self) -> u32 {
        match self {
            Self::Oem(revision) => revision.as_raw(),
            Self::Custom => Revision::Packed.as_raw(),
        }
    }

    /// Rebuild from the persisted pair.
    pub const fn from_raw(
        variant: u32,
        revision: u32,
    ) -> Option<Self> {
        match variant {
            0 => match Revision::from_raw(revision) {
                Some(revision) => Some(Self::Oem(revision)),
                None => None,
            },
            1 => Some(Self::Custom),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Oem(Revision::MultiFrame) => "OEM multi-frame",
            Self::Oem(Revision::Packed) => "Generic Dash",
            Self::Custom => "Custom stream",
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
