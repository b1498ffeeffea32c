//! Per-channel smoothing and plausibility filtering.
//!
//! Some temperature channels arrive noisy and at a low rate, and an
//! occasional corrupt frame decodes to an absurd value. Those channels get an
//! exponential blend with their previous value and a plausibility window.
//! The coefficients live in [`CHANNEL_FILTERS`] so they are data, not
//! literals scattered through the decoder.

/// Channels that receive smoothing.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Channel {
    IntakeAirTemp = 0,
    CoolantTemp = 1,
    OilTemp = 2,
}

/// Number of filtered channels.
pub const CHANNEL_COUNT: usize = 3;

/// Filter parameters for one channel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChannelFilter {
    pub channel: Channel,
    /// Weight of the previous value; the new sample gets `1 - previous_weight`.
    pub previous_weight: f32,
    /// Samples must be strictly above this value to be accepted.
    pub min_exclusive: f32,
    /// Samples must be strictly below this value to be accepted.
    pub max_exclusive: f32,
}

impl ChannelFilter {
    /// Whether a freshly converted sample is plausible.
    #[inline]
    pub fn accepts(
        &self,
        sample: f32,
    ) -> bool {
        sample > self.min_exclusive && sample < self.max_exclusive
    }

    /// Blend a sample into the previous value.
    #[inline]
    pub fn blend(
        &self,
        previous: f32,
        sample: f32,
    ) -> f32 {
        previous * self.previous_weight + sample * (1.0 - self.previous_weight)
    }
}

/// Coefficient table, indexed by `Channel as usize`.
pub const CHANNEL_FILTERS: [ChannelFilter; CHANNEL_COUNT] = [
    ChannelFilter {
        channel: Channel::IntakeAirTemp,
        previous_weight: 0.8,
        min_exclusive: -40.0,
        max_exclusive: 150.0,
    },
    ChannelFilter {
        channel: Channel::CoolantTemp,
        previous_weight: 0.5,
        min_exclusive: -40.0,
        max_exclusive: 150.0,
    },
    ChannelFilter {
        channel: Channel::OilTemp,
        previous_weight: 0.7,
        min_exclusive: -40.0,
        max_exclusive: 200.0,
    },
];

/// Look up the filter for a channel.
#[inline]
pub const fn filter_for(channel: Channel) -> ChannelFilter { CHANNEL_FILTERS[channel as usize] }

/// Last accepted filtered value per channel, owned by the decoder.
///
/// The blend always starts from the caller-supplied current value (the
/// telemetry record's reading), never from this history. Other frames and
/// the simulator write the same fields.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FilterState {
    previous: [Option<f32>; CHANNEL_COUNT],
}

impl FilterState {
    pub const fn new() -> Self {
        Self {
            previous: [None; CHANNEL_COUNT],
        }
    }

    /// Run one sample through the channel's filter, blending it into
    /// `current`.
    ///
    /// Returns the new filtered value, or `None` if the sample was rejected;
    /// a rejected sample leaves the channel's history untouched.
    pub fn apply(
        &mut self,
        channel: Channel,
        current: f32,
        sample: f32,
    ) -> Option<f32> {
        let filter = filter_for(channel);
        if !filter.accepts(sample) {
            return None;
        }
        let filtered = filter.blend(current, sample);
        self.previous[channel as usize] = Some(filtered);
        Some(filtered)
    }

    /// Last value this filter produced for `channel`, if any since the
    /// last reset.
    #[inline]
    pub fn last(
        &self,
        channel: Channel,
    ) -> Option<f32> {
        self.previous[channel as usize]
    }

    /// Forget all history (protocol change, explicit reset).
    pub fn reset(&mut self) { self.previous = [None; CHANNEL_COUNT]; }
}

// =============================================================================
// Unit Tests
// =============================================================================
