//! Value-level channel ids and modes

use super::Error;

/// Channel ids
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DynChannelId {
    /// Channel 0, output on PA5
    Ch0,
    /// Channel 1, output on PA6
    Ch1,
}

impl DynChannelId {
    /// Both channels, in register order
    pub const ALL: [DynChannelId; 2] = [DynChannelId::Ch0, DynChannelId::Ch1];

    /// Channel number, 0 or 1
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            DynChannelId::Ch0 => 0,
            DynChannelId::Ch1 => 1,
        }
    }
}

impl TryFrom<u8> for DynChannelId {
    type Error = Error;

    fn try_from(num: u8) -> Result<Self, Self::Error> {
        match num {
            0 => Ok(DynChannelId::Ch0),
            1 => Ok(DynChannelId::Ch1),
            _ => Err(Error::InvalidRange),
        }
    }
}

/// Channel modes
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DynMode {
    /// Output a continuous waveform while the channel is enabled
    #[default]
    Continuous,
    /// Output one pulse each time pulse start is written
    SinglePulse,
}

impl DynMode {
    #[inline]
    pub(crate) const fn bit(self) -> bool {
        matches!(self, DynMode::SinglePulse)
    }

    #[inline]
    pub(crate) const fn from_bit(bit: bool) -> Self {
        if bit {
            DynMode::SinglePulse
        } else {
            DynMode::Continuous
        }
    }
}
