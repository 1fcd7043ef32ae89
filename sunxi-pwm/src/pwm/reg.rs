//! Control and period register layout
//!
//! Control register (one for both channels):
//!
//! | Bits  | Field                          |
//! |-------|--------------------------------|
//! | 0-9   | channel 0 field (see below)    |
//! | 10-14 | unused                         |
//! | 15-24 | channel 1 field                |
//! | 25-27 | unused                         |
//! | 28    | channel 0 period busy (RO)     |
//! | 29    | channel 1 period busy (RO)     |
//! | 30-31 | unused                         |
//!
//! Channel field, relative to the channel's base bit:
//!
//! | Bit | Field                              |
//! |-----|------------------------------------|
//! | 0-3 | prescaler code                     |
//! | 4   | enable                             |
//! | 5   | active state (1: active high)      |
//! | 6   | clock gating                       |
//! | 7   | mode (1: single pulse)             |
//! | 8   | pulse start                        |
//! | 9   | bypass                             |
//!
//! Period register (one per channel): active cycles in bits 0-15, entire
//! cycles in bits 16-31.

use core::convert::Infallible;

use super::{
    channel::ChannelState,
    dyn_channel::{DynChannelId, DynMode},
    prescale::Prescale,
    Config, Error,
};
use crate::mmio::HardwareAccessPort;

/// Base bit of each channel's field in the control register
pub const FIELD_SHIFT: [u32; 2] = [0, 15];

/// Bits of a channel field that carry configuration
pub const FIELD_MASK: u32 = 0x3ff;

/// Busy flag of each channel's period register
pub const BUSY_BIT: [usize; 2] = [28, 29];

/// Every control register bit the driver writes
pub const WRITABLE_MASK: u32 = FIELD_MASK << FIELD_SHIFT[0] | FIELD_MASK << FIELD_SHIFT[1];

bitfield::bitfield! {
    /// One channel's slice of the control register, shifted down to bit 0
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    #[derive(Clone, Copy, PartialEq, Eq, Default)]
    pub struct ChannelField(u32);
    impl Debug;
    /// Prescaler code
    pub u8, prescale, set_prescale: 3, 0;
    /// Channel enable
    pub enable, set_enable: 4;
    /// Active state, 1 for active high
    pub polarity, set_polarity: 5;
    /// Clock gating
    pub gating, set_gating: 6;
    /// Mode, 1 for single pulse
    pub mode, set_mode: 7;
    /// Start a single pulse
    pub pulse_start, set_pulse_start: 8;
    /// Route the 24 MHz clock straight to the pin
    pub bypass, set_bypass: 9;
}

bitfield::bitfield! {
    /// Hardware owned flags of the control register
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    #[derive(Clone, Copy, PartialEq, Eq, Default)]
    pub struct ControlFlags(u32);
    impl Debug;
    /// Channel 0 period register is still applying the last write
    pub ch0_busy, _: 28;
    /// Channel 1 period register is still applying the last write
    pub ch1_busy, _: 29;
}

/// Decoded control register fields of one channel
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelFields {
    /// Prescaler code
    pub prescale: Prescale,
    /// Channel enable
    pub enabled: bool,
    /// Active state, `true` for active high
    pub polarity: bool,
    /// Clock gating
    pub clock_gating: bool,
    /// Output mode
    pub mode: DynMode,
    /// Single pulse trigger
    pub pulse_start: bool,
    /// Clock bypass
    pub bypass: bool,
}

impl ChannelFields {
    fn encode(&self) -> ChannelField {
        let mut field = ChannelField(0);
        field.set_prescale(self.prescale.code());
        field.set_enable(self.enabled);
        field.set_polarity(self.polarity);
        field.set_gating(self.clock_gating);
        field.set_mode(self.mode.bit());
        field.set_pulse_start(self.pulse_start);
        field.set_bypass(self.bypass);
        field
    }

    fn decode(field: ChannelField) -> Self {
        ChannelFields {
            prescale: Prescale::from_bits(field.prescale()),
            enabled: field.enable(),
            polarity: field.polarity(),
            clock_gating: field.gating(),
            mode: DynMode::from_bit(field.mode()),
            pulse_start: field.pulse_start(),
            bypass: field.bypass(),
        }
    }
}

impl From<&ChannelState> for ChannelFields {
    fn from(state: &ChannelState) -> Self {
        ChannelFields {
            prescale: state.prescale(),
            enabled: state.enabled(),
            polarity: state.polarity(),
            clock_gating: state.clock_gating(),
            mode: state.mode(),
            pulse_start: state.pulse_start(),
            bypass: state.bypass(),
        }
    }
}

/// A control register value taken apart, for diagnostics only
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlSnapshot {
    /// Value as read
    pub raw: u32,
    /// Fields of channel 0 and channel 1
    pub channels: [ChannelFields; 2],
    /// Busy flags of channel 0 and channel 1
    pub busy: [bool; 2],
}

impl ControlSnapshot {
    /// Fields of one channel
    #[inline]
    pub fn channel(&self, id: DynChannelId) -> &ChannelFields {
        &self.channels[id.index()]
    }

    /// Busy flag of one channel
    #[inline]
    pub fn is_busy(&self, id: DynChannelId) -> bool {
        self.busy[id.index()]
    }
}

/// Pack the fields of both channels into a control register value
///
/// Busy flags and unused bits are always 0.
pub fn pack_fields(channels: &[ChannelFields; 2]) -> u32 {
    channels
        .iter()
        .zip(FIELD_SHIFT)
        .fold(0u32, |acc, (fields, shift)| acc | (fields.encode().0 & FIELD_MASK) << shift)
}

/// Control register value for the current state of both channels
pub fn pack(ch0: &ChannelState, ch1: &ChannelState) -> u32 {
    pack_fields(&[ch0.into(), ch1.into()])
}

/// Take a raw control register value apart
pub fn unpack(raw: u32) -> ControlSnapshot {
    let field = |ch: usize| {
        let bits = raw >> FIELD_SHIFT[ch] & FIELD_MASK;
        ChannelFields::decode(ChannelField(bits))
    };
    let flags = ControlFlags(raw);
    ControlSnapshot {
        raw,
        channels: [field(0), field(1)],
        busy: [flags.ch0_busy(), flags.ch1_busy()],
    }
}

/// Period register value
#[inline]
pub const fn pack_period(active_cycles: u16, total_cycles: u16) -> u32 {
    (total_cycles as u32) << 16 | active_cycles as u32
}

/// Split a period register value into `(active_cycles, total_cycles)`
#[inline]
pub const fn unpack_period(raw: u32) -> (u16, u16) {
    (raw as u16, (raw >> 16) as u16)
}

/// Read the control register once and report whether `id` accepts a period
/// write
#[inline]
pub(crate) fn poll_ready<P: HardwareAccessPort>(
    port: &mut P,
    control: usize,
    id: DynChannelId,
) -> nb::Result<(), Infallible> {
    let raw = port.read32(control);
    if raw & 1 << BUSY_BIT[id.index()] != 0 {
        return Err(nb::Error::WouldBlock);
    }
    Ok(())
}

/// Wait for the period register of `id` to be ready, then write it once
///
/// At most `config.busy_poll_limit` reads of the control register are made
/// (at least one). If the busy flag is still set after that, nothing is
/// written.
pub(crate) fn write_period<P: HardwareAccessPort>(
    port: &mut P,
    config: &Config,
    id: DynChannelId,
    active_cycles: u16,
    total_cycles: u16,
) -> Result<(), Error> {
    let mut polls = 0;
    loop {
        match poll_ready(port, config.control, id) {
            Ok(()) => break,
            Err(nb::Error::WouldBlock) => {
                polls += 1;
                if polls >= config.busy_poll_limit.max(1) {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("period register of {} stuck busy", id);
                    return Err(Error::HardwareTimeout { channel: id });
                }
            }
            Err(nb::Error::Other(never)) => match never {},
        }
    }

    let value = pack_period(active_cycles, total_cycles);
    port.write32(config.period[id.index()], value);
    #[cfg(feature = "defmt")]
    defmt::debug!(
        "{} entire_cycles: {} active_cycles: {}",
        id,
        total_cycles,
        active_cycles
    );
    Ok(())
}
