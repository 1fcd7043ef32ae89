//! Pulse Width Modulation (PWM)
//!
//! The H2+/H3 PWM block has two channels sharing one control register. A
//! [`Pwm`] owns the register access port and a copy of the configuration of
//! both channels; every change to one channel rewrites the whole control
//! register from that copy.
//!
//! ```no_run
//! use sunxi_pwm::{mmio::Mmio, pwm::{Config, DynChannelId, Prescale, Pwm}};
//!
//! let pwm = Pwm::new(unsafe { Mmio::new() }, Config::default());
//!
//! // Enabling selects active high, gating on, continuous mode and a
//! // 24 MHz / 240 = 100 kHz counter clock.
//! pwm.enable_with_defaults(DynChannelId::Ch1, true);
//! pwm.set_prescale(DynChannelId::Ch1, Prescale::DIV_480.code()).unwrap();
//!
//! // 100 ticks per period, 25 of them active
//! pwm.set_total_cycles(DynChannelId::Ch1, 99).unwrap();
//! pwm.set_active_cycles(DynChannelId::Ch1, 25).unwrap();
//! ```
//!
//! Period register writes wait for the hardware to finish the previous one.
//! The wait is bounded by [`Config::busy_poll_limit`] and reported as
//! [`Error::HardwareTimeout`] when exceeded.
//!
//! The channels can also be driven through [`embedded_hal::pwm::SetDutyCycle`]:
//!
//! ```no_run
//! # use sunxi_pwm::{mmio::Mmio, pwm::{Config, Pwm}};
//! # let pwm = Pwm::new(unsafe { Mmio::new() }, Config::default());
//! use embedded_hal::pwm::SetDutyCycle;
//!
//! let (mut ch0, _ch1) = pwm.split();
//! ch0.enable();
//! ch0.set_period(999).unwrap();
//! ch0.set_duty_cycle_percent(30).unwrap();
//! ```

use core::cell::RefCell;
use core::fmt;
use core::marker::PhantomData;

use critical_section::Mutex;
use embedded_hal::pwm::{ErrorKind, ErrorType, SetDutyCycle};
use fugit::HertzU32;

use crate::{
    mmio::HardwareAccessPort,
    pinmux::{self, PinFunctions},
    sealed::Sealed,
};

pub mod attr;
mod channel;
pub mod dyn_channel;
pub mod prescale;
pub mod reg;

pub use attr::Attribute;
pub use channel::ChannelState;
pub use dyn_channel::*;
pub use prescale::{divisor_of, output_frequency, Prescale, BASE_CLOCK};
pub use reg::ControlSnapshot;

/// Physical address of the PWM control register
pub const PWM_BASE: usize = 0x01c2_1400;

/// Offsets of the channel 0 and channel 1 period registers
pub const PERIOD_OFFSET: [usize; 2] = [0x04, 0x08];

/// Control register reads made while waiting for a period register
pub const DEFAULT_BUSY_POLL_LIMIT: u32 = 0x1_0000;

/// Error type for PWM operations.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Input text is not a number of the expected type
    Parse,
    /// Value outside of the accepted range
    InvalidRange,
    /// Attribute can only be read
    ReadOnly,
    /// Pulse start requested while the channel runs continuously
    InvalidMode,
    /// Period register stayed busy for longer than the poll limit
    HardwareTimeout {
        /// Channel whose period register was busy
        channel: DynChannelId,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Parse => f.write_str("invalid number"),
            Error::InvalidRange => f.write_str("value out of range"),
            Error::ReadOnly => f.write_str("attribute is read-only"),
            Error::InvalidMode => f.write_str("channel is not in single pulse mode"),
            Error::HardwareTimeout { channel } => {
                write!(f, "period register of channel {} stuck busy", channel.index())
            }
        }
    }
}

impl embedded_hal::pwm::Error for Error {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// Register addresses and timing of a PWM block
///
/// The `Default` implementation uses the physical addresses of the H2+/H3:
/// ```ignore
/// Config {
///     control: 0x01c2_1400,
///     period: [0x01c2_1404, 0x01c2_1408],
///     port_a_cfg0: 0x01c2_0800,
///     port_a_pull0: 0x01c2_081c,
///     busy_poll_limit: 0x1_0000,
/// }
/// ```
#[non_exhaustive]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Control register address
    pub control: usize,

    /// Period register address of channel 0 and channel 1
    pub period: [usize; 2],

    /// Port A configure 0 register address
    pub port_a_cfg0: usize,

    /// Port A pull 0 register address
    pub port_a_pull0: usize,

    /// Maximum number of control register reads while waiting for a period
    /// register to become ready
    pub busy_poll_limit: u32,
}

impl Config {
    /// Create a new instance of Config from the PWM and Port A base addresses
    pub const fn new(pwm_base: usize, port_a_base: usize, busy_poll_limit: u32) -> Config {
        Config {
            control: pwm_base,
            period: [pwm_base + PERIOD_OFFSET[0], pwm_base + PERIOD_OFFSET[1]],
            port_a_cfg0: port_a_base,
            port_a_pull0: port_a_base + pinmux::PULL0_OFFSET,
            busy_poll_limit,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new(PWM_BASE, pinmux::PORT_A_BASE, DEFAULT_BUSY_POLL_LIMIT)
    }
}

/// Period register of one channel, as read
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PeriodSnapshot {
    /// Value as read
    pub raw: u32,
    /// Active cycles field
    pub active_cycles: u16,
    /// Entire cycles field
    pub total_cycles: u16,
}

impl PeriodSnapshot {
    fn from_raw(raw: u32) -> Self {
        let (active_cycles, total_cycles) = reg::unpack_period(raw);
        PeriodSnapshot {
            raw,
            active_cycles,
            total_cycles,
        }
    }
}

/// Everything the hardware reports about the PWM outputs
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HardwareSnapshot {
    /// PA5/PA6 function select
    pub pins: PinFunctions,
    /// Control register
    pub control: ControlSnapshot,
    /// Period registers of channel 0 and channel 1
    pub period: [PeriodSnapshot; 2],
}

impl fmt::Display for HardwareSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "PORT A Control: {:#010x}", self.pins.raw)?;
        writeln!(f, "PA05: {:#x}, PA06: {:#x}", self.pins.pa5, self.pins.pa6)?;
        writeln!(f)?;
        writeln!(f, "PWM Control: {:#010x}", self.control.raw)?;
        for id in DynChannelId::ALL {
            let n = id.index();
            let fields = self.control.channel(id);
            writeln!(f)?;
            writeln!(f, "  PWM{} Channel Prescaler: {:#06x}", n, fields.prescale.code())?;
            writeln!(f, "  PWM{} Channel Enable: {}", n, fields.enabled as u8)?;
            writeln!(f, "  PWM{} Channel Polarity: {}", n, fields.polarity as u8)?;
            writeln!(f, "  PWM{} Channel Gating: {}", n, fields.clock_gating as u8)?;
            writeln!(f, "  PWM{} Channel Mode: {}", n, fields.mode.bit() as u8)?;
            writeln!(f, "  PWM{} Channel Pulse Start: {}", n, fields.pulse_start as u8)?;
            writeln!(f, "  PWM{} Channel Clock Bypass: {}", n, fields.bypass as u8)?;
            writeln!(f, "  PWM{} Period Busy: {}", n, self.control.is_busy(id) as u8)?;
        }
        writeln!(f)?;
        for id in DynChannelId::ALL {
            let period = &self.period[id.index()];
            writeln!(
                f,
                "PWM{n} Entire Cycles: {:#06x}, PWM{n} Active Cycles: {:#06x}",
                period.total_cycles,
                period.active_cycles,
                n = id.index()
            )?;
        }
        Ok(())
    }
}

struct Inner<P> {
    port: P,
    channels: [ChannelState; 2],
}

impl<P: HardwareAccessPort> Inner<P> {
    fn write_control(&mut self, config: &Config) {
        let value = reg::pack(&self.channels[0], &self.channels[1]);
        self.port.write32(config.control, value);
        #[cfg(feature = "defmt")]
        defmt::debug!("control <- {=u32:#x}", value);
    }
}

/// The PWM block: two channels, their shared control register and their
/// period registers
///
/// All operations take a critical section for the whole
/// update-pack-write sequence, so a `Pwm` can be shared between execution
/// contexts.
pub struct Pwm<P: HardwareAccessPort> {
    inner: Mutex<RefCell<Inner<P>>>,
    config: Config,
}

impl<P: HardwareAccessPort> Pwm<P> {
    /// Take ownership of the register access port
    ///
    /// Both channels start out disabled. Nothing is written to the hardware
    /// until the first setter call.
    pub fn new(port: P, config: Config) -> Self {
        Pwm {
            inner: Mutex::new(RefCell::new(Inner {
                port,
                channels: [
                    ChannelState::new(DynChannelId::Ch0),
                    ChannelState::new(DynChannelId::Ch1),
                ],
            })),
            config,
        }
    }

    /// Register addresses in use
    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn with<R>(&self, f: impl FnOnce(&mut Inner<P>) -> R) -> R {
        critical_section::with(|cs| f(&mut self.inner.borrow(cs).borrow_mut()))
    }

    /// Change one channel and rewrite the control register from the cached
    /// state of both
    fn update_control(&self, id: DynChannelId, f: impl FnOnce(&mut ChannelState)) {
        self.with(|inner| {
            f(&mut inner.channels[id.index()]);
            inner.write_control(&self.config);
        })
    }

    /// Change the cycle counts of one channel and write its period register
    ///
    /// The cached state only changes once the write went through.
    fn update_period(
        &self,
        id: DynChannelId,
        f: impl FnOnce(&mut ChannelState),
    ) -> Result<(), Error> {
        self.with(|inner| {
            let mut next = inner.channels[id.index()];
            f(&mut next);
            reg::write_period(
                &mut inner.port,
                &self.config,
                id,
                next.active_cycles(),
                next.total_cycles(),
            )?;
            inner.channels[id.index()] = next;
            Ok(())
        })
    }

    /// Copy of the cached configuration of one channel
    pub fn channel_state(&self, id: DynChannelId) -> ChannelState {
        self.with(|inner| inner.channels[id.index()])
    }

    /// Control register value the driver would write for the current state
    pub fn control_image(&self) -> u32 {
        self.with(|inner| reg::pack(&inner.channels[0], &inner.channels[1]))
    }

    /// Output frequency of one channel, `None` for reserved prescaler codes
    pub fn frequency(&self, id: DynChannelId) -> Option<HertzU32> {
        self.channel_state(id).frequency()
    }

    /// Enable or disable a channel
    ///
    /// Either way polarity is set to active high, clock gating is turned on,
    /// the mode goes back to continuous and the prescaler to divide by 240.
    pub fn enable_with_defaults(&self, id: DynChannelId, value: bool) {
        self.update_control(id, |state| state.set_enabled(value));
    }

    /// Set the active state, `true` for active high
    pub fn set_polarity(&self, id: DynChannelId, value: bool) {
        self.update_control(id, |state| state.set_polarity(value));
        #[cfg(feature = "defmt")]
        defmt::debug!("{} polarity set to {}", id, value);
    }

    /// Select a prescaler code
    ///
    /// Codes above 15 are rejected. Reserved codes are accepted and leave
    /// the frequency undefined.
    pub fn set_prescale(&self, id: DynChannelId, code: u8) -> Result<(), Error> {
        let prescale = Prescale::new(code)?;
        self.update_control(id, |state| state.set_prescale(prescale));
        Ok(())
    }

    /// Allow or stop the clock into the channel
    pub fn set_clock_gating(&self, id: DynChannelId, value: bool) {
        self.update_control(id, |state| state.set_clock_gating(value));
    }

    /// Select continuous or single pulse output
    pub fn set_mode(&self, id: DynChannelId, mode: DynMode) {
        self.update_control(id, |state| state.set_mode(mode));
    }

    /// Route the 24 MHz clock straight to the output pin
    pub fn set_bypass(&self, id: DynChannelId, value: bool) {
        self.update_control(id, |state| state.set_bypass(value));
    }

    /// Emit one pulse on a channel in single pulse mode
    ///
    /// The hardware clears the start bit itself once the pulse is out, so
    /// the cached bit is cleared again right after the write.
    pub fn start_pulse(&self, id: DynChannelId) -> Result<(), Error> {
        self.with(|inner| {
            let state = &mut inner.channels[id.index()];
            if state.mode() != DynMode::SinglePulse {
                return Err(Error::InvalidMode);
            }
            state.set_pulse_start(true);
            inner.write_control(&self.config);
            inner.channels[id.index()].set_pulse_start(false);
            Ok(())
        })
    }

    /// Set the number of ticks per period, minus one
    pub fn set_total_cycles(&self, id: DynChannelId, value: u16) -> Result<(), Error> {
        self.update_period(id, |state| state.set_total_cycles(value))
    }

    /// Set the number of active ticks per period
    ///
    /// A value above the total cycles is written as is.
    pub fn set_active_cycles(&self, id: DynChannelId, value: u16) -> Result<(), Error> {
        self.update_period(id, |state| state.set_active_cycles(value))
    }

    /// Route PA5/PA6 to the PWM block and enable their pull-ups
    pub fn configure_pins(&self) {
        self.with(|inner| {
            pinmux::route_pwm_pins(
                &mut inner.port,
                self.config.port_a_cfg0,
                self.config.port_a_pull0,
            )
        })
    }

    /// Read back the pin function, control and period registers
    ///
    /// This is for diagnostics only and does not touch the cached state.
    pub fn snapshot_hardware(&self) -> HardwareSnapshot {
        self.with(|inner| {
            let port = &mut inner.port;
            HardwareSnapshot {
                pins: pinmux::read_functions(port, self.config.port_a_cfg0),
                control: reg::unpack(port.read32(self.config.control)),
                period: [
                    PeriodSnapshot::from_raw(port.read32(self.config.period[0])),
                    PeriodSnapshot::from_raw(port.read32(self.config.period[1])),
                ],
            }
        })
    }

    /// Get type-level handles to both channels
    pub fn split(&self) -> (Channel<'_, P, Ch0>, Channel<'_, P, Ch1>) {
        (Channel::new(self), Channel::new(self))
    }

    /// Stop both channels and give the access port back
    ///
    /// The channels are disabled with the same side effects as
    /// [`Pwm::enable_with_defaults`], and the control register is written
    /// once.
    pub fn shutdown(self) -> P {
        let mut inner = self.inner.into_inner().into_inner();
        for state in inner.channels.iter_mut() {
            state.set_enabled(false);
        }
        inner.write_control(&self.config);
        inner.port
    }
}

/// Type-level `enum` for channel IDs
pub trait ChannelId: Sealed {
    /// Corresponding [`DynChannelId`]
    const DYN: DynChannelId;
}

macro_rules! channel_id {
    ($Id:ident, $Dyn:ident, $NUM:literal) => {
        #[doc = concat!("Channel ID representing channel ", $NUM)]
        pub enum $Id {}
        impl Sealed for $Id {}
        impl ChannelId for $Id {
            const DYN: DynChannelId = DynChannelId::$Dyn;
        }
    };
}

channel_id!(Ch0, Ch0, 0);
channel_id!(Ch1, Ch1, 1);

/// A channel of the PWM block
///
/// Handles borrow the [`Pwm`] and go through the same critical section as
/// its methods, so holding several handles to one channel is harmless.
pub struct Channel<'a, P: HardwareAccessPort, C: ChannelId> {
    pwm: &'a Pwm<P>,
    id: PhantomData<C>,
}

impl<'a, P: HardwareAccessPort, C: ChannelId> Channel<'a, P, C> {
    fn new(pwm: &'a Pwm<P>) -> Self {
        Channel {
            pwm,
            id: PhantomData,
        }
    }

    /// Cached configuration of this channel
    #[inline]
    pub fn state(&self) -> ChannelState {
        self.pwm.channel_state(C::DYN)
    }

    /// Enable the channel, see [`Pwm::enable_with_defaults`]
    #[inline]
    pub fn enable(&mut self) {
        self.pwm.enable_with_defaults(C::DYN, true)
    }

    /// Disable the channel, see [`Pwm::enable_with_defaults`]
    #[inline]
    pub fn disable(&mut self) {
        self.pwm.enable_with_defaults(C::DYN, false)
    }

    /// Output active low
    #[inline]
    pub fn set_inverted(&mut self) {
        self.pwm.set_polarity(C::DYN, false)
    }

    /// Output active high
    #[inline]
    pub fn clr_inverted(&mut self) {
        self.pwm.set_polarity(C::DYN, true)
    }

    /// Select a prescaler
    #[inline]
    pub fn set_prescale(&mut self, prescale: Prescale) {
        // Every `Prescale` fits in 4 bits.
        let _ = self.pwm.set_prescale(C::DYN, prescale.code());
    }

    /// Set the period to `total_cycles + 1` ticks
    #[inline]
    pub fn set_period(&mut self, total_cycles: u16) -> Result<(), Error> {
        self.pwm.set_total_cycles(C::DYN, total_cycles)
    }

    /// Output frequency, `None` for reserved prescaler codes
    #[inline]
    pub fn frequency(&self) -> Option<HertzU32> {
        self.pwm.frequency(C::DYN)
    }
}

impl<P: HardwareAccessPort, C: ChannelId> Sealed for Channel<'_, P, C> {}

impl<P: HardwareAccessPort, C: ChannelId> ErrorType for Channel<'_, P, C> {
    type Error = Error;
}

impl<P: HardwareAccessPort, C: ChannelId> SetDutyCycle for Channel<'_, P, C> {
    /// One more than the total cycles, so that a duty of `max` keeps the
    /// output active for the whole period
    ///
    /// With total cycles at `u16::MAX` this saturates, and full duty ends
    /// one tick short.
    fn max_duty_cycle(&self) -> u16 {
        self.state().total_cycles().saturating_add(1)
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        self.pwm.set_active_cycles(C::DYN, duty)
    }
}
