//! Driver for the PWM block of the Allwinner H2+/H3
//!
//! The H2+/H3 (as found on the Orange Pi Zero) has a single PWM control
//! register shared by two channels, plus one period register per channel.
//! This crate models that register set: it packs the logical configuration
//! of both channels into the control register, follows the busy/ready
//! protocol of the period registers and derives the output frequency from
//! the prescaler table.
//!
//! All register traffic goes through a [`mmio::HardwareAccessPort`], so the
//! driver runs unchanged on top of a kernel mapping, a `/dev/mem` mapping or
//! a test double.
//!
//! ```no_run
//! use sunxi_pwm::{mmio::Mmio, pwm::{Config, DynChannelId, Pwm}};
//!
//! // Safety: the platform has mapped the PWM and Port A registers 1:1.
//! let port = unsafe { Mmio::new() };
//! let pwm = Pwm::new(port, Config::default());
//! pwm.configure_pins();
//!
//! pwm.enable_with_defaults(DynChannelId::Ch0, true);
//! pwm.set_total_cycles(DynChannelId::Ch0, 99).unwrap();
//! pwm.set_active_cycles(DynChannelId::Ch0, 50).unwrap();
//! ```

#![deny(missing_docs)]
#![no_std]

#[cfg(test)]
extern crate std;

pub mod mmio;
pub mod pinmux;
pub mod pwm;

#[cfg(test)]
mod mock;

mod sealed {
    /// Prevents downstream implementations of type-level markers.
    pub trait Sealed {}
}
