//! Text attributes of a channel
//!
//! Each channel is exposed as a small set of named attributes that read and
//! write plain text, one value per attribute. Registering them with a device
//! model (sysfs or otherwise) is up to the caller; this module only does the
//! text encoding and routes writes to the [`Pwm`] operations.
//!
//! | Attribute      | Read                 | Write                      |
//! |----------------|----------------------|----------------------------|
//! | `run`          | `0` or `1`           | `0` or `1`                 |
//! | `polarity`     | `0` or `1`           | byte, non-zero is high     |
//! | `prescale`     | prescaler code       | `0` to `15`                |
//! | `entirecycles` | total cycles         | `0` to `65535`             |
//! | `activecycles` | active cycles        | `0` to `65535`             |
//! | `freqperiod`   | `<n>hz`              | read-only                  |
//! | `hardware`     | register dump        | read-only                  |

use core::fmt::{self, Write};
use core::str::FromStr;

use super::{DynChannelId, Error, Pwm};
use crate::mmio::HardwareAccessPort;

/// Attributes of a channel
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Attribute {
    /// Channel enable
    Run,
    /// Active state
    Polarity,
    /// Prescaler code
    Prescale,
    /// Total cycles per period
    EntireCycles,
    /// Active cycles per period
    ActiveCycles,
    /// Output frequency
    FreqPeriod,
    /// Register dump
    Hardware,
}

impl Attribute {
    /// Every attribute, in the order they are usually listed
    pub const ALL: [Attribute; 7] = [
        Attribute::Run,
        Attribute::Polarity,
        Attribute::Prescale,
        Attribute::EntireCycles,
        Attribute::ActiveCycles,
        Attribute::FreqPeriod,
        Attribute::Hardware,
    ];

    /// File name of the attribute
    pub const fn name(self) -> &'static str {
        match self {
            Attribute::Run => "run",
            Attribute::Polarity => "polarity",
            Attribute::Prescale => "prescale",
            Attribute::EntireCycles => "entirecycles",
            Attribute::ActiveCycles => "activecycles",
            Attribute::FreqPeriod => "freqperiod",
            Attribute::Hardware => "hardware",
        }
    }

    /// Look an attribute up by file name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|attr| attr.name() == name)
    }

    /// Whether writes can succeed
    pub const fn is_writable(self) -> bool {
        !matches!(self, Attribute::FreqPeriod | Attribute::Hardware)
    }

    /// Unix permission bits to register the attribute with
    ///
    /// `freqperiod` is registered writable, writes to it are rejected.
    pub const fn mode(self) -> u16 {
        match self {
            Attribute::Hardware => 0o444,
            _ => 0o666,
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn parse<T: FromStr>(input: &[u8]) -> Result<T, Error> {
    let text = core::str::from_utf8(input).map_err(|_| Error::Parse)?;
    text.trim().parse().map_err(|_| Error::Parse)
}

impl<P: HardwareAccessPort> Pwm<P> {
    /// Render the current value of an attribute, newline terminated
    pub fn show<W: Write>(&self, id: DynChannelId, attr: Attribute, out: &mut W) -> fmt::Result {
        let state = self.channel_state(id);
        match attr {
            Attribute::Run => writeln!(out, "{}", state.enabled() as u8),
            Attribute::Polarity => writeln!(out, "{}", state.polarity() as u8),
            Attribute::Prescale => writeln!(out, "{}", state.prescale().code()),
            Attribute::EntireCycles => writeln!(out, "{}", state.total_cycles()),
            Attribute::ActiveCycles => writeln!(out, "{}", state.active_cycles()),
            Attribute::FreqPeriod => match state.frequency() {
                Some(freq) => writeln!(out, "{}hz", freq.to_Hz()),
                None => writeln!(out, "undefined"),
            },
            Attribute::Hardware => write!(out, "{}", self.snapshot_hardware()),
        }
    }

    /// Apply a text write to an attribute
    ///
    /// Surrounding whitespace, such as the newline left by `echo`, is
    /// ignored. Returns the number of bytes consumed, which is always the
    /// whole input. Nothing changes when an error is returned.
    pub fn store(&self, id: DynChannelId, attr: Attribute, input: &[u8]) -> Result<usize, Error> {
        match attr {
            Attribute::Run => {
                let enable = match parse::<i32>(input)? {
                    0 => false,
                    1 => true,
                    _ => return Err(Error::InvalidRange),
                };
                self.enable_with_defaults(id, enable);
            }
            Attribute::Polarity => {
                let polarity = parse::<u8>(input)?;
                self.set_polarity(id, polarity != 0);
            }
            Attribute::Prescale => {
                let code = parse::<u8>(input)?;
                self.set_prescale(id, code)?;
            }
            Attribute::EntireCycles => {
                let cycles = parse::<u16>(input)?;
                self.set_total_cycles(id, cycles)?;
            }
            Attribute::ActiveCycles => {
                let cycles = parse::<u16>(input)?;
                self.set_active_cycles(id, cycles)?;
            }
            Attribute::FreqPeriod | Attribute::Hardware => return Err(Error::ReadOnly),
        }
        Ok(input.len())
    }
}

#[cfg(test)]
mod tests {
    use std::string::String;

    use super::*;
    use crate::mock::MockPort;
    use crate::pwm::Config;

    fn show<P: HardwareAccessPort>(pwm: &Pwm<P>, id: DynChannelId, attr: Attribute) -> String {
        let mut out = String::new();
        pwm.show(id, attr, &mut out).unwrap();
        out
    }

    #[test]
    fn names_round_trip() {
        for attr in Attribute::ALL {
            assert_eq!(Attribute::from_name(attr.name()), Some(attr));
        }
        assert_eq!(Attribute::from_name("duty"), None);
        assert_eq!(Attribute::Hardware.mode(), 0o444);
        assert_eq!(Attribute::FreqPeriod.mode(), 0o666);
        assert!(!Attribute::FreqPeriod.is_writable());
        assert!(Attribute::Run.is_writable());
    }

    #[test]
    fn one_kilohertz_end_to_end() {
        let mut port = MockPort::new();
        let pwm = Pwm::new(&mut port, Config::default());
        let ch = DynChannelId::Ch0;

        assert_eq!(pwm.store(ch, Attribute::Run, b"1\n"), Ok(2));
        assert_eq!(pwm.store(ch, Attribute::EntireCycles, b"99\n"), Ok(3));
        assert_eq!(pwm.store(ch, Attribute::ActiveCycles, b"50\n"), Ok(3));

        assert_eq!(show(&pwm, ch, Attribute::Run), "1\n");
        assert_eq!(show(&pwm, ch, Attribute::Prescale), "2\n");
        assert_eq!(show(&pwm, ch, Attribute::EntireCycles), "99\n");
        assert_eq!(show(&pwm, ch, Attribute::ActiveCycles), "50\n");
        assert_eq!(show(&pwm, ch, Attribute::FreqPeriod), "1000hz\n");
        drop(pwm);

        assert_eq!(port.get(Config::default().period[0]), 99 << 16 | 50);
    }

    #[test]
    fn frequency_before_period_is_set() {
        let mut port = MockPort::new();
        let pwm = Pwm::new(&mut port, Config::default());
        let ch = DynChannelId::Ch1;
        pwm.store(ch, Attribute::Run, b"1").unwrap();
        pwm.store(ch, Attribute::EntireCycles, b"1").unwrap();
        // 100 kHz counter over two ticks
        assert_eq!(show(&pwm, ch, Attribute::FreqPeriod), "50000hz\n");
    }

    #[test]
    fn reserved_prescale_has_no_frequency() {
        let mut port = MockPort::new();
        let pwm = Pwm::new(&mut port, Config::default());
        let ch = DynChannelId::Ch0;
        assert_eq!(pwm.store(ch, Attribute::Prescale, b"13\n"), Ok(3));
        assert_eq!(show(&pwm, ch, Attribute::Prescale), "13\n");
        assert_eq!(show(&pwm, ch, Attribute::FreqPeriod), "undefined\n");
    }

    #[test]
    fn rejected_writes_change_nothing() {
        let mut port = MockPort::new();
        let pwm = Pwm::new(&mut port, Config::default());
        let ch = DynChannelId::Ch0;

        assert_eq!(pwm.store(ch, Attribute::Run, b"2"), Err(Error::InvalidRange));
        assert_eq!(pwm.store(ch, Attribute::Run, b"-1"), Err(Error::InvalidRange));
        assert_eq!(pwm.store(ch, Attribute::Run, b"on"), Err(Error::Parse));
        assert_eq!(pwm.store(ch, Attribute::Polarity, b"256"), Err(Error::Parse));
        assert_eq!(pwm.store(ch, Attribute::Prescale, b"16"), Err(Error::InvalidRange));
        assert_eq!(pwm.store(ch, Attribute::Prescale, b""), Err(Error::Parse));
        assert_eq!(
            pwm.store(ch, Attribute::EntireCycles, b"70000"),
            Err(Error::Parse)
        );
        assert_eq!(pwm.store(ch, Attribute::ActiveCycles, b"abc"), Err(Error::Parse));
        assert_eq!(pwm.store(ch, Attribute::ActiveCycles, &[0xff, 0x31]), Err(Error::Parse));
        assert_eq!(pwm.store(ch, Attribute::FreqPeriod, b"1000"), Err(Error::ReadOnly));
        assert_eq!(pwm.store(ch, Attribute::Hardware, b"0"), Err(Error::ReadOnly));

        assert_eq!(show(&pwm, ch, Attribute::Run), "0\n");
        assert_eq!(show(&pwm, ch, Attribute::Prescale), "0\n");
        drop(pwm);
        assert!(port.writes.is_empty());
    }

    #[test]
    fn polarity_is_normalised() {
        let mut port = MockPort::new();
        let pwm = Pwm::new(&mut port, Config::default());
        let ch = DynChannelId::Ch1;
        pwm.store(ch, Attribute::Polarity, b"7\n").unwrap();
        assert_eq!(show(&pwm, ch, Attribute::Polarity), "1\n");
        pwm.store(ch, Attribute::Polarity, b"0").unwrap();
        assert_eq!(show(&pwm, ch, Attribute::Polarity), "0\n");
    }

    #[test]
    fn disabling_resets_polarity() {
        let mut port = MockPort::new();
        let pwm = Pwm::new(&mut port, Config::default());
        let ch = DynChannelId::Ch0;
        pwm.store(ch, Attribute::Run, b"1").unwrap();
        pwm.store(ch, Attribute::Polarity, b"0").unwrap();
        pwm.store(ch, Attribute::Prescale, b"15").unwrap();
        pwm.store(ch, Attribute::Run, b"0").unwrap();
        assert_eq!(show(&pwm, ch, Attribute::Polarity), "1\n");
        assert_eq!(show(&pwm, ch, Attribute::Prescale), "2\n");
    }

    #[test]
    fn period_timeout_is_reported() {
        let mut port = MockPort::new();
        port.stick_busy(0);
        let config = Config::new(crate::pwm::PWM_BASE, crate::pinmux::PORT_A_BASE, 4);
        let pwm = Pwm::new(&mut port, config);
        let ch = DynChannelId::Ch0;
        assert_eq!(
            pwm.store(ch, Attribute::EntireCycles, b"10"),
            Err(Error::HardwareTimeout { channel: ch })
        );
        assert_eq!(show(&pwm, ch, Attribute::EntireCycles), "0\n");
    }

    #[test]
    fn hardware_dump() {
        let config = Config::default();
        let mut port = MockPort::new();
        port.preset(config.port_a_cfg0, 0x7337_2277);
        let pwm = Pwm::new(&mut port, config);
        pwm.enable_with_defaults(DynChannelId::Ch0, true);
        pwm.set_total_cycles(DynChannelId::Ch0, 99).unwrap();
        pwm.set_active_cycles(DynChannelId::Ch0, 50).unwrap();

        let dump = show(&pwm, DynChannelId::Ch1, Attribute::Hardware);
        let lines: std::vec::Vec<&str> = dump.lines().collect();
        assert_eq!(lines[0], "PORT A Control: 0x73372277");
        assert_eq!(lines[1], "PA05: 0x3, PA06: 0x3");
        assert_eq!(lines[3], "PWM Control: 0x00000072");
        assert!(dump.contains("  PWM0 Channel Prescaler: 0x0002\n"));
        assert!(dump.contains("  PWM0 Channel Enable: 1\n"));
        assert!(dump.contains("  PWM1 Channel Enable: 0\n"));
        assert!(dump.contains("PWM0 Entire Cycles: 0x0063, PWM0 Active Cycles: 0x0032\n"));
        assert!(dump.ends_with("PWM1 Entire Cycles: 0x0000, PWM1 Active Cycles: 0x0000\n"));
    }
}
