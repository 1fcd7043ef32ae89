//! Prescaler table and output frequency
//!
//! The PWM counter is clocked from the 24 MHz oscillator through a divider
//! selected by a 4 bit code. Codes 5, 6, 7, 13 and 14 have no divider
//! assigned: they can be written to the hardware but the resulting output is
//! undefined.

use fugit::HertzU32;

use super::Error;

/// Frequency of the clock feeding the prescaler
pub const BASE_CLOCK: HertzU32 = HertzU32::from_raw(24_000_000);

const DIVISORS: [Option<u32>; 16] = [
    Some(120),
    Some(180),
    Some(240),
    Some(360),
    Some(480),
    None,
    None,
    None,
    Some(12_000),
    Some(24_000),
    Some(36_000),
    Some(48_000),
    Some(72_000),
    None,
    None,
    Some(1),
];

/// A 4 bit prescaler code
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Prescale(u8);

impl Prescale {
    /// Divide by 120
    pub const DIV_120: Prescale = Prescale(0x0);
    /// Divide by 180
    pub const DIV_180: Prescale = Prescale(0x1);
    /// Divide by 240, the code selected when a channel is (re)enabled
    pub const DIV_240: Prescale = Prescale(0x2);
    /// Divide by 360
    pub const DIV_360: Prescale = Prescale(0x3);
    /// Divide by 480
    pub const DIV_480: Prescale = Prescale(0x4);
    /// Divide by 12000
    pub const DIV_12K: Prescale = Prescale(0x8);
    /// Divide by 24000
    pub const DIV_24K: Prescale = Prescale(0x9);
    /// Divide by 36000
    pub const DIV_36K: Prescale = Prescale(0xa);
    /// Divide by 48000
    pub const DIV_48K: Prescale = Prescale(0xb);
    /// Divide by 72000
    pub const DIV_72K: Prescale = Prescale(0xc);
    /// No division, the counter runs at 24 MHz
    pub const NO_DIV: Prescale = Prescale(0xf);

    /// Make a prescaler code, rejecting anything wider than 4 bits
    ///
    /// Reserved codes are accepted.
    #[inline]
    pub const fn new(code: u8) -> Result<Self, Error> {
        if code > 0xf {
            return Err(Error::InvalidRange);
        }
        Ok(Prescale(code))
    }

    /// Build from the low 4 bits of a register field
    #[inline]
    pub(crate) const fn from_bits(bits: u8) -> Self {
        Prescale(bits & 0xf)
    }

    /// Raw code
    #[inline]
    pub const fn code(self) -> u8 {
        self.0
    }

    /// Clock divisor for this code, `None` for reserved codes
    #[inline]
    pub const fn divisor(self) -> Option<u32> {
        divisor_of(self.0)
    }

    /// Whether this code has no divisor assigned
    #[inline]
    pub const fn is_reserved(self) -> bool {
        self.divisor().is_none()
    }
}

impl TryFrom<u8> for Prescale {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Prescale::new(code)
    }
}

/// Look up the clock divisor of a prescaler code
///
/// Returns `None` for reserved codes and for values that do not fit in 4 bits.
pub const fn divisor_of(code: u8) -> Option<u32> {
    if code > 0xf {
        return None;
    }
    DIVISORS[code as usize]
}

/// Output frequency for a prescaler code and a period of `total_cycles + 1`
/// counter ticks
///
/// Integer division truncates, as the hardware counts whole ticks. Returns
/// `None` when the prescaler code is reserved.
pub const fn output_frequency(prescale: Prescale, total_cycles: u16) -> Option<HertzU32> {
    let divisor = match prescale.divisor() {
        Some(divisor) => divisor,
        None => return None,
    };
    let counter = BASE_CLOCK.raw() / divisor;
    Some(HertzU32::from_raw(counter / (total_cycles as u32 + 1)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_range_divisors() {
        let expected = [120, 180, 240, 360, 480];
        for (code, divisor) in expected.iter().enumerate() {
            assert_eq!(divisor_of(code as u8), Some(*divisor));
        }
    }

    #[test]
    fn high_range_divisors() {
        let expected = [12_000, 24_000, 36_000, 48_000, 72_000];
        for (i, divisor) in expected.iter().enumerate() {
            assert_eq!(divisor_of(8 + i as u8), Some(*divisor));
        }
    }

    #[test]
    fn reserved_codes() {
        for code in [5, 6, 7, 13, 14] {
            assert_eq!(divisor_of(code), None);
            assert!(Prescale::new(code).unwrap().is_reserved());
        }
        assert_eq!(divisor_of(15), Some(1));
        assert_eq!(divisor_of(16), None);
    }

    #[test]
    fn named_codes_match_table() {
        assert_eq!(Prescale::DIV_240.divisor(), Some(240));
        assert_eq!(Prescale::DIV_72K.divisor(), Some(72_000));
        assert_eq!(Prescale::NO_DIV.divisor(), Some(1));
    }

    #[test]
    fn code_wider_than_four_bits_is_rejected() {
        assert_eq!(Prescale::new(16), Err(Error::InvalidRange));
        assert_eq!(Prescale::try_from(255), Err(Error::InvalidRange));
        assert_eq!(Prescale::new(15), Ok(Prescale::NO_DIV));
    }

    #[test]
    fn one_kilohertz_from_div_240() {
        let freq = output_frequency(Prescale::DIV_240, 99).unwrap();
        assert_eq!(freq.to_Hz(), 1000);
    }

    #[test]
    fn frequency_edges() {
        // Zero cycles still divides by one
        assert_eq!(
            output_frequency(Prescale::NO_DIV, 0).map(|f| f.to_Hz()),
            Some(24_000_000)
        );
        assert_eq!(
            output_frequency(Prescale::DIV_72K, u16::MAX).map(|f| f.to_Hz()),
            Some(0)
        );
        assert_eq!(output_frequency(Prescale::from_bits(5), 99), None);
    }

    #[test]
    fn frequency_truncates() {
        // 24 MHz / 180 = 133333, / 3 = 44444
        assert_eq!(
            output_frequency(Prescale::DIV_180, 2).map(|f| f.to_Hz()),
            Some(44_444)
        );
    }
}
