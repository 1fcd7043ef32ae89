//! Port A pin function and pull configuration for the PWM outputs
//!
//! PWM0 comes out on PA5 and PWM1 on PA6. Both pins default to other
//! functions (PA5 is UART0 RX), so they have to be switched to their PWM
//! function before the channels drive anything.

use crate::mmio::HardwareAccessPort;

/// Port A base, which is also the Port A configure 0 register
pub const PORT_A_BASE: usize = 0x01c2_0800;

/// Offset of the Port A pull 0 register
pub const PULL0_OFFSET: usize = 0x1c;

/// Function select value of PA5/PA6 for PWM output on the H3
pub const FUNCTION_PWM: u8 = 0b011;

bitfield::bitfield! {
    /// Port A configure 0 register
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    #[derive(Clone, Copy, PartialEq, Eq, Default)]
    pub struct PortACfg0(u32);
    impl Debug;
    /// PA5 function select
    pub u8, pa5_select, set_pa5_select: 22, 20;
    /// PA6 function select
    pub u8, pa6_select, set_pa6_select: 26, 24;
}

bitfield::bitfield! {
    /// Port A pull 0 register
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    #[derive(Clone, Copy, PartialEq, Eq, Default)]
    pub struct PortAPull0(u32);
    impl Debug;
    /// PA5 pull configuration
    pub u8, pa5_pull, set_pa5_pull: 11, 10;
    /// PA6 pull configuration
    pub u8, pa6_pull, set_pa6_pull: 13, 12;
}

/// Pull configuration of a pin
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Pull {
    /// Floating
    Disabled = 0b00,
    /// Pull-up
    Up = 0b01,
    /// Pull-down
    Down = 0b10,
}

/// Function select of the two PWM pins, as read from the hardware
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinFunctions {
    /// Port A configure 0, as read
    pub raw: u32,
    /// PA5 function select
    pub pa5: u8,
    /// PA6 function select
    pub pa6: u8,
}

impl PinFunctions {
    /// Decode a Port A configure 0 value
    pub fn from_raw(raw: u32) -> Self {
        let cfg = PortACfg0(raw);
        PinFunctions {
            raw,
            pa5: cfg.pa5_select(),
            pa6: cfg.pa6_select(),
        }
    }

    /// Whether both pins are routed to the PWM block
    pub fn is_pwm(&self) -> bool {
        self.pa5 == FUNCTION_PWM && self.pa6 == FUNCTION_PWM
    }
}

/// Read the function select of PA5 and PA6
pub fn read_functions<P: HardwareAccessPort>(port: &mut P, cfg0: usize) -> PinFunctions {
    PinFunctions::from_raw(port.read32(cfg0))
}

/// Route PA5/PA6 to the PWM block and pull them up
///
/// Both registers are read-modify-written, other pins keep their setup.
pub fn route_pwm_pins<P: HardwareAccessPort>(port: &mut P, cfg0: usize, pull0: usize) {
    let mut cfg = PortACfg0(port.read32(cfg0));
    cfg.set_pa5_select(FUNCTION_PWM);
    cfg.set_pa6_select(FUNCTION_PWM);
    port.write32(cfg0, cfg.0);

    let mut pull = PortAPull0(port.read32(pull0));
    pull.set_pa5_pull(Pull::Up as u8);
    pull.set_pa6_pull(Pull::Up as u8);
    port.write32(pull0, pull.0);
}
