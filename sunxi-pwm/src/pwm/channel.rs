use fugit::HertzU32;

use super::{
    dyn_channel::{DynChannelId, DynMode},
    prescale::{output_frequency, Prescale},
};

/// Logical configuration of one channel
///
/// This is the source of truth for everything the driver writes to the
/// control and period registers. The hardware is never read back to
/// reconstruct it.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelState {
    id: DynChannelId,
    enabled: bool,
    polarity: bool,
    clock_gating: bool,
    mode: DynMode,
    pulse_start: bool,
    bypass: bool,
    prescale: Prescale,
    active_cycles: u16,
    total_cycles: u16,
}

impl ChannelState {
    /// A disabled channel with every field cleared
    pub const fn new(id: DynChannelId) -> Self {
        ChannelState {
            id,
            enabled: false,
            polarity: false,
            clock_gating: false,
            mode: DynMode::Continuous,
            pulse_start: false,
            bypass: false,
            prescale: Prescale::DIV_120,
            active_cycles: 0,
            total_cycles: 0,
        }
    }

    /// Channel this state belongs to
    #[inline]
    pub fn id(&self) -> DynChannelId {
        self.id
    }

    /// Whether the channel is enabled
    #[inline]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// `true` for active high, `false` for active low
    #[inline]
    pub fn polarity(&self) -> bool {
        self.polarity
    }

    /// Whether the clock is let through to the channel
    #[inline]
    pub fn clock_gating(&self) -> bool {
        self.clock_gating
    }

    /// Output mode
    #[inline]
    pub fn mode(&self) -> DynMode {
        self.mode
    }

    /// Pending single pulse trigger
    #[inline]
    pub fn pulse_start(&self) -> bool {
        self.pulse_start
    }

    /// Whether the 24 MHz clock bypasses the divider and goes straight out
    #[inline]
    pub fn bypass(&self) -> bool {
        self.bypass
    }

    /// Prescaler code
    #[inline]
    pub fn prescale(&self) -> Prescale {
        self.prescale
    }

    /// Ticks per period spent in the active state
    #[inline]
    pub fn active_cycles(&self) -> u16 {
        self.active_cycles
    }

    /// Ticks per period, minus one
    #[inline]
    pub fn total_cycles(&self) -> u16 {
        self.total_cycles
    }

    /// Output frequency, `None` while a reserved prescaler code is selected
    #[inline]
    pub fn frequency(&self) -> Option<HertzU32> {
        output_frequency(self.prescale, self.total_cycles)
    }

    /// Period register image: active cycles low, total cycles high
    #[inline]
    pub fn period_bits(&self) -> u32 {
        super::reg::pack_period(self.active_cycles, self.total_cycles)
    }

    /// Set the enable bit and return the other control fields to their
    /// defaults
    ///
    /// Polarity, gating, mode and prescaler are reset on every call, also
    /// when disabling. Consumers may rely on a disable leaving the pin in
    /// this known state.
    pub(crate) fn set_enabled(&mut self, value: bool) {
        self.enabled = value;
        self.polarity = true;
        self.clock_gating = true;
        self.mode = DynMode::Continuous;
        self.prescale = Prescale::DIV_240;
    }

    pub(crate) fn set_polarity(&mut self, value: bool) {
        self.polarity = value;
    }

    pub(crate) fn set_clock_gating(&mut self, value: bool) {
        self.clock_gating = value;
    }

    pub(crate) fn set_mode(&mut self, mode: DynMode) {
        self.mode = mode;
    }

    pub(crate) fn set_pulse_start(&mut self, value: bool) {
        self.pulse_start = value;
    }

    pub(crate) fn set_bypass(&mut self, value: bool) {
        self.bypass = value;
    }

    pub(crate) fn set_prescale(&mut self, prescale: Prescale) {
        self.prescale = prescale;
    }

    pub(crate) fn set_active_cycles(&mut self, value: u16) {
        self.active_cycles = value;
    }

    pub(crate) fn set_total_cycles(&mut self, value: u16) {
        self.total_cycles = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_disabled() {
        let state = ChannelState::new(DynChannelId::Ch1);
        assert_eq!(state.id(), DynChannelId::Ch1);
        assert!(!state.enabled());
        assert_eq!(state.total_cycles(), 0);
    }

    #[test]
    fn enable_then_disable_still_resets() {
        let mut state = ChannelState::new(DynChannelId::Ch0);
        state.set_enabled(true);
        state.set_polarity(false);
        state.set_clock_gating(false);
        state.set_mode(DynMode::SinglePulse);
        state.set_prescale(Prescale::DIV_72K);

        state.set_enabled(false);

        assert!(!state.enabled());
        assert!(state.polarity());
        assert!(state.clock_gating());
        assert_eq!(state.mode(), DynMode::Continuous);
        assert_eq!(state.prescale(), Prescale::DIV_240);
    }

    #[test]
    fn enable_keeps_cycles_and_bypass() {
        let mut state = ChannelState::new(DynChannelId::Ch0);
        state.set_total_cycles(99);
        state.set_active_cycles(50);
        state.set_bypass(true);

        state.set_enabled(true);

        assert_eq!(state.total_cycles(), 99);
        assert_eq!(state.active_cycles(), 50);
        assert!(state.bypass());
    }

    #[test]
    fn setters_leave_enable_alone() {
        let mut state = ChannelState::new(DynChannelId::Ch0);
        state.set_enabled(true);
        state.set_polarity(false);
        state.set_prescale(Prescale::DIV_12K);
        state.set_total_cycles(u16::MAX);
        state.set_active_cycles(u16::MAX);
        assert!(state.enabled());
        assert!(!state.polarity());
    }

    #[test]
    fn duty_may_exceed_period() {
        let mut state = ChannelState::new(DynChannelId::Ch0);
        state.set_total_cycles(10);
        state.set_active_cycles(20);
        assert_eq!(state.period_bits(), 10 << 16 | 20);
    }

    #[test]
    fn frequency_follows_state() {
        let mut state = ChannelState::new(DynChannelId::Ch0);
        state.set_enabled(true);
        state.set_total_cycles(99);
        assert_eq!(state.frequency().map(|f| f.to_Hz()), Some(1000));

        state.set_prescale(Prescale::new(13).unwrap());
        assert_eq!(state.frequency(), None);
    }
}
