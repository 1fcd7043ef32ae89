//! Register file double used by the unit tests

use std::collections::BTreeMap;
use std::vec::Vec;

use crate::mmio::HardwareAccessPort;
use crate::pwm::Config;

const BUSY: [u32; 2] = [1 << 28, 1 << 29];

/// Plain memory with a simulated busy flag per period register.
///
/// The control register drops writes to bits 28/29, like the hardware does.
/// `hold_busy` makes the next `n` control reads report a channel as busy.
#[derive(Default)]
pub(crate) struct MockPort {
    regs: BTreeMap<usize, u32>,
    busy_reads: [u32; 2],
    stuck: [bool; 2],
    control: usize,
    pub writes: Vec<(usize, u32)>,
    pub control_reads: usize,
}

impl MockPort {
    pub fn new() -> Self {
        MockPort {
            control: Config::default().control,
            ..Default::default()
        }
    }

    pub fn preset(&mut self, address: usize, value: u32) {
        self.regs.insert(address, value);
    }

    pub fn get(&self, address: usize) -> u32 {
        self.regs.get(&address).copied().unwrap_or(0)
    }

    pub fn hold_busy(&mut self, channel: usize, reads: u32) {
        self.busy_reads[channel] = reads;
    }

    pub fn stick_busy(&mut self, channel: usize) {
        self.stuck[channel] = true;
    }

    pub fn writes_to(&self, address: usize) -> Vec<u32> {
        self.writes
            .iter()
            .filter(|(a, _)| *a == address)
            .map(|(_, v)| *v)
            .collect()
    }
}

impl HardwareAccessPort for MockPort {
    fn read32(&mut self, address: usize) -> u32 {
        let mut value = self.get(address);
        if address == self.control {
            self.control_reads += 1;
            for ch in 0..2 {
                if self.stuck[ch] {
                    value |= BUSY[ch];
                } else if self.busy_reads[ch] > 0 {
                    self.busy_reads[ch] -= 1;
                    value |= BUSY[ch];
                }
            }
        }
        value
    }

    fn write32(&mut self, address: usize, value: u32) {
        self.writes.push((address, value));
        let stored = if address == self.control {
            value & !(BUSY[0] | BUSY[1])
        } else {
            value
        };
        self.regs.insert(address, stored);
    }
}
