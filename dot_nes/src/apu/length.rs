use bit_field::BitField;

/// Indexed by bits 3-7 of the load value.
#[rustfmt::skip]
const LENGTHS: [u8; 32] = [
    10, 254, 20,  2, 40,  4, 80,  6, 160,  8, 60, 10, 14, 12, 26, 14,
    12,  16, 24, 18, 48, 20, 96, 22, 192, 24, 72, 26, 16, 28, 32, 30,
];

/// Length counter of one channel, the only channel state visible through
/// $4015.
#[derive(Debug, Default, Clone, Copy)]
pub struct LengthCounter {
    remaining: u8,
    enabled: bool,
    halted: bool,
}

impl LengthCounter {
    pub fn active(&self) -> bool {
        self.remaining > 0
    }

    /// Half-frame clock.
    pub fn clock(&mut self) {
        if !self.halted {
            self.remaining = self.remaining.saturating_sub(1);
        }
    }

    /// $4015 channel bit. Disabling silences the channel at once.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.remaining = 0;
        }
    }

    pub fn set_halted(&mut self, halted: bool) {
        self.halted = halted;
    }

    pub fn load(&mut self, data: u8) {
        if self.enabled {
            self.remaining = LENGTHS[data.get_bits(3..8) as usize];
        }
    }
}
