//! APU register file. No waveforms are generated; only the state a program
//! can read back is modelled: length counters and the frame IRQ.

use bit_field::BitField;

mod frame;
mod length;

use frame::{FrameCounter, Step};
use length::LengthCounter;

pub const REGISTERS_SIZE: usize = 0x14;

const PULSE1: usize = 0;
const PULSE2: usize = 1;
const TRIANGLE: usize = 2;
const NOISE: usize = 3;

#[derive(Debug, Default)]
pub struct Apu {
    regs: [u8; REGISTERS_SIZE],
    frame: FrameCounter,
    lengths: [LengthCounter; 4],
    dmc_enabled: bool,
}

impl Apu {
    pub fn tick(&mut self) {
        let step = self.frame.tick();
        self.frame_tick(step);
    }

    fn frame_tick(&mut self, step: Step) {
        if step.contains(Step::LENGTH) {
            self.lengths.iter_mut().for_each(LengthCounter::clock);
        }
    }

    pub fn reset(&mut self) {
        self.write(0x4015, 0x00);
        self.frame.acknowledge();
    }

    /// Level of the frame interrupt line.
    pub fn irq(&self) -> bool {
        self.frame.irq()
    }

    /// $4015 read. Bit 5 is not driven and left to the caller.
    pub fn read_status(&mut self) -> u8 {
        let data = self.peek_status();
        self.frame.acknowledge();
        data
    }

    pub fn peek_status(&self) -> u8 {
        let mut data = 0u8;
        data.set_bit(6, self.frame.irq());
        data.set_bit(3, self.lengths[NOISE].active());
        data.set_bit(2, self.lengths[TRIANGLE].active());
        data.set_bit(1, self.lengths[PULSE2].active());
        data.set_bit(0, self.lengths[PULSE1].active());
        data
    }

    pub fn write(&mut self, addr: u16, data: u8) {
        match addr {
            0x4000..=0x4013 => {
                self.regs[(addr - 0x4000) as usize] = data;

                match addr {
                    0x4000 => self.lengths[PULSE1].set_halted(data.get_bit(5)),
                    0x4004 => self.lengths[PULSE2].set_halted(data.get_bit(5)),
                    0x4008 => self.lengths[TRIANGLE].set_halted(data.get_bit(7)),
                    0x400c => self.lengths[NOISE].set_halted(data.get_bit(5)),

                    0x4003 => self.lengths[PULSE1].load(data),
                    0x4007 => self.lengths[PULSE2].load(data),
                    0x400b => self.lengths[TRIANGLE].load(data),
                    0x400f => self.lengths[NOISE].load(data),
                    _ => {}
                }
            }
            0x4015 => {
                self.dmc_enabled = data.get_bit(4);
                self.lengths[NOISE].set_enabled(data.get_bit(3));
                self.lengths[TRIANGLE].set_enabled(data.get_bit(2));
                self.lengths[PULSE2].set_enabled(data.get_bit(1));
                self.lengths[PULSE1].set_enabled(data.get_bit(0));
            }
            0x4017 => {
                let step = self.frame.load(data);
                self.frame_tick(step);
            }
            _ => {}
        }
    }

    /// Last values written to $4000-$4013.
    pub fn registers(&self) -> &[u8; REGISTERS_SIZE] {
        &self.regs
    }

    pub fn dmc_enabled(&self) -> bool {
        self.dmc_enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_counter_status() {
        let mut apu = Apu::default();
        apu.write(0x4003, 0x08);
        assert_eq!(apu.peek_status(), 0x00);

        apu.write(0x4015, 0x01);
        apu.write(0x4003, 0x18); // length 2
        assert_eq!(apu.peek_status(), 0x01);

        // two half frames in 5-step mode: one on the write, one at 14913
        apu.write(0x4017, 0x80);
        assert_eq!(apu.peek_status(), 0x01);
        for _ in 0..14913 {
            apu.tick();
        }
        assert_eq!(apu.peek_status(), 0x00);
    }

    #[test]
    fn test_halt_holds_length() {
        let mut apu = Apu::default();
        apu.write(0x4015, 0x04);
        apu.write(0x4008, 0x80);
        apu.write(0x400b, 0x18);
        apu.write(0x4017, 0x80);
        assert_eq!(apu.peek_status(), 0x04);

        apu.write(0x4015, 0x00);
        assert_eq!(apu.peek_status(), 0x00);
    }

    #[test]
    fn test_frame_irq_acknowledged_by_read() {
        let mut apu = Apu::default();
        for _ in 0..29830 {
            apu.tick();
        }
        assert!(apu.irq());
        assert_eq!(apu.read_status() & 0x40, 0x40);
        assert!(!apu.irq());
        assert_eq!(apu.read_status() & 0x40, 0x00);
    }

    #[test]
    fn test_registers_stored() {
        let mut apu = Apu::default();
        apu.write(0x4011, 0x7f);
        apu.write(0x4015, 0x10);
        assert_eq!(apu.registers()[0x11], 0x7f);
        assert!(apu.dmc_enabled());
    }
}
