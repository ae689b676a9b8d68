use bit_field::BitField;

// mode 0:    mode 1:       function
// ---------  -----------  -----------------------------
//  - - - f    - - - - -    IRQ (if bit 6 is clear)
//  - l - l    - l - - l    Length counter

/// Half-frame points in CPU cycles since the last $4017 write.
const STEP2: u32 = 14913;
const STEP4: u32 = 29829;
const STEP5: u32 = 37281;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Step4,
    Step5,
}

bitflags::bitflags! {
    pub struct Step: u8 {
        const LENGTH = 0b01;
    }
}

#[derive(Debug)]
pub struct FrameCounter {
    cycles: u32,
    mode: Mode,
    irq_on: bool,
    irq_level: bool,
}

impl Default for FrameCounter {
    fn default() -> Self {
        Self {
            cycles: 0,
            mode: Mode::Step4,
            irq_on: true,
            irq_level: false,
        }
    }
}

impl FrameCounter {
    /// Advances one CPU cycle.
    pub fn tick(&mut self) -> Step {
        self.cycles += 1;

        let step = match (self.mode, self.cycles) {
            (_, STEP2) => Step::LENGTH,
            (Mode::Step4, STEP4) | (Mode::Step5, STEP5) => Step::LENGTH,
            _ => Step::empty(),
        };

        if self.mode == Mode::Step4 {
            // the flag is asserted on three consecutive cycles around the
            // last step
            if (STEP4 - 1..=STEP4 + 1).contains(&self.cycles) && self.irq_on {
                self.irq_level = true;
            }
            if self.cycles == STEP4 + 1 {
                self.cycles = 0;
            }
        } else if self.cycles == STEP5 + 1 {
            self.cycles = 0;
        }

        step
    }

    /// $4017 write. Selecting the 5-step mode clocks the length counters
    /// at once.
    pub fn load(&mut self, data: u8) -> Step {
        self.cycles = 0;

        self.mode = if data.get_bit(7) {
            Mode::Step5
        } else {
            Mode::Step4
        };

        self.irq_on = !data.get_bit(6);
        if !self.irq_on {
            self.irq_level = false;
        }

        match self.mode {
            Mode::Step5 => Step::LENGTH,
            Mode::Step4 => Step::empty(),
        }
    }

    pub fn irq(&self) -> bool {
        self.irq_level
    }

    pub fn acknowledge(&mut self) {
        self.irq_level = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(frame: &mut FrameCounter, cycles: u32) -> Vec<(u32, Step)> {
        (1..=cycles)
            .filter_map(|i| {
                let step = frame.tick();
                (!step.is_empty()).then(|| (i, step))
            })
            .collect()
    }

    #[test]
    fn test_four_step_sequence() {
        let mut frame = FrameCounter::default();
        let steps = run(&mut frame, STEP4 - 2);
        assert_eq!(steps, vec![(STEP2, Step::LENGTH)]);
        assert!(!frame.irq());

        let steps = run(&mut frame, 3);
        assert_eq!(steps, vec![(2, Step::LENGTH)]);
        assert!(frame.irq());

        frame.acknowledge();
        assert!(!frame.irq());
        // sequence restarted
        assert_eq!(run(&mut frame, STEP2).len(), 1);
    }

    #[test]
    fn test_irq_inhibit() {
        let mut frame = FrameCounter::default();
        frame.load(0x40);
        run(&mut frame, STEP4 + 1);
        assert!(!frame.irq());

        frame.load(0x00);
        run(&mut frame, STEP4 + 1);
        assert!(frame.irq());
        frame.load(0x40);
        assert!(!frame.irq());
    }

    #[test]
    fn test_five_step_sequence() {
        let mut frame = FrameCounter::default();
        assert_eq!(frame.load(0x80), Step::LENGTH);

        let steps = run(&mut frame, STEP5 + 1);
        assert_eq!(steps, vec![(STEP2, Step::LENGTH), (STEP5, Step::LENGTH)]);
        assert!(!frame.irq());
    }
}
