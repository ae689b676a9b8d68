/// OAM-DMA sequencer. One call to `tick` per CPU cycle of the transfer.
#[derive(Debug, Default)]
pub struct Dma {
    active: bool,
    page: u16,
    step: u16,
    delay_ticks: u8,
}

impl Dma {
    pub fn reset(&mut self) {
        self.active = false;
    }

    pub fn active(&self) -> bool {
        self.active
    }

    /// `cycles` is the count after the triggering write: one stall cycle
    /// when it is even, two when odd.
    pub fn start(&mut self, cycles: usize, page: u8) {
        self.page = (page as u16) << 8;
        self.step = 0;
        self.active = true;
        self.delay_ticks = 1 + (cycles % 2 != 0) as u8;
    }

    /// `None` for an alignment cycle, otherwise the next source address.
    pub fn tick(&mut self) -> Option<u16> {
        if self.delay_ticks > 0 {
            self.delay_ticks -= 1;
            None
        } else {
            let r = Some(self.page + self.step);

            self.step += 1;
            if self.step == 0x100 {
                self.active = false;
            }

            r
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alignment() {
        let mut dma = Dma::default();
        dma.start(10, 0x02);
        assert_eq!(dma.tick(), None);
        assert_eq!(dma.tick(), Some(0x0200));

        dma.start(11, 0x03);
        assert_eq!(dma.tick(), None);
        assert_eq!(dma.tick(), None);
        assert_eq!(dma.tick(), Some(0x0300));
    }

    #[test]
    fn test_full_page() {
        let mut dma = Dma::default();
        dma.start(0, 0x07);
        let addrs: Vec<u16> = std::iter::from_fn(|| dma.active().then(|| dma.tick()))
            .flatten()
            .collect();
        assert_eq!(addrs.len(), 0x100);
        assert_eq!(addrs[0xff], 0x07ff);
        assert!(!dma.active());
    }
}
