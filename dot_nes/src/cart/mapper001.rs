use super::Mirroring;
use bit_field::BitField;

/// 001, MMC1
///
/// Registers are loaded serially through a 5-bit shift register. Every
/// completed load recomputes all bank offsets from the four registers.
pub struct Mapper001 {
    shifter: u8,
    step: u8,

    control: u8,
    power_on: u8,
    chr_bank0: u8,
    chr_bank1: u8,
    prg_bank: u8,

    /// in 16KB units
    prg_banks: usize,
    /// in 4KB units
    chr_banks: usize,
    prg_offsets: [usize; 2],
    chr_offsets: [usize; 2],
}

impl Mapper001 {
    pub fn new(mirroring: Mirroring, prg_banks: usize, chr_banks: usize) -> Self {
        let mirroring_bits = match mirroring {
            Mirroring::Vertical => 0b10,
            _ => 0b11,
        };

        let power_on = 0x0c | mirroring_bits;
        let mut m = Self {
            shifter: 0,
            step: 0,

            control: power_on,
            power_on,
            chr_bank0: 0,
            chr_bank1: 0,
            prg_bank: 0,

            prg_banks,
            // CHR RAM is a single 8KB bank
            chr_banks: chr_banks.max(1) * 2,
            prg_offsets: [0; 2],
            chr_offsets: [0; 2],
        };
        m.update_banks();
        m
    }

    fn update_banks(&mut self) {
        let (prg_banks, chr_banks) = (self.prg_banks, self.chr_banks);
        let prg = |bank: usize| (bank % prg_banks) * 0x4000;
        let chr = |bank: usize| (bank % chr_banks) * 0x1000;

        let bank = self.prg_bank.get_bits(0..4) as usize;
        self.prg_offsets = match self.control.get_bits(2..4) {
            0b00 | 0b01 => [prg(bank & !1), prg(bank | 1)],
            0b10 => [prg(0), prg(bank)],
            _ => [prg(bank), prg(prg_banks - 1)],
        };

        self.chr_offsets = if self.control.get_bit(4) {
            [chr(self.chr_bank0 as usize), chr(self.chr_bank1 as usize)]
        } else {
            let bank = self.chr_bank0 as usize & !1;
            [chr(bank), chr(bank | 1)]
        };
    }

    fn load_register(&mut self, addr: u16, data: u8) {
        match addr {
            0x8000..=0x9fff => self.control = data,
            0xa000..=0xbfff => self.chr_bank0 = data,
            0xc000..=0xdfff => self.chr_bank1 = data,
            _ => self.prg_bank = data,
        }
        log::trace!("MMC1 ${:04X} <- {:05b}", addr & 0xe000, data);
        self.update_banks();
    }
}

impl super::Mapper for Mapper001 {
    fn prg_addr(&self, addr: u16) -> usize {
        self.prg_offsets[(addr >= 0xc000) as usize] + (addr as usize & 0x3fff)
    }

    fn write_prg(&mut self, addr: u16, data: u8) {
        if data.get_bit(7) {
            self.step = 0;
            self.shifter = 0;
            self.control = self.power_on;
            self.update_banks();
            return;
        }

        self.shifter >>= 1;
        self.shifter.set_bit(4, data.get_bit(0));

        self.step += 1;
        if self.step == 5 {
            self.load_register(addr, self.shifter);
            self.step = 0;
            self.shifter = 0;
        }
    }

    fn chr_addr(&self, addr: u16) -> usize {
        self.chr_offsets[(addr >> 12) as usize & 0x01] + (addr as usize & 0x0fff)
    }

    fn prg_ram_enabled(&self) -> bool {
        !self.prg_bank.get_bit(4)
    }

    fn mirroring(&self) -> Mirroring {
        match self.control.get_bits(0..2) {
            0b00 => Mirroring::SingleScreen0,
            0b01 => Mirroring::SingleScreen1,
            0b10 => Mirroring::Vertical,
            _ => Mirroring::Horizontal,
        }
    }
}
