#![allow(dead_code)]

use dot_nes::{Bus, Cartridge, Cpu};

const PRG_BANK_SIZE: usize = 0x4000;
const CHR_BANK_SIZE: usize = 0x2000;

/// Builds iNES images in memory. `$8000-$BFFF` is the first PRG bank and
/// `$C000-$FFFF` the last, which is where both mappers put them at
/// power-on.
pub struct RomBuilder {
    mapper: u8,
    flags6: u8,
    prg: Vec<u8>,
    chr_banks: u8,
}

impl RomBuilder {
    pub fn nrom(prg_banks: u8) -> Self {
        Self::new(0, prg_banks)
    }

    pub fn mmc1(prg_banks: u8) -> Self {
        Self::new(1, prg_banks)
    }

    fn new(mapper: u8, prg_banks: u8) -> Self {
        let mut prg = vec![0xeau8; prg_banks as usize * PRG_BANK_SIZE];
        // every bank starts with its own number
        for bank in 0..prg_banks as usize {
            prg[bank * PRG_BANK_SIZE] = bank as u8;
        }

        Self {
            mapper,
            flags6: 0,
            prg,
            chr_banks: 0,
        }
    }

    pub fn vertical(mut self) -> Self {
        self.flags6 |= 0x01;
        self
    }

    pub fn chr_banks(mut self, n: u8) -> Self {
        self.chr_banks = n;
        self
    }

    fn offset(&self, addr: u16) -> usize {
        let addr = addr as usize;
        if addr >= 0xc000 {
            self.prg.len() - PRG_BANK_SIZE + addr - 0xc000
        } else {
            addr - 0x8000
        }
    }

    pub fn code(mut self, addr: u16, code: &[u8]) -> Self {
        let offset = self.offset(addr);
        self.prg[offset..][..code.len()].copy_from_slice(code);
        self
    }

    pub fn vectors(self, nmi: u16, reset: u16, irq: u16) -> Self {
        let [n0, n1] = nmi.to_le_bytes();
        let [r0, r1] = reset.to_le_bytes();
        let [i0, i1] = irq.to_le_bytes();
        self.code(0xfffa, &[n0, n1, r0, r1, i0, i1])
    }

    pub fn build(&self) -> Vec<u8> {
        let mut data = vec![
            b'N',
            b'E',
            b'S',
            0x1a,
            (self.prg.len() / PRG_BANK_SIZE) as u8,
            self.chr_banks,
            (self.mapper << 4) | self.flags6,
            self.mapper & 0xf0,
        ];
        data.resize(16, 0);
        data.extend_from_slice(&self.prg);
        data.resize(data.len() + self.chr_banks as usize * CHR_BANK_SIZE, 0);
        data
    }

    pub fn cartridge(&self) -> Cartridge {
        Cartridge::load(&self.build()).unwrap()
    }
}

/// CPU and bus over the default board with `code` in RAM at `addr`.
pub fn program_at(addr: u16, code: &[u8]) -> (Cpu, Bus) {
    let mut bus = Bus::new(Cartridge::empty());
    let mut cpu = Cpu::default();
    cpu.reset(&mut bus);

    for (i, &b) in code.iter().enumerate() {
        bus.write(addr + i as u16, b);
    }
    cpu.set_pc(addr);
    (cpu, bus)
}

pub fn program(code: &[u8]) -> (Cpu, Bus) {
    program_at(0x0300, code)
}

/// Ticks the bus until the PPU is about to run `(line, dot)`.
pub fn run_to(bus: &mut Bus, line: usize, dot: usize) {
    // a CPU cycle is three dots, so stop on the first cycle past the target
    while {
        let (l, d) = bus.ppu().position();
        l != line || d < dot || d >= dot + 3
    } {
        bus.tick();
    }
}
