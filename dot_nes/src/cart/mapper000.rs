use super::Mirroring;

/// 000, NROM
///
/// 16KB PRG mirrored into both windows or 32KB mapped directly,
/// 8KB CHR ROM or RAM.
pub struct Mapper000 {
    prg_bank1: usize,
    mirroring: Mirroring,
}

impl Mapper000 {
    pub fn new(mirroring: Mirroring, prg_banks: usize) -> Self {
        Self {
            prg_bank1: prg_banks - 1,
            mirroring,
        }
    }
}

impl super::Mapper for Mapper000 {
    fn prg_addr(&self, addr: u16) -> usize {
        match addr {
            0x8000..=0xbfff => addr as usize - 0x8000,
            _ => addr as usize - 0xc000 + self.prg_bank1 * 0x4000,
        }
    }

    fn chr_addr(&self, addr: u16) -> usize {
        addr as usize
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }
}
