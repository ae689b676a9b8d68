use bit_field::BitField;

mod mapper000;
mod mapper001;

pub use mapper000::Mapper000;
pub use mapper001::Mapper001;

const HEADER_SIZE: usize = 0x10;
const TRAINER_SIZE: usize = 0x200;
const PRG_BANK_SIZE: usize = 0x4000;
const CHR_BANK_SIZE: usize = 0x2000;
const PRG_RAM_SIZE: usize = 0x2000;
const CHR_RAM_SIZE: usize = 0x2000;

const MIRRORING_MAP: [[usize; 4]; 5] = [
    [0x000, 0x000, 0x400, 0x400], // Horizontal
    [0x000, 0x400, 0x000, 0x400], // Vertical
    [0x000, 0x000, 0x000, 0x000], // SingleScreen0
    [0x400, 0x400, 0x400, 0x400], // SingleScreen1
    [0x000, 0x400, 0x800, 0xc00], // FourScreen
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum Mirroring {
    Horizontal = 0,
    Vertical = 1,
    SingleScreen0 = 2,
    SingleScreen1 = 3,
    FourScreen = 4,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartridgeError {
    /// The image does not start with `NES\x1a`.
    BadSignature,
    /// The image is shorter than its header says.
    Truncated { expected: usize, actual: usize },
    NoPrgBanks,
    /// The mapper cannot address this many PRG banks.
    InvalidBankCount { mapper: u8, prg_banks: usize },
    UnsupportedMapper(u8),
}

impl std::fmt::Display for CartridgeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CartridgeError::BadSignature => write!(f, "missing iNES signature"),
            CartridgeError::Truncated { expected, actual } => {
                write!(f, "image truncated: need {} bytes, got {}", expected, actual)
            }
            CartridgeError::NoPrgBanks => write!(f, "header declares no PRG banks"),
            CartridgeError::InvalidBankCount { mapper, prg_banks } => {
                write!(f, "mapper {:03} cannot map {} PRG banks", mapper, prg_banks)
            }
            CartridgeError::UnsupportedMapper(n) => write!(f, "unsupported mapper {:03}", n),
        }
    }
}

impl std::error::Error for CartridgeError {}

/// Translates CPU and PPU cartridge addresses into ROM/RAM offsets.
#[allow(unused_variables)]
pub trait Mapper {
    /// Offset into PRG ROM for `addr` in $8000-$FFFF.
    fn prg_addr(&self, addr: u16) -> usize;
    /// Register write into $8000-$FFFF.
    fn write_prg(&mut self, addr: u16, data: u8) {}

    /// Offset into CHR memory for a pattern table address in $0000-$1FFF.
    fn chr_addr(&self, addr: u16) -> usize;

    fn prg_ram_enabled(&self) -> bool {
        true
    }

    fn mirroring(&self) -> Mirroring;
}

pub struct Cartridge {
    prg_ram: Box<[u8; PRG_RAM_SIZE]>,
    prg_rom: Vec<u8>,
    chr: Vec<u8>,
    chr_is_ram: bool,

    mapper_type: u8,
    mapper: Box<dyn Mapper + Send + Sync>,
}

impl Cartridge {
    /// A 16KB NROM board whose vectors all point at `JMP $FF00`.
    pub fn empty() -> Self {
        let mut prg_rom = vec![0xeau8; PRG_BANK_SIZE];
        prg_rom[0x3f00..][..3].copy_from_slice(&[0x4c, 0x00, 0xff]);
        prg_rom[0x3ffa..].copy_from_slice(&[0x00, 0xff, 0x00, 0xff, 0x00, 0xff]);

        Self {
            prg_ram: Box::new([0u8; PRG_RAM_SIZE]),
            prg_rom,
            chr: vec![0u8; CHR_RAM_SIZE],
            chr_is_ram: true,

            mapper_type: 0,
            mapper: Box::new(Mapper000::new(Mirroring::Horizontal, 1)),
        }
    }

    /// Parses an iNES image. Nothing is built unless the whole image checks
    /// out.
    pub fn load(data: &[u8]) -> Result<Self, CartridgeError> {
        if data.len() < HEADER_SIZE {
            return Err(CartridgeError::Truncated {
                expected: HEADER_SIZE,
                actual: data.len(),
            });
        }
        if data[..4] != [b'N', b'E', b'S', 0x1a] {
            return Err(CartridgeError::BadSignature);
        }

        let f6 = data[6];
        let trainer = f6.get_bit(2);
        let mirroring = if f6.get_bit(3) {
            Mirroring::FourScreen
        } else if f6.get_bit(0) {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        };

        let mapper_type = (data[7] & 0xf0) | (f6 >> 4);
        let prg_banks = data[4] as usize;
        let chr_banks = data[5] as usize;

        if prg_banks == 0 {
            return Err(CartridgeError::NoPrgBanks);
        }

        let mapper: Box<dyn Mapper + Send + Sync> = match mapper_type {
            0 => {
                if prg_banks > 2 {
                    return Err(CartridgeError::InvalidBankCount {
                        mapper: mapper_type,
                        prg_banks,
                    });
                }
                Box::new(Mapper000::new(mirroring, prg_banks))
            }
            1 => Box::new(Mapper001::new(mirroring, prg_banks, chr_banks)),
            _ => return Err(CartridgeError::UnsupportedMapper(mapper_type)),
        };

        let offset = HEADER_SIZE + (trainer as usize) * TRAINER_SIZE;
        let prg_len = prg_banks * PRG_BANK_SIZE;
        let chr_len = chr_banks * CHR_BANK_SIZE;
        let expected = offset + prg_len + chr_len;
        if data.len() < expected {
            return Err(CartridgeError::Truncated {
                expected,
                actual: data.len(),
            });
        }

        let prg_rom = data[offset..][..prg_len].to_vec();
        let (chr, chr_is_ram) = if chr_banks == 0 {
            (vec![0u8; CHR_RAM_SIZE], true)
        } else {
            (data[offset + prg_len..][..chr_len].to_vec(), false)
        };

        log::info!(
            "mapper {:03}, PRG ROM {} * 16KB, CHR {} * 8KB{}, mirroring {:?}",
            mapper_type,
            prg_banks,
            chr_banks,
            if chr_is_ram { " (RAM)" } else { "" },
            mirroring
        );

        Ok(Self {
            prg_ram: Box::new([0u8; PRG_RAM_SIZE]),
            prg_rom,
            chr,
            chr_is_ram,

            mapper_type,
            mapper,
        })
    }

    pub fn mapper_type(&self) -> u8 {
        self.mapper_type
    }

    /// CPU read in $4020-$FFFF. `None` means nothing drives the bus.
    pub fn cpu_read(&self, addr: u16) -> Option<u8> {
        match addr {
            0x4020..=0x5fff => None,
            0x6000..=0x7fff => {
                if self.mapper.prg_ram_enabled() {
                    Some(self.prg_ram[addr as usize - 0x6000])
                } else {
                    None
                }
            }
            0x8000..=0xffff => {
                let offset = self.mapper.prg_addr(addr) % self.prg_rom.len();
                Some(self.prg_rom[offset])
            }
            _ => unreachable!(),
        }
    }

    pub fn cpu_write(&mut self, addr: u16, data: u8) {
        match addr {
            0x4020..=0x5fff => {}
            0x6000..=0x7fff => {
                if self.mapper.prg_ram_enabled() {
                    self.prg_ram[addr as usize - 0x6000] = data;
                }
            }
            0x8000..=0xffff => self.mapper.write_prg(addr, data),
            _ => unreachable!(),
        }
    }

    pub fn chr_read(&self, addr: u16) -> u8 {
        let offset = self.mapper.chr_addr(addr & 0x1fff) % self.chr.len();
        self.chr[offset]
    }

    /// Only CHR RAM takes the write.
    pub fn chr_write(&mut self, addr: u16, data: u8) {
        if self.chr_is_ram {
            let offset = self.mapper.chr_addr(addr & 0x1fff) % self.chr.len();
            self.chr[offset] = data;
        }
    }

    pub fn mirroring(&self) -> Mirroring {
        self.mapper.mirroring()
    }

    /// Offset into the 4KB nametable RAM for a $2000-$3EFF address.
    pub fn nm_addr(&self, addr: u16) -> usize {
        let n = (addr as usize & 0x0fff) >> 10;
        let addr = addr as usize & 0x3ff;
        MIRRORING_MAP[self.mirroring() as usize][n] + addr
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn image(mapper: u8, prg_banks: u8, chr_banks: u8, flags6: u8) -> Vec<u8> {
        let mut data = vec![
            b'N',
            b'E',
            b'S',
            0x1a,
            prg_banks,
            chr_banks,
            (mapper << 4) | (flags6 & 0x0f),
            mapper & 0xf0,
        ];
        data.resize(HEADER_SIZE, 0);
        for bank in 0..prg_banks {
            data.extend(std::iter::repeat(bank).take(PRG_BANK_SIZE));
        }
        for bank in 0..chr_banks {
            data.extend(std::iter::repeat(0x80 | bank).take(CHR_BANK_SIZE));
        }
        data
    }

    #[test]
    fn test_load_errors() {
        assert_eq!(
            Cartridge::load(&[0u8; 4]).err(),
            Some(CartridgeError::Truncated {
                expected: 16,
                actual: 4
            })
        );

        let mut data = image(0, 1, 1, 0);
        data[0] = b'X';
        assert_eq!(Cartridge::load(&data).err(), Some(CartridgeError::BadSignature));

        let data = image(4, 1, 1, 0);
        assert_eq!(Cartridge::load(&data).err(), Some(CartridgeError::UnsupportedMapper(4)));

        let mut data = image(0, 2, 1, 0);
        data.truncate(data.len() - 1);
        assert!(matches!(
            Cartridge::load(&data),
            Err(CartridgeError::Truncated { .. })
        ));

        let data = image(0, 3, 0, 0);
        assert!(matches!(
            Cartridge::load(&data),
            Err(CartridgeError::InvalidBankCount { .. })
        ));

        let data = image(1, 0, 0, 0);
        assert_eq!(Cartridge::load(&data).err(), Some(CartridgeError::NoPrgBanks));
    }

    #[test]
    fn test_trainer_is_skipped() {
        let mut data = image(0, 1, 0, 0b0100);
        let prg = data.split_off(HEADER_SIZE);
        data.extend(std::iter::repeat(0xaa).take(TRAINER_SIZE));
        data.extend(prg);

        let cart = Cartridge::load(&data).unwrap();
        assert_eq!(cart.cpu_read(0x8000), Some(0));
    }

    #[test]
    fn test_chr_ram_and_rom() {
        let mut cart = Cartridge::load(&image(0, 1, 0, 0)).unwrap();
        cart.chr_write(0x0123, 0x5a);
        assert_eq!(cart.chr_read(0x0123), 0x5a);

        let mut cart = Cartridge::load(&image(0, 1, 1, 0)).unwrap();
        cart.chr_write(0x0123, 0x5a);
        assert_eq!(cart.chr_read(0x0123), 0x80);
    }

    #[test]
    fn test_expansion_is_unmapped() {
        let mut cart = Cartridge::load(&image(0, 1, 1, 0)).unwrap();
        cart.cpu_write(0x5000, 0x12);
        assert_eq!(cart.cpu_read(0x5000), None);

        cart.cpu_write(0x6000, 0x34);
        assert_eq!(cart.cpu_read(0x6000), Some(0x34));
    }

    #[test]
    fn test_nametable_mirroring() {
        let cart = Cartridge::load(&image(0, 1, 1, 0)).unwrap();
        assert_eq!(cart.mirroring(), Mirroring::Horizontal);
        assert_eq!(cart.nm_addr(0x2400), 0x000);
        assert_eq!(cart.nm_addr(0x2800), 0x400);

        let cart = Cartridge::load(&image(0, 1, 1, 1)).unwrap();
        assert_eq!(cart.nm_addr(0x2400), 0x400);
        assert_eq!(cart.nm_addr(0x2c05), 0x405);
        assert_eq!(cart.nm_addr(0x3005), 0x005);

        let cart = Cartridge::load(&image(0, 1, 1, 0b1000)).unwrap();
        assert_eq!(cart.mirroring(), Mirroring::FourScreen);
        assert_eq!(cart.nm_addr(0x2c05), 0xc05);
    }
}
