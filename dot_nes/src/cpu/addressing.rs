use super::Cpu;
use crate::bus::{Bus, OpenBusRule};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::upper_case_acronyms)]
pub enum AddrMode {
    IMP,
    ACC,
    IMM,
    ZEP,
    ZPX,
    ZPY,
    IZX,
    IZY,
    ABS,
    ABX,
    ABY,
    IND,
    REL,
}

impl AddrMode {
    /// Resolution of a read that lands on an address nothing drives.
    ///
    /// A plain absolute load sees the address high byte still floating on
    /// the bus from the operand fetch. Every other class, absolute indexed
    /// included, sees whatever the latch already holds.
    pub fn open_bus_rule(self) -> OpenBusRule {
        match self {
            AddrMode::ABS => OpenBusRule::AddressHigh,
            _ => OpenBusRule::Latch,
        }
    }
}

#[rustfmt::skip]
pub const ADDR_MODES: [AddrMode; 256] = {
    use AddrMode::*;
    //  00   01   02   03   04   05   06   07   08   09   0a   0b   0c   0d   0e   0f
    [
        IMP, IZX, IMP, IZX, ZEP, ZEP, ZEP, ZEP, IMP, IMM, ACC, IMM, ABS, ABS, ABS, ABS, // 00
        REL, IZY, IMP, IZY, ZPX, ZPX, ZPX, ZPX, IMP, ABY, IMP, ABY, ABX, ABX, ABX, ABX, // 10
        ABS, IZX, IMP, IZX, ZEP, ZEP, ZEP, ZEP, IMP, IMM, ACC, IMM, ABS, ABS, ABS, ABS, // 20
        REL, IZY, IMP, IZY, ZPX, ZPX, ZPX, ZPX, IMP, ABY, IMP, ABY, ABX, ABX, ABX, ABX, // 30
        IMP, IZX, IMP, IZX, ZEP, ZEP, ZEP, ZEP, IMP, IMM, ACC, IMM, ABS, ABS, ABS, ABS, // 40
        REL, IZY, IMP, IZY, ZPX, ZPX, ZPX, ZPX, IMP, ABY, IMP, ABY, ABX, ABX, ABX, ABX, // 50
        IMP, IZX, IMP, IZX, ZEP, ZEP, ZEP, ZEP, IMP, IMM, ACC, IMM, IND, ABS, ABS, ABS, // 60
        REL, IZY, IMP, IZY, ZPX, ZPX, ZPX, ZPX, IMP, ABY, IMP, ABY, ABX, ABX, ABX, ABX, // 70
        IMM, IZX, IMM, IZX, ZEP, ZEP, ZEP, ZEP, IMP, IMM, IMP, IMM, ABS, ABS, ABS, ABS, // 80
        REL, IZY, IMP, IZY, ZPX, ZPX, ZPY, ZPY, IMP, ABY, IMP, ABY, ABX, ABX, ABY, ABY, // 90
        IMM, IZX, IMM, IZX, ZEP, ZEP, ZEP, ZEP, IMP, IMM, IMP, IMM, ABS, ABS, ABS, ABS, // a0
        REL, IZY, IMP, IZY, ZPX, ZPX, ZPY, ZPY, IMP, ABY, IMP, ABY, ABX, ABX, ABY, ABY, // b0
        IMM, IZX, IMM, IZX, ZEP, ZEP, ZEP, ZEP, IMP, IMM, IMP, IMM, ABS, ABS, ABS, ABS, // c0
        REL, IZY, IMP, IZY, ZPX, ZPX, ZPX, ZPX, IMP, ABY, IMP, ABY, ABX, ABX, ABX, ABX, // d0
        IMM, IZX, IMM, IZX, ZEP, ZEP, ZEP, ZEP, IMP, IMM, IMP, IMM, ABS, ABS, ABS, ABS, // e0
        REL, IZY, IMP, IZY, ZPX, ZPX, ZPX, ZPX, IMP, ABY, IMP, ABY, ABX, ABX, ABX, ABX, // f0
    ]
};

impl Cpu {
    /// Resolves the effective address of the current opcode.
    ///
    /// Each bus access ticks one cycle, so the internal cycles of the
    /// indexed modes are ticked here to land the operand access on the
    /// right cycle. A page-sensitive read only pays its extra cycle when
    /// the index carries into the high byte; stores and read-modify-write
    /// opcodes always pay it.
    pub(crate) fn addressing(&mut self, mode: AddrMode, page_sensitive: bool, bus: &mut Bus) {
        self.op_address = 0;
        self.op_base = 0;
        self.op_mode = mode;
        self.cross_page = false;

        match mode {
            AddrMode::IMP | AddrMode::ACC => {}
            AddrMode::IMM => {
                self.op_address = self.pc;
                self.pc = self.pc.wrapping_add(1);
            }
            AddrMode::ZEP => {
                self.op_address = self.fetch_byte(bus) as u16;
            }
            AddrMode::ZPX => {
                let base = self.fetch_byte(bus);
                bus.tick();
                self.op_address = base.wrapping_add(self.x) as u16;
            }
            AddrMode::ZPY => {
                let base = self.fetch_byte(bus);
                bus.tick();
                self.op_address = base.wrapping_add(self.y) as u16;
            }
            AddrMode::IZX => {
                let base = self.fetch_byte(bus);
                bus.tick();
                let base = base.wrapping_add(self.x);
                let lb = bus.read(base as u16) as u16;
                let hb = bus.read(base.wrapping_add(1) as u16) as u16;

                self.op_address = (hb << 8) | lb;
            }
            AddrMode::IZY => {
                let base = self.fetch_byte(bus);
                let lb = bus.read(base as u16) as u16;
                let hb = bus.read(base.wrapping_add(1) as u16) as u16;

                let base = (hb << 8) | lb;
                self.index(base, self.y as u16, page_sensitive, bus);
            }
            AddrMode::ABS => {
                self.op_address = self.fetch_word(bus);
            }
            AddrMode::ABX => {
                let base = self.fetch_word(bus);
                self.index(base, self.x as u16, page_sensitive, bus);
            }
            AddrMode::ABY => {
                let base = self.fetch_word(bus);
                self.index(base, self.y as u16, page_sensitive, bus);
            }
            AddrMode::IND => {
                let base = self.fetch_word(bus);
                let lb = bus.read(base) as u16;
                // the high byte never carries out of the pointer's page
                let hb = bus.read((base & 0xff00) | (base.wrapping_add(1) & 0x00ff)) as u16;
                self.op_address = (hb << 8) | lb;
            }
            AddrMode::REL => {
                let rel = self.fetch_byte(bus);
                self.op_address = self.pc.wrapping_add(rel as i8 as i16 as u16);
                self.check_page(self.pc, self.op_address);
            }
        }
    }

    fn index(&mut self, base: u16, offset: u16, page_sensitive: bool, bus: &mut Bus) {
        self.op_base = base;
        self.op_address = base.wrapping_add(offset);
        self.check_page(base, self.op_address);

        if !page_sensitive {
            bus.tick();
        } else if self.cross_page {
            bus.tick();
            self.penalty += 1;
        }
    }

    fn check_page(&mut self, addr1: u16, addr2: u16) {
        self.cross_page = (addr1 & 0xff00) != (addr2 & 0xff00);
    }
}
