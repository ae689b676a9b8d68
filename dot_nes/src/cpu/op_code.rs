use super::addressing::{AddrMode, ADDR_MODES};
use super::Cpu;
use crate::Bus;

type Op = fn(&mut Cpu, &mut Bus);

/// `XAA` and `LXA` OR the accumulator with a chip-dependent constant first.
const XAA_MAGIC: u8 = 0xee;
const LXA_MAGIC: u8 = 0xff;

/// One decoded entry of the dispatch table.
#[derive(Clone, Copy)]
pub struct OpCode {
    pub name: &'static str,
    pub mode: AddrMode,
    pub func: Op,
    /// base cycle cost, penalties excluded
    pub cycles: u8,
    /// pays one more cycle when the indexed address crosses a page
    pub page_sensitive: bool,
}

impl OpCode {
    pub fn decode(op: u8) -> Option<&'static OpCode> {
        OP_TABLE[op as usize].as_ref()
    }
}

lazy_static::lazy_static! {
    static ref OP_TABLE: [Option<OpCode>; 256] = {
        let mut table = [None; 256];
        table.iter_mut().enumerate().for_each(|(op, entry)| {
            // a zero cycle count marks the opcodes that lock up the chip
            if OP_CYCLES[op] != 0 {
                *entry = Some(OpCode {
                    name: OP_NAMES[op],
                    mode: ADDR_MODES[op],
                    func: OP_FUNCS[op],
                    cycles: OP_CYCLES[op],
                    page_sensitive: OP_PAGE_SENSITIVE[op] != 0,
                });
            }
        });
        table
    };
}

#[rustfmt::skip]
const OP_FUNCS: [Op; 256] = [
//     00        01        02        03        04        05        06        07        08        09        0a        0b        0c        0d        0e        0f
    Cpu::brk, Cpu::ora, Cpu::jam, Cpu::slo, Cpu::nop, Cpu::ora, Cpu::asl, Cpu::slo, Cpu::php, Cpu::ora, Cpu::asl, Cpu::anc, Cpu::nop, Cpu::ora, Cpu::asl, Cpu::slo, // 00
    Cpu::bpl, Cpu::ora, Cpu::jam, Cpu::slo, Cpu::nop, Cpu::ora, Cpu::asl, Cpu::slo, Cpu::clc, Cpu::ora, Cpu::nop, Cpu::slo, Cpu::nop, Cpu::ora, Cpu::asl, Cpu::slo, // 10
    Cpu::jsr, Cpu::and, Cpu::jam, Cpu::rla, Cpu::bit, Cpu::and, Cpu::rol, Cpu::rla, Cpu::plp, Cpu::and, Cpu::rol, Cpu::anc, Cpu::bit, Cpu::and, Cpu::rol, Cpu::rla, // 20
    Cpu::bmi, Cpu::and, Cpu::jam, Cpu::rla, Cpu::nop, Cpu::and, Cpu::rol, Cpu::rla, Cpu::sec, Cpu::and, Cpu::nop, Cpu::rla, Cpu::nop, Cpu::and, Cpu::rol, Cpu::rla, // 30
    Cpu::rti, Cpu::eor, Cpu::jam, Cpu::sre, Cpu::nop, Cpu::eor, Cpu::lsr, Cpu::sre, Cpu::pha, Cpu::eor, Cpu::lsr, Cpu::alr, Cpu::jmp, Cpu::eor, Cpu::lsr, Cpu::sre, // 40
    Cpu::bvc, Cpu::eor, Cpu::jam, Cpu::sre, Cpu::nop, Cpu::eor, Cpu::lsr, Cpu::sre, Cpu::cli, Cpu::eor, Cpu::nop, Cpu::sre, Cpu::nop, Cpu::eor, Cpu::lsr, Cpu::sre, // 50
    Cpu::rts, Cpu::adc, Cpu::jam, Cpu::rra, Cpu::nop, Cpu::adc, Cpu::ror, Cpu::rra, Cpu::pla, Cpu::adc, Cpu::ror, Cpu::arr, Cpu::jmp, Cpu::adc, Cpu::ror, Cpu::rra, // 60
    Cpu::bvs, Cpu::adc, Cpu::jam, Cpu::rra, Cpu::nop, Cpu::adc, Cpu::ror, Cpu::rra, Cpu::sei, Cpu::adc, Cpu::nop, Cpu::rra, Cpu::nop, Cpu::adc, Cpu::ror, Cpu::rra, // 70
    Cpu::nop, Cpu::sta, Cpu::nop, Cpu::sax, Cpu::sty, Cpu::sta, Cpu::stx, Cpu::sax, Cpu::dey, Cpu::nop, Cpu::txa, Cpu::xaa, Cpu::sty, Cpu::sta, Cpu::stx, Cpu::sax, // 80
    Cpu::bcc, Cpu::sta, Cpu::jam, Cpu::ahx, Cpu::sty, Cpu::sta, Cpu::stx, Cpu::sax, Cpu::tya, Cpu::sta, Cpu::txs, Cpu::tas, Cpu::shy, Cpu::sta, Cpu::shx, Cpu::ahx, // 90
    Cpu::ldy, Cpu::lda, Cpu::ldx, Cpu::lax, Cpu::ldy, Cpu::lda, Cpu::ldx, Cpu::lax, Cpu::tay, Cpu::lda, Cpu::tax, Cpu::lxa, Cpu::ldy, Cpu::lda, Cpu::ldx, Cpu::lax, // a0
    Cpu::bcs, Cpu::lda, Cpu::jam, Cpu::lax, Cpu::ldy, Cpu::lda, Cpu::ldx, Cpu::lax, Cpu::clv, Cpu::lda, Cpu::tsx, Cpu::las, Cpu::ldy, Cpu::lda, Cpu::ldx, Cpu::lax, // b0
    Cpu::cpy, Cpu::cmp, Cpu::nop, Cpu::dcp, Cpu::cpy, Cpu::cmp, Cpu::dec, Cpu::dcp, Cpu::iny, Cpu::cmp, Cpu::dex, Cpu::axs, Cpu::cpy, Cpu::cmp, Cpu::dec, Cpu::dcp, // c0
    Cpu::bne, Cpu::cmp, Cpu::jam, Cpu::dcp, Cpu::nop, Cpu::cmp, Cpu::dec, Cpu::dcp, Cpu::cld, Cpu::cmp, Cpu::nop, Cpu::dcp, Cpu::nop, Cpu::cmp, Cpu::dec, Cpu::dcp, // d0
    Cpu::cpx, Cpu::sbc, Cpu::nop, Cpu::isb, Cpu::cpx, Cpu::sbc, Cpu::inc, Cpu::isb, Cpu::inx, Cpu::sbc, Cpu::nop, Cpu::sbc, Cpu::cpx, Cpu::sbc, Cpu::inc, Cpu::isb, // e0
    Cpu::beq, Cpu::sbc, Cpu::jam, Cpu::isb, Cpu::nop, Cpu::sbc, Cpu::inc, Cpu::isb, Cpu::sed, Cpu::sbc, Cpu::nop, Cpu::isb, Cpu::nop, Cpu::sbc, Cpu::inc, Cpu::isb, // f0
];

#[rustfmt::skip]
pub const OP_NAMES: [&str; 256] = [
//   00     01     02     03     04     05     06     07     08     09     0a     0b     0c     0d     0e     0f
    "BRK", "ORA", "JAM", "SLO", "NOP", "ORA", "ASL", "SLO", "PHP", "ORA", "ASL", "ANC", "NOP", "ORA", "ASL", "SLO", // 00
    "BPL", "ORA", "JAM", "SLO", "NOP", "ORA", "ASL", "SLO", "CLC", "ORA", "NOP", "SLO", "NOP", "ORA", "ASL", "SLO", // 10
    "JSR", "AND", "JAM", "RLA", "BIT", "AND", "ROL", "RLA", "PLP", "AND", "ROL", "ANC", "BIT", "AND", "ROL", "RLA", // 20
    "BMI", "AND", "JAM", "RLA", "NOP", "AND", "ROL", "RLA", "SEC", "AND", "NOP", "RLA", "NOP", "AND", "ROL", "RLA", // 30
    "RTI", "EOR", "JAM", "SRE", "NOP", "EOR", "LSR", "SRE", "PHA", "EOR", "LSR", "ALR", "JMP", "EOR", "LSR", "SRE", // 40
    "BVC", "EOR", "JAM", "SRE", "NOP", "EOR", "LSR", "SRE", "CLI", "EOR", "NOP", "SRE", "NOP", "EOR", "LSR", "SRE", // 50
    "RTS", "ADC", "JAM", "RRA", "NOP", "ADC", "ROR", "RRA", "PLA", "ADC", "ROR", "ARR", "JMP", "ADC", "ROR", "RRA", // 60
    "BVS", "ADC", "JAM", "RRA", "NOP", "ADC", "ROR", "RRA", "SEI", "ADC", "NOP", "RRA", "NOP", "ADC", "ROR", "RRA", // 70
    "NOP", "STA", "NOP", "SAX", "STY", "STA", "STX", "SAX", "DEY", "NOP", "TXA", "XAA", "STY", "STA", "STX", "SAX", // 80
    "BCC", "STA", "JAM", "AHX", "STY", "STA", "STX", "SAX", "TYA", "STA", "TXS", "TAS", "SHY", "STA", "SHX", "AHX", // 90
    "LDY", "LDA", "LDX", "LAX", "LDY", "LDA", "LDX", "LAX", "TAY", "LDA", "TAX", "LXA", "LDY", "LDA", "LDX", "LAX", // a0
    "BCS", "LDA", "JAM", "LAX", "LDY", "LDA", "LDX", "LAX", "CLV", "LDA", "TSX", "LAS", "LDY", "LDA", "LDX", "LAX", // b0
    "CPY", "CMP", "NOP", "DCP", "CPY", "CMP", "DEC", "DCP", "INY", "CMP", "DEX", "AXS", "CPY", "CMP", "DEC", "DCP", // c0
    "BNE", "CMP", "JAM", "DCP", "NOP", "CMP", "DEC", "DCP", "CLD", "CMP", "NOP", "DCP", "NOP", "CMP", "DEC", "DCP", // d0
    "CPX", "SBC", "NOP", "ISB", "CPX", "SBC", "INC", "ISB", "INX", "SBC", "NOP", "SBC", "CPX", "SBC", "INC", "ISB", // e0
    "BEQ", "SBC", "JAM", "ISB", "NOP", "SBC", "INC", "ISB", "SED", "SBC", "NOP", "ISB", "NOP", "SBC", "INC", "ISB", // f0
];

#[rustfmt::skip]
pub const OP_CYCLES: [u8; 256] = [
//  0  1  2  3  4  5  6  7  8  9  a  b  c  d  e  f
    7, 6, 0, 8, 3, 3, 5, 5, 3, 2, 2, 2, 4, 4, 6, 6, // 00
    2, 5, 0, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7, // 10
    6, 6, 0, 8, 3, 3, 5, 5, 4, 2, 2, 2, 4, 4, 6, 6, // 20
    2, 5, 0, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7, // 30
    6, 6, 0, 8, 3, 3, 5, 5, 3, 2, 2, 2, 3, 4, 6, 6, // 40
    2, 5, 0, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7, // 50
    6, 6, 0, 8, 3, 3, 5, 5, 4, 2, 2, 2, 5, 4, 6, 6, // 60
    2, 5, 0, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7, // 70
    2, 6, 2, 6, 3, 3, 3, 3, 2, 2, 2, 2, 4, 4, 4, 4, // 80
    2, 6, 0, 6, 4, 4, 4, 4, 2, 5, 2, 5, 5, 5, 5, 5, // 90
    2, 6, 2, 6, 3, 3, 3, 3, 2, 2, 2, 2, 4, 4, 4, 4, // a0
    2, 5, 0, 5, 4, 4, 4, 4, 2, 4, 2, 4, 4, 4, 4, 4, // b0
    2, 6, 2, 8, 3, 3, 5, 5, 2, 2, 2, 2, 4, 4, 6, 6, // c0
    2, 5, 0, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7, // d0
    2, 6, 2, 8, 3, 3, 5, 5, 2, 2, 2, 2, 4, 4, 6, 6, // e0
    2, 5, 0, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7, // f0
];

#[rustfmt::skip]
const OP_PAGE_SENSITIVE: [u8; 256] = [
//  0  1  2  3  4  5  6  7  8  9  a  b  c  d  e  f
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, // 00
    0, 1, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 1, 1, 0, 0, // 10
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, // 20
    0, 1, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 1, 1, 0, 0, // 30
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, // 40
    0, 1, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 1, 1, 0, 0, // 50
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, // 60
    0, 1, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 1, 1, 0, 0, // 70
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, // 80
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, // 90
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, // a0
    0, 1, 0, 1, 0, 0, 0, 0, 0, 1, 0, 1, 1, 1, 1, 1, // b0
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, // c0
    0, 1, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 1, 1, 0, 0, // d0
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, // e0
    0, 1, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 1, 1, 0, 0, // f0
];

impl Cpu {
    fn get_operand(&self, bus: &mut Bus) -> u8 {
        match self.op_mode {
            AddrMode::IMP => unreachable!(),
            AddrMode::ACC => self.a,
            mode => bus.read_operand(self.op_address, mode.open_bus_rule()),
        }
    }

    /// Read-modify-write: the unmodified value is written back once before
    /// the result, as the hardware does.
    fn modify(&mut self, bus: &mut Bus, f: fn(&mut Cpu, u8) -> u8) -> u8 {
        if self.op_mode == AddrMode::ACC {
            self.a = f(self, self.a);
            self.a
        } else {
            let op = self.get_operand(bus);
            bus.write(self.op_address, op);
            let op = f(self, op);
            bus.write(self.op_address, op);
            op
        }
    }

    fn jam(&mut self, _: &mut Bus) {
        unreachable!("jam opcode {:02X} is rejected before dispatch", self.op);
    }

    fn nop(&mut self, bus: &mut Bus) {
        if self.op_mode != AddrMode::IMP {
            self.get_operand(bus);
        }
    }
}

/// arith
impl Cpu {
    fn adc(&mut self, bus: &mut Bus) {
        let op = self.get_operand(bus);
        self._adc(op);
    }

    fn sbc(&mut self, bus: &mut Bus) {
        let op = self.get_operand(bus);
        self._sbc(op);
    }

    fn and(&mut self, bus: &mut Bus) {
        self.a &= self.get_operand(bus);
        self.p.set_zn(self.a);
    }

    fn ora(&mut self, bus: &mut Bus) {
        self.a |= self.get_operand(bus);
        self.p.set_zn(self.a);
    }

    fn eor(&mut self, bus: &mut Bus) {
        self.a ^= self.get_operand(bus);
        self.p.set_zn(self.a);
    }

    fn inc(&mut self, bus: &mut Bus) {
        self.modify(bus, |cpu, op| {
            let op = op.wrapping_add(1);
            cpu.p.set_zn(op);
            op
        });
    }

    fn inx(&mut self, _: &mut Bus) {
        self.x = self.x.wrapping_add(1);
        self.p.set_zn(self.x);
    }

    fn iny(&mut self, _: &mut Bus) {
        self.y = self.y.wrapping_add(1);
        self.p.set_zn(self.y);
    }

    fn dec(&mut self, bus: &mut Bus) {
        self.modify(bus, |cpu, op| {
            let op = op.wrapping_sub(1);
            cpu.p.set_zn(op);
            op
        });
    }

    fn dex(&mut self, _: &mut Bus) {
        self.x = self.x.wrapping_sub(1);
        self.p.set_zn(self.x);
    }

    fn dey(&mut self, _: &mut Bus) {
        self.y = self.y.wrapping_sub(1);
        self.p.set_zn(self.y);
    }

    fn rol(&mut self, bus: &mut Bus) {
        self.modify(bus, Cpu::_rol);
    }

    fn ror(&mut self, bus: &mut Bus) {
        self.modify(bus, Cpu::_ror);
    }

    fn asl(&mut self, bus: &mut Bus) {
        self.modify(bus, Cpu::_asl);
    }

    fn lsr(&mut self, bus: &mut Bus) {
        self.modify(bus, Cpu::_lsr);
    }
}

/// branch and jump
impl Cpu {
    fn brk(&mut self, bus: &mut Bus) {
        // the byte after BRK is skipped
        self.fetch_byte(bus);

        self.push_word(self.pc, bus);
        self.push_byte(self.p.to_stack(true), bus);
        self.p.i = true;
        self.pc = self.read_word(0xfffe, bus);
    }

    fn bcc(&mut self, _: &mut Bus) {
        self._branch(!self.p.c);
    }

    fn bcs(&mut self, _: &mut Bus) {
        self._branch(self.p.c);
    }

    fn beq(&mut self, _: &mut Bus) {
        self._branch(self.p.z);
    }

    fn bmi(&mut self, _: &mut Bus) {
        self._branch(self.p.n);
    }

    fn bne(&mut self, _: &mut Bus) {
        self._branch(!self.p.z);
    }

    fn bpl(&mut self, _: &mut Bus) {
        self._branch(!self.p.n);
    }

    fn bvc(&mut self, _: &mut Bus) {
        self._branch(!self.p.v);
    }

    fn bvs(&mut self, _: &mut Bus) {
        self._branch(self.p.v);
    }

    fn jmp(&mut self, _: &mut Bus) {
        self.pc = self.op_address;
    }

    fn jsr(&mut self, bus: &mut Bus) {
        self.push_word(self.pc.wrapping_sub(1), bus);
        self.pc = self.op_address;
    }

    fn rti(&mut self, bus: &mut Bus) {
        self.p = self.pop_byte(bus).into();
        self.pc = self.pop_word(bus);
    }

    fn rts(&mut self, bus: &mut Bus) {
        let addr = self.pop_word(bus);
        self.pc = addr.wrapping_add(1);
    }
}

/// move
impl Cpu {
    fn lda(&mut self, bus: &mut Bus) {
        self.a = self.get_operand(bus);
        self.p.set_zn(self.a);
    }

    fn ldx(&mut self, bus: &mut Bus) {
        self.x = self.get_operand(bus);
        self.p.set_zn(self.x);
    }

    fn ldy(&mut self, bus: &mut Bus) {
        self.y = self.get_operand(bus);
        self.p.set_zn(self.y);
    }

    fn pha(&mut self, bus: &mut Bus) {
        self.push_byte(self.a, bus);
    }

    fn php(&mut self, bus: &mut Bus) {
        self.push_byte(self.p.to_stack(true), bus);
    }

    fn pla(&mut self, bus: &mut Bus) {
        self.a = self.pop_byte(bus);
        self.p.set_zn(self.a);
    }

    fn plp(&mut self, bus: &mut Bus) {
        self.p = self.pop_byte(bus).into();
    }

    fn sta(&mut self, bus: &mut Bus) {
        bus.write(self.op_address, self.a);
    }

    fn stx(&mut self, bus: &mut Bus) {
        bus.write(self.op_address, self.x);
    }

    fn sty(&mut self, bus: &mut Bus) {
        bus.write(self.op_address, self.y);
    }

    fn tax(&mut self, _: &mut Bus) {
        self.x = self.a;
        self.p.set_zn(self.x);
    }

    fn tay(&mut self, _: &mut Bus) {
        self.y = self.a;
        self.p.set_zn(self.y);
    }

    fn tsx(&mut self, _: &mut Bus) {
        self.x = self.sp;
        self.p.set_zn(self.x);
    }

    fn txs(&mut self, _: &mut Bus) {
        self.sp = self.x;
    }

    fn txa(&mut self, _: &mut Bus) {
        self.a = self.x;
        self.p.set_zn(self.a);
    }

    fn tya(&mut self, _: &mut Bus) {
        self.a = self.y;
        self.p.set_zn(self.a);
    }
}

/// flags
impl Cpu {
    fn bit(&mut self, bus: &mut Bus) {
        let op = self.get_operand(bus);
        self.p.z = (self.a & op) == 0;
        self.p.n = (op & 0x80) != 0;
        self.p.v = (op & 0x40) != 0;
    }

    fn cmp(&mut self, bus: &mut Bus) {
        let op = self.get_operand(bus);
        self._cmp(self.a, op);
    }

    fn cpx(&mut self, bus: &mut Bus) {
        let op = self.get_operand(bus);
        self._cmp(self.x, op);
    }

    fn cpy(&mut self, bus: &mut Bus) {
        let op = self.get_operand(bus);
        self._cmp(self.y, op);
    }

    fn clc(&mut self, _: &mut Bus) {
        self.p.c = false;
    }

    fn cld(&mut self, _: &mut Bus) {
        self.p.d = false;
    }

    fn cli(&mut self, _: &mut Bus) {
        self.p.i = false;
    }

    fn clv(&mut self, _: &mut Bus) {
        self.p.v = false;
    }

    fn sec(&mut self, _: &mut Bus) {
        self.p.c = true;
    }

    fn sed(&mut self, _: &mut Bus) {
        self.p.d = true;
    }

    fn sei(&mut self, _: &mut Bus) {
        self.p.i = true;
    }
}

/// unofficial
impl Cpu {
    fn lax(&mut self, bus: &mut Bus) {
        self.a = self.get_operand(bus);
        self.x = self.a;
        self.p.set_zn(self.a);
    }

    fn sax(&mut self, bus: &mut Bus) {
        bus.write(self.op_address, self.a & self.x);
    }

    fn dcp(&mut self, bus: &mut Bus) {
        let op = self.modify(bus, |_, op| op.wrapping_sub(1));
        self._cmp(self.a, op);
    }

    fn isb(&mut self, bus: &mut Bus) {
        let op = self.modify(bus, |_, op| op.wrapping_add(1));
        self._sbc(op);
    }

    fn slo(&mut self, bus: &mut Bus) {
        let op = self.modify(bus, Cpu::_asl);
        self.a |= op;
        self.p.set_zn(self.a);
    }

    fn rla(&mut self, bus: &mut Bus) {
        let op = self.modify(bus, Cpu::_rol);
        self.a &= op;
        self.p.set_zn(self.a);
    }

    fn sre(&mut self, bus: &mut Bus) {
        let op = self.modify(bus, Cpu::_lsr);
        self.a ^= op;
        self.p.set_zn(self.a);
    }

    fn rra(&mut self, bus: &mut Bus) {
        let op = self.modify(bus, Cpu::_ror);
        self._adc(op);
    }

    fn anc(&mut self, bus: &mut Bus) {
        self.a &= self.get_operand(bus);
        self.p.set_zn(self.a);
        self.p.c = self.p.n;
    }

    fn alr(&mut self, bus: &mut Bus) {
        let op = self.a & self.get_operand(bus);
        self.a = self._lsr(op);
    }

    fn arr(&mut self, bus: &mut Bus) {
        let op = self.a & self.get_operand(bus);
        self.a = (op >> 1) | ((self.p.c as u8) << 7);
        self.p.set_zn(self.a);
        self.p.c = (self.a & 0x40) != 0;
        self.p.v = (((self.a >> 6) ^ (self.a >> 5)) & 0x01) != 0;
    }

    fn axs(&mut self, bus: &mut Bus) {
        let op = self.get_operand(bus);
        let ax = self.a & self.x;
        self.p.c = ax >= op;
        self.x = ax.wrapping_sub(op);
        self.p.set_zn(self.x);
    }

    fn xaa(&mut self, bus: &mut Bus) {
        self.a = (self.a | XAA_MAGIC) & self.x & self.get_operand(bus);
        self.p.set_zn(self.a);
    }

    fn lxa(&mut self, bus: &mut Bus) {
        self.a = (self.a | LXA_MAGIC) & self.get_operand(bus);
        self.x = self.a;
        self.p.set_zn(self.a);
    }

    fn las(&mut self, bus: &mut Bus) {
        let op = self.get_operand(bus) & self.sp;
        self.a = op;
        self.x = op;
        self.sp = op;
        self.p.set_zn(op);
    }

    fn tas(&mut self, bus: &mut Bus) {
        self.sp = self.a & self.x;
        self._unstable_store(self.sp, bus);
    }

    fn shy(&mut self, bus: &mut Bus) {
        self._unstable_store(self.y, bus);
    }

    fn shx(&mut self, bus: &mut Bus) {
        self._unstable_store(self.x, bus);
    }

    fn ahx(&mut self, bus: &mut Bus) {
        self._unstable_store(self.a & self.x, bus);
    }
}

impl Cpu {
    fn _adc(&mut self, op: u8) {
        if self.p.d {
            self._adc_decimal(op);
            return;
        }

        let sum = self.a as u16 + op as u16 + self.p.c as u16;

        self.p.c = sum > 0xff;
        self.p.v = (!(self.a ^ op) & (self.a ^ sum as u8) & 0x80) != 0;
        self.a = sum as u8;
        self.p.set_zn(self.a);
    }

    /// NMOS decimal add: Z comes from the binary sum, N and V from the
    /// intermediate result before the high nibble is adjusted.
    fn _adc_decimal(&mut self, op: u8) {
        let c = self.p.c as u16;
        let binary = (self.a as u16 + op as u16 + c) as u8;

        let mut lo = (self.a & 0x0f) as u16 + (op & 0x0f) as u16 + c;
        let mut hi = (self.a >> 4) as u16 + (op >> 4) as u16;
        if lo > 0x09 {
            lo += 0x06;
        }
        if lo > 0x0f {
            hi += 1;
        }

        self.p.z = binary == 0;
        self.p.n = (hi & 0x08) != 0;
        self.p.v = (!(self.a ^ op) & (self.a ^ ((hi << 4) as u8)) & 0x80) != 0;

        if hi > 0x09 {
            hi += 0x06;
        }
        self.p.c = hi > 0x0f;
        self.a = (((hi & 0x0f) << 4) | (lo & 0x0f)) as u8;
    }

    fn _sbc(&mut self, op: u8) {
        if !self.p.d {
            self._adc(!op);
            return;
        }

        // flags follow the binary subtraction, carry is NOT borrow
        let borrow = !self.p.c as i16;
        let binary = self.a as i16 - op as i16 - borrow;

        let mut lo = (self.a & 0x0f) as i16 - (op & 0x0f) as i16 - borrow;
        let mut hi = (self.a >> 4) as i16 - (op >> 4) as i16;
        if lo < 0 {
            lo -= 0x06;
            hi -= 1;
        }
        if hi < 0 {
            hi -= 0x06;
        }

        let result = binary as u8;
        self.p.c = binary >= 0;
        self.p.v = ((self.a ^ op) & (self.a ^ result) & 0x80) != 0;
        self.p.set_zn(result);
        self.a = (((hi & 0x0f) << 4) | (lo & 0x0f)) as u8;
    }

    fn _branch(&mut self, b: bool) {
        if b {
            self.pc = self.op_address;
            self.penalty += 1 + self.cross_page as u8;
        }
    }

    fn _cmp(&mut self, a: u8, b: u8) {
        self.p.c = a >= b;
        self.p.z = a == b;
        self.p.n = (a.wrapping_sub(b) & 0x80) != 0;
    }

    fn _asl(&mut self, op: u8) -> u8 {
        self.p.c = (op & 0x80) != 0;
        let op = op << 1;
        self.p.set_zn(op);
        op
    }

    fn _lsr(&mut self, op: u8) -> u8 {
        self.p.c = (op & 0x01) != 0;
        let op = op >> 1;
        self.p.set_zn(op);
        op
    }

    fn _rol(&mut self, op: u8) -> u8 {
        let c = self.p.c as u8;
        self.p.c = (op & 0x80) != 0;
        let op = (op << 1) | c;
        self.p.set_zn(op);
        op
    }

    fn _ror(&mut self, op: u8) -> u8 {
        let c = self.p.c as u8;
        self.p.c = (op & 0x01) != 0;
        let op = (op >> 1) | (c << 7);
        self.p.set_zn(op);
        op
    }

    /// SHA/SHX/SHY/TAS: the stored value is ANDed with the base address
    /// high byte plus one, and on a page cross that value also replaces
    /// the high byte of the address actually written.
    fn _unstable_store(&mut self, value: u8, bus: &mut Bus) {
        let hb = (self.op_base >> 8) as u8;
        let data = value & hb.wrapping_add(1);
        let addr = if self.cross_page {
            ((data as u16) << 8) | (self.op_address & 0x00ff)
        } else {
            self.op_address
        };
        bus.write(addr, data);
    }
}
