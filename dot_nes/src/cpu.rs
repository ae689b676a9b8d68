use crate::bus::Bus;
use addressing::AddrMode;
use op_code::OpCode;
pub use status::Status;

mod addressing;
mod op_code;
mod status;

pub use op_code::{OP_CYCLES, OP_NAMES};

const NMI_VECTOR: u16 = 0xfffa;
const RESET_VECTOR: u16 = 0xfffc;
const IRQ_VECTOR: u16 = 0xfffe;

/// Cycles spent by the reset and interrupt sequences.
pub const INTERRUPT_CYCLES: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuError {
    /// The byte at `pc` decodes to nothing; the chip would lock up.
    UnknownOpcode { pc: u16, opcode: u8 },
}

impl std::fmt::Display for CpuError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CpuError::UnknownOpcode { pc, opcode } => {
                write!(f, "unknown opcode ${:02X} at ${:04X}", opcode, pc)
            }
        }
    }
}

impl std::error::Error for CpuError {}

/// Register snapshot for inspection tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuStatus {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub pc: u16,
    pub sp: u8,
    pub p: Status,
}

pub struct Cpu {
    a: u8,
    x: u8,
    y: u8,
    pc: u16,
    sp: u8,
    p: Status,

    op: u8,
    op_mode: AddrMode,
    op_address: u16,
    op_base: u16,
    cross_page: bool,
    penalty: u8,

    nmi_pending: bool,
    irq_pending: bool,
    /// I flag as the interrupt poll of the last instruction saw it
    irq_mask: bool,
}

impl Default for Cpu {
    fn default() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            pc: 0,
            sp: 0xff,
            p: Status::default(),

            op: 0xea,
            op_mode: AddrMode::IMP,
            op_address: 0,
            op_base: 0,
            cross_page: false,
            penalty: 0,

            nmi_pending: false,
            irq_pending: false,
            irq_mask: false,
        }
    }
}

impl Cpu {
    /// Clears the register file and loads PC from the reset vector,
    /// spending the 7 cycles of the reset sequence on the bus.
    pub fn reset(&mut self, bus: &mut Bus) {
        *self = Self::default();

        let start = bus.cycles();
        self.pc = self.read_word(RESET_VECTOR, bus);
        while bus.cycles() - start < INTERRUPT_CYCLES {
            bus.tick();
        }
    }

    /// Executes one instruction, or services a pending interrupt instead,
    /// and returns the elapsed CPU cycles.
    ///
    /// A byte without an opcode mapping is reported before anything is
    /// touched, so the machine stays exactly as it was.
    pub fn step(&mut self, bus: &mut Bus) -> Result<usize, CpuError> {
        let start = bus.cycles();

        if self.nmi_pending {
            self.nmi_pending = false;
            self.interrupt(NMI_VECTOR, bus);
            return Ok(bus.cycles() - start);
        }
        if self.irq_pending {
            self.irq_pending = false;
            self.interrupt(IRQ_VECTOR, bus);
            return Ok(bus.cycles() - start);
        }

        let pc = self.pc;
        let opcode = bus.peek(pc);
        if OpCode::decode(opcode).is_none() {
            return Err(CpuError::UnknownOpcode { pc, opcode });
        }

        // register space can change between the peek and the fetch, the
        // fetched byte is the one that runs
        self.op = self.fetch_byte(bus);
        let entry = match OpCode::decode(self.op) {
            Some(entry) => entry,
            None => {
                self.pc = pc;
                return Err(CpuError::UnknownOpcode { pc, opcode: self.op });
            }
        };

        if log::log_enabled!(log::Level::Trace) {
            log::trace!(
                "{:04X}  {:02X} {}  A:{:02X} X:{:02X} Y:{:02X} P:{:?} SP:{:02X} CYC:{}",
                pc,
                self.op,
                entry.name,
                self.a,
                self.x,
                self.y,
                self.p,
                self.sp,
                start
            );
        }

        let i = self.p.i;
        self.penalty = 0;
        self.addressing(entry.mode, entry.page_sensitive, bus);
        (entry.func)(self, bus);

        // RTI restores I before the poll, everything else polls with the
        // flag as it was when the instruction started
        self.irq_mask = if self.op == 0x40 { self.p.i } else { i };

        let total = entry.cycles as usize + self.penalty as usize;
        while bus.cycles() - start < total {
            bus.tick();
        }

        Ok(bus.cycles() - start)
    }

    /// Latches an NMI edge; serviced at the next instruction boundary.
    pub fn set_nmi(&mut self) {
        self.nmi_pending = true;
    }

    /// Samples the IRQ line at the end of an instruction.
    pub fn poll_irq(&mut self, line: bool) {
        self.irq_pending = line && !self.irq_mask;
    }

    pub fn nmi_pending(&self) -> bool {
        self.nmi_pending
    }

    pub fn irq_pending(&self) -> bool {
        self.irq_pending
    }

    pub fn set_pc(&mut self, addr: u16) {
        self.pc = addr;
    }

    pub fn status(&self) -> CpuStatus {
        CpuStatus {
            a: self.a,
            x: self.x,
            y: self.y,
            pc: self.pc,
            sp: self.sp,
            p: self.p,
        }
    }

    fn interrupt(&mut self, vector: u16, bus: &mut Bus) {
        bus.tick();
        bus.tick();

        self.push_word(self.pc, bus);
        self.push_byte(self.p.to_stack(false), bus);
        self.p.i = true;
        self.irq_mask = true;
        self.pc = self.read_word(vector, bus);
    }
}

impl Cpu {
    fn fetch_byte(&mut self, bus: &mut Bus) -> u8 {
        let b = bus.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        b
    }

    fn fetch_word(&mut self, bus: &mut Bus) -> u16 {
        let lb = self.fetch_byte(bus) as u16;
        let hb = self.fetch_byte(bus) as u16;
        (hb << 8) | lb
    }

    fn read_word(&mut self, addr: u16, bus: &mut Bus) -> u16 {
        let lb = bus.read(addr) as u16;
        let hb = bus.read(addr.wrapping_add(1)) as u16;
        (hb << 8) | lb
    }

    fn push_byte(&mut self, b: u8, bus: &mut Bus) {
        bus.write(0x100 + self.sp as u16, b);
        self.sp = self.sp.wrapping_sub(1);
    }

    fn pop_byte(&mut self, bus: &mut Bus) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        bus.read(0x100 + self.sp as u16)
    }

    fn push_word(&mut self, b: u16, bus: &mut Bus) {
        self.push_byte((b >> 8) as u8, bus);
        self.push_byte(b as u8, bus);
    }

    fn pop_word(&mut self, bus: &mut Bus) -> u16 {
        let lb = self.pop_byte(bus) as u16;
        let hb = self.pop_byte(bus) as u16;
        (hb << 8) | lb
    }
}
