//! CPU address space.
//!
//! Every `read`/`write` is one CPU cycle: the system is ticked (APU frame
//! counter, three PPU dots, publish) before the access is applied.

use crate::apu::Apu;
use crate::ppu::Ppu;
use crate::shared::SharedState;
use crate::Cartridge;
use std::sync::Arc;

mod dma;
mod joystick;

use dma::Dma;
use joystick::Joystick;
pub use joystick::InputStates;

const RAM_SIZE: usize = 0x800;

/// What an unmapped read returns, chosen by the addressing class of the
/// instruction performing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenBusRule {
    /// previous bus value, latch unchanged
    Latch,
    /// high byte of the address, which also becomes the latch
    AddressHigh,
}

pub struct Bus {
    ram: Box<[u8; RAM_SIZE]>,
    cart: Cartridge,
    ppu: Ppu,
    apu: Apu,
    joystick: Joystick,
    dma: Dma,

    shared: Arc<SharedState>,
}

impl Bus {
    pub fn new(cart: Cartridge) -> Self {
        Self::with_shared(cart, Arc::new(SharedState::default()))
    }

    /// Builds a bus that publishes into an existing block, restarting its
    /// cycle count.
    pub fn with_shared(cart: Cartridge, shared: Arc<SharedState>) -> Self {
        let bus = Self {
            ram: Box::new([0u8; RAM_SIZE]),
            cart,
            ppu: Ppu::new(),
            apu: Apu::default(),
            joystick: Joystick::default(),
            dma: Dma::default(),

            shared,
        };
        bus.shared.set_cycles(0);
        bus.shared.set_open_bus(0);
        bus.shared.publish_ppu(&bus.ppu.snapshot());
        bus
    }

    /// One CPU cycle.
    pub fn tick(&mut self) {
        self.shared.set_cycles(self.shared.cycles() + 1);

        self.apu.tick();
        for _ in 0..3 {
            self.ppu.tick(&self.cart);
        }

        self.shared.publish_ppu(&self.ppu.snapshot());
    }

    pub fn read(&mut self, addr: u16) -> u8 {
        self.read_operand(addr, OpenBusRule::Latch)
    }

    /// Read issued by an instruction operand; `rule` decides what an
    /// unmapped address yields.
    pub fn read_operand(&mut self, addr: u16, rule: OpenBusRule) -> u8 {
        self.tick();

        let latch = self.shared.open_bus();
        let data = match addr {
            0x0000..=0x1fff => self.ram[addr as usize & 0x07ff],
            0x2000..=0x3fff => self.ppu.read(&self.cart, addr),
            0x4015 => (self.apu.read_status() & !0x20) | (latch & 0x20),
            0x4016 | 0x4017 => self.joystick.read(addr) | (latch & 0xe0),
            0x4000..=0x401f => return latch,
            0x4020..=0xffff => match self.cart.cpu_read(addr) {
                Some(data) => data,
                None => match rule {
                    OpenBusRule::Latch => return latch,
                    OpenBusRule::AddressHigh => (addr >> 8) as u8,
                },
            },
        };

        self.shared.set_open_bus(data);
        data
    }

    pub fn write(&mut self, addr: u16, data: u8) {
        self.tick();
        self.shared.set_open_bus(data);

        match addr {
            0x0000..=0x1fff => self.ram[addr as usize & 0x07ff] = data,
            0x2000..=0x3fff => self.ppu.write(&mut self.cart, addr, data),
            0x4014 => {
                log::trace!("OAM-DMA from ${:02X}00 at cycle {}", data, self.cycles());
                self.dma.start(self.cycles(), data);
            }
            0x4016 => self.joystick.write(data),
            0x4000..=0x4017 => self.apu.write(addr, data),
            0x4018..=0x401f => {}
            0x4020..=0xffff => self.cart.cpu_write(addr, data),
        }
    }

    /// Read without ticking or touching any latch.
    pub fn peek(&self, addr: u16) -> u8 {
        let latch = self.shared.open_bus();
        match addr {
            0x0000..=0x1fff => self.ram[addr as usize & 0x07ff],
            0x2000..=0x3fff => self.ppu.peek(&self.cart, addr),
            0x4015 => (self.apu.peek_status() & !0x20) | (latch & 0x20),
            0x4016 | 0x4017 => self.joystick.peek(addr) | (latch & 0xe0),
            0x4000..=0x401f => latch,
            0x4020..=0xffff => self.cart.cpu_read(addr).unwrap_or(latch),
        }
    }

    pub fn dma_active(&self) -> bool {
        self.dma.active()
    }

    /// Runs a pending OAM-DMA to completion and returns its cycles.
    pub fn run_dma(&mut self) -> usize {
        let start = self.cycles();

        while self.dma.active() {
            match self.dma.tick() {
                None => self.tick(),
                Some(addr) => {
                    let data = self.read(addr);
                    self.write(0x2004, data);
                }
            }
        }

        self.cycles() - start
    }

    /// Reset line: PPU and APU registers, pending DMA.
    pub fn reset(&mut self) {
        self.ppu.reset();
        self.apu.reset();
        self.dma.reset();
    }

    pub(crate) fn take_nmi(&mut self) -> bool {
        self.ppu.take_nmi()
    }

    pub(crate) fn irq_line(&self) -> bool {
        self.apu.irq()
    }

    pub fn cycles(&self) -> usize {
        self.shared.cycles() as usize
    }

    pub fn open_bus(&self) -> u8 {
        self.shared.open_bus()
    }

    pub fn shared(&self) -> &Arc<SharedState> {
        &self.shared
    }

    pub fn ppu(&self) -> &Ppu {
        &self.ppu
    }

    pub fn apu(&self) -> &Apu {
        &self.apu
    }

    pub fn cart(&self) -> &Cartridge {
        &self.cart
    }

    pub fn set_input0(&mut self, states: InputStates) {
        self.joystick.set_input0(states);
    }

    pub fn set_input1(&mut self, states: InputStates) {
        self.joystick.set_input1(states);
    }
}
