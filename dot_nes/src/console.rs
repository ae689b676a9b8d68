use crate::cart::CartridgeError;
use crate::cpu::{CpuError, CpuStatus};
use crate::ppu::{HEIGHT, WIDTH};
use crate::shared::SharedState;
use crate::{Bus, Cartridge, Cpu, InputStates};
use std::sync::Arc;

/// Owns the CPU and the bus, and drives them one step at a time.
///
/// Between steps it moves the PPU's NMI edge and the IRQ line level into
/// the CPU, runs pending OAM-DMA, and keeps the halt and pause state.
pub struct Console {
    cpu: Cpu,
    bus: Bus,
    paused: bool,
    halted: Option<CpuError>,
}

impl Console {
    pub fn new(cart: Cartridge) -> Self {
        let mut bus = Bus::new(cart);
        let mut cpu = Cpu::default();
        cpu.reset(&mut bus);

        Self {
            cpu,
            bus,
            paused: false,
            halted: None,
        }
    }

    /// Parses an iNES image and swaps it in. On error the running cartridge
    /// is left alone.
    pub fn load(&mut self, data: &[u8]) -> Result<(), CartridgeError> {
        let cart = Cartridge::load(data)?;
        self.insert(cart);
        Ok(())
    }

    /// Powers up a fresh machine around `cart`, keeping the shared block.
    pub fn insert(&mut self, cart: Cartridge) {
        self.bus = Bus::with_shared(cart, self.bus.shared().clone());
        self.cpu.reset(&mut self.bus);
        self.halted = None;
    }

    pub fn reset(&mut self) {
        self.bus.reset();
        self.cpu.reset(&mut self.bus);
        self.halted = None;
        log::debug!("reset, pc ${:04X}", self.cpu.status().pc);
    }

    /// Runs one instruction, an interrupt entry, or a whole pending
    /// OAM-DMA, and returns the elapsed CPU cycles.
    ///
    /// After an unknown opcode every call returns the same error until
    /// `resume` or `reset`.
    pub fn step(&mut self) -> Result<usize, CpuError> {
        if let Some(err) = self.halted {
            return Err(err);
        }

        let cycles = if self.bus.dma_active() {
            self.bus.run_dma()
        } else {
            match self.cpu.step(&mut self.bus) {
                Ok(cycles) => cycles,
                Err(err) => {
                    log::warn!("halted: {}", err);
                    self.halted = Some(err);
                    return Err(err);
                }
            }
        };

        if self.bus.take_nmi() {
            self.cpu.set_nmi();
        }
        self.cpu.poll_irq(self.bus.irq_line());

        Ok(cycles)
    }

    /// Runs until the PPU wraps to the next frame. Returns early, with the
    /// cycles run so far, when paused or asked to stop.
    pub fn run_frame(&mut self) -> Result<usize, CpuError> {
        let frame = self.bus.ppu().frame();
        let mut cycles = 0;

        while self.bus.ppu().frame() == frame {
            if !self.poll_running() {
                break;
            }
            cycles += self.step()?;
        }

        Ok(cycles)
    }

    /// Runs whole steps until at least `n` cycles have elapsed.
    pub fn run_cycles(&mut self, n: usize) -> Result<usize, CpuError> {
        let mut cycles = 0;

        while cycles < n {
            if !self.poll_running() {
                break;
            }
            cycles += self.step()?;
        }

        Ok(cycles)
    }

    /// Turns a stop request into a pause.
    fn poll_running(&mut self) -> bool {
        if self.bus.shared().stop_requested() {
            self.bus.shared().clear_stop();
            self.paused = true;
            log::debug!("stop requested at cycle {}", self.bus.cycles());
        }
        !self.paused
    }

    pub fn start(&mut self) {
        self.paused = false;
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn halted(&self) -> Option<CpuError> {
        self.halted
    }

    /// Leaves the halt state by stepping over the offending byte.
    pub fn resume(&mut self) {
        if let Some(CpuError::UnknownOpcode { pc, .. }) = self.halted.take() {
            self.cpu.set_pc(pc.wrapping_add(1));
        }
    }

    pub fn framebuffer(&self) -> &[u8; WIDTH * HEIGHT] {
        self.bus.ppu().framebuffer()
    }

    pub fn cpu(&self) -> CpuStatus {
        self.cpu.status()
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut Bus {
        &mut self.bus
    }

    pub fn shared(&self) -> Arc<SharedState> {
        self.bus.shared().clone()
    }

    pub fn set_inputs(&mut self, p0: InputStates, p1: InputStates) {
        self.bus.set_input0(p0);
        self.bus.set_input1(p1);
    }
}
