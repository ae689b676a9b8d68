//! Scalars observable from outside the emulation thread.
//!
//! The bus is the only writer. It publishes once per CPU cycle, after the
//! three PPU dots of that cycle, so a reader never sees PPU state that is
//! ahead of the access it is paired with. Everything else only loads.

use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU64, AtomicU8, Ordering};

#[derive(Debug, Default)]
pub struct SharedState {
    cycles: AtomicU64,
    open_bus: AtomicU8,

    vram_addr: AtomicU16,
    ppu_ctrl: AtomicU8,
    ppu_mask: AtomicU8,
    ppu_status: AtomicU8,
    oam_addr: AtomicU8,
    scanline: AtomicU16,
    dot: AtomicU16,
    frame: AtomicU64,

    stop: AtomicBool,
}

/// Plain copy of the PPU scalars as last published.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PpuSnapshot {
    pub vram_addr: u16,
    pub ctrl: u8,
    pub mask: u8,
    pub status: u8,
    pub oam_addr: u8,
    pub scanline: u16,
    pub dot: u16,
    pub frame: u64,
}

impl SharedState {
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Acquire)
    }

    pub(crate) fn set_cycles(&self, cycles: u64) {
        self.cycles.store(cycles, Ordering::Release);
    }

    pub fn open_bus(&self) -> u8 {
        self.open_bus.load(Ordering::Relaxed)
    }

    pub(crate) fn set_open_bus(&self, data: u8) {
        self.open_bus.store(data, Ordering::Relaxed);
    }

    pub(crate) fn publish_ppu(&self, s: &PpuSnapshot) {
        self.vram_addr.store(s.vram_addr, Ordering::Relaxed);
        self.ppu_ctrl.store(s.ctrl, Ordering::Relaxed);
        self.ppu_mask.store(s.mask, Ordering::Relaxed);
        self.ppu_status.store(s.status, Ordering::Relaxed);
        self.oam_addr.store(s.oam_addr, Ordering::Relaxed);
        self.scanline.store(s.scanline, Ordering::Relaxed);
        self.dot.store(s.dot, Ordering::Relaxed);
        // release pairs with the acquire in `ppu`, ordering the stores above
        self.frame.store(s.frame, Ordering::Release);
    }

    pub fn ppu(&self) -> PpuSnapshot {
        let frame = self.frame.load(Ordering::Acquire);
        PpuSnapshot {
            vram_addr: self.vram_addr.load(Ordering::Relaxed),
            ctrl: self.ppu_ctrl.load(Ordering::Relaxed),
            mask: self.ppu_mask.load(Ordering::Relaxed),
            status: self.ppu_status.load(Ordering::Relaxed),
            oam_addr: self.oam_addr.load(Ordering::Relaxed),
            scanline: self.scanline.load(Ordering::Relaxed),
            dot: self.dot.load(Ordering::Relaxed),
            frame,
        }
    }

    /// Asks the running console to stop at the next step boundary.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub fn clear_stop(&self) {
        self.stop.store(false, Ordering::Release);
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }
}
