#![allow(clippy::identity_op)]

pub mod apu;
pub mod bus;
pub mod cart;
pub mod console;
pub mod cpu;
pub mod ppu;
pub mod shared;

pub use apu::Apu;
pub use bus::{Bus, InputStates};
pub use cart::{Cartridge, CartridgeError, Mirroring};
pub use console::Console;
pub use cpu::{Cpu, CpuError, CpuStatus};
pub use ppu::{Ppu, PpuRegisters};
pub use shared::{PpuSnapshot, SharedState};

/// NES NTSC
pub const MASTER_CLOCK: f32 = 2147_7272.0;

/// cpu frequency
pub const CPU_FREQUENCY: f32 = MASTER_CLOCK / 12.0;
