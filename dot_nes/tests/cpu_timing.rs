//! Cycle counts observed on the bus.

mod common;

use common::{program, RomBuilder};
use dot_nes::cpu::{OP_CYCLES, OP_NAMES};
use dot_nes::{Bus, Cpu, CpuError};

const BRANCHES: [u8; 8] = [0x10, 0x30, 0x50, 0x70, 0x90, 0xb0, 0xd0, 0xf0];

#[test]
fn test_base_cycles() {
    for op in 0..=0xffu8 {
        if OP_CYCLES[op as usize] == 0 || BRANCHES.contains(&op) {
            continue;
        }

        // operand $10 / $0010: zero page, no index, no page crossing
        let (mut cpu, mut bus) = program(&[op, 0x10, 0x00]);
        assert_eq!(
            cpu.step(&mut bus),
            Ok(OP_CYCLES[op as usize] as usize),
            "{:02X} {}",
            op,
            OP_NAMES[op as usize]
        );
    }
}

#[test]
fn test_jam_reports_unknown_opcode() {
    let (mut cpu, mut bus) = program(&[0x42]);
    assert_eq!(
        cpu.step(&mut bus),
        Err(CpuError::UnknownOpcode {
            pc: 0x0300,
            opcode: 0x42
        })
    );
}

fn run(code: &[u8], steps: usize, setup: impl FnOnce(&mut Bus)) -> (Cpu, Bus, usize) {
    let (mut cpu, mut bus) = program(code);
    setup(&mut bus);

    let mut last = 0;
    for _ in 0..steps {
        last = cpu.step(&mut bus).unwrap();
    }
    (cpu, bus, last)
}

#[test]
fn test_page_cross_penalty() {
    // LDX #$20, LDA $02F0,X
    let (cpu, _, cycles) = run(&[0xa2, 0x20, 0xbd, 0xf0, 0x02], 2, |_| {});
    assert_eq!(cycles, 5);
    assert_eq!(cpu.status().pc, 0x0305);

    // LDX #$0F, LDA $02F0,X
    let (_, _, cycles) = run(&[0xa2, 0x0f, 0xbd, 0xf0, 0x02], 2, |_| {});
    assert_eq!(cycles, 4);

    // stores always pay: LDX #$00, STA $02F0,X
    let (_, _, cycles) = run(&[0xa2, 0x00, 0x9d, 0xf0, 0x02], 2, |_| {});
    assert_eq!(cycles, 5);

    // LDY #$20, LDA ($10),Y with ($10) = $02F0
    let (cpu, _, cycles) = run(&[0xa0, 0x20, 0xb1, 0x10], 2, |bus| {
        bus.write(0x0010, 0xf0);
        bus.write(0x0011, 0x02);
        bus.write(0x0310, 0x77);
    });
    assert_eq!(cycles, 6);
    assert_eq!(cpu.status().a, 0x77);
}

#[test]
fn test_branch_cycles() {
    // LDA #$01, BNE +2 (taken, same page)
    let (cpu, _, cycles) = run(&[0xa9, 0x01, 0xd0, 0x02], 2, |_| {});
    assert_eq!(cycles, 3);
    assert_eq!(cpu.status().pc, 0x0306);

    // LDA #$00, BNE +2 (not taken)
    let (cpu, _, cycles) = run(&[0xa9, 0x00, 0xd0, 0x02], 2, |_| {});
    assert_eq!(cycles, 2);
    assert_eq!(cpu.status().pc, 0x0304);

    // LDA #$01, BNE -8 (taken, into page $02)
    let (cpu, _, cycles) = run(&[0xa9, 0x01, 0xd0, 0xf8], 2, |_| {});
    assert_eq!(cycles, 4);
    assert_eq!(cpu.status().pc, 0x02fc);
}

#[test]
fn test_unmapped_reads() {
    // LDA $5000
    let (cpu, bus, _) = run(&[0xad, 0x00, 0x50], 1, |_| {});
    assert_eq!(cpu.status().a, 0x50);
    assert_eq!(bus.open_bus(), 0x50);

    // LDX #$20, LDA $4FF0,X sees the operand high byte still latched
    let (cpu, _, cycles) = run(&[0xa2, 0x20, 0xbd, 0xf0, 0x4f], 2, |_| {});
    assert_eq!(cpu.status().a, 0x4f);
    assert_eq!(cycles, 5);

    // LDA #$33, STA $00, LDX #$00, LDA ($00,X) with ($00) = $5033
    let (cpu, _, _) = run(&[0xa9, 0x33, 0x85, 0x00, 0xa2, 0x00, 0xa1, 0x00], 4, |bus| {
        bus.write(0x0001, 0x50);
    });
    // the latch holds the pointer high byte
    assert_eq!(cpu.status().a, 0x50);
}

#[test]
fn test_reset_vector_from_cartridge() {
    let rom = RomBuilder::nrom(2).vectors(0x8000, 0xc123, 0x8000);
    let mut bus = Bus::new(rom.cartridge());
    let mut cpu = Cpu::default();
    cpu.reset(&mut bus);
    assert_eq!(cpu.status().pc, 0xc123);
}
