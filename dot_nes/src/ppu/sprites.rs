//! Sprite evaluation and the eight per-line sprite slots.
//!
//! Evaluation runs one OAM access per dot: odd dots read, even dots write
//! into secondary OAM. The read pointer is OAMADDR itself, so evaluation
//! starts wherever the CPU left it and leaves it advanced.

use crate::Cartridge;
use bit_field::BitField;

pub const SECONDARY_SIZE: usize = 0x20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EvalState {
    /// compare a Y byte against the next line
    Scan,
    /// copy the remaining bytes of an in-range sprite
    Copy(u8),
    /// eight found, search for a ninth with the broken byte increment
    Overflow,
    Done,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Slot {
    x: u8,
    attr: u8,
    lo: u8,
    hi: u8,
}

impl Slot {
    fn palette(&self) -> u8 {
        self.attr.get_bits(0..2)
    }

    fn behind_bg(&self) -> bool {
        self.attr.get_bit(5)
    }
}

/// Sprite pixel picked for one screen position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpritePixel {
    pub pixel: u8,
    pub palette: u8,
    pub behind_bg: bool,
    pub sprite0: bool,
}

pub struct Sprites {
    secondary: [u8; SECONDARY_SIZE],
    ptr: usize,
    latch: u8,
    state: EvalState,
    first: bool,
    wrapped: bool,
    sprite0_next: bool,

    slots: [Slot; 8],
    count: usize,
    sprite0_line: bool,
}

impl Default for Sprites {
    fn default() -> Self {
        Self {
            secondary: [0xff; SECONDARY_SIZE],
            ptr: 0,
            latch: 0,
            state: EvalState::Scan,
            first: true,
            wrapped: false,
            sprite0_next: false,

            slots: [Slot::default(); 8],
            count: 0,
            sprite0_line: false,
        }
    }
}

impl Sprites {
    /// Current secondary OAM byte pointer, 0..32.
    pub fn pointer(&self) -> usize {
        self.ptr & 0x1f
    }

    /// Dots 1-64: fill secondary OAM with $FF.
    pub fn clear(&mut self, dot: usize) {
        if dot % 2 == 0 {
            self.ptr = (dot / 2 - 1) & 0x1f;
            self.secondary[self.ptr] = 0xff;
        }
        if dot == 64 {
            self.ptr = 0;
            self.state = EvalState::Scan;
            self.first = true;
            self.wrapped = false;
            self.sprite0_next = false;
        }
    }

    /// Dots 65-256: one evaluation access. Returns true when the overflow
    /// flag should be raised.
    pub fn evaluate(
        &mut self,
        oam: &[u8; 0x100],
        oam_addr: &mut u8,
        dot: usize,
        line: usize,
        height: u16,
    ) -> bool {
        if dot % 2 == 1 {
            self.latch = oam[*oam_addr as usize];
            return false;
        }

        let in_range = {
            let diff = line as i32 - self.latch as i32;
            diff >= 0 && diff < height as i32
        };

        match self.state {
            EvalState::Scan => {
                self.secondary[self.ptr] = self.latch;
                if in_range {
                    self.sprite0_next |= self.first;
                    self.ptr += 1;
                    self.state = EvalState::Copy(3);
                    self.wrapped |= advance(oam_addr, 1);
                } else if advance(oam_addr, 4) {
                    self.state = EvalState::Done;
                }
                self.first = false;
            }
            EvalState::Copy(n) => {
                self.secondary[self.ptr] = self.latch;
                self.ptr += 1;
                self.wrapped |= advance(oam_addr, 1);
                self.state = if n > 1 {
                    EvalState::Copy(n - 1)
                } else if self.wrapped {
                    EvalState::Done
                } else if self.ptr == SECONDARY_SIZE {
                    EvalState::Overflow
                } else {
                    EvalState::Scan
                };
            }
            EvalState::Overflow => {
                if in_range {
                    self.state = EvalState::Done;
                    return true;
                }
                // n and m both step, m without carrying into n
                let n = (*oam_addr as u16 >> 2) + 1;
                let m = (*oam_addr as u16 + 1) & 0x03;
                if n == 0x40 {
                    self.state = EvalState::Done;
                }
                *oam_addr = ((n << 2) | m) as u8;
            }
            EvalState::Done => {
                *oam_addr = (*oam_addr & 0xfc).wrapping_add(4);
            }
        }

        false
    }

    /// Dots 257-320: fill slot `i` from secondary OAM for line `line + 1`.
    pub fn fetch(&mut self, cart: &Cartridge, i: usize, line: usize, height: u16, table: u16) {
        if i == 0 {
            self.count = self.ptr / 4;
            self.sprite0_line = self.sprite0_next;
        }

        let b = &self.secondary[i * 4..][..4];
        let (y, tile, attr, x) = (b[0], b[1], b[2], b[3]);

        let mut row = (line as u16).wrapping_sub(y as u16) & (height - 1);
        if attr.get_bit(7) {
            row = height - 1 - row;
        }

        let addr = if height == 16 {
            let table = (tile as u16 & 0x01) * 0x1000;
            let tile = (tile as u16 & 0xfe) + (row >> 3);
            table + tile * 16 + (row & 0x07)
        } else {
            table + tile as u16 * 16 + row
        };

        let mut lo = cart.chr_read(addr);
        let mut hi = cart.chr_read(addr + 8);
        if attr.get_bit(6) {
            lo = lo.reverse_bits();
            hi = hi.reverse_bits();
        }

        self.slots[i] = if i < self.count {
            Slot { x, attr, lo, hi }
        } else {
            Slot::default()
        };
    }

    /// Sprites of a line that is not evaluated.
    pub fn clear_line(&mut self) {
        self.count = 0;
        self.sprite0_line = false;
    }

    /// Picks the first opaque sprite at the current pixel and advances the
    /// x counters and shifters of every slot.
    pub fn pixel(&mut self, visible: bool) -> Option<SpritePixel> {
        let mut out = None;

        for (i, slot) in self.slots[..self.count].iter_mut().enumerate() {
            if slot.x > 0 {
                slot.x -= 1;
                continue;
            }

            let pixel = (slot.lo >> 7) | ((slot.hi >> 7) << 1);
            slot.lo <<= 1;
            slot.hi <<= 1;

            if visible && out.is_none() && pixel != 0 {
                out = Some(SpritePixel {
                    pixel,
                    palette: slot.palette(),
                    behind_bg: slot.behind_bg(),
                    sprite0: i == 0 && self.sprite0_line,
                });
            }
        }

        out
    }
}

/// Steps OAMADDR, reporting a carry out of the top.
fn advance(oam_addr: &mut u8, n: u8) -> bool {
    let (next, wrapped) = oam_addr.overflowing_add(n);
    *oam_addr = next;
    wrapped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_eval(oam: &[u8; 0x100], start: u8, line: usize) -> (Sprites, u8, bool) {
        let mut sprites = Sprites::default();
        for dot in 1..=64 {
            sprites.clear(dot);
        }

        let mut oam_addr = start;
        let mut overflow = false;
        for dot in 65..=256 {
            overflow |= sprites.evaluate(oam, &mut oam_addr, dot, line, 8);
        }
        (sprites, oam_addr, overflow)
    }

    #[test]
    fn test_eval_copies_in_range() {
        let mut oam = [0xffu8; 0x100];
        oam[..4].copy_from_slice(&[10, 1, 2, 3]);
        oam[8..12].copy_from_slice(&[14, 4, 5, 6]);

        let (sprites, _, overflow) = run_eval(&oam, 0, 15);
        assert!(!overflow);
        assert_eq!(sprites.ptr, 8);
        assert_eq!(&sprites.secondary[..8], &[10, 1, 2, 3, 14, 4, 5, 6]);
        assert_eq!(sprites.secondary[8], 0xff);
        assert!(sprites.sprite0_next);
    }

    #[test]
    fn test_eval_starts_at_oam_addr() {
        let mut oam = [0xffu8; 0x100];
        oam[..4].copy_from_slice(&[10, 1, 2, 3]);

        let (sprites, _, _) = run_eval(&oam, 4, 12);
        assert_eq!(sprites.ptr, 0);
        assert!(!sprites.sprite0_next);
    }

    #[test]
    fn test_eval_walks_oam_addr() {
        let oam = [0xffu8; 0x100];
        let mut sprites = Sprites::default();
        for dot in 1..=64 {
            sprites.clear(dot);
        }

        let mut oam_addr = 0;
        let mut trace = vec![];
        for dot in 65..=256 {
            sprites.evaluate(&oam, &mut oam_addr, dot, 20, 8);
            if dot % 32 == 0 {
                trace.push(oam_addr);
            }
        }
        // one full pass over 64 sprites, then +4 per write until dot 256
        assert_eq!(trace, vec![64, 128, 192, 0, 64, 128]);
        assert_eq!(sprites.state, EvalState::Done);
    }

    #[test]
    fn test_eval_overflow() {
        let mut oam = [0xffu8; 0x100];
        for i in 0..9 {
            oam[i * 4] = 20;
        }

        let (sprites, _, overflow) = run_eval(&oam, 0, 20);
        assert_eq!(sprites.ptr, SECONDARY_SIZE);
        assert!(overflow);
    }

    #[test]
    fn test_eight_sprites_no_overflow() {
        let mut oam = [0xffu8; 0x100];
        for i in 0..8 {
            oam[i * 4] = 20;
        }

        let (_, _, overflow) = run_eval(&oam, 0, 20);
        assert!(!overflow);
    }
}
