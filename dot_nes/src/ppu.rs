use self::regs::*;
use self::sprites::Sprites;
use crate::shared::PpuSnapshot;
use crate::Cartridge;

mod regs;
mod sprites;

const OAM_SIZE: usize = 0x100;
const NAMETABLE_SIZE: usize = 0x1000;
const PALETTES_SIZE: usize = 0x20;

pub const WIDTH: usize = 256;
pub const HEIGHT: usize = 240;

const VBLANK_LINE: usize = 241;
const PRE_RENDER_LINE: usize = 261;
const DOTS_PER_LINE: usize = 341;

/// Register view for inspection tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PpuRegisters {
    pub ctrl: u8,
    pub mask: u8,
    pub status: u8,
    pub oam_addr: u8,
    pub v: u16,
    pub t: u16,
    pub x: u8,
    pub w: bool,
    pub scanline: u16,
    pub dot: u16,
}

pub struct Ppu {
    nametables: Box<[u8; NAMETABLE_SIZE]>,
    palettes: [u8; PALETTES_SIZE],
    oam: Box<[u8; OAM_SIZE]>,

    ctrl: PpuCtrl,
    mask: PpuMask,
    status: PpuStatus,
    oam_addr: u8,
    io_latch: u8,
    data_buf: u8,

    v: VramAddr,
    t: VramAddr,
    x: u8,
    w: bool,
    line: usize,
    dot: usize,
    frame: u64,
    odd_frame: bool,
    nmi_line: bool,
    nmi_edge: bool,

    nt_byte: u8,
    at_byte: u8,
    bg_lo: u8,
    bg_hi: u8,
    bg_pattern: ShiftReg,
    bg_attr: ShiftReg,

    sprites: Sprites,
    corrupt_row: Option<usize>,

    framebuffer: Box<[u8; WIDTH * HEIGHT]>,
}

impl Default for Ppu {
    fn default() -> Self {
        Self {
            nametables: Box::new([0u8; NAMETABLE_SIZE]),
            palettes: [0u8; PALETTES_SIZE],
            oam: Box::new([0u8; OAM_SIZE]),

            ctrl: PpuCtrl::default(),
            mask: PpuMask::default(),
            status: PpuStatus::default(),
            oam_addr: 0,
            io_latch: 0,
            data_buf: 0,

            v: VramAddr::default(),
            t: VramAddr::default(),
            x: 0,
            w: false,
            line: 0,
            dot: 0,
            frame: 0,
            odd_frame: false,
            nmi_line: false,
            nmi_edge: false,

            nt_byte: 0,
            at_byte: 0,
            bg_lo: 0,
            bg_hi: 0,
            bg_pattern: ShiftReg::default(),
            bg_attr: ShiftReg::default(),

            sprites: Sprites::default(),
            corrupt_row: None,

            framebuffer: Box::new([0u8; WIDTH * HEIGHT]),
        }
    }
}

impl Ppu {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset line: clears the control registers and the write toggle, the
    /// raster position keeps running.
    pub fn reset(&mut self) {
        self.ctrl.set(0);
        self.mask.set(0);
        self.w = false;
        self.data_buf = 0;
        self.nmi_line = false;
        self.nmi_edge = false;
        self.corrupt_row = None;
    }

    /// Runs the dot at the current position, then moves to the next one.
    pub fn tick(&mut self, cart: &Cartridge) {
        let visible = self.line < HEIGHT;
        let pre = self.line == PRE_RENDER_LINE;

        if pre && self.dot == 1 {
            self.status.set_vblank(false);
            self.status.set_sp0_hit(false);
            self.status.set_sp_overflow(false);
            self.update_nmi();
        }

        if (visible || pre) && self.mask.rendering() {
            self.render_dot(cart, visible);
        }

        if visible && (1..=WIDTH).contains(&self.dot) {
            self.output_pixel();
        }

        if self.line == VBLANK_LINE && self.dot == 1 {
            self.status.set_vblank(true);
            self.update_nmi();
        }

        self.advance();
    }

    /// Consumes the NMI edge raised since the last call.
    pub fn take_nmi(&mut self) -> bool {
        std::mem::take(&mut self.nmi_edge)
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// (scanline, dot) of the next dot to run.
    pub fn position(&self) -> (usize, usize) {
        (self.line, self.dot)
    }

    /// 6-bit palette indices, row major.
    pub fn framebuffer(&self) -> &[u8; WIDTH * HEIGHT] {
        &self.framebuffer
    }

    pub fn oam(&self) -> &[u8; OAM_SIZE] {
        &self.oam
    }

    pub fn registers(&self) -> PpuRegisters {
        PpuRegisters {
            ctrl: self.ctrl.get(),
            mask: self.mask.get(),
            status: self.status.get(),
            oam_addr: self.oam_addr,
            v: self.v.get(),
            t: self.t.get(),
            x: self.x,
            w: self.w,
            scanline: self.line as u16,
            dot: self.dot as u16,
        }
    }

    pub(crate) fn snapshot(&self) -> PpuSnapshot {
        PpuSnapshot {
            vram_addr: self.v.get(),
            ctrl: self.ctrl.get(),
            mask: self.mask.get(),
            status: self.status.get(),
            oam_addr: self.oam_addr,
            scanline: self.line as u16,
            dot: self.dot as u16,
            frame: self.frame,
        }
    }

    fn advance(&mut self) {
        if self.line == PRE_RENDER_LINE
            && self.dot == DOTS_PER_LINE - 2
            && self.odd_frame
            && self.mask.rendering()
        {
            self.dot += 1;
        }

        self.dot += 1;
        if self.dot == DOTS_PER_LINE {
            self.dot = 0;
            self.line += 1;

            if self.line == PRE_RENDER_LINE + 1 {
                self.line = 0;
                self.frame += 1;
                self.odd_frame = !self.odd_frame;
            }
        }
    }

    fn rendering_line(&self) -> bool {
        self.line < HEIGHT || self.line == PRE_RENDER_LINE
    }

    fn update_nmi(&mut self) {
        let level = self.status.vblank() && self.ctrl.nmi_on();
        if level && !self.nmi_line {
            self.nmi_edge = true;
        }
        self.nmi_line = level;
    }
}

/// rendering pipeline
impl Ppu {
    fn render_dot(&mut self, cart: &Cartridge, visible: bool) {
        let dot = self.dot;

        if (2..=257).contains(&dot) || (321..=337).contains(&dot) {
            self.bg_pattern.shift();
            self.bg_attr.shift();

            match (dot - 1) % 8 {
                0 => {
                    self.load_bg();
                    self.nt_byte = self.read_vram(cart, self.v.tile_addr());
                }
                2 => {
                    let mut at = self.read_vram(cart, self.v.attr_addr());
                    if self.v.coarse_y() & 0x02 != 0 {
                        at >>= 4;
                    }
                    if self.v.coarse_x() & 0x02 != 0 {
                        at >>= 2;
                    }
                    self.at_byte = at & 0x03;
                }
                4 => self.bg_lo = cart.chr_read(self.bg_tile_addr()),
                6 => self.bg_hi = cart.chr_read(self.bg_tile_addr() + 8),
                7 => self.v.inc_coarse_x(),
                _ => {}
            }
        }

        match dot {
            256 => self.v.inc_y(),
            257 => self.v.copy_vx(&self.t),
            338 | 340 => self.nt_byte = self.read_vram(cart, self.v.tile_addr()),
            _ => {}
        }

        if self.line == PRE_RENDER_LINE && (280..=304).contains(&dot) {
            self.v.copy_vy(&self.t);
        }

        let height = self.ctrl.sp_size();
        if visible {
            match dot {
                1..=64 => self.sprites.clear(dot),
                65..=256 => {
                    let overflow =
                        self.sprites
                            .evaluate(&self.oam, &mut self.oam_addr, dot, self.line, height);
                    if overflow {
                        self.status.set_sp_overflow(true);
                    }
                }
                _ => {}
            }
        }

        if (257..=320).contains(&dot) {
            self.oam_addr = 0;

            if (dot - 257) % 8 == 7 {
                let slot = (dot - 257) / 8;
                if visible {
                    let table = self.ctrl.sp_pattern_table();
                    self.sprites.fetch(cart, slot, self.line, height, table);
                } else if slot == 0 {
                    self.sprites.clear_line();
                }
            }
        }
    }

    fn bg_tile_addr(&self) -> u16 {
        self.ctrl.bg_pattern_table() + self.nt_byte as u16 * 16 + self.v.y()
    }

    fn load_bg(&mut self) {
        self.bg_pattern.latch(self.bg_lo, self.bg_hi);
        let a0 = if self.at_byte & 0x01 != 0 { 0xff } else { 0x00 };
        let a1 = if self.at_byte & 0x02 != 0 { 0xff } else { 0x00 };
        self.bg_attr.latch(a0, a1);
    }

    fn output_pixel(&mut self) {
        let x = self.dot - 1;

        let color = if self.mask.rendering() {
            let (bg, bg_pal) = if self.mask.show_bg() && (x >= 8 || self.mask.show_bg_left()) {
                let fx = self.x as usize;
                (self.bg_pattern.get(fx), self.bg_attr.get(fx))
            } else {
                (0, 0)
            };

            let sp_visible = self.mask.show_sp() && (x >= 8 || self.mask.show_sp_left());
            let addr = match self.sprites.pixel(sp_visible) {
                Some(sp) => {
                    if sp.sprite0 && bg != 0 && x != WIDTH - 1 {
                        self.status.set_sp0_hit(true);
                    }
                    if bg != 0 && sp.behind_bg {
                        bg_pal * 4 + bg
                    } else {
                        0x10 + sp.palette * 4 + sp.pixel
                    }
                }
                None if bg != 0 => bg_pal * 4 + bg,
                None => 0,
            };
            self.palettes[palette_index(addr as u16)]
        } else {
            let v = self.v.addr();
            if v >= 0x3f00 {
                self.palettes[palette_index(v)]
            } else {
                self.palettes[0]
            }
        };

        let color = if self.mask.gray_scale() {
            color & 0x30
        } else {
            color & 0x3f
        };
        self.framebuffer[self.line * WIDTH + x] = color;
    }
}

/// cpu registers
impl Ppu {
    pub fn read(&mut self, cart: &Cartridge, addr: u16) -> u8 {
        let data = match addr & 0x07 {
            0x02 => {
                let b = self.status.get() | (self.io_latch & 0x1f);
                self.status.set_vblank(false);
                self.w = false;
                self.update_nmi();
                b
            }
            0x04 => self.read_oam(),
            0x07 => {
                let addr = self.v.addr();
                let data = if addr >= 0x3f00 {
                    // the buffer sees the nametable under the palette
                    self.data_buf = self.read_vram(cart, addr - 0x1000);
                    self.read_vram(cart, addr) | (self.io_latch & 0xc0)
                } else {
                    let b = self.data_buf;
                    self.data_buf = self.read_vram(cart, addr);
                    b
                };
                self.inc_vram_addr();
                data
            }
            _ => self.io_latch,
        };

        self.io_latch = data;
        data
    }

    /// Register read without side effects.
    pub fn peek(&self, cart: &Cartridge, addr: u16) -> u8 {
        match addr & 0x07 {
            0x02 => self.status.get() | (self.io_latch & 0x1f),
            0x04 => self.read_oam(),
            0x07 => {
                let addr = self.v.addr();
                if addr >= 0x3f00 {
                    self.read_vram(cart, addr) | (self.io_latch & 0xc0)
                } else {
                    self.data_buf
                }
            }
            _ => self.io_latch,
        }
    }

    pub fn write(&mut self, cart: &mut Cartridge, addr: u16, data: u8) {
        self.io_latch = data;

        match addr & 0x07 {
            0x00 => {
                self.ctrl.set(data);
                self.t.set_nm(self.ctrl.nametable());
                self.update_nmi();
            }
            0x01 => self.write_mask(data),
            0x02 => {}
            0x03 => self.oam_addr = data,
            0x04 => {
                if self.rendering_line() && self.mask.rendering() {
                    self.oam_addr = self.oam_addr.wrapping_add(4);
                } else {
                    self.oam[self.oam_addr as usize] = data;
                    self.oam_addr = self.oam_addr.wrapping_add(1);
                }
            }
            0x05 => {
                if !self.w {
                    self.t.set_coarse_x((data >> 3) as u16);
                    self.x = data & 0b0111;
                } else {
                    self.t.set_coarse_y((data >> 3) as u16);
                    self.t.set_y((data & 0b0111) as u16);
                }
                self.w = !self.w;
            }
            0x06 => {
                if !self.w {
                    self.t.set_bits(0x08..0x0f, (data & 0b0011_1111) as u16);
                } else {
                    self.t.set_bits(0x00..0x08, data as u16);
                    self.v = self.t;
                }
                self.w = !self.w;
            }
            0x07 => {
                self.write_vram(cart, self.v.addr(), data);
                self.inc_vram_addr();
            }
            _ => unreachable!(),
        }
    }

    fn write_mask(&mut self, data: u8) {
        let was = self.mask.rendering();
        self.mask.set(data);
        let now = self.mask.rendering();

        if was && !now && self.rendering_line() {
            self.corrupt_row = Some(self.sprites.pointer());
        } else if !was && now {
            if let Some(row) = self.corrupt_row.take() {
                self.oam.copy_within(0..8, row * 8);
            }
        }
    }

    fn read_oam(&self) -> u8 {
        if self.rendering_line() && self.mask.rendering() && (1..=64).contains(&self.dot) {
            return 0xff;
        }

        let b = self.oam[self.oam_addr as usize];
        if self.oam_addr & 0x03 == 0x02 {
            b & 0xe3
        } else {
            b
        }
    }

    fn inc_vram_addr(&mut self) {
        if self.rendering_line() && self.mask.rendering() {
            self.v.inc_coarse_x();
            self.v.inc_y();
        } else {
            self.v.inc(self.ctrl.addr_inc());
        }
    }

    fn read_vram(&self, cart: &Cartridge, addr: u16) -> u8 {
        let addr = addr & 0x3fff;
        match addr {
            0x0000..=0x1fff => cart.chr_read(addr),
            0x2000..=0x3eff => self.nametables[cart.nm_addr(addr)],
            0x3f00..=0x3fff => self.palettes[palette_index(addr)],
            _ => unreachable!(),
        }
    }

    fn write_vram(&mut self, cart: &mut Cartridge, addr: u16, data: u8) {
        let addr = addr & 0x3fff;
        match addr {
            0x0000..=0x1fff => cart.chr_write(addr, data),
            0x2000..=0x3eff => self.nametables[cart.nm_addr(addr)] = data,
            0x3f00..=0x3fff => self.palettes[palette_index(addr)] = data & 0x3f,
            _ => unreachable!(),
        }
    }
}

/// $3F10/$3F14/$3F18/$3F1C share storage with $3F00/$3F04/$3F08/$3F0C.
fn palette_index(addr: u16) -> usize {
    let i = (addr & 0x1f) as usize;
    if i & 0x13 == 0x10 {
        i & 0x0f
    } else {
        i
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_to(ppu: &mut Ppu, cart: &Cartridge, line: usize, dot: usize) {
        while ppu.position() != (line, dot) {
            ppu.tick(cart);
        }
    }

    fn set_addr(ppu: &mut Ppu, cart: &mut Cartridge, addr: u16) {
        ppu.write(cart, 0x2006, (addr >> 8) as u8);
        ppu.write(cart, 0x2006, addr as u8);
    }

    #[test]
    fn test_palette_mirrors() {
        assert_eq!(palette_index(0x3f10), 0x00);
        assert_eq!(palette_index(0x3f1c), 0x0c);
        assert_eq!(palette_index(0x3f11), 0x11);
        assert_eq!(palette_index(0x3f2c), 0x0c);

        let mut cart = Cartridge::empty();
        let mut ppu = Ppu::new();
        set_addr(&mut ppu, &mut cart, 0x3f10);
        ppu.write(&mut cart, 0x2007, 0x21);
        set_addr(&mut ppu, &mut cart, 0x3f00);
        assert_eq!(ppu.read(&cart, 0x2007), 0x21);
    }

    #[test]
    fn test_palette_read_refills_buffer_from_nametable() {
        let mut cart = Cartridge::empty();
        let mut ppu = Ppu::new();
        set_addr(&mut ppu, &mut cart, 0x2f00);
        ppu.write(&mut cart, 0x2007, 0x5a);
        set_addr(&mut ppu, &mut cart, 0x3f00);
        ppu.write(&mut cart, 0x2007, 0x21);

        set_addr(&mut ppu, &mut cart, 0x3f00);
        assert_eq!(ppu.read(&cart, 0x2007), 0x21);
        set_addr(&mut ppu, &mut cart, 0x2100);
        assert_eq!(ppu.read(&cart, 0x2007), 0x5a);
    }

    #[test]
    fn test_data_access_while_rendering() {
        let mut cart = Cartridge::empty();
        let mut ppu = Ppu::new();
        ppu.write(&mut cart, 0x2001, 0x18);
        run_to(&mut ppu, &cart, 10, 330);

        // coarse X and fine Y both step, PPUCTRL increment is ignored
        set_addr(&mut ppu, &mut cart, 0x0000);
        ppu.read(&cart, 0x2007);
        assert_eq!(ppu.registers().v, 0x1001);
        ppu.write(&mut cart, 0x2007, 0x00);
        assert_eq!(ppu.registers().v, 0x2002);

        ppu.write(&mut cart, 0x2001, 0x00);
        ppu.write(&mut cart, 0x2007, 0x00);
        assert_eq!(ppu.registers().v, 0x2003);
    }

    #[test]
    fn test_oam_write_while_rendering() {
        let mut cart = Cartridge::empty();
        let mut ppu = Ppu::new();
        ppu.write(&mut cart, 0x2001, 0x18);
        run_to(&mut ppu, &cart, 10, 330);

        ppu.write(&mut cart, 0x2003, 0x11);
        ppu.write(&mut cart, 0x2004, 0x99);
        assert_eq!(ppu.registers().oam_addr, 0x15);
        assert_eq!(ppu.oam()[0x11], 0x00);

        run_to(&mut ppu, &cart, 245, 0);
        ppu.write(&mut cart, 0x2003, 0x11);
        ppu.write(&mut cart, 0x2004, 0x99);
        assert_eq!(ppu.registers().oam_addr, 0x12);
        assert_eq!(ppu.oam()[0x11], 0x99);
    }

    #[test]
    fn test_buffered_data_read() {
        let mut cart = Cartridge::empty();
        let mut ppu = Ppu::new();
        set_addr(&mut ppu, &mut cart, 0x2000);
        ppu.write(&mut cart, 0x2007, 0x55);
        ppu.write(&mut cart, 0x2007, 0x66);

        set_addr(&mut ppu, &mut cart, 0x2000);
        assert_eq!(ppu.read(&cart, 0x2007), 0x00);
        assert_eq!(ppu.read(&cart, 0x2007), 0x55);
        assert_eq!(ppu.read(&cart, 0x2007), 0x66);
        assert_eq!(ppu.registers().v, 0x2003);
    }

    #[test]
    fn test_vblank_and_nmi() {
        let mut cart = Cartridge::empty();
        let mut ppu = Ppu::new();
        ppu.write(&mut cart, 0x2000, 0x80);

        run_to(&mut ppu, &cart, VBLANK_LINE, 1);
        assert!(!ppu.take_nmi());
        ppu.tick(&cart);
        assert!(ppu.take_nmi());
        assert!(!ppu.take_nmi());

        ppu.write(&mut cart, 0x2005, 0x10);
        assert!(ppu.registers().w);
        assert_eq!(ppu.read(&cart, 0x2002) & 0x80, 0x80);
        assert!(!ppu.registers().w);
        assert_eq!(ppu.read(&cart, 0x2002) & 0x80, 0x00);

        run_to(&mut ppu, &cart, PRE_RENDER_LINE, 2);
        assert_eq!(ppu.registers().status, 0);
    }

    #[test]
    fn test_nmi_enable_inside_vblank() {
        let mut cart = Cartridge::empty();
        let mut ppu = Ppu::new();
        run_to(&mut ppu, &cart, 245, 0);
        assert!(!ppu.take_nmi());

        ppu.write(&mut cart, 0x2000, 0x80);
        assert!(ppu.take_nmi());
        ppu.write(&mut cart, 0x2000, 0x00);
        ppu.write(&mut cart, 0x2000, 0x80);
        assert!(ppu.take_nmi());

        ppu.read(&cart, 0x2002);
        ppu.write(&mut cart, 0x2000, 0x00);
        ppu.write(&mut cart, 0x2000, 0x80);
        assert!(!ppu.take_nmi());
    }

    #[test]
    fn test_odd_frame_skips_a_dot() {
        let mut cart = Cartridge::empty();
        let mut ppu = Ppu::new();
        ppu.write(&mut cart, 0x2001, 0x08);

        let mut ticks = 0;
        while ppu.frame() == 0 {
            ppu.tick(&cart);
            ticks += 1;
        }
        assert_eq!(ticks, 262 * 341);

        ticks = 0;
        while ppu.frame() == 1 {
            ppu.tick(&cart);
            ticks += 1;
        }
        assert_eq!(ticks, 262 * 341 - 1);
    }

    #[test]
    fn test_oam_addr_cleared_during_sprite_fetch() {
        let mut cart = Cartridge::empty();
        let mut ppu = Ppu::new();
        ppu.write(&mut cart, 0x2003, 0x40);
        ppu.write(&mut cart, 0x2001, 0x18);

        run_to(&mut ppu, &cart, 0, 321);
        assert_eq!(ppu.registers().oam_addr, 0);
    }

    #[test]
    fn test_oam_read_masks_attribute() {
        let mut cart = Cartridge::empty();
        let mut ppu = Ppu::new();
        ppu.write(&mut cart, 0x2003, 0x02);
        ppu.write(&mut cart, 0x2004, 0xff);
        ppu.write(&mut cart, 0x2003, 0x02);
        assert_eq!(ppu.read(&cart, 0x2004), 0xe3);
    }

    #[test]
    fn test_oam_corruption_on_rendering_toggle() {
        let mut cart = Cartridge::empty();
        let mut ppu = Ppu::new();
        ppu.write(&mut cart, 0x2003, 0x00);
        for i in 0..=255u8 {
            ppu.write(&mut cart, 0x2004, i);
        }

        ppu.write(&mut cart, 0x2001, 0x18);
        run_to(&mut ppu, &cart, 10, 11);
        ppu.write(&mut cart, 0x2001, 0x00);
        ppu.write(&mut cart, 0x2001, 0x18);

        assert_eq!(&ppu.oam()[32..40], &[0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(ppu.oam()[40], 40);
    }

    #[test]
    fn test_write_only_registers_read_latch() {
        let mut cart = Cartridge::empty();
        let mut ppu = Ppu::new();
        ppu.write(&mut cart, 0x2005, 0xa7);
        assert_eq!(ppu.read(&cart, 0x2000), 0xa7);
        assert_eq!(ppu.read(&cart, 0x2002), 0x07);
    }
}
