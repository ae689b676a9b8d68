//! Greyscale dump of the framebuffer.

use anyhow::Context;
use dot_nes::ppu::{HEIGHT, WIDTH};
use std::io::Write;
use std::path::Path;

#[rustfmt::skip]
const PALETTE: [(u8, u8, u8); 64] = [
    (84, 84, 84), (0, 30, 116), (8, 22, 147), (48, 12, 154), (92, 4, 121), (136, 6, 85), (147, 22, 34), (132, 48, 0),
    (76, 84, 0), (12, 102, 0), (0, 120, 44), (0, 106, 132), (0, 84, 136), (0, 0, 0), (0, 0, 0), (0, 0, 0),
    (160, 160, 160), (0, 70, 196), (48, 92, 255), (92, 70, 255), (136, 58, 255), (196, 78, 255), (204, 92, 204), (255, 114, 136),
    (255, 147, 84), (255, 173, 0), (216, 196, 0), (120, 214, 0), (0, 230, 116), (0, 196, 214), (0, 160, 255), (0, 0, 0),
    (255, 255, 255), (48, 152, 255), (120, 147, 255), (176, 138, 255), (220, 132, 255), (255, 152, 255), (255, 165, 214), (255, 188, 160),
    (255, 214, 136), (255, 234, 120), (255, 255, 160), (188, 255, 160), (120, 255, 188), (120, 255, 255), (120, 214, 255), (84, 84, 255),
    (255, 255, 255), (166, 230, 255), (188, 220, 255), (204, 214, 255), (214, 204, 255), (220, 204, 255), (214, 208, 230), (220, 214, 204),
    (234, 220, 196), (255, 230, 188), (240, 234, 196), (214, 240, 196), (188, 244, 214), (188, 244, 230), (188, 230, 244), (176, 176, 255),
];

fn luma(color: u8) -> u8 {
    let (r, g, b) = PALETTE[color as usize & 0x3f];
    ((r as u32 * 299 + g as u32 * 587 + b as u32 * 114) / 1000) as u8
}

pub fn encode(frame: &[u8; WIDTH * HEIGHT]) -> Vec<u8> {
    let mut out = Vec::with_capacity(WIDTH * HEIGHT + 16);
    // writing into a Vec cannot fail
    let _ = write!(out, "P5\n{} {}\n255\n", WIDTH, HEIGHT);
    out.extend(frame.iter().map(|&c| luma(c)));
    out
}

pub fn write(path: &Path, frame: &[u8; WIDTH * HEIGHT]) -> anyhow::Result<()> {
    std::fs::write(path, encode(frame)).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode() {
        let mut frame = [0x0fu8; WIDTH * HEIGHT];
        frame[0] = 0x30;

        let out = encode(&frame);
        let header = b"P5\n256 240\n255\n";
        assert_eq!(&out[..header.len()], header);
        assert_eq!(out.len(), header.len() + WIDTH * HEIGHT);
        assert_eq!(out[header.len()], 255);
        assert_eq!(out[header.len() + 1], 0);
    }
}
