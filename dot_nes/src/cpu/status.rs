use bit_field::BitField;
use std::fmt::Write;

/// Processor status flags.
///
/// Bit 5 has no storage and always reads back as 1. The break flag only
/// exists in the copy pushed to the stack, but it is kept here so a pushed
/// value can be inspected.
#[derive(Default, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    pub n: bool,
    pub v: bool,
    pub b: bool,
    pub d: bool,
    pub i: bool,
    pub z: bool,
    pub c: bool,
}

impl Status {
    pub fn set_zn(&mut self, value: u8) {
        self.z = value == 0;
        self.n = value.get_bit(7);
    }

    pub fn to_u8(self) -> u8 {
        let mut p = 0b0010_0000u8;
        p.set_bit(7, self.n)
            .set_bit(6, self.v)
            .set_bit(4, self.b)
            .set_bit(3, self.d)
            .set_bit(2, self.i)
            .set_bit(1, self.z)
            .set_bit(0, self.c);
        p
    }

    /// Value pushed by BRK/PHP (`brk == true`) or by NMI/IRQ.
    pub fn to_stack(self, brk: bool) -> u8 {
        let mut p = self.to_u8();
        p.set_bit(4, brk);
        p
    }
}

impl From<u8> for Status {
    /// PLP/RTI: bits 4 and 5 are dropped.
    fn from(p: u8) -> Self {
        Self {
            n: p.get_bit(7),
            v: p.get_bit(6),
            b: false,
            d: p.get_bit(3),
            i: p.get_bit(2),
            z: p.get_bit(1),
            c: p.get_bit(0),
        }
    }
}

impl std::fmt::Debug for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let flags = [
            (self.n, 'N'),
            (self.v, 'V'),
            (false, '-'),
            (self.b, 'B'),
            (self.d, 'D'),
            (self.i, 'I'),
            (self.z, 'Z'),
            (self.c, 'C'),
        ];
        for (set, name) in flags {
            f.write_char(if set { name } else { '-' })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status() {
        let mut s = Status::default();
        assert_eq!(s.to_u8(), 0b0010_0000);

        s.set_zn(0x80);
        assert!(s.n && !s.z);
        s.set_zn(0x00);
        assert!(!s.n && s.z);

        let s: Status = 0b1111_1111u8.into();
        assert_eq!(s.to_u8(), 0b1110_1111);
        assert_eq!(format!("{:?}", s), "NV--DIZC".to_owned());
    }

    #[test]
    fn test_stack_copy() {
        let s: Status = 0b1100_0011u8.into();
        assert_eq!(s.to_stack(true), 0b1111_0011);
        assert_eq!(s.to_stack(false), 0b1110_0011);
    }
}
