use bit_field::BitField;

/// Button state of one standard controller, as supplied by the host.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InputStates {
    pub a: bool,
    pub b: bool,
    pub select: bool,
    pub start: bool,
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl InputStates {
    /// Report order of the 4021 shift register, A first.
    fn report(self) -> u8 {
        let buttons = [
            self.a,
            self.b,
            self.select,
            self.start,
            self.up,
            self.down,
            self.left,
            self.right,
        ];
        let mut bits = 0u8;
        for (i, pressed) in buttons.into_iter().enumerate() {
            bits.set_bit(i, pressed);
        }
        bits
    }
}

#[derive(Debug, Default)]
struct Port {
    states: InputStates,
    shift: u8,
    /// bits clocked out since the last reload
    count: u8,
}

impl Port {
    fn reload(&mut self) {
        self.shift = self.states.report();
        self.count = 0;
    }

    fn clock(&mut self) -> u8 {
        let bit = self.peek();
        self.shift >>= 1;
        self.count = self.count.saturating_add(1);
        bit
    }

    /// After eight reads the register is empty and the serial line idles
    /// high.
    fn peek(&self) -> u8 {
        if self.count >= 8 {
            1
        } else {
            self.shift & 0x01
        }
    }
}

/// Both controller ports behind $4016/$4017.
#[derive(Debug, Default)]
pub struct Joystick {
    ports: [Port; 2],
    strobe: bool,
}

impl Joystick {
    /// Serial bit 0 of $4016/$4017; the upper bits are open bus.
    pub fn read(&mut self, addr: u16) -> u8 {
        let strobe = self.strobe;
        let port = &mut self.ports[(addr & 0x01) as usize];
        if strobe {
            // the register follows the buttons and keeps returning A
            port.reload();
            port.peek()
        } else {
            port.clock()
        }
    }

    pub fn peek(&self, addr: u16) -> u8 {
        let port = &self.ports[(addr & 0x01) as usize];
        if self.strobe {
            port.states.report() & 0x01
        } else {
            port.peek()
        }
    }

    /// $4016 write, bit 0 is the strobe for both ports.
    pub fn write(&mut self, data: u8) {
        self.strobe = data.get_bit(0);
        self.ports.iter_mut().for_each(Port::reload);
    }

    pub fn set_input0(&mut self, states: InputStates) {
        self.ports[0].states = states;
    }

    pub fn set_input1(&mut self, states: InputStates) {
        self.ports[1].states = states;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_order() {
        let mut joystick = Joystick::default();
        joystick.set_input0(InputStates {
            a: true,
            start: true,
            right: true,
            ..Default::default()
        });

        joystick.write(1);
        assert_eq!(joystick.read(0x4016), 1);
        assert_eq!(joystick.read(0x4016), 1);
        joystick.write(0);

        let bits: Vec<u8> = (0..10).map(|_| joystick.read(0x4016)).collect();
        assert_eq!(bits, vec![1, 0, 0, 1, 0, 0, 0, 1, 1, 1]);
        assert_eq!(joystick.read(0x4017), 0);
    }

    #[test]
    fn test_strobe_tracks_buttons() {
        let mut joystick = Joystick::default();
        joystick.write(1);
        assert_eq!(joystick.peek(0x4017), 0);

        joystick.set_input1(InputStates {
            a: true,
            ..Default::default()
        });
        assert_eq!(joystick.peek(0x4017), 1);
        assert_eq!(joystick.read(0x4017), 1);
    }
}
