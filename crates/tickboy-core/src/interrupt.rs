/// The five interrupt lines, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    VBlank,
    Stat,
    Timer,
    Serial,
    Joypad,
}

impl Interrupt {
    pub const ALL: [Interrupt; 5] = [
        Interrupt::VBlank,
        Interrupt::Stat,
        Interrupt::Timer,
        Interrupt::Serial,
        Interrupt::Joypad,
    ];

    pub fn bit(self) -> u8 {
        1 << self as u8
    }

    pub fn vector(self) -> u16 {
        0x40 + 8 * self as u16
    }

    /// Highest-priority line set in `lines`, if any.
    pub fn highest(lines: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|irq| lines & irq.bit() != 0)
    }
}

const LINE_MASK: u8 = 0x1F;

/// IE/IF pair shared by every interrupt source.
#[derive(Debug, Clone)]
pub struct Interrupts {
    /// IE, all eight bits are kept as written.
    pub enable: u8,
    flags: u8,
}

impl Interrupts {
    pub fn new() -> Self {
        Self {
            enable: 0x00,
            flags: Interrupt::VBlank.bit(),
        }
    }

    pub fn request(&mut self, irq: Interrupt) {
        self.flags |= irq.bit();
    }

    pub fn acknowledge(&mut self, irq: Interrupt) {
        self.flags &= !irq.bit();
    }

    /// IF as seen on the bus.
    pub fn read_flags(&self) -> u8 {
        self.flags | !LINE_MASK
    }

    pub fn write_flags(&mut self, val: u8) {
        self.flags = val & LINE_MASK;
    }

    /// Requested and enabled lines.
    pub fn pending(&self) -> u8 {
        self.enable & self.flags & LINE_MASK
    }

    pub fn is_requested(&self, irq: Interrupt) -> bool {
        self.flags & irq.bit() != 0
    }
}

impl Default for Interrupts {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vectors_follow_priority_order() {
        let vectors: Vec<u16> = Interrupt::ALL.iter().map(|i| i.vector()).collect();
        assert_eq!(vectors, vec![0x40, 0x48, 0x50, 0x58, 0x60]);
    }

    #[test]
    fn lowest_bit_wins() {
        assert_eq!(Interrupt::highest(0b10100), Some(Interrupt::Timer));
        assert_eq!(Interrupt::highest(0), None);
    }

    #[test]
    fn flags_read_with_upper_bits_set() {
        let mut irq = Interrupts::new();
        irq.write_flags(0x00);
        assert_eq!(irq.read_flags(), 0xE0);
        irq.write_flags(0xFF);
        assert_eq!(irq.read_flags(), 0xFF);
        assert_eq!(irq.pending(), 0);
        irq.enable = 0xFF;
        assert_eq!(irq.pending(), 0x1F);
    }
}
