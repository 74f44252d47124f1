use crate::interrupt::{Interrupt, Interrupts};

/// Counter value left behind by the DMG boot ROM.
pub const POWER_ON_COUNTER: u16 = 0xABCC;

/// Progress through the two M-cycles that follow a TIMA overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Overflow {
    Idle,
    /// TIMA just wrapped; the next timer step is the reload cycle.
    ReloadNext,
    /// TMA was copied into TIMA; the next timer step ends the overflow window.
    Reloaded,
}

pub struct Timer {
    /// 16-bit internal divider counter. DIV register is the upper 8 bits.
    pub counter: u16,
    /// Timer counter
    pub tima: u8,
    /// Timer modulo
    pub tma: u8,
    /// Timer control
    pub tac: u8,
    last_edge: bool,
    overflow: Overflow,
    tima_written: bool,
    tma_written: bool,
    div_reset: bool,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            counter: POWER_ON_COUNTER,
            tima: 0,
            tma: 0,
            tac: 0,
            last_edge: false,
            overflow: Overflow::Idle,
            tima_written: false,
            tma_written: false,
            div_reset: false,
        }
    }

    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            0xFF04 => self.div(),
            0xFF05 => self.tima,
            0xFF06 => self.tma,
            0xFF07 => self.tac | 0xF8,
            _ => 0xFF,
        }
    }

    pub fn write(&mut self, addr: u16, val: u8, irq: &mut Interrupts) {
        match addr {
            0xFF04 => {
                // Applied by the next step so DIV never reads a half-reset value.
                self.div_reset = true;
            }
            0xFF05 => {
                if self.overflow == Overflow::Reloaded {
                    return;
                }
                self.tima = val;
                self.tima_written = true;
            }
            0xFF06 => {
                self.tma = val;
                self.tma_written = true;
            }
            0xFF07 => {
                self.tac = val & 0x07;
                let edge = Self::edge_with(self.counter, self.tac);
                if self.last_edge && !edge {
                    self.increment(irq);
                }
                self.last_edge = edge;
            }
            _ => {}
        }
    }

    pub fn div(&self) -> u8 {
        (self.counter >> 8) as u8
    }

    /// Whether TIMA wrapped within the last two M-cycles.
    pub fn overflow_pending(&self) -> bool {
        self.overflow != Overflow::Idle
    }

    /// Advance the timer by one M-cycle.
    pub fn step(&mut self, irq: &mut Interrupts) {
        match self.overflow {
            Overflow::ReloadNext => {
                if !self.tima_written {
                    self.tima = self.tma;
                }
                self.overflow = Overflow::Reloaded;
            }
            Overflow::Reloaded => {
                if self.tma_written {
                    self.tima = self.tma;
                }
                self.overflow = Overflow::Idle;
            }
            Overflow::Idle => {}
        }
        self.tima_written = false;
        self.tma_written = false;

        self.counter = if self.div_reset {
            self.div_reset = false;
            0
        } else {
            self.counter.wrapping_add(4)
        };

        let edge = Self::edge_with(self.counter, self.tac);
        if self.last_edge && !edge {
            self.increment(irq);
        }
        self.last_edge = edge;
    }

    fn increment(&mut self, irq: &mut Interrupts) {
        if self.tima == 0xFF {
            self.tima = 0;
            self.overflow = Overflow::ReloadNext;
            irq.request(Interrupt::Timer);
        } else {
            self.tima += 1;
        }
    }

    fn edge_with(counter: u16, tac: u8) -> bool {
        if tac & 0x04 == 0 {
            return false;
        }
        let bit = match tac & 0x03 {
            0 => 9,
            1 => 3,
            2 => 5,
            _ => 7,
        };
        counter & (1 << bit) != 0
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
