use crate::interrupt::{Interrupt, Interrupts};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Right,
    Left,
    Up,
    Down,
    A,
    B,
    Select,
    Start,
}

impl Button {
    /// Row bit and whether the button lives in the direction row.
    fn line(self) -> (u8, bool) {
        match self {
            Button::Right => (0x01, true),
            Button::Left => (0x02, true),
            Button::Up => (0x04, true),
            Button::Down => (0x08, true),
            Button::A => (0x01, false),
            Button::B => (0x02, false),
            Button::Select => (0x04, false),
            Button::Start => (0x08, false),
        }
    }
}

const SELECT_DIRECTIONS: u8 = 0x10;
const SELECT_BUTTONS: u8 = 0x20;

/// JOYP button matrix. Row and line bits are active low.
pub struct Input {
    select: u8,
    directions: u8,
    buttons: u8,
}

impl Input {
    pub fn new() -> Self {
        Self {
            select: SELECT_DIRECTIONS | SELECT_BUTTONS,
            directions: 0x0F,
            buttons: 0x0F,
        }
    }

    pub fn read(&self) -> u8 {
        0xC0 | self.select | self.lines()
    }

    pub fn write(&mut self, val: u8, irq: &mut Interrupts) {
        let before = self.lines();
        self.select = val & (SELECT_DIRECTIONS | SELECT_BUTTONS);
        self.raise_on_fall(before, irq);
    }

    /// Update one button. Returns true when this is a new press.
    pub fn set_button(&mut self, button: Button, pressed: bool, irq: &mut Interrupts) -> bool {
        let before = self.lines();
        let (bit, direction) = button.line();
        let row = if direction {
            &mut self.directions
        } else {
            &mut self.buttons
        };
        let was_pressed = *row & bit == 0;
        if pressed {
            *row &= !bit;
        } else {
            *row |= bit;
        }
        self.raise_on_fall(before, irq);
        pressed && !was_pressed
    }

    fn lines(&self) -> u8 {
        let mut lines = 0x0F;
        if self.select & SELECT_DIRECTIONS == 0 {
            lines &= self.directions;
        }
        if self.select & SELECT_BUTTONS == 0 {
            lines &= self.buttons;
        }
        lines
    }

    fn raise_on_fall(&self, before: u8, irq: &mut Interrupts) {
        if before & !self.lines() & 0x0F != 0 {
            irq.request(Interrupt::Joypad);
        }
    }
}

impl Default for Input {
    fn default() -> Self {
        Self::new()
    }
}
