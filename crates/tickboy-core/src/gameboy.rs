use std::sync::atomic::{AtomicBool, Ordering};

use crate::{
    cartridge::{Cartridge, CartridgeError},
    config::Config,
    cpu::Cpu,
    input::Button,
    mmu::Mmu,
    ppu::{FRAME_CYCLES, Framebuffer},
};

/// Receives a finished frame after every 17 556 M-cycles. Implementations
/// may block to pace emulation.
pub trait FrameSink {
    fn frame(&mut self, framebuffer: &Framebuffer);
}

impl<F: FnMut(&Framebuffer)> FrameSink for F {
    fn frame(&mut self, framebuffer: &Framebuffer) {
        self(framebuffer)
    }
}

/// Why [`GameBoy::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunExit {
    Cancelled,
    /// The guest executed `LD B,B`.
    Breakpoint,
    /// The CPU hit an undefined opcode.
    Locked,
}

pub struct GameBoy {
    pub cpu: Cpu,
    pub mmu: Mmu,
}

impl GameBoy {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            cpu: Cpu::new(),
            mmu: Mmu::with_config(config),
        }
    }

    /// Parse `rom` and build a machine in the post-boot state with it
    /// inserted.
    pub fn from_rom(rom: Vec<u8>) -> Result<Self, CartridgeError> {
        Self::from_rom_with_config(rom, Config::default())
    }

    pub fn from_rom_with_config(rom: Vec<u8>, config: Config) -> Result<Self, CartridgeError> {
        let cart = Cartridge::load(rom)?;
        let mut gb = Self::with_config(config);
        gb.mmu.load_cart(cart);
        Ok(gb)
    }

    /// Reset to the post-boot state, keeping the cartridge (and its RAM).
    pub fn reset(&mut self) {
        let cart = self.mmu.cart.take();
        let config = *self.mmu.config();
        self.cpu = Cpu::new();
        self.mmu = Mmu::with_config(config);
        if let Some(c) = cart {
            self.mmu.load_cart(c);
        }
    }

    /// One M-cycle: the CPU first, then the bus-side hardware.
    pub fn step(&mut self) {
        self.cpu.step(&mut self.mmu);
        self.mmu.tick();
    }

    /// Run exactly one frame's worth of M-cycles.
    pub fn run_frame(&mut self) {
        for _ in 0..FRAME_CYCLES {
            self.step();
        }
    }

    /// Run frames until `cancel` is set, the guest hits the `LD B,B`
    /// breakpoint, or the CPU locks up. All three are checked once per frame,
    /// after the frame is handed to `sink`.
    pub fn run(&mut self, sink: &mut impl FrameSink, cancel: &AtomicBool) -> RunExit {
        loop {
            self.run_frame();
            self.mmu.ppu.clear_frame_flag();
            sink.frame(self.mmu.ppu.framebuffer());
            if cancel.load(Ordering::Relaxed) {
                return RunExit::Cancelled;
            }
            if self.cpu.mooneye_breakpoint {
                return RunExit::Breakpoint;
            }
            if self.cpu.locked {
                return RunExit::Locked;
            }
        }
    }

    pub fn button(&mut self, button: Button, pressed: bool) {
        if self.mmu.input.set_button(button, pressed, &mut self.mmu.interrupts) {
            self.cpu.restart();
        }
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        self.mmu.ppu.framebuffer()
    }
}

impl Default for GameBoy {
    fn default() -> Self {
        Self::new()
    }
}
