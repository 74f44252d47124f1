//! Cycle-accurate Game Boy (DMG) emulation core.
//!
//! This crate contains the platform-agnostic emulator logic (CPU, bus, PPU,
//! timer and the small peripherals around them). Frontends drive the core
//! through the [`gameboy`] facade, one machine cycle or one frame at a time.

/// Cartridge mappers (MBC) and ROM/RAM/RTC handling.
pub mod cartridge;

/// Core configuration knobs for optional hardware restrictions.
pub mod config;

/// LR35902 CPU core.
pub mod cpu;

/// OAM DMA copy engine.
pub mod dma;

/// High-level facade that wires the CPU and MMU into a single machine.
pub mod gameboy;

/// Joypad input register and edge-triggered interrupt behavior.
pub mod input;

/// Interrupt request/enable lines.
pub mod interrupt;

/// Memory map and hardware plumbing.
pub mod mmu;

/// Sprite attribute table.
pub mod oam;

/// Pixel Processing Unit (PPU) emulation.
pub mod ppu;

/// Hardware register addresses.
pub mod registers;

/// Serial unit with a host byte sink.
pub mod serial;

/// Divider/timer unit.
pub mod timer;
