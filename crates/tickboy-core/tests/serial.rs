mod common;

use std::io;

use common::{machine, run_instructions};
use tickboy_core::interrupt::Interrupt;
use tickboy_core::mmu::Mmu;
use tickboy_core::serial::{SharedBuffer, TRANSFER_CYCLES};

#[test]
fn sb_writes_reach_sink() {
    let out = SharedBuffer::new();
    // LD A,'H'; LDH ($01),A; LD A,'i'; LDH ($01),A
    let mut gb = machine(&[0x3E, b'H', 0xE0, 0x01, 0x3E, b'i', 0xE0, 0x01]);
    gb.mmu.serial.set_sink(Box::new(out.clone()));
    run_instructions(&mut gb, 4);
    assert_eq!(out.contents(), b"Hi");
    assert_eq!(gb.mmu.read_byte(0xFF01), b'i');
}

#[test]
fn internal_clock_transfer_completes() {
    let mut mmu = Mmu::new();
    mmu.interrupts.write_flags(0);
    mmu.write_byte(0xFF01, 0x42);
    mmu.write_byte(0xFF02, 0x81);
    assert_eq!(mmu.read_byte(0xFF02), 0xFF);

    for _ in 0..TRANSFER_CYCLES - 1 {
        mmu.tick();
    }
    assert!(!mmu.interrupts.is_requested(Interrupt::Serial));
    assert_eq!(mmu.read_byte(0xFF01), 0x42);

    mmu.tick();
    assert!(mmu.interrupts.is_requested(Interrupt::Serial));
    assert_eq!(mmu.read_byte(0xFF01), 0xFF);
    assert_eq!(mmu.read_byte(0xFF02), 0x7F);
}

#[test]
fn external_clock_never_completes() {
    let mut mmu = Mmu::new();
    mmu.interrupts.write_flags(0);
    mmu.write_byte(0xFF02, 0x80);
    for _ in 0..TRANSFER_CYCLES * 4 {
        mmu.tick();
    }
    assert!(!mmu.interrupts.is_requested(Interrupt::Serial));
    assert_eq!(mmu.read_byte(0xFF02), 0xFE);
}

struct BrokenPipe;

impl io::Write for BrokenPipe {
    fn write(&mut self, _: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn sink_errors_are_kept_not_fatal() {
    let mut mmu = Mmu::new();
    mmu.serial.set_sink(Box::new(BrokenPipe));
    mmu.write_byte(0xFF01, 0x41);
    assert_eq!(mmu.read_byte(0xFF01), 0x41);
    let err = mmu.serial.take_sink_error().map(|e| e.kind());
    assert_eq!(err, Some(io::ErrorKind::BrokenPipe));
    assert!(mmu.serial.take_sink_error().is_none());
}
