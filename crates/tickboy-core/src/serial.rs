use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use log::warn;

use crate::interrupt::{Interrupt, Interrupts};

/// Shifting eight bits at 8192 Hz takes 1024 M-cycles.
pub const TRANSFER_CYCLES: u16 = 1024;

/// Host-side consumer of bytes written to SB.
pub trait SerialSink: Send {
    fn write_byte(&mut self, byte: u8) -> io::Result<()>;
}

impl<W: Write + Send> SerialSink for W {
    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        self.write_all(&[byte])?;
        self.flush()
    }
}

/// A clonable in-memory sink. Clones share the same buffer, so one copy can
/// be handed to the emulator while another is inspected.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Vec<u8> {
        match self.0.lock() {
            Ok(buf) => buf.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut buf = self
            .0
            .lock()
            .map_err(|_| io::Error::other("serial buffer poisoned"))?;
        buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// SB/SC registers. There is never a link partner: internally clocked
/// transfers shift in 0xFF, externally clocked ones wait forever.
pub struct Serial {
    sb: u8,
    sc: u8,
    remaining: u16,
    sink: Option<Box<dyn SerialSink>>,
    sink_error: Option<io::Error>,
}

impl Serial {
    pub fn new() -> Self {
        Self {
            sb: 0,
            sc: 0,
            remaining: 0,
            sink: None,
            sink_error: None,
        }
    }

    pub fn set_sink(&mut self, sink: Box<dyn SerialSink>) {
        self.sink = Some(sink);
    }

    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            0xFF01 => self.sb,
            0xFF02 => self.sc | 0x7E,
            _ => 0xFF,
        }
    }

    pub fn write(&mut self, addr: u16, val: u8) {
        match addr {
            0xFF01 => {
                self.sb = val;
                self.forward(val);
            }
            0xFF02 => {
                self.sc = val & 0x81;
                self.remaining = if self.sc == 0x81 { TRANSFER_CYCLES } else { 0 };
            }
            _ => {}
        }
    }

    pub fn step(&mut self, irq: &mut Interrupts) {
        if self.remaining == 0 {
            return;
        }
        self.remaining -= 1;
        if self.remaining == 0 {
            self.sb = 0xFF;
            self.sc &= 0x7F;
            irq.request(Interrupt::Serial);
        }
    }

    /// The most recent sink failure, if any. Output keeps flowing to the sink
    /// after a failure.
    pub fn take_sink_error(&mut self) -> Option<io::Error> {
        self.sink_error.take()
    }

    fn forward(&mut self, byte: u8) {
        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        if let Err(e) = sink.write_byte(byte) {
            warn!("Serial sink write failed: {e}");
            self.sink_error = Some(e);
        }
    }
}

impl Default for Serial {
    fn default() -> Self {
        Self::new()
    }
}
