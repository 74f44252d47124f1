use log::debug;

/// M-cycles from the DMA register write to the last OAM byte landing.
pub const DMA_CYCLES: u16 = 162;

/// What the bus has to do for the DMA on the current M-cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmaTransfer {
    /// Byte (and OAM index) to store from the pipeline register.
    pub write: Option<(usize, u8)>,
    /// Source address to read into the pipeline register.
    pub read: Option<u16>,
}

/// OAM DMA copier: a cycle counter plus a one-byte pipeline register.
#[derive(Debug, Clone, Default)]
pub struct OamDma {
    running: bool,
    source: u16,
    cycle: u16,
    latch: u8,
    reg: u8,
}

impl OamDma {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle a write to 0xFF46. The write cycle itself counts as cycle 0.
    pub fn start(&mut self, val: u8) {
        let mut source = (val as u16) << 8;
        if source >= 0xE000 {
            source -= 0x2000;
        }
        debug!("OAM DMA from {source:#06X}");
        self.reg = val;
        self.source = source;
        self.cycle = 0;
        self.running = true;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Last value written to 0xFF46.
    pub fn register(&self) -> u8 {
        self.reg
    }

    /// Work for this M-cycle. The bus performs the reads and writes and
    /// hands the fetched byte back through [`OamDma::latch`].
    pub fn advance(&mut self) -> DmaTransfer {
        if !self.running {
            return DmaTransfer {
                write: None,
                read: None,
            };
        }
        let cycle = self.cycle;
        let write = (cycle >= 2).then(|| ((cycle - 2) as usize, self.latch));
        let read = (1..DMA_CYCLES - 1)
            .contains(&cycle)
            .then(|| self.source + (cycle - 1));
        if cycle == DMA_CYCLES - 1 {
            self.running = false;
        } else {
            self.cycle += 1;
        }
        DmaTransfer { write, read }
    }

    pub fn latch(&mut self, val: u8) {
        self.latch = val;
    }
}
