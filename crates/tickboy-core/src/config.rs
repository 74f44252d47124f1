/// Which CPU accesses are blocked while OAM DMA is copying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DmaLockout {
    /// Everything below 0xFF00 is unreachable; I/O, HRAM and IE stay usable.
    /// This is wider than hardware, where only HRAM is safe to touch.
    #[default]
    HighPageOnly,
    /// Only OAM is blocked.
    OamOnly,
}

/// Optional hardware restrictions. The defaults match a DMG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// VRAM reads return 0xFF and writes are dropped during pixel transfer.
    pub vram_lock: bool,
    /// OAM reads return 0xFF and writes are dropped during OAM scan and
    /// pixel transfer.
    pub oam_lock: bool,
    pub dma_lockout: DmaLockout,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vram_lock: true,
            oam_lock: true,
            dma_lockout: DmaLockout::default(),
        }
    }
}
