pub const OAM_SIZE: usize = 0xA0;
pub const TOTAL_SPRITES: usize = 40;

/// One decoded OAM entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sprite {
    /// Screen Y plus 16.
    pub y: u8,
    /// Screen X plus 8.
    pub x: u8,
    pub tile: u8,
    pub flags: u8,
    /// Position in OAM, used to break priority ties.
    pub index: u8,
}

impl Sprite {
    pub fn behind_bg(&self) -> bool {
        self.flags & 0x80 != 0
    }

    pub fn y_flip(&self) -> bool {
        self.flags & 0x40 != 0
    }

    pub fn x_flip(&self) -> bool {
        self.flags & 0x20 != 0
    }

    pub fn uses_obp1(&self) -> bool {
        self.flags & 0x10 != 0
    }

    /// Whether the sprite covers scanline `ly` for the given height.
    pub fn covers_line(&self, ly: u8, height: u8) -> bool {
        let top = self.y as i16 - 16;
        let ly = ly as i16;
        ly >= top && ly < top + height as i16
    }

    /// Whether the sprite covers screen column `x`.
    pub fn covers_column(&self, x: u8) -> bool {
        let left = self.x as i16 - 8;
        let x = x as i16;
        x >= left && x < left + 8
    }
}

/// Sprite attribute table.
pub struct Oam {
    bytes: [u8; OAM_SIZE],
}

impl Oam {
    pub fn new() -> Self {
        Self {
            bytes: [0; OAM_SIZE],
        }
    }

    /// CPU read of 0xFE00..=0xFE9F. A running DMA owns the table and the CPU
    /// sees 0xFF.
    pub fn read(&self, addr: u16, dma_active: bool) -> u8 {
        if dma_active {
            return 0xFF;
        }
        self.bytes[(addr - 0xFE00) as usize]
    }

    pub fn write(&mut self, addr: u16, val: u8, dma_active: bool) {
        if dma_active {
            return;
        }
        self.bytes[(addr - 0xFE00) as usize] = val;
    }

    /// Store a byte on behalf of the DMA engine.
    pub fn dma_write(&mut self, index: usize, val: u8) {
        self.bytes[index] = val;
    }

    pub fn sprite(&self, index: usize) -> Sprite {
        let base = index * 4;
        Sprite {
            y: self.bytes[base],
            x: self.bytes[base + 1],
            tile: self.bytes[base + 2],
            flags: self.bytes[base + 3],
            index: index as u8,
        }
    }
}

impl Default for Oam {
    fn default() -> Self {
        Self::new()
    }
}
