use log::debug;
#[cfg(feature = "ppu-trace")]
use log::trace;

use crate::config::Config;
use crate::interrupt::{Interrupt, Interrupts};
use crate::oam::{Oam, Sprite, TOTAL_SPRITES};

pub const SCREEN_WIDTH: usize = 160;
pub const SCREEN_HEIGHT: usize = 144;

// Scanline timing in M-cycles.
pub const LINE_CYCLES: u16 = 114;
pub const OAM_SCAN_CYCLES: u16 = 20;
pub const TRANSFER_CYCLES: u16 = 43;
pub const LINES_PER_FRAME: u16 = 154;
pub const FRAME_CYCLES: u16 = LINE_CYCLES * LINES_PER_FRAME;

const MAX_SPRITES_PER_LINE: usize = 10;

// Decoded tiles covering 0x8000..=0x97FF.
const TILE_COUNT: usize = 384;
const TILE_DATA_END: usize = 0x1800;

// Offsets into VRAM
const BG_MAP_0_BASE: usize = 0x1800;
const BG_MAP_1_BASE: usize = 0x1C00;

const LCDC_BG_ENABLE: u8 = 0x01;
const LCDC_OBJ_ENABLE: u8 = 0x02;
const LCDC_OBJ_TALL: u8 = 0x04;
const LCDC_BG_MAP: u8 = 0x08;
const LCDC_TILE_DATA: u8 = 0x10;
const LCDC_WINDOW_ENABLE: u8 = 0x20;
const LCDC_WINDOW_MAP: u8 = 0x40;
const LCDC_ENABLE: u8 = 0x80;

const STAT_HBLANK_IRQ: u8 = 0x08;
const STAT_VBLANK_IRQ: u8 = 0x10;
const STAT_OAM_IRQ: u8 = 0x20;
const STAT_LYC_IRQ: u8 = 0x40;

/// 160x144 shades, 0 (white) to 3 (black).
pub type Framebuffer = [u8; SCREEN_WIDTH * SCREEN_HEIGHT];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    HBlank = 0,
    VBlank = 1,
    OamScan = 2,
    Transfer = 3,
}

pub struct Ppu {
    pub vram: [u8; 0x2000],
    pub oam: Oam,
    lcdc: u8,
    stat: u8,
    scy: u8,
    scx: u8,
    ly: u8,
    lyc: u8,
    bgp: u8,
    obp0: u8,
    obp1: u8,
    wy: u8,
    wx: u8,
    coincidence: bool,
    /// Position within the frame, in M-cycles.
    dot: u16,
    mode: Mode,
    window_line: u8,
    line_sprites: [Sprite; MAX_SPRITES_PER_LINE],
    sprite_count: usize,
    tiles: [[[u8; 8]; 8]; TILE_COUNT],
    tile_valid: [bool; TILE_COUNT],
    framebuffer: Framebuffer,
    frame_ready: bool,
    frames: u64,
    vram_lock: bool,
    oam_lock: bool,
}

impl Ppu {
    pub fn new() -> Self {
        Self::with_config(&Config::default())
    }

    pub fn with_config(config: &Config) -> Self {
        Self {
            vram: [0; 0x2000],
            oam: Oam::new(),
            lcdc: 0x91,
            stat: 0,
            scy: 0,
            scx: 0,
            ly: 0,
            lyc: 0,
            bgp: 0xFC,
            obp0: 0xFF,
            obp1: 0xFF,
            wy: 0,
            wx: 0,
            coincidence: false,
            dot: 0,
            mode: Mode::HBlank,
            window_line: 0,
            line_sprites: [Sprite::default(); MAX_SPRITES_PER_LINE],
            sprite_count: 0,
            tiles: [[[0; 8]; 8]; TILE_COUNT],
            tile_valid: [false; TILE_COUNT],
            framebuffer: [0; SCREEN_WIDTH * SCREEN_HEIGHT],
            frame_ready: false,
            frames: 0,
            vram_lock: config.vram_lock,
            oam_lock: config.oam_lock,
        }
    }

    pub fn lcd_enabled(&self) -> bool {
        self.lcdc & LCDC_ENABLE != 0
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn ly(&self) -> u8 {
        self.ly
    }

    pub fn frame_ready(&self) -> bool {
        self.frame_ready
    }

    pub fn clear_frame_flag(&mut self) {
        self.frame_ready = false;
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    /// Number of VBlank periods entered so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn read_vram(&self, addr: u16) -> u8 {
        if self.vram_blocked() {
            return 0xFF;
        }
        self.vram[(addr - 0x8000) as usize]
    }

    pub fn write_vram(&mut self, addr: u16, val: u8) {
        if self.vram_blocked() {
            return;
        }
        let offset = (addr - 0x8000) as usize;
        self.vram[offset] = val;
        if offset < TILE_DATA_END {
            self.tile_valid[offset / 16] = false;
        }
    }

    pub fn read_oam(&self, addr: u16, dma_active: bool) -> u8 {
        if self.oam_blocked() {
            return 0xFF;
        }
        self.oam.read(addr, dma_active)
    }

    pub fn write_oam(&mut self, addr: u16, val: u8, dma_active: bool) {
        if self.oam_blocked() {
            return;
        }
        self.oam.write(addr, val, dma_active);
    }

    fn vram_blocked(&self) -> bool {
        self.vram_lock && self.lcd_enabled() && self.mode == Mode::Transfer
    }

    fn oam_blocked(&self) -> bool {
        self.oam_lock
            && self.lcd_enabled()
            && matches!(self.mode, Mode::OamScan | Mode::Transfer)
    }

    pub fn read_reg(&self, addr: u16) -> u8 {
        match addr {
            0xFF40 => self.lcdc,
            0xFF41 => {
                let coincidence = if self.coincidence { 0x04 } else { 0 };
                0x80 | (self.stat & 0x78) | coincidence | self.mode as u8
            }
            0xFF42 => self.scy,
            0xFF43 => self.scx,
            0xFF44 => self.ly,
            0xFF45 => self.lyc,
            0xFF47 => self.bgp,
            0xFF48 => self.obp0,
            0xFF49 => self.obp1,
            0xFF4A => self.wy,
            0xFF4B => self.wx,
            _ => 0xFF,
        }
    }

    pub fn write_reg(&mut self, addr: u16, val: u8, irq: &mut Interrupts) {
        match addr {
            0xFF40 => {
                let was_on = self.lcd_enabled();
                self.lcdc = val;
                if was_on && !self.lcd_enabled() {
                    debug!("LCD disabled");
                    self.ly = 0;
                    self.dot = 0;
                    self.mode = Mode::HBlank;
                    self.window_line = 0;
                } else if !was_on && self.lcd_enabled() {
                    debug!("LCD enabled");
                    self.dot = 0;
                }
            }
            0xFF41 => self.stat = val & 0x78,
            0xFF42 => self.scy = val,
            0xFF43 => self.scx = val,
            0xFF44 => {}
            0xFF45 => {
                self.lyc = val;
                if self.lcd_enabled() {
                    self.compare_lyc(irq);
                }
            }
            0xFF47 => self.bgp = val,
            0xFF48 => self.obp0 = val,
            0xFF49 => self.obp1 = val,
            0xFF4A => self.wy = val,
            0xFF4B => self.wx = val,
            _ => {}
        }
    }

    /// Advance one M-cycle.
    pub fn step(&mut self, irq: &mut Interrupts) {
        if !self.lcd_enabled() {
            return;
        }

        let line = self.dot / LINE_CYCLES;
        let x = self.dot % LINE_CYCLES;
        self.ly = line as u8;
        let visible = (line as usize) < SCREEN_HEIGHT;

        if x == 0 {
            self.compare_lyc(irq);
            if line as usize == SCREEN_HEIGHT {
                self.mode = Mode::VBlank;
                irq.request(Interrupt::VBlank);
                self.request_stat(STAT_VBLANK_IRQ, irq);
                self.frame_ready = true;
                self.frames += 1;
            } else if visible {
                if line == 0 {
                    self.window_line = 0;
                }
                self.mode = Mode::OamScan;
                self.request_stat(STAT_OAM_IRQ, irq);
            }
        } else if visible && x == OAM_SCAN_CYCLES {
            self.mode = Mode::Transfer;
            self.oam_scan();
        } else if visible && x == OAM_SCAN_CYCLES + TRANSFER_CYCLES {
            self.mode = Mode::HBlank;
            self.request_stat(STAT_HBLANK_IRQ, irq);
            self.render_scanline();
        }

        self.dot = (self.dot + 1) % FRAME_CYCLES;
    }

    fn request_stat(&self, source: u8, irq: &mut Interrupts) {
        if self.stat & source != 0 {
            irq.request(Interrupt::Stat);
        }
    }

    fn compare_lyc(&mut self, irq: &mut Interrupts) {
        let now = self.ly == self.lyc;
        if now && !self.coincidence {
            self.request_stat(STAT_LYC_IRQ, irq);
        }
        self.coincidence = now;
    }

    fn sprite_height(&self) -> u8 {
        if self.lcdc & LCDC_OBJ_TALL != 0 { 16 } else { 8 }
    }

    /// Collect up to 10 sprites on the current line in OAM order, then order
    /// them by drawing priority.
    fn oam_scan(&mut self) {
        let height = self.sprite_height();
        self.sprite_count = 0;
        for i in 0..TOTAL_SPRITES {
            if self.sprite_count == MAX_SPRITES_PER_LINE {
                break;
            }
            let sprite = self.oam.sprite(i);
            if sprite.covers_line(self.ly, height) {
                self.line_sprites[self.sprite_count] = sprite;
                self.sprite_count += 1;
            }
        }
        self.line_sprites[..self.sprite_count].sort_by_key(|s| (s.x, s.index));
    }

    fn shade(palette: u8, color: u8) -> u8 {
        (palette >> (color * 2)) & 0x03
    }

    fn tile_row(&mut self, tile: usize, row: usize) -> [u8; 8] {
        if !self.tile_valid[tile] {
            self.decode_tile(tile);
        }
        self.tiles[tile][row]
    }

    fn decode_tile(&mut self, tile: usize) {
        let base = tile * 16;
        for row in 0..8 {
            let lo = self.vram[base + row * 2];
            let hi = self.vram[base + row * 2 + 1];
            for col in 0..8 {
                let bit = 7 - col;
                self.tiles[tile][row][col] = (((hi >> bit) & 1) << 1) | ((lo >> bit) & 1);
            }
        }
        self.tile_valid[tile] = true;
    }

    /// Cache slot for a tile number read from a BG or window map.
    fn map_tile(&self, id: u8) -> usize {
        if self.lcdc & LCDC_TILE_DATA != 0 {
            id as usize
        } else {
            (256 + id as i8 as i16) as usize
        }
    }

    fn map_pixel(&mut self, map_base: usize, px: usize, py: usize) -> u8 {
        let id = self.vram[map_base + (py / 8) * 32 + px / 8];
        let tile = self.map_tile(id);
        self.tile_row(tile, py % 8)[px % 8]
    }

    fn sprite_pixel(&mut self, x: u8) -> Option<(u8, Sprite)> {
        let height = self.sprite_height();
        for i in 0..self.sprite_count {
            let sprite = self.line_sprites[i];
            if !sprite.covers_column(x) || !sprite.covers_line(self.ly, height) {
                continue;
            }
            let mut row = (self.ly as i16 - (sprite.y as i16 - 16)) as u8;
            if sprite.y_flip() {
                row = height - 1 - row;
            }
            let mut tile = sprite.tile as usize;
            if height == 16 {
                tile &= 0xFE;
            }
            tile += (row / 8) as usize;
            let mut col = (x as i16 - (sprite.x as i16 - 8)) as usize;
            if sprite.x_flip() {
                col = 7 - col;
            }
            let color = self.tile_row(tile, (row % 8) as usize)[col];
            if color != 0 {
                return Some((color, sprite));
            }
        }
        None
    }

    fn render_scanline(&mut self) {
        let y = self.ly as usize;
        let bg_enabled = self.lcdc & LCDC_BG_ENABLE != 0;
        let sprites_enabled = self.lcdc & LCDC_OBJ_ENABLE != 0;
        let window_enabled = self.lcdc & LCDC_WINDOW_ENABLE != 0 && self.ly >= self.wy;
        let bg_map = if self.lcdc & LCDC_BG_MAP != 0 {
            BG_MAP_1_BASE
        } else {
            BG_MAP_0_BASE
        };
        let window_map = if self.lcdc & LCDC_WINDOW_MAP != 0 {
            BG_MAP_1_BASE
        } else {
            BG_MAP_0_BASE
        };
        let mut window_drawn = false;

        for x in 0..SCREEN_WIDTH {
            let color = if window_enabled && x + 7 >= self.wx as usize {
                window_drawn = true;
                let wx = x + 7 - self.wx as usize;
                self.map_pixel(window_map, wx, self.window_line as usize)
            } else if bg_enabled {
                let px = (x + self.scx as usize) & 0xFF;
                let py = (y + self.scy as usize) & 0xFF;
                self.map_pixel(bg_map, px, py)
            } else {
                0
            };

            let mut shade = Self::shade(self.bgp, color);
            if sprites_enabled {
                if let Some((sprite_color, sprite)) = self.sprite_pixel(x as u8) {
                    if !sprite.behind_bg() || color == 0 {
                        let palette = if sprite.uses_obp1() {
                            self.obp1
                        } else {
                            self.obp0
                        };
                        shade = Self::shade(palette, sprite_color);
                    }
                }
            }
            self.framebuffer[y * SCREEN_WIDTH + x] = shade;
        }

        if window_drawn {
            self.window_line = self.window_line.wrapping_add(1);
        }

        #[cfg(feature = "ppu-trace")]
        trace!("LY={y} rendered with {} sprites", self.sprite_count);
    }
}

impl Default for Ppu {
    fn default() -> Self {
        Self::new()
    }
}
