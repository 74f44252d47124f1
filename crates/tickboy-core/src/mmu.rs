use crate::{
    cartridge::Cartridge,
    config::{Config, DmaLockout},
    dma::OamDma,
    input::Input,
    interrupt::Interrupts,
    ppu::Ppu,
    registers::IoReg,
    serial::Serial,
    timer::Timer,
};

const WRAM_SIZE: usize = 0x2000;
const HRAM_SIZE: usize = 0x7F;
const SOUND_BASE: u16 = 0xFF10;
const SOUND_SIZE: usize = 0x30;

/// Sound register contents after the boot ROM hands over.
const SOUND_POWER_ON: [(IoReg, u8); 15] = [
    (IoReg::Nr10, 0x80),
    (IoReg::Nr11, 0xBF),
    (IoReg::Nr12, 0xF3),
    (IoReg::Nr14, 0xBF),
    (IoReg::Nr21, 0x3F),
    (IoReg::Nr24, 0xBF),
    (IoReg::Nr30, 0x7F),
    (IoReg::Nr31, 0xFF),
    (IoReg::Nr32, 0x9F),
    (IoReg::Nr34, 0xBF),
    (IoReg::Nr41, 0xFF),
    (IoReg::Nr44, 0xBF),
    (IoReg::Nr50, 0x77),
    (IoReg::Nr51, 0xF3),
    (IoReg::Nr52, 0xF1),
];

pub struct Mmu {
    pub wram: [u8; WRAM_SIZE],
    pub hram: [u8; HRAM_SIZE],
    pub cart: Option<Cartridge>,
    pub interrupts: Interrupts,
    pub serial: Serial,
    pub ppu: Ppu,
    pub timer: Timer,
    pub input: Input,
    pub dma: OamDma,
    sound: [u8; SOUND_SIZE],
    config: Config,
}

impl Mmu {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let mut sound = [0; SOUND_SIZE];
        for (reg, val) in SOUND_POWER_ON {
            sound[(reg.addr() - SOUND_BASE) as usize] = val;
        }
        Self {
            wram: [0; WRAM_SIZE],
            hram: [0; HRAM_SIZE],
            cart: None,
            interrupts: Interrupts::new(),
            serial: Serial::new(),
            ppu: Ppu::with_config(&config),
            timer: Timer::new(),
            input: Input::new(),
            dma: OamDma::new(),
            sound,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn load_cart(&mut self, cart: Cartridge) {
        self.cart = Some(cart);
    }

    /// CPU-side read.
    pub fn read_byte(&self, addr: u16) -> u8 {
        if self.dma_blocks(addr) {
            return 0xFF;
        }
        match addr {
            0x0000..=0x7FFF | 0xA000..=0xBFFF => {
                self.cart.as_ref().map_or(0xFF, |cart| cart.read(addr))
            }
            0x8000..=0x9FFF => self.ppu.read_vram(addr),
            0xC000..=0xDFFF => self.wram[(addr - 0xC000) as usize],
            0xE000..=0xFDFF => self.wram[(addr - 0xE000) as usize],
            0xFE00..=0xFE9F => self.ppu.read_oam(addr, self.dma.is_running()),
            0xFEA0..=0xFEFF => 0x00,
            0xFF80..=0xFFFE => self.hram[(addr - 0xFF80) as usize],
            0xFF00..=0xFF7F | 0xFFFF => self.read_io(addr),
        }
    }

    /// CPU-side write.
    pub fn write_byte(&mut self, addr: u16, val: u8) {
        if self.dma_blocks(addr) {
            return;
        }
        match addr {
            0x0000..=0x7FFF | 0xA000..=0xBFFF => {
                if let Some(cart) = self.cart.as_mut() {
                    cart.write(addr, val);
                }
            }
            0x8000..=0x9FFF => self.ppu.write_vram(addr, val),
            0xC000..=0xDFFF => self.wram[(addr - 0xC000) as usize] = val,
            0xE000..=0xFDFF => self.wram[(addr - 0xE000) as usize] = val,
            0xFE00..=0xFE9F => {
                let dma_active = self.dma.is_running();
                self.ppu.write_oam(addr, val, dma_active);
            }
            0xFEA0..=0xFEFF => {}
            0xFF80..=0xFFFE => self.hram[(addr - 0xFF80) as usize] = val,
            0xFF00..=0xFF7F | 0xFFFF => self.write_io(addr, val),
        }
    }

    /// Advance the bus-side hardware by one M-cycle: DMA, then PPU, then
    /// timer, then the serial shifter and cartridge clock.
    pub fn tick(&mut self) {
        self.dma_step();
        self.ppu.step(&mut self.interrupts);
        self.timer.step(&mut self.interrupts);
        self.serial.step(&mut self.interrupts);
        if let Some(cart) = self.cart.as_mut() {
            cart.step_rtc();
        }
    }

    pub fn dma_step(&mut self) {
        let transfer = self.dma.advance();
        if let Some((index, val)) = transfer.write {
            self.ppu.oam.dma_write(index, val);
        }
        if let Some(src) = transfer.read {
            let val = self.dma_read(src);
            self.dma.latch(val);
        }
    }

    fn dma_blocks(&self, addr: u16) -> bool {
        self.dma.is_running() && self.config.dma_lockout == DmaLockout::HighPageOnly && addr < 0xFF00
    }

    /// Source read for OAM DMA. The copier is not subject to PPU locks.
    fn dma_read(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x7FFF | 0xA000..=0xBFFF => {
                self.cart.as_ref().map_or(0xFF, |cart| cart.read(addr))
            }
            0x8000..=0x9FFF => self.ppu.vram[(addr - 0x8000) as usize],
            0xC000..=0xDFFF => self.wram[(addr - 0xC000) as usize],
            _ => 0xFF,
        }
    }

    fn read_io(&self, addr: u16) -> u8 {
        match IoReg::from_addr(addr) {
            Some(IoReg::Joyp) => self.input.read(),
            Some(IoReg::Sb | IoReg::Sc) => self.serial.read(addr),
            Some(IoReg::Div | IoReg::Tima | IoReg::Tma | IoReg::Tac) => self.timer.read(addr),
            Some(IoReg::If) => self.interrupts.read_flags(),
            Some(IoReg::Ie) => self.interrupts.enable,
            Some(IoReg::Dma) => self.dma.register(),
            Some(reg) if reg.is_sound() => self.sound[(addr - SOUND_BASE) as usize],
            Some(_) => self.ppu.read_reg(addr),
            None => 0xFF,
        }
    }

    fn write_io(&mut self, addr: u16, val: u8) {
        match IoReg::from_addr(addr) {
            Some(IoReg::Joyp) => self.input.write(val, &mut self.interrupts),
            Some(IoReg::Sb | IoReg::Sc) => self.serial.write(addr, val),
            Some(IoReg::Div | IoReg::Tima | IoReg::Tma | IoReg::Tac) => {
                self.timer.write(addr, val, &mut self.interrupts)
            }
            Some(IoReg::If) => self.interrupts.write_flags(val),
            Some(IoReg::Ie) => self.interrupts.enable = val,
            Some(IoReg::Dma) => self.dma.start(val),
            Some(reg) if reg.is_sound() => self.sound[(addr - SOUND_BASE) as usize] = val,
            Some(_) => self.ppu.write_reg(addr, val, &mut self.interrupts),
            None => {}
        }
    }
}

impl Default for Mmu {
    fn default() -> Self {
        Self::new()
    }
}
