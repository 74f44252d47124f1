use log::info;
use thiserror::Error;

pub const ROM_PAGE_SIZE: usize = 0x4000;
pub const RAM_PAGE_SIZE: usize = 0x2000;

const HEADER_END: usize = 0x0150;
const MBC2_RAM_SIZE: usize = 0x200;

/// The RTC oscillator is 32.768 kHz; one second is 2^20 M-cycles.
const RTC_CYCLES_PER_SECOND: u32 = 1 << 20;

/// Problems with a cartridge image that prevent the machine from starting.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartridgeError {
    #[error("ROM image is {0} bytes, too small to hold a cartridge header")]
    TooSmall(usize),
    #[error("ROM image length {0} is not a multiple of 16 KiB")]
    NotPageAligned(usize),
    #[error("unsupported cartridge type {0:#04X}")]
    UnsupportedMapper(u8),
    #[error("invalid ROM size code {0:#04X}")]
    InvalidRomSize(u8),
    #[error("header declares {declared} ROM pages but the image holds {actual}")]
    RomSizeMismatch { declared: usize, actual: usize },
    #[error("invalid RAM size code {0:#04X}")]
    InvalidRamSize(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MbcType {
    NoMbc,
    Mbc1,
    Mbc2,
    Mbc3,
    Mbc5,
}

pub struct Cartridge {
    pub rom: Vec<u8>,
    pub ram: Vec<u8>,
    pub mbc: MbcType,
    pub title: String,
    cart_type: u8,
    rom_pages: usize,
    mbc_state: MbcState,
}

enum MbcState {
    NoMbc,
    Mbc1 {
        bank1: u8,
        bank2: u8,
        mode: bool,
        ram_enable: bool,
    },
    Mbc2 {
        rom_bank: u8,
        ram_enable: bool,
    },
    Mbc3 {
        rom_bank: u8,
        select: u8,
        ram_enable: bool,
        last_latch_write: u8,
        rtc: Option<Mbc3Rtc>,
    },
    Mbc5 {
        rom_bank: u16,
        ram_bank: u8,
        ram_enable: bool,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct RtcRegisters {
    seconds: u8,
    minutes: u8,
    hours: u8,
    days: u16,
    halt: bool,
    carry: bool,
}

impl RtcRegisters {
    fn control_byte(&self) -> u8 {
        let mut out = ((self.days >> 8) as u8) & 0x01;
        if self.halt {
            out |= 0x40;
        }
        if self.carry {
            out |= 0x80;
        }
        out
    }
}

/// Live and latched MBC3 clock registers.
#[derive(Debug, Clone, Default)]
struct Mbc3Rtc {
    regs: RtcRegisters,
    latched: RtcRegisters,
    subsecond_cycles: u32,
}

impl Mbc3Rtc {
    fn latch(&mut self) {
        self.latched = self.regs;
    }

    fn read_latched(&self, reg: u8) -> u8 {
        match reg {
            0x08 => self.latched.seconds,
            0x09 => self.latched.minutes,
            0x0A => self.latched.hours,
            0x0B => self.latched.days as u8,
            0x0C => self.latched.control_byte(),
            _ => 0xFF,
        }
    }

    fn write_register(&mut self, reg: u8, value: u8) {
        match reg {
            0x08 => {
                self.regs.seconds = value & 0x3F;
                self.subsecond_cycles = 0;
            }
            0x09 => self.regs.minutes = value & 0x3F,
            0x0A => self.regs.hours = value & 0x1F,
            0x0B => self.regs.days = (self.regs.days & 0x0100) | value as u16,
            0x0C => {
                self.regs.days = (self.regs.days & 0x00FF) | (((value & 0x01) as u16) << 8);
                self.regs.halt = value & 0x40 != 0;
                self.regs.carry = value & 0x80 != 0;
            }
            _ => {}
        }
    }

    /// Advance by one M-cycle.
    fn step(&mut self) {
        if self.regs.halt {
            return;
        }
        self.subsecond_cycles += 1;
        if self.subsecond_cycles >= RTC_CYCLES_PER_SECOND {
            self.subsecond_cycles = 0;
            self.tick_second();
        }
    }

    // Counters only carry when they hit their natural limit exactly, so
    // out-of-range values written by software wrap at the register width.
    fn tick_second(&mut self) {
        let r = &mut self.regs;
        r.seconds = (r.seconds + 1) & 0x3F;
        if r.seconds != 60 {
            return;
        }
        r.seconds = 0;
        r.minutes = (r.minutes + 1) & 0x3F;
        if r.minutes != 60 {
            return;
        }
        r.minutes = 0;
        r.hours = (r.hours + 1) & 0x1F;
        if r.hours != 24 {
            return;
        }
        r.hours = 0;
        if r.days >= 0x01FF {
            r.days = 0;
            r.carry = true;
        } else {
            r.days += 1;
        }
    }
}

impl Cartridge {
    /// Parse a ROM image. Header problems are configuration errors and abort
    /// the load.
    pub fn load(rom: Vec<u8>) -> Result<Self, CartridgeError> {
        if rom.len() < HEADER_END {
            return Err(CartridgeError::TooSmall(rom.len()));
        }
        if rom.len() % ROM_PAGE_SIZE != 0 {
            return Err(CartridgeError::NotPageAligned(rom.len()));
        }

        let header = Header::parse(&rom);
        let cart_type = header.cart_type();
        let mbc = header.mbc_type()?;
        let declared = header.rom_pages()?;
        let actual = rom.len() / ROM_PAGE_SIZE;
        if declared != actual {
            return Err(CartridgeError::RomSizeMismatch { declared, actual });
        }
        let ram_size = match mbc {
            MbcType::Mbc2 => MBC2_RAM_SIZE,
            _ => header.ram_pages()? * RAM_PAGE_SIZE,
        };
        let title = header.title();

        let mbc_state = match mbc {
            MbcType::NoMbc => MbcState::NoMbc,
            MbcType::Mbc1 => MbcState::Mbc1 {
                bank1: 1,
                bank2: 0,
                mode: false,
                ram_enable: false,
            },
            MbcType::Mbc2 => MbcState::Mbc2 {
                rom_bank: 1,
                ram_enable: false,
            },
            MbcType::Mbc3 => MbcState::Mbc3 {
                rom_bank: 1,
                select: 0,
                ram_enable: false,
                last_latch_write: 0xFF,
                rtc: matches!(cart_type, 0x0F | 0x10).then(Mbc3Rtc::default),
            },
            MbcType::Mbc5 => MbcState::Mbc5 {
                rom_bank: 1,
                ram_bank: 0,
                ram_enable: false,
            },
        };

        info!(
            "Loaded cartridge \"{title}\": {mbc:?}, {actual} ROM pages, {} KiB RAM",
            ram_size / 1024
        );

        Ok(Self {
            rom,
            ram: vec![0xFF; ram_size],
            mbc,
            title,
            cart_type,
            rom_pages: actual,
            mbc_state,
        })
    }

    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x3FFF => {
                let (low, _) = self.rom_banks();
                self.rom[low * ROM_PAGE_SIZE + addr as usize]
            }
            0x4000..=0x7FFF => {
                let (_, high) = self.rom_banks();
                self.rom[high * ROM_PAGE_SIZE + (addr as usize - 0x4000)]
            }
            0xA000..=0xBFFF => self.read_ram(addr),
            _ => 0xFF,
        }
    }

    pub fn write(&mut self, addr: u16, val: u8) {
        match addr {
            0x0000..=0x7FFF => self.write_control(addr, val),
            0xA000..=0xBFFF => self.write_ram(addr, val),
            _ => {}
        }
    }

    /// Clock the MBC3 real-time clock by one M-cycle.
    pub fn step_rtc(&mut self) {
        if let MbcState::Mbc3 { rtc: Some(rtc), .. } = &mut self.mbc_state {
            rtc.step();
        }
    }

    /// ROM pages currently mapped at 0x0000 and 0x4000.
    pub fn rom_banks(&self) -> (usize, usize) {
        let pages = self.rom_pages;
        match self.mbc_state {
            MbcState::NoMbc => (0, 1 % pages),
            MbcState::Mbc1 {
                bank1, bank2, mode, ..
            } => {
                let upper = (bank2 as usize) << 5;
                let low = if mode { upper } else { 0 };
                (low % pages, (bank1 as usize | upper) % pages)
            }
            MbcState::Mbc2 { rom_bank, .. } => (0, rom_bank as usize % pages),
            MbcState::Mbc3 { rom_bank, .. } => (0, rom_bank as usize % pages),
            MbcState::Mbc5 { rom_bank, .. } => (0, rom_bank as usize % pages),
        }
    }

    pub fn has_battery(&self) -> bool {
        matches!(
            self.cart_type,
            0x03 | 0x06 | 0x09 | 0x0F | 0x10 | 0x13 | 0x1B | 0x1E
        )
    }

    pub fn has_rtc(&self) -> bool {
        matches!(self.mbc_state, MbcState::Mbc3 { rtc: Some(_), .. })
    }

    /// External RAM contents, for battery saves.
    pub fn ram(&self) -> &[u8] {
        &self.ram
    }

    /// Restore external RAM from a battery save. Extra bytes are ignored and
    /// a short save only fills the start of RAM.
    pub fn load_ram(&mut self, data: &[u8]) {
        let len = data.len().min(self.ram.len());
        self.ram[..len].copy_from_slice(&data[..len]);
    }

    fn write_control(&mut self, addr: u16, val: u8) {
        match &mut self.mbc_state {
            MbcState::NoMbc => {}
            MbcState::Mbc1 {
                bank1,
                bank2,
                mode,
                ram_enable,
            } => match addr {
                0x0000..=0x1FFF => *ram_enable = val & 0x0F == 0x0A,
                0x2000..=0x3FFF => *bank1 = (val & 0x1F).max(1),
                0x4000..=0x5FFF => *bank2 = val & 0x03,
                _ => *mode = val & 0x01 != 0,
            },
            MbcState::Mbc2 {
                rom_bank,
                ram_enable,
            } => {
                if addr >= 0x4000 {
                    return;
                }
                if addr & 0x0100 == 0 {
                    *ram_enable = val & 0x0F == 0x0A;
                } else {
                    *rom_bank = (val & 0x0F).max(1);
                }
            }
            MbcState::Mbc3 {
                rom_bank,
                select,
                ram_enable,
                last_latch_write,
                rtc,
            } => match addr {
                0x0000..=0x1FFF => *ram_enable = val & 0x0F == 0x0A,
                0x2000..=0x3FFF => *rom_bank = (val & 0x7F).max(1),
                0x4000..=0x5FFF => *select = val,
                _ => {
                    if *last_latch_write == 0x00 && val == 0x01 {
                        if let Some(rtc) = rtc {
                            rtc.latch();
                        }
                    }
                    *last_latch_write = val;
                }
            },
            MbcState::Mbc5 {
                rom_bank,
                ram_bank,
                ram_enable,
            } => match addr {
                0x0000..=0x1FFF => *ram_enable = val & 0x0F == 0x0A,
                0x2000..=0x2FFF => *rom_bank = (*rom_bank & 0x100) | val as u16,
                0x3000..=0x3FFF => *rom_bank = (*rom_bank & 0x0FF) | (((val & 0x01) as u16) << 8),
                0x4000..=0x5FFF => *ram_bank = val & 0x0F,
                _ => {}
            },
        }
    }

    fn read_ram(&self, addr: u16) -> u8 {
        if let MbcState::Mbc3 {
            select,
            ram_enable,
            rtc,
            ..
        } = &self.mbc_state
        {
            if (0x08..=0x0C).contains(select) {
                return match rtc {
                    Some(rtc) if *ram_enable => rtc.read_latched(*select),
                    _ => 0xFF,
                };
            }
        }
        match self.ram_index(addr) {
            Some(idx) if matches!(self.mbc, MbcType::Mbc2) => self.ram[idx] | 0xF0,
            Some(idx) => self.ram[idx],
            None => 0xFF,
        }
    }

    fn write_ram(&mut self, addr: u16, val: u8) {
        if let MbcState::Mbc3 {
            select,
            ram_enable,
            rtc,
            ..
        } = &mut self.mbc_state
        {
            if (0x08..=0x0C).contains(select) {
                if let Some(rtc) = rtc {
                    if *ram_enable {
                        rtc.write_register(*select, val);
                    }
                }
                return;
            }
        }
        let is_mbc2 = matches!(self.mbc, MbcType::Mbc2);
        if let Some(idx) = self.ram_index(addr) {
            self.ram[idx] = if is_mbc2 { val & 0x0F } else { val };
        }
    }

    /// Offset into `ram` for an access at `addr`, or `None` when RAM is
    /// disabled or absent.
    fn ram_index(&self, addr: u16) -> Option<usize> {
        if self.ram.is_empty() {
            return None;
        }
        let offset = (addr - 0xA000) as usize;
        let pages = (self.ram.len() / RAM_PAGE_SIZE).max(1);
        let bank = match self.mbc_state {
            MbcState::NoMbc => 0,
            MbcState::Mbc1 {
                bank2,
                mode,
                ram_enable,
                ..
            } => {
                if !ram_enable {
                    return None;
                }
                if mode { bank2 as usize } else { 0 }
            }
            MbcState::Mbc2 { ram_enable, .. } => {
                if !ram_enable {
                    return None;
                }
                return Some(offset & (MBC2_RAM_SIZE - 1));
            }
            MbcState::Mbc3 {
                select, ram_enable, ..
            } => {
                if !ram_enable || select > 0x03 {
                    return None;
                }
                select as usize
            }
            MbcState::Mbc5 {
                ram_bank,
                ram_enable,
                ..
            } => {
                if !ram_enable {
                    return None;
                }
                ram_bank as usize
            }
        };
        Some(((bank % pages) * RAM_PAGE_SIZE + offset) % self.ram.len())
    }
}

struct Header<'a> {
    data: &'a [u8],
}

impl<'a> Header<'a> {
    fn parse(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn title(&self) -> String {
        let mut slice = &self.data[0x0134..0x0143];
        if let Some(pos) = slice.iter().position(|&b| b == 0) {
            slice = &slice[..pos];
        }
        String::from_utf8_lossy(slice).trim().to_string()
    }

    fn cart_type(&self) -> u8 {
        self.data[0x0147]
    }

    fn mbc_type(&self) -> Result<MbcType, CartridgeError> {
        match self.cart_type() {
            0x00 | 0x08 | 0x09 => Ok(MbcType::NoMbc),
            0x01..=0x03 => Ok(MbcType::Mbc1),
            0x05 | 0x06 => Ok(MbcType::Mbc2),
            0x0F..=0x13 => Ok(MbcType::Mbc3),
            0x19..=0x1E => Ok(MbcType::Mbc5),
            other => Err(CartridgeError::UnsupportedMapper(other)),
        }
    }

    fn rom_pages(&self) -> Result<usize, CartridgeError> {
        match self.data[0x0148] {
            code @ 0x00..=0x08 => Ok(2 << code),
            code => Err(CartridgeError::InvalidRomSize(code)),
        }
    }

    fn ram_pages(&self) -> Result<usize, CartridgeError> {
        match self.data[0x0149] {
            0x00 => Ok(0),
            0x01 | 0x02 => Ok(1),
            0x03 => Ok(4),
            0x04 => Ok(16),
            0x05 => Ok(8),
            code => Err(CartridgeError::InvalidRamSize(code)),
        }
    }
}
