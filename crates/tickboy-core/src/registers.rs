/// Every hardware register the DMG decodes in 0xFF00..=0xFF7F, plus IE.
///
/// Addresses in the I/O page that are not listed here are open bus: reads
/// return 0xFF and writes are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoReg {
    Joyp,
    Sb,
    Sc,
    Div,
    Tima,
    Tma,
    Tac,
    If,
    Nr10,
    Nr11,
    Nr12,
    Nr13,
    Nr14,
    Nr21,
    Nr22,
    Nr23,
    Nr24,
    Nr30,
    Nr31,
    Nr32,
    Nr33,
    Nr34,
    Nr41,
    Nr42,
    Nr43,
    Nr44,
    Nr50,
    Nr51,
    Nr52,
    /// One of the sixteen wave pattern bytes.
    WaveRam(u8),
    Lcdc,
    Stat,
    Scy,
    Scx,
    Ly,
    Lyc,
    Dma,
    Bgp,
    Obp0,
    Obp1,
    Wy,
    Wx,
    Ie,
}

impl IoReg {
    pub fn from_addr(addr: u16) -> Option<Self> {
        use IoReg::*;
        let reg = match addr {
            0xFF00 => Joyp,
            0xFF01 => Sb,
            0xFF02 => Sc,
            0xFF04 => Div,
            0xFF05 => Tima,
            0xFF06 => Tma,
            0xFF07 => Tac,
            0xFF0F => If,
            0xFF10 => Nr10,
            0xFF11 => Nr11,
            0xFF12 => Nr12,
            0xFF13 => Nr13,
            0xFF14 => Nr14,
            0xFF16 => Nr21,
            0xFF17 => Nr22,
            0xFF18 => Nr23,
            0xFF19 => Nr24,
            0xFF1A => Nr30,
            0xFF1B => Nr31,
            0xFF1C => Nr32,
            0xFF1D => Nr33,
            0xFF1E => Nr34,
            0xFF20 => Nr41,
            0xFF21 => Nr42,
            0xFF22 => Nr43,
            0xFF23 => Nr44,
            0xFF24 => Nr50,
            0xFF25 => Nr51,
            0xFF26 => Nr52,
            0xFF30..=0xFF3F => WaveRam((addr - 0xFF30) as u8),
            0xFF40 => Lcdc,
            0xFF41 => Stat,
            0xFF42 => Scy,
            0xFF43 => Scx,
            0xFF44 => Ly,
            0xFF45 => Lyc,
            0xFF46 => Dma,
            0xFF47 => Bgp,
            0xFF48 => Obp0,
            0xFF49 => Obp1,
            0xFF4A => Wy,
            0xFF4B => Wx,
            0xFFFF => Ie,
            _ => return None,
        };
        Some(reg)
    }

    pub fn addr(self) -> u16 {
        use IoReg::*;
        match self {
            Joyp => 0xFF00,
            Sb => 0xFF01,
            Sc => 0xFF02,
            Div => 0xFF04,
            Tima => 0xFF05,
            Tma => 0xFF06,
            Tac => 0xFF07,
            If => 0xFF0F,
            Nr10 => 0xFF10,
            Nr11 => 0xFF11,
            Nr12 => 0xFF12,
            Nr13 => 0xFF13,
            Nr14 => 0xFF14,
            Nr21 => 0xFF16,
            Nr22 => 0xFF17,
            Nr23 => 0xFF18,
            Nr24 => 0xFF19,
            Nr30 => 0xFF1A,
            Nr31 => 0xFF1B,
            Nr32 => 0xFF1C,
            Nr33 => 0xFF1D,
            Nr34 => 0xFF1E,
            Nr41 => 0xFF20,
            Nr42 => 0xFF21,
            Nr43 => 0xFF22,
            Nr44 => 0xFF23,
            Nr50 => 0xFF24,
            Nr51 => 0xFF25,
            Nr52 => 0xFF26,
            WaveRam(i) => 0xFF30 + i as u16,
            Lcdc => 0xFF40,
            Stat => 0xFF41,
            Scy => 0xFF42,
            Scx => 0xFF43,
            Ly => 0xFF44,
            Lyc => 0xFF45,
            Dma => 0xFF46,
            Bgp => 0xFF47,
            Obp0 => 0xFF48,
            Obp1 => 0xFF49,
            Wy => 0xFF4A,
            Wx => 0xFF4B,
            Ie => 0xFFFF,
        }
    }

    /// Sound registers and wave RAM, kept as plain storage.
    pub fn is_sound(self) -> bool {
        (0xFF10..=0xFF3F).contains(&self.addr())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addresses_round_trip() {
        for addr in 0xFF00..=0xFFFFu16 {
            if let Some(reg) = IoReg::from_addr(addr) {
                assert_eq!(reg.addr(), addr);
            }
        }
    }

    #[test]
    fn gaps_are_unmapped() {
        for addr in [0xFF03, 0xFF15, 0xFF1F, 0xFF27, 0xFF4C, 0xFF50, 0xFF7F] {
            assert_eq!(IoReg::from_addr(addr), None);
        }
    }
}
