// crates/geniez80/src/regs.rs
use bitflags::bitflags;

/// Par de registros de 16 bits direccionable como dos mitades de 8 bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegPair(u16);

impl RegPair {
    pub const fn new(word: u16) -> Self {
        Self(word)
    }

    #[inline(always)]
    pub const fn word(self) -> u16 {
        self.0
    }

    #[inline(always)]
    pub fn set_word(&mut self, word: u16) {
        self.0 = word;
    }

    #[inline(always)]
    pub const fn hi(self) -> u8 {
        (self.0 >> 8) as u8
    }

    #[inline(always)]
    pub const fn lo(self) -> u8 {
        self.0 as u8
    }

    #[inline(always)]
    pub fn set_hi(&mut self, v: u8) {
        self.0 = (self.0 & 0x00FF) | ((v as u16) << 8);
    }

    #[inline(always)]
    pub fn set_lo(&mut self, v: u8) {
        self.0 = (self.0 & 0xFF00) | v as u16;
    }

    #[inline(always)]
    pub fn inc(&mut self) -> u16 {
        self.0 = self.0.wrapping_add(1);
        self.0
    }

    #[inline(always)]
    pub fn dec(&mut self) -> u16 {
        self.0 = self.0.wrapping_sub(1);
        self.0
    }
}

bitflags! {
    /// Los dos flip-flops de interrupción empaquetados en un solo campo.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Iff: u8 {
        const IFF1 = 1 << 0;
        const IFF2 = 1 << 1;
    }
}

bitflags! {
    /// Latch de peticiones pendientes, consumido en el próximo fetch.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Pending: u8 {
        const NMI = 1 << 0;
        const IRQ = 1 << 1;
    }
}

/// Registro índice seleccionado por el prefijo DD (IX) o FD (IY).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Index {
    Ix,
    Iy,
}

impl Index {
    pub fn from_prefix(prefix: u8) -> Self {
        if prefix == 0xFD { Index::Iy } else { Index::Ix }
    }
}

/// Identificadores simbólicos para la introspección de registros.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reg {
    Pc,
    Sp,
    Af,
    Bc,
    De,
    Hl,
    Ix,
    Iy,
    Af2,
    Bc2,
    De2,
    Hl2,
    Wz,
    R,
    I,
    Im,
    Iff1,
    Iff2,
    Halt,
    Pending,
}

impl Reg {
    pub const ALL: [Reg; 20] = [
        Reg::Pc, Reg::Sp, Reg::Af, Reg::Bc, Reg::De, Reg::Hl, Reg::Ix, Reg::Iy,
        Reg::Af2, Reg::Bc2, Reg::De2, Reg::Hl2, Reg::Wz, Reg::R, Reg::I, Reg::Im,
        Reg::Iff1, Reg::Iff2, Reg::Halt, Reg::Pending,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Reg::Pc => "PC", Reg::Sp => "SP", Reg::Af => "AF", Reg::Bc => "BC",
            Reg::De => "DE", Reg::Hl => "HL", Reg::Ix => "IX", Reg::Iy => "IY",
            Reg::Af2 => "AF'", Reg::Bc2 => "BC'", Reg::De2 => "DE'", Reg::Hl2 => "HL'",
            Reg::Wz => "WZ", Reg::R => "R", Reg::I => "I", Reg::Im => "IM",
            Reg::Iff1 => "IFF1", Reg::Iff2 => "IFF2", Reg::Halt => "HALT",
            Reg::Pending => "IRQ",
        }
    }
}
