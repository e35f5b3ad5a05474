use genie_core::{Cpu, CycleCounters, InterruptLine, MemoryBus};
use std::fmt::Write as _;
use std::rc::Rc;

mod alu;
pub mod cycles;
mod decode;
mod exec;
mod exec_cb;
mod exec_ed;
mod exec_index;
mod interrupt;
mod regs;
pub mod tables;

pub use regs::{Iff, Index, Pending, Reg, RegPair};

// ============================================================================
//  FLAGS & CONSTANTS
// ============================================================================
pub mod flags {
    pub const S: u8 = 0x80; // Sign
    pub const Z: u8 = 0x40; // Zero
    pub const Y: u8 = 0x20; // Copy bit 5
    pub const H: u8 = 0x10; // Half Carry
    pub const X: u8 = 0x08; // Copy bit 3
    pub const P: u8 = 0x04; // Parity/Overflow
    pub const V: u8 = P;
    pub const N: u8 = 0x02; // Subtract
    pub const C: u8 = 0x01; // Carry
}

pub const NMI_VECTOR: u16 = 0x0066;
pub const IRQ_VECTOR: u16 = 0x0038;

/// Hook del desensamblador: `(pc, bytes) -> (texto, bytes consumidos)`.
pub type Disassembler = dyn Fn(u16, &[u8]) -> (String, usize);

// ============================================================================
//  Z80 CORE STRUCTURE
// ============================================================================

pub struct Z80 {
    // Registros principales
    pub af: RegPair,
    pub bc: RegPair,
    pub de: RegPair,
    pub hl: RegPair,

    // Shadow Registers
    pub af2: RegPair,
    pub bc2: RegPair,
    pub de2: RegPair,
    pub hl2: RegPair,

    // Index & Control
    pub ix: RegPair,
    pub iy: RegPair,
    pub sp: RegPair,
    pub pc: RegPair,

    /// MEMPTR: su byte alto se filtra en los flags X/Y de BIT n,(HL).
    pub wz: RegPair,
    ea: u16,

    // Interrupts & Refresh
    pub i: u8,
    r: u8,
    r2: u8,
    pub im: u8,
    pub iff: Iff,
    pub pending: Pending,
    irq_data: u8,
    after_ei: bool,

    // State
    pub halted: bool,
    cycles: u32,

    counters: Option<Rc<CycleCounters>>,
    disasm: Option<Box<Disassembler>>,
    ed_warned: [u64; 4],
}

impl Default for Z80 {
    fn default() -> Self {
        Self::new()
    }
}

impl Z80 {
    pub fn new() -> Self {
        let mut cpu = Self {
            af: RegPair::default(), bc: RegPair::default(),
            de: RegPair::default(), hl: RegPair::default(),
            af2: RegPair::default(), bc2: RegPair::default(),
            de2: RegPair::default(), hl2: RegPair::default(),
            ix: RegPair::default(), iy: RegPair::default(),
            sp: RegPair::default(), pc: RegPair::default(),
            wz: RegPair::default(), ea: 0,
            i: 0, r: 0, r2: 0, im: 0,
            iff: Iff::empty(), pending: Pending::empty(), irq_data: 0xFF, after_ei: false,
            halted: false, cycles: 0,
            counters: None, disasm: None, ed_warned: [0; 4],
        };
        cpu.reset();
        cpu
    }

    /// Comparte los contadores del scheduler: la CPU publica sus ciclos
    /// del slice después de cada instrucción.
    pub fn attach_counters(&mut self, counters: Rc<CycleCounters>) {
        self.counters = Some(counters);
    }

    pub fn set_disassembler(&mut self, hook: Box<Disassembler>) {
        self.disasm = Some(hook);
    }

    /// Byte que el periférico pone en el bus durante el acknowledge (IM 0/2).
    pub fn set_irq_data(&mut self, data: u8) {
        self.irq_data = data;
    }

    /// Ciclos acumulados en el slice en curso.
    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    // --- Acceso a A/F ---
    #[inline(always)]
    pub fn a(&self) -> u8 { self.af.hi() }
    #[inline(always)]
    pub fn f(&self) -> u8 { self.af.lo() }
    #[inline(always)]
    pub fn set_a(&mut self, v: u8) { self.af.set_hi(v) }
    #[inline(always)]
    pub fn set_f(&mut self, v: u8) { self.af.set_lo(v) }

    /// Registro R visible: 7 bits de refresh + bit 7 preservado.
    pub fn r(&self) -> u8 {
        (self.r & 0x7F) | (self.r2 & 0x80)
    }

    pub fn set_r(&mut self, v: u8) {
        self.r = v;
        self.r2 = v & 0x80;
    }

    // ========================================================================
    //  REGISTER INTROSPECTION
    // ========================================================================

    pub fn reg(&self, reg: Reg) -> u16 {
        match reg {
            Reg::Pc => self.pc.word(),
            Reg::Sp => self.sp.word(),
            Reg::Af => self.af.word(),
            Reg::Bc => self.bc.word(),
            Reg::De => self.de.word(),
            Reg::Hl => self.hl.word(),
            Reg::Ix => self.ix.word(),
            Reg::Iy => self.iy.word(),
            Reg::Af2 => self.af2.word(),
            Reg::Bc2 => self.bc2.word(),
            Reg::De2 => self.de2.word(),
            Reg::Hl2 => self.hl2.word(),
            Reg::Wz => self.wz.word(),
            Reg::R => self.r() as u16,
            Reg::I => self.i as u16,
            Reg::Im => self.im as u16,
            Reg::Iff1 => self.iff.contains(Iff::IFF1) as u16,
            Reg::Iff2 => self.iff.contains(Iff::IFF2) as u16,
            Reg::Halt => self.halted as u16,
            Reg::Pending => self.pending.bits() as u16,
        }
    }

    pub fn set_reg(&mut self, reg: Reg, v: u16) {
        match reg {
            Reg::Pc => self.pc.set_word(v),
            Reg::Sp => self.sp.set_word(v),
            Reg::Af => self.af.set_word(v),
            Reg::Bc => self.bc.set_word(v),
            Reg::De => self.de.set_word(v),
            Reg::Hl => self.hl.set_word(v),
            Reg::Ix => self.ix.set_word(v),
            Reg::Iy => self.iy.set_word(v),
            Reg::Af2 => self.af2.set_word(v),
            Reg::Bc2 => self.bc2.set_word(v),
            Reg::De2 => self.de2.set_word(v),
            Reg::Hl2 => self.hl2.set_word(v),
            Reg::Wz => self.wz.set_word(v),
            Reg::R => self.set_r(v as u8),
            Reg::I => self.i = v as u8,
            Reg::Im => self.im = (v as u8).min(2),
            Reg::Iff1 => self.iff.set(Iff::IFF1, v != 0),
            Reg::Iff2 => self.iff.set(Iff::IFF2, v != 0),
            Reg::Halt => self.halted = v != 0,
            Reg::Pending => self.pending = Pending::from_bits_truncate(v as u8),
        }
    }

    /// Línea de debug: registros + desensamblado de la instrucción en PC.
    pub fn dump(&self, bus: &dyn MemoryBus) -> String {
        let pc = self.pc.word();
        let bytes: [u8; 4] = std::array::from_fn(|n| bus.read(pc.wrapping_add(n as u16)));
        let (text, len) = match &self.disasm {
            Some(hook) => hook(pc, &bytes),
            None => (format!("db ${:02X}", bytes[0]), 1),
        };
        let mut hex = String::new();
        for b in &bytes[..len.clamp(1, bytes.len())] {
            let _ = write!(hex, "{:02X} ", b);
        }
        format!(
            "{:04X}: {:<12}{:<20} AF:{:04X} BC:{:04X} DE:{:04X} HL:{:04X} IX:{:04X} IY:{:04X} SP:{:04X} R:{:02X}",
            pc, hex, text,
            self.af.word(), self.bc.word(), self.de.word(), self.hl.word(),
            self.ix.word(), self.iy.word(), self.sp.word(), self.r()
        )
    }

    // --- Helpers de Lectura ---

    /// Fetch de ciclo M1: incrementa el refresh.
    #[inline(always)]
    pub(crate) fn fetch_op(&mut self, bus: &dyn MemoryBus) -> u8 {
        let val = bus.read(self.pc.word());
        self.pc.inc();
        self.refresh();
        val
    }

    /// Fetch de operandos (inmediatos, desplazamientos): no toca R.
    #[inline(always)]
    pub(crate) fn fetch(&mut self, bus: &dyn MemoryBus) -> u8 {
        let val = bus.read(self.pc.word());
        self.pc.inc();
        val
    }

    #[inline(always)]
    pub(crate) fn fetch_u16(&mut self, bus: &dyn MemoryBus) -> u16 {
        let lo = self.fetch(bus) as u16;
        let hi = self.fetch(bus) as u16;
        (hi << 8) | lo
    }

    #[inline(always)]
    pub(crate) fn refresh(&mut self) {
        self.r = self.r.wrapping_add(1);
    }

    #[inline(always)]
    pub(crate) fn charge(&mut self, cycles: u8) {
        self.cycles = self.cycles.wrapping_add(cycles as u32);
    }

    // --- Helpers de Stack ---
    pub(crate) fn push(&mut self, bus: &mut dyn MemoryBus, val: u16) {
        self.sp.dec();
        bus.write(self.sp.word(), (val >> 8) as u8); // Hi
        self.sp.dec();
        bus.write(self.sp.word(), (val & 0xFF) as u8); // Lo
    }

    pub(crate) fn pop(&mut self, bus: &dyn MemoryBus) -> u16 {
        let lo = bus.read(self.sp.word()) as u16;
        self.sp.inc();
        let hi = bus.read(self.sp.word()) as u16;
        self.sp.inc();
        (hi << 8) | lo
    }

    fn publish(&self) {
        if let Some(counters) = &self.counters {
            counters.set_executed(self.cycles);
        }
    }
}

// ============================================================================
//  CPU TRAIT
// ============================================================================

impl Cpu for Z80 {
    /// Todo a cero salvo F (sólo Z) e IX/IY (todo unos).
    fn reset(&mut self) {
        for pair in [
            &mut self.bc, &mut self.de, &mut self.hl,
            &mut self.af2, &mut self.bc2, &mut self.de2, &mut self.hl2,
            &mut self.sp, &mut self.pc, &mut self.wz,
        ] {
            pair.set_word(0);
        }
        self.af.set_word(flags::Z as u16);
        self.ix.set_word(0xFFFF);
        self.iy.set_word(0xFFFF);
        self.ea = 0;
        self.i = 0;
        self.r = 0;
        self.r2 = 0;
        self.im = 0;
        self.iff = Iff::empty();
        self.pending = Pending::empty();
        self.after_ei = false;
        self.halted = false;
        log::debug!("z80 reset");
    }

    fn step(&mut self, bus: &mut dyn MemoryBus) -> u32 {
        let before = self.cycles;
        self.instruction(bus);
        self.cycles.wrapping_sub(before)
    }

    fn execute(&mut self, bus: &mut dyn MemoryBus, budget: u32) -> u32 {
        self.cycles = 0;
        while self.cycles < budget {
            self.instruction(bus);
            self.publish();
        }
        self.cycles
    }

    fn interrupt(&mut self, line: InterruptLine) {
        match line {
            InterruptLine::Nmi => self.pending.insert(Pending::NMI),
            InterruptLine::Irq => self.pending.insert(Pending::IRQ),
        }
    }

    fn clear_interrupt(&mut self, line: InterruptLine) {
        match line {
            InterruptLine::Nmi => self.pending.remove(Pending::NMI),
            InterruptLine::Irq => self.pending.remove(Pending::IRQ),
        }
    }

    fn pc(&self) -> u16 {
        self.pc.word()
    }
}
