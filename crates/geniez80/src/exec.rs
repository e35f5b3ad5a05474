// crates/geniez80/src/exec.rs
//! Tabla base (sin prefijo) y los accesos a registros codificados en el opcode.

use crate::cycles::EXTRA;
use crate::regs::Iff;
use crate::Z80;
use genie_core::MemoryBus;
use std::mem::swap;

impl Z80 {
    // ========================================================================
    //  REGISTER FIELDS
    // ========================================================================

    /// Registro de 8 bits por índice B C D E H L - A. El 6 selecciona F.
    pub(crate) fn reg8(&self, r: u8) -> u8 {
        match r & 7 {
            0 => self.bc.hi(),
            1 => self.bc.lo(),
            2 => self.de.hi(),
            3 => self.de.lo(),
            4 => self.hl.hi(),
            5 => self.hl.lo(),
            6 => self.f(),
            _ => self.a(),
        }
    }

    pub(crate) fn set_reg8(&mut self, r: u8, v: u8) {
        match r & 7 {
            0 => self.bc.set_hi(v),
            1 => self.bc.set_lo(v),
            2 => self.de.set_hi(v),
            3 => self.de.set_lo(v),
            4 => self.hl.set_hi(v),
            5 => self.hl.set_lo(v),
            6 => self.set_f(v),
            _ => self.set_a(v),
        }
    }

    /// Como `reg8`, pero el 6 es el byte apuntado por HL.
    fn read_r(&self, bus: &dyn MemoryBus, r: u8) -> u8 {
        if r & 7 == 6 { bus.read(self.hl.word()) } else { self.reg8(r) }
    }

    fn write_r(&mut self, bus: &mut dyn MemoryBus, r: u8, v: u8) {
        if r & 7 == 6 { bus.write(self.hl.word(), v) } else { self.set_reg8(r, v) }
    }

    /// Pares BC DE HL SP (bits 5..4 del opcode).
    pub(crate) fn rp(&self, p: u8) -> u16 {
        match p & 3 {
            0 => self.bc.word(),
            1 => self.de.word(),
            2 => self.hl.word(),
            _ => self.sp.word(),
        }
    }

    pub(crate) fn set_rp(&mut self, p: u8, v: u16) {
        match p & 3 {
            0 => self.bc.set_word(v),
            1 => self.de.set_word(v),
            2 => self.hl.set_word(v),
            _ => self.sp.set_word(v),
        }
    }

    /// Pares para PUSH/POP: BC DE HL AF.
    fn rp2(&self, p: u8) -> u16 {
        if p & 3 == 3 { self.af.word() } else { self.rp(p) }
    }

    fn set_rp2(&mut self, p: u8, v: u16) {
        if p & 3 == 3 { self.af.set_word(v) } else { self.set_rp(p, v) }
    }

    // ========================================================================
    //  CONTROL FLOW
    // ========================================================================

    fn jr(&mut self, d: u8) {
        let pc = self.pc.word().wrapping_add(d as i8 as u16);
        self.pc.set_word(pc);
        self.wz.set_word(pc);
    }

    pub(crate) fn call(&mut self, bus: &mut dyn MemoryBus, addr: u16) {
        self.push(bus, self.pc.word());
        self.pc.set_word(addr);
    }

    pub(crate) fn ret(&mut self, bus: &dyn MemoryBus) {
        let pc = self.pop(bus);
        self.pc.set_word(pc);
        self.wz.set_word(pc);
    }

    #[inline(always)]
    fn extra(&mut self, op: u8) {
        self.charge(EXTRA[op as usize]);
    }

    // ========================================================================
    //  OPCODE EXECUTION
    // ========================================================================

    pub(crate) fn exec_base(&mut self, bus: &mut dyn MemoryBus, op: u8) {
        let y = (op >> 3) & 7;
        let p = (op >> 4) & 3;

        match op {
            0x00 => {} // NOP

            // 16-bit Loads
            0x01 | 0x11 | 0x21 | 0x31 => {
                let v = self.fetch_u16(bus);
                self.set_rp(p, v);
            }
            0x02 | 0x12 => { // LD (BC),A / LD (DE),A
                let addr = self.rp(p);
                bus.write(addr, self.a());
                self.wz.set_word(((self.a() as u16) << 8) | (addr.wrapping_add(1) & 0xFF));
            }
            0x0A | 0x1A => { // LD A,(BC) / LD A,(DE)
                let addr = self.rp(p);
                self.set_a(bus.read(addr));
                self.wz.set_word(addr.wrapping_add(1));
            }
            0x22 => { // LD (nn),HL
                let addr = self.fetch_u16(bus);
                bus.write_u16_le(addr, self.hl.word());
                self.wz.set_word(addr.wrapping_add(1));
            }
            0x2A => { // LD HL,(nn)
                let addr = self.fetch_u16(bus);
                self.hl.set_word(bus.read_u16_le(addr));
                self.wz.set_word(addr.wrapping_add(1));
            }
            0x32 => { // LD (nn),A
                let addr = self.fetch_u16(bus);
                bus.write(addr, self.a());
                self.wz.set_word(((self.a() as u16) << 8) | (addr.wrapping_add(1) & 0xFF));
            }
            0x3A => { // LD A,(nn)
                let addr = self.fetch_u16(bus);
                self.set_a(bus.read(addr));
                self.wz.set_word(addr.wrapping_add(1));
            }
            0xF9 => self.sp = self.hl,

            // 16-bit Inc/Dec
            0x03 | 0x13 | 0x23 | 0x33 => self.set_rp(p, self.rp(p).wrapping_add(1)),
            0x0B | 0x1B | 0x2B | 0x3B => self.set_rp(p, self.rp(p).wrapping_sub(1)),

            // 16-bit Arith
            0x09 | 0x19 | 0x29 | 0x39 => {
                let v = self.add16(self.hl.word(), self.rp(p));
                self.hl.set_word(v);
            }

            // Inc/Dec 8-bit, LD r,n
            0x04 | 0x0C | 0x14 | 0x1C | 0x24 | 0x2C | 0x34 | 0x3C => {
                let v = self.read_r(bus, y);
                let v = self.inc8(v);
                self.write_r(bus, y, v);
            }
            0x05 | 0x0D | 0x15 | 0x1D | 0x25 | 0x2D | 0x35 | 0x3D => {
                let v = self.read_r(bus, y);
                let v = self.dec8(v);
                self.write_r(bus, y, v);
            }
            0x06 | 0x0E | 0x16 | 0x1E | 0x26 | 0x2E | 0x36 | 0x3E => {
                let v = self.fetch(bus);
                self.write_r(bus, y, v);
            }

            // Rotations & misc
            0x07 => self.rlca(),
            0x0F => self.rrca(),
            0x17 => self.rla(),
            0x1F => self.rra(),
            0x27 => self.daa(),
            0x2F => self.cpl(),
            0x37 => self.scf(),
            0x3F => self.ccf(),

            0x08 => swap(&mut self.af, &mut self.af2), // EX AF,AF'
            0xD9 => { // EXX
                swap(&mut self.bc, &mut self.bc2);
                swap(&mut self.de, &mut self.de2);
                swap(&mut self.hl, &mut self.hl2);
            }
            0xEB => swap(&mut self.de, &mut self.hl), // EX DE,HL
            0xE3 => { // EX (SP),HL
                let sp = self.sp.word();
                let v = bus.read_u16_le(sp);
                bus.write_u16_le(sp, self.hl.word());
                self.hl.set_word(v);
                self.wz.set_word(v);
            }

            // Relative jumps
            0x10 => { // DJNZ
                let d = self.fetch(bus);
                let b = self.bc.hi().wrapping_sub(1);
                self.bc.set_hi(b);
                if b != 0 {
                    self.jr(d);
                    self.extra(op);
                }
            }
            0x18 => {
                let d = self.fetch(bus);
                self.jr(d);
            }
            0x20 | 0x28 | 0x30 | 0x38 => { // JR cc
                let d = self.fetch(bus);
                if self.cond(y & 3) {
                    self.jr(d);
                    self.extra(op);
                }
            }

            0x76 => { // HALT: el PC se queda sobre el opcode
                self.halted = true;
                self.pc.dec();
            }

            // 8-bit Loads
            0x40..=0x7F => {
                let v = self.read_r(bus, op);
                self.write_r(bus, y, v);
            }

            // ALU 8-bit
            0x80..=0xBF => {
                let v = self.read_r(bus, op);
                self.alu(y, v);
            }
            0xC6 | 0xCE | 0xD6 | 0xDE | 0xE6 | 0xEE | 0xF6 | 0xFE => {
                let v = self.fetch(bus);
                self.alu(y, v);
            }

            // Absolute jumps, calls, returns
            0xC0 | 0xC8 | 0xD0 | 0xD8 | 0xE0 | 0xE8 | 0xF0 | 0xF8 => { // RET cc
                if self.cond(y) {
                    self.ret(bus);
                    self.extra(op);
                }
            }
            0xC9 => self.ret(bus),
            0xC2 | 0xCA | 0xD2 | 0xDA | 0xE2 | 0xEA | 0xF2 | 0xFA => { // JP cc,nn
                let addr = self.fetch_u16(bus);
                self.wz.set_word(addr);
                if self.cond(y) {
                    self.pc.set_word(addr);
                }
            }
            0xC3 => {
                let addr = self.fetch_u16(bus);
                self.wz.set_word(addr);
                self.pc.set_word(addr);
            }
            0xE9 => self.pc = self.hl, // JP (HL)
            0xC4 | 0xCC | 0xD4 | 0xDC | 0xE4 | 0xEC | 0xF4 | 0xFC => { // CALL cc,nn
                let addr = self.fetch_u16(bus);
                self.wz.set_word(addr);
                if self.cond(y) {
                    self.call(bus, addr);
                    self.extra(op);
                }
            }
            0xCD => {
                let addr = self.fetch_u16(bus);
                self.wz.set_word(addr);
                self.call(bus, addr);
            }
            0xC7 | 0xCF | 0xD7 | 0xDF | 0xE7 | 0xEF | 0xF7 | 0xFF => { // RST
                let addr = (op & 0x38) as u16;
                self.call(bus, addr);
                self.wz.set_word(addr);
            }

            // Stack
            0xC1 | 0xD1 | 0xE1 | 0xF1 => {
                let v = self.pop(bus);
                self.set_rp2(p, v);
            }
            0xC5 | 0xD5 | 0xE5 | 0xF5 => self.push(bus, self.rp2(p)),

            // IO
            0xD3 => { // OUT (n),A
                let n = self.fetch(bus);
                let a = self.a();
                bus.port_out(((a as u16) << 8) | n as u16, a);
                self.wz.set_word(((a as u16) << 8) | n.wrapping_add(1) as u16);
            }
            0xDB => { // IN A,(n)
                let n = self.fetch(bus);
                let port = ((self.a() as u16) << 8) | n as u16;
                self.set_a(bus.port_in(port));
                self.wz.set_word(port.wrapping_add(1));
            }

            // Interrupt control
            0xF3 => self.iff = Iff::empty(),
            0xFB => {
                self.iff = Iff::IFF1 | Iff::IFF2;
                self.after_ei = true;
            }

            // Prefijos: los resuelve el decodificador antes de llegar aquí.
            0xCB | 0xDD | 0xED | 0xFD => {}
        }
    }
}
