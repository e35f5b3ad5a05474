// crates/geniez80/src/alu.rs
//! ALU: aritmética, lógica, rotaciones, BIT y primitivas de bloque.
//! Los flags salen de las tablas; carry, half-carry y overflow se calculan
//! a mano.

use crate::flags::{C, H, N, P, S, V, X, Y, Z};
use crate::tables::{SZ, SZHV_DEC, SZHV_INC, SZP, SZ_BIT};
use crate::Z80;
use genie_core::MemoryBus;

impl Z80 {
    #[inline(always)]
    pub(crate) fn flag(&self, f: u8) -> bool {
        (self.f() & f) != 0
    }

    #[inline(always)]
    fn carry(&self) -> u32 {
        (self.f() & C) as u32
    }

    /// Condiciones cc: NZ, Z, NC, C, PO, PE, P, M.
    pub(crate) fn cond(&self, cc: u8) -> bool {
        match cc & 7 {
            0 => !self.flag(Z),
            1 => self.flag(Z),
            2 => !self.flag(C),
            3 => self.flag(C),
            4 => !self.flag(P),
            5 => self.flag(P),
            6 => !self.flag(S),
            _ => self.flag(S),
        }
    }

    // ------------------------------------------------------------------
    //  8-bit
    // ------------------------------------------------------------------

    /// Operación ALU codificada en los bits 5..3 del opcode.
    pub(crate) fn alu(&mut self, kind: u8, v: u8) {
        match kind & 7 {
            0 => self.add8(v, 0),
            1 => self.add8(v, self.carry()),
            2 => self.sub8(v, 0),
            3 => self.sub8(v, self.carry()),
            4 => self.and(v),
            5 => self.xor(v),
            6 => self.or(v),
            _ => self.cp(v),
        }
    }

    fn add8(&mut self, v: u8, carry: u32) {
        let a = self.a() as u32;
        let v = v as u32;
        let res = a + v + carry;
        let f = SZ[(res & 0xFF) as usize]
            | ((res >> 8) as u8 & C)
            | ((a ^ res ^ v) as u8 & H)
            | ((((v ^ a ^ 0x80) & (v ^ res) & 0x80) >> 5) as u8);
        self.set_f(f);
        self.set_a(res as u8);
    }

    fn sub_flags(&self, v: u8, carry: u32) -> (u8, u8) {
        let a = self.a() as u32;
        let v = v as u32;
        let res = a.wrapping_sub(v).wrapping_sub(carry);
        let f = SZ[(res & 0xFF) as usize]
            | ((res >> 8) as u8 & C)
            | N
            | ((a ^ res ^ v) as u8 & H)
            | ((((v ^ a) & (a ^ res) & 0x80) >> 5) as u8);
        (res as u8, f)
    }

    fn sub8(&mut self, v: u8, carry: u32) {
        let (res, f) = self.sub_flags(v, carry);
        self.set_f(f);
        self.set_a(res);
    }

    // CP: X/Y vienen del operando, no del resultado.
    fn cp(&mut self, v: u8) {
        let (_, f) = self.sub_flags(v, 0);
        self.set_f((f & !(X | Y)) | (v & (X | Y)));
    }

    fn and(&mut self, v: u8) {
        let r = self.a() & v;
        self.set_a(r);
        self.set_f(SZP[r as usize] | H);
    }

    fn or(&mut self, v: u8) {
        let r = self.a() | v;
        self.set_a(r);
        self.set_f(SZP[r as usize]);
    }

    fn xor(&mut self, v: u8) {
        let r = self.a() ^ v;
        self.set_a(r);
        self.set_f(SZP[r as usize]);
    }

    pub(crate) fn neg(&mut self) {
        let v = self.a();
        self.set_a(0);
        self.sub8(v, 0);
    }

    pub(crate) fn inc8(&mut self, v: u8) -> u8 {
        let r = v.wrapping_add(1);
        self.set_f((self.f() & C) | SZHV_INC[r as usize]);
        r
    }

    pub(crate) fn dec8(&mut self, v: u8) -> u8 {
        let r = v.wrapping_sub(1);
        self.set_f((self.f() & C) | SZHV_DEC[r as usize]);
        r
    }

    pub(crate) fn daa(&mut self) {
        let a = self.a();
        let f = self.f();
        let mut r = a;
        let adjust_low = (f & H) != 0 || (a & 0x0F) > 9;
        let adjust_high = (f & C) != 0 || a > 0x99;
        if (f & N) != 0 {
            if adjust_low { r = r.wrapping_sub(0x06); }
            if adjust_high { r = r.wrapping_sub(0x60); }
        } else {
            if adjust_low { r = r.wrapping_add(0x06); }
            if adjust_high { r = r.wrapping_add(0x60); }
        }
        let carry = if a > 0x99 { C } else { 0 };
        self.set_f((f & (C | N)) | carry | ((a ^ r) & H) | SZP[r as usize]);
        self.set_a(r);
    }

    pub(crate) fn cpl(&mut self) {
        let a = !self.a();
        self.set_a(a);
        self.set_f((self.f() & (S | Z | P | C)) | H | N | (a & (X | Y)));
    }

    pub(crate) fn scf(&mut self) {
        self.set_f((self.f() & (S | Z | P)) | C | (self.a() & (X | Y)));
    }

    pub(crate) fn ccf(&mut self) {
        let f = self.f();
        self.set_f(((f & (S | Z | P | C)) | ((f & C) << 4) | (self.a() & (X | Y))) ^ C);
    }

    // --- Rotaciones del acumulador: S, Z y P no cambian ---

    pub(crate) fn rlca(&mut self) {
        let a = self.a().rotate_left(1);
        self.set_a(a);
        self.set_f((self.f() & (S | Z | P)) | (a & (Y | X | C)));
    }

    pub(crate) fn rrca(&mut self) {
        let old = self.a();
        let a = old.rotate_right(1);
        self.set_a(a);
        self.set_f((self.f() & (S | Z | P)) | (old & C) | (a & (Y | X)));
    }

    pub(crate) fn rla(&mut self) {
        let old = self.a();
        let a = (old << 1) | (self.f() & C);
        self.set_a(a);
        self.set_f((self.f() & (S | Z | P)) | (old >> 7) | (a & (Y | X)));
    }

    pub(crate) fn rra(&mut self) {
        let old = self.a();
        let a = (old >> 1) | ((self.f() & C) << 7);
        self.set_a(a);
        self.set_f((self.f() & (S | Z | P)) | (old & C) | (a & (Y | X)));
    }

    /// RLC, RRC, RL, RR, SLA, SRA, SLL, SRL según bits 5..3 del opcode CB.
    pub(crate) fn rot_shift(&mut self, kind: u8, v: u8) -> u8 {
        let c_in = self.f() & C;
        let (r, c) = match kind & 7 {
            0 => (v.rotate_left(1), v >> 7),
            1 => (v.rotate_right(1), v & 1),
            2 => ((v << 1) | c_in, v >> 7),
            3 => ((v >> 1) | (c_in << 7), v & 1),
            4 => (v << 1, v >> 7),
            5 => ((v >> 1) | (v & 0x80), v & 1),
            6 => ((v << 1) | 1, v >> 7),
            _ => (v >> 1, v & 1),
        };
        self.set_f(SZP[r as usize] | c);
        r
    }

    /// BIT b: X/Y salen de `xy` (el valor probado, WZ alto o la dirección efectiva).
    pub(crate) fn bit(&mut self, b: u8, v: u8, xy: u8) {
        let f = (self.f() & C) | H | (SZ_BIT[(v & (1 << b)) as usize] & !(X | Y)) | (xy & (X | Y));
        self.set_f(f);
    }

    // ------------------------------------------------------------------
    //  16-bit
    // ------------------------------------------------------------------

    pub(crate) fn add16(&mut self, dst: u16, src: u16) -> u16 {
        let (d, s) = (dst as u32, src as u32);
        let res = d + s;
        self.wz.set_word(dst.wrapping_add(1));
        let f = (self.f() & (S | Z | V))
            | (((d ^ res ^ s) >> 8) as u8 & H)
            | ((res >> 16) as u8 & C)
            | ((res >> 8) as u8 & (Y | X));
        self.set_f(f);
        res as u16
    }

    pub(crate) fn adc16(&mut self, v: u16) {
        let hl = self.hl.word() as u32;
        let v = v as u32;
        let res = hl + v + self.carry();
        self.wz.set_word((hl as u16).wrapping_add(1));
        let f = (((hl ^ res ^ v) >> 8) as u8 & H)
            | ((res >> 16) as u8 & C)
            | ((res >> 8) as u8 & (S | Y | X))
            | if res & 0xFFFF == 0 { Z } else { 0 }
            | ((((v ^ hl ^ 0x8000) & (v ^ res) & 0x8000) >> 13) as u8);
        self.set_f(f);
        self.hl.set_word(res as u16);
    }

    pub(crate) fn sbc16(&mut self, v: u16) {
        let hl = self.hl.word() as u32;
        let v = v as u32;
        let res = hl.wrapping_sub(v).wrapping_sub(self.carry());
        self.wz.set_word((hl as u16).wrapping_add(1));
        let f = (((hl ^ res ^ v) >> 8) as u8 & H)
            | N
            | ((res >> 16) as u8 & C)
            | ((res >> 8) as u8 & (S | Y | X))
            | if res & 0xFFFF == 0 { Z } else { 0 }
            | ((((v ^ hl) & (hl ^ res) & 0x8000) >> 13) as u8);
        self.set_f(f);
        self.hl.set_word(res as u16);
    }

    // ------------------------------------------------------------------
    //  BCD de memoria
    // ------------------------------------------------------------------

    pub(crate) fn rrd(&mut self, bus: &mut dyn MemoryBus) {
        let addr = self.hl.word();
        let n = bus.read(addr);
        let a = self.a();
        self.wz.set_word(addr.wrapping_add(1));
        bus.write(addr, (n >> 4) | (a << 4));
        let a = (a & 0xF0) | (n & 0x0F);
        self.set_a(a);
        self.set_f((self.f() & C) | SZP[a as usize]);
    }

    pub(crate) fn rld(&mut self, bus: &mut dyn MemoryBus) {
        let addr = self.hl.word();
        let n = bus.read(addr);
        let a = self.a();
        self.wz.set_word(addr.wrapping_add(1));
        bus.write(addr, (n << 4) | (a & 0x0F));
        let a = (a & 0xF0) | (n >> 4);
        self.set_a(a);
        self.set_f((self.f() & C) | SZP[a as usize]);
    }

    // ------------------------------------------------------------------
    //  Bloques. `step` es +1 (LDI/CPI/INI/OUTI) o -1 (LDD/CPD/IND/OUTD).
    // ------------------------------------------------------------------

    pub(crate) fn ldi(&mut self, bus: &mut dyn MemoryBus, step: i8) {
        let v = bus.read(self.hl.word());
        bus.write(self.de.word(), v);
        let step = step as u16;
        self.hl.set_word(self.hl.word().wrapping_add(step));
        self.de.set_word(self.de.word().wrapping_add(step));
        let bc = self.bc.dec();

        // X = bit 3 y Y = bit 1 de (valor + A)
        let n = v.wrapping_add(self.a());
        let mut f = (self.f() & (S | Z | C)) | (n & X) | ((n << 4) & Y);
        if bc != 0 {
            f |= V;
        }
        self.set_f(f);
    }

    pub(crate) fn cpi(&mut self, bus: &mut dyn MemoryBus, step: i8) {
        let v = bus.read(self.hl.word());
        let a = self.a();
        let mut res = a.wrapping_sub(v);
        let step = step as u16;
        self.hl.set_word(self.hl.word().wrapping_add(step));
        self.wz.set_word(self.wz.word().wrapping_add(step));
        let bc = self.bc.dec();

        let mut f = (self.f() & C) | (SZ[res as usize] & !(X | Y)) | ((a ^ v ^ res) & H) | N;
        if f & H != 0 {
            res = res.wrapping_sub(1);
        }
        if res & 0x02 != 0 {
            f |= Y;
        }
        if res & 0x08 != 0 {
            f |= X;
        }
        if bc != 0 {
            f |= V;
        }
        self.set_f(f);
    }

    pub(crate) fn ini(&mut self, bus: &mut dyn MemoryBus, step: i8) {
        let port = self.bc.word();
        let io = bus.port_in(port);
        self.wz.set_word(port.wrapping_add(step as u16));
        let b = self.bc.hi().wrapping_sub(1);
        self.bc.set_hi(b);
        bus.write(self.hl.word(), io);
        self.hl.set_word(self.hl.word().wrapping_add(step as u16));

        let t = self.bc.lo().wrapping_add(step as u8) as u32 + io as u32;
        self.set_f(Self::block_io_flags(b, io, t));
    }

    pub(crate) fn outi(&mut self, bus: &mut dyn MemoryBus, step: i8) {
        let io = bus.read(self.hl.word());
        let b = self.bc.hi().wrapping_sub(1);
        self.bc.set_hi(b);
        let port = self.bc.word();
        self.wz.set_word(port.wrapping_add(step as u16));
        bus.port_out(port, io);
        self.hl.set_word(self.hl.word().wrapping_add(step as u16));

        let t = self.hl.lo() as u32 + io as u32;
        self.set_f(Self::block_io_flags(b, io, t));
    }

    fn block_io_flags(b: u8, io: u8, t: u32) -> u8 {
        let mut f = SZ[b as usize];
        if io & S != 0 {
            f |= N;
        }
        if t & 0x100 != 0 {
            f |= H | C;
        }
        f | (SZP[((t as u8) & 0x07 ^ b) as usize] & P)
    }
}
