// crates/geniez80/src/exec_index.rs
//! Prefijos DD/FD: HL pasa a ser IX/IY, H/L pasan a ser las mitades del
//! índice y (HL) pasa a ser (IX+d). Lo que no toca HL se ejecuta como base.

use crate::cycles::XYCB;
use crate::regs::{Index, RegPair};
use crate::Z80;
use genie_core::MemoryBus;

impl Z80 {
    fn index(&self, idx: Index) -> RegPair {
        match idx {
            Index::Ix => self.ix,
            Index::Iy => self.iy,
        }
    }

    fn index_mut(&mut self, idx: Index) -> &mut RegPair {
        match idx {
            Index::Ix => &mut self.ix,
            Index::Iy => &mut self.iy,
        }
    }

    /// Lee el desplazamiento y fija la dirección efectiva (y MEMPTR).
    fn displaced(&mut self, bus: &dyn MemoryBus, idx: Index) -> u16 {
        let d = self.fetch(bus) as i8;
        self.ea = self.index(idx).word().wrapping_add(d as u16);
        self.wz.set_word(self.ea);
        self.ea
    }

    // IXH/IXL en lugar de H/L
    fn index_reg8(&self, idx: Index, r: u8) -> u8 {
        match r {
            4 => self.index(idx).hi(),
            5 => self.index(idx).lo(),
            _ => self.reg8(r),
        }
    }

    fn set_index_reg8(&mut self, idx: Index, r: u8, v: u8) {
        match r {
            4 => self.index_mut(idx).set_hi(v),
            5 => self.index_mut(idx).set_lo(v),
            _ => self.set_reg8(r, v),
        }
    }

    /// Devuelve `false` si el opcode no usa HL: el decodificador lo ejecuta
    /// entonces como instrucción base, sin cobrar de nuevo.
    pub(crate) fn exec_index(&mut self, bus: &mut dyn MemoryBus, idx: Index, op: u8) -> bool {
        let y = (op >> 3) & 7;
        let z = op & 7;

        match op {
            0x09 | 0x19 | 0x29 | 0x39 => { // ADD IX,rr
                let dst = self.index(idx).word();
                let src = if op == 0x29 { dst } else { self.rp((op >> 4) & 3) };
                let v = self.add16(dst, src);
                self.index_mut(idx).set_word(v);
            }
            0x21 => {
                let v = self.fetch_u16(bus);
                self.index_mut(idx).set_word(v);
            }
            0x22 => {
                let addr = self.fetch_u16(bus);
                bus.write_u16_le(addr, self.index(idx).word());
                self.wz.set_word(addr.wrapping_add(1));
            }
            0x2A => {
                let addr = self.fetch_u16(bus);
                let v = bus.read_u16_le(addr);
                self.index_mut(idx).set_word(v);
                self.wz.set_word(addr.wrapping_add(1));
            }
            0x23 => {
                self.index_mut(idx).inc();
            }
            0x2B => {
                self.index_mut(idx).dec();
            }

            // IXH / IXL
            0x24 | 0x2C => {
                let v = self.index_reg8(idx, y);
                let v = self.inc8(v);
                self.set_index_reg8(idx, y, v);
            }
            0x25 | 0x2D => {
                let v = self.index_reg8(idx, y);
                let v = self.dec8(v);
                self.set_index_reg8(idx, y, v);
            }
            0x26 | 0x2E => {
                let v = self.fetch(bus);
                self.set_index_reg8(idx, y, v);
            }

            // (IX+d)
            0x34 => {
                let ea = self.displaced(bus, idx);
                let v = self.inc8(bus.read(ea));
                bus.write(ea, v);
            }
            0x35 => {
                let ea = self.displaced(bus, idx);
                let v = self.dec8(bus.read(ea));
                bus.write(ea, v);
            }
            0x36 => {
                let ea = self.displaced(bus, idx);
                let v = self.fetch(bus);
                bus.write(ea, v);
            }

            0x76 => return false, // HALT

            // LD r,r': con (IX+d) el otro operando es H/L de verdad
            0x40..=0x7F => {
                if z == 6 {
                    let ea = self.displaced(bus, idx);
                    let v = bus.read(ea);
                    self.set_reg8(y, v);
                } else if y == 6 {
                    let ea = self.displaced(bus, idx);
                    bus.write(ea, self.reg8(z));
                } else if matches!(y, 4 | 5) || matches!(z, 4 | 5) {
                    let v = self.index_reg8(idx, z);
                    self.set_index_reg8(idx, y, v);
                } else {
                    return false;
                }
            }

            0x80..=0xBF => {
                let v = match z {
                    6 => {
                        let ea = self.displaced(bus, idx);
                        bus.read(ea)
                    }
                    4 | 5 => self.index_reg8(idx, z),
                    _ => return false,
                };
                self.alu(y, v);
            }

            0xE1 => {
                let v = self.pop(bus);
                self.index_mut(idx).set_word(v);
            }
            0xE5 => self.push(bus, self.index(idx).word()),
            0xE3 => { // EX (SP),IX
                let sp = self.sp.word();
                let v = bus.read_u16_le(sp);
                bus.write_u16_le(sp, self.index(idx).word());
                self.index_mut(idx).set_word(v);
                self.wz.set_word(v);
            }
            0xE9 => self.pc = self.index(idx),
            0xF9 => self.sp = self.index(idx),

            _ => return false,
        }
        true
    }

    /// DD CB d op / FD CB d op. Ni el desplazamiento ni el opcode final son
    /// fetches M1, así que R no avanza.
    pub(crate) fn exec_index_cb(&mut self, bus: &mut dyn MemoryBus, idx: Index) {
        let ea = self.displaced(bus, idx);
        let op = self.fetch(bus);
        self.charge(XYCB[op as usize]);

        let b = (op >> 3) & 7;
        let v = bus.read(ea);

        let result = match op >> 6 {
            0 => self.rot_shift(b, v),
            1 => {
                self.bit(b, v, (ea >> 8) as u8);
                return;
            }
            2 => v & !(1 << b),
            _ => v | (1 << b),
        };

        bus.write(ea, result);
        // Copia no documentada al registro codificado en los bits bajos.
        if op & 7 != 6 {
            self.set_reg8(op & 7, result);
        }
    }
}
