// crates/geniez80/src/exec_ed.rs
//! Página ED: bloques, ADC/SBC de 16 bits, IO por (C), I/R, RETN/RETI, IM.
//! Los opcodes sin asignar sólo consumen su costo.

use crate::cycles::EXTRA;
use crate::flags::{C, V, Z};
use crate::regs::Iff;
use crate::tables::{SZ, SZP};
use crate::Z80;
use genie_core::MemoryBus;

impl Z80 {
    pub(crate) fn exec_ed(&mut self, bus: &mut dyn MemoryBus, op: u8) {
        match op {
            0x40..=0x7F => self.exec_ed_misc(bus, op),
            0xA0..=0xA3 | 0xA8..=0xAB | 0xB0..=0xB3 | 0xB8..=0xBB => self.exec_block(bus, op),
            _ => self.undefined_ed(op),
        }
    }

    fn exec_ed_misc(&mut self, bus: &mut dyn MemoryBus, op: u8) {
        let y = (op >> 3) & 7;
        let p = (op >> 4) & 3;

        match op & 7 {
            0 => { // IN r,(C); con r = 6 sólo afecta los flags
                let port = self.bc.word();
                let v = bus.port_in(port);
                self.wz.set_word(port.wrapping_add(1));
                self.set_f((self.f() & C) | SZP[v as usize]);
                if y != 6 {
                    self.set_reg8(y, v);
                }
            }
            1 => { // OUT (C),r; con r = 6 saca 0
                let port = self.bc.word();
                let v = if y == 6 { 0 } else { self.reg8(y) };
                bus.port_out(port, v);
                self.wz.set_word(port.wrapping_add(1));
            }
            2 => {
                let v = self.rp(p);
                if op & 0x08 != 0 { self.adc16(v) } else { self.sbc16(v) }
            }
            3 => {
                let addr = self.fetch_u16(bus);
                if op & 0x08 != 0 {
                    let v = bus.read_u16_le(addr);
                    self.set_rp(p, v);
                } else {
                    bus.write_u16_le(addr, self.rp(p));
                }
                self.wz.set_word(addr.wrapping_add(1));
            }
            4 => self.neg(),
            5 => { // RETN / RETI
                self.ret(bus);
                let iff2 = self.iff.contains(Iff::IFF2);
                self.iff.set(Iff::IFF1, iff2);
            }
            6 => {
                self.im = match y & 3 {
                    0 | 1 => 0,
                    2 => 1,
                    _ => 2,
                };
            }
            _ => match op {
                0x47 => self.i = self.a(),
                0x4F => self.set_r(self.a()),
                0x57 => {
                    let a = self.i;
                    self.set_a(a);
                    self.ld_a_ir_flags(a);
                }
                0x5F => {
                    let a = self.r();
                    self.set_a(a);
                    self.ld_a_ir_flags(a);
                }
                0x67 => self.rrd(bus),
                0x6F => self.rld(bus),
                _ => self.undefined_ed(op),
            },
        }
    }

    fn ld_a_ir_flags(&mut self, a: u8) {
        let iff2 = if self.iff.contains(Iff::IFF2) { V } else { 0 };
        self.set_f((self.f() & C) | SZ[a as usize] | iff2);
    }

    /// LDI/CPI/INI/OUTI y sus variantes decrementales y repetitivas.
    fn exec_block(&mut self, bus: &mut dyn MemoryBus, op: u8) {
        let step: i8 = if op & 0x08 == 0 { 1 } else { -1 };
        let repeat = op & 0x10 != 0;

        let again = match op & 3 {
            0 => {
                self.ldi(bus, step);
                self.bc.word() != 0
            }
            1 => {
                self.cpi(bus, step);
                self.bc.word() != 0 && self.f() & Z == 0
            }
            2 => {
                self.ini(bus, step);
                self.bc.hi() != 0
            }
            _ => {
                self.outi(bus, step);
                self.bc.hi() != 0
            }
        };

        if repeat && again {
            let pc = self.pc.word().wrapping_sub(2);
            self.pc.set_word(pc);
            if op & 3 < 2 {
                self.wz.set_word(pc.wrapping_add(1));
            }
            self.charge(EXTRA[op as usize]);
        }
    }

    fn undefined_ed(&mut self, op: u8) {
        let (word, bit) = ((op >> 6) as usize, op & 0x3F);
        if self.ed_warned[word] & (1 << bit) == 0 {
            self.ed_warned[word] |= 1 << bit;
            log::warn!(
                "opcode ED {:02X} sin definir en {:04X}: se ignora",
                op,
                self.pc.word().wrapping_sub(2)
            );
        }
    }
}
