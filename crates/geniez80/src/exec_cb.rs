// crates/geniez80/src/exec_cb.rs
//! Página CB: rotaciones, desplazamientos, BIT, RES y SET.

use crate::Z80;
use genie_core::MemoryBus;

impl Z80 {
    pub(crate) fn exec_cb(&mut self, bus: &mut dyn MemoryBus, op: u8) {
        let r = op & 7;
        let b = (op >> 3) & 7;
        let addr = self.hl.word();
        let v = if r == 6 { bus.read(addr) } else { self.reg8(r) };

        let result = match op >> 6 {
            0 => self.rot_shift(b, v),
            1 => {
                // BIT n,(HL): X/Y salen de MEMPTR
                let xy = if r == 6 { self.wz.hi() } else { v };
                self.bit(b, v, xy);
                return;
            }
            2 => v & !(1 << b),
            _ => v | (1 << b),
        };

        if r == 6 {
            bus.write(addr, result);
        } else {
            self.set_reg8(r, result);
        }
    }
}
