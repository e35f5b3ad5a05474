// crates/geniez80/src/interrupt.rs
//! Controlador de interrupciones: NMI y la línea enmascarable en IM 0/1/2.

use crate::cycles::BASE;
use crate::regs::{Iff, Pending};
use crate::{Z80, IRQ_VECTOR, NMI_VECTOR};
use genie_core::MemoryBus;

impl Z80 {
    /// Atiende la petición pendiente de mayor prioridad, si corresponde.
    /// `ei_block` es verdadero en el fetch que sigue inmediatamente a EI.
    pub(crate) fn take_interrupt(&mut self, bus: &mut dyn MemoryBus, ei_block: bool) -> bool {
        if self.pending.contains(Pending::NMI) {
            self.pending.remove(Pending::NMI);
            self.nmi(bus);
            return true;
        }
        if self.pending.contains(Pending::IRQ) && self.iff.contains(Iff::IFF1) && !ei_block {
            self.pending.remove(Pending::IRQ);
            self.irq(bus);
            return true;
        }
        false
    }

    /// Si la CPU está en HALT, el PC apunta al opcode HALT: lo saltamos.
    fn leave_halt(&mut self) {
        if self.halted {
            self.halted = false;
            self.pc.inc();
        }
    }

    fn nmi(&mut self, bus: &mut dyn MemoryBus) {
        self.leave_halt();
        self.refresh();
        self.iff.remove(Iff::IFF1);
        self.push(bus, self.pc.word());
        self.pc.set_word(NMI_VECTOR);
        self.wz = self.pc;
        self.charge(11);
        log::debug!("NMI -> {:04X}", NMI_VECTOR);
    }

    fn irq(&mut self, bus: &mut dyn MemoryBus) {
        self.leave_halt();
        self.refresh();
        self.iff = Iff::empty();
        let data = self.irq_data;

        match self.im {
            2 => {
                self.push(bus, self.pc.word());
                let vector = ((self.i as u16) << 8) | data as u16;
                self.pc.set_word(bus.read_u16_le(vector));
                self.charge(19);
            }
            0 if data & 0xC7 != 0xC7 => {
                // Instrucción inyectada por el periférico: se ejecuta tal cual.
                self.charge(2 + BASE[data as usize]);
                self.exec_base(bus, data);
            }
            0 => {
                self.push(bus, self.pc.word());
                self.pc.set_word((data & 0x38) as u16);
                self.charge(13);
            }
            _ => {
                self.push(bus, self.pc.word());
                self.pc.set_word(IRQ_VECTOR);
                self.charge(13);
            }
        }
        self.wz = self.pc;
        log::debug!("IRQ (IM {}) -> {:04X}", self.im, self.pc.word());
    }
}
