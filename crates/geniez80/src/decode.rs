// crates/geniez80/src/decode.rs
//! Máquina de estados del decodificador.
//!
//! Cada instrucción arranca en `Fetch` y termina al ejecutar un opcode de
//! alguna de las cinco tablas. Los prefijos sólo cambian de estado, así que
//! DD/FD pueden encadenarse y componerse con ED o CB.

use crate::cycles::{BASE, CB, ED, XY};
use crate::regs::Index;
use crate::Z80;
use genie_core::MemoryBus;

/// Estado del decodificador entre dos bytes de opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Decode {
    /// Punto de entrada: atiende interrupciones o lee el primer byte.
    Fetch,
    /// Tabla sin prefijo, con el opcode ya leído.
    Base(u8),
    /// Después de CB.
    Bit,
    /// Después de ED.
    Ext,
    /// Después de DD (IX) o FD (IY).
    Index(Index),
    /// Después de DD CB / FD CB.
    IndexBit(Index),
}

impl Z80 {
    /// Ejecuta una instrucción completa (con todos sus prefijos) o un
    /// acknowledge de interrupción.
    pub(crate) fn instruction(&mut self, bus: &mut dyn MemoryBus) {
        let mut state = Decode::Fetch;
        loop {
            state = match state {
                Decode::Fetch => {
                    let ei_block = std::mem::take(&mut self.after_ei);
                    if self.take_interrupt(bus, ei_block) {
                        return;
                    }
                    if log::log_enabled!(log::Level::Trace) {
                        log::trace!("{}", self.dump(bus));
                    }
                    Decode::Base(self.fetch_op(bus))
                }

                Decode::Base(op) => match op {
                    0xCB => Decode::Bit,
                    0xED => Decode::Ext,
                    0xDD | 0xFD => Decode::Index(Index::from_prefix(op)),
                    _ => {
                        self.charge(BASE[op as usize]);
                        self.exec_base(bus, op);
                        return;
                    }
                },

                Decode::Bit => {
                    let op = self.fetch_op(bus);
                    self.charge(CB[op as usize]);
                    self.exec_cb(bus, op);
                    return;
                }

                Decode::Ext => {
                    let op = self.fetch_op(bus);
                    self.charge(ED[op as usize]);
                    self.exec_ed(bus, op);
                    return;
                }

                Decode::Index(idx) => {
                    let op = self.fetch_op(bus);
                    // XY ya incluye el prefijo; para CB el costo lo pone XYCB.
                    self.charge(XY[op as usize]);
                    match op {
                        0xCB => Decode::IndexBit(idx),
                        0xED => Decode::Ext,
                        0xDD | 0xFD => Decode::Index(Index::from_prefix(op)),
                        _ => {
                            if !self.exec_index(bus, idx, op) {
                                self.exec_base(bus, op);
                            }
                            return;
                        }
                    }
                }

                Decode::IndexBit(idx) => {
                    self.exec_index_cb(bus, idx);
                    return;
                }
            };
        }
    }
}
