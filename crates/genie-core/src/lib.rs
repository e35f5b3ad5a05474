use std::cell::Cell;
use std::fs;
use std::path::Path;
use thiserror::Error;

pub mod bus;

pub use bus::{Access, Bus, BusBuilder, BusError, ReadHandler, Space, WriteHandler};

// ============================================================================
//  CONTRACTS (TRAITS)
// ============================================================================

/// Líneas de interrupción que un periférico puede levantar sobre la CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterruptLine {
    /// Non-maskable: siempre se atiende en el siguiente fetch.
    Nmi,
    /// Maskable: sólo se atiende con IFF1 activo.
    Irq,
}

/// Representa cualquier dispositivo capaz de ejecutar instrucciones (CPU)
pub trait Cpu {
    /// Reinicio en frío (Power On)
    fn reset(&mut self);

    /// Ejecuta una instrucción (o un acknowledge de interrupción).
    /// Retorna la cantidad de ciclos consumidos.
    fn step(&mut self, bus: &mut dyn MemoryBus) -> u32;

    /// Ejecuta instrucciones hasta alcanzar `budget` ciclos.
    /// Puede pasarse por, como mucho, una instrucción.
    fn execute(&mut self, bus: &mut dyn MemoryBus, budget: u32) -> u32 {
        let mut done = 0;
        while done < budget {
            done += self.step(bus);
        }
        done
    }

    /// Latchea una petición de interrupción; se consume en el próximo fetch.
    fn interrupt(&mut self, line: InterruptLine);

    /// Baja una petición latcheada que todavía no fue atendida.
    fn clear_interrupt(&mut self, line: InterruptLine);

    /// Debugging: Obtener el Program Counter actual
    fn pc(&self) -> u16;
}

/// Contrato UNIFICADO para el Bus (Memoria + I/O), direcciones de 16 bits.
pub trait MemoryBus {
    // --- Métodos Obligatorios (Memoria) ---
    fn read(&self, addr: u16) -> u8;
    fn write(&mut self, addr: u16, val: u8);

    // --- Métodos de I/O (Puertos) ---
    // Bus flotante devuelve FF
    fn port_in(&mut self, _port: u16) -> u8 {
        0xFF
    }
    fn port_out(&mut self, _port: u16, _val: u8) {}

    // --- Helpers Automáticos (Default Impls) ---

    // Lectura 16-bit Little Endian (Zilog Z80)
    fn read_u16_le(&self, addr: u16) -> u16 {
        let lo = self.read(addr) as u16;
        let hi = self.read(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    // Escritura 16-bit Little Endian
    fn write_u16_le(&mut self, addr: u16, val: u16) {
        self.write(addr, (val & 0xFF) as u8);
        self.write(addr.wrapping_add(1), (val >> 8) as u8);
    }
}

// ============================================================================
//  CYCLE COUNTERS (compartidos entre scheduler, CPU y periféricos)
// ============================================================================

/// Contadores del timeslice en curso.
///
/// `executed` lo publica la CPU después de cada instrucción. `stolen` es
/// aditivo: los periféricos reservan ciclos de DMA entre slices y el
/// scheduler los consume al comenzar el siguiente.
#[derive(Debug, Default)]
pub struct CycleCounters {
    executed: Cell<u32>,
    stolen: Cell<u32>,
}

impl CycleCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ciclos ejecutados en el slice actual.
    pub fn executed(&self) -> u32 {
        self.executed.get()
    }

    pub fn set_executed(&self, cycles: u32) {
        self.executed.set(cycles);
    }

    /// Reserva `cycles` del próximo slice (DMA cycle stealing).
    pub fn steal(&self, cycles: u32) {
        self.stolen.set(self.stolen.get().saturating_add(cycles));
    }

    /// Ciclos robados pendientes, sin consumirlos.
    pub fn stolen(&self) -> u32 {
        self.stolen.get()
    }

    /// Consume (y pone a cero) los ciclos robados.
    pub fn take_stolen(&self) -> u32 {
        self.stolen.replace(0)
    }
}

// ============================================================================
//  ROM LOADER (UTILIDAD)
// ============================================================================

#[derive(Error, Debug)]
pub enum RomError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("ROM file is too small or empty")]
    Empty,
    #[error("ROM image is {len} bytes, the map only holds {max}")]
    TooLarge { len: usize, max: usize },
}

#[derive(Debug)]
pub struct Rom {
    pub data: Vec<u8>,
}

impl Rom {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, RomError> {
        let data = fs::read(path)?;
        Self::from_bytes(data)
    }

    pub fn from_bytes(data: Vec<u8>) -> Result<Self, RomError> {
        if data.is_empty() {
            return Err(RomError::Empty);
        }
        Ok(Self { data })
    }

    /// Ajusta la imagen al tamaño de la ventana de ROM, rellenando con 0xFF
    /// (bus abierto). Imágenes más grandes que la ventana son un error.
    pub fn fit(mut self, size: usize) -> Result<Self, RomError> {
        if self.data.len() > size {
            return Err(RomError::TooLarge { len: self.data.len(), max: size });
        }
        if self.data.len() < size {
            log::debug!("padding ROM image from {} to {} bytes", self.data.len(), size);
            self.data.resize(size, 0xFF);
        }
        Ok(self)
    }

    /// Crea una ROM vacía de tamaño fijo (útil para tests)
    pub fn new_empty(size: usize) -> Self {
        Self {
            data: vec![0; size],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stolen_cycles_accumulate_until_taken() {
        let counters = CycleCounters::new();
        counters.steal(10);
        counters.steal(5);
        assert_eq!(counters.stolen(), 15);
        assert_eq!(counters.take_stolen(), 15);
        assert_eq!(counters.take_stolen(), 0);
    }

    #[test]
    fn rom_fit_pads_and_rejects() {
        let rom = Rom::from_bytes(vec![1, 2, 3]).unwrap().fit(8).unwrap();
        assert_eq!(rom.data, vec![1, 2, 3, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);

        let err = Rom::from_bytes(vec![0; 16]).unwrap().fit(8).unwrap_err();
        assert!(matches!(err, RomError::TooLarge { len: 16, max: 8 }));
        assert!(matches!(Rom::from_bytes(Vec::new()), Err(RomError::Empty)));
    }
}
