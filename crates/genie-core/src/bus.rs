// crates/genie-core/src/bus.rs
//! Despacho del bus por ventanas de 1 KiB.
//!
//! Cada espacio de direcciones (memoria e IO) se divide en 64 ventanas
//! seleccionadas por `address >> 10`. Cada ventana tiene exactamente un
//! handler de lectura y uno de escritura; el handler recibe la dirección
//! completa de 16 bits.

use crate::MemoryBus;
use std::fmt;
use std::ops::RangeInclusive;
use std::rc::Rc;
use thiserror::Error;

pub const WINDOW_SHIFT: u32 = 10;
pub const WINDOW_SIZE: u32 = 1 << WINDOW_SHIFT;
pub const WINDOW_COUNT: usize = 64;

pub type ReadHandler = Rc<dyn Fn(u16) -> u8>;
pub type WriteHandler = Rc<dyn Fn(u16, u8)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Space {
    Memory,
    Io,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

impl fmt::Display for Space {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Space::Memory => f.write_str("memory"),
            Space::Io => f.write_str("io"),
        }
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Access::Read => f.write_str("read"),
            Access::Write => f.write_str("write"),
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum BusError {
    #[error("{space} window {window} (${:04X}) has no {access} handler", window_base(.window))]
    Unbound { space: Space, window: usize, access: Access },
    #[error("range ${start:04X}-${end:04X} is not aligned to 1 KiB windows")]
    Misaligned { start: u16, end: u16 },
}

fn window_base(window: &usize) -> u32 {
    (*window as u32) << WINDOW_SHIFT
}

#[inline(always)]
pub fn window_of(addr: u16) -> usize {
    (addr >> WINDOW_SHIFT) as usize
}

struct Slots {
    read: [Option<ReadHandler>; WINDOW_COUNT],
    write: [Option<WriteHandler>; WINDOW_COUNT],
}

impl Slots {
    fn new() -> Self {
        Self {
            read: std::array::from_fn(|_| None),
            write: std::array::from_fn(|_| None),
        }
    }
}

/// Construye la tabla de ventanas. `build()` falla si queda alguna ventana
/// sin handler, así el error aparece al arrancar y no en el primer acceso.
pub struct BusBuilder {
    mem: Slots,
    io: Slots,
    error: Option<BusError>,
}

impl Default for BusBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BusBuilder {
    pub fn new() -> Self {
        Self { mem: Slots::new(), io: Slots::new(), error: None }
    }

    fn slots(&mut self, space: Space) -> &mut Slots {
        match space {
            Space::Memory => &mut self.mem,
            Space::Io => &mut self.io,
        }
    }

    fn windows(&mut self, range: &RangeInclusive<u16>) -> Option<RangeInclusive<usize>> {
        let (start, end) = (*range.start(), *range.end());
        let aligned = (start as u32) % WINDOW_SIZE == 0
            && (end as u32 + 1) % WINDOW_SIZE == 0
            && start <= end;
        if !aligned {
            self.error.get_or_insert(BusError::Misaligned { start, end });
            return None;
        }
        Some(window_of(start)..=window_of(end))
    }

    /// Asocia un handler de lectura a todas las ventanas de `range`.
    pub fn map_read(
        mut self,
        space: Space,
        range: RangeInclusive<u16>,
        read: impl Fn(u16) -> u8 + 'static,
    ) -> Self {
        if let Some(windows) = self.windows(&range) {
            let read: ReadHandler = Rc::new(read);
            let slots = self.slots(space);
            for w in windows {
                slots.read[w] = Some(Rc::clone(&read));
            }
        }
        self
    }

    /// Asocia un handler de escritura a todas las ventanas de `range`.
    pub fn map_write(
        mut self,
        space: Space,
        range: RangeInclusive<u16>,
        write: impl Fn(u16, u8) + 'static,
    ) -> Self {
        if let Some(windows) = self.windows(&range) {
            let write: WriteHandler = Rc::new(write);
            let slots = self.slots(space);
            for w in windows {
                slots.write[w] = Some(Rc::clone(&write));
            }
        }
        self
    }

    pub fn map(
        self,
        space: Space,
        range: RangeInclusive<u16>,
        read: impl Fn(u16) -> u8 + 'static,
        write: impl Fn(u16, u8) + 'static,
    ) -> Self {
        self.map_read(space, range.clone(), read)
            .map_write(space, range, write)
    }

    /// Bus abierto: lee 0xFF y descarta escrituras.
    pub fn unmapped(self, space: Space, range: RangeInclusive<u16>) -> Self {
        self.map(space, range, |_| 0xFF, |_, _| {})
    }

    pub fn build(self) -> Result<Bus, BusError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let mem = bind(Space::Memory, self.mem)?;
        let io = bind(Space::Io, self.io)?;
        Ok(Bus { mem, io })
    }
}

fn bind(space: Space, slots: Slots) -> Result<Vec<Window>, BusError> {
    slots
        .read
        .into_iter()
        .zip(slots.write)
        .enumerate()
        .map(|(window, pair)| match pair {
            (Some(read), Some(write)) => Ok(Window { read, write }),
            (None, _) => Err(BusError::Unbound { space, window, access: Access::Read }),
            (_, None) => Err(BusError::Unbound { space, window, access: Access::Write }),
        })
        .collect()
}

struct Window {
    read: ReadHandler,
    write: WriteHandler,
}

/// Tabla de ventanas ya validada: todas las entradas tienen ambos handlers.
pub struct Bus {
    mem: Vec<Window>,
    io: Vec<Window>,
}

impl Bus {
    pub fn builder() -> BusBuilder {
        BusBuilder::new()
    }
}

impl MemoryBus for Bus {
    #[inline]
    fn read(&self, addr: u16) -> u8 {
        (self.mem[window_of(addr)].read)(addr)
    }

    #[inline]
    fn write(&mut self, addr: u16, val: u8) {
        (self.mem[window_of(addr)].write)(addr, val)
    }

    #[inline]
    fn port_in(&mut self, port: u16) -> u8 {
        (self.io[window_of(port)].read)(port)
    }

    #[inline]
    fn port_out(&mut self, port: u16, val: u8) {
        (self.io[window_of(port)].write)(port, val)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn ram_bus(ram: &Rc<RefCell<Vec<u8>>>) -> BusBuilder {
        let (r, w) = (Rc::clone(ram), Rc::clone(ram));
        Bus::builder()
            .map(
                Space::Memory,
                0x0000..=0xFFFF,
                move |a| r.borrow()[a as usize],
                move |a, v| w.borrow_mut()[a as usize] = v,
            )
            .unmapped(Space::Io, 0x0000..=0xFFFF)
    }

    #[test]
    fn routes_by_window_with_full_address() {
        let ram = Rc::new(RefCell::new(vec![0u8; 0x10000]));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        let mut bus = ram_bus(&ram)
            .map(Space::Io, 0x0400..=0x07FF, |p| (p & 0xFF) as u8, move |p, v| log.borrow_mut().push((p, v)))
            .build()
            .unwrap();

        bus.write(0x1234, 0xAB);
        assert_eq!(bus.read(0x1234), 0xAB);
        assert_eq!(ram.borrow()[0x1234], 0xAB);

        assert_eq!(bus.port_in(0x0455), 0x55);
        assert_eq!(bus.port_in(0x0855), 0xFF);
        bus.port_out(0x07FE, 9);
        bus.port_out(0x0800, 1);
        assert_eq!(*seen.borrow(), vec![(0x07FE, 9)]);
    }

    #[test]
    fn unbound_window_fails_at_build() {
        let err = Bus::builder()
            .unmapped(Space::Memory, 0x0000..=0xFBFF)
            .unmapped(Space::Io, 0x0000..=0xFFFF)
            .build()
            .err();
        assert_eq!(err, Some(BusError::Unbound { space: Space::Memory, window: 63, access: Access::Read }));

        let err = Bus::builder()
            .unmapped(Space::Memory, 0x0000..=0xFFFF)
            .map_read(Space::Io, 0x0000..=0xFFFF, |_| 0)
            .build()
            .err();
        assert_eq!(err, Some(BusError::Unbound { space: Space::Io, window: 0, access: Access::Write }));
    }

    #[test]
    fn misaligned_range_is_rejected() {
        let err = Bus::builder()
            .unmapped(Space::Memory, 0x0000..=0xFFFF)
            .unmapped(Space::Io, 0x0000..=0xFFFF)
            .unmapped(Space::Memory, 0x0100..=0x03FF)
            .build()
            .err();
        assert_eq!(err, Some(BusError::Misaligned { start: 0x0100, end: 0x03FF }));
    }

    #[test]
    fn little_endian_helpers_go_through_handlers() {
        let ram = Rc::new(RefCell::new(vec![0u8; 0x10000]));
        let mut bus = ram_bus(&ram).build().unwrap();
        bus.write_u16_le(0xFFFF, 0xBEEF);
        assert_eq!(ram.borrow()[0xFFFF], 0xEF);
        assert_eq!(ram.borrow()[0x0000], 0xBE);
        assert_eq!(bus.read_u16_le(0xFFFF), 0xBEEF);
    }
}
