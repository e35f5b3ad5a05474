use clap::ValueEnum;
use genie_core::{Bus, BusError, Cpu, InterruptLine, MemoryBus, Rom, RomError, Space};
use genie_sched::Machine;
use geniez80::Z80;
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;

// ============================================================================
//  MODELS
// ============================================================================

pub const RAM_START: u16 = 0x4000;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Model {
    /// TRS-80 Model I
    Trs80,
    /// EACA Colour Genie EG2000
    Cgenie,
}

impl Model {
    pub fn name(self) -> &'static str {
        match self {
            Model::Trs80 => "TRS-80 Model I",
            Model::Cgenie => "Colour Genie",
        }
    }

    pub fn clock_hz(self) -> u32 {
        match self {
            Model::Trs80 => 1_774_080,
            Model::Cgenie => 2_216_800,
        }
    }

    /// Frecuencia del vertical blank.
    pub fn vblank_hz(self) -> u32 {
        match self {
            Model::Trs80 => 40,
            Model::Cgenie => 50,
        }
    }

    pub fn rom_size(self) -> usize {
        match self {
            Model::Trs80 => 12 * 1024,
            Model::Cgenie => 16 * 1024,
        }
    }
}

#[derive(Error, Debug)]
pub enum SetupError {
    #[error("ROM: {0}")]
    Rom(#[from] RomError),
    #[error("bus: {0}")]
    Bus(#[from] BusError),
}

// ============================================================================
//  MEMORY MAP
// ============================================================================

/// ROM desde 0x0000, bus abierto hasta 0x3FFF, RAM de 0x4000 al final.
/// Los periféricos no se emulan: todo el espacio de IO queda abierto.
pub fn build_bus(model: Model, mut rom: Rom) -> Result<(Bus, Rc<RefCell<Vec<u8>>>), SetupError> {
    if rom.data.len() > model.rom_size() {
        log::warn!("ROM image is {} bytes, truncating to {}", rom.data.len(), model.rom_size());
        rom.data.truncate(model.rom_size());
    }
    let rom = Rc::new(rom.fit(model.rom_size())?.data);
    let ram = Rc::new(RefCell::new(vec![0u8; 0x10000 - RAM_START as usize]));
    let rom_end = (model.rom_size() - 1) as u16;

    let mut builder = Bus::builder().map(
        Space::Memory,
        0x0000..=rom_end,
        {
            let rom = Rc::clone(&rom);
            move |addr| rom[addr as usize]
        },
        |_, _| {},
    );
    if rom_end < RAM_START - 1 {
        builder = builder.unmapped(Space::Memory, rom_end + 1..=RAM_START - 1);
    }

    let read_ram = Rc::clone(&ram);
    let write_ram = Rc::clone(&ram);
    let bus = builder
        .map(
            Space::Memory,
            RAM_START..=0xFFFF,
            move |addr| read_ram.borrow()[(addr - RAM_START) as usize],
            move |addr, val| write_ram.borrow_mut()[(addr - RAM_START) as usize] = val,
        )
        .unmapped(Space::Io, 0x0000..=0xFFFF)
        .build()?;

    Ok((bus, ram))
}

// ============================================================================
//  MACHINE
// ============================================================================

pub struct GenieMachine {
    pub model: Model,
    pub cpu: Z80,
    pub bus: Bus,
    pub ram: Rc<RefCell<Vec<u8>>>,
    pub cycles: u64,
    pub vblanks: u64,
}

impl GenieMachine {
    pub fn new(model: Model, rom: Rom) -> Result<Self, SetupError> {
        let (bus, ram) = build_bus(model, rom)?;
        let cpu = Z80::new();
        Ok(Self { model, cpu, bus, ram, cycles: 0, vblanks: 0 })
    }

    pub fn vblank(&mut self) {
        self.vblanks += 1;
        self.cpu.interrupt(InterruptLine::Irq);
    }

    pub fn peek(&self, addr: u16) -> u8 {
        self.bus.read(addr)
    }
}

impl Machine for GenieMachine {
    fn execute(&mut self, cycles: u32) -> u32 {
        let done = self.cpu.execute(&mut self.bus, cycles);
        self.cycles += done as u64;
        done
    }
}

/// Hook de debug: sin tabla de mnemónicos, cada byte se muestra como dato.
pub fn hexdump(_pc: u16, bytes: &[u8]) -> (String, usize) {
    match bytes.first() {
        Some(b) => (format!("db ${:02X}", b), 1),
        None => (String::from("db ?"), 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genie_sched::{Scheduler, Time};

    fn machine(model: Model, code: &[u8]) -> GenieMachine {
        let rom = Rom::from_bytes(code.to_vec()).expect("rom");
        GenieMachine::new(model, rom).expect("machine")
    }

    #[test]
    fn memory_map_per_model() {
        let mut m = machine(Model::Trs80, &[0x3E, 0x42]);
        assert_eq!(m.peek(0x0000), 0x3E);
        assert_eq!(m.peek(0x0002), 0xFF); // ROM rellenada
        assert_eq!(m.peek(0x3000), 0xFF); // bus abierto
        m.bus.write(0x0000, 0x00);
        assert_eq!(m.peek(0x0000), 0x3E);
        m.bus.write(0x4000, 0x12);
        assert_eq!(m.ram.borrow()[0], 0x12);
        assert_eq!(m.bus.port_in(0x00FF), 0xFF);

        let m = machine(Model::Cgenie, &[0x00]);
        assert_eq!(m.model.name(), "Colour Genie");
        assert_eq!(m.peek(0x3FFF), 0xFF);
    }

    #[test]
    fn vblank_timer_interrupts_the_cpu() {
        // IM 1 ; EI ; LD SP,0 ; JR $  con un contador en la rutina de 38h.
        let mut code = vec![0xED, 0x56, 0xFB, 0x31, 0x00, 0x00, 0x18, 0xFE];
        code.resize(0x38, 0x00);
        // 38h: LD HL,(4000h) ; INC HL ; LD (4000h),HL ; EI ; RETI
        code.extend_from_slice(&[0x2A, 0x00, 0x40, 0x23, 0x22, 0x00, 0x40, 0xFB, 0xED, 0x4D]);

        let model = Model::Cgenie;
        let mut m = machine(model, &code);
        let mut sched = Scheduler::new(model.clock_hz());
        m.cpu.attach_counters(sched.counters());
        sched.pulse(Time::from_hz(model.vblank_hz()), 0, |_, m: &mut GenieMachine, _| m.vblank());

        while sched.now() < Time::from_millis(200) {
            sched.drive(&mut m, model.clock_hz());
        }
        assert_eq!(m.vblanks, 10);
        // La décima interrupción queda pendiente para el próximo slice.
        let ticks = m.peek(0x4000) as u16 | (m.peek(0x4001) as u16) << 8;
        assert_eq!(ticks, 9);
        assert_eq!(m.cpu.reg(geniez80::Reg::Sp), 0x0000);
    }

    #[test]
    fn oversized_rom_is_truncated() {
        let m = machine(Model::Trs80, &vec![0xAA; 0x4000]);
        assert_eq!(m.peek(0x2FFF), 0xAA);
        assert_eq!(m.peek(0x3000), 0xFF);
    }

    #[test]
    fn hexdump_shows_first_byte() {
        assert_eq!(hexdump(0, &[0xC3, 0x00]), (String::from("db $C3"), 1));
    }
}
