use clap::Parser;
use genie_core::{Cpu, Rom};
use genie_sched::{Restart, Scheduler, Time};
use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Instant;

mod machine;

use machine::{hexdump, GenieMachine, Model};

// ============================================================================
//  CLI
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "genie_cg", about = "Headless TRS-80 / Colour Genie runner (Z80 + scheduler)")]
struct Args {
    /// Máquina a emular
    #[arg(long, value_enum, default_value_t = Model::Cgenie)]
    model: Model,

    /// Imagen de la ROM del sistema
    #[arg(long)]
    rom: PathBuf,

    /// Reloj de la CPU en Hz (por defecto el del modelo)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    clock: Option<u32>,

    /// Segundos de tiempo emulado
    #[arg(long, default_value_t = 1.0, value_parser = parse_seconds)]
    seconds: f64,

    /// Frecuencia del vertical blank en Hz (por defecto la del modelo)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    vblank: Option<u32>,

    /// Traza cada instrucción (requiere --log-level trace)
    #[arg(long)]
    trace: bool,

    /// error, warn, info, debug o trace
    #[arg(long, default_value = "info")]
    log_level: log::LevelFilter,
}

/// Duración finita y positiva, representable como `Time`.
fn parse_seconds(arg: &str) -> Result<f64, String> {
    let secs: f64 = arg.parse().map_err(|e| format!("{}", e))?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(format!("{} is not a positive number of seconds", arg));
    }
    if Time::from_secs_f64(secs).is_never() {
        return Err(format!("{} seconds is too long", arg));
    }
    Ok(secs)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let level = if args.trace { log::LevelFilter::Trace } else { args.log_level };
    env_logger::Builder::new().filter_level(level).init();

    let model = args.model;
    let clock_hz = args.clock.unwrap_or(model.clock_hz());
    let vblank_hz = args.vblank.unwrap_or(model.vblank_hz());
    log::info!("--- {} ---", model.name());
    log::info!("ROM: {}", args.rom.display());
    log::info!("clock {} Hz, vblank {} Hz, {:.3}s", clock_hz, vblank_hz, args.seconds);

    let rom = Rom::from_file(&args.rom)?;
    let mut machine = GenieMachine::new(model, rom)?;
    if args.trace {
        machine.cpu.set_disassembler(Box::new(hexdump));
    }

    let mut sched: Scheduler<GenieMachine> = Scheduler::new(clock_hz);
    machine.cpu.attach_counters(sched.counters());

    sched.pulse(Time::from_hz(vblank_hz), 0, |_, m, _| m.vblank());

    let done = Rc::new(Cell::new(false));
    let flag = Rc::clone(&done);
    sched.allocate(
        move |sched, m, _| {
            log::info!("end of run at {} (pc ${:04X})", sched.now(), m.cpu.pc());
            flag.set(true);
        },
        Time::from_secs_f64(args.seconds),
        0,
        Restart::Discard,
    );

    let started = Instant::now();
    let mut slices = 0u64;
    while !done.get() {
        sched.drive(&mut machine, clock_hz);
        slices += 1;
    }
    let wall = started.elapsed().as_secs_f64();

    let emulated = sched.now().as_secs_f64();
    log::info!(
        "{}: {} cycles in {} slices, {} vblanks, emulated {:.3}s in {:.3}s ({:.1}x)",
        machine.model.name(),
        machine.cycles,
        slices,
        machine.vblanks,
        emulated,
        wall,
        if wall > 0.0 { emulated / wall } else { 0.0 }
    );
    log::info!("{}", machine.cpu.dump(&machine.bus));
    Ok(())
}
