use genie_core::{Cpu, MemoryBus};
use geniez80::{Reg, Z80};
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

#[derive(Deserialize, Debug)]
struct TestState {
    pc: u16,
    sp: u16,
    a: u8,
    b: u8,
    c: u8,
    d: u8,
    e: u8,
    f: u8,
    h: u8,
    l: u8,
    i: u8,
    r: u8,
    ix: u16,
    iy: u16,
    wz: u16,
    #[serde(rename = "af_")]
    af_prime: u16,
    #[serde(rename = "bc_")]
    bc_prime: u16,
    #[serde(rename = "de_")]
    de_prime: u16,
    #[serde(rename = "hl_")]
    hl_prime: u16,
    #[serde(default)]
    im: u8,
    #[serde(default)]
    iff1: u8,
    #[serde(default)]
    iff2: u8,
    ram: Vec<(u16, u8)>,
}

impl TestState {
    fn registers(&self) -> Vec<(Reg, u16)> {
        let pair = |hi: u8, lo: u8| ((hi as u16) << 8) | lo as u16;
        vec![
            (Reg::Pc, self.pc),
            (Reg::Sp, self.sp),
            (Reg::Af, pair(self.a, self.f)),
            (Reg::Bc, pair(self.b, self.c)),
            (Reg::De, pair(self.d, self.e)),
            (Reg::Hl, pair(self.h, self.l)),
            (Reg::Ix, self.ix),
            (Reg::Iy, self.iy),
            (Reg::Af2, self.af_prime),
            (Reg::Bc2, self.bc_prime),
            (Reg::De2, self.de_prime),
            (Reg::Hl2, self.hl_prime),
            (Reg::Wz, self.wz),
            (Reg::I, self.i as u16),
            (Reg::R, self.r as u16),
            (Reg::Im, self.im as u16),
            (Reg::Iff1, self.iff1 as u16),
            (Reg::Iff2, self.iff2 as u16),
        ]
    }
}

#[derive(Deserialize, Debug)]
struct TestCase {
    name: String,
    initial: TestState,
    #[serde(rename = "final")]
    final_state: TestState,
    cycles: Vec<serde_json::Value>, // un elemento por T-state
}

struct TestBus {
    memory: Vec<u8>,
}

impl TestBus {
    fn new(ram: &[(u16, u8)]) -> Self {
        let mut bus = Self { memory: vec![0; 0x10000] };
        for &(addr, val) in ram {
            bus.memory[addr as usize] = val;
        }
        bus
    }
}

impl MemoryBus for TestBus {
    fn read(&self, addr: u16) -> u8 {
        self.memory[addr as usize]
    }

    fn write(&mut self, addr: u16, value: u8) {
        self.memory[addr as usize] = value;
    }

    // Las suites devuelven el byte alto del puerto en lecturas de IO.
    fn port_in(&mut self, port: u16) -> u8 {
        (port >> 8) as u8
    }
}

const TESTS_DIR: &str = "../../tests/z80_json_tests";

#[test]
#[ignore] // Requiere las suites single-step en disco
fn run_z80_json_tests() {
    let path = Path::new(TESTS_DIR);
    if !path.exists() {
        println!("Test directory not found: {:?}", path);
        return;
    }

    let mut total_tests = 0;
    let mut failures = Vec::new();

    for entry in std::fs::read_dir(path).expect("Read dir failed") {
        let path = entry.expect("Entry failed").path();
        if path.extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        let file = File::open(&path).expect("File open failed");
        let tests: Vec<TestCase> =
            serde_json::from_reader(BufReader::new(file)).expect("JSON parse failed");

        for test in tests {
            total_tests += 1;
            if let Err(msg) = run_single_test(&test) {
                failures.push(format!("{}: {}", test.name, msg));
            }
        }
    }

    println!("Passed {} / {} tests", total_tests - failures.len(), total_tests);
    assert!(failures.is_empty(), "{}", failures.join("\n"));
}

fn run_single_test(test: &TestCase) -> Result<(), String> {
    let mut bus = TestBus::new(&test.initial.ram);
    let mut cpu = Z80::new();
    for (reg, value) in test.initial.registers() {
        cpu.set_reg(reg, value);
    }

    let cycles = cpu.step(&mut bus);

    let mut errors = Vec::new();
    for (reg, expected) in test.final_state.registers() {
        let got = cpu.reg(reg);
        if got != expected {
            errors.push(format!("{} {:04X} != {:04X}", reg.name(), got, expected));
        }
    }
    if cycles as usize != test.cycles.len() {
        errors.push(format!("cycles {} != {}", cycles, test.cycles.len()));
    }
    for &(addr, val) in &test.final_state.ram {
        let got = bus.memory[addr as usize];
        if got != val {
            errors.push(format!("RAM {:04X}: {:02X} != {:02X}", addr, got, val));
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors.join(", ")) }
}
