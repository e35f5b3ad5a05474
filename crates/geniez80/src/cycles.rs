// crates/geniez80/src/cycles.rs
//! Costos en T-states por opcode.
//!
//! `BASE`, `CB`, `ED`, `XY` y `XYCB` dan el costo fijo de cada tabla, ya con
//! el prefijo incluido. `EXTRA` se suma sólo cuando un salto condicional,
//! CALL/RET condicional, DJNZ o una instrucción de bloque repetitiva
//! efectivamente toma la rama.

pub static BASE: [u8; 256] = BASE_TABLE;

#[rustfmt::skip]
pub static EXTRA: [u8; 256] = [
//  0   1   2   3   4   5   6   7   8   9   A   B   C   D   E   F
    0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0, // 0
    5,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0, // 1  DJNZ
    5,  0,  0,  0,  0,  0,  0,  0,  5,  0,  0,  0,  0,  0,  0,  0, // 2  JR NZ/Z
    5,  0,  0,  0,  0,  0,  0,  0,  5,  0,  0,  0,  0,  0,  0,  0, // 3  JR NC/C
    0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0, // 4
    0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0, // 5
    0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0, // 6
    0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0, // 7
    0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0, // 8
    0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0, // 9
    0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0, // A
    5,  5,  5,  5,  0,  0,  0,  0,  5,  5,  5,  5,  0,  0,  0,  0, // B  (ED) LDIR..OTDR
    6,  0,  0,  0,  7,  0,  0,  0,  6,  0,  0,  0,  7,  0,  0,  0, // C  RET cc / CALL cc
    6,  0,  0,  0,  7,  0,  0,  0,  6,  0,  0,  0,  7,  0,  0,  0, // D
    6,  0,  0,  0,  7,  0,  0,  0,  6,  0,  0,  0,  7,  0,  0,  0, // E
    6,  0,  0,  0,  7,  0,  0,  0,  6,  0,  0,  0,  7,  0,  0,  0, // F
];

pub static CB: [u8; 256] = build_cb();
pub static ED: [u8; 256] = build_ed();
pub static XY: [u8; 256] = build_xy();
pub static XYCB: [u8; 256] = build_xycb();

const fn build_cb() -> [u8; 256] {
    let mut t = [8u8; 256];
    let mut op = 0;
    while op < 256 {
        if op & 7 == 6 {
            // BIT n,(HL) sólo lee
            t[op] = if op & 0xC0 == 0x40 { 12 } else { 15 };
        }
        op += 1;
    }
    t
}

const fn build_ed() -> [u8; 256] {
    let mut t = [8u8; 256];
    let mut op = 0x40;
    while op < 0x80 {
        t[op] = match op & 7 {
            0 | 1 => 12,          // IN r,(C) / OUT (C),r
            2 => 15,              // SBC/ADC HL,rr
            3 => 20,              // LD (nn),rr / LD rr,(nn)
            4 => 8,               // NEG
            5 => 14,              // RETN / RETI
            6 => 8,               // IM n
            _ => match op {
                0x47 | 0x4F | 0x57 | 0x5F => 9, // LD I,A / LD R,A / LD A,I / LD A,R
                0x67 | 0x6F => 18,              // RRD / RLD
                _ => 8,
            },
        };
        op += 1;
    }
    let mut op = 0xA0;
    while op < 0xC0 {
        if op & 7 < 4 {
            t[op] = 16;
        }
        op += 1;
    }
    t
}

const fn build_xy() -> [u8; 256] {
    // Por defecto el prefijo cuesta 4 y la instrucción se ejecuta como base.
    let mut t = [0u8; 256];
    let mut op = 0;
    while op < 256 {
        t[op] = 4 + BASE_TABLE[op];
        op += 1;
    }

    t[0x09] = 15; t[0x19] = 15; t[0x29] = 15; t[0x39] = 15;
    t[0x21] = 14; t[0x22] = 20; t[0x23] = 10; t[0x2A] = 20; t[0x2B] = 10;
    t[0x24] = 8; t[0x25] = 8; t[0x26] = 11;
    t[0x2C] = 8; t[0x2D] = 8; t[0x2E] = 11;
    t[0x34] = 23; t[0x35] = 23; t[0x36] = 19;

    let mut op = 0x40;
    while op < 0xC0 {
        let src = op & 7;
        let dst = (op >> 3) & 7;
        let is_ld = op < 0x80;
        if op == 0x76 {
            // HALT
        } else if src == 6 || (is_ld && dst == 6) {
            t[op] = 19;
        }
        op += 1;
    }

    t[0xE1] = 14; t[0xE3] = 23; t[0xE5] = 15; t[0xE9] = 8; t[0xF9] = 10;
    // Prefijos encadenados: sólo el byte de prefijo.
    t[0xCB] = 0; t[0xDD] = 4; t[0xED] = 4; t[0xFD] = 4;
    t
}

const fn build_xycb() -> [u8; 256] {
    let mut t = [23u8; 256];
    let mut op = 0x40;
    while op < 0x80 {
        t[op] = 20;
        op += 1;
    }
    t
}

#[rustfmt::skip]
const BASE_TABLE: [u8; 256] = [
//  0   1   2   3   4   5   6   7   8   9   A   B   C   D   E   F
    4, 10,  7,  6,  4,  4,  7,  4,  4, 11,  7,  6,  4,  4,  7,  4,
    8, 10,  7,  6,  4,  4,  7,  4, 12, 11,  7,  6,  4,  4,  7,  4,
    7, 10, 16,  6,  4,  4,  7,  4,  7, 11, 16,  6,  4,  4,  7,  4,
    7, 10, 13,  6, 11, 11, 10,  4,  7, 11, 13,  6,  4,  4,  7,  4,
    4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4,
    4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4,
    4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4,
    7,  7,  7,  7,  7,  7,  4,  7,  4,  4,  4,  4,  4,  4,  7,  4,
    4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4,
    4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4,
    4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4,
    4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4,
    5, 10, 10, 10, 10, 11,  7, 11,  5, 10, 10,  0, 10, 17,  7, 11,
    5, 10, 10, 11, 10, 11,  7, 11,  5,  4, 10, 11, 10,  0,  7, 11,
    5, 10, 10, 19, 10, 11,  7, 11,  5,  4, 10,  4, 10,  0,  7, 11,
    5, 10, 10,  4, 10, 11,  7, 11,  5,  6, 10,  4, 10,  0,  7, 11,
];
