// crates/geniez80/src/tables.rs
//! Tablas de flags precalculadas en tiempo de compilación, indexadas por el
//! resultado de 8 bits.

use crate::flags::{C, H, N, P, S, V, X, Y, Z};

/// Sign + Zero + copia de bits 5/3.
pub static SZ: [u8; 256] = build_sz();
/// Igual que SZ pero con P/V forzado en cero (para BIT).
pub static SZ_BIT: [u8; 256] = build_sz_bit();
/// Paridad: P activo si la cantidad de bits es par.
pub static PARITY: [u8; 256] = build_parity();
/// SZ + paridad.
pub static SZP: [u8; 256] = build_szp();
/// Flags de INC indexados por el resultado.
pub static SZHV_INC: [u8; 256] = build_inc();
/// Flags de DEC indexados por el resultado.
pub static SZHV_DEC: [u8; 256] = build_dec();

const fn sz(i: u8) -> u8 {
    let base = if i == 0 { Z } else { i & S };
    base | (i & (Y | X))
}

const fn build_sz() -> [u8; 256] {
    let mut t = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        t[i] = sz(i as u8);
        i += 1;
    }
    t
}

const fn build_sz_bit() -> [u8; 256] {
    let mut t = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        let v = i as u8;
        let base = if v == 0 { Z | P } else { v & S };
        t[i] = base | (v & (Y | X));
        i += 1;
    }
    t
}

const fn build_parity() -> [u8; 256] {
    let mut t = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        t[i] = if (i as u8).count_ones() % 2 == 0 { P } else { 0 };
        i += 1;
    }
    t
}

const fn build_szp() -> [u8; 256] {
    let parity = build_parity();
    let mut t = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        t[i] = sz(i as u8) | parity[i];
        i += 1;
    }
    t
}

const fn build_inc() -> [u8; 256] {
    let mut t = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        let r = i as u8;
        let mut f = sz(r);
        if r == 0x80 {
            f |= V;
        }
        if r & 0x0F == 0 {
            f |= H;
        }
        t[i] = f;
        i += 1;
    }
    t
}

const fn build_dec() -> [u8; 256] {
    let mut t = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        let r = i as u8;
        let mut f = sz(r) | N;
        if r == 0x7F {
            f |= V;
        }
        if r & 0x0F == 0x0F {
            f |= H;
        }
        t[i] = f;
        i += 1;
    }
    t
}

/// Flags para resultados lógicos: SZP, con H forzado para AND.
#[inline(always)]
pub fn logic(v: u8, half: bool) -> u8 {
    SZP[v as usize] | if half { H } else { 0 }
}

// No hay carry en ninguna tabla; el carry siempre se calcula a mano.
const _: () = {
    let t = build_szp();
    let mut i = 0;
    while i < 256 {
        assert!(t[i] & C == 0);
        i += 1;
    }
};

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn parity_bit_tracks_even_popcount(v in any::<u8>()) {
            prop_assert_eq!(PARITY[v as usize] != 0, v.count_ones() % 2 == 0);
            prop_assert_eq!(SZP[v as usize] & P, PARITY[v as usize]);
        }

        #[test]
        fn inc_table_overflow_and_half_carry(v in any::<u8>()) {
            let r = v.wrapping_add(1);
            let f = SZHV_INC[r as usize];
            prop_assert_eq!(f & V != 0, r == 0x80);
            prop_assert_eq!(f & H != 0, r & 0x0F == 0);
            prop_assert_eq!(f & N, 0);
            prop_assert_eq!(f & Z != 0, r == 0);
            prop_assert_eq!(f & S, r & S);
        }

        #[test]
        fn dec_table_overflow_and_half_borrow(v in any::<u8>()) {
            let r = v.wrapping_sub(1);
            let f = SZHV_DEC[r as usize];
            prop_assert_eq!(f & V != 0, r == 0x7F);
            prop_assert_eq!(f & H != 0, r & 0x0F == 0x0F);
            prop_assert_eq!(f & N, N);
        }

        #[test]
        fn sz_copies_bits_five_and_three(v in any::<u8>()) {
            prop_assert_eq!(SZ[v as usize] & (X | Y), v & (X | Y));
            prop_assert_eq!(SZ_BIT[v as usize] & (X | Y), v & (X | Y));
        }
    }

    #[test]
    fn bit_table_sets_parity_only_for_zero() {
        assert_eq!(SZ_BIT[0], Z | P);
        assert_eq!(SZ_BIT[0x80], S);
        assert_eq!(SZ_BIT[0x28], X | Y);
    }

    #[test]
    fn logic_forces_half_carry_only_when_asked() {
        assert_eq!(logic(0, true), Z | P | H);
        assert_eq!(logic(0x01, false), 0);
    }
}
