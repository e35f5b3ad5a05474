// crates/genie-sched/src/time.rs
//! Tiempo simulado en picosegundos enteros.
//!
//! Un entero evita la deriva de los flotantes: 20 ms sumados cinco veces son
//! exactamente 100 ms. `NEVER` es el centinela de "nunca" y toda la aritmética
//! satura, así que `NEVER + x` sigue siendo `NEVER`.

use std::fmt;
use std::ops::{Add, AddAssign, Sub};

const PS_PER_SEC: u128 = 1_000_000_000_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Time(u64);

impl Time {
    pub const ZERO: Time = Time(0);
    pub const NEVER: Time = Time(u64::MAX);

    pub const fn from_ps(ps: u64) -> Self {
        Time(ps)
    }

    pub const fn from_micros(us: u64) -> Self {
        Time(us.saturating_mul(1_000_000))
    }

    pub const fn from_millis(ms: u64) -> Self {
        Time(ms.saturating_mul(1_000_000_000))
    }

    pub fn from_secs_f64(secs: f64) -> Self {
        if !secs.is_finite() || secs >= u64::MAX as f64 / 1e12 {
            return Time::NEVER;
        }
        Time((secs.max(0.0) * 1e12) as u64)
    }

    /// Período de una frecuencia en Hz.
    pub fn from_hz(hz: u32) -> Self {
        if hz == 0 {
            return Time::NEVER;
        }
        Time((PS_PER_SEC / hz as u128) as u64)
    }

    /// Duración de `cycles` ciclos a `hz`, redondeada hacia abajo.
    pub fn from_cycles(cycles: u64, hz: u32) -> Self {
        if hz == 0 {
            return Time::NEVER;
        }
        let ps = cycles as u128 * PS_PER_SEC / hz as u128;
        Time(ps.min(u64::MAX as u128) as u64)
    }

    /// Ciclos necesarios para cubrir esta duración a `hz`, redondeados hacia
    /// arriba: ejecutar ese presupuesto siempre alcanza el vencimiento.
    pub fn to_cycles(self, hz: u32) -> u64 {
        if self.is_never() {
            return u64::MAX;
        }
        let cycles = (self.0 as u128 * hz as u128).div_ceil(PS_PER_SEC);
        cycles.min(u64::MAX as u128) as u64
    }

    pub const fn as_ps(self) -> u64 {
        self.0
    }

    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1e12
    }

    pub const fn is_never(self) -> bool {
        self.0 == u64::MAX
    }

    pub const fn saturating_sub(self, rhs: Time) -> Time {
        Time(self.0.saturating_sub(rhs.0))
    }
}

impl Add for Time {
    type Output = Time;

    fn add(self, rhs: Time) -> Time {
        Time(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Time {
    fn add_assign(&mut self, rhs: Time) {
        *self = *self + rhs;
    }
}

impl Sub for Time {
    type Output = Time;

    fn sub(self, rhs: Time) -> Time {
        if self.is_never() {
            return Time::NEVER;
        }
        self.saturating_sub(rhs)
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_never() {
            write!(f, "never")
        } else {
            write!(f, "{:.6}ms", self.0 as f64 / 1e9)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn never_is_sticky() {
        assert_eq!(Time::NEVER + Time::from_millis(5), Time::NEVER);
        assert_eq!(Time::NEVER - Time::from_millis(5), Time::NEVER);
        assert_eq!(Time::from_millis(1) - Time::from_millis(5), Time::ZERO);
        assert_eq!(Time::NEVER.to_string(), "never");
    }

    #[test]
    fn cycle_conversions() {
        assert_eq!(Time::from_cycles(1, 1_000_000), Time::from_micros(1));
        assert_eq!(Time::from_millis(20).to_cycles(1_000_000), 20_000);
        // 1 ps a 1 MHz ya necesita un ciclo entero.
        assert_eq!(Time::from_ps(1).to_cycles(1_000_000), 1);
        assert_eq!(Time::ZERO.to_cycles(1_000_000), 0);
        assert_eq!(Time::from_hz(50), Time::from_millis(20));
    }

    proptest! {
        #[test]
        fn budget_always_covers_the_interval(ps in 0u64..1_000_000_000_000, hz in 1u32..10_000_000) {
            let t = Time::from_ps(ps);
            let cycles = t.to_cycles(hz);
            prop_assert!(Time::from_cycles(cycles, hz) >= t);
            if cycles > 0 {
                prop_assert!(Time::from_cycles(cycles - 1, hz) < t);
            }
        }
    }
}
