// crates/genie-sched/src/lib.rs
//! Scheduler de eventos con precisión de ciclo.
//!
//! Convierte el tiempo hasta el próximo vencimiento en un presupuesto de
//! ciclos, ejecuta la máquina durante ese slice, avanza el reloj con los
//! ciclos realmente consumidos y dispara los timers vencidos en orden.

use genie_core::CycleCounters;
use std::rc::Rc;

mod time;
mod timer;

pub use time::Time;
pub use timer::{Callback, Restart, TimerId};

use timer::Timer;

/// Lo que el scheduler sabe ejecutar: `cycles` es el presupuesto del slice y
/// el retorno los ciclos consumidos (puede pasarse por una instrucción).
pub trait Machine {
    fn execute(&mut self, cycles: u32) -> u32;
}

/// Slice máximo cuando no hay ningún timer armado.
pub const DEFAULT_MAX_SLICE: Time = Time::from_ps(1_000_000_000_000 / 60);

// ============================================================================
//  SCHEDULER
// ============================================================================

pub struct Scheduler<M> {
    timers: Vec<Timer<M>>,
    next_id: u64,
    now: Time,
    clock_hz: u32,
    counters: Rc<CycleCounters>,
    max_slice: Time,
    overshoot: u32,
}

impl<M> Scheduler<M> {
    pub fn new(clock_hz: u32) -> Self {
        Self {
            timers: Vec::new(),
            next_id: 0,
            now: Time::ZERO,
            clock_hz,
            counters: Rc::new(CycleCounters::new()),
            max_slice: DEFAULT_MAX_SLICE,
            overshoot: 0,
        }
    }

    /// Contadores compartidos con la CPU y los periféricos.
    pub fn counters(&self) -> Rc<CycleCounters> {
        Rc::clone(&self.counters)
    }

    pub fn set_max_slice(&mut self, slice: Time) {
        self.max_slice = slice;
    }

    pub fn clock_hz(&self) -> u32 {
        self.clock_hz
    }

    /// Inicio del slice en curso.
    pub fn now(&self) -> Time {
        self.now
    }

    /// `now` más la fracción del slice que la CPU ya consumió.
    pub fn time_now(&self) -> Time {
        self.now + Time::from_cycles(self.counters.executed() as u64, self.clock_hz)
    }

    /// Ciclos que el último slice ejecutó por encima de su presupuesto.
    pub fn overshoot(&self) -> u32 {
        self.overshoot
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    // ========================================================================
    //  TIMER API
    // ========================================================================

    pub fn allocate<F>(&mut self, callback: F, delay: Time, param: i64, restart: Restart) -> TimerId
    where
        F: FnMut(&mut Scheduler<M>, &mut M, i64) + 'static,
    {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        let start = self.time_now();
        let timer = Timer {
            id,
            start,
            expire: start + delay,
            restart: restart.normalized(),
            param,
            callback: Some(Box::new(callback)),
        };
        log::debug!("{} allocated: expire {} restart {:?}", id, timer.expire, timer.restart);
        self.timers.push(timer);
        id
    }

    /// Timer repetitivo que dispara por primera vez dentro de un período.
    pub fn pulse<F>(&mut self, period: Time, param: i64, callback: F) -> TimerId
    where
        F: FnMut(&mut Scheduler<M>, &mut M, i64) + 'static,
    {
        self.allocate(callback, period, param, Restart::Every(period))
    }

    /// Rearma el timer a `delay` desde ahora.
    pub fn reset(&mut self, id: TimerId, delay: Time) -> bool {
        let start = self.time_now();
        match self.timer_mut(id) {
            Some(timer) => {
                timer.start = start;
                timer.expire = start + delay;
                true
            }
            None => false,
        }
    }

    /// Como `reset`, cambiando además el parámetro y el modo de rearme.
    pub fn adjust(&mut self, id: TimerId, delay: Time, param: i64, restart: Restart) -> bool {
        let start = self.time_now();
        match self.timer_mut(id) {
            Some(timer) => {
                timer.start = start;
                timer.expire = start + delay;
                timer.param = param;
                timer.restart = restart.normalized();
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: TimerId) -> bool {
        match self.timers.iter().position(|t| t.id == id) {
            Some(index) => {
                self.timers.remove(index);
                log::debug!("{} removed", id);
                true
            }
            None => false,
        }
    }

    /// Tiempo desde el último disparo (o desde que se armó).
    pub fn elapsed(&self, id: TimerId) -> Option<Time> {
        let now = self.time_now();
        self.timer(id).map(|t| now - t.start)
    }

    /// Tiempo hasta el próximo vencimiento; `NEVER` si está estacionado.
    pub fn remaining(&self, id: TimerId) -> Option<Time> {
        let now = self.time_now();
        self.timer(id).map(|t| t.expire - now)
    }

    pub fn expire(&self, id: TimerId) -> Option<Time> {
        self.timer(id).map(|t| t.expire)
    }

    fn timer(&self, id: TimerId) -> Option<&Timer<M>> {
        self.timers.iter().find(|t| t.id == id)
    }

    fn timer_mut(&mut self, id: TimerId) -> Option<&mut Timer<M>> {
        self.timers.iter_mut().find(|t| t.id == id)
    }

    /// Índice del timer con menor vencimiento; ante empate gana el primero
    /// registrado.
    fn next_index(&self) -> Option<usize> {
        let mut best: Option<(usize, Time)> = None;
        for (index, timer) in self.timers.iter().enumerate() {
            if best.map_or(true, |(_, expire)| timer.expire < expire) {
                best = Some((index, timer.expire));
            }
        }
        best.map(|(index, _)| index)
    }

    /// Próximo vencimiento, o `None` si no hay timers armados.
    pub fn next_event(&self) -> Option<Time> {
        self.next_index()
            .map(|index| self.timers[index].expire)
            .filter(|expire| !expire.is_never())
    }
}

impl<M: Machine> Scheduler<M> {
    // ========================================================================
    //  DRIVE
    // ========================================================================

    /// Un pase de scheduling: ejecuta la máquina hasta el próximo evento y
    /// dispara todo lo vencido. Devuelve los ciclos que ejecutó la máquina.
    pub fn drive(&mut self, machine: &mut M, clock_hz: u32) -> u32 {
        self.clock_hz = clock_hz;
        let target = self.next_event().unwrap_or(self.now + self.max_slice);

        let budget = target
            .saturating_sub(self.now)
            .to_cycles(clock_hz)
            .min(u32::MAX as u64) as u32;
        let stolen = self.counters.take_stolen();
        let grant = budget.saturating_sub(stolen);

        self.counters.set_executed(0);
        let executed = if grant > 0 { machine.execute(grant) } else { 0 };
        self.overshoot = executed.saturating_sub(grant);

        // El exceso no se pierde: `now` avanza con lo ejecutado de verdad y el
        // próximo presupuesto sale más corto.
        self.now += Time::from_cycles(executed as u64 + stolen as u64, clock_hz);
        self.counters.set_executed(0);
        log::trace!(
            "slice: budget {} stolen {} executed {} overshoot {} now {}",
            budget, stolen, executed, self.overshoot, self.now
        );

        self.fire_due(machine);
        executed
    }

    fn fire_due(&mut self, machine: &mut M) {
        while let Some(index) = self.next_index() {
            if self.timers[index].expire > self.now {
                break;
            }
            let timer = &mut self.timers[index];
            let at = timer.fire();
            let (id, param, restart) = (timer.id, timer.param, timer.restart);
            let callback = timer.callback.take();
            log::trace!("{} fired at {} (param {})", id, at, param);

            if let Some(mut callback) = callback {
                callback(self, machine, param);
                if let Some(timer) = self.timer_mut(id) {
                    if timer.callback.is_none() {
                        timer.callback = Some(callback);
                    }
                }
            }

            // Un one-shot descartable desaparece salvo que el callback lo rearme.
            if restart == Restart::Discard
                && self.timer(id).is_some_and(|t| t.expire.is_never())
            {
                self.remove(id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct Idle;

    impl Machine for Idle {
        fn execute(&mut self, cycles: u32) -> u32 {
            cycles
        }
    }

    #[test]
    fn ties_fire_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut sched: Scheduler<Idle> = Scheduler::new(1_000_000);
        for name in ["a", "b", "c"] {
            let log = Rc::clone(&log);
            sched.allocate(
                move |_, _, _| log.borrow_mut().push(name),
                Time::from_millis(1),
                0,
                Restart::Discard,
            );
        }
        sched.drive(&mut Idle, 1_000_000);
        assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
        assert!(sched.is_empty());
    }

    #[test]
    fn empty_scheduler_runs_max_slice() {
        let mut sched: Scheduler<Idle> = Scheduler::new(1_000_000);
        sched.set_max_slice(Time::from_millis(10));
        assert_eq!(sched.drive(&mut Idle, 1_000_000), 10_000);
        assert_eq!(sched.now(), Time::from_millis(10));
    }

    #[test]
    fn stolen_cycles_shorten_the_slice() {
        let mut sched: Scheduler<Idle> = Scheduler::new(1_000_000);
        sched.allocate(|_, _, _| {}, Time::from_millis(1), 0, Restart::Never);
        sched.counters().steal(300);
        assert_eq!(sched.drive(&mut Idle, 1_000_000), 700);
        assert_eq!(sched.now(), Time::from_millis(1));
        assert_eq!(sched.counters().stolen(), 0);
    }

    #[test]
    fn zero_period_is_not_repeating() {
        assert_eq!(Restart::Every(Time::ZERO).normalized(), Restart::Discard);
        assert_eq!(Restart::Every(Time::NEVER).normalized(), Restart::Never);
    }
}
