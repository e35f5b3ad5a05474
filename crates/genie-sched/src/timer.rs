// crates/genie-sched/src/timer.rs
use crate::time::Time;
use crate::Scheduler;
use std::fmt;

/// Handle opaco de un timer registrado.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(pub(crate) u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

/// Qué hace un timer después de disparar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Restart {
    /// One-shot: se elimina después de disparar.
    Discard,
    /// One-shot que queda estacionado en `Time::NEVER`.
    Never,
    /// Repetitivo: se rearma sumando el período al vencimiento.
    Every(Time),
}

impl Restart {
    /// Un período cero o "never" no repite.
    pub(crate) fn normalized(self) -> Self {
        match self {
            Restart::Every(p) if p == Time::ZERO => Restart::Discard,
            Restart::Every(p) if p.is_never() => Restart::Never,
            other => other,
        }
    }
}

/// Callback de un timer: recibe el scheduler, la máquina y el parámetro.
pub type Callback<M> = Box<dyn FnMut(&mut Scheduler<M>, &mut M, i64)>;

pub(crate) struct Timer<M> {
    pub(crate) id: TimerId,
    /// Último disparo (o el momento en que se armó).
    pub(crate) start: Time,
    pub(crate) expire: Time,
    pub(crate) restart: Restart,
    pub(crate) param: i64,
    /// `None` sólo mientras el callback se está ejecutando.
    pub(crate) callback: Option<Callback<M>>,
}

impl<M> Timer<M> {
    /// Avanza el timer después de un disparo. Devuelve el instante de disparo.
    pub(crate) fn fire(&mut self) -> Time {
        let at = self.expire;
        self.start = at;
        self.expire = match self.restart {
            Restart::Every(period) => at + period,
            Restart::Never | Restart::Discard => Time::NEVER,
        };
        at
    }
}

impl<M> fmt::Debug for Timer<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("id", &self.id)
            .field("start", &self.start)
            .field("expire", &self.expire)
            .field("restart", &self.restart)
            .field("param", &self.param)
            .finish()
    }
}
