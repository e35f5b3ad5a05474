use genie_core::CycleCounters;
use genie_sched::{Machine, Restart, Scheduler, Time};
use proptest::prelude::*;
use rstest::rstest;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

const MHZ: u32 = 1_000_000;

/// Máquina de prueba: instrucciones de costo fijo que publican su avance.
struct FixedCost {
    cost: u32,
    counters: Rc<CycleCounters>,
    irqs: u32,
    total: u64,
}

impl FixedCost {
    fn new(cost: u32, sched: &Scheduler<FixedCost>) -> Self {
        Self { cost, counters: sched.counters(), irqs: 0, total: 0 }
    }
}

impl Machine for FixedCost {
    fn execute(&mut self, cycles: u32) -> u32 {
        let mut done = 0;
        while done < cycles {
            done += self.cost;
            self.counters.set_executed(done);
        }
        self.total += done as u64;
        done
    }
}

fn record(log: &Rc<RefCell<Vec<(char, u64)>>>, name: char) -> impl FnMut(&mut Scheduler<FixedCost>, &mut FixedCost, i64) {
    let log = Rc::clone(log);
    move |sched, _, _| {
        let ms = sched.now().as_ps() / 1_000_000_000;
        log.borrow_mut().push((name, ms));
    }
}

#[test]
fn interleaved_periodic_timers() {
    let mut sched = Scheduler::new(MHZ);
    let mut machine = FixedCost::new(4, &sched);
    let log = Rc::new(RefCell::new(Vec::new()));
    sched.pulse(Time::from_millis(20), 0, record(&log, 'A'));
    sched.pulse(Time::from_millis(33), 0, record(&log, 'B'));

    while sched.now() < Time::from_millis(100) {
        sched.drive(&mut machine, MHZ);
    }

    let names: String = log.borrow().iter().map(|(n, _)| *n).collect();
    assert_eq!(names, "ABAABABA");
    let at: Vec<u64> = log.borrow().iter().map(|(_, ms)| *ms).collect();
    assert_eq!(at, vec![20, 33, 40, 60, 66, 80, 99, 100]);
}

#[test]
fn never_restart_fires_once_and_parks() {
    let mut sched = Scheduler::new(MHZ);
    let mut machine = FixedCost::new(4, &sched);
    let fired = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&fired);
    let id = sched.allocate(
        move |_, _, _| *counter.borrow_mut() += 1,
        Time::from_millis(5),
        7,
        Restart::Never,
    );

    for _ in 0..20 {
        sched.drive(&mut machine, MHZ);
    }
    assert_eq!(*fired.borrow(), 1);
    assert_eq!(sched.expire(id), Some(Time::NEVER));
    assert_eq!(sched.remaining(id), Some(Time::NEVER));
    assert!(sched.now() > Time::from_millis(5));
}

#[test]
fn discard_restart_is_removed_after_firing() {
    let mut sched = Scheduler::new(MHZ);
    let mut machine = FixedCost::new(4, &sched);
    let id = sched.allocate(|_, m, _| m.irqs += 1, Time::from_millis(1), 0, Restart::Discard);
    sched.drive(&mut machine, MHZ);
    assert_eq!(machine.irqs, 1);
    assert_eq!(sched.expire(id), None);
    assert!(!sched.remove(id));
}

#[test]
fn callbacks_allocate_and_remove_timers() {
    let mut sched = Scheduler::new(MHZ);
    let mut machine = FixedCost::new(4, &sched);
    let periodic = Rc::new(Cell::new(None));
    let handle = Rc::clone(&periodic);
    let id = sched.allocate(
        move |sched, m, _| {
            m.irqs += 1;
            if m.irqs == 2 {
                // Un one-shot que da de baja al periódico 1 ms después.
                let target = handle.get();
                sched.allocate(
                    move |sched, _, _| {
                        if let Some(id) = target {
                            assert!(sched.remove(id));
                        }
                    },
                    Time::from_millis(1),
                    0,
                    Restart::Discard,
                );
            }
        },
        Time::from_millis(1),
        0,
        Restart::Every(Time::from_millis(2)),
    );
    periodic.set(Some(id));

    while sched.now() < Time::from_millis(10) {
        sched.drive(&mut machine, MHZ);
    }
    // Disparos en 1 y 3 ms; el one-shot de 4 ms lo elimina.
    assert_eq!(machine.irqs, 2);
    assert!(sched.is_empty());
}

#[test]
fn overshoot_is_taken_from_the_next_slice() {
    let mut sched = Scheduler::new(MHZ);
    let mut machine = FixedCost::new(10, &sched);
    sched.pulse(Time::from_micros(25), 0, |_, _, _| {});

    assert_eq!(sched.drive(&mut machine, MHZ), 30);
    assert_eq!(sched.overshoot(), 5);
    assert_eq!(sched.now(), Time::from_micros(30));

    assert_eq!(sched.drive(&mut machine, MHZ), 20);
    assert_eq!(sched.overshoot(), 0);
    assert_eq!(sched.now(), Time::from_micros(50));
}

#[test]
fn reset_and_elapsed() {
    let mut sched = Scheduler::new(MHZ);
    let mut machine = FixedCost::new(4, &sched);
    let id = sched.allocate(|_, _, _| {}, Time::from_millis(10), 0, Restart::Never);
    sched.allocate(|_, _, _| {}, Time::from_millis(4), 0, Restart::Discard);

    sched.drive(&mut machine, MHZ);
    assert_eq!(sched.now(), Time::from_millis(4));
    assert_eq!(sched.elapsed(id), Some(Time::from_millis(4)));
    assert_eq!(sched.remaining(id), Some(Time::from_millis(6)));

    assert!(sched.reset(id, Time::from_millis(1)));
    assert_eq!(sched.expire(id), Some(Time::from_millis(5)));
    assert_eq!(sched.elapsed(id), Some(Time::ZERO));

    assert!(sched.adjust(id, Time::from_millis(2), 9, Restart::Every(Time::from_millis(2))));
    assert_eq!(sched.next_event(), Some(Time::from_millis(6)));
}

#[test]
fn time_now_includes_the_running_slice() {
    let sched: Scheduler<FixedCost> = Scheduler::new(MHZ);
    sched.counters().set_executed(500);
    assert_eq!(sched.time_now(), Time::from_micros(500));
    assert_eq!(sched.now(), Time::ZERO);
}

#[rstest]
#[case(1_774_080)]
#[case(2_216_800)]
#[case(3_579_545)]
fn frame_timer_at_machine_clocks(#[case] hz: u32) {
    let mut sched = Scheduler::new(hz);
    let mut machine = FixedCost::new(4, &sched);
    sched.pulse(Time::from_hz(50), 0, |_, m, _| m.irqs += 1);
    while sched.now() < Time::from_millis(1_000) {
        sched.drive(&mut machine, hz);
    }
    assert_eq!(machine.irqs, 50);
    // Un segundo de reloj, más una instrucción de exceso y el redondeo.
    let drift = machine.total.abs_diff(hz as u64);
    assert!(drift < 8, "drift {}", drift);
}

proptest! {
    #[test]
    fn repeating_timer_fires_n_times(period_us in 500u64..50_000, n in 1u32..20, hz in 1_000_000u32..4_000_000) {
        let mut sched = Scheduler::new(hz);
        let mut machine = FixedCost::new(4, &sched);
        let period = Time::from_micros(period_us);
        sched.pulse(period, 0, |_, m, _| m.irqs += 1);

        let end = Time::from_ps(period.as_ps() * n as u64);
        while sched.now() < end {
            sched.drive(&mut machine, hz);
        }
        prop_assert_eq!(machine.irqs, n);
    }
}
