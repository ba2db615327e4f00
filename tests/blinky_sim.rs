//! Runs the two blinking task bodies against the simulated scheduler, one
//! tick at a time, and checks what reaches the LEDs and when.

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard};

use twinkle::gpio::{OutputBits, OutputPort, PortBits};
use twinkle::hooks::TickDivider;
use twinkle::periodic::{Phase, Sequencer, Step};
use twinkle::{Arena, Duration, Error, Hooks, Scheduler, TaskId, TaskState};

const RED: u32 = 0x02;
const BLUE: u32 = 0x04;
const GREEN: u32 = 0x08;

static TASK_1: [Step; 5] = [
    Step::Sleep(Duration::millis(1000)),
    Step::Write {
        mask: RED,
        value: RED,
    },
    Step::Sleep(Duration::millis(1000)),
    Step::Write {
        mask: RED,
        value: 0,
    },
    Step::Sleep(Duration::millis(1000)),
];

static TASK_2: [Step; 5] = [
    Step::Sleep(Duration::millis(1000)),
    Step::Write {
        mask: GREEN,
        value: GREEN,
    },
    Step::Sleep(Duration::millis(1000)),
    Step::Write {
        mask: GREEN,
        value: 0,
    },
    Step::Sleep(Duration::millis(1000)),
];

/// The free functions in the crate root act on the scheduler started last,
/// so simulations in this file take turns.
static ONE_AT_A_TIME: Mutex<()> = Mutex::new(());

fn one_at_a_time() -> MutexGuard<'static, ()> {
    ONE_AT_A_TIME
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// An LED port that remembers its level and every write
#[derive(Default)]
struct Leds {
    level: Mutex<u32>,
    writes: Mutex<Vec<(u32, u32)>>,
}

impl Leds {
    fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }
}

impl OutputPort for Leds {
    fn write_masked(&self, mask: u32, value: u32) {
        let mut level = self.level.lock().unwrap();
        *level = (*level & !mask) | (value & mask);
        self.writes.lock().unwrap().push((mask, value));
    }
}

struct SimHooks {
    idle: AtomicU32,
    tenths: TickDivider<10>,
    samples: AtomicU32,
}

impl SimHooks {
    fn leak() -> &'static SimHooks {
        Box::leak(Box::new(SimHooks {
            idle: AtomicU32::new(0),
            tenths: TickDivider::new(),
            samples: AtomicU32::new(0),
        }))
    }
}

impl Hooks for SimHooks {
    fn on_idle(&self) {
        self.idle.fetch_add(1, Ordering::Relaxed);
    }

    fn on_tick(&self, _now: u32) {
        if self.tenths.tick() {
            self.samples.fetch_add(1, Ordering::Relaxed);
        }
    }
}

fn never() -> ! {
    unreachable!("simulated tasks are never entered")
}

/// A task body, resumed by hand whenever the scheduler makes it current
struct SimTask<'a> {
    id: TaskId,
    sequencer: Sequencer,
    bits: OutputBits<'a, Leds>,
}

#[derive(Debug, PartialEq, Eq)]
struct Write {
    at: u32,
    task: TaskId,
    mask: u32,
    value: u32,
}

struct Sim<'a> {
    leds: &'a PortBits<Leds>,
    scheduler: &'static Scheduler,
    hooks: &'static SimHooks,
    tasks: Vec<SimTask<'a>>,
    log: Vec<Write>,
    _turn: MutexGuard<'static, ()>,
}

impl<'a> Sim<'a> {
    fn new(leds: &'a PortBits<Leds>) -> Sim<'a> {
        let turn = one_at_a_time();
        let hooks = SimHooks::leak();
        let arena: &'static Arena<4096> = Box::leak(Box::new(Arena::new()));
        let scheduler: &'static Scheduler = Box::leak(Box::new(Scheduler::new(arena, hooks)));

        let red = scheduler.spawn("Task 1", never, 256, 1);
        let green = scheduler.spawn("Task 2", never, 256, 1);
        let tasks = vec![
            SimTask {
                id: red,
                sequencer: Sequencer::new(&TASK_1),
                bits: leds.claim(RED).unwrap(),
            },
            SimTask {
                id: green,
                sequencer: Sequencer::new(&TASK_2),
                bits: leds.claim(GREEN).unwrap(),
            },
        ];
        scheduler.start_simulated();

        let mut sim = Sim {
            leds,
            scheduler,
            hooks,
            tasks,
            log: Vec::new(),
            _turn: turn,
        };
        sim.run_tasks();
        sim
    }

    /// Resume whichever task is current until it sleeps through
    /// `twinkle::delay`, until only the idle task is left
    fn run_tasks(&mut self) -> bool {
        let mut ran = false;
        loop {
            let current = twinkle::task_id();
            let Some(task) = self.tasks.iter_mut().find(|t| t.id == current) else {
                return ran;
            };
            ran = true;
            let at = twinkle::now();
            let before = self.leds.port().write_count();
            task.sequencer.advance(&task.bits, twinkle::delay);
            let writes = self.leds.port().writes.lock().unwrap();
            for &(mask, value) in &writes[before..] {
                self.log.push(Write {
                    at,
                    task: current,
                    mask,
                    value,
                });
            }
        }
    }

    /// Advance time by one tick
    fn tick(&mut self) {
        self.scheduler.sched_tick();
        if !self.run_tasks() {
            assert_eq!(twinkle::task_id(), self.scheduler.idle_task_id());
            self.scheduler.run_idle_hook();
        }
    }

    fn writes_by(&self, task: TaskId) -> Vec<(u32, u32)> {
        self.log
            .iter()
            .filter(|w| w.task == task)
            .map(|w| (w.at, w.value))
            .collect()
    }
}

#[test]
fn writes_land_on_a_three_second_cycle() {
    let leds = PortBits::new(Leds::default());
    let mut sim = Sim::new(&leds);
    for _ in 0..10_000 {
        sim.tick();
    }

    let red = sim.tasks[0].id;
    let green = sim.tasks[1].id;
    let expected = |on: u32| {
        vec![
            (1000, on),
            (2000, 0),
            (4000, on),
            (5000, 0),
            (7000, on),
            (8000, 0),
            (10_000, on),
        ]
    };
    assert_eq!(sim.writes_by(red), expected(RED));
    assert_eq!(sim.writes_by(green), expected(GREEN));
    assert_eq!(*leds.port().level.lock().unwrap(), RED | GREEN);
    assert_eq!(leds.port().write_count(), 14);
}

#[test]
fn each_task_only_touches_its_own_bit() {
    let leds = PortBits::new(Leds::default());
    let mut sim = Sim::new(&leds);
    for _ in 0..6_500 {
        sim.tick();
    }

    let red = sim.tasks[0].id;
    assert!(!sim.log.is_empty());
    for write in &sim.log {
        let own = if write.task == red { RED } else { GREEN };
        assert_eq!(write.mask, own, "{:?}", write);
        assert_eq!(write.value & !own, 0, "{:?}", write);
    }
    // blue is configured, never driven
    assert_eq!(*leds.port().level.lock().unwrap() & BLUE, 0);
    // and nobody else can take a bit that is in use
    assert_eq!(
        leds.claim(RED | BLUE).err(),
        Some(Error::BitsInUse { mask: RED })
    );
}

#[test]
fn idle_runs_whenever_both_tasks_sleep() {
    let leds = PortBits::new(Leds::default());
    let mut sim = Sim::new(&leds);
    for _ in 0..3_000 {
        sim.tick();
    }
    // every tick idles except the three where the tasks woke up
    assert_eq!(sim.hooks.idle.load(Ordering::Relaxed), 3_000 - 3);
    assert_eq!(sim.hooks.samples.load(Ordering::Relaxed), 300);
    for task in &sim.tasks {
        assert_eq!(task.sequencer.phase(), Phase::Sleeping);
        assert_eq!(task.sequencer.cycle().ticks(), 3_000);
    }
    assert_eq!(sim.scheduler.current_task_id(), sim.scheduler.idle_task_id());
}

#[test]
fn free_functions_drive_the_running_scheduler() {
    let _turn = one_at_a_time();
    let arena: &'static Arena<4096> = Box::leak(Box::new(Arena::new()));
    let scheduler: &'static Scheduler =
        Box::leak(Box::new(Scheduler::new(arena, SimHooks::leak())));
    let a = scheduler.spawn("Task 1", never, 256, 1);
    let b = scheduler.spawn("Task 2", never, 256, 1);
    scheduler.start_simulated();

    assert_eq!(twinkle::task_id(), a);
    twinkle::yield_now();
    assert_eq!(twinkle::task_id(), b);
    twinkle::yield_now();
    assert_eq!(twinkle::task_id(), a);

    twinkle::delay(Duration::millis(5));
    assert_eq!(twinkle::task_id(), b);
    twinkle::delay(Duration::millis(7));
    assert_eq!(twinkle::task_id(), scheduler.idle_task_id());

    for _ in 0..4 {
        scheduler.sched_tick();
        assert_eq!(twinkle::task_id(), scheduler.idle_task_id());
    }
    scheduler.sched_tick();
    assert_eq!(twinkle::now(), 5);
    assert_eq!(twinkle::task_id(), a);

    // with b still asleep, yielding keeps a running
    twinkle::yield_now();
    assert_eq!(twinkle::task_id(), a);
    assert_eq!(scheduler.task(b).unwrap().state(), TaskState::Delayed);
}

// End of File
