//! Table-driven periodic tasks
//!
//! A periodic task is a fixed list of [`Step`]s, walked from the top again
//! once the end is reached. Each step either sleeps or writes some output
//! bits. Keeping the program as data means it can be checked without running
//! a task at all.

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::Duration;
use crate::gpio::{OutputBits, OutputPort};

/// One thing a periodic task does
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Step {
    /// Give up the processor for this long
    Sleep(Duration),
    /// Drive the bits in `mask` to the matching bits of `value`
    Write {
        /// Which bits to touch
        mask: u32,
        /// What to drive them to
        value: u32,
    },
}

#[cfg(feature = "defmt")]
impl defmt::Format for Step {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Step::Sleep(period) => defmt::write!(fmt, "Sleep({=u32} ticks)", period.ticks()),
            Step::Write { mask, value } => {
                defmt::write!(fmt, "Write(0x{=u32:02x} = 0x{=u32:02x})", mask, value)
            }
        }
    }
}

/// What a [`Sequencer`] last handed out
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// Nothing handed out yet
    Starting,
    /// The last step was a [`Step::Sleep`]
    Sleeping,
    /// The last step was a [`Step::Write`]
    Writing,
}

/// Walks a step table, for ever
pub struct Sequencer {
    steps: &'static [Step],
    next: usize,
    phase: Phase,
}

impl Sequencer {
    /// Make a sequencer that starts at the first step of `steps`
    ///
    /// # Panics
    ///
    /// If `steps` is empty.
    pub const fn new(steps: &'static [Step]) -> Sequencer {
        assert!(!steps.is_empty());
        Sequencer {
            steps,
            next: 0,
            phase: Phase::Starting,
        }
    }

    /// Hand out the next step, going back to the start after the last one
    pub fn next_step(&mut self) -> Step {
        let step = self.steps[self.next];
        self.next = (self.next + 1) % self.steps.len();
        self.phase = match step {
            Step::Sleep(_) => Phase::Sleeping,
            Step::Write { .. } => Phase::Writing,
        };
        step
    }

    /// What the last step was
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// How long one pass through the table sleeps for
    pub fn cycle(&self) -> Duration {
        cycle_of(self.steps)
    }

    /// Carry out steps up to and including the next sleep
    ///
    /// Writes go through `bits`. The sleep is handed to `sleep`, which
    /// inside a task is [`crate::delay`].
    pub fn advance<P, F>(&mut self, bits: &OutputBits<P>, sleep: F)
    where
        P: OutputPort,
        F: FnOnce(Duration),
    {
        loop {
            match self.next_step() {
                Step::Sleep(period) => {
                    sleep(period);
                    return;
                }
                Step::Write { mask, value } => {
                    trace!("{} writes 0x{=u32:02x}", crate::task_id(), value & mask);
                    bits.write(mask, value);
                }
            }
        }
    }
}

/// Sleep, drive `mask` high, sleep, drive it low, sleep
pub const fn blink(mask: u32, period: Duration) -> [Step; 5] {
    [
        Step::Sleep(period),
        Step::Write { mask, value: mask },
        Step::Sleep(period),
        Step::Write { mask, value: 0 },
        Step::Sleep(period),
    ]
}

/// The total sleep time of a step table
pub const fn cycle_of(steps: &[Step]) -> Duration {
    let mut ticks = 0;
    let mut idx = 0;
    while idx < steps.len() {
        if let Step::Sleep(period) = steps[idx] {
            ticks += period.ticks();
        }
        idx += 1;
    }
    Duration::from_ticks(ticks)
}

/// Run a step table for ever, sleeping with [`crate::delay`] and writing
/// through `bits`
///
/// Call this as the body of a task. Writes outside the claimed bits never
/// reach the port.
pub fn run<P: OutputPort>(steps: &'static [Step], bits: &OutputBits<P>) -> ! {
    let mut sequencer = Sequencer::new(steps);
    loop {
        sequencer.advance(bits, crate::delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpio::PortBits;
    use std::sync::Mutex;

    const RED: u32 = 0x02;

    static BLINK: [Step; 5] = [
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

    #[test]
    fn one_cycle_is_three_seconds() {
        assert_eq!(cycle_of(&BLINK).ticks(), 3000);
        assert_eq!(Sequencer::new(&BLINK).cycle(), Duration::secs(3));
    }

    #[test]
    fn walks_the_table_and_wraps() {
        let mut sequencer = Sequencer::new(&BLINK);
        assert_eq!(sequencer.phase(), Phase::Starting);

        let mut slept = 0;
        let mut writes = 0;
        for _ in 0..BLINK.len() {
            match sequencer.next_step() {
                Step::Sleep(period) => {
                    assert_eq!(sequencer.phase(), Phase::Sleeping);
                    slept += period.ticks();
                }
                Step::Write { .. } => {
                    assert_eq!(sequencer.phase(), Phase::Writing);
                    writes += 1;
                }
            }
        }
        assert_eq!((slept, writes), (3000, 2));

        // and round again
        assert_eq!(sequencer.next_step(), BLINK[0]);
    }

    /// Counts writes, and keeps the level
    #[derive(Default)]
    struct Led {
        level: Mutex<u32>,
        writes: Mutex<u32>,
    }

    impl OutputPort for Led {
        fn write_masked(&self, mask: u32, value: u32) {
            let mut level = self.level.lock().unwrap();
            *level = (*level & !mask) | (value & mask);
            *self.writes.lock().unwrap() += 1;
        }
    }

    #[test]
    fn advance_stops_at_each_sleep() {
        let port = PortBits::new(Led::default());
        let bits = port.claim(RED).unwrap();
        let mut sequencer = Sequencer::new(&BLINK);
        let mut slept = Vec::new();

        sequencer.advance(&bits, |period| slept.push(period.ticks()));
        assert_eq!(*port.port().writes.lock().unwrap(), 0);

        sequencer.advance(&bits, |period| slept.push(period.ticks()));
        assert_eq!(*port.port().level.lock().unwrap(), RED);

        sequencer.advance(&bits, |period| slept.push(period.ticks()));
        assert_eq!(*port.port().level.lock().unwrap(), 0);
        assert_eq!(*port.port().writes.lock().unwrap(), 2);
        assert_eq!(slept, [1000, 1000, 1000]);
        assert_eq!(sequencer.phase(), Phase::Sleeping);

        // a claim on red alone cannot reach the other LEDs
        static STRAY: [Step; 2] = [
            Step::Write {
                mask: 0x0E,
                value: 0x0E,
            },
            Step::Sleep(Duration::millis(1)),
        ];
        Sequencer::new(&STRAY).advance(&bits, |_| {});
        assert_eq!(*port.port().level.lock().unwrap(), RED);
    }

    #[test]
    fn blink_builds_the_same_table() {
        assert_eq!(blink(RED, Duration::millis(1000)), BLINK);
    }
}

// End of File
