//! One-time hardware bring-up
//!
//! A board implements [`Platform`], one method per stage, and
//! [`BringUp::run`] calls them in a fixed order, exactly once.

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use core::sync::atomic::{AtomicBool, Ordering};

use crate::clock::{ClockPlan, SystemClock};
use crate::{Error, Result};

/// The serial console runs at this many bits per second
pub const CONSOLE_BAUD: u32 = 115_200;

/// The stages of bringing a board up
///
/// Each is called once, in the order they are declared here.
pub trait Platform {
    /// Program the clock tree according to `plan`, and report the system
    /// clock the hardware actually ended up with
    fn set_system_clock(&mut self, plan: &ClockPlan) -> Result<u32>;

    /// Choose which peripherals keep their clocks while the core sleeps
    fn enable_sleep_gating(&mut self) -> Result<()>;

    /// Start the free-running timer the CPU usage meter counts with
    fn start_cpu_usage_timer(&mut self, sysclk_hz: u32) -> Result<()>;

    /// Set up the console pins and UART
    fn configure_console(&mut self, baud: u32, sysclk_hz: u32) -> Result<()>;

    /// Set up the button inputs and their edge interrupts
    fn configure_buttons(&mut self) -> Result<()>;

    /// Set up the LED outputs, all off
    fn configure_leds(&mut self) -> Result<()>;
}

/// Makes sure bring-up happens once
pub struct BringUp {
    done: AtomicBool,
}

impl BringUp {
    /// Bring-up has not happened yet
    pub const fn new() -> BringUp {
        BringUp {
            done: AtomicBool::new(false),
        }
    }

    /// Run every stage of `platform`, recording the system clock in `clock`
    ///
    /// Returns the system clock frequency in Hz. A second call fails with
    /// [`Error::AlreadyInitialised`] without touching the platform. The first
    /// stage error stops the sequence and is returned, as is a clock that
    /// does not match the plan.
    pub fn run<P: Platform>(
        &self,
        platform: &mut P,
        plan: &ClockPlan,
        clock: &SystemClock,
    ) -> Result<u32> {
        if self.done.swap(true, Ordering::AcqRel) {
            return Err(Error::AlreadyInitialised);
        }

        let expected = plan.sysclk_hz;
        let actual = platform.set_system_clock(plan)?;
        if actual != expected {
            return Err(Error::ClockMismatch { expected, actual });
        }
        clock.record(actual)?;
        info!("System clock {=u32} Hz", actual);

        platform.enable_sleep_gating()?;
        platform.start_cpu_usage_timer(actual)?;
        platform.configure_console(CONSOLE_BAUD, actual)?;
        platform.configure_buttons()?;
        platform.configure_leds()?;
        debug!("Bring-up complete");
        Ok(actual)
    }

    /// Has [`BringUp::run`] been called?
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }
}

impl Default for BringUp {
    fn default() -> Self {
        BringUp::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ClockSource;

    const PLAN: ClockPlan = ClockPlan {
        source: ClockSource::Internal,
        sysclk_hz: 40_000_000,
    };

    /// Remembers which stages ran, and can be told to misbehave
    #[derive(Default)]
    struct FakeBoard {
        stages: Vec<&'static str>,
        clock_error_hz: u32,
        refuse_console: bool,
        console: Option<(u32, u32)>,
        plan: Option<ClockPlan>,
    }

    impl Platform for FakeBoard {
        fn set_system_clock(&mut self, plan: &ClockPlan) -> Result<u32> {
            self.stages.push("clock");
            self.plan = Some(*plan);
            Ok(plan.sysclk_hz + self.clock_error_hz)
        }

        fn enable_sleep_gating(&mut self) -> Result<()> {
            self.stages.push("gating");
            Ok(())
        }

        fn start_cpu_usage_timer(&mut self, _sysclk_hz: u32) -> Result<()> {
            self.stages.push("usage");
            Ok(())
        }

        fn configure_console(&mut self, baud: u32, sysclk_hz: u32) -> Result<()> {
            self.stages.push("console");
            if self.refuse_console {
                return Err(Error::Console);
            }
            self.console = Some((baud, sysclk_hz));
            Ok(())
        }

        fn configure_buttons(&mut self) -> Result<()> {
            self.stages.push("buttons");
            Ok(())
        }

        fn configure_leds(&mut self) -> Result<()> {
            self.stages.push("leds");
            Ok(())
        }
    }

    #[test]
    fn runs_every_stage_in_order() {
        let bring_up = BringUp::new();
        let clock = SystemClock::new();
        let mut board = FakeBoard::default();

        assert_eq!(bring_up.run(&mut board, &PLAN, &clock), Ok(40_000_000));
        assert_eq!(
            board.stages,
            ["clock", "gating", "usage", "console", "buttons", "leds"]
        );
        assert_eq!(board.console, Some((115_200, 40_000_000)));
        assert_eq!(clock.hz(), PLAN.sysclk_hz);
        assert!(bring_up.is_done());
    }

    #[test]
    fn platform_gets_the_plan_as_given() {
        let plan = ClockPlan {
            source: ClockSource::External { hz: 8_000_000 },
            sysclk_hz: 84_000_000,
        };
        let clock = SystemClock::new();
        let mut board = FakeBoard::default();

        assert_eq!(BringUp::new().run(&mut board, &plan, &clock), Ok(84_000_000));
        assert_eq!(board.plan, Some(plan));
        assert_eq!(clock.hz(), 84_000_000);
    }

    #[test]
    fn second_run_touches_nothing() {
        let bring_up = BringUp::new();
        let clock = SystemClock::new();
        bring_up
            .run(&mut FakeBoard::default(), &PLAN, &clock)
            .unwrap();

        let mut board = FakeBoard::default();
        assert_eq!(
            bring_up.run(&mut board, &PLAN, &clock),
            Err(Error::AlreadyInitialised)
        );
        assert!(board.stages.is_empty());
    }

    #[test]
    fn wrong_clock_is_a_configuration_error() {
        let bring_up = BringUp::new();
        let clock = SystemClock::new();
        let mut board = FakeBoard {
            clock_error_hz: 1_000,
            ..Default::default()
        };
        assert_eq!(
            bring_up.run(&mut board, &PLAN, &clock),
            Err(Error::ClockMismatch {
                expected: 40_000_000,
                actual: 40_001_000
            })
        );
        assert_eq!(board.stages, ["clock"]);
        assert_eq!(clock.hz(), 0);
    }

    #[test]
    fn stage_failure_stops_the_sequence() {
        let bring_up = BringUp::new();
        let clock = SystemClock::new();
        let mut board = FakeBoard {
            refuse_console: true,
            ..Default::default()
        };
        assert_eq!(
            bring_up.run(&mut board, &PLAN, &clock),
            Err(Error::Console)
        );
        assert_eq!(board.stages, ["clock", "gating", "usage", "console"]);
    }
}

// End of File
