//! Holds the [`Hooks`] trait, the scheduler's lifecycle observer

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use core::sync::atomic::{AtomicU32, Ordering};

use crate::TaskId;

/// Callbacks the scheduler makes at defined points in its life
///
/// One object implementing this is handed to
/// [`Scheduler::new`](crate::Scheduler::new) and lives for as long as the
/// scheduler does.
pub trait Hooks: Sync {
    /// Called over and over by the idle task, which only runs when no other
    /// task can.
    ///
    /// Must return, so the idle task can notice when something else became
    /// runnable. The default waits for the next interrupt.
    fn on_idle(&self) {
        crate::port::wait_for_interrupt();
    }

    /// Called from the SysTick handler, once per scheduler tick, after the
    /// tick count has been advanced to `now`.
    ///
    /// Runs in interrupt context - keep it short and never block.
    fn on_tick(&self, now: u32) {
        let _ = now;
    }

    /// Called when the stack guard of `task` was found overwritten.
    ///
    /// The scheduler has already stopped; this must not return.
    fn on_stack_fault(&self, task: TaskId, name: &'static str) -> ! {
        let _ = (task, name);
        crate::halt()
    }

    /// Called when a task could not be given a table slot or a stack.
    ///
    /// The scheduler has already stopped; this must not return.
    fn on_alloc_fault(&self) -> ! {
        crate::halt()
    }
}

/// Hooks that keep every default
pub struct DefaultHooks;

impl Hooks for DefaultHooks {}

/// Divides the tick rate down by `N`
///
/// [`TickDivider::tick`] returns `true` on every `N`th call and resets its
/// count when it does.
///
/// Only call `tick` from one context (normally the tick hook). Other
/// contexts may read [`TickDivider::count`].
pub struct TickDivider<const N: u32> {
    count: AtomicU32,
}

impl<const N: u32> TickDivider<N> {
    /// Make a new divider, with no ticks counted
    pub const fn new() -> Self {
        assert!(N > 0);
        Self {
            count: AtomicU32::new(0),
        }
    }

    /// Count one tick
    ///
    /// Returns `true` if this was the `N`th tick since the last time it
    /// returned `true`.
    pub fn tick(&self) -> bool {
        let count = self.count.load(Ordering::Relaxed) + 1;
        if count == N {
            self.count.store(0, Ordering::Relaxed);
            true
        } else {
            self.count.store(count, Ordering::Relaxed);
            false
        }
    }

    /// How many ticks have been counted since the last roll-over
    pub fn count(&self) -> u32 {
        self.count.load(Ordering::Relaxed)
    }
}

impl<const N: u32> Default for TickDivider<N> {
    fn default() -> Self {
        TickDivider::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_on_every_tenth_tick() {
        let divider = TickDivider::<10>::new();
        for t in 1..=1_000u32 {
            assert_eq!(divider.tick(), t % 10 == 0, "tick {t}");
        }
    }

    #[test]
    fn count_resets_after_firing() {
        let divider = TickDivider::<10>::new();
        for _ in 0..9 {
            divider.tick();
        }
        assert_eq!(divider.count(), 9);
        assert!(divider.tick());
        assert_eq!(divider.count(), 0);
    }

    #[test]
    fn divide_by_one_always_fires() {
        let divider = TickDivider::<1>::new();
        assert!((0..5).all(|_| divider.tick()));
    }
}

// End of File
