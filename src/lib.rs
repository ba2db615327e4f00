//! # twinkle
//!
//! A small pre-emptive, priority-based, round-robin kernel for Armv7-M
//! microcontrollers, plus the building blocks a board needs to bring itself
//! up and run periodic tasks on it.
//!
//! Off-target (e.g. under `cargo test`) the architecture layer is replaced
//! by a simulation, so the scheduler can be driven one tick at a time.

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

#![cfg_attr(not(test), no_std)]

// must come first, so the other modules can see the macros
#[macro_use]
mod fmt;

mod arena;
#[cfg(target_os = "none")]
mod asm;
mod error;
mod port;
mod scheduler;
mod stack_pusher;
mod task;

pub mod bringup;
pub mod clock;
pub mod config;
pub mod gpio;
pub mod hooks;
pub mod periodic;
pub mod usage;

use core::cell::UnsafeCell;

pub use arena::{Arena, StackArena, StackRegion};
pub use error::{Error, Result};
pub use hooks::{DefaultHooks, Hooks};
pub use scheduler::{Scheduler, TaskId};
use stack_pusher::StackPusher;
pub use task::{Task, TaskEntryFn, TaskState};

/// A span of time, counted in scheduler ticks
pub type Duration = fugit::TimerDurationU32<{ config::TICK_HZ }>;

/// Put the calling task to sleep for at least the given period
///
/// Other tasks (or the idle task) run in the meantime. Does nothing if the
/// scheduler is not running.
pub fn delay(period: Duration) {
    if let Some(scheduler) = Scheduler::get_scheduler() {
        scheduler.sleep_current(period.ticks());
    }
}

/// Let another task of the same priority run, if one is ready
pub fn yield_now() {
    if let Some(scheduler) = Scheduler::get_scheduler() {
        scheduler.sleep_current(0);
    }
}

/// Scheduler ticks since start
///
/// Returns `u32::MAX` if the scheduler is not running.
pub fn now() -> u32 {
    Scheduler::get_scheduler().map_or(u32::MAX, Scheduler::now)
}

/// Get the current task ID
pub fn task_id() -> TaskId {
    Scheduler::get_scheduler().map_or(TaskId::invalid(), Scheduler::current_task_id)
}

/// Stop the system
///
/// Interrupts are disabled and the core spins for ever. Under simulation,
/// this panics instead.
pub fn halt() -> ! {
    port::halt()
}

/// Scheduler tick interrupt
///
/// Drives the scheduler. [`Scheduler::start`] configures the SysTick to fire
/// this once per tick.
#[cfg(target_os = "none")]
#[unsafe(no_mangle)]
extern "C" fn SysTick() {
    if let Some(scheduler) = Scheduler::get_scheduler() {
        scheduler.sched_tick();
    }
}

// End of File
