//! Host simulation back end
//!
//! There is no PendSV here: a requested switch takes effect at once, which
//! is what the real hardware does when a switch is requested from Thread
//! Mode. Halting panics, so the host process (or the test) sees it.

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::Scheduler;

/// Do what PendSV would do: make the next task the current one
pub(crate) fn pend_switch(scheduler: &Scheduler) {
    scheduler.commit_switch();
}

/// Nothing to wait for in a simulation
pub(crate) fn wait_for_interrupt() {
    core::hint::spin_loop();
}

/// Unwind out of the simulation
pub(crate) fn halt() -> ! {
    panic!("twinkle halted");
}

// End of File
