//! What this board does when the scheduler idles, ticks or faults

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use twinkle::{Hooks, TaskId, hooks::TickDivider, usage::CpuUsage};

use crate::{board, config};

/// Busy time, measured in CPU usage timer counts
pub static CPU_USAGE: CpuUsage = CpuUsage::new();

/// The board's scheduler hooks
pub struct BoardHooks {
    usage_divider: TickDivider<{ config::USAGE_TICK_DIVISOR }>,
}

impl BoardHooks {
    /// Make the hooks. Register them with the scheduler.
    pub const fn new() -> BoardHooks {
        BoardHooks {
            usage_divider: TickDivider::new(),
        }
    }
}

impl Default for BoardHooks {
    fn default() -> Self {
        BoardHooks::new()
    }
}

impl Hooks for BoardHooks {
    fn on_idle(&self) {
        // With interrupts masked, WFI still wakes on a pending interrupt, but
        // the handler only runs once we unmask. That lets us read the timer
        // before anything else gets a look in.
        cortex_m::interrupt::free(|_cs| {
            let start = board::usage_timer_now();
            cortex_m::asm::wfi();
            CPU_USAGE.record_sleep(board::usage_timer_now().wrapping_sub(start));
        });
    }

    fn on_tick(&self, now: u32) {
        if self.usage_divider.tick() {
            let busy = CPU_USAGE.sample(board::usage_timer_now());
            defmt::trace!("tick {=u32}: {=u32}% busy", now, busy >> 16);
        }
    }

    fn on_stack_fault(&self, _task: TaskId, _name: &'static str) -> ! {
        twinkle::halt()
    }

    fn on_alloc_fault(&self) -> ! {
        twinkle::halt()
    }
}

// End of File
