//! Armv7-M back end

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::Scheduler;

/// Ask for a task switch to whatever `scheduler.next_task` says
///
/// PendSV runs once no other exception is active. From Thread Mode that is
/// before this function returns.
pub(crate) fn pend_switch(_scheduler: &Scheduler) {
    cortex_m::peripheral::SCB::set_pendsv();
    // flush the pipeline to ensure the PendSV fires before we return
    cortex_m::asm::dsb();
    cortex_m::asm::isb();
}

/// Sleep until an interrupt arrives
pub(crate) fn wait_for_interrupt() {
    cortex_m::asm::wfi();
}

/// Stop everything, for ever
pub(crate) fn halt() -> ! {
    cortex_m::interrupt::disable();
    loop {
        cortex_m::asm::nop();
    }
}

// End of File
