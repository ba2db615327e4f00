//! Board support for running twinkle on an STM32F401 Nucleo-64
//!
//! Also holds the panic, fault and timestamp handlers every binary needs.

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

#![no_std]

pub mod board;
pub mod config;
pub mod hooks;

use defmt_rtt as _;

/// Called when a panic occurs.
///
/// Logs the panic to defmt and then stops the system.
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    defmt::println!("PANIC: {}", defmt::Debug2Format(info));
    twinkle::halt();
}

/// Called when a HardFault occurs.
///
/// Logs the fault to defmt and then stops the system.
#[cortex_m_rt::exception]
unsafe fn HardFault(info: &cortex_m_rt::ExceptionFrame) -> ! {
    defmt::println!("FAULT: {}", defmt::Debug2Format(info));
    twinkle::halt();
}

// Log scheduler ticks in the defmt logs
defmt::timestamp!("{=u32:010} {}", twinkle::now(), twinkle::task_id());

// End of File
