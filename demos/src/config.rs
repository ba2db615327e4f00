//! Everything about this board and this firmware that is fixed at build time

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use twinkle::Duration;
use twinkle::clock::{ClockPlan, ClockSource};

/// 40 MHz from the 16 MHz HSI
pub const CLOCK_PLAN: ClockPlan = ClockPlan {
    source: ClockSource::Internal,
    sysclk_hz: 40_000_000,
};

/// Console baud rate
pub const CONSOLE_BAUD: u32 = twinkle::bringup::CONSOLE_BAUD;

/// The red LED, on PC1
pub const LED_RED: u32 = 1 << 1;
/// The blue LED, on PC2
pub const LED_BLUE: u32 = 1 << 2;
/// The green LED, on PC3
pub const LED_GREEN: u32 = 1 << 3;
/// Every LED bit
pub const LED_ALL: u32 = LED_RED | LED_BLUE | LED_GREEN;

/// The user button (PC13) and the second button (PC10), as EXTI lines
pub const BUTTON_LINES: u32 = (1 << 13) | (1 << 10);

/// NVIC priority of the button interrupt
///
/// This part has four priority bits, so only the top nibble counts. More
/// urgent than SysTick and PendSV, which sit at 0xFF.
pub const BUTTON_IRQ_PRIORITY: u8 = 5 << 4;

/// Both blinking tasks run at this priority
pub const TASK_PRIORITY: u8 = 1;

/// Stack depth of the red LED task, in words
pub const TASK_1_STACK_WORDS: usize = 256;

/// Stack depth of the green LED task, in words
pub const TASK_2_STACK_WORDS: usize = 256;

/// How long each blink step sleeps
pub const BLINK_PERIOD: Duration = Duration::millis(1000);

/// CPU usage is sampled once every this many ticks
pub const USAGE_TICK_DIVISOR: u32 = 10;

/// Bytes set aside for task stacks, including the idle task's
pub const STACK_ARENA_BYTES: usize = 4096;

// End of File
