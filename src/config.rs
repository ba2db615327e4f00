//! Compile-time configuration for the kernel

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

/// How many scheduler ticks happen per second
///
/// Task delays are measured in these ticks.
pub const TICK_HZ: u32 = 1_000;

/// How many tasks (including the idle task) the scheduler can hold
pub const MAX_TASKS: usize = 4;

/// Stack depth of the idle task, in 32-bit words
pub const IDLE_STACK_WORDS: usize = 128;

/// Priority of the idle task. Nothing may run below it.
pub const IDLE_PRIORITY: u8 = 0;

/// Number of guard words written at the bottom of every task stack
pub const STACK_GUARD_WORDS: usize = 4;

/// The value each guard word holds while the stack is intact
pub const STACK_GUARD_PATTERN: u32 = 0xA5A5_A5A5;

/// Exception priority for SysTick and PendSV
///
/// The lowest urgency there is, so a task switch never nests inside another
/// handler.
pub const KERNEL_EXCEPTION_PRIORITY: u8 = 0xFF;

// End of File
