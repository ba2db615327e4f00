//! Hard-float context switch

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::{Scheduler, Task, scheduler};

/// Context switch for Armv7-M and Armv8-M Mainline, hard-float ABI
///
/// As for the soft-float version, except that a task may own FPU state. Bit
/// 4 of EXC_RETURN is clear when the hardware pushed an extended frame (S0
/// to S15 and FPSCR), and then we must also save and restore S16 to S31.
/// The EXC_RETURN we save alongside R4 to R11 tells us, on the way back in,
/// whether the resumed task has FPU state to unstack.
#[unsafe(no_mangle)]
#[unsafe(naked)]
unsafe extern "C" fn PendSV() {
    // Only r0-r3 and r12 may be used in here. The hardware stacked those.

    core::arch::naked_asm!(r#"
    // naked_asm! ignores the target FPU, rust-lang/rust#127269
    .fpu vfpv3

    // r1 = &Scheduler
    ldr      r1, ={scheduler_ptr}
    ldr      r1, [r1]

    // r2 = current task ID
    ldr      r2, [r1, {current_task_offset}]

    // r3 = &Scheduler.tasks[0]
    add      r3, r1, #{tasks_offset}

    // nothing to save on the very first switch
    cmp      r2, #-1
    beq      1f

    // r2 = byte offset of the current task's slot
    lsl      r2, {task_size_bits}

    mrs      r0, psp

    // extended frame? then S16-S31 are ours to save
    tst      lr, #0x10
    it       eq
    vstmdbeq r0!, {{ s16 - s31 }}

    // save R4-R11 and EXC_RETURN
    stmdb    r0!, {{ r4 - r11, lr }}

    // Task.stack is the first word of the slot
    str      r0, [r3, r2]

    1:

    // r2 = byte offset of the next task's slot
    ldr      r2, [r1, {next_task_offset}]
    lsl      r2, {task_size_bits}

    ldr      r0, [r3, r2]
    ldmia    r0!, {{ r4 - r11, lr }}

    // extended frame? then restore S16-S31 too
    tst      lr, #0x10
    it       eq
    vldmiaeq r0!, {{ s16 - s31 }}

    msr      psp, r0

    // current_task = next_task
    ldr      r2, [r1, {next_task_offset}]
    str      r2, [r1, {current_task_offset}]

    // the hardware unstacks the rest
    bx       lr
    "#,
    scheduler_ptr = sym scheduler::SCHEDULER_PTR,
    current_task_offset = const Scheduler::CURRENT_TASK_OFFSET,
    next_task_offset = const Scheduler::NEXT_TASK_OFFSET,
    tasks_offset = const Scheduler::TASKS_OFFSET,
    task_size_bits = const Task::SIZE_BITS,
    );
}

// End of File
