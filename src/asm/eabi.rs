//! Soft-float context switch

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::{Scheduler, Task, scheduler};

/// Context switch for Armv7-M and Armv8-M Mainline, soft-float ABI
///
/// Runs once PendSV is pending and every other exception has finished. The
/// hardware has already pushed xPSR, PC, LR, R12 and R3 to R0 onto the
/// interrupted task's process stack. We push R11 to R4 and EXC_RETURN below
/// that, park the stack pointer in the current task's slot, then do the
/// reverse for the slot named by `next_task`.
///
/// Naked, so the compiler cannot spill anything into R4 to R11 before we have
/// saved them.
#[unsafe(no_mangle)]
#[unsafe(naked)]
unsafe extern "C" fn PendSV() {
    // Only r0-r3 and r12 may be used in here. The hardware stacked those.

    core::arch::naked_asm!(r#"
    // r1 = &Scheduler
    ldr     r1, ={scheduler_ptr}
    ldr     r1, [r1]

    // r2 = current task ID
    ldr     r2, [r1, {current_task_offset}]

    // r3 = &Scheduler.tasks[0]
    add     r3, r1, #{tasks_offset}

    // nothing to save on the very first switch
    cmp     r2, #-1
    beq     1f

    // r2 = byte offset of the current task's slot
    lsl     r2, {task_size_bits}

    // save R4-R11 and EXC_RETURN under the hardware frame
    mrs     r0, psp
    stmdb   r0!, {{ r4 - r11, lr }}

    // Task.stack is the first word of the slot
    str     r0, [r3, r2]

    1:

    // r2 = byte offset of the next task's slot
    ldr     r2, [r1, {next_task_offset}]
    lsl     r2, {task_size_bits}

    // restore R4-R11 and EXC_RETURN from its saved stack
    ldr     r0, [r3, r2]
    ldmia   r0!, {{ r4 - r11, lr }}
    msr     psp, r0

    // current_task = next_task
    ldr     r2, [r1, {next_task_offset}]
    str     r2, [r1, {current_task_offset}]

    // the hardware unstacks the rest
    bx      lr
    "#,
    scheduler_ptr = sym scheduler::SCHEDULER_PTR,
    current_task_offset = const Scheduler::CURRENT_TASK_OFFSET,
    next_task_offset = const Scheduler::NEXT_TASK_OFFSET,
    tasks_offset = const Scheduler::TASKS_OFFSET,
    task_size_bits = const Task::SIZE_BITS,
    );
}

// End of File
