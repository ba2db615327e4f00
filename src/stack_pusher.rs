//! Writes the first context of a new task onto its stack

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

/// xPSR for a fresh task: Thumb bit only
const DEFAULT_XPSR: u32 = 1 << 24;

/// EXC_RETURN value for "return to Thread Mode, Process Stack, no FPU frame"
const EXC_RETURN_THREAD_PSP: u32 = 0xFFFF_FFFD;

/// Number of words [`StackPusher::push_initial_frame`] writes
pub(crate) const INITIAL_FRAME_WORDS: usize = 17;

/// Cursor that walks down a full-descending stack one word at a time
pub(crate) struct StackPusher(*mut u32);

impl StackPusher {
    /// Start a cursor at `stack_top`, one past the highest usable word
    ///
    /// # Safety
    ///
    /// Every word the cursor will write, counting down from `stack_top - 1`,
    /// must belong to memory nobody else is using.
    pub(crate) unsafe fn new(stack_top: *mut u32) -> StackPusher {
        StackPusher(stack_top)
    }

    /// Step down one word and store `value` there
    pub(crate) fn push(&mut self, value: u32) {
        // SAFETY: covered by the contract on `new`
        unsafe {
            self.0 = self.0.offset(-1);
            self.0.write_volatile(value);
        }
    }

    /// Lay down what PendSV pops the first time it switches to a task
    ///
    /// From the top: the eight-word hardware frame (xPSR, PC = `entry`, then
    /// LR, R12, R3..R0 zeroed), the EXC_RETURN word, and zeroed R11..R4.
    pub(crate) fn push_initial_frame(&mut self, entry: usize) {
        self.push(DEFAULT_XPSR);
        self.push(entry as u32);
        for _ in 0..6 {
            self.push(0);
        }
        // basic frame: the task starts without FPU context
        self.push(EXC_RETURN_THREAD_PSP);
        for _ in 0..8 {
            self.push(0);
        }
    }

    /// The stack pointer after the pushes so far
    pub(crate) fn current(&self) -> *mut u32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_frame_layout() {
        let mut memory = [0u32; 32];
        let top = unsafe { memory.as_mut_ptr().add(memory.len()) };
        let mut pusher = unsafe { StackPusher::new(top) };
        pusher.push_initial_frame(0x0800_1235);
        let sp = pusher.current();
        assert_eq!(unsafe { top.offset_from(sp) }, INITIAL_FRAME_WORDS as isize);
        // R4..R11, then EXC_RETURN, then R0 of the hardware frame
        assert_eq!(memory[32 - INITIAL_FRAME_WORDS + 8], EXC_RETURN_THREAD_PSP);
        assert_eq!(memory[31], DEFAULT_XPSR);
        assert_eq!(memory[30], 0x0800_1235);
    }
}

// End of File
