//! One slot of the task table

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use core::sync::atomic::{AtomicPtr, AtomicU8, AtomicU32, Ordering};

use crate::{StackPusher, StackRegion, UnsafeCell, config};

/// The function a task starts in. Tasks never finish.
pub type TaskEntryFn = fn() -> !;

/// What a task is doing, as far as the scheduler is concerned
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum TaskState {
    /// The slot holds no task
    Free = 0,
    /// The task can run
    Ready = 1,
    /// The task is asleep until its wake-up tick
    Delayed = 2,
}

impl TaskState {
    const fn from_u8(value: u8) -> TaskState {
        match value {
            1 => TaskState::Ready,
            2 => TaskState::Delayed,
            _ => TaskState::Free,
        }
    }
}

/// A task slot and the stack pointer of its saved context
///
/// The PendSV handler indexes the task table by shifting the task ID left by
/// `Task::SIZE_BITS`, and expects to find the saved stack pointer in the
/// first word. Hence the C layout and the power-of-two alignment.
#[repr(C, align(32))]
pub struct Task {
    /// The saved stack pointer, while the task is not running
    stack: AtomicPtr<u32>,
    /// The lowest word of the task's stack, where the guard starts
    stack_bottom: AtomicPtr<u32>,
    /// Only written by `install`, before the task is visible to the scheduler
    name: UnsafeCell<&'static str>,
    /// The tick on which a delayed task becomes ready again
    wake_at: AtomicU32,
    /// Larger numbers run first
    priority: AtomicU8,
    /// A [`TaskState`]
    state: AtomicU8,
}

const _: () = assert!(core::mem::size_of::<Task>().is_power_of_two());

impl Task {
    /// log2 of the size of a [`Task`], in bytes
    #[cfg(target_os = "none")]
    pub(crate) const SIZE_BITS: u32 = core::mem::size_of::<Task>().trailing_zeros();

    /// An unused task slot
    pub(crate) const fn empty() -> Task {
        Task {
            stack: AtomicPtr::new(core::ptr::null_mut()),
            stack_bottom: AtomicPtr::new(core::ptr::null_mut()),
            name: UnsafeCell::new(""),
            wake_at: AtomicU32::new(0),
            priority: AtomicU8::new(0),
            state: AtomicU8::new(TaskState::Free as u8),
        }
    }

    /// Fill this slot with a new task, ready to run
    ///
    /// Writes the stack guard at the bottom of `region` and the initial
    /// exception frame at the top of it.
    ///
    /// # Safety
    ///
    /// The slot must be free and not yet visible to the scheduler. `region`
    /// must be owned by this task alone and hold at least the guard plus
    /// the initial frame.
    pub(crate) unsafe fn install(
        &self,
        name: &'static str,
        entry_fn: TaskEntryFn,
        priority: u8,
        region: StackRegion,
    ) {
        let bottom = region.bottom();
        for idx in 0..config::STACK_GUARD_WORDS {
            // SAFETY: the caller promised the region is big enough
            unsafe {
                bottom.add(idx).write_volatile(config::STACK_GUARD_PATTERN);
            }
        }

        // SAFETY: the caller promised the region is big enough
        let mut stack_pusher = unsafe { StackPusher::new(region.top()) };
        stack_pusher.push_initial_frame(entry_fn as usize);

        // SAFETY: nobody else can see this slot yet
        unsafe {
            *self.name.get() = name;
        }
        self.stack.store(stack_pusher.current(), Ordering::Relaxed);
        self.stack_bottom.store(bottom, Ordering::Relaxed);
        self.priority.store(priority, Ordering::Relaxed);
        self.wake_at.store(0, Ordering::Relaxed);
        self.state.store(TaskState::Ready as u8, Ordering::Release);
    }

    /// Get the name this task was given
    pub fn name(&self) -> &'static str {
        // SAFETY: only written by `install`, before the task could be seen
        unsafe { *self.name.get() }
    }

    /// Get the priority of this task
    pub fn priority(&self) -> u8 {
        self.priority.load(Ordering::Relaxed)
    }

    /// Get the scheduling state of this task
    pub fn state(&self) -> TaskState {
        TaskState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Can this task be picked to run?
    pub fn is_ready(&self) -> bool {
        self.state() == TaskState::Ready
    }

    /// Put the task to sleep until the tick count reaches `wake_at`
    pub(crate) fn delay_until(&self, wake_at: u32) {
        self.wake_at.store(wake_at, Ordering::Relaxed);
        self.state.store(TaskState::Delayed as u8, Ordering::Release);
    }

    /// Make the task ready if it is delayed and `now` has reached its
    /// wake-up tick
    ///
    /// Copes with the tick count wrapping, as long as no delay is longer
    /// than half the tick range.
    pub(crate) fn wake_if_due(&self, now: u32) -> bool {
        if self.state() != TaskState::Delayed {
            return false;
        }
        let wake_at = self.wake_at.load(Ordering::Relaxed);
        if (now.wrapping_sub(wake_at) as i32) >= 0 {
            self.state.store(TaskState::Ready as u8, Ordering::Release);
            true
        } else {
            false
        }
    }

    /// Are the guard words at the bottom of the stack still untouched?
    pub fn guard_intact(&self) -> bool {
        let bottom = self.stack_bottom.load(Ordering::Relaxed);
        if bottom.is_null() {
            return true;
        }
        (0..config::STACK_GUARD_WORDS).all(|idx| {
            // SAFETY: `install` wrote the guard here, and the region belongs
            // to this task for ever
            unsafe { bottom.add(idx).read_volatile() == config::STACK_GUARD_PATTERN }
        })
    }

    /// The lowest address of this task's stack
    pub fn stack_bottom(&self) -> *mut u32 {
        self.stack_bottom.load(Ordering::Relaxed)
    }
}

/// SAFETY: every field is atomic except `name`, which is only written before
/// the task is published to the scheduler
unsafe impl Sync for Task {}

// End of File
