//! Task table, tick handling and the choice of what runs next

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use core::sync::atomic::{AtomicBool, AtomicPtr, AtomicU32, AtomicUsize, Ordering};

use critical_section::CriticalSection;

use crate::{Error, Hooks, Result, StackArena, Task, TaskEntryFn, config, port, stack_pusher};

/// Address of the started [`Scheduler`], for the PendSV and SysTick handlers
/// and the free functions in the crate root
pub(crate) static SCHEDULER_PTR: AtomicPtr<Scheduler> = AtomicPtr::new(core::ptr::null_mut());

/// Names one slot of the task table
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TaskId(usize);

impl TaskId {
    /// Reported when no task is current
    const INVALID_ID: usize = usize::MAX;

    /// True when this names no task
    pub const fn is_invalid(self) -> bool {
        self.0 == Self::INVALID_ID
    }

    /// The ID that names no task
    pub(crate) const fn invalid() -> TaskId {
        TaskId(Self::INVALID_ID)
    }

    /// The slot this task occupies in the task table
    pub const fn index(self) -> usize {
        self.0
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for TaskId {
    fn format(&self, fmt: defmt::Formatter) {
        if self.is_invalid() {
            defmt::write!(fmt, "T---");
        } else {
            defmt::write!(fmt, "T{=usize:03}", self.0);
        }
    }
}

impl core::fmt::Display for TaskId {
    fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.is_invalid() {
            write!(fmt, "T---")
        } else {
            write!(fmt, "T{:03}", self.0)
        }
    }
}

/// A pre-emptive, priority-based, task-switching scheduler
///
/// The highest priority ready task runs. Tasks of equal priority are time
/// sliced in a round-robin fashion, one scheduler tick each. Tasks leave the
/// ready set by sleeping, and come back when the tick count reaches their
/// wake-up time. An idle task, at the lowest priority, soaks up the rest.
///
/// The Arm hardware will push {xPSR, PC, LR, R12, R3, R2, R1, R0} to PSP
/// when an exception occurs. We then push the rest (EXC_RETURN and R11 to
/// R4, plus S31 to S16 if the task used the FPU).
#[repr(C)]
pub struct Scheduler {
    /// Slot whose context is live on the CPU
    current_task: AtomicUsize,
    /// Slot PendSV restores on its next run
    next_task: AtomicUsize,
    /// A fixed table of task slots, filled from the front
    tasks: [Task; config::MAX_TASKS],
    /// How many slots of `tasks` are in use
    task_count: AtomicUsize,
    /// Which slot holds the idle task
    idle_task: AtomicUsize,
    /// Ticks since `launch`, wrapping
    ticks: AtomicU32,
    /// Set once, by `launch`
    started: AtomicBool,
    /// Set once, on a fatal fault. Nothing gets scheduled afterwards.
    halted: AtomicBool,
    /// Where task stacks come from
    arena: &'static dyn StackArena,
    /// Who we tell about idle time, ticks and faults
    hooks: &'static dyn Hooks,
}

impl Scheduler {
    /// Byte offset of `current_task`, used by PendSV
    #[cfg(target_os = "none")]
    pub(crate) const CURRENT_TASK_OFFSET: usize = core::mem::offset_of!(Scheduler, current_task);

    /// Byte offset of `next_task`, used by PendSV
    #[cfg(target_os = "none")]
    pub(crate) const NEXT_TASK_OFFSET: usize = core::mem::offset_of!(Scheduler, next_task);

    /// Byte offset of `tasks`, used by PendSV
    #[cfg(target_os = "none")]
    pub(crate) const TASKS_OFFSET: usize = core::mem::offset_of!(Scheduler, tasks);

    /// Bytes of stack a task's saved context can occupy, with two words spare
    #[cfg(not(arm_abi = "eabihf"))]
    pub(crate) const MIN_CONTEXT_SIZE: usize = (4 * stack_pusher::INITIAL_FRAME_WORDS) + 8;

    /// Bytes of stack a task's saved context can occupy, with two words spare
    ///
    /// On top of the integer context an extended frame adds S0..S15, FPSCR
    /// and a reserved word, and PendSV stacks S16..S31.
    #[cfg(arm_abi = "eabihf")]
    pub(crate) const MIN_CONTEXT_SIZE: usize =
        (4 * (stack_pusher::INITIAL_FRAME_WORDS + 34)) + 8;

    /// The smallest stack, in bytes, [`Scheduler::spawn`] accepts
    pub const MIN_STACK_SIZE: usize = Self::MIN_CONTEXT_SIZE + (4 * config::STACK_GUARD_WORDS);

    /// An empty scheduler, not yet started
    ///
    /// Task stacks are carved out of `arena`, and `hooks` are called at the
    /// lifecycle points described on [`Hooks`].
    pub const fn new(arena: &'static dyn StackArena, hooks: &'static dyn Hooks) -> Scheduler {
        Scheduler {
            current_task: AtomicUsize::new(TaskId::INVALID_ID),
            next_task: AtomicUsize::new(0),
            tasks: [const { Task::empty() }; config::MAX_TASKS],
            task_count: AtomicUsize::new(0),
            idle_task: AtomicUsize::new(TaskId::INVALID_ID),
            ticks: AtomicU32::new(0),
            started: AtomicBool::new(false),
            halted: AtomicBool::new(false),
            arena,
            hooks,
        }
    }

    /// Create a task
    ///
    /// The task gets a stack of `stack_words` 32-bit words from the arena and
    /// is ready to run as soon as the scheduler picks it.
    pub fn try_spawn(
        &self,
        name: &'static str,
        entry_fn: TaskEntryFn,
        stack_words: usize,
        priority: u8,
    ) -> Result<TaskId> {
        let Some(stack_bytes) = stack_words.checked_mul(4) else {
            return Err(Error::OutOfStackMemory {
                requested: usize::MAX,
                remaining: self.arena.remaining(),
            });
        };
        if stack_bytes < Self::MIN_STACK_SIZE {
            return Err(Error::StackTooSmall {
                requested: stack_bytes,
                minimum: Self::MIN_STACK_SIZE,
            });
        }
        critical_section::with(|_cs| {
            let slot = self.task_count.load(Ordering::Relaxed);
            if slot >= self.tasks.len() {
                return Err(Error::NoFreeTaskSlot);
            }
            let region = self.arena.carve(stack_bytes)?;
            debug!(
                "Init task {=str} in slot {=usize}, entry @ 0x{=usize:08x}, stack @ 0x{=usize:08x}",
                name,
                slot,
                entry_fn as usize,
                region.top() as usize
            );
            // SAFETY: slots at or above `task_count` are free and invisible to
            // the scheduler, and the arena gave us the region for keeps
            unsafe {
                self.tasks[slot].install(name, entry_fn, priority, region);
            }
            // Publishing the slot is the last thing we do
            self.task_count.store(slot + 1, Ordering::Release);
            Ok(TaskId(slot))
        })
    }

    /// Create a task, or halt trying
    ///
    /// If there is no task slot or no stack memory left, the allocation
    /// failure hook is called and does not return.
    ///
    /// # Panics
    ///
    /// If the stack is too small to ever run the task.
    pub fn spawn(
        &self,
        name: &'static str,
        entry_fn: TaskEntryFn,
        stack_words: usize,
        priority: u8,
    ) -> TaskId {
        match self.try_spawn(name, entry_fn, stack_words, priority) {
            Ok(task_id) => task_id,
            Err(Error::NoFreeTaskSlot | Error::OutOfStackMemory { .. }) => self.alloc_fault(),
            Err(e) => panic!("Cannot spawn {}: {}", name, e),
        }
    }

    /// Hand the CPU over to the tasks and never come back
    ///
    /// Call it once, at the end of `main`, in privileged Thread mode on the
    /// main stack. Hardware set-up and the initial spawns must be finished.
    /// SysTick is programmed to fire every `systicks_per_sched_tick` core
    /// clocks.
    #[cfg(target_os = "none")]
    pub fn start(
        &'static self,
        mut syst: cortex_m::peripheral::SYST,
        mut scb: cortex_m::peripheral::SCB,
        systicks_per_sched_tick: u32,
    ) -> ! {
        use cortex_m::peripheral::{scb::SystemHandler, syst::SystClkSource};

        self.launch();

        // remember where this object is - it is 'static so it cannot move
        let self_addr = self as *const Scheduler as *mut Scheduler;
        info!("Scheduler @ {=usize:08x}", self_addr as usize);
        SCHEDULER_PTR.store(self_addr, Ordering::Release);

        // SAFETY: no task is running yet, so no priority-based critical
        // section can be broken by moving these exceptions around
        unsafe {
            scb.set_priority(SystemHandler::PendSV, config::KERNEL_EXCEPTION_PRIORITY);
            scb.set_priority(SystemHandler::SysTick, config::KERNEL_EXCEPTION_PRIORITY);
        }

        // SysTick reads SCHEDULER_PTR, so it is stored above
        syst.set_reload(systicks_per_sched_tick - 1);
        syst.set_clock_source(SystClkSource::Core);
        syst.clear_current();
        syst.enable_counter();
        syst.enable_interrupt();

        // PendSV restores the task `launch` picked and we never return here
        debug!("Pending the first switch");
        port::pend_switch(self);
        unreachable!();
    }

    /// Run the scheduler without any hardware
    ///
    /// The first task is made current immediately. From then on, call
    /// [`Scheduler::sched_tick`] to advance time, and [`crate::delay`] or
    /// [`Scheduler::sleep_current`] on behalf of whichever task is current.
    ///
    /// The crate's free functions act on the scheduler started last, so a
    /// process driving them should only run one simulation at a time.
    #[cfg(not(target_os = "none"))]
    pub fn start_simulated(&'static self) {
        self.launch();
        SCHEDULER_PTR.store(self as *const Scheduler as *mut Scheduler, Ordering::Release);
        port::pend_switch(self);
    }

    /// Add the idle task and choose the first task to run
    fn launch(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            panic!("Tried to re-start scheduler!");
        }
        let idle = self.spawn(
            "idle",
            idle_task,
            config::IDLE_STACK_WORDS,
            config::IDLE_PRIORITY,
        );
        self.idle_task.store(idle.0, Ordering::Relaxed);
        match critical_section::with(|cs| self.pick_next_task(cs)) {
            TaskSelection::NewTask(task_id) => {
                self.next_task.store(task_id.0, Ordering::Relaxed);
            }
            TaskSelection::CurrentTask | TaskSelection::NoTasks => {
                unreachable!("the idle task is always ready");
            }
        }
    }

    /// Call periodically, to advance time and adjust which task should run
    /// next
    ///
    /// Wakes any task whose delay has expired, calls the tick hook, checks
    /// the current task's stack guard and then time-slices.
    ///
    /// On target the `SysTick` handler calls this.
    pub fn sched_tick(&self) {
        if !self.started.load(Ordering::Relaxed) || self.halted.load(Ordering::Relaxed) {
            return;
        }

        let now = critical_section::with(|_cs| {
            let now = self.ticks.load(Ordering::Relaxed).wrapping_add(1);
            self.ticks.store(now, Ordering::Relaxed);
            for task in self.live_tasks() {
                task.wake_if_due(now);
            }
            now
        });
        trace!("Tick {=u32}", now);

        self.hooks.on_tick(now);

        let current = self.current_task.load(Ordering::Relaxed);
        if current != TaskId::INVALID_ID {
            self.check_stack(current);
        }

        critical_section::with(|cs| self.reschedule(cs));
    }

    /// Put the current task to sleep for `ticks` scheduler ticks, and switch
    /// to something else
    ///
    /// Zero ticks just offers the processor to another task of the same
    /// priority.
    pub fn sleep_current(&self, ticks: u32) {
        let current = self.current_task.load(Ordering::Relaxed);
        if current == TaskId::INVALID_ID || self.halted.load(Ordering::Relaxed) {
            return;
        }
        trace!("- sleep_current({=u32}) on T{=usize:03}", ticks, current);
        self.check_stack(current);

        // no tick may land between the delay, the pick and the pend
        let selection = critical_section::with(|cs| {
            if ticks > 0 {
                let wake_at = self.ticks.load(Ordering::Relaxed).wrapping_add(ticks);
                self.tasks[current].delay_until(wake_at);
            }
            self.reschedule(cs)
        });
        if selection == TaskSelection::NoTasks {
            port::wait_for_interrupt();
        }
    }

    /// Ticks since start
    pub fn now(&self) -> u32 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// The task whose context is live
    pub fn current_task_id(&self) -> TaskId {
        TaskId(self.current_task.load(Ordering::Relaxed))
    }

    /// Get the ID of the idle task, once the scheduler has started
    pub fn idle_task_id(&self) -> TaskId {
        TaskId(self.idle_task.load(Ordering::Relaxed))
    }

    /// Look at a task
    pub fn task(&self, task_id: TaskId) -> Option<&Task> {
        self.live_tasks().get(task_id.0)
    }

    /// Has a fatal fault stopped the scheduler?
    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::Relaxed)
    }

    /// One turn of the idle task's loop
    pub fn run_idle_hook(&self) {
        self.hooks.on_idle();
    }

    /// The started scheduler, if there is one
    pub(crate) fn get_scheduler() -> Option<&'static Scheduler> {
        let scheduler_ptr = SCHEDULER_PTR.load(Ordering::Acquire);
        // SAFETY: `start` and `start_simulated` store the address of a
        // `&'static Scheduler` here and nothing else writes it
        unsafe { scheduler_ptr.as_ref() }
    }

    /// What PendSV does, minus the register shuffling
    #[cfg(not(target_os = "none"))]
    pub(crate) fn commit_switch(&self) {
        let next = self.next_task.load(Ordering::Relaxed);
        debug_assert!(
            self.tasks[next].is_ready(),
            "switching to T{:03}, which is not ready",
            next
        );
        self.current_task.store(next, Ordering::Relaxed);
    }

    /// The slots that hold tasks
    fn live_tasks(&self) -> &[Task] {
        &self.tasks[..self.task_count.load(Ordering::Acquire)]
    }

    /// Pick the next task and, if it is a different one, pend the switch
    fn reschedule(&self, cs: CriticalSection<'_>) -> TaskSelection {
        let selection = self.pick_next_task(cs);
        if let TaskSelection::NewTask(task_id) = selection {
            self.next_task.store(task_id.0, Ordering::Relaxed);
            port::pend_switch(self);
        }
        selection
    }

    /// Check the guard words of a task, and stop everything if they are gone
    fn check_stack(&self, idx: usize) {
        let task = &self.tasks[idx];
        if !task.guard_intact() {
            self.halted.store(true, Ordering::SeqCst);
            self.hooks.on_stack_fault(TaskId(idx), task.name());
        }
    }

    /// Stop everything because a spawn could not get its memory
    fn alloc_fault(&self) -> ! {
        self.halted.store(true, Ordering::SeqCst);
        self.hooks.on_alloc_fault()
    }

    /// Select the next task
    ///
    /// The highest priority ready task wins. Between tasks of equal priority
    /// we start looking after the current task, so they take turns.
    ///
    /// Doesn't trigger a task switch. Use `reschedule` for that.
    fn pick_next_task(&self, _cs: CriticalSection<'_>) -> TaskSelection {
        trace!("> picking a task");
        let task_sel = {
            let tasks = self.live_tasks();
            let num_tasks = tasks.len();
            let current_task = self.current_task.load(Ordering::Relaxed);
            // scan starts just past the current slot so equals take turns
            let first = if current_task == TaskId::INVALID_ID {
                0
            } else {
                current_task + 1
            };
            let mut selected: Option<(usize, u8)> = None;
            for offset in 0..num_tasks {
                let idx = (first + offset) % num_tasks;
                let task = &tasks[idx];
                // is this a task we can run right now, and better than what
                // we have?
                if task.is_ready()
                    && selected.is_none_or(|(_, priority)| task.priority() > priority)
                {
                    selected = Some((idx, task.priority()));
                }
            }

            match selected {
                Some((idx, _)) if idx == current_task => TaskSelection::CurrentTask,
                Some((idx, _)) => TaskSelection::NewTask(TaskId(idx)),
                None => TaskSelection::NoTasks,
            }
        };

        trace!("< picked {}", task_sel);
        task_sel
    }
}

/// The task that runs when nothing else can
fn idle_task() -> ! {
    loop {
        match Scheduler::get_scheduler() {
            Some(scheduler) => scheduler.run_idle_hook(),
            None => port::wait_for_interrupt(),
        }
    }
}

/// Outcome of [`Scheduler::pick_next_task`]
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum TaskSelection {
    /// Switch to this one
    NewTask(TaskId),
    /// Keep running the current task
    CurrentTask,
    /// Nothing is ready
    NoTasks,
}


// End of File
