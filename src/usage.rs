//! CPU usage measurement
//!
//! The idle hook reports how many timer cycles it spent asleep, and the tick
//! hook closes a measurement window every so often. Whatever was not spent
//! asleep counts as busy.
//!
//! The published figure is a percentage in 16.16 fixed point, so
//! `25 << 16` means a quarter of the processor was in use.

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use core::sync::atomic::{AtomicU32, Ordering};

/// One hundred percent, in 16.16 fixed point
pub const FULL_SCALE: u32 = 100 << 16;

/// Tracks busy time over a window of free-running timer cycles
///
/// `record_sleep` is for the idle path, `sample` is for the tick hook, and
/// anyone may read the published value.
pub struct CpuUsage {
    window_start: AtomicU32,
    asleep: AtomicU32,
    published: AtomicU32,
}

impl CpuUsage {
    /// Nothing measured yet. Reads as 0%.
    pub const fn new() -> CpuUsage {
        CpuUsage {
            window_start: AtomicU32::new(0),
            asleep: AtomicU32::new(0),
            published: AtomicU32::new(0),
        }
    }

    /// Begin the first window at `now_cycles`
    pub fn restart(&self, now_cycles: u32) {
        self.asleep.store(0, Ordering::Relaxed);
        self.window_start.store(now_cycles, Ordering::Relaxed);
    }

    /// Add some cycles spent asleep to the current window
    pub fn record_sleep(&self, cycles: u32) {
        self.asleep.fetch_add(cycles, Ordering::Relaxed);
    }

    /// Close the current window at `now_cycles`, publish its busy
    /// percentage, and start the next window
    ///
    /// The timer may wrap between samples, but not twice.
    pub fn sample(&self, now_cycles: u32) -> u32 {
        let start = self.window_start.swap(now_cycles, Ordering::Relaxed);
        let elapsed = now_cycles.wrapping_sub(start);
        let asleep = self.asleep.swap(0, Ordering::Relaxed).min(elapsed);
        let busy = if elapsed == 0 {
            0
        } else {
            let busy = u64::from(elapsed - asleep) * u64::from(FULL_SCALE) / u64::from(elapsed);
            busy as u32
        };
        self.published.store(busy, Ordering::Relaxed);
        busy
    }

    /// Busy percentage of the last closed window, in 16.16 fixed point
    pub fn percent(&self) -> u32 {
        self.published.load(Ordering::Relaxed)
    }

    /// Busy percentage of the last closed window, rounded down
    pub fn whole_percent(&self) -> u32 {
        self.percent() >> 16
    }
}

impl Default for CpuUsage {
    fn default() -> Self {
        CpuUsage::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Ten 1 ms ticks at 40 MHz
    const WINDOW: u32 = 400_000;

    #[test]
    fn quarter_busy() {
        let usage = CpuUsage::new();
        usage.restart(1_000);
        usage.record_sleep(100_000);
        usage.record_sleep(200_000);
        assert_eq!(usage.sample(1_000 + WINDOW), 25 << 16);
        assert_eq!(usage.whole_percent(), 25);
    }

    #[test]
    fn windows_do_not_leak_into_each_other() {
        let usage = CpuUsage::new();
        usage.record_sleep(WINDOW);
        assert_eq!(usage.sample(WINDOW), 0);
        // nothing slept in the second window
        assert_eq!(usage.sample(2 * WINDOW), FULL_SCALE);
    }

    #[test]
    fn copes_with_timer_wrap() {
        let usage = CpuUsage::new();
        usage.restart(u32::MAX - 99_999);
        usage.record_sleep(WINDOW / 2);
        assert_eq!(usage.sample(WINDOW - 100_000), 50 << 16);
    }

    #[test]
    fn empty_or_oversubscribed_windows_are_clamped() {
        let usage = CpuUsage::new();
        usage.restart(5);
        assert_eq!(usage.sample(5), 0);
        usage.record_sleep(WINDOW * 2);
        assert_eq!(usage.sample(5 + WINDOW), 0);
        assert_eq!(usage.percent(), 0);
    }
}

// End of File
