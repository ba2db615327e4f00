//! The system clock: how we plan it, and where we remember it

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use core::sync::atomic::{AtomicU32, Ordering};

use crate::{Error, Result};

/// Which oscillator feeds the PLL
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockSource {
    /// The chip's own RC oscillator
    Internal,
    /// A crystal or clock input, running at `hz`
    External {
        /// Oscillator frequency in Hz
        hz: u32,
    },
}

/// The system clock a board asks for
///
/// Only the source and the target frequency are fixed here. The PLL
/// dividers that get from one to the other are the HAL's choice, and the
/// frequency it actually reaches is checked against `sysclk_hz` during
/// bring-up.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockPlan {
    /// Where the clock comes from
    pub source: ClockSource,
    /// The system clock to reach, in Hz
    pub sysclk_hz: u32,
}

/// The system clock frequency, written once during bring-up
pub struct SystemClock {
    hz: AtomicU32,
}

impl SystemClock {
    /// Not yet recorded. Reads as zero.
    pub const fn new() -> SystemClock {
        SystemClock {
            hz: AtomicU32::new(0),
        }
    }

    /// Remember the system clock frequency
    ///
    /// Only the first call succeeds.
    pub fn record(&self, hz: u32) -> Result<()> {
        self.hz
            .compare_exchange(0, hz, Ordering::AcqRel, Ordering::Relaxed)
            .map(|_| ())
            .map_err(|_| Error::ClockAlreadyRecorded)
    }

    /// The recorded frequency in Hz, or zero if nothing is recorded yet
    pub fn hz(&self) -> u32 {
        self.hz.load(Ordering::Acquire)
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        SystemClock::new()
    }
}


// End of File
