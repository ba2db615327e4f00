//! Error types for twinkle

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use core::fmt;

/// Result type alias for fallible twinkle operations
pub type Result<T> = core::result::Result<T, Error>;

/// Everything that can go wrong before the scheduler is running
///
/// Faults that happen once tasks run (stack overflow, allocation failure)
/// are not reported through this type. They go to the
/// [`Hooks`](crate::Hooks) and halt the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The bring-up sequence was asked to run a second time
    AlreadyInitialised,
    /// The clock hardware did not produce the planned frequency
    ClockMismatch {
        /// What the PLL plan says we should get, in Hz
        expected: u32,
        /// What the hardware reported, in Hz
        actual: u32,
    },
    /// The system clock frequency can only be recorded once
    ClockAlreadyRecorded,
    /// Every slot in the task table is taken
    NoFreeTaskSlot,
    /// The stack arena cannot satisfy the request
    OutOfStackMemory {
        /// Bytes asked for
        requested: usize,
        /// Bytes still available
        remaining: usize,
    },
    /// The requested stack cannot even hold the initial task frame
    StackTooSmall {
        /// Bytes asked for
        requested: usize,
        /// Smallest stack we accept, in bytes
        minimum: usize,
    },
    /// Some of the requested output bits already belong to somebody else
    BitsInUse {
        /// The bits that overlap an existing claim
        mask: u32,
    },
    /// A peripheral was needed by a bring-up stage but had already been used
    PeripheralMissing(&'static str),
    /// The serial console could not be configured
    Console,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyInitialised => write!(f, "bring-up already ran"),
            Self::ClockMismatch { expected, actual } => {
                write!(f, "clock is {} Hz, planned {} Hz", actual, expected)
            }
            Self::ClockAlreadyRecorded => write!(f, "system clock already recorded"),
            Self::NoFreeTaskSlot => write!(f, "no free task slot"),
            Self::OutOfStackMemory {
                requested,
                remaining,
            } => write!(
                f,
                "stack arena exhausted ({} bytes requested, {} left)",
                requested, remaining
            ),
            Self::StackTooSmall { requested, minimum } => write!(
                f,
                "stack of {} bytes is below the {} byte minimum",
                requested, minimum
            ),
            Self::BitsInUse { mask } => write!(f, "output bits {:#010x} already claimed", mask),
            Self::PeripheralMissing(name) => write!(f, "peripheral {} already taken", name),
            Self::Console => write!(f, "console configuration rejected"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::AlreadyInitialised => defmt::write!(fmt, "bring-up already ran"),
            Self::ClockMismatch { expected, actual } => defmt::write!(
                fmt,
                "clock is {=u32} Hz, planned {=u32} Hz",
                actual,
                expected
            ),
            Self::ClockAlreadyRecorded => defmt::write!(fmt, "system clock already recorded"),
            Self::NoFreeTaskSlot => defmt::write!(fmt, "no free task slot"),
            Self::OutOfStackMemory {
                requested,
                remaining,
            } => defmt::write!(
                fmt,
                "stack arena exhausted ({=usize} bytes requested, {=usize} left)",
                requested,
                remaining
            ),
            Self::StackTooSmall { requested, minimum } => defmt::write!(
                fmt,
                "stack of {=usize} bytes is below the {=usize} byte minimum",
                requested,
                minimum
            ),
            Self::BitsInUse { mask } => {
                defmt::write!(fmt, "output bits 0x{=u32:08x} already claimed", mask)
            }
            Self::PeripheralMissing(name) => {
                defmt::write!(fmt, "peripheral {=str} already taken", name)
            }
            Self::Console => defmt::write!(fmt, "console configuration rejected"),
        }
    }
}

// End of File
