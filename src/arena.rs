//! Holds the [`Arena`] type, which task stacks are carved from

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use core::sync::atomic::{AtomicUsize, Ordering};

use crate::{Error, Result, UnsafeCell};

/// Something the scheduler can carve task stacks out of
pub trait StackArena: Sync {
    /// Reserve `bytes` of stack, rounded up to a multiple of 8.
    ///
    /// Memory handed out is never given back.
    fn carve(&self, bytes: usize) -> Result<StackRegion>;

    /// How many bytes are still available
    fn remaining(&self) -> usize;
}

/// A block of memory, `LEN` bytes long, handed out as task stacks
///
/// The value of `LEN` must be a multiple of 8, which is checked with an
/// assert.
///
/// We align everything on 8-byte boundaries, as required by AAPCS.
#[repr(C, align(8))]
pub struct Arena<const LEN: usize> {
    /// The memory reserved for the task stacks
    contents: UnsafeCell<[u8; LEN]>,
    /// How many bytes from the start of `contents` are handed out
    used: AtomicUsize,
}

impl<const LEN: usize> Arena<LEN> {
    /// Create a new, empty, arena
    pub const fn new() -> Self {
        assert!(LEN % 8 == 0);
        Self {
            contents: UnsafeCell::new([0u8; LEN]),
            used: AtomicUsize::new(0),
        }
    }
}

impl<const LEN: usize> StackArena for Arena<LEN> {
    fn carve(&self, bytes: usize) -> Result<StackRegion> {
        critical_section::with(|_cs| {
            let used = self.used.load(Ordering::Relaxed);
            let remaining = LEN - used;
            let size = match bytes.checked_next_multiple_of(8) {
                Some(size) if size <= remaining => size,
                _ => {
                    return Err(Error::OutOfStackMemory {
                        requested: bytes,
                        remaining,
                    });
                }
            };
            self.used.store(used + size, Ordering::Relaxed);
            // SAFETY: `used + size <= LEN`, so the region is inside `contents`,
            // and it has not been handed out before.
            let bottom = unsafe { self.contents.get().cast::<u8>().add(used) }.cast::<u32>();
            Ok(StackRegion {
                bottom,
                words: size / 4,
            })
        })
    }

    fn remaining(&self) -> usize {
        LEN - self.used.load(Ordering::Relaxed)
    }
}

/// SAFETY: Our arena only hands out each byte once, and does its bookkeeping
/// inside a critical section, so is thread-safe despite containing an
/// `UnsafeCell`.
unsafe impl<const LEN: usize> Sync for Arena<LEN> {}

impl<const LEN: usize> Default for Arena<LEN> {
    fn default() -> Self {
        Arena::new()
    }
}

/// A piece of an [`Arena`], owned by exactly one task
#[derive(Debug)]
pub struct StackRegion {
    bottom: *mut u32,
    words: usize,
}

impl StackRegion {
    /// The lowest address in the region
    pub fn bottom(&self) -> *mut u32 {
        self.bottom
    }

    /// One past the highest address in the region
    ///
    /// This is where a full-descending stack starts.
    pub fn top(&self) -> *mut u32 {
        // SAFETY: pointing one past the end of the region is allowed
        unsafe { self.bottom.add(self.words) }
    }

    /// Size of the region in 32-bit words
    pub fn words(&self) -> usize {
        self.words
    }
}


// End of File
