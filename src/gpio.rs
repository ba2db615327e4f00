//! Shared output ports, split into bits that each have one owner

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use core::sync::atomic::{AtomicU32, Ordering};

use crate::{Error, Result};

/// A port of output bits that can be written a few bits at a time
pub trait OutputPort: Sync {
    /// Drive the bits in `mask` to the matching bits of `value`, and leave
    /// every other bit alone
    ///
    /// Must be atomic with respect to other callers: on the target, use a
    /// set/reset register rather than read-modify-write.
    fn write_masked(&self, mask: u32, value: u32);
}

/// Hands out the bits of an [`OutputPort`], at most one owner per bit
pub struct PortBits<P> {
    port: P,
    claimed: AtomicU32,
}

impl<P: OutputPort> PortBits<P> {
    /// Wrap a port. No bits are claimed yet.
    pub const fn new(port: P) -> PortBits<P> {
        PortBits {
            port,
            claimed: AtomicU32::new(0),
        }
    }

    /// Take ownership of the bits in `mask`
    ///
    /// Fails with [`Error::BitsInUse`], naming the overlap, if any of them
    /// already have an owner.
    pub fn claim(&self, mask: u32) -> Result<OutputBits<'_, P>> {
        let mut current = self.claimed.load(Ordering::Relaxed);
        loop {
            let overlap = current & mask;
            if overlap != 0 {
                return Err(Error::BitsInUse { mask: overlap });
            }
            match self.claimed.compare_exchange_weak(
                current,
                current | mask,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
        debug!("claimed bits 0x{=u32:02x}", mask);
        Ok(OutputBits { owner: self, mask })
    }

    /// Which bits have an owner right now
    pub fn claimed(&self) -> u32 {
        self.claimed.load(Ordering::Relaxed)
    }

    /// The port underneath
    pub fn port(&self) -> &P {
        &self.port
    }
}

/// The right to drive some bits of a port
///
/// Dropping it gives the bits back.
pub struct OutputBits<'a, P: OutputPort> {
    owner: &'a PortBits<P>,
    mask: u32,
}

impl<P: OutputPort> OutputBits<'_, P> {
    /// The bits this handle owns
    pub fn mask(&self) -> u32 {
        self.mask
    }

    /// Drive the bits in `mask` to the matching bits of `value`
    ///
    /// Bits outside the ones this handle owns are ignored.
    pub fn write(&self, mask: u32, value: u32) {
        let mask = mask & self.mask;
        if mask != 0 {
            self.owner.port.write_masked(mask, value & mask);
        }
    }

    /// Drive every owned bit high
    pub fn set(&self) {
        self.write(self.mask, u32::MAX);
    }

    /// Drive every owned bit low
    pub fn clear(&self) {
        self.write(self.mask, 0);
    }
}

impl<P: OutputPort> Drop for OutputBits<'_, P> {
    fn drop(&mut self) {
        self.owner
            .claimed
            .fetch_and(!self.mask, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingPort {
        level: Mutex<u32>,
        writes: Mutex<Vec<(u32, u32)>>,
    }

    impl OutputPort for RecordingPort {
        fn write_masked(&self, mask: u32, value: u32) {
            let mut level = self.level.lock().unwrap();
            *level = (*level & !mask) | (value & mask);
            self.writes.lock().unwrap().push((mask, value));
        }
    }

    #[test]
    fn overlapping_claims_are_refused() {
        let port = PortBits::new(RecordingPort::default());
        let _red = port.claim(0x02).unwrap();
        let _green = port.claim(0x08).unwrap();
        assert_eq!(port.claim(0x0A).err(), Some(Error::BitsInUse { mask: 0x0A }));
        assert_eq!(port.claim(0x06).err(), Some(Error::BitsInUse { mask: 0x02 }));
        assert_eq!(port.claimed(), 0x0A);
    }

    #[test]
    fn writes_stay_inside_the_claim() {
        let port = PortBits::new(RecordingPort::default());
        let red = port.claim(0x02).unwrap();
        let green = port.claim(0x08).unwrap();

        red.set();
        green.write(0xFF, 0xFF);
        red.write(0x08, 0x00);
        red.clear();

        assert_eq!(
            *port.port.writes.lock().unwrap(),
            vec![(0x02, 0x02), (0x08, 0x08), (0x02, 0x00)]
        );
        assert_eq!(*port.port.level.lock().unwrap(), 0x08);
    }

    #[test]
    fn dropping_releases_the_bits() {
        let port = PortBits::new(RecordingPort::default());
        let blue = port.claim(0x04).unwrap();
        assert_eq!(blue.mask(), 0x04);
        drop(blue);
        assert_eq!(port.claimed(), 0);
        assert!(port.claim(0x04).is_ok());
    }
}

// End of File
