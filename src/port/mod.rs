//! The architecture layer underneath the scheduler
//!
//! On the target this pends PendSV, waits for interrupts and halts the core.
//! Anywhere else the simulation back end stands in, so the scheduling logic
//! can be driven tick by tick from ordinary tests.

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

#[cfg(target_os = "none")]
mod armv7m;
#[cfg(target_os = "none")]
pub(crate) use self::armv7m::*;

#[cfg(not(target_os = "none"))]
mod sim;
#[cfg(not(target_os = "none"))]
pub(crate) use self::sim::*;

// End of File
