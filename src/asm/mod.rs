//! The PendSV context switch, one flavour per floating-point ABI
//!
//! Both flavours index the task table held inline in the
//! [`Scheduler`](crate::Scheduler), shifting a task ID left by
//! `Task::SIZE_BITS` to find its slot, whose first word is the saved stack
//! pointer.

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

#[cfg(any(arm_architecture = "v6-m", arm_architecture = "v8-m.base"))]
compile_error!("twinkle needs an Armv7-M or Armv8-M Mainline core");

#[cfg(arm_abi = "eabi")]
mod eabi;

#[cfg(arm_abi = "eabihf")]
mod eabihf;

// End of File
