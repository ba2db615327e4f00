//! Build script for twinkle
//!
//! Emits the `arm_abi` and `arm_architecture` cfgs the context-switch code
//! is selected with.

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

/// Entry point to the build script
fn main() {
    arm_targets::process();
}

// End of File
