// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Data structure for storing compile-time configuration options in the kernel.
//!
//! The rationale for using these configuration options is that they can be
//! used to conditionally enable or disable certain code paths, while keeping
//! them visible to the compiler (so that dead code is still type checked).
//! The values are set through the kernel crate's cargo features, see
//! `kernel/Cargo.toml`.

/// Data structure holding compile-time configuration options.
///
/// To change the configuration, modify the relevant values in the `CONFIG`
/// constant object defined at the end of this file.
pub struct Config {
    /// Whether the MPU driver should log every region it programs.
    ///
    /// This prints the index, RBAR and RASR values of each region written to
    /// the hardware, which is the first thing to look at when a boot fails on
    /// a misconfigured memory map.
    pub debug_mpu: bool,
}

/// A unique instance of `Config` where compile-time configuration options are
/// defined. These options are available to the kernel and to the architecture
/// crates that implement its platform traits.
pub const CONFIG: Config = Config {
    debug_mpu: cfg!(feature = "debug_mpu"),
};
