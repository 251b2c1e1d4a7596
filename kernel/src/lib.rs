// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Core kernel interfaces for memory protection.
//!
//! This crate holds the hardware-independent side of memory protection: the
//! partition descriptors the kernel hands to an MPU, the [`platform::mpu::MPU`]
//! trait that architecture crates implement, and the small set of utilities
//! those implementations share.
//!
//! Architecture crates (for example `cortexm`) provide the implementation;
//! the boot sequence and the memory-domain code only ever talk to the trait.

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod platform;
pub mod utilities;
