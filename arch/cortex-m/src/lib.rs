// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Generic support for ARMv7-M cores with a PMSAv7 memory protection unit.

#![cfg_attr(not(test), no_std)]

pub mod mpu;
pub mod support;
