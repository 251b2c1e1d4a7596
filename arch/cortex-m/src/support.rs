// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Barrier instructions and interrupt locking.
//!
//! On anything other than a bare-metal Arm target these degrade to compiler
//! and memory fences, which lets the MPU driver run against an in-memory
//! register file in host tests.

#[cfg(all(target_arch = "arm", target_os = "none"))]
use core::arch::asm;

#[cfg(not(all(target_arch = "arm", target_os = "none")))]
use core::sync::atomic::{self, Ordering};

/// Data synchronization barrier: completes all outstanding memory accesses
/// before the next instruction executes.
#[cfg(all(target_arch = "arm", target_os = "none"))]
#[inline(always)]
pub fn dsb() {
    // SAFETY: `dsb` has no operands and no effect besides ordering.
    unsafe {
        asm!("dsb 0xF", options(nostack, preserves_flags));
    }
}

/// Data memory barrier: orders memory accesses before and after it.
#[cfg(all(target_arch = "arm", target_os = "none"))]
#[inline(always)]
pub fn dmb() {
    // SAFETY: `dmb` has no operands and no effect besides ordering.
    unsafe {
        asm!("dmb 0xF", options(nostack, preserves_flags));
    }
}

/// Instruction synchronization barrier: flushes the pipeline so subsequent
/// instructions are fetched with the current memory protection settings.
#[cfg(all(target_arch = "arm", target_os = "none"))]
#[inline(always)]
pub fn isb() {
    // SAFETY: `isb` has no operands and no effect besides ordering.
    unsafe {
        asm!("isb 0xF", options(nostack, preserves_flags));
    }
}

#[cfg(not(all(target_arch = "arm", target_os = "none")))]
pub fn dsb() {
    atomic::fence(Ordering::SeqCst);
}

#[cfg(not(all(target_arch = "arm", target_os = "none")))]
pub fn dmb() {
    atomic::fence(Ordering::SeqCst);
}

#[cfg(not(all(target_arch = "arm", target_os = "none")))]
pub fn isb() {
    atomic::compiler_fence(Ordering::SeqCst);
}

/// Run `f` with interrupts masked, restoring the previous PRIMASK state
/// afterwards.
///
/// Region number selection and the following region register access are two
/// separate bus transactions; an interrupt between them that touches the MPU
/// would observe or modify a different region. Every multi-register access
/// that feeds a decision must happen inside this lock.
#[cfg(all(target_arch = "arm", target_os = "none"))]
pub fn with_interrupts_disabled<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    let primask: u32;
    // SAFETY: reading PRIMASK and masking interrupts only changes the
    // interrupt state, which is restored below. No `nomem` so the compiler
    // keeps MPU accesses inside the critical section.
    unsafe {
        asm!(
            "mrs {}, PRIMASK",
            "cpsid i",
            out(reg) primask,
            options(nostack, preserves_flags),
        );
    }

    let res = f();

    // Only unmask if interrupts were enabled on entry.
    if primask & 1 == 0 {
        // SAFETY: restores the state observed on entry.
        unsafe {
            asm!("cpsie i", options(nostack, preserves_flags));
        }
    }
    res
}

#[cfg(not(all(target_arch = "arm", target_os = "none")))]
pub fn with_interrupts_disabled<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    atomic::compiler_fence(Ordering::SeqCst);
    let res = f();
    atomic::compiler_fence(Ordering::SeqCst);
    res
}
