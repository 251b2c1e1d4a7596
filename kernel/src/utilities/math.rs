// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Helper functions for common mathematical operations.

/// Log base 2 of the smallest power of two that is `>= num`.
///
/// An input of 0 or 1 results in 0. The result is at most 32, which is
/// returned for every input above `1 << 31`.
#[cfg_attr(feature = "flux", flux_rs::trusted(reason = "math"))]
#[cfg_attr(
    feature = "flux",
    flux_rs::sig(fn(num: u32) -> u32{r: r <= 32
        && (num > 32 => r >= 6)
        && (num <= 2147483648 => r <= 31)})
)]
pub fn ceil_log_base_two(num: u32) -> u32 {
    if num <= 1 {
        0
    } else {
        32 - (num - 1).leading_zeros()
    }
}

/// Whether `num` is a non-zero power of two.
pub fn is_power_of_two(num: u32) -> bool {
    num != 0 && num & (num - 1) == 0
}

/// Whether `addr` is a multiple of `align`, which must be a power of two.
pub fn is_aligned(addr: u32, align: u32) -> bool {
    addr & align.wrapping_sub(1) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ceil_log_base_two_rounds_up() {
        assert_eq!(ceil_log_base_two(0), 0);
        assert_eq!(ceil_log_base_two(1), 0);
        assert_eq!(ceil_log_base_two(2), 1);
        assert_eq!(ceil_log_base_two(33), 6);
        assert_eq!(ceil_log_base_two(1 << 31), 31);
        assert_eq!(ceil_log_base_two((1 << 31) + 1), 32);
        assert_eq!(ceil_log_base_two(u32::MAX), 32);
    }

    #[test]
    fn ceil_log_base_two_bounds() {
        // Lower bound above the smallest MPU region, upper bound up to 2 GB.
        let mut num = 33u32;
        while num < u32::MAX / 2 {
            let r = ceil_log_base_two(num);
            assert!(r >= 6);
            assert!(r <= 31);
            assert!(num <= 1 << r);
            num = num * 2 - 1;
        }
        assert_eq!(ceil_log_base_two(33), 6);
        assert_eq!(ceil_log_base_two(1 << 31), 31);
    }

    #[test]
    fn alignment_helpers() {
        assert!(is_power_of_two(1));
        assert!(is_power_of_two(4096));
        assert!(!is_power_of_two(0));
        assert!(!is_power_of_two(96));

        assert!(is_aligned(0x2000_0000, 0x1_0000));
        assert!(!is_aligned(0x2000_0020, 0x40));
        assert!(is_aligned(0x2000_0020, 0x20));
    }
}
