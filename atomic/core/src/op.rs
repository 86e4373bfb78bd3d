//! The operation catalogue.
//!
//! Each operation is a zero-sized marker used as the first parameter of
//! [`Dispatch`](crate::Dispatch), together with the combining function that
//! defines its result. Every implementation path (native, emulated, host)
//! produces exactly the value the combining function does, so a caller sees
//! the same result whichever path its target compiles to.
//!
//! | operation         | types                          | new value                                 |
//! |-------------------|--------------------------------|-------------------------------------------|
//! | `Add`             | i32 u32 i64 u64 f32 f64        | `cur + v` (integers wrap)                 |
//! | `Min`             | i32 u32 i64 u64 f32 f64        | `if cur < v { cur } else { v }`           |
//! | `Max`             | i32 u32 i64 u64 f32 f64        | `if cur > v { cur } else { v }`           |
//! | `LogicalOr`       | i32                            | `cur \| v`                                |
//! | `LogicalAnd`      | i32                            | `cur & (v != 0 ? !0 : 0)`                 |
//! | `Inc`             | u32                            | `cur >= bound ? 0 : cur + 1`              |
//! | `Dec`             | u32                            | `cur == 0 \|\| cur > bound ? bound : cur - 1` |
//! | `Exchange`        | all                            | `v`                                       |
//! | `CompareAndSwap`  | all                            | `bits(cur) == bits(cmp) ? v : cur`        |

use crate::scalar::Scalar;

/// A named read-modify-write operation.
pub trait Operation: Copy + Default + Send + Sync + 'static {
    /// What the caller passes alongside the address.
    type Operand<T: Scalar>: Copy;

    /// Operation name, as used in configuration.
    const NAME: &'static str;
}

macro_rules! operation {
    ($($(#[$doc:meta])* $name:ident => $label:literal),* $(,)?) => {
        $(
            $(#[$doc])*
            #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
            pub struct $name;

            impl Operation for $name {
                type Operand<T: Scalar> = T;

                const NAME: &'static str = $label;
            }
        )*
    };
}

operation! {
    /// Accumulate the operand into the target.
    Add => "add",
    /// Keep the smaller of target and operand.
    Min => "min",
    /// Keep the larger of target and operand.
    Max => "max",
    /// Boolean-in-integer or.
    LogicalOr => "logical_or",
    /// Boolean-in-integer and.
    LogicalAnd => "logical_and",
    /// Bounded increment; the operand is the bound.
    Inc => "inc",
    /// Bounded decrement; the operand is the bound.
    Dec => "dec",
    /// Unconditional replace.
    Exchange => "exchange",
}

/// Replace the target with `value` only if it currently equals `compare`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompareAndSwap;

impl Operation for CompareAndSwap {
    /// `(compare, value)`
    type Operand<T: Scalar> = (T, T);

    const NAME: &'static str = "compare_and_swap";
}

// Combining functions. `current` is the value in the slot, the second
// argument is the caller's operand.

#[inline(always)]
pub(crate) fn plus<T: Scalar>(current: T, value: T) -> T {
    current.accumulate(value)
}

/// The current value survives only when it compares strictly less, so an
/// unordered pair (either side NaN) or a tie stores the operand.
#[inline(always)]
pub(crate) fn less<T: Scalar>(current: T, value: T) -> T {
    if current < value { current } else { value }
}

#[inline(always)]
pub(crate) fn greater<T: Scalar>(current: T, value: T) -> T {
    if current > value { current } else { value }
}

#[inline(always)]
pub(crate) fn or(current: i32, value: i32) -> i32 {
    current | value
}

/// The operand's truthiness becomes an all-ones or all-zeros mask.
#[inline(always)]
pub(crate) fn and_mask(value: i32) -> i32 {
    if value != 0 { !0 } else { 0 }
}

#[inline(always)]
pub(crate) fn and(current: i32, value: i32) -> i32 {
    current & and_mask(value)
}

#[inline(always)]
pub(crate) fn wrapping_inc(current: u32, bound: u32) -> u32 {
    if current >= bound { 0 } else { current + 1 }
}

#[inline(always)]
pub(crate) fn wrapping_dec(current: u32, bound: u32) -> u32 {
    if current == 0 || current > bound {
        bound
    } else {
        current - 1
    }
}

#[inline(always)]
pub(crate) fn replace<T: Scalar>(_current: T, value: T) -> T {
    value
}

#[inline(always)]
pub(crate) fn replace_if_equal<T: Scalar>(current: T, (compare, value): (T, T)) -> T {
    if current.same_bits(compare) {
        value
    } else {
        current
    }
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use super::*;

    #[test]
    fn test_less_and_greater() {
        assert_eq!(less(5, 3), 3);
        assert_eq!(less(5, 9), 5);
        assert_eq!(greater(5u64, 9), 9);
        assert_eq!(greater(-1.0f32, -2.0), -1.0);
    }

    #[test]
    fn test_unordered_stores_operand() {
        assert!(less(2.0f64, f64::NAN).is_nan());
        assert!(greater(2.0f64, f64::NAN).is_nan());
        assert_eq!(less(f64::NAN, 1.0), 1.0);
        assert_eq!(greater(f32::NAN, -3.0), -3.0);
    }

    #[test]
    fn test_signed_zero_tie_stores_operand() {
        assert!(less(0.0f64, -0.0).is_sign_negative());
        assert!(greater(-0.0f32, 0.0).is_sign_positive());
    }

    #[test]
    fn test_logical() {
        assert_eq!(or(0, 0), 0);
        assert_ne!(or(0, 4), 0);
        assert_eq!(and(6, 1), 6);
        assert_eq!(and(6, 0), 0);
        assert_eq!(and(0, 1), 0);
    }

    #[test]
    fn test_wrapping_inc() {
        assert_eq!(wrapping_inc(3, 3), 0);
        assert_eq!(wrapping_inc(1, 3), 2);
        assert_eq!(wrapping_inc(7, 3), 0);
        assert_eq!(wrapping_inc(0, 0), 0);
    }

    #[test]
    fn test_wrapping_dec() {
        assert_eq!(wrapping_dec(0, 3), 3);
        assert_eq!(wrapping_dec(2, 3), 1);
        assert_eq!(wrapping_dec(9, 3), 3);
        assert_eq!(wrapping_dec(3, 3), 2);
    }

    #[test]
    fn test_replace_if_equal_compares_bits() {
        assert_eq!(replace_if_equal(1.0f64, (1.0, 2.0)), 2.0);
        assert_eq!(replace_if_equal(1.0f64, (1.5, 2.0)), 1.0);
        assert_eq!(replace_if_equal(0.0f32, (-0.0, 5.0)), 0.0);
        let nan = f32::NAN;
        assert_eq!(replace_if_equal(nan, (nan, 1.0)), 1.0);
    }

    #[test]
    fn test_names() {
        assert_eq!(Add::NAME, "add");
        assert_eq!(CompareAndSwap::NAME, "compare_and_swap");
    }
}
