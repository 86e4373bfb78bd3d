//! Native intrinsic adapter.
//!
//! Thin wrappers giving each hardware read-modify-write instruction the
//! uniform `(slot, operand) -> previous` shape. The type bounds are part of
//! the contract: min/max exist only for integers, logical or/and only for
//! `i32`, bounded inc/dec only for `u32`. A route that asks for a native
//! instruction outside those bounds does not compile.
//!
//! On a host build the device instructions are carried by the host ISA's
//! atomics. The ISA has no floating-point add and no bounded inc/dec, so
//! those two lower to the std `fetch_update` sequence, which is what a
//! device compiler emits for them on CPU targets as well.

use crate::op;
use crate::scalar::{AtomicWord, Integer, IntegerAtomic, Scalar};
use crate::slot::Slot;
use crate::sync::ORDER;

/// Scalars with a native atomic add.
pub trait NativeAdd: Scalar {
    /// Add `value` to the slot, returning the previous value.
    fn fetch_add(slot: &Slot<Self>, value: Self) -> Self;
}

macro_rules! integer_add {
    ($($ty:ty),*) => {
        $(
            impl NativeAdd for $ty {
                #[inline(always)]
                fn fetch_add(slot: &Slot<$ty>, value: $ty) -> $ty {
                    slot.word().fetch_add(value, ORDER)
                }
            }
        )*
    };
}

macro_rules! float_add {
    ($($ty:ty),*) => {
        $(
            impl NativeAdd for $ty {
                #[inline(always)]
                fn fetch_add(slot: &Slot<$ty>, value: $ty) -> $ty {
                    let previous = slot
                        .word()
                        .fetch_update(ORDER, ORDER, |word| {
                            Some(op::plus(<$ty>::from_word(word), value).to_word())
                        })
                        .unwrap_or_else(|word| word);
                    <$ty>::from_word(previous)
                }
            }
        )*
    };
}

integer_add!(i32, u32, i64, u64);
float_add!(f32, f64);

/// Atomic add; returns the previous value.
#[inline(always)]
pub fn add<T: NativeAdd>(slot: &Slot<T>, value: T) -> T {
    T::fetch_add(slot, value)
}

/// Atomic minimum; returns the previous value.
#[inline(always)]
pub fn min<T: Integer>(slot: &Slot<T>, value: T) -> T {
    slot.word().fetch_min(value, ORDER)
}

/// Atomic maximum; returns the previous value.
#[inline(always)]
pub fn max<T: Integer>(slot: &Slot<T>, value: T) -> T {
    slot.word().fetch_max(value, ORDER)
}

/// Boolean-in-integer or; returns the previous value.
#[inline(always)]
pub fn logical_or(slot: &Slot<i32>, value: i32) -> i32 {
    slot.word().fetch_or(value, ORDER)
}

/// Boolean-in-integer and; returns the previous value.
#[inline(always)]
pub fn logical_and(slot: &Slot<i32>, value: i32) -> i32 {
    slot.word().fetch_and(op::and_mask(value), ORDER)
}

/// Bounded wrapping increment; returns the previous value.
#[inline(always)]
pub fn inc(slot: &Slot<u32>, bound: u32) -> u32 {
    slot.word()
        .fetch_update(ORDER, ORDER, |current| {
            Some(op::wrapping_inc(current, bound))
        })
        .unwrap_or_else(|current| current)
}

/// Bounded wrapping decrement; returns the previous value.
#[inline(always)]
pub fn dec(slot: &Slot<u32>, bound: u32) -> u32 {
    slot.word()
        .fetch_update(ORDER, ORDER, |current| {
            Some(op::wrapping_dec(current, bound))
        })
        .unwrap_or_else(|current| current)
}

/// Unconditional replace; returns the previous value.
#[inline(always)]
pub fn exchange<T: Scalar>(slot: &Slot<T>, value: T) -> T {
    T::from_word(slot.word().swap(value.to_word(), ORDER))
}

/// Replace if equal to the compare value; returns the observed value.
#[inline(always)]
pub fn compare_and_swap<T: Scalar>(slot: &Slot<T>, (compare, value): (T, T)) -> T {
    let observed = match slot
        .word()
        .compare_exchange(compare.to_word(), value.to_word(), ORDER, ORDER)
    {
        Ok(word) | Err(word) => word,
    };
    T::from_word(observed)
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_add_returns_previous() {
        let slot = Slot::new(10i64);
        assert_eq!(add(&slot, 5), 10);
        assert_eq!(slot.load(), 15);

        let slot = Slot::new(1.5f32);
        assert_eq!(add(&slot, 0.25), 1.5);
        assert_eq!(slot.load(), 1.75);
    }

    #[test]
    fn test_add_wraps() {
        let slot = Slot::new(u32::MAX);
        assert_eq!(add(&slot, 1), u32::MAX);
        assert_eq!(slot.load(), 0);
    }

    #[test]
    fn test_signed_min_max() {
        let slot = Slot::new(-3i32);
        assert_eq!(min(&slot, -10), -3);
        assert_eq!(slot.load(), -10);
        assert_eq!(max(&slot, 4), -10);
        assert_eq!(slot.load(), 4);
    }

    #[test]
    fn test_logical() {
        let slot = Slot::new(0i32);
        assert_eq!(logical_or(&slot, 1), 0);
        assert_eq!(slot.load(), 1);
        assert_eq!(logical_and(&slot, 7), 1);
        assert_eq!(slot.load(), 1);
        assert_eq!(logical_and(&slot, 0), 1);
        assert_eq!(slot.load(), 0);
    }

    #[test]
    fn test_inc_dec() {
        let slot = Slot::new(3u32);
        assert_eq!(inc(&slot, 3), 3);
        assert_eq!(slot.load(), 0);
        assert_eq!(dec(&slot, 3), 0);
        assert_eq!(slot.load(), 3);
    }

    #[test]
    fn test_compare_and_swap() {
        let slot = Slot::new(2.0f64);
        assert_eq!(compare_and_swap(&slot, (1.0, 9.0)), 2.0);
        assert_eq!(slot.load(), 2.0);
        assert_eq!(compare_and_swap(&slot, (2.0, 9.0)), 2.0);
        assert_eq!(slot.load(), 9.0);
    }

    #[test]
    fn test_exchange() {
        let slot = Slot::new(1u64);
        assert_eq!(exchange(&slot, 8), 1);
        assert_eq!(slot.load(), 8);
    }

    #[test]
    fn test_concurrent_float_add() {
        let slot = Slot::new(0.0f64);
        thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..1000 {
                        add(&slot, 0.5);
                    }
                });
            }
        });
        assert_eq!(slot.load(), 2000.0);
    }
}
