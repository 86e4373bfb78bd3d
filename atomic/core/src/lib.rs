//! atomic-core: portable atomic read-modify-write primitives.
//!
//! Scatter updates (flux accumulation, particle deposition, min/max
//! reductions) need the same atomic operations whether they run on host
//! threads or as lanes of a device kernel. This crate provides nine of
//! them with one signature, `(slot, operand) -> previous value`, and picks
//! the implementation at compile time per execution target:
//!
//! - **Native**: the target's hardware read-modify-write instruction.
//! - **Emulated**: a compare-and-swap loop on the value's same-width
//!   integer alias, for operations the hardware lacks (float add/min/max,
//!   64-bit signed combos).
//! - **Host**: an unsynchronized load-combine-store, or the same under a
//!   per-address lock for host-parallel loops.
//!
//! # Architecture
//!
//! ```text
//!   add::<Cuda, f64>(&slot, v)
//!            |
//!            v
//!   +------------------+   compile-time impl per (target, op, type)
//!   |     Dispatch     |-----------------------------------------+
//!   +--------+---------+                    |                    |
//!            |                              |                    |
//!            v                              v                    v
//!   +------------------+         +------------------+   +------------------+
//!   |      native      |         |     emulate      |   |       host       |
//!   | hw RMW intrinsic |         | CAS loop on word |   | unsync/exclusive |
//!   +--------+---------+         +--------+---------+   +--------+---------+
//!            |                            |                      |
//!            +----------------------------+----------------------+
//!                                         v
//!                               +------------------+
//!                               |     Slot<T>      |
//!                               | word atomic cell |
//!                               +------------------+
//! ```
//!
//! # Example
//!
//! ```
//! use atomic_core::{Cuda, HostAtomic, Slot, Sycl};
//!
//! let flux = Slot::new(1.0f64);
//! assert_eq!(atomic_core::add::<Cuda, _>(&flux, 2.0), 1.0);
//! assert_eq!(atomic_core::min::<Sycl, _>(&flux, 0.5), 3.0);
//! assert_eq!(atomic_core::max::<HostAtomic, _>(&flux, 4.0), 0.5);
//! assert_eq!(flux.load(), 4.0);
//! ```
//!
//! The unqualified functions in [`ops`] use [`ActiveTarget`], chosen with
//! the `cuda`, `hip` or `sycl` cargo feature (host fallback when none is
//! enabled).
//!
//! # Ordering
//!
//! Every operation is atomic with respect to its own address only. No
//! ordering is implied between different addresses.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod sync;

// Value model
mod scalar;
mod slot;

// Operations and their implementations
pub mod emulate;
pub mod host;
pub mod metrics;
pub mod native;
mod op;

// Selection
mod dispatch;
mod target;

#[cfg(not(feature = "loom"))]
mod launch;

pub use dispatch::{Dispatch, path_of};
pub use emulate::RetryProbe;
pub use op::{
    Add, CompareAndSwap, Dec, Exchange, Inc, LogicalAnd, LogicalOr, Max, Min, Operation,
};
pub use scalar::{AtomicWord, Integer, IntegerAtomic, Scalar};
pub use slot::Slot;
pub use target::{ActiveTarget, Cuda, Hip, Host, HostAtomic, HostMode, Path, Sycl, Target};

#[cfg(not(feature = "loom"))]
pub use launch::Launch;

/// Add `value` to the slot; returns the previous value.
#[inline(always)]
pub fn add<X: Dispatch<Add, T>, T: Scalar>(slot: &Slot<T>, value: T) -> T {
    X::apply(slot, value)
}

/// Keep the smaller of the slot and `value`; returns the previous value.
#[inline(always)]
pub fn min<X: Dispatch<Min, T>, T: Scalar>(slot: &Slot<T>, value: T) -> T {
    X::apply(slot, value)
}

/// Keep the larger of the slot and `value`; returns the previous value.
#[inline(always)]
pub fn max<X: Dispatch<Max, T>, T: Scalar>(slot: &Slot<T>, value: T) -> T {
    X::apply(slot, value)
}

/// Boolean-in-integer or; returns the previous value.
#[inline(always)]
pub fn logical_or<X: Dispatch<LogicalOr, i32>>(slot: &Slot<i32>, value: i32) -> i32 {
    X::apply(slot, value)
}

/// Boolean-in-integer and; returns the previous value.
#[inline(always)]
pub fn logical_and<X: Dispatch<LogicalAnd, i32>>(slot: &Slot<i32>, value: i32) -> i32 {
    X::apply(slot, value)
}

/// Increment, wrapping to 0 once the slot has reached `bound`; returns the
/// previous value.
#[inline(always)]
pub fn inc<X: Dispatch<Inc, u32>>(slot: &Slot<u32>, bound: u32) -> u32 {
    X::apply(slot, bound)
}

/// Decrement, resetting to `bound` when the slot is 0 or above `bound`;
/// returns the previous value.
#[inline(always)]
pub fn dec<X: Dispatch<Dec, u32>>(slot: &Slot<u32>, bound: u32) -> u32 {
    X::apply(slot, bound)
}

/// Replace the slot with `value`; returns the previous value.
#[inline(always)]
pub fn exchange<X: Dispatch<Exchange, T>, T: Scalar>(slot: &Slot<T>, value: T) -> T {
    X::apply(slot, value)
}

/// Replace the slot with `value` if its bits equal `compare`; returns the
/// value observed at the instant of the comparison either way.
#[inline(always)]
pub fn compare_and_swap<X: Dispatch<CompareAndSwap, T>, T: Scalar>(
    slot: &Slot<T>,
    compare: T,
    value: T,
) -> T {
    X::apply(slot, (compare, value))
}

/// The nine operations bound to [`ActiveTarget`].
///
/// With no target feature enabled these are the unsynchronized host
/// fallback: correct only for one host thread per address. Use
/// [`HostAtomic`] explicitly for host-parallel loops.
pub mod ops {
    use super::*;

    /// See [`crate::add`].
    #[inline(always)]
    pub fn add<T: Scalar>(slot: &Slot<T>, value: T) -> T
    where
        ActiveTarget: Dispatch<Add, T>,
    {
        crate::add::<ActiveTarget, T>(slot, value)
    }

    /// See [`crate::min`].
    #[inline(always)]
    pub fn min<T: Scalar>(slot: &Slot<T>, value: T) -> T
    where
        ActiveTarget: Dispatch<Min, T>,
    {
        crate::min::<ActiveTarget, T>(slot, value)
    }

    /// See [`crate::max`].
    #[inline(always)]
    pub fn max<T: Scalar>(slot: &Slot<T>, value: T) -> T
    where
        ActiveTarget: Dispatch<Max, T>,
    {
        crate::max::<ActiveTarget, T>(slot, value)
    }

    /// See [`crate::logical_or`].
    #[inline(always)]
    pub fn logical_or(slot: &Slot<i32>, value: i32) -> i32 {
        crate::logical_or::<ActiveTarget>(slot, value)
    }

    /// See [`crate::logical_and`].
    #[inline(always)]
    pub fn logical_and(slot: &Slot<i32>, value: i32) -> i32 {
        crate::logical_and::<ActiveTarget>(slot, value)
    }

    /// See [`crate::inc`].
    #[inline(always)]
    pub fn inc(slot: &Slot<u32>, bound: u32) -> u32 {
        crate::inc::<ActiveTarget>(slot, bound)
    }

    /// See [`crate::dec`].
    #[inline(always)]
    pub fn dec(slot: &Slot<u32>, bound: u32) -> u32 {
        crate::dec::<ActiveTarget>(slot, bound)
    }

    /// See [`crate::exchange`].
    #[inline(always)]
    pub fn exchange<T: Scalar>(slot: &Slot<T>, value: T) -> T
    where
        ActiveTarget: Dispatch<Exchange, T>,
    {
        crate::exchange::<ActiveTarget, T>(slot, value)
    }

    /// See [`crate::compare_and_swap`].
    #[inline(always)]
    pub fn compare_and_swap<T: Scalar>(slot: &Slot<T>, compare: T, value: T) -> T
    where
        ActiveTarget: Dispatch<CompareAndSwap, T>,
    {
        crate::compare_and_swap::<ActiveTarget, T>(slot, compare, value)
    }
}
