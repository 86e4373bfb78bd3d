//! Compare-and-swap loop emulation.
//!
//! Provides atomicity for any update on any [`Scalar`] using only the
//! hardware compare-and-swap on the scalar's word alias:
//!
//! ```text
//!   observed = load(word)
//!   loop {
//!       candidate = to_word(f(from_word(observed)))
//!       match cas(word, observed, candidate) {
//!           Ok(_)        => return from_word(observed)
//!           Err(actual)  => observed = actual      // no separate reload
//!       }
//!   }
//! ```
//!
//! The loop runs until its own swap wins. There is no backoff and no retry
//! limit: under contention a lane keeps retrying, and every failed swap
//! means some other lane's update landed, so no update is ever dropped.
//! Retries are counted in [`CAS_LOOP_RETRIES`](crate::metrics::CAS_LOOP_RETRIES).
//!
//! Because equality is decided on words, floats swap by exact bit pattern;
//! a NaN or a negative zero in the slot does not stall the loop.

use crate::metrics;
use crate::op;
use crate::scalar::{AtomicWord, Scalar};
use crate::slot::Slot;
use crate::sync::ORDER;

/// Hook invoked right before each hardware compare-and-swap.
///
/// `attempt` is 0 for the first swap and increases by one per retry. A test
/// harness can write to the slot from inside the hook to force the pending
/// swap to fail, which makes retry paths deterministic to exercise.
pub trait RetryProbe {
    /// Called before swap number `attempt`.
    fn before_swap(&mut self, attempt: u32);
}

impl RetryProbe for () {
    #[inline(always)]
    fn before_swap(&mut self, _attempt: u32) {}
}

impl<F: FnMut(u32)> RetryProbe for F {
    #[inline(always)]
    fn before_swap(&mut self, attempt: u32) {
        self(attempt)
    }
}

/// Apply `f(current, operand)` atomically, returning the previous value.
#[inline]
pub fn atomic_op<T, U, F>(slot: &Slot<T>, operand: U, f: F) -> T
where
    T: Scalar,
    U: Copy,
    F: Fn(T, U) -> T,
{
    atomic_update_probed(slot, |current| f(current, operand), &mut ())
}

/// Apply `f(current)` atomically, calling `probe` before every swap.
/// Returns the previous value.
pub fn atomic_update_probed<T, F, P>(slot: &Slot<T>, mut f: F, probe: &mut P) -> T
where
    T: Scalar,
    F: FnMut(T) -> T,
    P: RetryProbe + ?Sized,
{
    let word = slot.word();
    let mut observed = word.load(ORDER);
    let mut attempt = 0u32;

    loop {
        let candidate = f(T::from_word(observed)).to_word();
        probe.before_swap(attempt);

        match word.compare_exchange(observed, candidate, ORDER, ORDER) {
            Ok(_) => return T::from_word(observed),
            Err(actual) => {
                observed = actual;
                attempt = attempt.wrapping_add(1);
                metrics::CAS_LOOP_RETRIES.increment();
            }
        }
    }
}

// Per-operation entry points with the dispatch signature.

/// Atomic add; returns the previous value.
#[inline]
pub fn add<T: Scalar>(slot: &Slot<T>, value: T) -> T {
    atomic_op(slot, value, op::plus)
}

/// Atomic minimum; returns the previous value.
#[inline]
pub fn min<T: Scalar>(slot: &Slot<T>, value: T) -> T {
    atomic_op(slot, value, op::less)
}

/// Atomic maximum; returns the previous value.
#[inline]
pub fn max<T: Scalar>(slot: &Slot<T>, value: T) -> T {
    atomic_op(slot, value, op::greater)
}

/// Boolean-in-integer or; returns the previous value.
#[inline]
pub fn logical_or(slot: &Slot<i32>, value: i32) -> i32 {
    atomic_op(slot, value, op::or)
}

/// Boolean-in-integer and; returns the previous value.
#[inline]
pub fn logical_and(slot: &Slot<i32>, value: i32) -> i32 {
    atomic_op(slot, value, op::and)
}

/// Bounded wrapping increment; returns the previous value.
#[inline]
pub fn inc(slot: &Slot<u32>, bound: u32) -> u32 {
    atomic_op(slot, bound, op::wrapping_inc)
}

/// Bounded wrapping decrement; returns the previous value.
#[inline]
pub fn dec(slot: &Slot<u32>, bound: u32) -> u32 {
    atomic_op(slot, bound, op::wrapping_dec)
}

/// Unconditional replace; returns the previous value.
#[inline]
pub fn exchange<T: Scalar>(slot: &Slot<T>, value: T) -> T {
    atomic_op(slot, value, op::replace)
}

/// Replace if equal to the compare value; returns the observed value.
#[inline]
pub fn compare_and_swap<T: Scalar>(slot: &Slot<T>, operand: (T, T)) -> T {
    atomic_op(slot, operand, op::replace_if_equal)
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn test_add_float() {
        let slot = Slot::new(1.0f64);
        assert_eq!(add(&slot, 2.5), 1.0);
        assert_eq!(slot.load(), 3.5);
    }

    #[test]
    fn test_min_max_float() {
        let slot = Slot::new(5.0f32);
        assert_eq!(min(&slot, 7.0), 5.0);
        assert_eq!(slot.load(), 5.0);
        assert_eq!(min(&slot, -1.0), 5.0);
        assert_eq!(slot.load(), -1.0);
        assert_eq!(max(&slot, 3.0), -1.0);
        assert_eq!(slot.load(), 3.0);
    }

    #[test]
    fn test_wide_integer_add() {
        let slot = Slot::new(i64::MAX - 1);
        assert_eq!(add(&slot, 3), i64::MAX - 1);
        assert_eq!(slot.load(), i64::MIN + 1);
    }

    #[test]
    fn test_nan_in_slot_does_not_stall() {
        let slot = Slot::new(f64::NAN);
        let previous = add(&slot, 1.0);
        assert!(previous.is_nan());
        assert!(slot.load().is_nan());

        // CAS against the exact NaN bits succeeds.
        assert!(compare_and_swap(&slot, (f64::NAN, 4.0)).is_nan());
        assert_eq!(slot.load(), 4.0);
    }

    #[test]
    fn test_compare_and_swap_failure_is_noop() {
        let slot = Slot::new(10u32);
        assert_eq!(compare_and_swap(&slot, (11, 99)), 10);
        assert_eq!(slot.load(), 10);
    }

    #[test]
    fn test_probe_forces_retries() {
        let slot = Slot::new(0.0f64);
        let mut attempts = Vec::new();

        // Another writer lands before each of the first three swaps.
        let previous = atomic_update_probed(
            &slot,
            |current| current + 1.0,
            &mut |attempt: u32| {
                attempts.push(attempt);
                if attempt < 3 {
                    slot.store(slot.load() + 10.0);
                }
            },
        );

        assert_eq!(attempts, [0, 1, 2, 3]);
        assert_eq!(previous, 30.0);
        assert_eq!(slot.load(), 31.0);
    }

    #[test]
    fn test_retry_counter_advances() {
        let slot = Slot::new(0u64);
        let before = metrics::CAS_LOOP_RETRIES.value();
        atomic_update_probed(
            &slot,
            |current| current + 1,
            &mut |attempt: u32| {
                if attempt == 0 {
                    slot.store(5);
                }
            },
        );
        assert_eq!(slot.load(), 6);
        assert!(metrics::CAS_LOOP_RETRIES.value() > before);
    }

    #[test]
    fn test_contended_float_add_loses_nothing() {
        const THREADS: usize = 8;
        const ITERATIONS: usize = 2000;

        let slot = Slot::new(0.0f32);
        let barrier = Barrier::new(THREADS);

        thread::scope(|s| {
            for _ in 0..THREADS {
                s.spawn(|| {
                    barrier.wait();
                    for _ in 0..ITERATIONS {
                        add(&slot, 1.0);
                    }
                });
            }
        });

        // Integral sums stay exact in f32 well past this range.
        assert_eq!(slot.load(), (THREADS * ITERATIONS) as f32);
    }
}

#[cfg(all(test, feature = "loom"))]
mod loom_tests {
    use super::*;
    use crate::sync::Arc;
    use loom::thread;

    /// Two emulated float adds racing on one slot: both land, and the
    /// previous values are the two distinct intermediate states.
    #[test]
    fn test_float_add_never_loses_update() {
        loom::model(|| {
            let slot = Arc::new(Slot::new(1.0f64));

            let s1 = slot.clone();
            let t1 = thread::spawn(move || add(&s1, 2.0));
            let s2 = slot.clone();
            let t2 = thread::spawn(move || add(&s2, 4.0));

            let r1 = t1.join().unwrap();
            let r2 = t2.join().unwrap();

            assert_eq!(slot.load(), 7.0);
            assert!(
                (r1 == 1.0 && r2 == 3.0) || (r2 == 1.0 && r1 == 5.0),
                "r1={r1} r2={r2}"
            );
        });
    }

    #[test]
    fn test_min_converges() {
        loom::model(|| {
            let slot = Arc::new(Slot::new(5.0f32));

            let s1 = slot.clone();
            let t1 = thread::spawn(move || min(&s1, 3.0));
            let s2 = slot.clone();
            let t2 = thread::spawn(move || min(&s2, 1.0));

            t1.join().unwrap();
            t2.join().unwrap();

            assert_eq!(slot.load(), 1.0);
        });
    }

    #[test]
    fn test_inc_wraps_under_race() {
        loom::model(|| {
            let slot = Arc::new(Slot::new(1u32));

            let s1 = slot.clone();
            let t1 = thread::spawn(move || inc(&s1, 2));
            let s2 = slot.clone();
            let t2 = thread::spawn(move || inc(&s2, 2));

            let mut seen = [t1.join().unwrap(), t2.join().unwrap()];
            seen.sort_unstable();

            // 1 -> 2 -> 0 in some order.
            assert_eq!(seen, [1, 2]);
            assert_eq!(slot.load(), 0);
        });
    }
}
