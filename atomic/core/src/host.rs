//! Host fallback.
//!
//! Two variants of every operation:
//!
//! - [`unsync`]: load, combine, store. Each access is atomic, so a race is
//!   never undefined behavior, but two racing updates can overwrite each
//!   other. Correct only when the caller guarantees a single host thread
//!   per address (or serializes externally).
//! - [`exclusive`]: the same sequence under a lock stripe chosen by
//!   address. All host threads using this variant on one address are
//!   mutually exclusive. Intended for host-side parallel reduction loops.
//!
//! Picking `unsync` under concurrent host access is a caller error.

use crate::metrics;
use crate::op;
use crate::scalar::Scalar;
use crate::slot::Slot;
use parking_lot::Mutex;

/// Number of lock stripes. Must be a power of two.
const STRIPES: usize = 64;

#[repr(align(128))]
struct Stripe(Mutex<()>);

static LOCKS: [Stripe; STRIPES] = [const { Stripe(Mutex::new(())) }; STRIPES];

/// Fibonacci hash of the address onto a stripe.
#[inline]
fn stripe(addr: usize) -> &'static Mutex<()> {
    let hash = (addr >> 2).wrapping_mul(0x9E37_79B9_7F4A_7C15_u64 as usize);
    &LOCKS[hash >> (usize::BITS - STRIPES.trailing_zeros())].0
}

/// Unsynchronized load-combine-store. Returns the previous value.
#[inline]
pub fn update<T: Scalar>(slot: &Slot<T>, f: impl FnOnce(T) -> T) -> T {
    let previous = slot.load();
    slot.store(f(previous));
    previous
}

/// Load-combine-store under the address's lock stripe. Returns the
/// previous value.
#[inline]
pub fn update_exclusive<T: Scalar>(slot: &Slot<T>, f: impl FnOnce(T) -> T) -> T {
    let _guard = stripe(slot.addr()).lock();
    metrics::HOST_EXCLUSIVE_UPDATES.increment();
    update(slot, f)
}

macro_rules! host_ops {
    ($apply:path) => {
        use super::*;

        /// Atomic add; returns the previous value.
        #[inline]
        pub fn add<T: Scalar>(slot: &Slot<T>, value: T) -> T {
            $apply(slot, |current| op::plus(current, value))
        }

        /// Atomic minimum; returns the previous value.
        #[inline]
        pub fn min<T: Scalar>(slot: &Slot<T>, value: T) -> T {
            $apply(slot, |current| op::less(current, value))
        }

        /// Atomic maximum; returns the previous value.
        #[inline]
        pub fn max<T: Scalar>(slot: &Slot<T>, value: T) -> T {
            $apply(slot, |current| op::greater(current, value))
        }

        /// Boolean-in-integer or; returns the previous value.
        #[inline]
        pub fn logical_or(slot: &Slot<i32>, value: i32) -> i32 {
            $apply(slot, |current| op::or(current, value))
        }

        /// Boolean-in-integer and; returns the previous value.
        #[inline]
        pub fn logical_and(slot: &Slot<i32>, value: i32) -> i32 {
            $apply(slot, |current| op::and(current, value))
        }

        /// Bounded wrapping increment; returns the previous value.
        #[inline]
        pub fn inc(slot: &Slot<u32>, bound: u32) -> u32 {
            $apply(slot, |current| op::wrapping_inc(current, bound))
        }

        /// Bounded wrapping decrement; returns the previous value.
        #[inline]
        pub fn dec(slot: &Slot<u32>, bound: u32) -> u32 {
            $apply(slot, |current| op::wrapping_dec(current, bound))
        }

        /// Unconditional replace; returns the previous value.
        #[inline]
        pub fn exchange<T: Scalar>(slot: &Slot<T>, value: T) -> T {
            $apply(slot, |current| op::replace(current, value))
        }

        /// Replace if equal to the compare value; returns the observed value.
        #[inline]
        pub fn compare_and_swap<T: Scalar>(slot: &Slot<T>, operand: (T, T)) -> T {
            $apply(slot, |current| op::replace_if_equal(current, operand))
        }
    };
}

/// Unsynchronized variant. Single host thread per address only.
pub mod unsync {
    host_ops!(super::update);
}

/// Mutually exclusive variant for host-parallel loops.
pub mod exclusive {
    host_ops!(super::update_exclusive);
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn test_unsync_returns_previous() {
        let slot = Slot::new(10i32);
        assert_eq!(unsync::add(&slot, 5), 10);
        assert_eq!(slot.load(), 15);
        assert_eq!(unsync::min(&slot, 3), 15);
        assert_eq!(unsync::max(&slot, 1), 3);
        assert_eq!(slot.load(), 3);
    }

    #[test]
    fn test_unsync_inc_dec() {
        let slot = Slot::new(3u32);
        assert_eq!(unsync::inc(&slot, 3), 3);
        assert_eq!(slot.load(), 0);
        assert_eq!(unsync::dec(&slot, 3), 0);
        assert_eq!(slot.load(), 3);
    }

    #[test]
    fn test_uncontended_exclusive_update_is_counted() {
        let slot = Slot::new(1u64);
        let before = metrics::HOST_EXCLUSIVE_UPDATES.value();
        assert_eq!(exclusive::add(&slot, 1), 1);
        assert!(metrics::HOST_EXCLUSIVE_UPDATES.value() > before);
    }

    #[test]
    fn test_stripe_is_stable_per_address() {
        let slot = Slot::new(0u64);
        let a = stripe(slot.addr()) as *const _;
        let b = stripe(slot.addr()) as *const _;
        assert_eq!(a, b);
    }

    #[test]
    fn test_stripes_spread_neighbors() {
        let slots: Vec<Slot<u64>> = (0..256).map(Slot::new).collect();
        let mut used = std::collections::HashSet::new();
        for slot in &slots {
            used.insert(stripe(slot.addr()) as *const _ as usize);
        }
        assert!(used.len() > STRIPES / 2, "only {} stripes used", used.len());
    }

    #[test]
    fn test_exclusive_parallel_float_sum() {
        const THREADS: usize = 8;
        const ITERATIONS: usize = 1000;

        let slot = Slot::new(0.0f64);
        let barrier = Barrier::new(THREADS);

        thread::scope(|s| {
            for _ in 0..THREADS {
                s.spawn(|| {
                    barrier.wait();
                    for _ in 0..ITERATIONS {
                        exclusive::add(&slot, 0.5);
                    }
                });
            }
        });

        assert_eq!(slot.load(), (THREADS * ITERATIONS) as f64 * 0.5);
    }

    #[test]
    fn test_exclusive_previous_values_are_unique() {
        const THREADS: usize = 4;
        const ITERATIONS: u32 = 500;

        let slot = Slot::new(0u32);
        let mut seen: Vec<u32> = thread::scope(|s| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    s.spawn(|| {
                        (0..ITERATIONS)
                            .map(|_| exclusive::add(&slot, 1))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect()
        });

        seen.sort_unstable();
        let expected: Vec<u32> = (0..THREADS as u32 * ITERATIONS).collect();
        assert_eq!(seen, expected);
    }
}
