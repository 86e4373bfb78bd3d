//! Concurrent behavior of the public operations.
//!
//! Every test launches many lanes at one or a few slots through
//! [`Launch`], so the native, CAS-loop and host-exclusive paths all run
//! under real contention.

#![cfg(not(feature = "loom"))]

use atomic_core::{
    Add, Cuda, Dispatch, Hip, Host, HostAtomic, Launch, Max, Min, Path, Scalar, Slot, Sycl,
    path_of,
};
use std::sync::Mutex;

const LANES: usize = 4096;
const THREADS: usize = 8;

fn launch() -> Launch {
    Launch::new(LANES).threads(THREADS)
}

/// Run `kernel` on every lane and collect what each lane returned.
fn collect<T: Send>(launch: Launch, kernel: impl Fn(usize) -> T + Sync) -> Vec<T> {
    let out = Mutex::new(Vec::with_capacity(launch.lanes()));
    launch.run(|lane| {
        let value = kernel(lane);
        out.lock().unwrap().push(value);
    });
    out.into_inner().unwrap()
}

// =============================================================================
// Add
// =============================================================================

fn check_add_previous_values_are_a_permutation<X>()
where
    X: Dispatch<Add, u64>,
{
    let slot = Slot::new(0u64);
    let mut previous = collect(launch(), |_| atomic_core::add::<X, _>(&slot, 1));

    previous.sort_unstable();
    let expected: Vec<u64> = (0..LANES as u64).collect();
    assert_eq!(previous, expected, "target {}", X::NAME);
    assert_eq!(slot.load(), LANES as u64);
}

#[test]
fn test_add_is_linearizable() {
    check_add_previous_values_are_a_permutation::<HostAtomic>();
    check_add_previous_values_are_a_permutation::<Cuda>();
    check_add_previous_values_are_a_permutation::<Hip>();
    check_add_previous_values_are_a_permutation::<Sycl>();
}

fn check_float_add_loses_nothing<X>()
where
    X: Dispatch<Add, f64> + Dispatch<Add, f32>,
{
    let wide = Slot::new(0.0f64);
    let narrow = Slot::new(0.0f32);

    launch().run(|_| {
        atomic_core::add::<X, _>(&wide, 0.25);
        atomic_core::add::<X, _>(&narrow, 1.0);
    });

    assert_eq!(wide.load(), LANES as f64 * 0.25, "target {}", X::NAME);
    assert_eq!(narrow.load(), LANES as f32, "target {}", X::NAME);
}

#[test]
fn test_float_add_loses_nothing() {
    check_float_add_loses_nothing::<Cuda>();
    check_float_add_loses_nothing::<Hip>();
    check_float_add_loses_nothing::<Sycl>();
    check_float_add_loses_nothing::<HostAtomic>();
}

#[test]
fn test_emulated_wide_integer_add() {
    assert_eq!(path_of::<Cuda, Add, i64>(), Path::Emulated);

    let slot = Slot::new(-(LANES as i64));
    launch().run(|lane| {
        atomic_core::add::<Cuda, _>(&slot, if lane % 2 == 0 { 3 } else { -1 });
    });
    assert_eq!(slot.load(), -(LANES as i64) + LANES as i64);
}

#[test]
fn test_three_adds_of_five() {
    let slot = Slot::new(10.0f64);
    let mut previous = collect(Launch::new(3).threads(3), |_| {
        atomic_core::add::<Sycl, _>(&slot, 5.0)
    });
    previous.sort_by(f64::total_cmp);

    assert_eq!(previous, [10.0, 15.0, 20.0]);
    assert_eq!(slot.load(), 25.0);
}

#[test]
fn test_scatter_into_bins() {
    const BINS: usize = 16;

    let mut bins = vec![0.0f64; BINS];
    {
        let slots = Slot::from_mut_slice(&mut bins);
        launch().run(|lane| {
            atomic_core::add::<Cuda, _>(&slots[lane % BINS], 1.0);
        });
    }

    for bin in bins {
        assert_eq!(bin, (LANES / BINS) as f64);
    }
}

// =============================================================================
// Min / Max
// =============================================================================

fn check_min_max_converge<X, T>(values: &[T], initial: T, expected_min: T, expected_max: T)
where
    X: Dispatch<Min, T> + Dispatch<Max, T>,
    T: Scalar,
{
    let low = Slot::new(initial);
    let high = Slot::new(initial);

    Launch::new(values.len()).threads(values.len()).run(|lane| {
        atomic_core::min::<X, T>(&low, values[lane]);
        atomic_core::max::<X, T>(&high, values[lane]);
    });

    assert_eq!(low.load(), expected_min, "target {}", X::NAME);
    assert_eq!(high.load(), expected_max, "target {}", X::NAME);
}

#[test]
fn test_min_max_converge() {
    let floats = [7.0f32, 3.0, 9.0, 1.0];
    check_min_max_converge::<Cuda, f32>(&floats, 5.0, 1.0, 9.0);
    check_min_max_converge::<Sycl, f32>(&floats, 5.0, 1.0, 9.0);
    check_min_max_converge::<HostAtomic, f32>(&floats, 5.0, 1.0, 9.0);

    let signed = [7i64, -3, 9, 1];
    check_min_max_converge::<Cuda, i64>(&signed, 5, -3, 9);
    check_min_max_converge::<Sycl, i64>(&signed, 5, -3, 9);

    let unsigned = [7u32, 3, 9, 1];
    check_min_max_converge::<Hip, u32>(&unsigned, 5, 1, 9);
}

fn check_unordered_slot_takes_operand<X>()
where
    X: Dispatch<Min, f64> + Dispatch<Max, f64> + Dispatch<Min, f32>,
{
    let low = Slot::new(f64::NAN);
    let high = Slot::new(f64::NAN);
    assert!(atomic_core::min::<X, _>(&low, 1.0).is_nan());
    assert!(atomic_core::max::<X, _>(&high, -2.0).is_nan());
    assert_eq!(low.load(), 1.0, "target {}", X::NAME);
    assert_eq!(high.load(), -2.0, "target {}", X::NAME);

    let zero = Slot::new(0.0f32);
    atomic_core::min::<X, _>(&zero, -0.0);
    assert!(zero.load().is_sign_negative(), "target {}", X::NAME);
}

#[test]
fn test_min_max_replace_nan_slot() {
    check_unordered_slot_takes_operand::<Host>();
    check_unordered_slot_takes_operand::<HostAtomic>();
    check_unordered_slot_takes_operand::<Cuda>();
    check_unordered_slot_takes_operand::<Hip>();
    check_unordered_slot_takes_operand::<Sycl>();
}

#[test]
fn test_min_many_lanes() {
    let slot = Slot::new(f64::INFINITY);
    launch().run(|lane| {
        atomic_core::min::<Cuda, _>(&slot, (LANES - lane) as f64);
    });
    assert_eq!(slot.load(), 1.0);
}

// =============================================================================
// Inc / Dec
// =============================================================================

#[test]
fn test_inc_cycles_through_range() {
    const BOUND: u32 = 7;

    for lanes in [BOUND as usize + 1, 3 * (BOUND as usize + 1)] {
        let slot = Slot::new(0u32);
        let mut previous = collect(Launch::new(lanes).threads(THREADS), |_| {
            atomic_core::inc::<Cuda>(&slot, BOUND)
        });
        previous.sort_unstable();

        // Each full cycle hands out every value in 0..=BOUND exactly once.
        let cycles = lanes / (BOUND as usize + 1);
        let mut expected: Vec<u32> = (0..cycles).flat_map(|_| 0..=BOUND).collect();
        expected.sort_unstable();
        assert_eq!(previous, expected);
        assert_eq!(slot.load(), 0);
    }
}

#[test]
fn test_dec_emulated_matches_native() {
    const BOUND: u32 = 4;

    let native = Slot::new(2u32);
    let emulated = Slot::new(2u32);
    Launch::new(40).threads(THREADS).run(|_| {
        atomic_core::dec::<Cuda>(&native, BOUND);
        atomic_core::dec::<Sycl>(&emulated, BOUND);
    });

    // 40 decrements over a cycle of 5 land back where they started.
    assert_eq!(native.load(), 2);
    assert_eq!(emulated.load(), 2);
}

// =============================================================================
// Logical
// =============================================================================

#[test]
fn test_logical_or_any_lane_sets() {
    let flag = Slot::new(0i32);
    launch().run(|lane| {
        atomic_core::logical_or::<Cuda>(&flag, i32::from(lane == LANES - 1));
    });
    assert_ne!(flag.load(), 0);
}

#[test]
fn test_logical_and_any_lane_clears() {
    let flag = Slot::new(1i32);
    launch().run(|lane| {
        atomic_core::logical_and::<Sycl>(&flag, i32::from(lane != 17));
    });
    assert_eq!(flag.load(), 0);
}

// =============================================================================
// Exchange / CompareAndSwap
// =============================================================================

#[test]
fn test_compare_and_swap_single_winner() {
    let slot = Slot::new(-1i32);
    let winners = collect(launch(), |lane| {
        atomic_core::compare_and_swap::<Cuda, _>(&slot, -1, lane as i32) == -1
    });

    assert_eq!(winners.iter().filter(|won| **won).count(), 1);
    assert_ne!(slot.load(), -1);
}

#[test]
fn test_exchange_chain_is_complete() {
    // Every lane swaps in its own id; together with the final value the
    // previous values account for every id plus the initial sentinel.
    let slot = Slot::new(u64::MAX);
    let mut seen = collect(launch(), |lane| {
        atomic_core::exchange::<Hip, _>(&slot, lane as u64)
    });
    seen.push(slot.load());
    seen.sort_unstable();

    let mut expected: Vec<u64> = (0..LANES as u64).collect();
    expected.push(u64::MAX);
    assert_eq!(seen, expected);
}

// =============================================================================
// Host
// =============================================================================

#[test]
fn test_host_unsync_single_lane() {
    let slot = Slot::new(0u32);
    Launch::new(100).threads(1).run(|lane| {
        atomic_core::add::<Host, _>(&slot, lane as u32);
    });
    assert_eq!(slot.load(), (0..100).sum::<u32>());
}

#[test]
fn test_host_exclusive_counts_updates() {
    let before = atomic_core::metrics::HOST_EXCLUSIVE_UPDATES.value();
    let slot = Slot::new(0i32);
    launch().run(|_| {
        atomic_core::max::<HostAtomic, _>(&slot, 3);
    });
    assert_eq!(slot.load(), 3);
    assert!(atomic_core::metrics::HOST_EXCLUSIVE_UPDATES.value() >= before + LANES as u64);
}
