//! Worker threads and kernel selection.

use crate::config::OperationName;
use crate::metrics;

use atomic_core::{
    Add, CompareAndSwap, Dec, Dispatch, Exchange, Inc, LogicalAnd, LogicalOr, Max, Min, Path,
    Scalar, Slot, Target, path_of,
};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use std::hint::black_box;
use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Instant;

/// Operations applied between phase checks and metric flushes.
const BATCH: u64 = 1024;

/// Test phase, controlled by main thread and read by workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Phase {
    /// Warmup phase: run workload but don't record metrics.
    Warmup = 0,
    /// Main measurement phase: record metrics.
    Running = 1,
    /// Stop phase: workers should exit.
    Stop = 2,
}

impl Phase {
    #[inline]
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => Phase::Warmup,
            1 => Phase::Running,
            _ => Phase::Stop,
        }
    }
}

/// Shared state between main thread and workers.
pub struct SharedState {
    phase: AtomicU8,
}

impl SharedState {
    pub fn new() -> Self {
        Self {
            phase: AtomicU8::new(Phase::Warmup as u8),
        }
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        Phase::from_u8(self.phase.load(Ordering::Acquire))
    }

    pub fn set_phase(&self, phase: Phase) {
        self.phase.store(phase as u8, Ordering::Release);
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

/// One operation on one slot, monomorphized for a target.
pub type Kernel<T> = fn(&Slot<T>, T) -> T;

/// Kernel lookup for the operations a target defines on `T`.
pub trait Kernels<T: Scalar>: Target {
    /// The kernel and its compiled path, or `None` if `op` is not defined
    /// for `T`.
    fn kernel(op: OperationName) -> Option<(Kernel<T>, Path)>;
}

/// Operations defined for every scalar.
macro_rules! common_kernels {
    ($x:ident, $ty:ty, $op:expr) => {
        match $op {
            OperationName::Add => Some((
                atomic_core::add::<$x, $ty> as Kernel<$ty>,
                path_of::<$x, Add, $ty>(),
            )),
            OperationName::Min => Some((
                atomic_core::min::<$x, $ty> as Kernel<$ty>,
                path_of::<$x, Min, $ty>(),
            )),
            OperationName::Max => Some((
                atomic_core::max::<$x, $ty> as Kernel<$ty>,
                path_of::<$x, Max, $ty>(),
            )),
            OperationName::Exchange => Some((
                atomic_core::exchange::<$x, $ty> as Kernel<$ty>,
                path_of::<$x, Exchange, $ty>(),
            )),
            // Swap against whatever was last seen, so a lane loses only when
            // another lane wrote in between.
            OperationName::CompareAndSwap => Some((
                (|slot: &Slot<$ty>, value: $ty| {
                    atomic_core::compare_and_swap::<$x, $ty>(slot, slot.load(), value)
                }) as Kernel<$ty>,
                path_of::<$x, CompareAndSwap, $ty>(),
            )),
            _ => None,
        }
    };
}

macro_rules! impl_kernels {
    ($($ty:ty),*) => {
        $(
            impl<X> Kernels<$ty> for X
            where
                X: Target
                    + Dispatch<Add, $ty>
                    + Dispatch<Min, $ty>
                    + Dispatch<Max, $ty>
                    + Dispatch<Exchange, $ty>
                    + Dispatch<CompareAndSwap, $ty>,
            {
                fn kernel(op: OperationName) -> Option<(Kernel<$ty>, Path)> {
                    common_kernels!(X, $ty, op)
                }
            }
        )*
    };
}

impl_kernels!(i64, u64, f32, f64);

impl<X> Kernels<i32> for X
where
    X: Target
        + Dispatch<Add, i32>
        + Dispatch<Min, i32>
        + Dispatch<Max, i32>
        + Dispatch<Exchange, i32>
        + Dispatch<CompareAndSwap, i32>
        + Dispatch<LogicalOr, i32>
        + Dispatch<LogicalAnd, i32>,
{
    fn kernel(op: OperationName) -> Option<(Kernel<i32>, Path)> {
        match op {
            OperationName::LogicalOr => Some((
                atomic_core::logical_or::<X> as Kernel<i32>,
                path_of::<X, LogicalOr, i32>(),
            )),
            OperationName::LogicalAnd => Some((
                atomic_core::logical_and::<X> as Kernel<i32>,
                path_of::<X, LogicalAnd, i32>(),
            )),
            op => common_kernels!(X, i32, op),
        }
    }
}

impl<X> Kernels<u32> for X
where
    X: Target
        + Dispatch<Add, u32>
        + Dispatch<Min, u32>
        + Dispatch<Max, u32>
        + Dispatch<Exchange, u32>
        + Dispatch<CompareAndSwap, u32>
        + Dispatch<Inc, u32>
        + Dispatch<Dec, u32>,
{
    fn kernel(op: OperationName) -> Option<(Kernel<u32>, Path)> {
        match op {
            OperationName::Inc => Some((atomic_core::inc::<X> as Kernel<u32>, path_of::<X, Inc, u32>())),
            OperationName::Dec => Some((atomic_core::dec::<X> as Kernel<u32>, path_of::<X, Dec, u32>())),
            op => common_kernels!(X, u32, op),
        }
    }
}

/// Scalar support the benchmark needs beyond [`Scalar`].
pub trait BenchScalar: Scalar {
    /// Whether sums of this type are exact, so lost updates are detectable.
    const EXACT: bool;

    fn zero() -> Self;

    /// Draw an operand from `min..=max`.
    fn operand(rng: &mut Xoshiro256PlusPlus, min: i64, max: i64) -> Self;

    /// `count` unit increments, wrapped the way `Add` wraps.
    fn from_count(count: u64) -> Self;
}

macro_rules! integer_scalar {
    ($($ty:ty),*) => {
        $(
            impl BenchScalar for $ty {
                const EXACT: bool = true;

                fn zero() -> Self {
                    0
                }

                #[inline]
                fn operand(rng: &mut Xoshiro256PlusPlus, min: i64, max: i64) -> Self {
                    if min == max {
                        min as $ty
                    } else {
                        rng.random_range(min..=max) as $ty
                    }
                }

                fn from_count(count: u64) -> Self {
                    count as $ty
                }
            }
        )*
    };
}

macro_rules! float_scalar {
    ($($ty:ty),*) => {
        $(
            impl BenchScalar for $ty {
                const EXACT: bool = false;

                fn zero() -> Self {
                    0.0
                }

                #[inline]
                fn operand(rng: &mut Xoshiro256PlusPlus, min: i64, max: i64) -> Self {
                    if min == max {
                        min as $ty
                    } else {
                        rng.random_range(min as $ty..=max as $ty)
                    }
                }

                fn from_count(count: u64) -> Self {
                    count as $ty
                }
            }
        )*
    };
}

integer_scalar!(i32, u32, i64, u64);
float_scalar!(f32, f64);

/// Run a single worker thread until the phase becomes [`Phase::Stop`].
///
/// Returns the number of operations applied, warmup included.
pub fn run_worker<T: BenchScalar>(
    id: usize,
    operands: RangeInclusive<i64>,
    slots: &[Slot<T>],
    kernel: Kernel<T>,
    shared: &SharedState,
) -> u64 {
    let (operand_min, operand_max) = operands.into_inner();
    let addresses = slots.len();

    let mut rng = Xoshiro256PlusPlus::seed_from_u64(42 + id as u64);
    let mut applied = 0u64;

    tracing::debug!(worker = id, "worker started");

    loop {
        let phase = shared.phase();
        if phase == Phase::Stop {
            break;
        }

        // Latency includes slot and operand selection.
        let start = Instant::now();
        for _ in 0..BATCH {
            let index = if addresses == 1 {
                0
            } else {
                rng.random_range(0..addresses)
            };
            let operand = T::operand(&mut rng, operand_min, operand_max);
            black_box(kernel(&slots[index], operand));
        }
        let elapsed_ns = start.elapsed().as_nanos() as u64;
        applied += BATCH;

        if phase == Phase::Running {
            metrics::OPERATIONS.add(BATCH);
            metrics::BATCHES.increment();
            let _ = metrics::OPERATION_LATENCY.increment(elapsed_ns / BATCH);
        }
    }

    tracing::debug!(worker = id, applied, "worker stopped");
    applied
}

/// Check that the slots hold exactly `applied` unit increments in total.
///
/// Returns `None` when `T` cannot be checked exactly.
pub fn verify<T: BenchScalar>(slots: &[Slot<T>], applied: u64) -> Option<bool> {
    if !T::EXACT {
        return None;
    }
    let total = slots
        .iter()
        .fold(T::zero(), |acc, slot| acc.accumulate(slot.load()));
    Some(total.same_bits(T::from_count(applied)))
}
