//! Dispatch selector.
//!
//! [`Dispatch<O, T>`] is implemented once per (target, operation, type).
//! Each impl names its [`Path`] and forwards to exactly one of the native,
//! emulated or host implementations, so there is no branch at the call
//! site and no runtime capability check. A combination missing from the
//! tables below has no impl; calling it is a compile error.

use crate::emulate;
use crate::host;
use crate::native;
use crate::op::{
    Add, CompareAndSwap, Dec, Exchange, Inc, LogicalAnd, LogicalOr, Max, Min, Operation,
};
use crate::scalar::Scalar;
use crate::slot::Slot;
use crate::target::{Cuda, Hip, Host, HostAtomic, HostMode, Path, Sycl, Target};

/// Routes operation `O` on scalar `T` for the implementing target.
pub trait Dispatch<O: Operation, T: Scalar>: Target {
    /// The implementation this combination compiles to.
    const PATH: Path;

    /// Apply the operation and return the value present before it.
    fn apply(slot: &Slot<T>, operand: O::Operand<T>) -> T;
}

macro_rules! route {
    ($target:ty, $op:ty, $path:expr, $func:path, [$($ty:ty),+ $(,)?]) => {
        $(
            impl Dispatch<$op, $ty> for $target {
                const PATH: Path = $path;

                #[inline(always)]
                fn apply(slot: &Slot<$ty>, operand: <$op as Operation>::Operand<$ty>) -> $ty {
                    $func(slot, operand)
                }
            }
        )+
    };
}

/// Every operation on the host, through one fallback flavor.
macro_rules! host_table {
    ($target:ty, $mode:expr, $module:ident) => {
        route!($target, Add, Path::Host($mode), host::$module::add, [i32, u32, i64, u64, f32, f64]);
        route!($target, Min, Path::Host($mode), host::$module::min, [i32, u32, i64, u64, f32, f64]);
        route!($target, Max, Path::Host($mode), host::$module::max, [i32, u32, i64, u64, f32, f64]);
        route!($target, LogicalOr, Path::Host($mode), host::$module::logical_or, [i32]);
        route!($target, LogicalAnd, Path::Host($mode), host::$module::logical_and, [i32]);
        route!($target, Inc, Path::Host($mode), host::$module::inc, [u32]);
        route!($target, Dec, Path::Host($mode), host::$module::dec, [u32]);
        route!($target, Exchange, Path::Host($mode), host::$module::exchange, [i32, u32, i64, u64, f32, f64]);
        route!($target, CompareAndSwap, Path::Host($mode), host::$module::compare_and_swap, [i32, u32, i64, u64, f32, f64]);
    };
}

host_table!(Host, HostMode::Unsynchronized, unsync);
host_table!(HostAtomic, HostMode::Exclusive, exclusive);

/// CUDA and HIP share an instruction set for atomics: 64-bit signed
/// add/min/max and all float min/max fall back to the CAS loop.
macro_rules! cuda_like_table {
    ($target:ty) => {
        route!($target, Add, Path::Native, native::add, [i32, u32, u64, f32, f64]);
        route!($target, Add, Path::Emulated, emulate::add, [i64]);
        route!($target, Min, Path::Native, native::min, [i32, u32, u64]);
        route!($target, Min, Path::Emulated, emulate::min, [i64, f32, f64]);
        route!($target, Max, Path::Native, native::max, [i32, u32, u64]);
        route!($target, Max, Path::Emulated, emulate::max, [i64, f32, f64]);
        route!($target, LogicalOr, Path::Native, native::logical_or, [i32]);
        route!($target, LogicalAnd, Path::Native, native::logical_and, [i32]);
        route!($target, Inc, Path::Native, native::inc, [u32]);
        route!($target, Dec, Path::Native, native::dec, [u32]);
        route!($target, Exchange, Path::Native, native::exchange, [i32, u32, i64, u64, f32, f64]);
        route!($target, CompareAndSwap, Path::Native, native::compare_and_swap, [i32, u32, i64, u64, f32, f64]);
    };
}

cuda_like_table!(Cuda);
cuda_like_table!(Hip);

// SYCL: generic integer atomics, nothing for floats, no bounded inc/dec.
route!(Sycl, Add, Path::Native, native::add, [i32, u32, i64, u64]);
route!(Sycl, Add, Path::Emulated, emulate::add, [f32, f64]);
route!(Sycl, Min, Path::Native, native::min, [i32, u32, i64, u64]);
route!(Sycl, Min, Path::Emulated, emulate::min, [f32, f64]);
route!(Sycl, Max, Path::Native, native::max, [i32, u32, i64, u64]);
route!(Sycl, Max, Path::Emulated, emulate::max, [f32, f64]);
route!(Sycl, LogicalOr, Path::Native, native::logical_or, [i32]);
route!(Sycl, LogicalAnd, Path::Native, native::logical_and, [i32]);
route!(Sycl, Inc, Path::Emulated, emulate::inc, [u32]);
route!(Sycl, Dec, Path::Emulated, emulate::dec, [u32]);
route!(Sycl, Exchange, Path::Native, native::exchange, [i32, u32, i64, u64, f32, f64]);
route!(Sycl, CompareAndSwap, Path::Native, native::compare_and_swap, [i32, u32, i64, u64, f32, f64]);

/// The path `X` compiles operation `O` on `T` to.
pub const fn path_of<X, O, T>() -> Path
where
    X: Dispatch<O, T>,
    O: Operation,
    T: Scalar,
{
    <X as Dispatch<O, T>>::PATH
}
