//! Execution targets and implementation paths.
//!
//! An execution target is the context a call compiles for. It is a type,
//! not a value: [`Dispatch`](crate::Dispatch) is implemented per target, so
//! the choice of path is made when the call is monomorphized.
//!
//! | target       | models                                   | default path             |
//! |--------------|------------------------------------------|--------------------------|
//! | `Host`       | host code outside any parallel region    | unsynchronized           |
//! | `HostAtomic` | host threads in a parallel reduction     | exclusive (lock stripe)  |
//! | `Cuda`       | CUDA device lanes                        | native, CAS for gaps     |
//! | `Hip`        | HIP device lanes                         | native, CAS for gaps     |
//! | `Sycl`       | SYCL device lanes                        | native, CAS for floats   |

use std::fmt;

/// A compile-time execution context.
pub trait Target: Copy + Default + Send + Sync + 'static {
    /// Short lowercase name, as used in configuration.
    const NAME: &'static str;
}

/// Host code, single-threaded per address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Host;

/// Host threads cooperating in a parallel loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostAtomic;

/// CUDA device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cuda;

/// HIP device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Hip;

/// SYCL device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sycl;

impl Target for Host {
    const NAME: &'static str = "host";
}

impl Target for HostAtomic {
    const NAME: &'static str = "host-atomic";
}

impl Target for Cuda {
    const NAME: &'static str = "cuda";
}

impl Target for Hip {
    const NAME: &'static str = "hip";
}

impl Target for Sycl {
    const NAME: &'static str = "sycl";
}

#[cfg(any(
    all(feature = "cuda", feature = "hip"),
    all(feature = "cuda", feature = "sycl"),
    all(feature = "hip", feature = "sycl"),
))]
compile_error!("at most one of the `cuda`, `hip` and `sycl` features may be enabled");

/// The target selected by cargo features for this build.
#[cfg(feature = "cuda")]
pub type ActiveTarget = Cuda;

/// The target selected by cargo features for this build.
#[cfg(feature = "hip")]
pub type ActiveTarget = Hip;

/// The target selected by cargo features for this build.
#[cfg(feature = "sycl")]
pub type ActiveTarget = Sycl;

/// The target selected by cargo features for this build.
#[cfg(not(any(feature = "cuda", feature = "hip", feature = "sycl")))]
pub type ActiveTarget = Host;

/// Host fallback flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostMode {
    /// Load-combine-store with no protection.
    Unsynchronized,
    /// Load-combine-store under a per-address lock stripe.
    Exclusive,
}

/// The implementation a (target, operation, type) triple compiles to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Path {
    /// The target's hardware read-modify-write instruction.
    Native,
    /// Compare-and-swap loop on the word alias.
    Emulated,
    /// Host fallback.
    Host(HostMode),
}

impl Path {
    /// Whether concurrent callers on one address are safe with this path.
    pub fn is_atomic(self) -> bool {
        !matches!(self, Path::Host(HostMode::Unsynchronized))
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Path::Native => write!(f, "native"),
            Path::Emulated => write!(f, "cas-loop"),
            Path::Host(HostMode::Unsynchronized) => write!(f, "host"),
            Path::Host(HostMode::Exclusive) => write!(f, "host-exclusive"),
        }
    }
}
