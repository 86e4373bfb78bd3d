//! Synchronization primitives with optional loom support.
//!
//! This module provides atomic types that work with both std and loom,
//! enabling concurrency testing with loom while using efficient std
//! atomics in production.
//!
//! Note: `Slot` reinterpretation of caller-owned buffers (`from_mut_slice`,
//! `from_ptr`) relies on std atomics having the same layout as the plain
//! integer, so it is only available without loom.

#[cfg(not(feature = "loom"))]
pub use std::sync::atomic::{AtomicI32, AtomicI64, AtomicU32, AtomicU64, Ordering};

#[cfg(feature = "loom")]
pub use loom::sync::atomic::{AtomicI32, AtomicI64, AtomicU32, AtomicU64, Ordering};

#[cfg(all(test, feature = "loom"))]
pub use loom::sync::Arc;

/// Ordering used by every read-modify-write in this crate.
///
/// Only single-address atomicity is provided. Callers that need ordering
/// across addresses must fence separately.
pub const ORDER: Ordering = Ordering::Relaxed;
