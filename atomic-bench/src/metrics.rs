//! Benchmark metrics.
//!
//! Workers count operations locally and flush once per batch, so the
//! counters themselves add no contention on the measured slots' cache lines.

use metriken::{AtomicHistogram, Counter, metric};

#[metric(
    name = "operations",
    description = "Operations completed during the measurement phase"
)]
pub static OPERATIONS: Counter = Counter::new();

#[metric(name = "batches", description = "Batches completed during the measurement phase")]
pub static BATCHES: Counter = Counter::new();

#[metric(
    name = "operation_latency",
    description = "Mean per-operation latency of each batch (nanoseconds)"
)]
pub static OPERATION_LATENCY: AtomicHistogram = AtomicHistogram::new(7, 64);
