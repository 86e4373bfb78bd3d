//! Counters for the slow paths.
//!
//! `cas_loop_retries` moves only when a swap loses a race, so an uncontended
//! CAS loop never touches it. `host_exclusive_updates` counts every update
//! taken under a lock stripe, contended or not.

use metriken::{Counter, metric};

/// Failed compare-and-swap attempts in the emulation loop.
#[metric(
    name = "cas_loop_retries",
    description = "Compare-and-swap attempts that lost a race and were retried"
)]
pub static CAS_LOOP_RETRIES: Counter = Counter::new();

/// Host fallback updates taken under a lock stripe.
#[metric(
    name = "host_exclusive_updates",
    description = "Updates applied under a host lock stripe"
)]
pub static HOST_EXCLUSIVE_UPDATES: Counter = Counter::new();
