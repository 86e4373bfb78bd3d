//! Host lane launcher.
//!
//! Runs a kernel over a grid of logical lanes using scoped host threads, the
//! way a device launch runs one instruction stream over many lanes. All
//! threads meet at a barrier before their first lane, so lanes that target
//! the same slot genuinely race; this is how tests and the bench put the
//! CAS loop under contention on purpose.
//!
//! ```
//! use atomic_core::{Cuda, Launch, Slot};
//!
//! let sum = Slot::new(0.0f64);
//! Launch::new(1024).threads(4).run(|_lane| {
//!     atomic_core::add::<Cuda, _>(&sum, 0.5);
//! });
//! assert_eq!(sum.load(), 512.0);
//! ```

use std::num::NonZeroUsize;
use std::sync::Barrier;
use std::thread;

/// A grid of logical lanes mapped onto host threads.
#[derive(Debug, Clone, Copy)]
pub struct Launch {
    lanes: usize,
    threads: usize,
}

impl Launch {
    /// A launch of `lanes` lanes over all available host threads.
    pub fn new(lanes: usize) -> Self {
        let threads = thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1);
        Self { lanes, threads }
    }

    /// Set the number of host threads. Zero is treated as one.
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Number of lanes in the grid.
    pub fn lanes(&self) -> usize {
        self.lanes
    }

    /// Threads actually spawned: never more than there are lanes.
    pub fn effective_threads(&self) -> usize {
        self.threads.min(self.lanes).max(1)
    }

    /// Run `kernel(lane)` once for every lane in `0..lanes`.
    ///
    /// Lanes are dealt round-robin, so thread `t` runs lanes `t`,
    /// `t + threads`, `t + 2 * threads`, ... Returns once every lane has
    /// finished.
    pub fn run<F>(&self, kernel: F)
    where
        F: Fn(usize) + Sync,
    {
        if self.lanes == 0 {
            return;
        }

        let threads = self.effective_threads();
        tracing::debug!(lanes = self.lanes, threads, "launching kernel");

        let barrier = Barrier::new(threads);
        let kernel = &kernel;
        let barrier = &barrier;
        let lanes = self.lanes;

        thread::scope(|s| {
            for id in 0..threads {
                s.spawn(move || {
                    barrier.wait();
                    for lane in (id..lanes).step_by(threads) {
                        kernel(lane);
                    }
                });
            }
        });
    }
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_every_lane_runs_once() {
        let seen = Mutex::new(Vec::new());
        Launch::new(100).threads(7).run(|lane| {
            seen.lock().unwrap().push(lane);
        });
        let mut seen = seen.into_inner().unwrap();
        seen.sort_unstable();
        assert_eq!(seen, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_threads_capped_by_lanes() {
        let launch = Launch::new(3).threads(16);
        assert_eq!(launch.effective_threads(), 3);
        assert_eq!(Launch::new(10).threads(0).effective_threads(), 1);
    }

    #[test]
    fn test_zero_lanes_is_noop() {
        Launch::new(0).run(|_| panic!("no lanes to run"));
    }
}
