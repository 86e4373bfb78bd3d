//! Atomic contention benchmark: worker threads hammer a small set of slots
//! with one read-modify-write operation and report throughput, CAS-loop
//! retries and, where exact, whether any update was lost.

mod config;
mod logging;
mod metrics;
mod worker;

use crate::config::{Config, ScalarName, TargetName};
use crate::worker::{BenchScalar, Kernel, Kernels, Phase, SharedState};

use atomic_core::{Cuda, Hip, Host, HostAtomic, Path, Slot, Sycl};
use clap::Parser;
use metriken::{AtomicHistogram, histogram::Histogram};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "atomic-bench")]
#[command(about = "Atomic read-modify-write contention benchmark")]
struct Args {
    /// Path to configuration file
    config: PathBuf,
}

fn main() {
    let args = Args::parse();

    let config = match Config::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };

    logging::init(&config.logging);

    if let Err(e) = run(config) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    match config.workload.target {
        TargetName::Host => run_target::<Host>(config),
        TargetName::HostAtomic => run_target::<HostAtomic>(config),
        TargetName::Cuda => run_target::<Cuda>(config),
        TargetName::Hip => run_target::<Hip>(config),
        TargetName::Sycl => run_target::<Sycl>(config),
    }
}

fn run_target<X>(config: Config) -> Result<(), Box<dyn std::error::Error>>
where
    X: Kernels<i32> + Kernels<u32> + Kernels<i64> + Kernels<u64> + Kernels<f32> + Kernels<f64>,
{
    match config.workload.scalar {
        ScalarName::I32 => run_typed::<X, i32>(config),
        ScalarName::U32 => run_typed::<X, u32>(config),
        ScalarName::I64 => run_typed::<X, i64>(config),
        ScalarName::U64 => run_typed::<X, u64>(config),
        ScalarName::F32 => run_typed::<X, f32>(config),
        ScalarName::F64 => run_typed::<X, f64>(config),
    }
}

fn run_typed<X, T>(config: Config) -> Result<(), Box<dyn std::error::Error>>
where
    X: Kernels<T>,
    T: BenchScalar,
{
    let (kernel, path) = <X as Kernels<T>>::kernel(config.workload.operation).ok_or_else(|| {
        format!(
            "operation '{}' is not defined for scalar '{}' on target '{}'",
            config.workload.operation,
            config.workload.scalar,
            X::NAME
        )
    })?;
    config.check_path(path)?;

    print_config(&config, path);

    let slots: Arc<Vec<Slot<T>>> = Arc::new(
        (0..config.workload.addresses)
            .map(|_| Slot::new(T::zero()))
            .collect(),
    );

    let applied = drive(&config, &slots, kernel)?;

    print_summary(&config);
    if config.verifiable() {
        print_verification(&slots, applied);
    }

    Ok(())
}

/// Spawn workers, step through the phases and report once per second.
/// Returns the total number of operations applied.
fn drive<T: BenchScalar>(
    config: &Config,
    slots: &Arc<Vec<Slot<T>>>,
    kernel: Kernel<T>,
) -> Result<u64, Box<dyn std::error::Error>> {
    let num_threads = config.general.threads;
    let warmup = config.general.warmup;
    let duration = config.general.duration;
    let cpu_ids = config.cpu_affinity();

    let shared = Arc::new(SharedState::new());

    // Signal handler
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let operand_min = config.workload.operand_min;
    let operand_max = config.workload.operand_max;
    let mut handles = Vec::with_capacity(num_threads);

    for id in 0..num_threads {
        let slots = Arc::clone(slots);
        let shared = Arc::clone(&shared);
        let cpu_ids = cpu_ids.clone();

        let handle = thread::Builder::new()
            .name(format!("worker-{id}"))
            .spawn(move || {
                // Pin to CPU if configured
                if let Some(ref ids) = cpu_ids
                    && !ids.is_empty()
                {
                    let cpu_id = ids[id % ids.len()];
                    if let Err(e) = pin_to_cpu(cpu_id) {
                        tracing::warn!(worker = id, cpu_id, "failed to pin worker: {e}");
                    }
                }
                worker::run_worker(
                    id,
                    operand_min..=operand_max,
                    &slots,
                    kernel,
                    &shared,
                )
            })?;

        handles.push(handle);
    }

    tracing::info!("warming up for {:?}...", warmup);

    // Main thread: reporting loop
    let start = Instant::now();
    let report_interval = Duration::from_secs(1);
    let mut last_report = Instant::now();
    let mut last_completed = 0u64;
    let mut last_retries = 0u64;
    let mut last_histogram: Option<Histogram> = None;
    let mut current_phase = Phase::Warmup;

    loop {
        thread::sleep(Duration::from_millis(100));

        // Check signal
        if !running.load(Ordering::SeqCst) {
            tracing::info!("interrupted, stopping workers");
            shared.set_phase(Phase::Stop);
            break;
        }

        let elapsed = start.elapsed();

        // Check if done
        if elapsed >= warmup + duration {
            shared.set_phase(Phase::Stop);
            break;
        }

        // Transition from warmup to running
        if current_phase == Phase::Warmup && elapsed >= warmup {
            shared.set_phase(Phase::Running);
            current_phase = Phase::Running;
            tracing::info!("running for {:?}...", duration);
            print_header();
            last_report = Instant::now();
            last_completed = metrics::OPERATIONS.value();
            last_retries = atomic_core::metrics::CAS_LOOP_RETRIES.value();
            last_histogram = metrics::OPERATION_LATENCY.load();
        }

        // Skip reporting during warmup
        if current_phase != Phase::Running {
            continue;
        }

        // Periodic reporting
        if last_report.elapsed() >= report_interval {
            let completed = metrics::OPERATIONS.value();
            let retries = atomic_core::metrics::CAS_LOOP_RETRIES.value();
            let elapsed_secs = last_report.elapsed().as_secs_f64();

            let rate = (completed - last_completed) as f64 / elapsed_secs;
            let retry_rate = retries.wrapping_sub(last_retries) as f64 / elapsed_secs;
            last_completed = completed;
            last_retries = retries;

            // Interval percentiles via wrapping_sub
            let current_histogram = metrics::OPERATION_LATENCY.load();
            let (p50, p99, max) = match (&current_histogram, &last_histogram) {
                (Some(current), Some(previous)) => match current.wrapping_sub(previous) {
                    Ok(delta) => (
                        percentile_from_histogram(&delta, 50.0),
                        percentile_from_histogram(&delta, 99.0),
                        percentile_from_histogram(&delta, 100.0),
                    ),
                    Err(_) => (0.0, 0.0, 0.0),
                },
                (Some(current), None) => (
                    percentile_from_histogram(current, 50.0),
                    percentile_from_histogram(current, 99.0),
                    percentile_from_histogram(current, 100.0),
                ),
                _ => (0.0, 0.0, 0.0),
            };
            last_histogram = current_histogram;

            println!(
                "{:>14.0} {:>14.0} {:>10.1} {:>10.1} {:>10.1}",
                rate, retry_rate, p50, p99, max,
            );

            last_report = Instant::now();
        }
    }

    // Wait for workers
    let mut applied = 0u64;
    for handle in handles {
        match handle.join() {
            Ok(count) => applied += count,
            Err(_) => return Err("worker thread panicked".into()),
        }
    }

    Ok(applied)
}

fn print_config(config: &Config, path: Path) {
    eprintln!("atomic-bench configuration:");
    eprintln!("  target:     {}", config.workload.target);
    eprintln!("  operation:  {}", config.workload.operation);
    eprintln!("  scalar:     {}", config.workload.scalar);
    eprintln!("  path:       {path}");
    eprintln!("  addresses:  {}", config.workload.addresses);
    eprintln!(
        "  operands:   {}..={}",
        config.workload.operand_min, config.workload.operand_max
    );
    eprintln!("  threads:    {}", config.general.threads);
    eprintln!("  duration:   {:?}", config.general.duration);
    eprintln!("  warmup:     {:?}", config.general.warmup);
    eprintln!();
}

fn print_header() {
    println!(
        "{:>14} {:>14} {:>10} {:>10} {:>10}",
        "ops/sec", "retries/sec", "p50(ns)", "p99(ns)", "max(ns)",
    );
    println!("{}", "-".repeat(62));
}

fn print_summary(config: &Config) {
    let completed = metrics::OPERATIONS.value();
    let batches = metrics::BATCHES.value();
    let retries = atomic_core::metrics::CAS_LOOP_RETRIES.value();
    let exclusive = atomic_core::metrics::HOST_EXCLUSIVE_UPDATES.value();

    let elapsed = config.general.duration.as_secs_f64();
    let avg_rate = if elapsed > 0.0 {
        completed as f64 / elapsed
    } else {
        0.0
    };
    let retries_per_op = if completed > 0 {
        retries as f64 / completed as f64
    } else {
        0.0
    };

    eprintln!();
    eprintln!("=== Final Summary ===");
    eprintln!("  total ops:       {completed} ({batches} batches)");
    eprintln!("  avg ops/sec:     {avg_rate:.0}");
    eprintln!("  cas retries:     {retries} ({retries_per_op:.3}/op, warmup included)");
    eprintln!("  locked updates:  {exclusive}");
    eprintln!();

    print_latency_summary("OP", &metrics::OPERATION_LATENCY);
}

fn print_verification<T: BenchScalar>(slots: &[Slot<T>], applied: u64) {
    match worker::verify(slots, applied) {
        Some(true) => {
            eprintln!("  verification:    ok ({applied} updates, none lost)");
        }
        Some(false) => {
            tracing::error!(applied, "slot total does not match applied updates");
            eprintln!("  verification:    FAILED (updates lost)");
        }
        None => {}
    }
}

fn print_latency_summary(label: &str, hist: &AtomicHistogram) {
    let Some(snapshot) = hist.load() else {
        return;
    };
    let p50 = percentile_from_histogram(&snapshot, 50.0);
    let p90 = percentile_from_histogram(&snapshot, 90.0);
    let p99 = percentile_from_histogram(&snapshot, 99.0);
    let p999 = percentile_from_histogram(&snapshot, 99.9);
    let max = percentile_from_histogram(&snapshot, 100.0);

    eprintln!(
        "  {label:<6} latency (ns): p50={p50:.1}  p90={p90:.1}  p99={p99:.1}  p999={p999:.1}  max={max:.1}",
    );
}

// --- Histogram helpers ---

fn percentile_from_histogram(hist: &Histogram, p: f64) -> f64 {
    if let Ok(Some(results)) = hist.percentiles(&[p])
        && let Some((_pct, bucket)) = results.first()
    {
        return bucket.end() as f64;
    }
    0.0
}

// --- CPU pinning ---

#[cfg(target_os = "linux")]
fn pin_to_cpu(cpu_id: usize) -> std::io::Result<()> {
    use std::mem;

    unsafe {
        let mut cpuset: libc::cpu_set_t = mem::zeroed();
        libc::CPU_ZERO(&mut cpuset);
        libc::CPU_SET(cpu_id, &mut cpuset);

        let result = libc::sched_setaffinity(0, mem::size_of::<libc::cpu_set_t>(), &cpuset);

        if result == 0 {
            Ok(())
        } else {
            Err(std::io::Error::last_os_error())
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn pin_to_cpu(_cpu_id: usize) -> std::io::Result<()> {
    Ok(())
}
