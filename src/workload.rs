//! Synthetic CPU workloads.
//!
//! Every function here runs on the caller's thread until done. Nothing yields,
//! so a worker running one of these serves no other request meanwhile.

use rand::Rng;
use serde::Serialize;
use std::f64::consts::PI;
use std::hint::black_box;
use std::time::{Duration, Instant};

pub const DEFAULT_LOAD_SECONDS: f64 = 5.0;
pub const DEFAULT_CALC_ITERATIONS: u64 = 1_000_000;
pub const BENCHMARK_ITERATIONS: u64 = 1_000_000;
pub const FIXED_TEST_SECONDS: f64 = 2.0;

const EFFICIENT_TEST_LIMIT_SECONDS: f64 = 2.1;
const LOAD_TOLERANCE: f64 = 1.1;

/// Spin on `random() * random()` until `duration` of wall-clock time passed.
///
/// A duration too large to represent as a deadline spins forever.
pub fn busy_loop(duration: Duration) -> f64 {
    let mut rng = rand::thread_rng();
    let deadline = Instant::now().checked_add(duration);
    let mut acc = 0.0f64;
    while deadline.map_or(true, |d| Instant::now() < d) {
        acc += rng.gen::<f64>() * rng.gen::<f64>();
    }
    black_box(acc)
}

/// Iterations per second, with 0 standing in when no measurable time elapsed.
pub fn ops_per_sec(iterations: u64, elapsed: Duration) -> f64 {
    if elapsed.is_zero() {
        0.0
    } else {
        iterations as f64 / elapsed.as_secs_f64()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TestOutcome {
    pub elapsed: Duration,
    pub cores: usize,
}

impl TestOutcome {
    pub fn is_efficient(&self) -> bool {
        self.elapsed.as_secs_f64() < EFFICIENT_TEST_LIMIT_SECONDS
    }
}

pub fn fixed_test(cores: usize) -> TestOutcome {
    let start = Instant::now();
    busy_loop(Duration::from_secs_f64(FIXED_TEST_SECONDS));
    TestOutcome {
        elapsed: start.elapsed(),
        cores,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LoadOutcome {
    pub requested_secs: f64,
    pub elapsed: Duration,
    pub cores: usize,
}

impl LoadOutcome {
    pub fn within_tolerance(&self) -> bool {
        self.elapsed.as_secs_f64() <= self.requested_secs * LOAD_TOLERANCE
    }
}

/// Per-core share of `total_secs`, rounded up to the next nanosecond so the
/// shares never add up to less than the total.
fn core_slice(total_secs: f64, cores: usize) -> Duration {
    let nanos = (total_secs / cores as f64 * 1e9).ceil();
    if !nanos.is_finite() || nanos >= u64::MAX as f64 {
        Duration::MAX
    } else if nanos <= 0.0 {
        Duration::ZERO
    } else {
        Duration::from_nanos(nanos as u64)
    }
}

/// One busy loop per core, each for `total_secs / cores`, run back to back on
/// the calling thread. Wall time is therefore about `total_secs`.
pub fn sequential_load(total_secs: f64, cores: usize) -> LoadOutcome {
    let cores = cores.max(1);
    let slice = core_slice(total_secs, cores);
    let start = Instant::now();
    for _ in 0..cores {
        busy_loop(slice);
    }
    LoadOutcome {
        requested_secs: total_secs,
        elapsed: start.elapsed(),
        cores,
    }
}

#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BenchmarkRating {
    Excellent,
    Good,
    Fair,
}

impl BenchmarkRating {
    pub fn from_ops_per_sec(ops: f64) -> Self {
        if ops > 1_000_000.0 {
            Self::Excellent
        } else if ops > 500_000.0 {
            Self::Good
        } else {
            Self::Fair
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BenchmarkOutcome {
    pub iterations: u64,
    pub elapsed: Duration,
    pub ops_per_sec: f64,
}

impl BenchmarkOutcome {
    /// Throughput scaled by core count, rounded to the nearest integer.
    pub fn score(&self, cores: usize) -> f64 {
        (self.ops_per_sec * cores as f64).round()
    }

    pub fn rating(&self) -> BenchmarkRating {
        BenchmarkRating::from_ops_per_sec(self.ops_per_sec)
    }
}

/// Accumulate `sqrt(random() * PI)` `iterations` times.
pub fn benchmark(iterations: u64) -> BenchmarkOutcome {
    let mut rng = rand::thread_rng();
    let start = Instant::now();
    let mut acc = 0.0f64;
    for _ in 0..iterations {
        acc += (rng.gen::<f64>() * PI).sqrt();
    }
    black_box(acc);
    let elapsed = start.elapsed();
    BenchmarkOutcome {
        iterations,
        elapsed,
        ops_per_sec: ops_per_sec(iterations, elapsed),
    }
}

#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CalcRating {
    Outstanding,
    Great,
    Average,
}

impl CalcRating {
    pub fn from_ops_per_sec(ops: f64) -> Self {
        if ops > 1_000_000.0 {
            Self::Outstanding
        } else if ops > 500_000.0 {
            Self::Great
        } else {
            Self::Average
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CalcOutcome {
    pub result: f64,
    pub iterations: u64,
    pub elapsed: Duration,
    pub ops_per_sec: f64,
}

impl CalcOutcome {
    pub fn rating(&self) -> CalcRating {
        CalcRating::from_ops_per_sec(self.ops_per_sec)
    }
}

/// Trigonometric and arithmetic mix: per step add `sin(i) * cos(i)`, scale by
/// `random()^2`, then damp by `sqrt(|result| + 1)`.
pub fn calculation_load_test(iterations: u64) -> CalcOutcome {
    let mut rng = rand::thread_rng();
    let start = Instant::now();
    let mut result = 0.0f64;
    for i in 0..iterations {
        let x = i as f64;
        result += x.sin() * x.cos();
        let r = rng.gen::<f64>();
        result *= r * r;
        result /= (result.abs() + 1.0).sqrt();
    }
    let elapsed = start.elapsed();
    CalcOutcome {
        result: black_box(result),
        iterations,
        elapsed,
        ops_per_sec: ops_per_sec(iterations, elapsed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[test]
    fn test_busy_loop_runs_at_least_duration() {
        let start = Instant::now();
        busy_loop(Duration::from_millis(30));
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_busy_loop_zero_returns_immediately() {
        let start = Instant::now();
        assert_eq!(busy_loop(Duration::ZERO), 0.0);
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn test_ops_per_sec_zero_duration_sentinel() {
        assert_eq!(ops_per_sec(0, Duration::ZERO), 0.0);
        assert_eq!(ops_per_sec(1_000, Duration::ZERO), 0.0);
        assert_eq!(ops_per_sec(1_000, Duration::from_millis(500)), 2_000.0);
    }

    #[test]
    fn test_core_slice_never_undershoots() {
        for cores in 1..=16 {
            let slice = core_slice(0.1, cores);
            assert!(slice * cores as u32 >= Duration::from_secs_f64(0.1));
        }
        assert_eq!(core_slice(0.0, 4), Duration::ZERO);
        assert_eq!(core_slice(f64::MAX, 1), Duration::MAX);
    }

    #[test]
    fn test_sequential_load_takes_at_least_requested() {
        let outcome = sequential_load(0.05, 4);
        assert!(outcome.elapsed.as_secs_f64() >= 0.05);
        assert_eq!(outcome.requested_secs, 0.05);
        assert_eq!(outcome.cores, 4);
    }

    #[test]
    fn test_sequential_load_zero_cores_treated_as_one() {
        let outcome = sequential_load(0.0, 0);
        assert_eq!(outcome.cores, 1);
    }

    #[test]
    fn test_load_tolerance() {
        let outcome = LoadOutcome {
            requested_secs: 1.0,
            elapsed: Duration::from_millis(1_090),
            cores: 2,
        };
        assert!(outcome.within_tolerance());
        let slow = LoadOutcome {
            elapsed: Duration::from_millis(1_200),
            ..outcome
        };
        assert!(!slow.within_tolerance());
    }

    #[test]
    fn test_fixed_test_efficiency_threshold() {
        let fast = TestOutcome {
            elapsed: Duration::from_millis(2_050),
            cores: 1,
        };
        assert!(fast.is_efficient());
        let slow = TestOutcome {
            elapsed: Duration::from_millis(2_100),
            cores: 1,
        };
        assert!(!slow.is_efficient());
    }

    #[rstest]
    #[case(2_000_000.0, BenchmarkRating::Excellent)]
    #[case(1_000_000.0, BenchmarkRating::Good)]
    #[case(500_001.0, BenchmarkRating::Good)]
    #[case(500_000.0, BenchmarkRating::Fair)]
    #[case(0.0, BenchmarkRating::Fair)]
    fn test_benchmark_rating(#[case] ops: f64, #[case] expected: BenchmarkRating) {
        assert_eq!(BenchmarkRating::from_ops_per_sec(ops), expected);
    }

    #[rstest]
    #[case(1_000_001.0, CalcRating::Outstanding)]
    #[case(1_000_000.0, CalcRating::Great)]
    #[case(500_000.0, CalcRating::Average)]
    fn test_calc_rating(#[case] ops: f64, #[case] expected: CalcRating) {
        assert_eq!(CalcRating::from_ops_per_sec(ops), expected);
    }

    #[test]
    fn test_rating_display() {
        assert_eq!(BenchmarkRating::Excellent.to_string(), "excellent");
        assert_eq!(CalcRating::Outstanding.to_string(), "outstanding");
        assert_eq!(
            serde_json::to_string(&CalcRating::Great).unwrap(),
            "\"great\""
        );
    }

    #[test]
    fn test_benchmark_counts_iterations() {
        let outcome = benchmark(10_000);
        assert_eq!(outcome.iterations, 10_000);
        assert!(outcome.ops_per_sec.is_finite());
        assert!(outcome.ops_per_sec >= 0.0);
    }

    #[test]
    fn test_benchmark_score() {
        let outcome = BenchmarkOutcome {
            iterations: 1,
            elapsed: Duration::from_secs(1),
            ops_per_sec: 1_234.6,
        };
        assert_eq!(outcome.score(4), 4_938.0);
    }

    #[test]
    fn test_calculation_zero_iterations() {
        let outcome = calculation_load_test(0);
        assert_eq!(outcome.iterations, 0);
        assert_eq!(outcome.result, 0.0);
        assert_eq!(outcome.ops_per_sec, 0.0);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_calculation_reports_requested_iterations(iterations in 0u64..20_000) {
            let outcome = calculation_load_test(iterations);
            prop_assert_eq!(outcome.iterations, iterations);
            prop_assert!(outcome.ops_per_sec.is_finite());
            prop_assert!(outcome.ops_per_sec >= 0.0);
            prop_assert!(outcome.result.is_finite());
        }
    }
}
