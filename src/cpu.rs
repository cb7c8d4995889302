//! Host CPU descriptors.
//!
//! Everything here is read live; nothing is cached between calls so that two
//! requests never share a snapshot.

use sysinfo::System;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CpuInfoError {
    #[error("host reported no CPUs")]
    NoCpus,
}

/// Number of logical CPUs available to this process. Always at least 1.
pub fn logical_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// 1, 5 and 15 minute load averages as reported by the OS.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadAverage {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

#[derive(Debug, Clone)]
pub struct CpuInfo {
    pub cores: usize,
    pub model: String,
    pub speed_mhz: u64,
    pub architecture: &'static str,
    pub load: LoadAverage,
}

impl CpuInfo {
    pub fn snapshot() -> Result<Self, CpuInfoError> {
        let mut sys = System::new();
        sys.refresh_cpu_all();

        let first = sys.cpus().first().ok_or(CpuInfoError::NoCpus)?;
        let load = System::load_average();

        Ok(Self {
            cores: logical_cpus(),
            model: first.brand().trim().to_string(),
            speed_mhz: first.frequency(),
            architecture: std::env::consts::ARCH,
            load: LoadAverage {
                one: load.one,
                five: load.five,
                fifteen: load.fifteen,
            },
        })
    }

    pub fn speed_ghz(&self) -> f64 {
        self.speed_mhz as f64 / 1000.0
    }
}

/// Load average relative to the core count, as a percentage.
pub fn load_percent(load: f64, cores: usize) -> f64 {
    load / cores.max(1) as f64 * 100.0
}
