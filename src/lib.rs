pub mod api;
pub mod config;
pub mod cpu;
pub mod server;
pub mod supervisor;
pub mod telemetry;
pub mod utils;
pub mod workload;

/// Environment variable carrying the worker slot. Its presence marks a process
/// as a worker rather than the supervisor.
pub const WORKER_SLOT_ENV: &str = "CPU_STRESS_WORKER_SLOT";
