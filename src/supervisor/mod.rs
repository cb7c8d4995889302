//! Process supervisor.
//!
//! Keeps one worker process per slot alive. Whenever a worker exits, for any
//! reason, the same slot is started again at once. There is no backoff and no
//! restart limit.

mod launcher;

pub use launcher::{worker_slot_from_env, SelfExecLauncher, WorkerLauncher};

use anyhow::{Context, Result};
use std::future::Future;
use std::io;
use std::process::ExitStatus;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Counters shared with observers of a running supervisor.
#[derive(Debug, Default)]
pub struct SupervisorStats {
    spawned: AtomicUsize,
    restarts: AtomicUsize,
    running: AtomicUsize,
}

impl SupervisorStats {
    /// Worker processes started so far, replacements included.
    pub fn spawned(&self) -> usize {
        self.spawned.load(Ordering::SeqCst)
    }

    pub fn restarts(&self) -> usize {
        self.restarts.load(Ordering::SeqCst)
    }

    /// Workers currently believed alive.
    pub fn running(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }
}

type ExitReport = (usize, Option<u32>, io::Result<ExitStatus>);

pub struct Supervisor<L> {
    launcher: L,
    workers: usize,
    stats: Arc<SupervisorStats>,
}

impl<L: WorkerLauncher> Supervisor<L> {
    pub fn new(launcher: L, workers: usize) -> Self {
        Self {
            launcher,
            workers,
            stats: Arc::new(SupervisorStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<SupervisorStats> {
        Arc::clone(&self.stats)
    }

    fn start_slot(&self, slot: usize, exits: &mut JoinSet<ExitReport>) -> Result<()> {
        let mut child = self
            .launcher
            .launch(slot)
            .with_context(|| format!("failed to spawn worker {slot}"))?;
        let pid = child.id();

        self.stats.spawned.fetch_add(1, Ordering::SeqCst);
        self.stats.running.fetch_add(1, Ordering::SeqCst);
        info!(worker = slot, pid, "worker started");

        exits.spawn(async move {
            let status = child.wait().await;
            (slot, pid, status)
        });
        Ok(())
    }

    /// Start every worker and keep them running until `shutdown` resolves.
    ///
    /// A worker that cannot be started is fatal: the error is returned and the
    /// remaining workers are killed.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let mut exits = JoinSet::new();
        for slot in 0..self.workers {
            self.start_slot(slot, &mut exits)?;
        }
        info!(workers = self.workers, "supervisor started");

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("supervisor stopping workers");
                    break;
                }
                Some(joined) = exits.join_next() => {
                    let (slot, pid, status) = joined.context("worker monitor task failed")?;
                    self.stats.running.fetch_sub(1, Ordering::SeqCst);
                    match status {
                        Ok(status) => warn!(
                            worker = slot,
                            pid,
                            status = %describe_exit(&status),
                            "worker exited, starting replacement"
                        ),
                        Err(e) => warn!(
                            worker = slot,
                            pid,
                            error = %e,
                            "lost track of worker, starting replacement"
                        ),
                    }
                    self.stats.restarts.fetch_add(1, Ordering::SeqCst);
                    self.start_slot(slot, &mut exits)?;
                }
            }
        }

        // aborting the monitor tasks drops the children, which kills them
        exits.shutdown().await;
        self.stats.running.store(0, Ordering::SeqCst);
        Ok(())
    }
}

pub fn describe_exit(status: &ExitStatus) -> String {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return format!("killed by signal {signal}");
        }
    }
    match status.code() {
        Some(code) => format!("exit code {code}"),
        None => "unknown".to_string(),
    }
}
