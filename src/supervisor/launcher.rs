//! Starting worker processes.

use anyhow::{Context, Result};
use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::{Child, Command};

use crate::WORKER_SLOT_ENV;

/// Starts the process backing one worker slot.
///
/// The returned child must be killed when dropped so that a stopping
/// supervisor never leaves workers behind.
pub trait WorkerLauncher: Send + Sync + 'static {
    fn launch(&self, slot: usize) -> io::Result<Child>;
}

/// Re-executes the running binary with the same arguments, marking the child
/// as a worker through [`WORKER_SLOT_ENV`].
#[derive(Debug, Clone)]
pub struct SelfExecLauncher {
    exe: PathBuf,
    args: Vec<OsString>,
}

impl SelfExecLauncher {
    pub fn current() -> Result<Self> {
        let exe = std::env::current_exe().context("failed to get current executable")?;
        Ok(Self {
            exe,
            args: std::env::args_os().skip(1).collect(),
        })
    }
}

impl WorkerLauncher for SelfExecLauncher {
    fn launch(&self, slot: usize) -> io::Result<Child> {
        Command::new(&self.exe)
            .args(&self.args)
            .env(WORKER_SLOT_ENV, slot.to_string())
            .stdin(Stdio::null())
            // logs from workers share the supervisor's stdout/stderr
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
    }
}

/// Slot assigned to this process by a supervisor, if it is a worker.
pub fn worker_slot_from_env() -> Option<usize> {
    std::env::var(WORKER_SLOT_ENV).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_launcher_points_at_test_binary() {
        let launcher = SelfExecLauncher::current().unwrap();
        assert!(launcher.exe.exists());
    }
}
