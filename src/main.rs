use anyhow::Result;
use cpu_stress_api::{
    config::Config,
    server,
    supervisor::{worker_slot_from_env, SelfExecLauncher, Supervisor},
    telemetry::{self, init_tracing},
};
use tracing::{info, warn};

// Workers and the supervisor both stay on one thread. For workers this is the
// concurrency model: a running workload occupies the whole process.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cfg = Config::load()?;

    if let Some(slot) = worker_slot_from_env() {
        return server::run_worker(cfg, Some(slot)).await;
    }

    if !cfg.workers.supervise {
        info!("supervisor disabled, serving from a single process");
        return server::run_worker(cfg, None).await;
    }

    let mut workers = cfg.workers.resolved_count();
    if cfg!(not(unix)) && workers > 1 {
        warn!(workers, "port sharing is unavailable on this platform, starting one worker");
        workers = 1;
    }

    info!(
        pid = std::process::id(),
        workers,
        addr = %cfg.server.socket_addr()?,
        "starting CPU stress API supervisor"
    );

    let supervisor = Supervisor::new(SelfExecLauncher::current()?, workers);
    supervisor.run(telemetry::shutdown_signal()).await?;

    warn!("shutdown complete");
    Ok(())
}
