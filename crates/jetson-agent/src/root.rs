//! Startup/shutdown orchestration.
//!
//! Order (matching the original daemon): detect the host platform,
//! initialize logging, install signal handlers, build the registry,
//! launch the management listener, load and launch the configured
//! engines, then wait for a shutdown signal and join everything.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use jetson_core::{GlobalLockFlag, OsArch, Registry};

use crate::config::{AgentConfig, CliArgs};
use crate::mgmt::{self, MgmtRuntime};
use crate::scan::{self, ScanContext};

/// Run the agent to completion (until a shutdown signal is received).
pub async fn run(cli: CliArgs, config: AgentConfig) -> anyhow::Result<()> {
    let os_arch = OsArch::detect();
    tracing::info!(?os_arch, jre_header = os_arch.jre_header(), "host platform detected");

    let shutdown = CancellationToken::new();
    install_signal_handlers(shutdown.clone());

    let registry = Arc::new(Mutex::new(Registry::new()));
    let lock_flag = Arc::new(GlobalLockFlag::new());
    let tasks = TaskTracker::new();

    let scan_ctx = Arc::new(ScanContext {
        cli,
        bind_addr: config.bind_addr.clone(),
        jre_header: os_arch.jre_header(),
        registry: registry.clone(),
        tasks: tasks.clone(),
        shutdown: shutdown.clone(),
    });

    let mgmt_runtime = Arc::new(MgmtRuntime {
        registry: registry.clone(),
        lock_flag,
        jre_header: os_arch.jre_header(),
        scan_ctx: scan_ctx.clone(),
        tasks: tasks.clone(),
    });

    {
        let bind_addr = config.bind_addr.clone();
        let port = config.mgmt_port;
        let shutdown = shutdown.clone();
        tasks.spawn(async move {
            if let Err(e) = mgmt::run(bind_addr, port, mgmt_runtime, shutdown).await {
                tracing::error!(error = %e, "management listener exited with error");
            }
        });
    }

    let loaded = scan::scan_and_load_engines(&scan_ctx).await?;
    tracing::info!(engines = loaded.len(), "agent startup complete");

    shutdown.cancelled().await;
    tracing::info!("shutdown signal received, joining tasks");

    tasks.close();
    let grace = std::time::Duration::from_secs(5);
    if tokio::time::timeout(grace, tasks.wait()).await.is_err() {
        tracing::warn!("shutdown grace period elapsed, exiting with tasks still in flight");
    }

    Ok(())
}

#[cfg(unix)]
fn install_signal_handlers(shutdown: CancellationToken) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let mut sigint = signal(SignalKind::interrupt()).expect("install SIGINT handler");
        let mut sigterm = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        let mut sigabrt =
            signal(SignalKind::from_raw(libc::SIGABRT)).expect("install SIGABRT handler");

        tokio::select! {
            _ = sigint.recv() => tracing::info!("received SIGINT"),
            _ = sigterm.recv() => tracing::info!("received SIGTERM"),
            _ = sigabrt.recv() => tracing::info!("received SIGABRT"),
        }
        shutdown.cancel();
    });
}

#[cfg(windows)]
fn install_signal_handlers(shutdown: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received Ctrl-C");
        }
        shutdown.cancel();
    });
}
