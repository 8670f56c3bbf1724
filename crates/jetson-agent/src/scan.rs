//! Shared engine discovery: config (re)load, registry registration, and
//! per-engine listener spawn. Used both at startup and from a live
//! `scan` management command, so a `scan` after startup picks up
//! engines added to the config file without a restart.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use jetson_core::{CoreError, Registry};

use crate::config::{AgentConfig, CliArgs};
use crate::listener;
use crate::session::EngineRuntime;

/// Everything `scan_and_load_engines` needs to parse the config file,
/// register newly discovered engines, and launch their listeners.
pub struct ScanContext {
    pub cli: CliArgs,
    pub bind_addr: String,
    pub jre_header: &'static str,
    pub registry: Arc<Mutex<Registry>>,
    pub tasks: TaskTracker,
    pub shutdown: CancellationToken,
}

/// Re-read the config file and launch a listener for any engine not
/// already registered. An engine already in the registry is left
/// running untouched. Returns every configured engine's `(name, port)`,
/// whether freshly launched or already running — this is what both
/// startup and a live `scan` report back to their caller.
pub async fn scan_and_load_engines(ctx: &ScanContext) -> anyhow::Result<Vec<(String, u16)>> {
    let config = AgentConfig::load(&ctx.cli)?;
    let mut current = Vec::with_capacity(config.engines.len());

    for engine_cfg in &config.engines {
        current.push((engine_cfg.name.clone(), engine_cfg.port));

        let handle = {
            let mut reg = ctx.registry.lock().await;
            match reg.add_engine(
                engine_cfg.name.clone(),
                engine_cfg.dir.to_string_lossy().into_owned(),
                engine_cfg.executable.clone(),
                engine_cfg.port,
                engine_cfg.args.clone(),
            ) {
                Ok(handle) => handle,
                Err(CoreError::DuplicateEngine(_)) => continue,
                Err(e) => {
                    tracing::warn!(engine = %engine_cfg.name, error = %e, "failed to register engine");
                    continue;
                }
            }
        };

        let runtime = Arc::new(EngineRuntime {
            registry: ctx.registry.clone(),
            engine: handle,
            name: engine_cfg.name.clone(),
            dir: engine_cfg.dir.clone(),
            executable: engine_cfg.executable.clone(),
            args: engine_cfg.args.clone(),
            port: engine_cfg.port,
            jre_header: ctx.jre_header,
            tasks: ctx.tasks.clone(),
        });

        let bind_addr = ctx.bind_addr.clone();
        let shutdown = ctx.shutdown.clone();
        ctx.tasks.spawn(async move {
            if let Err(e) = listener::run(bind_addr, runtime, shutdown).await {
                tracing::error!(error = %e, "engine listener exited with error");
            }
        });

        // Pace engine launches, matching the original daemon's behavior
        // of not slamming every listener bind in the same instant.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }

    Ok(current)
}
