//! Per-engine TCP listener.
//!
//! One instance per registered engine. Accepts connections and spawns
//! a full client session (`session::run_session`) for each; never
//! touches another engine's state.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::session::{self, EngineRuntime};

pub async fn run(
    bind_addr: String,
    runtime: Arc<EngineRuntime>,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let addr = format!("{bind_addr}:{}", runtime.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(engine = %runtime.name, addr, "engine listener ready");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!(engine = %runtime.name, "engine listener shutting down");
                return Ok(());
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((socket, peer)) => {
                        tracing::info!(engine = %runtime.name, %peer, "accepted connection");
                        let runtime = runtime.clone();
                        let tasks = runtime.tasks.clone();
                        tasks.spawn(async move {
                            session::run_session(socket, runtime).await;
                        });
                    }
                    Err(e) => {
                        tracing::warn!(engine = %runtime.name, error = %e, "accept failed");
                    }
                }
            }
        }
    }
}
