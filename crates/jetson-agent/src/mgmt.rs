//! The management control plane: `scan` and `query` over a single TCP port.

use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use jetson_core::{GlobalLockFlag, Registry};
use jetson_protocol::{build_query_response, build_scan_response, QueryClientReport, QueryEngineReport};

use crate::scan::{self, ScanContext};

const CMD_BUFSIZE: usize = 64;

pub struct MgmtRuntime {
    pub registry: Arc<tokio::sync::Mutex<Registry>>,
    pub lock_flag: Arc<GlobalLockFlag>,
    pub jre_header: &'static str,
    pub scan_ctx: Arc<ScanContext>,
    pub tasks: TaskTracker,
}

pub async fn run(
    bind_addr: String,
    port: u16,
    runtime: Arc<MgmtRuntime>,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let addr = format!("{bind_addr}:{port}");
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(addr, "management listener ready");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!("management listener shutting down");
                return Ok(());
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((socket, peer)) => {
                        tracing::info!(%peer, "management client connected");
                        let runtime = runtime.clone();
                        let tasks = runtime.tasks.clone();
                        tasks.spawn(async move {
                            if let Err(e) = serve_client(socket, runtime).await {
                                tracing::warn!(error = %e, "management client error");
                            }
                        });
                    }
                    Err(e) => tracing::warn!(error = %e, "management accept failed"),
                }
            }
        }
    }
}

async fn serve_client(mut socket: TcpStream, runtime: Arc<MgmtRuntime>) -> std::io::Result<()> {
    let server_ip = socket.local_addr()?.ip().to_string();
    let mut buf = vec![0u8; CMD_BUFSIZE];

    loop {
        let n = socket.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        let cmd = String::from_utf8_lossy(&buf[..n]);
        let cmd = cmd.trim();

        if cmd.starts_with("scan") {
            let resp = handle_scan(&runtime, &server_ip).await;
            socket.write_all(resp.as_bytes()).await?;
        } else if cmd == "query" {
            let resp = handle_query(&runtime).await;
            socket.write_all(resp.as_bytes()).await?;
        } else {
            tracing::debug!(cmd, "ignoring unknown management command");
        }
    }
}

async fn handle_scan(runtime: &MgmtRuntime, server_ip: &str) -> String {
    runtime.lock_flag.acquire().await;
    let entries = scan::scan_and_load_engines(&runtime.scan_ctx).await;
    runtime.lock_flag.release();

    let entries = match entries {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(error = %e, "scan failed to reload the config file");
            Vec::new()
        }
    };

    build_scan_response(
        runtime.jre_header,
        server_ip,
        entries.iter().map(|(n, p)| (n.as_str(), *p)),
    )
}

async fn handle_query(runtime: &MgmtRuntime) -> String {
    runtime.lock_flag.acquire().await;
    let snapshot = runtime.registry.lock().await.snapshot();
    runtime.lock_flag.release();

    let reports: Vec<QueryEngineReport<'_>> = snapshot
        .engines
        .iter()
        .map(|e| QueryEngineReport {
            name: &e.name,
            port: e.port,
            executable_path: &e.executable,
            clients: e
                .connected_clients()
                .map(|c| QueryClientReport {
                    client_ip: &c.client_ip,
                    server_ip: &c.server_ip,
                    instance_name: &c.instance_name,
                })
                .collect(),
        })
        .collect();

    build_query_response(&reports)
}
