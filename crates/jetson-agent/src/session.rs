//! Per-client session: pipe setup, the ingress/egress bridges, and the
//! process supervisor, wired together and torn down as a unit.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::task::TaskTracker;

use jetson_core::{ClientHandle, EngineHandle, Registry};

use crate::pipes::{self, PipePaths};
use crate::supervisor;

/// Ingress bridge read chunk size, matching the original daemon's
/// request buffer.
const REQ_BUFSIZE: usize = 1024;

/// Egress bridge read chunk size, matching the original daemon's
/// response buffer.
const RSP_BUFSIZE: usize = 8192;

/// Everything a session needs that's shared across every client of one engine.
pub struct EngineRuntime {
    pub registry: Arc<Mutex<Registry>>,
    pub engine: EngineHandle,
    pub name: String,
    pub dir: PathBuf,
    pub executable: String,
    pub args: Vec<String>,
    pub port: u16,
    pub jre_header: &'static str,
    /// Shared with every other listener and session task in the agent,
    /// so a bounded shutdown join can actually wait for sessions this
    /// engine's listener spawns, not just the listener task itself.
    pub tasks: TaskTracker,
}

/// Set up and run one client's whole session to completion: stage the
/// instance executable, create pipes, allocate a registry slot, spawn
/// the engine process, and bridge bytes until either side closes.
pub async fn run_session(socket: TcpStream, runtime: Arc<EngineRuntime>) {
    let peer_addr = match socket.peer_addr() {
        Ok(a) => a,
        Err(e) => {
            tracing::warn!(error = %e, "could not read peer address, dropping connection");
            return;
        }
    };
    let local_addr = match socket.local_addr() {
        Ok(a) => a,
        Err(e) => {
            tracing::warn!(error = %e, "could not read local address, dropping connection");
            return;
        }
    };

    let client_ip = peer_addr.ip().to_string();
    let server_ip = local_addr.ip().to_string();
    let instance_name = format!("jei_{client_ip}_{}", runtime.name);

    let paths = pipes::pipe_paths(
        runtime.dir.to_string_lossy().as_ref(),
        &runtime.name,
        &client_ip,
    );

    if let Err(e) = create_pipes(&paths) {
        tracing::warn!(error = %e, engine = %runtime.name, client = %client_ip, "pipe setup failed, dropping connection");
        return;
    }

    let instance_path = match supervisor::stage_instance_executable(
        &runtime.dir,
        &runtime.executable,
        &instance_name,
    )
    .await
    {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(error = %e, "failed to stage instance executable, dropping connection");
            return;
        }
    };

    let client = {
        let mut reg = runtime.registry.lock().await;
        match reg.alloc_client(
            runtime.engine,
            client_ip.clone(),
            server_ip.clone(),
            instance_name.clone(),
            paths.req.clone(),
            paths.rsp.clone(),
        ) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, engine = %runtime.name, "client table full, dropping connection");
                return;
            }
        }
    };

    tracing::info!(engine = %runtime.name, client = %client_ip, instance = %instance_name, "client session starting");

    // The ingress/egress bridges and the engine process all open their
    // end of the request/response FIFOs in a blocking call that does
    // not return until the matching peer end is opened too (a FIFO
    // open blocks until both ends are present). All three have to be
    // spawned/started concurrently — spawning the engine process first
    // and awaiting it to completion before starting the bridges would
    // deadlock forever, since nothing else would ever open the other
    // end of either pipe.
    let (read_half, write_half) = socket.into_split();
    let ingress_path = paths.req.clone();
    let rsp_path = paths.rsp.clone();
    let jre_header = runtime.jre_header;
    let engine_name = runtime.name.clone();
    let server_ip_for_egress = server_ip.clone();

    let mut ingress = tokio::spawn(run_ingress(read_half, ingress_path));
    let mut egress = tokio::spawn(run_egress(
        write_half,
        rsp_path,
        jre_header,
        server_ip_for_egress,
        engine_name,
    ));

    #[cfg(unix)]
    let mut child = match supervisor::spawn_instance(&runtime.dir, &instance_path, &runtime.args, &paths).await {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(error = %e, "failed to spawn engine instance");
            ingress.abort();
            egress.abort();
            mark_disconnected(&runtime, client).await;
            return;
        }
    };

    // TODO(windows): wiring the spawned engine's real stdio to a named
    // pipe instance (rather than the bridge connecting as a second
    // client) needs `DuplicateHandle`-style plumbing not yet written;
    // bridges below will connect but the engine side is not spawned.
    #[cfg(windows)]
    let mut child: Option<tokio::process::Child> = None;

    tokio::select! {
        _ = &mut ingress => {},
        _ = &mut egress => {},
    }
    ingress.abort();
    egress.abort();

    #[cfg(unix)]
    {
        let _ = child.start_kill();
        let _ = child.wait().await;
    }
    #[cfg(windows)]
    {
        if let Some(mut child) = child {
            let _ = child.start_kill();
            let _ = child.wait().await;
        }
    }

    mark_disconnected(&runtime, client).await;
    tracing::info!(engine = %runtime.name, client = %client_ip, "client session ended");
}

async fn mark_disconnected(runtime: &EngineRuntime, client: ClientHandle) {
    let mut reg = runtime.registry.lock().await;
    reg.mark_client_disconnected(runtime.engine, client);
}

#[cfg(unix)]
fn create_pipes(paths: &PipePaths) -> Result<(), crate::error::AgentError> {
    pipes::unix::create_fifo_pair(paths)
}

#[cfg(windows)]
fn create_pipes(_paths: &PipePaths) -> Result<(), crate::error::AgentError> {
    // Windows named pipes are created lazily by ServerOptions::create
    // at open time rather than up front; nothing to pre-create here.
    Ok(())
}

/// Socket → engine stdin. Reads a chunk, appends `\n`, and forwards it
/// verbatim. A short/zero/error read is terminal for the session.
async fn run_ingress(mut socket: OwnedReadHalf, req_pipe_path: String) {
    let mut pipe = match open_for_write(&req_pipe_path).await {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(error = %e, path = %req_pipe_path, "failed to open request pipe");
            return;
        }
    };

    let mut buf = vec![0u8; REQ_BUFSIZE];
    loop {
        let n = match socket.read(&mut buf).await {
            Ok(n) if n > 0 && n < REQ_BUFSIZE => n,
            _ => break,
        };

        let mut frame = Vec::with_capacity(n + 1);
        frame.extend_from_slice(&buf[..n]);
        frame.push(b'\n');

        if pipe.write_all(&frame).await.is_err() {
            break;
        }
    }
}

/// Engine stdout → socket, applying the `id name` rewrite on the way out.
async fn run_egress(
    mut socket: OwnedWriteHalf,
    rsp_pipe_path: String,
    jre_header: &'static str,
    server_ip: String,
    engine_name: String,
) {
    let mut pipe = match open_for_read(&rsp_pipe_path).await {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(error = %e, path = %rsp_pipe_path, "failed to open response pipe");
            return;
        }
    };

    let mut buf = vec![0u8; RSP_BUFSIZE];
    loop {
        let n = match pipe.read(&mut buf).await {
            Ok(n) if n > 0 => n,
            _ => break,
        };

        let chunk = String::from_utf8_lossy(&buf[..n]);
        let rewritten = jetson_protocol::rewrite_id_name(&chunk, jre_header, &server_ip, &engine_name);

        if socket.write_all(rewritten.as_bytes()).await.is_err() {
            break;
        }
    }
}

type BoxedReader = std::pin::Pin<Box<dyn tokio::io::AsyncRead + Send>>;
type BoxedWriter = std::pin::Pin<Box<dyn tokio::io::AsyncWrite + Send>>;

#[cfg(unix)]
async fn open_for_write(path: &str) -> std::io::Result<BoxedWriter> {
    let path = path.to_string();
    let file = tokio::task::spawn_blocking(move || std::fs::OpenOptions::new().write(true).open(path))
        .await
        .expect("blocking open task panicked")?;
    Ok(Box::pin(tokio::fs::File::from_std(file)))
}

#[cfg(unix)]
async fn open_for_read(path: &str) -> std::io::Result<BoxedReader> {
    let path = path.to_string();
    let file = tokio::task::spawn_blocking(move || std::fs::OpenOptions::new().read(true).open(path))
        .await
        .expect("blocking open task panicked")?;
    Ok(Box::pin(tokio::fs::File::from_std(file)))
}

/// On Windows the request/response pipes are named-pipe server
/// instances created ahead of time; the bridges connect to them as
/// clients, mirroring how the spawned engine connects to its own
/// stdio-equivalent pipe by name.
#[cfg(windows)]
async fn open_for_write(path: &str) -> std::io::Result<BoxedWriter> {
    use tokio::net::windows::named_pipe::ClientOptions;
    let client = ClientOptions::new().write(true).open(path)?;
    Ok(Box::pin(client))
}

#[cfg(windows)]
async fn open_for_read(path: &str) -> std::io::Result<BoxedReader> {
    use tokio::net::windows::named_pipe::ClientOptions;
    let client = ClientOptions::new().read(true).open(path)?;
    Ok(Box::pin(client))
}
