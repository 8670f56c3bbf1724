//! Cross-platform request/response pipe creation.
//!
//! Each connected client gets a private pair: a request pipe the
//! ingress bridge writes into and the engine reads as stdin, and a
//! response pipe the engine writes to as stdout and the egress bridge
//! reads from. On Unix these are named FIFOs in the engine directory;
//! on Windows they're named pipes under the `\\.\pipe\` namespace.

use crate::error::AgentError;

/// The two pipe identifiers for one client session.
///
/// On Unix these are filesystem paths; on Windows they're
/// `\\.\pipe\...` names. Either way they're just strings until opened.
#[derive(Debug, Clone)]
pub struct PipePaths {
    pub req: String,
    pub rsp: String,
}

/// Compute (but don't yet create) the pipe identifiers for a client.
pub fn pipe_paths(engine_dir: &str, engine_name: &str, client_ip: &str) -> PipePaths {
    #[cfg(unix)]
    {
        PipePaths {
            req: format!("{engine_dir}/{engine_name}_req_{client_ip}"),
            rsp: format!("{engine_dir}/{engine_name}_rsp_{client_ip}"),
        }
    }
    #[cfg(windows)]
    {
        let _ = engine_dir;
        PipePaths {
            req: format!(r"\\.\pipe\{engine_name}_req_{client_ip}"),
            rsp: format!(r"\\.\pipe\{engine_name}_rsp_{client_ip}"),
        }
    }
}

#[cfg(unix)]
pub mod unix {
    use super::*;
    use nix::sys::stat::Mode;
    use nix::unistd::mkfifo;

    /// Create both FIFOs with mode 0666, matching the original daemon's
    /// world-readable-and-writable pipe permissions.
    pub fn create_fifo_pair(paths: &PipePaths) -> Result<(), AgentError> {
        for path in [&paths.req, &paths.rsp] {
            if std::path::Path::new(path).exists() {
                continue;
            }
            mkfifo(path.as_str(), Mode::from_bits_truncate(0o666)).map_err(|e| {
                AgentError::PipeCreate {
                    path: path.clone(),
                    source: std::io::Error::from(e),
                }
            })?;
        }
        Ok(())
    }
}

#[cfg(windows)]
pub mod windows {
    use super::*;
    use tokio::net::windows::named_pipe::{NamedPipeServer, ServerOptions};

    /// Create the Windows named pipe server ends. The engine process is
    /// spawned with its stdio redirected through the *client* ends,
    /// which Windows opens implicitly when a process connects to the
    /// pipe name; the server ends are what the bridges read/write.
    pub fn create_named_pipe_pair(
        paths: &PipePaths,
    ) -> Result<(NamedPipeServer, NamedPipeServer), AgentError> {
        let req = ServerOptions::new()
            .access_outbound(false)
            .access_inbound(true)
            .create(&paths.req)
            .map_err(|e| AgentError::PipeCreate {
                path: paths.req.clone(),
                source: e,
            })?;
        let rsp = ServerOptions::new()
            .access_outbound(true)
            .access_inbound(false)
            .create(&paths.rsp)
            .map_err(|e| AgentError::PipeCreate {
                path: paths.rsp.clone(),
                source: e,
            })?;
        Ok((req, rsp))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn pipe_paths_are_namespaced_by_client_ip() {
        let paths = pipe_paths("stockfish", "stockfish", "10.0.0.9");
        assert_eq!(paths.req, "stockfish/stockfish_req_10.0.0.9");
        assert_eq!(paths.rsp, "stockfish/stockfish_rsp_10.0.0.9");
    }

    #[test]
    fn create_fifo_pair_creates_both_fifos() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_str().unwrap();
        let paths = pipe_paths(dir, "stockfish", "10.0.0.9");
        unix::create_fifo_pair(&paths).unwrap();
        assert!(std::path::Path::new(&paths.req).exists());
        assert!(std::path::Path::new(&paths.rsp).exists());
    }
}
