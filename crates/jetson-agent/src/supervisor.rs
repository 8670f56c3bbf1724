//! Per-client engine process supervision.
//!
//! Spawns the client's private copy of the engine executable directly
//! via `tokio::process::Command`, with stdin/stdout bound to the
//! already-created request/response pipes. This replaces the original
//! daemon's `system("cd <dir> && <exe> < req > rsp")` shell composition:
//! a direct spawn gives us a `Child` handle we can `kill()` if either
//! bridge fails, which a shelled-out command cannot offer.

use std::path::Path;

use tokio::process::{Child, Command};

use crate::error::AgentError;
use crate::pipes::PipePaths;

/// Copy the engine executable to a per-client name (`jei_<clientIp>_<engineName>`)
/// inside the engine directory, preserving executability.
pub async fn stage_instance_executable(
    engine_dir: &Path,
    executable: &str,
    instance_name: &str,
) -> Result<std::path::PathBuf, AgentError> {
    let src = engine_dir.join(executable);
    let dst = engine_dir.join(instance_name);

    tokio::fs::copy(&src, &dst)
        .await
        .map_err(|e| AgentError::ExecutableCopy {
            path: dst.display().to_string(),
            source: e,
        })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = tokio::fs::metadata(&dst)
            .await
            .map_err(|e| AgentError::ExecutableCopy {
                path: dst.display().to_string(),
                source: e,
            })?
            .permissions();
        perms.set_mode(perms.mode() | 0o111);
        tokio::fs::set_permissions(&dst, perms)
            .await
            .map_err(|e| AgentError::ExecutableCopy {
                path: dst.display().to_string(),
                source: e,
            })?;
    }

    Ok(dst)
}

/// Spawn the staged instance executable with its stdin/stdout bound to
/// the request/response pipes, and its launch arguments split from the
/// engine's configured colon-separated argument string.
#[cfg(unix)]
pub async fn spawn_instance(
    engine_dir: &Path,
    instance_path: &std::path::Path,
    args: &[String],
    paths: &PipePaths,
) -> Result<Child, AgentError> {
    let req_path = paths.req.clone();
    let rsp_path = paths.rsp.clone();

    // Opening a FIFO blocks until the peer end is opened; run it on a
    // blocking thread so it can't stall the async executor while the
    // ingress/egress bridges are opening their own ends concurrently.
    let (stdin_file, stdout_file) = tokio::task::spawn_blocking(move || {
        use std::fs::OpenOptions;
        let stdin = OpenOptions::new().read(true).open(&req_path)?;
        let stdout = OpenOptions::new().write(true).open(&rsp_path)?;
        std::io::Result::Ok((stdin, stdout))
    })
    .await
    .expect("blocking pipe-open task panicked")
    .map_err(|e| AgentError::PipeCreate {
        path: paths.req.clone(),
        source: e,
    })?;

    let mut cmd = Command::new(instance_path);
    cmd.current_dir(engine_dir)
        .args(args)
        .stdin(std::process::Stdio::from(stdin_file))
        .stdout(std::process::Stdio::from(stdout_file))
        .stderr(std::process::Stdio::null());

    cmd.spawn()
        .map_err(|e| AgentError::SpawnFailed(instance_path.display().to_string(), e))
}

#[cfg(windows)]
pub async fn spawn_instance(
    engine_dir: &Path,
    instance_path: &std::path::Path,
    args: &[String],
    req_pipe: tokio::net::windows::named_pipe::NamedPipeServer,
    rsp_pipe: tokio::net::windows::named_pipe::NamedPipeServer,
) -> Result<Child, AgentError> {
    // On Windows the pipe server ends can't be handed directly to
    // `Stdio`; the child inherits the pipe handles via the named pipe
    // it connects to by name at startup, so the server ends are kept
    // open by the bridges and not attached to the child's stdio here.
    let _ = (req_pipe, rsp_pipe);

    let mut cmd = Command::new(instance_path);
    cmd.current_dir(engine_dir).args(args);

    cmd.spawn()
        .map_err(|e| AgentError::SpawnFailed(instance_path.display().to_string(), e))
}
