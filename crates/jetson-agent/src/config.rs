//! CLI overrides and config-file loading.
//!
//! Three sources layer over each other, highest priority first:
//! 1. `--mgmt-port` (CLI flag)
//! 2. the `mgmt.port` file in the working directory
//! 3. the built-in default, `53350`
//!
//! The engine list itself always comes from `jetson_agent.conf`; there
//! is no CLI override for individual engine entries.

use std::path::{Path, PathBuf};

use clap::Parser;
use jetson_protocol::parse_config_str;

/// Default management port, used when neither the CLI flag nor the
/// `mgmt.port` file override it.
pub const DEFAULT_MGMT_PORT: u16 = 53350;

#[derive(Debug, Parser)]
#[command(name = "jetson-agent", about = "Remote UCI chess-engine gateway")]
pub struct CliArgs {
    /// Working directory the agent operates from (engine directories,
    /// config file, and mgmt port file are all resolved relative to it).
    #[arg(long, default_value = ".")]
    pub work_dir: PathBuf,

    /// Agent configuration file, relative to `work_dir` unless absolute.
    #[arg(long, default_value = "jetson_agent.conf")]
    pub conf: PathBuf,

    /// Management port override file, relative to `work_dir` unless absolute.
    #[arg(long, default_value = "mgmt.port")]
    pub mgmt_port_file: PathBuf,

    /// Management port; takes precedence over the mgmt port file.
    #[arg(long)]
    pub mgmt_port: Option<u16>,

    /// Interface to bind engine and management listeners to.
    #[arg(long, default_value = "0.0.0.0")]
    pub bind_addr: String,
}

/// One engine record, fully resolved against the working directory.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub name: String,
    pub dir: PathBuf,
    pub executable: String,
    pub port: u16,
    pub args: Vec<String>,
}

/// The agent's fully resolved configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub bind_addr: String,
    pub mgmt_port: u16,
    pub work_dir: PathBuf,
    pub engines: Vec<EngineConfig>,
}

impl AgentConfig {
    /// Load configuration from the CLI args: parse the config file,
    /// resolve each engine's directory, drop duplicates and engines
    /// whose directory doesn't exist, and resolve the management port.
    pub fn load(cli: &CliArgs) -> anyhow::Result<Self> {
        let conf_path = resolve(&cli.work_dir, &cli.conf);
        let contents = std::fs::read_to_string(&conf_path)
            .map_err(|e| anyhow::anyhow!("reading config file {}: {e}", conf_path.display()))?;

        let lines = parse_config_str(&contents, |line_no, raw, e| {
            tracing::warn!(line_no, raw, error = %e, "skipping malformed config line");
        });

        let mut engines = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for line in lines {
            if !seen.insert(line.engine_name.clone()) {
                tracing::warn!(engine = %line.engine_name, "duplicate engine name in config, first wins");
                continue;
            }

            let dir = cli.work_dir.join(&line.engine_name);
            if !dir.is_dir() {
                tracing::warn!(engine = %line.engine_name, dir = %dir.display(), "engine directory missing, skipping");
                seen.remove(&line.engine_name);
                continue;
            }

            let executable = ensure_exe_suffix(&line.executable);

            engines.push(EngineConfig {
                name: line.engine_name,
                dir,
                executable,
                port: line.port,
                args: line.args,
            });
        }

        let mgmt_port = cli
            .mgmt_port
            .or_else(|| read_mgmt_port_file(&resolve(&cli.work_dir, &cli.mgmt_port_file)))
            .unwrap_or(DEFAULT_MGMT_PORT);

        Ok(AgentConfig {
            bind_addr: cli.bind_addr.clone(),
            mgmt_port,
            work_dir: cli.work_dir.clone(),
            engines,
        })
    }
}

fn resolve(work_dir: &Path, maybe_relative: &Path) -> PathBuf {
    if maybe_relative.is_absolute() {
        maybe_relative.to_path_buf()
    } else {
        work_dir.join(maybe_relative)
    }
}

fn read_mgmt_port_file(path: &Path) -> Option<u16> {
    std::fs::read_to_string(path).ok()?.trim().parse().ok()
}

#[cfg(target_os = "windows")]
fn ensure_exe_suffix(executable: &str) -> String {
    if executable.to_lowercase().ends_with(".exe") {
        executable.to_string()
    } else {
        format!("{executable}.exe")
    }
}

#[cfg(not(target_os = "windows"))]
fn ensure_exe_suffix(executable: &str) -> String {
    executable.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_conf(dir: &Path, contents: &str) -> PathBuf {
        let path = dir.join("jetson_agent.conf");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn skips_engines_whose_directory_is_missing() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("stockfish")).unwrap();
        write_conf(
            tmp.path(),
            "stockfish 53400 stockfish\nrybka 53401 rybka\n",
        );

        let cli = CliArgs {
            work_dir: tmp.path().to_path_buf(),
            conf: PathBuf::from("jetson_agent.conf"),
            mgmt_port_file: PathBuf::from("mgmt.port"),
            mgmt_port: None,
            bind_addr: "0.0.0.0".to_string(),
        };

        let cfg = AgentConfig::load(&cli).unwrap();
        assert_eq!(cfg.engines.len(), 1);
        assert_eq!(cfg.engines[0].name, "stockfish");
        assert_eq!(cfg.mgmt_port, DEFAULT_MGMT_PORT);
    }

    #[test]
    fn duplicate_engine_names_first_wins() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("stockfish")).unwrap();
        write_conf(
            tmp.path(),
            "stockfish 53400 stockfish\nstockfish 53499 other\n",
        );

        let cli = CliArgs {
            work_dir: tmp.path().to_path_buf(),
            conf: PathBuf::from("jetson_agent.conf"),
            mgmt_port_file: PathBuf::from("mgmt.port"),
            mgmt_port: None,
            bind_addr: "0.0.0.0".to_string(),
        };

        let cfg = AgentConfig::load(&cli).unwrap();
        assert_eq!(cfg.engines.len(), 1);
        assert_eq!(cfg.engines[0].port, 53400);
    }

    #[test]
    fn mgmt_port_file_overrides_default() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("stockfish")).unwrap();
        write_conf(tmp.path(), "stockfish 53400 stockfish\n");
        std::fs::write(tmp.path().join("mgmt.port"), "60000\n").unwrap();

        let cli = CliArgs {
            work_dir: tmp.path().to_path_buf(),
            conf: PathBuf::from("jetson_agent.conf"),
            mgmt_port_file: PathBuf::from("mgmt.port"),
            mgmt_port: None,
            bind_addr: "0.0.0.0".to_string(),
        };

        let cfg = AgentConfig::load(&cli).unwrap();
        assert_eq!(cfg.mgmt_port, 60000);
    }

    #[test]
    fn cli_mgmt_port_wins_over_file() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("stockfish")).unwrap();
        write_conf(tmp.path(), "stockfish 53400 stockfish\n");
        std::fs::write(tmp.path().join("mgmt.port"), "60000\n").unwrap();

        let cli = CliArgs {
            work_dir: tmp.path().to_path_buf(),
            conf: PathBuf::from("jetson_agent.conf"),
            mgmt_port_file: PathBuf::from("mgmt.port"),
            mgmt_port: Some(12345),
            bind_addr: "0.0.0.0".to_string(),
        };

        let cfg = AgentConfig::load(&cli).unwrap();
        assert_eq!(cfg.mgmt_port, 12345);
    }
}
