//! Parser for `jetson_agent.conf` lines.
//!
//! Grammar, one record per line:
//!
//! `<engineName> <port> <executable> [<colonSeparatedArgs>]`
//!
//! - Lines that are empty, all-whitespace, or start with `#` are comments
//!   and parse to `None`.
//! - `args` is optional; when present it is a colon-separated string
//!   (`a:b:c`), split on `:` with empty segments dropped. Absent args
//!   means no launch arguments at all.

use std::num::ParseIntError;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigLineError {
    #[error("expected at least 3 fields (name, port, executable), found {0}")]
    TooFewFields(usize),

    #[error("invalid port '{0}'")]
    InvalidPort(String),
}

/// One parsed, non-comment line of `jetson_agent.conf`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLine {
    pub engine_name: String,
    pub port: u16,
    pub executable: String,
    pub args: Vec<String>,
}

/// Parse a single config line.
///
/// Returns `Ok(None)` for comments/blank lines, `Ok(Some(_))` for a
/// well-formed record, and `Err` for a malformed non-comment line.
pub fn parse_config_line(line: &str) -> Result<Option<ConfigLine>, ConfigLineError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let fields: Vec<&str> = trimmed.split_whitespace().collect();
    if fields.len() < 3 {
        return Err(ConfigLineError::TooFewFields(fields.len()));
    }

    let engine_name = fields[0].to_string();
    let port: u16 = fields[1]
        .parse()
        .map_err(|_: ParseIntError| ConfigLineError::InvalidPort(fields[1].to_string()))?;
    let executable = fields[2].to_string();
    let args = match fields.get(3) {
        Some(raw) => split_args(raw),
        None => Vec::new(),
    };

    Ok(Some(ConfigLine {
        engine_name,
        port,
        executable,
        args,
    }))
}

/// Parse an entire config file, returning only the well-formed records.
///
/// Malformed lines are reported via `on_error` (line number, raw line,
/// error) rather than aborting the whole load — one bad line shouldn't
/// take down every other engine in the file.
pub fn parse_config_str<'a>(
    contents: &'a str,
    mut on_error: impl FnMut(usize, &'a str, ConfigLineError),
) -> Vec<ConfigLine> {
    let mut out = Vec::new();
    for (idx, raw_line) in contents.lines().enumerate() {
        match parse_config_line(raw_line) {
            Ok(Some(line)) => out.push(line),
            Ok(None) => {}
            Err(e) => on_error(idx + 1, raw_line, e),
        }
    }
    out
}

fn split_args(raw: &str) -> Vec<String> {
    raw.split(':')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_and_comment_lines_are_skipped() {
        assert_eq!(parse_config_line("").unwrap(), None);
        assert_eq!(parse_config_line("   ").unwrap(), None);
        assert_eq!(parse_config_line("# a comment").unwrap(), None);
    }

    #[test]
    fn minimal_line_has_no_args() {
        let line = parse_config_line("stockfish 53400 stockfish").unwrap().unwrap();
        assert_eq!(line.engine_name, "stockfish");
        assert_eq!(line.port, 53400);
        assert_eq!(line.executable, "stockfish");
        assert!(line.args.is_empty());
    }

    #[test]
    fn colon_separated_args_are_split() {
        let line = parse_config_line("stockfish 53400 stockfish Threads=4:Hash=256")
            .unwrap()
            .unwrap();
        assert_eq!(line.args, vec!["Threads=4", "Hash=256"]);
    }

    #[test]
    fn too_few_fields_is_an_error() {
        assert!(matches!(
            parse_config_line("stockfish 53400"),
            Err(ConfigLineError::TooFewFields(2))
        ));
    }

    #[test]
    fn invalid_port_is_an_error() {
        assert!(matches!(
            parse_config_line("stockfish notaport stockfish"),
            Err(ConfigLineError::InvalidPort(_))
        ));
    }

    #[test]
    fn parse_config_str_skips_malformed_lines_and_reports_them() {
        let conf = "stockfish 53400 stockfish\n# comment\nbroken\nrybka 53401 rybka\n";
        let mut errors = Vec::new();
        let lines = parse_config_str(conf, |no, raw, e| errors.push((no, raw.to_string(), e)));
        assert_eq!(lines.len(), 2);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, 3);
    }
}
