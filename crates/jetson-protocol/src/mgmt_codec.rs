//! Wire formatting for the management control plane (`scan` / `query`).
//!
//! These are pure string builders: given already-gathered facts about
//! the registry, produce the exact bytes the management listener
//! writes to the socket. Keeping them here (rather than inline in
//! `jetson-agent`) makes the wire format independently testable without
//! a TCP harness.

/// Terminal token ending a `scan` response.
pub const SCAN_DONE: &str = "scanisdone";

/// Terminal marker ending a `query` response.
pub const QUERY_DONE: &str = "================================<<<querydone\n\n";

/// One entry in a `scan` response: `<header><servIp>_<port>_<engineName>`.
pub fn format_scan_line(jre_header: &str, serv_ip: &str, port: u16, engine_name: &str) -> String {
    format!("{jre_header}{serv_ip}_{port}_{engine_name}")
}

/// Build a full `scan` response body (each engine on its own line,
/// followed by the terminal token), ready to write to the socket.
pub fn build_scan_response<'a>(
    jre_header: &str,
    serv_ip: &str,
    engines: impl Iterator<Item = (&'a str, u16)>,
) -> String {
    let mut out = String::new();
    for (name, port) in engines {
        out.push_str(&format_scan_line(jre_header, serv_ip, port, name));
        out.push('\n');
    }
    out.push_str(SCAN_DONE);
    out
}

/// One engine's contribution to a `query` report.
pub struct QueryEngineReport<'a> {
    pub name: &'a str,
    pub port: u16,
    pub executable_path: &'a str,
    pub clients: Vec<QueryClientReport<'a>>,
}

/// One connected client's contribution, nested under its engine.
pub struct QueryClientReport<'a> {
    pub client_ip: &'a str,
    pub server_ip: &'a str,
    pub instance_name: &'a str,
}

/// Render the full registry report for a `query` command.
pub fn build_query_response(engines: &[QueryEngineReport<'_>]) -> String {
    let mut out = String::new();
    for engine in engines {
        out.push_str(&format!(
            "engine: {} port: {} exe: {}\n",
            engine.name, engine.port, engine.executable_path
        ));
        for client in &engine.clients {
            out.push_str(&format!(
                "  client: {} via {} as {}\n",
                client.client_ip, client.server_ip, client.instance_name
            ));
        }
    }
    out.push_str(QUERY_DONE);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_line_matches_wire_format() {
        let line = format_scan_line("JRE_X64LNX_", "10.0.0.5", 53400, "stockfish");
        assert_eq!(line, "JRE_X64LNX_10.0.0.5_53400_stockfish");
    }

    #[test]
    fn scan_response_ends_with_scanisdone() {
        let engines = vec![("stockfish", 53400u16), ("rybka", 53401)];
        let resp = build_scan_response("JRE_X64LNX_", "10.0.0.5", engines.into_iter());
        let lines: Vec<&str> = resp.lines().collect();
        assert_eq!(lines[0], "JRE_X64LNX_10.0.0.5_53400_stockfish");
        assert_eq!(lines[1], "JRE_X64LNX_10.0.0.5_53401_rybka");
        assert_eq!(lines[2], "scanisdone");
    }

    #[test]
    fn empty_scan_response_is_just_the_done_token() {
        let resp = build_scan_response("JRE_X64LNX_", "10.0.0.5", std::iter::empty());
        assert_eq!(resp, "scanisdone");
    }

    #[test]
    fn query_response_ends_with_querydone_marker() {
        let engines = vec![QueryEngineReport {
            name: "stockfish",
            port: 53400,
            executable_path: "stockfish/stockfish",
            clients: vec![QueryClientReport {
                client_ip: "10.0.0.9",
                server_ip: "10.0.0.5",
                instance_name: "jei_10.0.0.9_stockfish",
            }],
        }];
        let resp = build_query_response(&engines);
        assert!(resp.ends_with(QUERY_DONE));
        assert!(resp.contains("engine: stockfish port: 53400"));
        assert!(resp.contains("jei_10.0.0.9_stockfish"));
    }
}
