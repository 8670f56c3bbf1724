//! The `id name` rewrite applied to the engine→GUI (egress) stream.
//!
//! A UCI engine identifies itself with a line like `id name Stockfish 15`.
//! Before forwarding that to the remote GUI, the agent tags the name with
//! an architecture header and an origin stamp so a GUI juggling engines
//! from several agents can tell them apart:
//!
//! `id name Stockfish 15` becomes
//! `id name JRE_X64LNX_10.0.0.5_stockfish##Stockfish 15`
//!
//! This operates on whatever chunk the egress bridge happened to read
//! off the pipe. An `id name` line split across two reads will not be
//! rewritten — an accepted limitation carried over unchanged from the
//! original daemon.

const ID_NAME_MARKER: &str = "id name ";

/// Rewrite every `id name <x>` occurrence in `chunk`, or return it
/// unchanged if the marker isn't present.
pub fn rewrite_id_name(chunk: &str, jre_header: &str, serv_ip: &str, engine_name: &str) -> String {
    let Some(marker_pos) = chunk.find(ID_NAME_MARKER) else {
        return chunk.to_string();
    };

    let name_start = marker_pos + ID_NAME_MARKER.len();
    let rest = &chunk[name_start..];
    let name_end = rest.find('\n').map(|i| name_start + i).unwrap_or(chunk.len());
    let original_name = &chunk[name_start..name_end];

    let mut out = String::with_capacity(chunk.len() + original_name.len() + jre_header.len() + serv_ip.len() + engine_name.len());
    out.push_str(&chunk[..name_start]);
    out.push_str(jre_header);
    out.push_str(serv_ip);
    out.push('_');
    out.push_str(engine_name);
    out.push_str("##");
    out.push_str(original_name);
    out.push_str(&chunk[name_end..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_without_id_name_is_untouched() {
        let chunk = "uciok\n";
        assert_eq!(rewrite_id_name(chunk, "JRE_X64LNX_", "10.0.0.5", "stockfish"), chunk);
    }

    #[test]
    fn id_name_line_is_rewritten_with_origin_tag() {
        let chunk = "id name Stockfish 15\nuciok\n";
        let rewritten = rewrite_id_name(chunk, "JRE_X64LNX_", "10.0.0.5", "stockfish");
        assert_eq!(
            rewritten,
            "id name JRE_X64LNX_10.0.0.5_stockfish##Stockfish 15\nuciok\n"
        );
    }

    #[test]
    fn id_name_at_end_of_chunk_without_trailing_newline() {
        let chunk = "id name Stockfish 15";
        let rewritten = rewrite_id_name(chunk, "JRE_X64LNX_", "10.0.0.5", "stockfish");
        assert_eq!(rewritten, "id name JRE_X64LNX_10.0.0.5_stockfish##Stockfish 15");
    }

    #[test]
    fn original_name_is_preserved_after_the_separator() {
        let chunk = "id name Komodo Dragon 3\n";
        let rewritten = rewrite_id_name(chunk, "JRE_XAVIER_", "192.168.1.2", "komodo");
        assert!(rewritten.ends_with("##Komodo Dragon 3\n"));
        assert!(rewritten.starts_with("id name JRE_XAVIER_192.168.1.2_komodo##"));
    }
}
