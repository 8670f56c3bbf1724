//! jetson-protocol
//!
//! Pure wire-level parsing/formatting for the agent. No networking, no
//! process spawning:
//!
//! - [`config_codec`]: `jetson_agent.conf` line grammar
//! - [`mgmt_codec`]: `scan` / `query` response formatting
//! - [`uci_rewrite`]: the `id name` egress rewrite

pub mod config_codec;
pub mod error;
pub mod mgmt_codec;
pub mod uci_rewrite;

pub use config_codec::{parse_config_line, parse_config_str, ConfigLine, ConfigLineError};
pub use error::ProtocolError;
pub use mgmt_codec::{build_query_response, build_scan_response, QueryClientReport, QueryEngineReport};
pub use uci_rewrite::rewrite_id_name;
