//! Error types shared by the protocol codecs.

use thiserror::Error;

pub use crate::config_codec::ConfigLineError;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed config line {line_no}: {source}")]
    Config {
        line_no: usize,
        #[source]
        source: ConfigLineError,
    },
}
