use std::path::PathBuf;

/// Errors surfaced by the session layer to its callers.
///
/// Link failures during operation never show up here: the session recovers
/// from them itself. These are the errors a caller has to act on.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] rmpp_link_transport::TransportError),

    /// Reading a configuration file failed.
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Configuration JSON did not parse.
    #[error("config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// Configuration parsed but holds unusable values.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, LinkError>;
