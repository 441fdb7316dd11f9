//! Error types surfaced by session setup.
//!
//! Nothing that happens once a session is running is fatal: transport
//! failures are logged and recovered by retransmission, malformed datagrams
//! are dropped.  Only configuration and socket setup can fail a session.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArqError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("socket I/O error: {0}")]
    Io(#[from] std::io::Error),
}
