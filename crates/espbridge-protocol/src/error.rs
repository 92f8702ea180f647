//! Error types for the protocol layer.

use thiserror::Error;

/// Errors that can occur when building protocol values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Channel id outside the single-digit range the wire grammar allows.
    #[error("invalid channel id {0}: must be a single decimal digit (0-9)")]
    InvalidChannel(u8),
}

/// Result type alias for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
