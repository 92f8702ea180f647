//! Error types for driver operations.

use espbridge_protocol::{ProtocolError, ResultCode};
use thiserror::Error;

/// Errors that can occur while driving the co-processor.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// No recognized terminal phrase, token, or frame arrived in time.
    #[error("timeout waiting for device reply")]
    Timeout,

    /// The device explicitly replied with a negative terminal phrase.
    #[error("device replied {0:?}")]
    Device(ResultCode),

    /// The send handshake did not end in an acknowledgement. Every outcome
    /// other than `SEND OK` collapses into this one failure; the code the
    /// device actually produced is retained for diagnosis.
    #[error("send not acknowledged (device replied {0:?})")]
    SendFailed(ResultCode),

    /// A zero-length payload was supplied; no command was issued.
    #[error("payload is empty")]
    EmptyPayload,

    /// A channel id is required in multi-connection mode but none was given.
    #[error("channel id required in multi-connection mode")]
    ChannelRequired,

    /// Invalid protocol value supplied by the caller.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Result type alias for driver operations.
pub type DriverResult<T> = Result<T, DriverError>;
