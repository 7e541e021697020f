use std::io;

use thiserror::Error;

use crate::types::PowerState;

/// Result type used across this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (socket, OS, etc.).
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// A transport read timed out.
    ///
    /// Transports return this from [`crate::Transport::recv`]; the client reports it to callers
    /// as [`Error::AccessDenied`].
    #[error("timeout waiting for data")]
    Timeout,

    /// The controller did not answer in time or closed the stream.
    ///
    /// RIBCL gives no way to tell rejected credentials apart from an unresponsive controller,
    /// so both end up here.
    #[error("access denied: {0}")]
    AccessDenied(&'static str),

    /// Controller responded, but not in a form we recognize.
    #[error("protocol error: {0}")]
    Protocol(&'static str),

    /// Controller responded, but not in a form we recognize.
    #[error("protocol error: {0}")]
    ProtocolOwned(String),

    /// Invalid caller-supplied argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// The host did not reach the requested power state before the power timeout.
    #[error("host did not reach power state {expected} in time")]
    PowerStateNotReached {
        /// State we were waiting for.
        expected: PowerState,
    },
}

impl Error {
    pub(crate) fn protocol_owned(msg: impl Into<String>) -> Self {
        Self::ProtocolOwned(msg.into())
    }

    /// True for the "no usable answer" class of failures (timeouts and end of stream).
    pub fn is_access_denied(&self) -> bool {
        matches!(self, Self::AccessDenied(_))
    }

    /// True when the controller answered with something we could not parse.
    pub fn is_protocol(&self) -> bool {
        matches!(self, Self::Protocol(_) | Self::ProtocolOwned(_))
    }
}
