//! Control errors.
//!
//! Every variant except [`ControlError::Bind`] is absorbed by the component
//! that raises it: the affected update is logged and dropped.

#![allow(missing_docs)]

use robohand_protocol::ProtocolError;
use smol_str::SmolStr;
use thiserror::Error;

/// Errors raised across the control path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    /// Malformed wire segment.
    #[error("parse error: {0}")]
    Parse(#[from] ProtocolError),

    /// Parameter token with no dispatch entry.
    #[error("unknown parameter '{0}'")]
    UnknownParameter(SmolStr),

    /// Argument count does not match the parameter.
    #[error("parameter '{parameter}' expects {expected} argument(s), got {got}")]
    ArityMismatch {
        parameter: SmolStr,
        expected: usize,
        got: usize,
    },

    /// Actuator driver rejected or failed an operation.
    #[error("driver error '{0}'")]
    Driver(SmolStr),

    /// Server unreachable (refused, unresolvable, or other connect failure).
    #[error("connect to {address} failed: {reason}")]
    Connect { address: SmolStr, reason: SmolStr },

    /// Connect attempt exceeded its timeout.
    #[error("connect to {0} timed out")]
    ConnectTimeout(SmolStr),

    /// Write failed on an established connection.
    #[error("send failed: {0}")]
    Send(SmolStr),

    /// Listening socket could not be bound.
    #[error("bind {address} failed: {reason}")]
    Bind { address: SmolStr, reason: SmolStr },

    /// Configuration error.
    #[error("invalid config '{0}'")]
    InvalidConfig(SmolStr),

    /// Preset store could not be read or written.
    #[error("preset store error '{0}'")]
    Preset(SmolStr),

    /// Playback started with nothing to play.
    #[error("playback list is empty")]
    EmptyPlayback,

    /// Socket or poller failure outside a single send.
    #[error("i/o error '{0}'")]
    Io(SmolStr),
}

impl ControlError {
    pub(crate) fn io(context: &str, err: &std::io::Error) -> Self {
        Self::Io(format!("{context}: {err}").into())
    }
}
