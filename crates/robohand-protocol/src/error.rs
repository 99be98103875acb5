//! Protocol errors.

#![allow(missing_docs)]

use smol_str::SmolStr;
use thiserror::Error;

/// Errors raised while decoding wire text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Segment has no parameter token before the first field delimiter.
    #[error("missing parameter in segment '{segment}'")]
    EmptyParameter { segment: SmolStr },

    /// Argument is not a signed integer.
    #[error("invalid argument '{argument}' in segment '{segment}'")]
    InvalidArgument { segment: SmolStr, argument: SmolStr },

    /// Token does not name a known parameter.
    #[error("unknown parameter '{0}'")]
    UnknownParameter(SmolStr),
}
