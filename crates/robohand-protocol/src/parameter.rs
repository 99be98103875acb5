//! Parameter identifiers.
//!
//! The string tokens are part of the wire format and are never renamed or
//! reused for another channel.

use std::fmt;
use std::str::FromStr;

use smol_str::SmolStr;

use crate::error::ProtocolError;

/// Symbolic channel name addressed by a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParameterId {
    /// Claw opening angle.
    Claw,
    /// Forward extension arm angle.
    ExtendArrow,
    /// Raise arm angle.
    RaiseArrow,
    /// Base rotation angle.
    Rotation,
    /// RGB LED colour.
    Led,
}

impl ParameterId {
    /// Every parameter, in wire-token order.
    pub const ALL: [ParameterId; 5] = [
        ParameterId::Claw,
        ParameterId::ExtendArrow,
        ParameterId::RaiseArrow,
        ParameterId::Rotation,
        ParameterId::Led,
    ];

    /// Stable wire token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Claw => "claw",
            Self::ExtendArrow => "extend_arrow",
            Self::RaiseArrow => "raise_arrow",
            Self::Rotation => "rotation",
            Self::Led => "led",
        }
    }

    /// Number of integer arguments the parameter takes.
    #[must_use]
    pub const fn arity(self) -> usize {
        match self {
            Self::Led => 3,
            Self::Claw | Self::ExtendArrow | Self::RaiseArrow | Self::Rotation => 1,
        }
    }

    /// Look up a parameter by its exact wire token.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.as_str() == token)
    }
}

impl fmt::Display for ParameterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParameterId {
    type Err = ProtocolError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::from_token(text).ok_or_else(|| ProtocolError::UnknownParameter(text.into()))
    }
}

/// Parameter token as decoded from the wire.
///
/// Unknown tokens survive decoding so the dispatcher can report and skip
/// them without losing the rest of the batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Parameter {
    /// One of the fixed channels.
    Known(ParameterId),
    /// Any other token, kept verbatim.
    Unknown(SmolStr),
}

impl Parameter {
    /// Classify a raw token.
    #[must_use]
    pub fn parse(token: &str) -> Self {
        match ParameterId::from_token(token) {
            Some(id) => Self::Known(id),
            None => Self::Unknown(token.into()),
        }
    }

    /// Token as it appears on the wire.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Known(id) => id.as_str(),
            Self::Unknown(token) => token.as_str(),
        }
    }

    /// The known id, if any.
    #[must_use]
    pub fn known(&self) -> Option<ParameterId> {
        match self {
            Self::Known(id) => Some(*id),
            Self::Unknown(_) => None,
        }
    }
}

impl From<ParameterId> for Parameter {
    fn from(value: ParameterId) -> Self {
        Self::Known(value)
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
