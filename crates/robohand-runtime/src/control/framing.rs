//! Splitting a client byte stream into decodable text.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use robohand_protocol::BATCH_DELIMITER;
use tracing::warn;

use crate::error::ControlError;

/// Largest undelimited buffer kept for one client.
pub const MAX_FRAME_BYTES: usize = 64 * 1024;

/// How the server turns reads into batch text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Framing {
    /// Each read chunk is decoded on its own. A command split across two
    /// reads is lost.
    #[default]
    Chunk,
    /// Bytes are buffered per client and released up to the last batch
    /// delimiter.
    Delimited,
}

impl Framing {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Chunk => "chunk",
            Self::Delimited => "delimited",
        }
    }
}

impl fmt::Display for Framing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Framing {
    type Err = ControlError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text.trim().to_ascii_lowercase().as_str() {
            "chunk" | "raw" => Ok(Self::Chunk),
            "delimited" | "reassemble" => Ok(Self::Delimited),
            other => Err(ControlError::InvalidConfig(
                format!("server.framing '{other}' (expected chunk|delimited)").into(),
            )),
        }
    }
}

/// Per-client reassembly buffer for [`Framing::Delimited`].
#[derive(Debug, Default)]
pub struct FrameBuffer {
    pending: Vec<u8>,
}

impl FrameBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `bytes` and return the text up to and including the last
    /// batch delimiter, if any. The remainder stays buffered.
    pub fn push(&mut self, bytes: &[u8]) -> Option<String> {
        self.pending.extend_from_slice(bytes);
        let delimiter = BATCH_DELIMITER as u8;
        match self.pending.iter().rposition(|byte| *byte == delimiter) {
            Some(last) => {
                let rest = self.pending.split_off(last + 1);
                let complete = std::mem::replace(&mut self.pending, rest);
                Some(lossy_text(&complete).into_owned())
            }
            None => {
                if self.pending.len() > MAX_FRAME_BYTES {
                    warn!(
                        bytes = self.pending.len(),
                        "undelimited frame too large, discarded"
                    );
                    self.pending.clear();
                }
                None
            }
        }
    }

    /// Bytes waiting for a delimiter.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.pending.len()
    }
}

/// Decode bytes as UTF-8, replacing invalid sequences.
pub(crate) fn lossy_text(bytes: &[u8]) -> Cow<'_, str> {
    let text = String::from_utf8_lossy(bytes);
    if matches!(text, Cow::Owned(_)) {
        warn!(bytes = bytes.len(), "non-utf8 input decoded lossily");
    }
    text
}
