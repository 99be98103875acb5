//! Wire text encoding and decoding.
//!
//! Decoding is segment-local: a malformed segment yields an error for that
//! segment only, and the remaining segments still decode.

use crate::command::{Command, CommandBatch};
use crate::error::ProtocolError;
use crate::parameter::{Parameter, ParameterId};

/// Separates the parameter token and its arguments.
pub const FIELD_DELIMITER: char = '|';
/// Terminates every command of a batch.
pub const BATCH_DELIMITER: char = ';';

/// Encode one command as a single-command batch (`rotation|30;`).
#[must_use]
pub fn encode_command(parameter: ParameterId, args: &[i32]) -> String {
    let mut text = String::from(parameter.as_str());
    for arg in args {
        text.push(FIELD_DELIMITER);
        text.push_str(&arg.to_string());
    }
    text.push(BATCH_DELIMITER);
    text
}

/// Encode a batch; always ends with the batch delimiter unless empty.
#[must_use]
pub fn encode(batch: &CommandBatch) -> String {
    batch.to_string()
}

/// Decode wire text into per-segment results, in order.
///
/// Empty segments (including the one after the trailing delimiter) are
/// dropped, so empty input decodes to an empty list.
#[must_use]
pub fn decode(text: &str) -> Vec<Result<Command, ProtocolError>> {
    text.split(BATCH_DELIMITER)
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(decode_segment)
        .collect()
}

/// Decode wire text, failing on the first malformed segment.
pub fn decode_batch(text: &str) -> Result<CommandBatch, ProtocolError> {
    decode(text).into_iter().collect()
}

/// Decode one segment (no batch delimiter) into a command.
pub fn decode_segment(segment: &str) -> Result<Command, ProtocolError> {
    let mut fields = segment.split(FIELD_DELIMITER);
    let token = fields.next().unwrap_or_default().trim();
    if token.is_empty() {
        return Err(ProtocolError::EmptyParameter {
            segment: segment.into(),
        });
    }
    let args = fields
        .map(|field| {
            field
                .trim()
                .parse::<i32>()
                .map_err(|_| ProtocolError::InvalidArgument {
                    segment: segment.into(),
                    argument: field.into(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Command {
        parameter: Parameter::parse(token),
        args,
    })
}
