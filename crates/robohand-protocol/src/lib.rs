//! `robohand-protocol` - batched text wire protocol for robotic hand commands.
//!
//! A command is `<parameter>|<arg>[|<arg>...]`; a batch joins commands with
//! `;` and always ends with a trailing `;`:
//!
//! ```
//! use robohand_protocol::{decode_batch, encode, CommandBatch, ParameterId};
//!
//! let mut batch = CommandBatch::new();
//! batch.push(ParameterId::Rotation, [30]);
//! batch.push(ParameterId::Led, [255, 0, 0]);
//! let text = encode(&batch);
//! assert_eq!(text, "rotation|30;led|255|0|0;");
//! assert_eq!(decode_batch(&text).unwrap(), batch);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Encoding and decoding of wire text.
pub mod codec;
/// Commands and batches.
pub mod command;
/// Protocol errors.
pub mod error;
/// Parameter identifiers.
pub mod parameter;

pub use codec::{
    decode, decode_batch, decode_segment, encode, encode_command, BATCH_DELIMITER,
    FIELD_DELIMITER,
};
pub use command::{Command, CommandBatch};
pub use error::ProtocolError;
pub use parameter::{Parameter, ParameterId};
