//! Commands and batches.

use std::fmt;

use crate::codec::{BATCH_DELIMITER, FIELD_DELIMITER};
use crate::parameter::{Parameter, ParameterId};

/// One parameter update with its integer arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Command {
    /// Addressed channel.
    pub parameter: Parameter,
    /// Arguments in wire order.
    pub args: Vec<i32>,
}

impl Command {
    /// Build a command for a known parameter.
    pub fn new(parameter: ParameterId, args: impl Into<Vec<i32>>) -> Self {
        Self {
            parameter: Parameter::Known(parameter),
            args: args.into(),
        }
    }

    /// Single-angle command for one of the servo channels.
    #[must_use]
    pub fn angle(parameter: ParameterId, angle: i32) -> Self {
        Self::new(parameter, vec![angle])
    }

    /// LED colour command.
    #[must_use]
    pub fn led(red: i32, green: i32, blue: i32) -> Self {
        Self::new(ParameterId::Led, vec![red, green, blue])
    }

    /// Whether the argument count matches the parameter's arity.
    ///
    /// Unknown parameters never match.
    #[must_use]
    pub fn has_valid_arity(&self) -> bool {
        self.parameter
            .known()
            .is_some_and(|id| id.arity() == self.args.len())
    }
}

/// Renders `parameter|arg|...` without the batch delimiter.
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.parameter.as_str())?;
        for arg in &self.args {
            write!(f, "{FIELD_DELIMITER}{arg}")?;
        }
        Ok(())
    }
}

/// Ordered commands applied together as one message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CommandBatch {
    commands: Vec<Command>,
}

impl CommandBatch {
    /// Empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a command for a known parameter.
    pub fn push(&mut self, parameter: ParameterId, args: impl Into<Vec<i32>>) -> &mut Self {
        self.commands.push(Command::new(parameter, args));
        self
    }

    /// Append an already built command.
    pub fn push_command(&mut self, command: Command) -> &mut Self {
        self.commands.push(command);
        self
    }

    /// Commands in order.
    #[must_use]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Iterate over commands in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Command> {
        self.commands.iter()
    }

    /// Number of commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether the batch holds no commands.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Take the commands out.
    #[must_use]
    pub fn into_commands(self) -> Vec<Command> {
        self.commands
    }
}

/// Renders the wire form, trailing delimiter included.
impl fmt::Display for CommandBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for command in &self.commands {
            write!(f, "{command}{BATCH_DELIMITER}")?;
        }
        Ok(())
    }
}

impl From<Vec<Command>> for CommandBatch {
    fn from(commands: Vec<Command>) -> Self {
        Self { commands }
    }
}

impl FromIterator<Command> for CommandBatch {
    fn from_iter<T: IntoIterator<Item = Command>>(iter: T) -> Self {
        Self {
            commands: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for CommandBatch {
    type Item = Command;
    type IntoIter = std::vec::IntoIter<Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.into_iter()
    }
}

impl<'a> IntoIterator for &'a CommandBatch {
    type Item = &'a Command;
    type IntoIter = std::slice::Iter<'a, Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}
