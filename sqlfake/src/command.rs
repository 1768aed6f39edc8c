//! Commands created by [`FakeConnection`].

use crate::connection::{FakeConnection, Response};
use crate::error::{Error, Result};
use crate::invocation::{ExecutionKind, Invocation};
use crate::parameter::ParameterCollection;
use crate::protocol::{Command, CommandType};
use crate::reader::FakeReader;
use crate::value::Value;

/// A command created by [`FakeConnection`]. Executing it records an
/// [`Invocation`] on the connection and answers from the setup queue.
#[derive(Debug, Clone)]
pub struct FakeCommand {
    connection: FakeConnection,
    text: String,
    command_type: CommandType,
    parameters: ParameterCollection,
}

impl FakeCommand {
    pub(crate) fn new(connection: FakeConnection) -> Self {
        Self {
            connection,
            text: String::new(),
            command_type: CommandType::default(),
            parameters: ParameterCollection::new(),
        }
    }

    /// The connection this command runs on.
    pub fn connection(&self) -> &FakeConnection {
        &self.connection
    }

    fn run<T>(&self, kind: ExecutionKind, take: fn(&Response) -> Option<T>) -> Result<T> {
        self.connection
            .dispatch(Invocation::capture(self, kind), take)
    }
}

impl Command for FakeCommand {
    type Error = Error;
    type Reader = FakeReader;

    fn command_text(&self) -> &str {
        &self.text
    }

    fn set_command_text(&mut self, text: &str) {
        self.text = text.to_string();
    }

    fn command_type(&self) -> CommandType {
        self.command_type
    }

    fn set_command_type(&mut self, command_type: CommandType) {
        self.command_type = command_type;
    }

    fn parameters(&self) -> &ParameterCollection {
        &self.parameters
    }

    fn parameters_mut(&mut self) -> &mut ParameterCollection {
        &mut self.parameters
    }

    fn execute_non_query(&mut self) -> Result<u64> {
        self.run(ExecutionKind::NonQuery, Response::rows_affected)
    }

    fn execute_scalar(&mut self) -> Result<Value> {
        self.run(ExecutionKind::Scalar, Response::scalar)
    }

    fn execute_reader(&mut self) -> Result<FakeReader> {
        self.run(ExecutionKind::Reader, Response::rows)
            .map(FakeReader::new)
    }
}
