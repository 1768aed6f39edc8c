//! A pass-through wrapper that records every command executed on any
//! [`Connection`], fake or real.

use crate::error::{self, Error};
use crate::invocation::{ExecutionKind, Invocation, InvocationLog, Invocations};
use crate::parameter::ParameterCollection;
use crate::protocol::{Command, CommandType, Connection, ConnectionState};
use crate::value::Value;

/// Wraps a connection and logs each execution before delegating it.
///
/// Results and errors of the wrapped connection are passed through
/// unchanged. The log is shared by every command created from the wrapper.
#[derive(Debug, Clone)]
pub struct RecordingConnection<C> {
    inner: C,
    log: InvocationLog,
}

impl<C: Connection> RecordingConnection<C> {
    /// Wrap `inner`. Fails if the connection does not route its executions
    /// through commands it creates.
    pub fn new(inner: C) -> error::Result<Self> {
        if !inner.supports_interception() {
            return Err(Error::UnsupportedConnectionType {
                type_name: std::any::type_name::<C>(),
            });
        }
        Ok(Self {
            inner,
            log: InvocationLog::new(),
        })
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut C {
        &mut self.inner
    }

    pub fn into_inner(self) -> C {
        self.inner
    }

    pub fn log(&self) -> &InvocationLog {
        &self.log
    }
}

impl<C: Connection> Connection for RecordingConnection<C> {
    type Error = C::Error;
    type Command = RecordingCommand<C::Command>;

    fn create_command(&self) -> Self::Command {
        RecordingCommand {
            inner: self.inner.create_command(),
            log: self.log.clone(),
        }
    }

    fn open(&mut self) -> std::result::Result<(), C::Error> {
        self.inner.open()
    }

    fn close(&mut self) -> std::result::Result<(), C::Error> {
        self.inner.close()
    }

    fn dispose(&mut self) -> std::result::Result<(), C::Error> {
        self.inner.dispose()
    }

    fn state(&self) -> ConnectionState {
        self.inner.state()
    }

    fn supports_interception(&self) -> bool {
        self.inner.supports_interception()
    }
}

impl<C> Invocations for RecordingConnection<C> {
    fn invocations(&self) -> Vec<Invocation> {
        self.log.invocations()
    }
}

/// A command created by [`RecordingConnection`].
#[derive(Debug, Clone)]
pub struct RecordingCommand<M> {
    inner: M,
    log: InvocationLog,
}

impl<M: Command> RecordingCommand<M> {
    pub fn inner(&self) -> &M {
        &self.inner
    }

    fn record(&self, kind: ExecutionKind) {
        self.log.push(Invocation::capture(&self.inner, kind));
    }
}

impl<M: Command> Command for RecordingCommand<M> {
    type Error = M::Error;
    type Reader = M::Reader;

    fn command_text(&self) -> &str {
        self.inner.command_text()
    }

    fn set_command_text(&mut self, text: &str) {
        self.inner.set_command_text(text)
    }

    fn command_type(&self) -> CommandType {
        self.inner.command_type()
    }

    fn set_command_type(&mut self, command_type: CommandType) {
        self.inner.set_command_type(command_type)
    }

    fn parameters(&self) -> &ParameterCollection {
        self.inner.parameters()
    }

    fn parameters_mut(&mut self) -> &mut ParameterCollection {
        self.inner.parameters_mut()
    }

    fn execute_non_query(&mut self) -> std::result::Result<u64, M::Error> {
        self.record(ExecutionKind::NonQuery);
        self.inner.execute_non_query()
    }

    fn execute_scalar(&mut self) -> std::result::Result<Value, M::Error> {
        self.record(ExecutionKind::Scalar);
        self.inner.execute_scalar()
    }

    fn execute_reader(&mut self) -> std::result::Result<M::Reader, M::Error> {
        self.record(ExecutionKind::Reader);
        self.inner.execute_reader()
    }
}
