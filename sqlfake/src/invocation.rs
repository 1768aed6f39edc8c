//! Snapshots of executed commands.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use itertools::Itertools;

use crate::parameter::{Parameter, ParameterCollection};
use crate::protocol::{Command, CommandType};
use crate::value::Value;

/// Which execute method ran a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionKind {
    NonQuery,
    Scalar,
    Reader,
}

impl fmt::Display for ExecutionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionKind::NonQuery => write!(f, "ExecuteNonQuery"),
            ExecutionKind::Scalar => write!(f, "ExecuteScalar"),
            ExecutionKind::Reader => write!(f, "ExecuteReader"),
        }
    }
}

/// An immutable copy of a command taken at the moment it executed.
///
/// The parameters are cloned out of the live command, so changing the
/// command afterwards never alters a recorded invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    command_text: String,
    command_type: CommandType,
    parameters: ParameterCollection,
    kind: ExecutionKind,
}

impl Invocation {
    pub fn new(
        command_text: impl Into<String>,
        command_type: CommandType,
        parameters: ParameterCollection,
        kind: ExecutionKind,
    ) -> Self {
        Self {
            command_text: command_text.into(),
            command_type,
            parameters,
            kind,
        }
    }

    /// Snapshot `command` as it is about to run.
    pub fn capture<C: Command + ?Sized>(command: &C, kind: ExecutionKind) -> Self {
        Self::new(
            command.command_text(),
            command.command_type(),
            command.parameters().clone(),
            kind,
        )
    }

    pub fn command_text(&self) -> &str {
        &self.command_text
    }

    pub fn command_type(&self) -> CommandType {
        self.command_type
    }

    pub fn parameters(&self) -> &ParameterCollection {
        &self.parameters
    }

    pub fn kind(&self) -> ExecutionKind {
        self.kind
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.get(name)
    }

    /// Value of a parameter, or `None` if it is missing or was never assigned.
    pub fn parameter_value(&self, name: &str) -> Option<&Value> {
        self.parameter(name).and_then(Parameter::value)
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.command_text)?;
        if !self.parameters.is_empty() {
            let params = self.parameters.iter().format_with(", ", |p, f| match p.value() {
                Some(value) => f(&format_args!("{} = {value}", p.name())),
                None => f(&format_args!("{} unset", p.name())),
            });
            write!(f, " ({params})")?;
        }
        Ok(())
    }
}

/// Anything that keeps a log of executed commands.
pub trait Invocations {
    /// A snapshot of the log, oldest first.
    fn invocations(&self) -> Vec<Invocation>;
}

impl Invocations for [Invocation] {
    fn invocations(&self) -> Vec<Invocation> {
        self.to_vec()
    }
}

impl Invocations for Vec<Invocation> {
    fn invocations(&self) -> Vec<Invocation> {
        self.clone()
    }
}

/// A shared, append-only invocation log.
#[derive(Debug, Clone, Default)]
pub struct InvocationLog {
    entries: Arc<Mutex<Vec<Invocation>>>,
}

impl InvocationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, invocation: Invocation) {
        tracing::trace!(
            sql = invocation.command_text(),
            kind = %invocation.kind(),
            "recording invocation"
        );
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(invocation);
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Invocations for InvocationLog {
    fn invocations(&self) -> Vec<Invocation> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
