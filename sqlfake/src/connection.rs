//! The fake connection: a FIFO queue of programmed responses plus the log of
//! every command executed against it.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::command::FakeCommand;
use crate::error::{Error, Result};
use crate::invocation::{ExecutionKind, Invocation, Invocations};
use crate::protocol::{Connection, ConnectionState};
use crate::result_set::{ColumnSource, QueryData, ResultSet};
use crate::value::Value;

/// Pass as `times` to keep a setup at the head of the queue forever.
pub const UNLIMITED: usize = 0;

/// What a setup hands back when it is dispatched.
#[derive(Debug, Clone)]
pub(crate) enum Response {
    RowsAffected(u64),
    Scalar(Value),
    Rows(Arc<ResultSet>),
}

impl Response {
    fn kind(&self) -> ExecutionKind {
        match self {
            Response::RowsAffected(_) => ExecutionKind::NonQuery,
            Response::Scalar(_) => ExecutionKind::Scalar,
            Response::Rows(_) => ExecutionKind::Reader,
        }
    }

    pub(crate) fn rows_affected(&self) -> Option<u64> {
        match self {
            Response::RowsAffected(rows) => Some(*rows),
            _ => None,
        }
    }

    pub(crate) fn scalar(&self) -> Option<Value> {
        match self {
            Response::Scalar(value) => Some(value.clone()),
            _ => None,
        }
    }

    pub(crate) fn rows(&self) -> Option<Arc<ResultSet>> {
        match self {
            Response::Rows(result) => Some(Arc::clone(result)),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Setup {
    response: Response,
    /// `None` for unlimited.
    remaining: Option<usize>,
}

#[derive(Debug, Default)]
struct State {
    setups: VecDeque<Setup>,
    invocations: Vec<Invocation>,
    connection: ConnectionState,
}

#[derive(Debug, Default)]
struct Inner {
    connection_string: String,
    /// Setups, invocations and open/closed state share one lock.
    state: Mutex<State>,
}

/// A connection that answers commands from programmed setups instead of a
/// database.
///
/// Setups are served strictly in registration order. A setup registered
/// with `times = n` answers `n` calls before the next one takes over; one
/// registered with [`UNLIMITED`] answers every call from then on. A call
/// whose kind differs from the head setup fails with
/// [`Error::NoSetupAvailable`] instead of searching further down the queue.
///
/// Every execution is recorded before it is dispatched, so failed attempts
/// show up in [`FakeConnection::invocations`] too.
///
/// Cloning yields another handle to the same queue and log.
///
/// # Example
///
/// ```
/// use sqlfake::{Command, Connection, FakeConnection, Verify};
///
/// let conn = FakeConnection::new();
/// conn.set_up_for_execute_non_query(1, 1);
///
/// let mut cmd = conn.create_command();
/// cmd.set_command_text("Delete From Products Where Id = @Id");
/// cmd.parameters_mut().set("@Id", 3);
/// assert_eq!(cmd.execute_non_query().unwrap(), 1);
///
/// conn.should_have_deleted("Products", "Id", Some(3.into())).unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct FakeConnection {
    inner: Arc<Inner>,
}

impl FakeConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a connection that reports `connection_string`. Only used for
    /// [`FakeConnection::connection_string`] and [`FakeConnection::database`].
    pub fn with_connection_string(connection_string: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                connection_string: connection_string.into(),
                state: Mutex::default(),
            }),
        }
    }

    pub fn connection_string(&self) -> &str {
        &self.inner.connection_string
    }

    /// The `Database` (or `Initial Catalog`) entry of the connection string.
    pub fn database(&self) -> Option<&str> {
        self.inner
            .connection_string
            .split(';')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| {
                let key = key.trim();
                key.eq_ignore_ascii_case("database") || key.eq_ignore_ascii_case("initial catalog")
            })
            .map(|(_, value)| value.trim())
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn push_setup(&self, response: Response, times: usize) -> &Self {
        tracing::debug!(kind = %response.kind(), times, "registering setup");
        self.lock().setups.push_back(Setup {
            response,
            remaining: (times != UNLIMITED).then_some(times),
        });
        self
    }

    /// Answer the next `times` calls to `execute_non_query` with `rows_affected`.
    pub fn set_up_for_execute_non_query(&self, rows_affected: u64, times: usize) -> &Self {
        self.push_setup(Response::RowsAffected(rows_affected), times)
    }

    /// Answer the next `times` calls to `execute_scalar` with `value`.
    pub fn set_up_for_execute_scalar(&self, value: impl Into<Value>, times: usize) -> &Self {
        self.push_setup(Response::Scalar(value.into()), times)
    }

    /// Answer the next `times` calls to `execute_reader` with a result set
    /// built from `data` and `columns`.
    ///
    /// The result set is built immediately, so missing metadata is reported
    /// here rather than at execution time.
    pub fn set_up_for_query(
        &self,
        data: impl Into<QueryData>,
        columns: impl Into<ColumnSource>,
        times: usize,
    ) -> Result<&Self> {
        let result = ResultSet::build(data.into(), columns.into())?;
        Ok(self.push_setup(Response::Rows(Arc::new(result)), times))
    }

    /// Number of setups still queued.
    pub fn pending_setups(&self) -> usize {
        self.lock().setups.len()
    }

    /// Record `invocation` and answer it from the head setup. `take` returns
    /// `None` when the head setup is for another kind of call.
    pub(crate) fn dispatch<T>(
        &self,
        invocation: Invocation,
        take: fn(&Response) -> Option<T>,
    ) -> Result<T> {
        let expected = invocation.kind();
        let sql = invocation.command_text().to_string();
        let mut state = self.lock();
        tracing::trace!(%sql, kind = %expected, "recording invocation");
        state.invocations.push(invocation);

        let Some(head) = state.setups.front_mut() else {
            tracing::warn!(%sql, kind = %expected, "no setup queued");
            return Err(Error::NoSetupAvailable {
                expected,
                found: None,
                sql,
            });
        };
        let Some(answer) = take(&head.response) else {
            let found = head.response.kind();
            tracing::warn!(%sql, kind = %expected, %found, "head setup is for another call");
            return Err(Error::NoSetupAvailable {
                expected,
                found: Some(found),
                sql,
            });
        };

        let exhausted = match head.remaining.as_mut() {
            Some(remaining) => {
                *remaining -= 1;
                *remaining == 0
            }
            None => false,
        };
        if exhausted {
            state.setups.pop_front();
        }
        tracing::debug!(%sql, kind = %expected, "dispatched command");
        Ok(answer)
    }
}

impl Connection for FakeConnection {
    type Error = Error;
    type Command = FakeCommand;

    fn create_command(&self) -> FakeCommand {
        FakeCommand::new(self.clone())
    }

    fn open(&mut self) -> Result<()> {
        self.lock().connection = ConnectionState::Open;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.lock().connection = ConnectionState::Closed;
        Ok(())
    }

    fn state(&self) -> ConnectionState {
        self.lock().connection
    }
}

impl Invocations for FakeConnection {
    fn invocations(&self) -> Vec<Invocation> {
        self.lock().invocations.clone()
    }
}
