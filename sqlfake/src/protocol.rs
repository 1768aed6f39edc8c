//! The connection/command/reader protocol that data-access code is written
//! against. Fake and real drivers both implement it, so code under test does
//! not know which one it talks to.

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::error::Error;
use crate::parameter::ParameterCollection;
use crate::value::{extract, DbType, ScalarType, Value};

/// How the command text is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandType {
    #[default]
    Text,
    StoredProcedure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Closed,
    Open,
}

/// A forward-only reader over the rows of a query.
pub trait DataReader {
    /// The error type of reading.
    type Error: std::error::Error + From<Error> + Send + Sync + 'static;

    /// Advance to the next row. Returns `false` once the rows are exhausted.
    fn read(&mut self) -> Result<bool, Self::Error>;

    /// Number of columns, available whether or not there are rows.
    fn field_count(&self) -> usize;

    fn get_name(&self, ordinal: usize) -> Result<&str, Self::Error>;

    fn get_field_type(&self, ordinal: usize) -> Result<DbType, Self::Error>;

    /// Find column index by name (case-insensitive).
    fn get_ordinal(&self, name: &str) -> Result<usize, Self::Error>;

    /// The cell as stored, NULL included.
    fn get_value(&self, ordinal: usize) -> Result<Value, Self::Error>;

    fn is_db_null(&self, ordinal: usize) -> Result<bool, Self::Error> {
        Ok(self.get_value(ordinal)?.is_null())
    }

    fn close(&mut self);

    fn is_closed(&self) -> bool;

    /// Typed getter. Fails on NULL and on conversions a provider would refuse.
    fn get<T: ScalarType>(&self, ordinal: usize) -> Result<T, Self::Error>
    where
        Self: Sized,
    {
        let value = self.get_value(ordinal)?;
        let name = self.get_name(ordinal)?;
        Ok(extract(value, name)?)
    }

    fn get_bool(&self, ordinal: usize) -> Result<bool, Self::Error>
    where
        Self: Sized,
    {
        self.get(ordinal)
    }

    fn get_i16(&self, ordinal: usize) -> Result<i16, Self::Error>
    where
        Self: Sized,
    {
        self.get(ordinal)
    }

    fn get_i32(&self, ordinal: usize) -> Result<i32, Self::Error>
    where
        Self: Sized,
    {
        self.get(ordinal)
    }

    fn get_i64(&self, ordinal: usize) -> Result<i64, Self::Error>
    where
        Self: Sized,
    {
        self.get(ordinal)
    }

    fn get_f64(&self, ordinal: usize) -> Result<f64, Self::Error>
    where
        Self: Sized,
    {
        self.get(ordinal)
    }

    fn get_string(&self, ordinal: usize) -> Result<String, Self::Error>
    where
        Self: Sized,
    {
        self.get(ordinal)
    }

    fn get_bytes(&self, ordinal: usize) -> Result<Vec<u8>, Self::Error>
    where
        Self: Sized,
    {
        self.get(ordinal)
    }

    fn get_datetime(&self, ordinal: usize) -> Result<NaiveDateTime, Self::Error>
    where
        Self: Sized,
    {
        self.get(ordinal)
    }
}

/// A statement bound to a connection.
pub trait Command {
    /// The error type of execution.
    type Error: std::error::Error + From<Error> + Send + Sync + 'static;
    /// The reader returned by [`Command::execute_reader`].
    type Reader: DataReader<Error = Self::Error>;

    fn command_text(&self) -> &str;

    fn set_command_text(&mut self, text: &str);

    fn command_type(&self) -> CommandType;

    fn set_command_type(&mut self, command_type: CommandType);

    fn parameters(&self) -> &ParameterCollection;

    fn parameters_mut(&mut self) -> &mut ParameterCollection;

    /// Run a statement and return the number of affected rows.
    fn execute_non_query(&mut self) -> Result<u64, Self::Error>;

    /// Run a query and return the first column of its first row.
    fn execute_scalar(&mut self) -> Result<Value, Self::Error>;

    /// Run a query and return a reader positioned before its first row.
    fn execute_reader(&mut self) -> Result<Self::Reader, Self::Error>;
}

/// A database connection.
pub trait Connection {
    /// The error type of the connection and everything created from it.
    type Error: std::error::Error + From<Error> + Send + Sync + 'static;
    /// The command type created by [`Connection::create_command`].
    type Command: Command<Error = Self::Error>;

    fn create_command(&self) -> Self::Command;

    fn open(&mut self) -> Result<(), Self::Error>;

    fn close(&mut self) -> Result<(), Self::Error>;

    /// Release the connection. Calling it more than once is harmless.
    fn dispose(&mut self) -> Result<(), Self::Error> {
        self.close()
    }

    fn state(&self) -> ConnectionState;

    /// Whether every execution goes through a command returned by
    /// [`Connection::create_command`], which is what lets a wrapper observe it.
    fn supports_interception(&self) -> bool {
        true
    }
}

/// Async execution of a [`Command`].
///
/// Nothing here performs I/O, so every future completes on its first poll
/// and there is nothing to cancel.
#[async_trait]
pub trait AsyncCommand: Command + Send {
    async fn execute_non_query_async(&mut self) -> Result<u64, Self::Error>;

    async fn execute_scalar_async(&mut self) -> Result<Value, Self::Error>;

    async fn execute_reader_async(&mut self) -> Result<Self::Reader, Self::Error>;
}

/// Compat-layer from the sync [`Command`] to [`AsyncCommand`].
#[async_trait]
impl<C> AsyncCommand for C
where
    C: Command + Send,
    C::Reader: Send,
{
    async fn execute_non_query_async(&mut self) -> Result<u64, Self::Error> {
        self.execute_non_query()
    }

    async fn execute_scalar_async(&mut self) -> Result<Value, Self::Error> {
        self.execute_scalar()
    }

    async fn execute_reader_async(&mut self) -> Result<Self::Reader, Self::Error> {
        self.execute_reader()
    }
}
