//! Forward-only cursor over a programmed result set.

use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::protocol::DataReader;
use crate::result_set::{ColumnMetadata, ResultSet};
use crate::value::{DbType, Value};

/// Position of a [`FakeReader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    BeforeFirstRow,
    OnRow,
    Exhausted,
    Closed,
}

impl fmt::Display for ReaderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReaderState::BeforeFirstRow => write!(f, "positioned before the first row"),
            ReaderState::OnRow => write!(f, "on a row"),
            ReaderState::Exhausted => write!(f, "past the last row"),
            ReaderState::Closed => write!(f, "closed"),
        }
    }
}

/// A reader over a shared, immutable [`ResultSet`].
///
/// Each reader owns its own position, so several readers over the same
/// result set never interfere. A single reader must not be shared between
/// threads.
///
/// # Lifecycle
///
/// 1. Created by `execute_reader()`, positioned before the first row
/// 2. Advanced with `read()`, which returns `false` once rows run out
/// 3. Closed explicitly via `close()` or by dropping it
#[derive(Debug, Clone)]
pub struct FakeReader {
    result: Arc<ResultSet>,
    /// Index of the current row while `state` is `OnRow`.
    current: usize,
    state: ReaderState,
}

impl FakeReader {
    pub fn new(result: Arc<ResultSet>) -> Self {
        Self {
            result,
            current: 0,
            state: ReaderState::BeforeFirstRow,
        }
    }

    pub fn state(&self) -> ReaderState {
        self.state
    }

    pub fn columns(&self) -> &[ColumnMetadata] {
        self.result.columns()
    }

    /// Whether the result set has any rows at all.
    pub fn has_rows(&self) -> bool {
        !self.result.is_empty()
    }

    fn column(&self, ordinal: usize) -> Result<&ColumnMetadata> {
        self.result
            .columns()
            .get(ordinal)
            .ok_or(Error::ColumnIndexOutOfBounds {
                index: ordinal,
                count: self.result.columns().len(),
            })
    }

    fn row(&self, operation: &'static str) -> Result<&[Value]> {
        match self.state {
            ReaderState::OnRow => Ok(&self.result.rows()[self.current]),
            state => Err(Error::InvalidReadState { operation, state }),
        }
    }

    fn cell(&self, ordinal: usize, operation: &'static str) -> Result<&Value> {
        self.column(ordinal)?;
        Ok(&self.row(operation)?[ordinal])
    }
}

impl DataReader for FakeReader {
    type Error = Error;

    fn read(&mut self) -> Result<bool> {
        let next = match self.state {
            ReaderState::BeforeFirstRow => 0,
            ReaderState::OnRow => self.current + 1,
            ReaderState::Exhausted => return Ok(false),
            state => {
                return Err(Error::InvalidReadState {
                    operation: "Read",
                    state,
                })
            }
        };
        if next < self.result.len() {
            self.current = next;
            self.state = ReaderState::OnRow;
            Ok(true)
        } else {
            self.state = ReaderState::Exhausted;
            Ok(false)
        }
    }

    fn field_count(&self) -> usize {
        self.result.columns().len()
    }

    fn get_name(&self, ordinal: usize) -> Result<&str> {
        self.column(ordinal).map(|c| c.name.as_str())
    }

    fn get_field_type(&self, ordinal: usize) -> Result<DbType> {
        self.column(ordinal).map(|c| c.db_type)
    }

    fn get_ordinal(&self, name: &str) -> Result<usize> {
        self.result
            .find_by_name(name)
            .ok_or_else(|| Error::column_not_found(name))
    }

    fn get_value(&self, ordinal: usize) -> Result<Value> {
        self.cell(ordinal, "GetValue").cloned()
    }

    fn is_db_null(&self, ordinal: usize) -> Result<bool> {
        self.cell(ordinal, "IsDBNull").map(Value::is_null)
    }

    fn close(&mut self) {
        self.state = ReaderState::Closed;
    }

    fn is_closed(&self) -> bool {
        self.state == ReaderState::Closed
    }
}
