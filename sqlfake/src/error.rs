//! Error types for the fake driver.

use thiserror::Error;

use crate::invocation::ExecutionKind;
use crate::reader::ReaderState;
use crate::value::DbType;

/// Result type alias for fake-driver operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Why a typed getter refused to convert a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoercionFailure {
    /// The requested type is narrower than the stored one.
    Overflow,
    /// The requested type has nothing in common with the stored one.
    Incompatible,
}

impl std::fmt::Display for CoercionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoercionFailure::Overflow => write!(f, "arithmetic overflow"),
            CoercionFailure::Incompatible => write!(f, "invalid cast"),
        }
    }
}

/// Error type for fake connections, commands and readers.
///
/// Every variant carries enough context (SQL text, column, counts) to make a
/// failing test actionable from its message alone.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The result shape cannot be inferred from the supplied data.
    #[error("can't infer result columns: not enough metadata ({message})")]
    InsufficientMetadata { message: String },

    /// A positional row does not line up with the column list.
    #[error("row {row} has {actual} values but the result set declares {expected} columns")]
    ColumnCountMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },

    /// Column not found.
    #[error("column not found: {name}")]
    ColumnNotFound { name: String },

    /// Column index out of bounds.
    #[error("column index {index} out of bounds (columns: {count})")]
    ColumnIndexOutOfBounds { index: usize, count: usize },

    /// The setup queue is empty or its head is programmed for another kind of call.
    #[error("no setup available for {expected}: {}\n[SQL] {sql}", describe_head(.found))]
    NoSetupAvailable {
        expected: ExecutionKind,
        found: Option<ExecutionKind>,
        sql: String,
    },

    /// A reader was used outside of a row.
    #[error("invalid attempt to call {operation} when the reader is {state}")]
    InvalidReadState {
        operation: &'static str,
        state: ReaderState,
    },

    /// A typed getter could not convert the stored value.
    #[error("cannot read column {column} of type {from} as {to}: {reason}")]
    TypeCoercion {
        column: String,
        from: DbType,
        to: DbType,
        reason: CoercionFailure,
    },

    /// A typed getter hit a NULL cell.
    #[error("unexpected NULL value in column {column}")]
    NullValue { column: String },

    /// A parameter with the same name already exists on the command.
    #[error("parameter {name} has already been added to the command")]
    DuplicateParameter { name: String },

    /// The recording wrapper cannot intercept this connection type.
    #[error("cannot record invocations on {type_name}: the connection does not expose its commands for interception")]
    UnsupportedConnectionType { type_name: &'static str },
}

fn describe_head(found: &Option<ExecutionKind>) -> String {
    match found {
        Some(found) => format!("the next queued setup is for {found}"),
        None => "the setup queue is empty".to_string(),
    }
}

impl Error {
    /// Create an insufficient-metadata error.
    pub fn insufficient_metadata(message: impl Into<String>) -> Self {
        Self::InsufficientMetadata {
            message: message.into(),
        }
    }

    /// Create a column-not-found error.
    pub fn column_not_found(name: impl Into<String>) -> Self {
        Self::ColumnNotFound { name: name.into() }
    }
}
