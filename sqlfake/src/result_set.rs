//! In-memory result sets and the builder that synthesizes them from fake data.

use std::sync::Arc;

use itertools::Itertools;

use crate::error::{Error, Result};
use crate::record::{cell_at, schema_of, ColumnDescriptor, FieldValue, Record, RecordSchema};
use crate::value::{DbType, ScalarType, Value};

/// Name and type of one result column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMetadata {
    pub name: String,
    pub db_type: DbType,
}

impl ColumnMetadata {
    pub fn new(name: impl Into<String>, db_type: DbType) -> Self {
        Self {
            name: name.into(),
            db_type,
        }
    }
}

impl From<ColumnDescriptor> for ColumnMetadata {
    fn from(descriptor: ColumnDescriptor) -> Self {
        Self::new(descriptor.name, descriptor.db_type)
    }
}

/// Where the builder takes column names and types from.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ColumnSource {
    /// Derive everything from the data itself.
    #[default]
    Inferred,
    /// Names only; types come from the data.
    Names(Vec<String>),
    /// Explicit names and types.
    Metadata(Vec<ColumnMetadata>),
}

impl From<Vec<ColumnMetadata>> for ColumnSource {
    fn from(columns: Vec<ColumnMetadata>) -> Self {
        ColumnSource::Metadata(columns)
    }
}

impl From<Vec<String>> for ColumnSource {
    fn from(names: Vec<String>) -> Self {
        ColumnSource::Names(names)
    }
}

impl From<&[&str]> for ColumnSource {
    fn from(names: &[&str]) -> Self {
        ColumnSource::Names(names.iter().map(|n| n.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for ColumnSource {
    fn from(names: [&str; N]) -> Self {
        ColumnSource::Names(names.iter().map(|n| n.to_string()).collect())
    }
}

/// Fake data handed to [`ResultSet::build`].
#[derive(Debug, Clone, PartialEq)]
pub enum QueryData {
    /// Positional rows of raw values.
    Rows(Vec<Vec<Value>>),
    /// A single column of values of one type.
    Scalars { db_type: DbType, values: Vec<Value> },
    /// Typed records, already broken into field values.
    Records {
        schema: Arc<RecordSchema>,
        values: Vec<Vec<FieldValue>>,
    },
    /// A result set built elsewhere.
    ResultSet(ResultSet),
}

impl QueryData {
    pub fn rows(rows: Vec<Vec<Value>>) -> Self {
        QueryData::Rows(rows)
    }

    /// No rows at all. Building this needs column types from somewhere.
    pub fn empty() -> Self {
        QueryData::Rows(vec![])
    }

    pub fn scalars<T: ScalarType>(values: impl IntoIterator<Item = T>) -> Self {
        QueryData::Scalars {
            db_type: T::DB_TYPE,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn nullable_scalars<T: ScalarType>(values: impl IntoIterator<Item = Option<T>>) -> Self {
        QueryData::Scalars {
            db_type: T::DB_TYPE,
            values: values.into_iter().map(Value::from).collect(),
        }
    }

    pub fn records<R: Record>(records: &[R]) -> Self {
        QueryData::Records {
            schema: schema_of::<R>(),
            values: records.iter().map(Record::values).collect(),
        }
    }
}

impl From<ResultSet> for QueryData {
    fn from(result: ResultSet) -> Self {
        QueryData::ResultSet(result)
    }
}

impl From<Vec<Vec<Value>>> for QueryData {
    fn from(rows: Vec<Vec<Value>>) -> Self {
        QueryData::Rows(rows)
    }
}

/// An immutable columnar table standing in for a database result.
///
/// Every row is exactly as wide as the column list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultSet {
    columns: Vec<ColumnMetadata>,
    rows: Vec<Vec<Value>>,
}

impl ResultSet {
    /// Create a result set, checking every row against the column count.
    pub fn new(columns: Vec<ColumnMetadata>, rows: Vec<Vec<Value>>) -> Result<Self> {
        if let Some((row, values)) = rows
            .iter()
            .enumerate()
            .find(|(_, values)| values.len() != columns.len())
        {
            return Err(Error::ColumnCountMismatch {
                row,
                expected: columns.len(),
                actual: values.len(),
            });
        }
        Ok(Self { columns, rows })
    }

    /// A result set with columns but no rows.
    pub fn empty(columns: Vec<ColumnMetadata>) -> Self {
        Self {
            columns,
            rows: vec![],
        }
    }

    /// Build a result set from fake data and a column source.
    ///
    /// Fails with [`Error::InsufficientMetadata`] rather than guess when the
    /// column types cannot be known: raw rows with no rows at all and no
    /// types, except for the trivial case of a single named column.
    pub fn build(data: QueryData, columns: ColumnSource) -> Result<Self> {
        match data {
            QueryData::Rows(rows) => Self::from_rows(rows, columns),
            QueryData::ResultSet(result) => match columns {
                ColumnSource::Inferred => Ok(result),
                columns => Self::from_rows(result.rows, columns),
            },
            QueryData::Scalars { db_type, values } => Self::from_scalars(db_type, values, columns),
            QueryData::Records { schema, values } => Self::from_records(&schema, &values, columns),
        }
    }

    fn from_rows(rows: Vec<Vec<Value>>, columns: ColumnSource) -> Result<Self> {
        let names = match columns {
            ColumnSource::Metadata(columns) => return Self::new(columns, rows),
            ColumnSource::Names(names) if rows.is_empty() => {
                return match names.as_slice() {
                    [name] => Ok(Self::empty(vec![ColumnMetadata::new(
                        name.as_str(),
                        DbType::Object,
                    )])),
                    names => Err(Error::insufficient_metadata(format!(
                        "columns {} have names but no types, and there are no rows to infer them from",
                        names.iter().join(", ")
                    ))),
                };
            }
            ColumnSource::Names(names) => names,
            ColumnSource::Inferred => match rows.first() {
                Some(first) => (1..=first.len()).map(|i| format!("Column{i}")).collect(),
                None => {
                    return Err(Error::insufficient_metadata(
                        "no rows and no column names or types were supplied",
                    ))
                }
            },
        };
        let columns = names
            .into_iter()
            .enumerate()
            .map(|(idx, name)| ColumnMetadata::new(name, infer_type(&rows, idx)))
            .collect();
        Self::new(columns, rows)
    }

    fn from_scalars(db_type: DbType, values: Vec<Value>, columns: ColumnSource) -> Result<Self> {
        let column = match columns {
            ColumnSource::Inferred => ColumnMetadata::new("Value", db_type),
            ColumnSource::Names(names) => match names.as_slice() {
                [name] => ColumnMetadata::new(name.as_str(), db_type),
                names => return Err(scalar_width_error(names.len())),
            },
            ColumnSource::Metadata(mut columns) => match columns.len() {
                1 => columns.remove(0),
                len => return Err(scalar_width_error(len)),
            },
        };
        let rows = values.into_iter().map(|value| vec![value]).collect();
        Self::new(vec![column], rows)
    }

    fn from_records(
        schema: &RecordSchema,
        values: &[Vec<FieldValue>],
        columns: ColumnSource,
    ) -> Result<Self> {
        let descriptors = match columns {
            ColumnSource::Inferred => schema.default_columns(),
            ColumnSource::Names(names) => names
                .iter()
                .map(|name| schema.resolve(name))
                .flatten_ok()
                .collect::<Result<Vec<_>>>()?,
            ColumnSource::Metadata(columns) => columns
                .into_iter()
                .map(|column| {
                    let resolved = schema.resolve(&column.name)?;
                    match <[ColumnDescriptor; 1]>::try_from(resolved) {
                        Ok([descriptor]) => Ok(ColumnDescriptor {
                            db_type: column.db_type,
                            ..descriptor
                        }),
                        Err(_) => Err(Error::column_not_found(column.name)),
                    }
                })
                .collect::<Result<Vec<_>>>()?,
        };
        let rows = values
            .iter()
            .map(|record| descriptors.iter().map(|d| cell_at(record, &d.path)).collect())
            .collect();
        Self::new(descriptors.into_iter().map(Into::into).collect(), rows)
    }

    pub fn columns(&self) -> &[ColumnMetadata] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Find column index by name (case-insensitive).
    pub fn find_by_name(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Type of the first non-NULL cell in column `idx`, or `Object` if there is none.
fn infer_type(rows: &[Vec<Value>], idx: usize) -> DbType {
    rows.iter()
        .filter_map(|row| row.get(idx).and_then(Value::db_type))
        .next()
        .unwrap_or(DbType::Object)
}

fn scalar_width_error(declared: usize) -> Error {
    Error::ColumnCountMismatch {
        row: 0,
        expected: declared,
        actual: 1,
    }
}
