//! Typed records: explicit schema descriptions in place of reflection, and
//! hydration of records from reader rows.
//!
//! A [`Record`] describes its fields once through [`Record::describe`]. The
//! description is cached per type by [`schema_of`], and the result-set
//! builder resolves it into `(name, type, path)` column descriptors.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use chrono::NaiveDateTime;

use crate::error::{Error, Result};
use crate::value::{DbType, FromValue, ScalarType, Value};

/// What a record field holds.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Scalar(DbType),
    /// A referenced record, flattened into dotted columns on request.
    Nested(SchemaRef),
}

/// A deferred handle to the schema of a nested record type.
///
/// The schema is only looked up when a nested column is resolved, so a
/// record may reference its own type.
#[derive(Clone, Copy)]
pub struct SchemaRef {
    type_id: TypeId,
    type_name: &'static str,
    schema: fn() -> Arc<RecordSchema>,
}

impl SchemaRef {
    pub fn of<R: Record>() -> Self {
        Self {
            type_id: TypeId::of::<R>(),
            type_name: std::any::type_name::<R>(),
            schema: schema_of::<R>,
        }
    }

    pub fn schema(&self) -> Arc<RecordSchema> {
        (self.schema)()
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl PartialEq for SchemaRef {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl fmt::Debug for SchemaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SchemaRef").field(&self.type_name).finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
}

/// Ordered field list of a record type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSchema {
    fields: Vec<Field>,
}

/// A column resolved against a record schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub db_type: DbType,
    /// Field indices leading from the record to the cell, one per level.
    pub path: Vec<usize>,
}

impl RecordSchema {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn scalar(mut self, name: impl Into<String>, db_type: DbType) -> Self {
        self.fields.push(Field {
            name: name.into(),
            kind: FieldKind::Scalar(db_type),
        });
        self
    }

    /// Add a scalar field typed after `T`.
    #[must_use]
    pub fn field<T: ScalarType>(self, name: impl Into<String>) -> Self {
        self.scalar(name, T::DB_TYPE)
    }

    /// Add a field referencing another record.
    #[must_use]
    pub fn nested<R: Record>(mut self, name: impl Into<String>) -> Self {
        self.fields.push(Field {
            name: name.into(),
            kind: FieldKind::Nested(SchemaRef::of::<R>()),
        });
        self
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Find field index by name (case-insensitive).
    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|f| f.name.eq_ignore_ascii_case(name))
    }

    /// Columns used when the caller lists none: every top-level scalar in
    /// declaration order. Nested records are only expanded on request.
    pub fn default_columns(&self) -> Vec<ColumnDescriptor> {
        self.fields
            .iter()
            .enumerate()
            .filter_map(|(idx, field)| match field.kind {
                FieldKind::Scalar(db_type) => Some(ColumnDescriptor {
                    name: field.name.clone(),
                    db_type,
                    path: vec![idx],
                }),
                FieldKind::Nested(_) => None,
            })
            .collect()
    }

    /// Resolve a caller-listed column name.
    ///
    /// `"Name"` names a top-level scalar and `"Parent.Child"` a scalar of a
    /// nested record. Naming a nested record alone (`"Parent"`) expands to
    /// all of its scalars. Only one level of nesting is followed.
    pub fn resolve(&self, name: &str) -> Result<Vec<ColumnDescriptor>> {
        let not_found = || Error::column_not_found(name);
        let (head, tail) = match name.split_once('.') {
            Some((head, tail)) => (head, Some(tail)),
            None => (name, None),
        };
        let idx = self.position(head).ok_or_else(not_found)?;
        match (&self.fields[idx].kind, tail) {
            (FieldKind::Scalar(db_type), None) => Ok(vec![ColumnDescriptor {
                name: name.to_string(),
                db_type: *db_type,
                path: vec![idx],
            }]),
            (FieldKind::Scalar(_), Some(_)) => Err(not_found()),
            (FieldKind::Nested(nested), None) => Ok(nested
                .schema()
                .default_columns()
                .into_iter()
                .map(|child| ColumnDescriptor {
                    name: format!("{head}.{}", child.name),
                    db_type: child.db_type,
                    path: vec![idx, child.path[0]],
                })
                .collect()),
            (FieldKind::Nested(nested), Some(tail)) => {
                let nested = nested.schema();
                let child = nested.position(tail).ok_or_else(not_found)?;
                match nested.fields[child].kind {
                    FieldKind::Scalar(db_type) => Ok(vec![ColumnDescriptor {
                        name: name.to_string(),
                        db_type,
                        path: vec![idx, child],
                    }]),
                    FieldKind::Nested(_) => Err(not_found()),
                }
            }
        }
    }
}

/// The value of one record field, aligned with its [`Field`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Scalar(Value),
    /// `None` when the referenced record is absent.
    Nested(Option<Vec<FieldValue>>),
}

impl FieldValue {
    pub fn scalar(value: impl Into<Value>) -> Self {
        FieldValue::Scalar(value.into())
    }

    pub fn nested<R: Record>(record: Option<&R>) -> Self {
        FieldValue::Nested(record.map(Record::values))
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        FieldValue::Scalar(value)
    }
}

/// Follows `path` through a record's values. Anything under an absent
/// nested record reads as NULL.
pub(crate) fn cell_at(values: &[FieldValue], path: &[usize]) -> Value {
    match path {
        [idx] => match values.get(*idx) {
            Some(FieldValue::Scalar(value)) => value.clone(),
            _ => Value::Null,
        },
        [idx, rest @ ..] => match values.get(*idx) {
            Some(FieldValue::Nested(Some(children))) => cell_at(children, rest),
            _ => Value::Null,
        },
        [] => Value::Null,
    }
}

/// A type that can be turned into result-set rows.
///
/// # Example
///
/// ```
/// use sqlfake::{FieldValue, Record, RecordSchema};
///
/// struct Product {
///     id: i32,
///     name: String,
/// }
///
/// impl Record for Product {
///     fn describe() -> RecordSchema {
///         RecordSchema::new().field::<i32>("Id").field::<String>("Name")
///     }
///
///     fn values(&self) -> Vec<FieldValue> {
///         vec![FieldValue::scalar(self.id), FieldValue::scalar(self.name.clone())]
///     }
/// }
/// ```
pub trait Record: 'static {
    /// Fields in declaration order.
    fn describe() -> RecordSchema;

    /// Field values, positionally aligned with [`Record::describe`].
    fn values(&self) -> Vec<FieldValue>;
}

/// The schema of `R`, described once and cached per type.
pub fn schema_of<R: Record>() -> Arc<RecordSchema> {
    static CACHE: OnceLock<Mutex<HashMap<TypeId, Arc<RecordSchema>>>> = OnceLock::new();

    let cache = CACHE.get_or_init(Default::default);
    let key = TypeId::of::<R>();
    if let Some(schema) = cache
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
    {
        return Arc::clone(schema);
    }
    // Described outside the lock so `describe` may itself look up schemas.
    let schema = Arc::new(R::describe());
    let mut cache = cache.lock().unwrap_or_else(PoisonError::into_inner);
    Arc::clone(cache.entry(key).or_insert(schema))
}

/// A view of one reader row, addressed by column name.
#[derive(Debug, Clone)]
pub struct RowRef<'a> {
    names: &'a [String],
    values: &'a [Value],
    prefix: String,
}

impl<'a> RowRef<'a> {
    pub fn new(names: &'a [String], values: &'a [Value]) -> Self {
        Self {
            names,
            values,
            prefix: String::new(),
        }
    }

    fn qualify(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}.{name}", self.prefix)
        }
    }

    /// Raw cell by name (case-insensitive, relative to any nesting prefix).
    pub fn value(&self, name: &str) -> Result<&'a Value> {
        let full = self.qualify(name);
        self.names
            .iter()
            .position(|n| n.eq_ignore_ascii_case(&full))
            .and_then(|idx| self.values.get(idx))
            .ok_or_else(|| Error::column_not_found(full))
    }

    pub fn get<T: FromValue>(&self, name: &str) -> Result<T> {
        let value = self.value(name)?;
        T::from_value(value.clone(), &self.qualify(name))
    }

    /// Cell by ordinal, ignoring any nesting prefix.
    pub fn get_at<T: FromValue>(&self, index: usize) -> Result<T> {
        let value = self
            .values
            .get(index)
            .ok_or(Error::ColumnIndexOutOfBounds {
                index,
                count: self.values.len(),
            })?;
        let name = self.names.get(index).map_or("", String::as_str);
        T::from_value(value.clone(), name)
    }

    /// Hydrate a nested record from the `prefix.*` columns.
    ///
    /// Returns `None` when every such column is NULL (or none exist), which
    /// is how an absent referenced record comes back from a join. Callers
    /// mapping onto a non-nullable field use `unwrap_or_default()`, the same
    /// way a NOT NULL column would never hand back NULL.
    pub fn nested<T: FromRow>(&self, prefix: &str) -> Result<Option<T>> {
        let full = self.qualify(prefix);
        let dotted = format!("{full}.");
        let mut cells = self
            .names
            .iter()
            .zip(self.values)
            .filter(|(name, _)| {
                name.len() > dotted.len()
                    && name
                        .get(..dotted.len())
                        .is_some_and(|head| head.eq_ignore_ascii_case(&dotted))
            })
            .peekable();
        if cells.peek().is_none() || cells.all(|(_, value)| value.is_null()) {
            return Ok(None);
        }
        let nested = RowRef {
            names: self.names,
            values: self.values,
            prefix: full,
        };
        T::from_row(&nested).map(Some)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Hydration of a value from one reader row.
pub trait FromRow: Sized {
    fn from_row(row: &RowRef<'_>) -> Result<Self>;
}

macro_rules! impl_from_row_for_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromRow for $ty {
                fn from_row(row: &RowRef<'_>) -> Result<Self> {
                    row.get_at(0)
                }
            }
        )*
    };
}

impl_from_row_for_scalar!(bool, i16, i32, i64, f64, String, Vec<u8>, NaiveDateTime, Value);

impl<T: ScalarType> FromRow for Option<T> {
    fn from_row(row: &RowRef<'_>) -> Result<Self> {
        row.get_at(0)
    }
}

impl<A: FromValue, B: FromValue> FromRow for (A, B) {
    fn from_row(row: &RowRef<'_>) -> Result<Self> {
        Ok((row.get_at(0)?, row.get_at(1)?))
    }
}

impl<A: FromValue, B: FromValue, C: FromValue> FromRow for (A, B, C) {
    fn from_row(row: &RowRef<'_>) -> Result<Self> {
        Ok((row.get_at(0)?, row.get_at(1)?, row.get_at(2)?))
    }
}
